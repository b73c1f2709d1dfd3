use std::sync::Arc;

use chrono::NaiveDate;
use reference::ReferenceTable;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{CascadeOptions, CascadeQuery, LoginRequest, SessionSummary, SubmitReceipt, SubmitRequest},
};
use storage::Ledger;
use tracing::{info, warn};

pub mod amount;
pub mod selector;
pub mod session;
pub mod submit;
pub mod view;

pub use amount::{parse_local_amount, CurrencyLocale};
pub use selector::{cascade_options, resolve, CascadeStep, Selection};
pub use session::Session;
pub use submit::{parse_form_date, submit_record, DATE_FORMAT};
pub use view::{render, Flash, FlashKind, FormState, View};

pub const UNKNOWN_UNIT: &str = "Unidade orçamentária desconhecida.";

#[derive(Clone)]
pub struct ApiContext {
    pub reference: Arc<ReferenceTable>,
    pub ledger: Arc<dyn Ledger>,
    pub locale: CurrencyLocale,
}

/// Logs `session` in. Both fields must be filled and the unit must be one of the
/// reference organizations, checked in that order.
pub fn login(ctx: &ApiContext, session: &mut Session, req: &LoginRequest) -> Result<(), ApiError> {
    let filled = !req.name.is_empty() && !req.unit.is_empty();
    if filled && !ctx.reference.has_organization(&req.unit) {
        warn!(unit = %req.unit, "login rejected: unknown unit");
        return Err(ApiError::validation(UNKNOWN_UNIT));
    }
    session.login(&req.name, &req.unit).inspect_err(|err| {
        warn!(error = %err, "login rejected");
    })?;
    info!(user = %req.name, unit = %req.unit, "user logged in");
    Ok(())
}

pub fn logout(session: &mut Session) {
    if session.is_logged_in() {
        info!(user = %session.user_name(), "user logged out");
    }
    session.logout();
}

pub fn session_summary(session: &Session) -> SessionSummary {
    session.summary()
}

pub fn options(ctx: &ApiContext, query: &CascadeQuery) -> CascadeOptions {
    let selection = Selection::from_inputs(
        query.organization.as_deref().unwrap_or_default(),
        query.allocation.as_deref().unwrap_or_default(),
        "",
    );
    cascade_options(&ctx.reference, &selection)
}

pub async fn submit(
    ctx: &ApiContext,
    session: &Session,
    req: &SubmitRequest,
    today: NaiveDate,
) -> Result<SubmitReceipt, ApiError> {
    submit_record(ctx, session, req, today)
        .await
        .inspect_err(|err| {
            if matches!(err.code, ErrorCode::Validation | ErrorCode::Unauthorized) {
                warn!(code = ?err.code, error = %err, "submission rejected");
            }
        })
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
