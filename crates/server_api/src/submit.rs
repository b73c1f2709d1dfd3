use chrono::NaiveDate;
use shared::{
    domain::SubmissionRecord,
    error::{ApiError, ErrorCode},
    protocol::{SubmitReceipt, SubmitRequest},
};
use tracing::{error, info};

use crate::{
    amount::parse_local_amount,
    selector::{resolve, Selection},
    session::Session,
    ApiContext,
};

/// Ledger date format.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
const PICKER_FORMAT: &str = "%Y-%m-%d";

pub const LOGIN_REQUIRED: &str = "Faça login para enviar registros.";
pub const INVALID_DATE: &str = "Por favor, informe uma data válida (DD/MM/AAAA).";

/// Empty input means `today`; accepts the date picker's ISO form and `DD/MM/YYYY`.
pub fn parse_form_date(raw: &str, today: NaiveDate) -> Result<NaiveDate, ApiError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(today);
    }
    NaiveDate::parse_from_str(raw, PICKER_FORMAT)
        .or_else(|_| NaiveDate::parse_from_str(raw, DATE_FORMAT))
        .map_err(|_| ApiError::validation(INVALID_DATE))
}

/// Validates one form submission and appends it to the ledger.
///
/// Validation failures happen before any ledger call. A ledger failure is
/// reported once and not retried; resubmitting writes a new row.
pub async fn submit_record(
    ctx: &ApiContext,
    session: &Session,
    request: &SubmitRequest,
    today: NaiveDate,
) -> Result<SubmitReceipt, ApiError> {
    if !session.is_logged_in() {
        return Err(ApiError::new(ErrorCode::Unauthorized, LOGIN_REQUIRED));
    }

    let selection = Selection::from_inputs(
        &request.organization,
        &request.allocation,
        &request.sequence,
    );
    let row = resolve(&ctx.reference, &selection)?;
    let amount = parse_local_amount(&request.value)?;
    let date = parse_form_date(&request.date, today)?;

    let record = SubmissionRecord {
        date: date.format(DATE_FORMAT).to_string(),
        organization: row.organization,
        allocation_code: row.allocation_code,
        sequence_number: row.sequence_number,
        formatted_value: ctx.locale.format(amount),
        user_name: session.user_name().to_string(),
    };

    ctx.ledger.append(&record).await.map_err(|e| {
        error!(
            ledger = %ctx.ledger.describe(),
            error = %format!("{e:#}"),
            "ledger append failed"
        );
        ApiError::new(
            ErrorCode::Persistence,
            format!("Erro ao salvar na planilha: {e:#}"),
        )
    })?;

    info!(
        ledger = %ctx.ledger.describe(),
        user = %record.user_name,
        organization = %record.organization,
        allocation = %record.allocation_code,
        sequence = %record.sequence_number,
        value = %record.formatted_value,
        date = %record.date,
        "record appended"
    );

    let message = format!(
        "Dados enviados com sucesso! Valor: {} Data: {}",
        record.formatted_value, record.date
    );
    Ok(SubmitReceipt { record, message })
}
