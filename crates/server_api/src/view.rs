//! View descriptions of the two screens.
//!
//! [`render`] is a pure function of the session, the pending form input and the
//! reference table. The HTTP layer calls it after every transition and turns
//! the returned [`View`] into markup.

use chrono::NaiveDate;
use reference::ReferenceTable;
use serde::Serialize;
use shared::error::{ApiError, ErrorCode};

use crate::{
    selector::{cascade_options, Selection},
    session::Session,
};

pub const LOGIN_TITLE: &str = "Login";
pub const ENTRY_TITLE: &str = "Disponibilização de Dotação";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FlashKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn from_error(err: &ApiError) -> Self {
        let kind = match err.code {
            ErrorCode::Validation | ErrorCode::Unauthorized => FlashKind::Warning,
            _ => FlashKind::Error,
        };
        Self {
            kind,
            message: err.message.clone(),
        }
    }
}

/// Input carried between renders: what the user typed but has not yet committed.
#[derive(Debug, Clone, Default)]
pub struct FormState {
    pub login_name: String,
    pub login_unit: String,
    pub selection: Selection,
    pub value: String,
    pub date: Option<NaiveDate>,
    pub flash: Option<Flash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectField {
    pub name: &'static str,
    pub label: &'static str,
    pub options: Vec<String>,
    pub selected: Option<String>,
    /// Offer an empty first option meaning "not chosen".
    pub include_blank: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: String,
    pub help: Option<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateField {
    pub name: &'static str,
    pub label: &'static str,
    pub value: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginView {
    pub title: &'static str,
    pub name: TextField,
    pub unit: SelectField,
    pub flash: Option<Flash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryView {
    pub title: &'static str,
    pub user_name: String,
    pub organizational_unit: String,
    pub organization: SelectField,
    pub allocation: Option<SelectField>,
    pub sequence: Option<SelectField>,
    pub value: Option<TextField>,
    pub date: Option<DateField>,
    pub flash: Option<Flash>,
}

impl EntryView {
    /// The submit action is only offered once the whole cascade is visible.
    pub fn can_submit(&self) -> bool {
        self.sequence.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "screen", rename_all = "snake_case")]
pub enum View {
    Login(LoginView),
    Entry(EntryView),
}

pub fn render(
    reference: &ReferenceTable,
    session: &Session,
    form: &FormState,
    today: NaiveDate,
) -> View {
    if !session.is_logged_in() {
        return View::Login(render_login(reference, form));
    }
    View::Entry(render_entry(reference, session, form, today))
}

fn render_login(reference: &ReferenceTable, form: &FormState) -> LoginView {
    let organizations = reference.organizations();
    let selected = Some(form.login_unit.clone()).filter(|unit| organizations.contains(unit));
    LoginView {
        title: LOGIN_TITLE,
        name: TextField {
            name: "name",
            label: "Nome do Servidor",
            value: form.login_name.clone(),
            help: None,
        },
        unit: SelectField {
            name: "unit",
            label: "Unidade Orçamentária",
            options: organizations,
            selected,
            include_blank: true,
        },
        flash: form.flash.clone(),
    }
}

fn render_entry(
    reference: &ReferenceTable,
    session: &Session,
    form: &FormState,
    today: NaiveDate,
) -> EntryView {
    let selection = form.selection.clone().normalized(reference);
    let options = cascade_options(reference, &selection);

    let allocation = selection.organization.as_ref().map(|_| SelectField {
        name: "allocation",
        label: "Selecione a Dotação",
        options: options.allocations.clone(),
        selected: selection.allocation.clone(),
        include_blank: true,
    });

    let sequence = selection.allocation.as_ref().map(|_| SelectField {
        name: "sequence",
        label: "Selecione o Sequencial",
        selected: selection
            .sequence
            .clone()
            .or_else(|| options.sequences.first().cloned()),
        options: options.sequences.clone(),
        include_blank: false,
    });

    let (value, date) = if sequence.is_some() {
        (
            Some(TextField {
                name: "value",
                label: "Digite o valor (R$)",
                value: form.value.clone(),
                help: Some("Digite o valor em reais (ex: 1.000,00)"),
            }),
            Some(DateField {
                name: "date",
                label: "Data da Disponibilização",
                value: form.date.unwrap_or(today),
            }),
        )
    } else {
        (None, None)
    };

    EntryView {
        title: ENTRY_TITLE,
        user_name: session.user_name().to_string(),
        organizational_unit: session.organizational_unit().to_string(),
        organization: SelectField {
            name: "organization",
            label: "Selecione o Órgão",
            options: options.organizations,
            selected: selection.organization.clone(),
            include_blank: true,
        },
        allocation,
        sequence,
        value,
        date,
        flash: form.flash.clone(),
    }
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
