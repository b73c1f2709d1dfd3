use shared::{error::ApiError, protocol::SessionSummary};

pub const MISSING_LOGIN_FIELDS: &str = "Por favor, preencha todos os campos!";

/// Identity of the person filling the form, scoped to one browser session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    logged_in: bool,
    user_name: String,
    organizational_unit: String,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Succeeds only when both fields are non-empty; on failure nothing changes.
    pub fn login(&mut self, name: &str, unit: &str) -> Result<(), ApiError> {
        if name.is_empty() || unit.is_empty() {
            return Err(ApiError::validation(MISSING_LOGIN_FIELDS));
        }
        self.logged_in = true;
        self.user_name = name.to_string();
        self.organizational_unit = unit.to_string();
        Ok(())
    }

    pub fn logout(&mut self) {
        self.logged_in = false;
        self.user_name.clear();
        self.organizational_unit.clear();
    }

    pub fn is_logged_in(&self) -> bool {
        self.logged_in
    }

    pub fn user_name(&self) -> &str {
        &self.user_name
    }

    pub fn organizational_unit(&self) -> &str {
        &self.organizational_unit
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            logged_in: self.logged_in,
            user_name: self.user_name.clone(),
            organizational_unit: self.organizational_unit.clone(),
        }
    }
}
