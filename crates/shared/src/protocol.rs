use serde::{Deserialize, Serialize};

use crate::domain::SubmissionRecord;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub unit: String,
}

/// Raw form input for one submission. Every field arrives as text; empty means unselected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub allocation: String,
    #[serde(default)]
    pub sequence: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub date: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CascadeQuery {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub allocation: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeOptions {
    pub organizations: Vec<String>,
    pub allocations: Vec<String>,
    pub sequences: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub logged_in: bool,
    pub user_name: String,
    pub organizational_unit: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    pub record: SubmissionRecord,
    pub message: String,
}
