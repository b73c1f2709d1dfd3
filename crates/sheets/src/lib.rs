//! Google Sheets backed ledger.
//!
//! Authenticates with a service-account key (JWT bearer grant), talks to the
//! Sheets v4 REST API, and exposes [`SheetsLedger`] as a [`storage::Ledger`].

use std::path::PathBuf;

use thiserror::Error;

mod auth;
mod client;
mod credentials;
mod ledger;

pub use auth::{AccessTokenSource, ServiceAccountAuth, StaticToken, DRIVE_SCOPE, SPREADSHEETS_SCOPE};
pub use client::{a1_range, column_letter, SheetProperties, SheetsClient, DEFAULT_API_BASE};
pub use credentials::{ServiceAccountKey, DEFAULT_TOKEN_URI};
pub use ledger::{SheetsLedger, WorksheetSetup};

/// Spreadsheet that holds the `Registros` worksheet in production.
pub const DEFAULT_SPREADSHEET_ID: &str = "1sBKOPTYYbG1q7Ivqz8IildycV-Fen0PSF1mfgIDse_U";

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("invalid service account credentials: {0}")]
    Credentials(String),
    #[error("failed to read credentials file '{}': {source}", path.display())]
    CredentialsIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("token exchange failed: {0}")]
    Token(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("sheets api returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("unexpected sheets api response: {0}")]
    Decode(String),
    #[error("invalid sheets url: {0}")]
    Url(#[from] url::ParseError),
}
