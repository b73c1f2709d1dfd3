use std::{fmt, fs, path::Path};

use jsonwebtoken::EncodingKey;
use serde::Deserialize;

use crate::SheetsError;

pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Service-account key as downloaded from the Google Cloud console.
///
/// Deserializes from the JSON key file or from an equivalent TOML table.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("project_id", &self.project_id)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("token_uri", &self.token_uri)
            .finish()
    }
}

impl ServiceAccountKey {
    pub fn from_json(raw: &str) -> Result<Self, SheetsError> {
        let key: Self = serde_json::from_str(raw)
            .map_err(|e| SheetsError::Credentials(format!("malformed key json: {e}")))?;
        key.validate()?;
        Ok(key)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SheetsError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| SheetsError::CredentialsIo {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), SheetsError> {
        if let Some(kind) = self.key_type.as_deref() {
            if kind != "service_account" {
                return Err(SheetsError::Credentials(format!(
                    "expected key type 'service_account', got '{kind}'"
                )));
            }
        }
        if self.client_email.trim().is_empty() {
            return Err(SheetsError::Credentials("client_email is empty".into()));
        }
        if self.token_uri.trim().is_empty() {
            return Err(SheetsError::Credentials("token_uri is empty".into()));
        }
        self.encoding_key()?;
        Ok(())
    }

    pub(crate) fn encoding_key(&self) -> Result<EncodingKey, SheetsError> {
        // TOML secrets often carry the PEM with escaped newlines.
        let pem = self.private_key.replace("\\n", "\n");
        EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| SheetsError::Credentials(format!("private_key is not a valid RSA PEM: {e}")))
    }
}
