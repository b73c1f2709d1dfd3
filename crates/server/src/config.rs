use std::{env, fs, io, path::PathBuf, str::FromStr};

use sheets::{ServiceAccountKey, SheetsError, DEFAULT_SPREADSHEET_ID};
use shared::domain::LEDGER_WORKSHEET;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "server.toml";

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read config file '{}': {source}", path.display())]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed config file '{}': {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid gcp_service_account: {0}")]
    ServiceAccount(String),
    #[error("unknown ledger backend '{0}' (expected 'sheets' or 'sqlite')")]
    UnknownBackend(String),
    #[error("sheets ledger needs service account credentials (gcp_service_account or credentials_path)")]
    MissingCredentials,
    #[error("invalid bind address '{0}'")]
    BindAddr(String),
    #[error(transparent)]
    Reference(#[from] reference::ReferenceError),
    #[error(transparent)]
    Sheets(#[from] SheetsError),
    #[error("local ledger unavailable: {0:#}")]
    Storage(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerBackend {
    Sheets,
    Sqlite,
}

impl FromStr for LedgerBackend {
    type Err = StartupError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sheets" => Ok(Self::Sheets),
            "sqlite" => Ok(Self::Sqlite),
            _ => Err(StartupError::UnknownBackend(raw.to_string())),
        }
    }
}

#[derive(Debug)]
pub struct Settings {
    pub bind_addr: String,
    pub reference_path: PathBuf,
    pub ledger_backend: LedgerBackend,
    pub database_url: String,
    pub spreadsheet_id: String,
    pub worksheet: String,
    pub credentials_path: Option<PathBuf>,
    pub service_account: Option<ServiceAccountKey>,
    pub locale: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8501".into(),
            reference_path: PathBuf::from("DOTACOES.csv"),
            ledger_backend: LedgerBackend::Sheets,
            database_url: "sqlite://./data/ledger.db".into(),
            spreadsheet_id: DEFAULT_SPREADSHEET_ID.into(),
            worksheet: LEDGER_WORKSHEET.into(),
            credentials_path: None,
            service_account: None,
            locale: "pt_BR".into(),
        }
    }
}

/// Defaults, then `server.toml` (or `$DOTACAO_CONFIG`), then environment variables.
pub fn load_settings() -> Result<Settings, StartupError> {
    let path = env::var("DOTACAO_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let raw = match fs::read_to_string(&path) {
        Ok(raw) => Some(raw),
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(source) => return Err(StartupError::ConfigIo { path, source }),
    };
    let file_cfg = raw
        .map(|raw| {
            toml::from_str::<toml::Table>(&raw).map_err(|source| StartupError::ConfigParse {
                path: path.clone(),
                source,
            })
        })
        .transpose()?;

    settings_from_sources(file_cfg.as_ref(), |name| env::var(name).ok())
}

pub(crate) fn settings_from_sources(
    file_cfg: Option<&toml::Table>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Settings, StartupError> {
    let mut settings = Settings::default();
    let mut backend = None;

    if let Some(file_cfg) = file_cfg {
        let text = |key: &str| file_cfg.get(key).and_then(|v| v.as_str()).map(str::to_string);
        if let Some(v) = text("bind_addr") {
            settings.bind_addr = v;
        }
        if let Some(v) = text("reference_path") {
            settings.reference_path = v.into();
        }
        if let Some(v) = text("ledger_backend") {
            backend = Some(v);
        }
        if let Some(v) = text("database_url") {
            settings.database_url = v;
        }
        if let Some(v) = text("spreadsheet_id") {
            settings.spreadsheet_id = v;
        }
        if let Some(v) = text("worksheet") {
            settings.worksheet = v;
        }
        if let Some(v) = text("credentials_path") {
            settings.credentials_path = Some(v.into());
        }
        if let Some(v) = text("locale") {
            settings.locale = v;
        }
        if let Some(table) = file_cfg.get("gcp_service_account") {
            let key: ServiceAccountKey = table
                .clone()
                .try_into()
                .map_err(|e: toml::de::Error| StartupError::ServiceAccount(e.to_string()))?;
            key.validate()
                .map_err(|e| StartupError::ServiceAccount(e.to_string()))?;
            settings.service_account = Some(key);
        }
    }

    if let Some(v) = env("SERVER_BIND") {
        settings.bind_addr = v;
    }
    if let Some(v) = env("APP__BIND_ADDR") {
        settings.bind_addr = v;
    }

    if let Some(v) = env("REFERENCE_PATH") {
        settings.reference_path = v.into();
    }
    if let Some(v) = env("APP__REFERENCE_PATH") {
        settings.reference_path = v.into();
    }

    if let Some(v) = env("APP__LEDGER_BACKEND") {
        backend = Some(v);
    }

    if let Some(v) = env("DATABASE_URL") {
        settings.database_url = v;
    }
    if let Some(v) = env("APP__DATABASE_URL") {
        settings.database_url = v;
    }

    if let Some(v) = env("APP__SPREADSHEET_ID") {
        settings.spreadsheet_id = v;
    }
    if let Some(v) = env("APP__WORKSHEET") {
        settings.worksheet = v;
    }

    if let Some(v) = env("GOOGLE_APPLICATION_CREDENTIALS") {
        settings.credentials_path = Some(v.into());
    }
    if let Some(v) = env("APP__CREDENTIALS_PATH") {
        settings.credentials_path = Some(v.into());
    }
    if let Some(v) = env("APP__GCP_SERVICE_ACCOUNT") {
        let key = ServiceAccountKey::from_json(&v)
            .map_err(|e| StartupError::ServiceAccount(e.to_string()))?;
        settings.service_account = Some(key);
    }

    if let Some(v) = env("APP__LOCALE") {
        settings.locale = v;
    }

    if let Some(backend) = backend {
        settings.ledger_backend = backend.parse()?;
    }
    settings.database_url = normalize_database_url(&settings.database_url);

    Ok(settings)
}

pub(crate) fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
