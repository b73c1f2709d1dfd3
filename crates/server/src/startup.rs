use std::sync::Arc;

use reference::ReferenceTable;
use server_api::{ApiContext, CurrencyLocale};
use sheets::{ServiceAccountAuth, ServiceAccountKey, SheetsClient, SheetsLedger};
use storage::{Ledger, SqliteLedger};
use tracing::info;

use crate::config::{LedgerBackend, Settings, StartupError};

pub async fn build_context(settings: &Settings) -> Result<ApiContext, StartupError> {
    let reference = ReferenceTable::from_path(&settings.reference_path)?;
    let ledger = build_ledger(settings).await?;
    let locale = CurrencyLocale::from_tag(&settings.locale);
    info!(ledger = %ledger.describe(), locale = locale.tag(), "ledger ready");

    Ok(ApiContext {
        reference: Arc::new(reference),
        ledger,
        locale,
    })
}

pub async fn build_ledger(settings: &Settings) -> Result<Arc<dyn Ledger>, StartupError> {
    match settings.ledger_backend {
        LedgerBackend::Sqlite => {
            let ledger = SqliteLedger::new(&settings.database_url)
                .await
                .map_err(StartupError::Storage)?;
            Ok(Arc::new(ledger))
        }
        LedgerBackend::Sheets => {
            let key = service_account_key(settings)?;
            let auth = ServiceAccountAuth::for_spreadsheets(key)?;
            info!(client_email = auth.client_email(), "using service account");
            let client = SheetsClient::new(&settings.spreadsheet_id, Arc::new(auth))?;
            let (ledger, _) = SheetsLedger::connect(client, &settings.worksheet).await?;
            Ok(Arc::new(ledger))
        }
    }
}

/// Inline key material wins over a key file path.
fn service_account_key(settings: &Settings) -> Result<ServiceAccountKey, StartupError> {
    if let Some(key) = &settings.service_account {
        return Ok(key.clone());
    }
    match &settings.credentials_path {
        Some(path) => Ok(ServiceAccountKey::from_path(path)?),
        None => Err(StartupError::MissingCredentials),
    }
}
