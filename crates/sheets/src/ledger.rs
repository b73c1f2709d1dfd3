use anyhow::Context;
use async_trait::async_trait;
use shared::domain::{SubmissionRecord, LEDGER_HEADERS, USER_NAME_HEADER};
use storage::Ledger;
use tracing::info;

use crate::{
    client::{a1_range, column_letter, SheetsClient},
    SheetsError,
};

const NEW_SHEET_ROWS: u32 = 1000;
const NEW_SHEET_COLUMNS: u32 = 20;

/// What [`SheetsLedger::connect`] had to do to the worksheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorksheetSetup {
    Ready,
    CreatedWorksheet,
    AddedUserNameColumn,
}

pub struct SheetsLedger {
    client: SheetsClient,
    worksheet: String,
}

impl SheetsLedger {
    /// Opens the worksheet, creating it or completing its header row when needed.
    pub async fn connect(
        client: SheetsClient,
        worksheet: impl Into<String>,
    ) -> Result<(Self, WorksheetSetup), SheetsError> {
        let ledger = Self {
            client,
            worksheet: worksheet.into(),
        };
        let setup = ledger.ensure_worksheet().await?;
        info!(
            spreadsheet_id = ledger.client.spreadsheet_id(),
            worksheet = %ledger.worksheet,
            ?setup,
            "sheets ledger connected"
        );
        Ok((ledger, setup))
    }

    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    async fn ensure_worksheet(&self) -> Result<WorksheetSetup, SheetsError> {
        let sheets = self.client.sheet_properties().await?;
        let Some(sheet) = sheets.iter().find(|s| s.title == self.worksheet) else {
            self.client
                .add_sheet(&self.worksheet, NEW_SHEET_ROWS, NEW_SHEET_COLUMNS)
                .await?;
            let header: Vec<String> = LEDGER_HEADERS.iter().map(|h| h.to_string()).collect();
            self.client
                .append_row(&a1_range(&self.worksheet, "A1"), &header)
                .await?;
            return Ok(WorksheetSetup::CreatedWorksheet);
        };

        let headers = self
            .client
            .get_values(&a1_range(&self.worksheet, "1:1"))
            .await?
            .into_iter()
            .next()
            .unwrap_or_default();
        if headers.iter().any(|h| h == USER_NAME_HEADER) {
            return Ok(WorksheetSetup::Ready);
        }

        self.client.append_columns(sheet.sheet_id, 1).await?;
        let cell = format!("{}1", column_letter(headers.len() + 1));
        self.client
            .update_cell(&a1_range(&self.worksheet, &cell), USER_NAME_HEADER)
            .await?;
        Ok(WorksheetSetup::AddedUserNameColumn)
    }
}

#[async_trait]
impl Ledger for SheetsLedger {
    async fn append(&self, record: &SubmissionRecord) -> anyhow::Result<()> {
        self.client
            .append_row(&a1_range(&self.worksheet, "A1"), &record.to_row())
            .await
            .with_context(|| format!("append to worksheet '{}' failed", self.worksheet))
    }

    fn describe(&self) -> String {
        format!(
            "sheets:{}/{}",
            self.client.spreadsheet_id(),
            self.worksheet
        )
    }
}

#[cfg(test)]
#[path = "tests/ledger_tests.rs"]
mod tests;
