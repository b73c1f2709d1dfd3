use std::sync::Arc;

use reqwest::{Method, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

use crate::{auth::AccessTokenSource, SheetsError};

pub const DEFAULT_API_BASE: &str = "https://sheets.googleapis.com";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    pub sheet_id: i64,
    pub title: String,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetMetadata {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
}

#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BatchUpdateResponse {
    #[serde(default)]
    replies: Vec<Value>,
}

/// Minimal Sheets v4 client bound to one spreadsheet.
#[derive(Clone)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: Url,
    spreadsheet_id: String,
    auth: Arc<dyn AccessTokenSource>,
}

impl SheetsClient {
    pub fn new(
        spreadsheet_id: impl Into<String>,
        auth: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, SheetsError> {
        Self::with_base_url(DEFAULT_API_BASE, spreadsheet_id, auth)
    }

    pub fn with_base_url(
        base_url: &str,
        spreadsheet_id: impl Into<String>,
        auth: Arc<dyn AccessTokenSource>,
    ) -> Result<Self, SheetsError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: Url::parse(base_url)?,
            spreadsheet_id: spreadsheet_id.into(),
            auth,
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    /// Builds `{base}/v4/spreadsheets/{id}{suffix}/{segments...}`.
    fn url(&self, id_suffix: &str, segments: &[&str]) -> Result<Url, SheetsError> {
        let mut url = self.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|_| SheetsError::Decode("base url cannot carry a path".into()))?;
            path.pop_if_empty()
                .extend(["v4", "spreadsheets"])
                .push(&format!("{}{id_suffix}", self.spreadsheet_id))
                .extend(segments);
        }
        Ok(url)
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> Result<Response, SheetsError> {
        let token = self.auth.access_token().await?;
        let mut request: RequestBuilder = self.http.request(method, url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SheetsError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    pub async fn sheet_properties(&self) -> Result<Vec<SheetProperties>, SheetsError> {
        let mut url = self.url("", &[])?;
        url.query_pairs_mut().append_pair("fields", "sheets.properties");
        let metadata: SpreadsheetMetadata = self
            .send(Method::GET, url, None)
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Decode(format!("spreadsheet metadata: {e}")))?;
        Ok(metadata.sheets.into_iter().map(|s| s.properties).collect())
    }

    /// Cell values of `range` as displayed text. Missing trailing cells are absent.
    pub async fn get_values(&self, range: &str) -> Result<Vec<Vec<String>>, SheetsError> {
        let url = self.url("", &["values", range])?;
        let values: ValueRange = self
            .send(Method::GET, url, None)
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Decode(format!("value range: {e}")))?;

        Ok(values
            .values
            .into_iter()
            .map(|row| row.into_iter().map(cell_text).collect())
            .collect())
    }

    /// Appends `row` as literal text, so each cell keeps exactly the characters written.
    pub async fn append_row(&self, range: &str, row: &[String]) -> Result<(), SheetsError> {
        let mut url = self.url("", &["values", &format!("{range}:append")])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW")
            .append_pair("insertDataOption", "INSERT_ROWS");
        self.send(Method::POST, url, Some(json!({ "values": [row] })))
            .await?;
        Ok(())
    }

    pub async fn update_cell(&self, range: &str, value: &str) -> Result<(), SheetsError> {
        let mut url = self.url("", &["values", range])?;
        url.query_pairs_mut().append_pair("valueInputOption", "USER_ENTERED");
        self.send(
            Method::PUT,
            url,
            Some(json!({ "range": range, "values": [[value]] })),
        )
        .await?;
        Ok(())
    }

    pub async fn add_sheet(
        &self,
        title: &str,
        rows: u32,
        columns: u32,
    ) -> Result<SheetProperties, SheetsError> {
        let replies = self
            .batch_update(json!({
                "addSheet": {
                    "properties": {
                        "title": title,
                        "gridProperties": { "rowCount": rows, "columnCount": columns }
                    }
                }
            }))
            .await?;

        replies
            .first()
            .and_then(|reply| reply.pointer("/addSheet/properties"))
            .cloned()
            .map(serde_json::from_value::<SheetProperties>)
            .transpose()
            .map_err(|e| SheetsError::Decode(format!("addSheet reply: {e}")))?
            .ok_or_else(|| SheetsError::Decode("addSheet reply missing properties".into()))
    }

    pub async fn append_columns(&self, sheet_id: i64, count: u32) -> Result<(), SheetsError> {
        self.batch_update(json!({
            "appendDimension": {
                "sheetId": sheet_id,
                "dimension": "COLUMNS",
                "length": count
            }
        }))
        .await?;
        Ok(())
    }

    async fn batch_update(&self, request: Value) -> Result<Vec<Value>, SheetsError> {
        let url = self.url(":batchUpdate", &[])?;
        let response: BatchUpdateResponse = self
            .send(Method::POST, url, Some(json!({ "requests": [request] })))
            .await?
            .json()
            .await
            .map_err(|e| SheetsError::Decode(format!("batchUpdate: {e}")))?;
        Ok(response.replies)
    }
}

fn cell_text(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// 1-based column index to its A1 letters (`1` → `A`, `27` → `AA`).
pub fn column_letter(mut index: usize) -> String {
    let mut letters = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        index = (index - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// A1 range on `sheet`, quoting the sheet name when it needs it.
pub fn a1_range(sheet: &str, cells: &str) -> String {
    if sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        format!("{sheet}!{cells}")
    } else {
        format!("'{}'!{cells}", sheet.replace('\'', "''"))
    }
}
