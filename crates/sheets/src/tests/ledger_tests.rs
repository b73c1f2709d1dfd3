use std::sync::Arc;

use serde_json::json;
use wiremock::{
    matchers::{body_json, header, method, path, query_param},
    Mock, MockServer, ResponseTemplate,
};

use super::*;
use crate::StaticToken;

const SPREADSHEET: &str = "sheet-1";

async fn client(server: &MockServer) -> SheetsClient {
    SheetsClient::with_base_url(
        &server.uri(),
        SPREADSHEET,
        Arc::new(StaticToken("test-token".into())),
    )
    .expect("client")
}

async fn mount_metadata(server: &MockServer, titles: &[(&str, i64)]) {
    let sheets: Vec<_> = titles
        .iter()
        .map(|(title, id)| json!({ "properties": { "sheetId": id, "title": title } }))
        .collect();
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}")))
        .and(query_param("fields", "sheets.properties"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "sheets": sheets })))
        .mount(server)
        .await;
}

async fn mount_header_row(server: &MockServer, headers: &[&str]) {
    Mock::given(method("GET"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}/values/Registros!1:1")))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "Registros!A1:Z1",
            "majorDimension": "ROWS",
            "values": [headers]
        })))
        .mount(server)
        .await;
}

fn record() -> SubmissionRecord {
    SubmissionRecord {
        date: "19/10/2026".into(),
        organization: "SEDUC".into(),
        allocation_code: "2.045.3390-39".into(),
        sequence_number: "2".into(),
        formatted_value: "R$ 1.000,00".into(),
        user_name: "Maria".into(),
    }
}

#[tokio::test]
async fn complete_header_needs_no_changes() {
    let server = MockServer::start().await;
    mount_metadata(&server, &[("Resumo", 0), ("Registros", 7)]).await;
    mount_header_row(&server, &LEDGER_HEADERS).await;
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}:batchUpdate")))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let (ledger, setup) = SheetsLedger::connect(client(&server).await, "Registros")
        .await
        .expect("connect");
    assert_eq!(setup, WorksheetSetup::Ready);
    assert_eq!(ledger.describe(), "sheets:sheet-1/Registros");
}

#[tokio::test]
async fn missing_user_name_column_is_appended_to_header() {
    let server = MockServer::start().await;
    mount_metadata(&server, &[("Registros", 7)]).await;
    mount_header_row(&server, &LEDGER_HEADERS[..5]).await;
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}:batchUpdate")))
        .and(body_json(json!({
            "requests": [{
                "appendDimension": { "sheetId": 7, "dimension": "COLUMNS", "length": 1 }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": SPREADSHEET,
            "replies": [{}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}/values/Registros!F1")))
        .and(query_param("valueInputOption", "USER_ENTERED"))
        .and(body_json(json!({
            "range": "Registros!F1",
            "values": [["Usuario_Nome"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (_, setup) = SheetsLedger::connect(client(&server).await, "Registros")
        .await
        .expect("connect");
    assert_eq!(setup, WorksheetSetup::AddedUserNameColumn);
}

#[tokio::test]
async fn missing_worksheet_is_created_with_full_header() {
    let server = MockServer::start().await;
    mount_metadata(&server, &[("Resumo", 0)]).await;
    Mock::given(method("POST"))
        .and(path(format!("/v4/spreadsheets/{SPREADSHEET}:batchUpdate")))
        .and(body_json(json!({
            "requests": [{
                "addSheet": {
                    "properties": {
                        "title": "Registros",
                        "gridProperties": { "rowCount": 1000, "columnCount": 20 }
                    }
                }
            }]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "spreadsheetId": SPREADSHEET,
            "replies": [{ "addSheet": { "properties": { "sheetId": 42, "title": "Registros" } } }]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/v4/spreadsheets/{SPREADSHEET}/values/Registros!A1:append"
        )))
        .and(body_json(json!({ "values": [LEDGER_HEADERS] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (_, setup) = SheetsLedger::connect(client(&server).await, "Registros")
        .await
        .expect("connect");
    assert_eq!(setup, WorksheetSetup::CreatedWorksheet);
}

#[tokio::test]
async fn append_sends_one_row_per_call() {
    let server = MockServer::start().await;
    mount_metadata(&server, &[("Registros", 7)]).await;
    mount_header_row(&server, &LEDGER_HEADERS).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/v4/spreadsheets/{SPREADSHEET}/values/Registros!A1:append"
        )))
        .and(query_param("valueInputOption", "RAW"))
        .and(query_param("insertDataOption", "INSERT_ROWS"))
        .and(body_json(json!({
            "values": [["19/10/2026", "SEDUC", "2.045.3390-39", "2", "R$ 1.000,00", "Maria"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(2)
        .mount(&server)
        .await;

    let (ledger, _) = SheetsLedger::connect(client(&server).await, "Registros")
        .await
        .expect("connect");
    ledger.append(&record()).await.expect("first append");
    ledger.append(&record()).await.expect("second append");
}

#[tokio::test]
async fn rejected_append_surfaces_status_and_body() {
    let server = MockServer::start().await;
    mount_metadata(&server, &[("Registros", 7)]).await;
    mount_header_row(&server, &LEDGER_HEADERS).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/v4/spreadsheets/{SPREADSHEET}/values/Registros!A1:append"
        )))
        .respond_with(ResponseTemplate::new(403).set_body_string("PERMISSION_DENIED"))
        .mount(&server)
        .await;

    let (ledger, _) = SheetsLedger::connect(client(&server).await, "Registros")
        .await
        .expect("connect");
    let err = ledger.append(&record()).await.expect_err("should fail");
    let message = format!("{err:#}");
    assert!(message.contains("403"), "{message}");
    assert!(message.contains("PERMISSION_DENIED"), "{message}");
}

#[tokio::test]
async fn appended_cells_are_not_reinterpreted_by_sheets() {
    let server = MockServer::start().await;
    mount_metadata(&server, &[("Registros", 7)]).await;
    mount_header_row(&server, &LEDGER_HEADERS).await;
    Mock::given(method("POST"))
        .and(path(format!(
            "/v4/spreadsheets/{SPREADSHEET}/values/Registros!A1:append"
        )))
        .and(query_param("valueInputOption", "RAW"))
        .and(body_json(json!({
            "values": [["05/10/2026", "SEDUC", "2.045.3390-39", "007", "R$ 1.000,00", "Maria"]]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&server)
        .await;

    let (ledger, _) = SheetsLedger::connect(client(&server).await, "Registros")
        .await
        .expect("connect");
    let record = SubmissionRecord {
        date: "05/10/2026".into(),
        sequence_number: "007".into(),
        ..record()
    };
    ledger.append(&record).await.expect("append");
}
