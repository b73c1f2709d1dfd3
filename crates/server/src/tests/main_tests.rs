use super::*;
use axum::{body, body::Body, http::Request};
use reference::ReferenceTable;
use server_api::{ApiContext, CurrencyLocale};
use shared::domain::AllocationRow;
use storage::SqliteLedger;
use tower::ServiceExt;

async fn test_app() -> (Router, SqliteLedger) {
    let (app, ledger, _) = test_app_with_state().await;
    (app, ledger)
}

async fn test_app_with_state() -> (Router, SqliteLedger, Arc<AppState>) {
    let ledger = SqliteLedger::new("sqlite::memory:").await.expect("db");
    let reference = ReferenceTable::from_rows(vec![
        AllocationRow::new("SEDUC", "2.045.3390-39", "1"),
        AllocationRow::new("SEDUC", "2.045.3390-39", "2"),
        AllocationRow::new("SESAU", "2.100.3390-30", "7"),
    ])
    .expect("reference");

    let api = ApiContext {
        reference: Arc::new(reference),
        ledger: Arc::new(ledger.clone()),
        locale: CurrencyLocale::PtBr,
    };
    let state = Arc::new(AppState {
        api,
        sessions: SessionStore::new(),
    });
    (build_router(state.clone()), ledger, state)
}

async fn body_text(response: Response) -> String {
    let bytes = body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body");
    String::from_utf8(bytes.to_vec()).expect("utf8")
}

fn cookie_of(response: &Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .expect("set-cookie")
        .to_string()
}

fn form_post(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header("content-type", "application/x-www-form-urlencoded");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

async fn logged_in_cookie(app: &Router) -> String {
    let response = app
        .clone()
        .oneshot(form_post("/login", None, "name=Maria+Souza&unit=SEDUC"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get(header::LOCATION).and_then(|v| v.to_str().ok()),
        Some("/")
    );
    cookie_of(&response)
}

#[tokio::test]
async fn healthz_reports_ok() {
    let (app, _) = test_app().await;
    let request = Request::get("/healthz").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "ok");
}

#[tokio::test]
async fn first_visit_gets_cookie_and_login_page() {
    let (app, _) = test_app().await;
    let request = Request::get("/").body(Body::empty()).expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(cookie_of(&response).starts_with("dotacao_session="));

    let html = body_text(response).await;
    assert!(html.contains("action=\"/login\""));
    assert!(html.contains("<option value=\"SESAU\">SESAU</option>"));
}

#[tokio::test]
async fn anonymous_traffic_does_not_accumulate_sessions() {
    let (app, _, state) = test_app_with_state().await;
    for uri in ["/", "/api/session", "/?organization=SEDUC"] {
        for _ in 0..50 {
            let request = Request::get(uri).body(Body::empty()).expect("request");
            let response = app.clone().oneshot(request).await.expect("response");
            assert_eq!(response.status(), StatusCode::OK);
        }
    }
    let response = app
        .clone()
        .oneshot(form_post("/login", None, "name=&unit=SEDUC"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let response = app
        .clone()
        .oneshot(form_post("/logout", None, ""))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(state.sessions.len().await, 0);

    let cookie = logged_in_cookie(&app).await;
    assert_eq!(state.sessions.len().await, 1);
    app.oneshot(form_post("/logout", Some(&cookie), ""))
        .await
        .expect("response");
    assert_eq!(state.sessions.len().await, 0);
}

#[tokio::test]
async fn login_replaces_the_pre_login_cookie() {
    let (app, _) = test_app().await;
    let request = Request::get("/").body(Body::empty()).expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    let anonymous = cookie_of(&response);

    let response = app
        .clone()
        .oneshot(form_post("/login", Some(&anonymous), "name=Maria&unit=SEDUC"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let logged_in = cookie_of(&response);
    assert_ne!(logged_in, anonymous);

    let request = Request::get("/api/session")
        .header(header::COOKIE, &anonymous)
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let summary: SessionSummary =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert!(!summary.logged_in);
}

#[tokio::test]
async fn login_with_empty_name_renders_warning() {
    let (app, _) = test_app().await;
    let response = app
        .oneshot(form_post("/login", None, "name=&unit=SEDUC"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Por favor, preencha todos os campos!"));
    assert!(html.contains("<option value=\"SEDUC\" selected>SEDUC</option>"));
}

#[tokio::test]
async fn html_flow_from_login_to_successful_submit() {
    let (app, ledger) = test_app().await;
    let cookie = logged_in_cookie(&app).await;

    let request = Request::get("/?organization=SEDUC&allocation=2.045.3390-39")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
    let html = body_text(response).await;
    assert!(html.contains("Usuário: Maria Souza | Unidade: SEDUC"));
    assert!(html.contains("formaction=\"/submit\""));

    let response = app
        .clone()
        .oneshot(form_post(
            "/submit",
            Some(&cookie),
            "organization=SEDUC&allocation=2.045.3390-39&sequence=2&value=1.000%2C00&date=2026-10-19",
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("Dados enviados com sucesso! Valor: R$ 1.000,00 Data: 19/10/2026"));

    let stored = ledger.list_records().await.expect("records");
    assert_eq!(stored.len(), 1);
    assert_eq!(
        stored[0].record.to_row(),
        [
            "19/10/2026",
            "SEDUC",
            "2.045.3390-39",
            "2",
            "R$ 1.000,00",
            "Maria Souza"
        ]
        .map(String::from)
    );
}

#[tokio::test]
async fn invalid_value_is_rejected_without_append() {
    let (app, ledger) = test_app().await;
    let cookie = logged_in_cookie(&app).await;

    let response = app
        .oneshot(form_post(
            "/submit",
            Some(&cookie),
            "organization=SEDUC&allocation=2.045.3390-39&sequence=1&value=abc&date=",
        ))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let html = body_text(response).await;
    assert!(html.contains("Por favor, insira um valor numérico válido (ex: 1.000,00)"));
    assert!(html.contains("value=\"abc\""));
    assert_eq!(ledger.count().await.expect("count"), 0);
}

#[tokio::test]
async fn logout_returns_to_login_screen() {
    let (app, _) = test_app().await;
    let cookie = logged_in_cookie(&app).await;

    let response = app
        .clone()
        .oneshot(form_post("/logout", Some(&cookie), ""))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let request = Request::get("/api/session")
        .header(header::COOKIE, &cookie)
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    let summary: SessionSummary =
        serde_json::from_str(&body_text(response).await).expect("json");
    assert!(!summary.logged_in);
}

#[tokio::test]
async fn options_endpoint_follows_the_cascade() {
    let (app, _) = test_app().await;
    let request = Request::get("/api/options?organization=SEDUC&allocation=2.045.3390-39")
        .body(Body::empty())
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let options: CascadeOptions = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(options.organizations, vec!["SEDUC", "SESAU"]);
    assert_eq!(options.allocations, vec!["2.045.3390-39"]);
    assert_eq!(options.sequences, vec!["1", "2"]);
}

#[tokio::test]
async fn json_submit_requires_login_then_writes_record() {
    let (app, ledger) = test_app().await;
    let payload = serde_json::json!({
        "organization": "SESAU",
        "allocation": "2.100.3390-30",
        "sequence": "7",
        "value": "250,5",
        "date": "01/03/2026"
    })
    .to_string();

    let request = Request::post("/api/records")
        .header("content-type", "application/json")
        .body(Body::from(payload.clone()))
        .expect("request");
    let response = app.clone().oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let err: ApiError = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(err.code, ErrorCode::Unauthorized);

    let cookie = logged_in_cookie(&app).await;
    let request = Request::post("/api/records")
        .header("content-type", "application/json")
        .header(header::COOKIE, &cookie)
        .body(Body::from(payload))
        .expect("request");
    let response = app.oneshot(request).await.expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let record: SubmissionRecord = serde_json::from_str(&body_text(response).await).expect("json");
    assert_eq!(record.formatted_value, "R$ 250,50");
    assert_eq!(record.date, "01/03/2026");
    assert_eq!(ledger.count().await.expect("count"), 1);
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let (app, ledger) = test_app().await;
    let cookie = logged_in_cookie(&app).await;
    let body = format!("value={}", "9".repeat(MAX_BODY_BYTES + 1));
    let response = app
        .oneshot(form_post("/submit", Some(&cookie), &body))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(ledger.count().await.expect("count"), 0);
}
