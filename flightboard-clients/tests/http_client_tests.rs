//! HTTP Client Tests Against a Local Fake API
//!
//! A small axum server stands in for both the Discord REST API and the
//! Sheets values API so the real reqwest code paths (auth headers, URL
//! encoding, status classification) run end to end.

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use flightboard_clients::{DiscordClient, GoogleSheetsClient, SheetCellStateStore};
use flightboard_core::ApiToken;
use flightboard_render::Renderer;
use flightboard_sync::{
    Backoff, ChatTransport, RetryPolicy, StateStore, SyncJob, TableSource, UpsertCoordinator,
};
use flightboard_test_utils::{
    assertions::{assert_created, assert_edited},
    fixtures, Entry, MemoryStateStore, MessageId, SourceError, StateError, TableRef,
    TransportError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

const BOT_TOKEN: &str = "test-bot-token";
const GOOGLE_TOKEN: &str = "ya29.test-token";
const CHANNEL: u64 = 1_458_203_844_474_572_801;
const UNKNOWN_CHANNEL: u64 = 999;
const SPREADSHEET: &str = "sheet-abc";
const SHEET: &str = "Flight Paths";

// ============================================================================
// FAKE API
// ============================================================================

#[derive(Default)]
struct FakeApi {
    messages: HashMap<u64, Value>,
    next_id: u64,
    rate_limit_next: usize,
    discord_calls: usize,
    cells: Vec<Vec<String>>,
    last_input_option: Option<String>,
}

type Shared = Arc<Mutex<FakeApi>>;

fn discord_error(status: StatusCode, message: &str, code: u64) -> Response {
    (status, Json(json!({ "message": message, "code": code }))).into_response()
}

fn check_discord(api: &mut FakeApi, headers: &HeaderMap, channel: u64) -> Option<Response> {
    api.discord_calls += 1;
    let expected = format!("Bot {}", BOT_TOKEN);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return Some(discord_error(StatusCode::UNAUTHORIZED, "401: Unauthorized", 0));
    }
    if channel == UNKNOWN_CHANNEL {
        return Some(discord_error(StatusCode::NOT_FOUND, "Unknown Channel", 10003));
    }
    if api.rate_limit_next > 0 {
        api.rate_limit_next -= 1;
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "message": "You are being rate limited.",
                "retry_after": 0.01,
                "global": false
            })),
        )
            .into_response();
        response
            .headers_mut()
            .insert("retry-after", HeaderValue::from_static("1"));
        return Some(response);
    }
    None
}

async fn create_message(
    State(api): State<Shared>,
    Path(channel): Path<u64>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut api = api.lock().unwrap();
    if let Some(rejection) = check_discord(&mut api, &headers, channel) {
        return rejection;
    }
    api.next_id += 1;
    let id = 1_458_205_750_617_833_000 + api.next_id;
    api.messages.insert(id, body);
    Json(json!({ "id": id.to_string(), "channel_id": channel.to_string() })).into_response()
}

async fn edit_message(
    State(api): State<Shared>,
    Path((channel, id)): Path<(u64, u64)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let mut api = api.lock().unwrap();
    if let Some(rejection) = check_discord(&mut api, &headers, channel) {
        return rejection;
    }
    match api.messages.get_mut(&id) {
        Some(existing) => {
            *existing = body;
            Json(json!({ "id": id.to_string() })).into_response()
        }
        None => discord_error(StatusCode::NOT_FOUND, "Unknown Message", 10008),
    }
}

fn check_google(headers: &HeaderMap, spreadsheet: &str) -> Option<Response> {
    let expected = format!("Bearer {}", GOOGLE_TOKEN);
    if headers.get("authorization").and_then(|v| v.to_str().ok()) != Some(expected.as_str()) {
        return Some(
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": { "code": 401, "message": "Request had invalid authentication credentials.", "status": "UNAUTHENTICATED" } })),
            )
                .into_response(),
        );
    }
    if spreadsheet != SPREADSHEET {
        return Some(
            (
                StatusCode::FORBIDDEN,
                Json(json!({ "error": { "code": 403, "message": "The caller does not have permission", "status": "PERMISSION_DENIED" } })),
            )
                .into_response(),
        );
    }
    None
}

fn quoted_sheet() -> String {
    format!("'{}'", SHEET)
}

async fn get_values(
    State(api): State<Shared>,
    Path((spreadsheet, range)): Path<(String, String)>,
    headers: HeaderMap,
) -> Response {
    if let Some(rejection) = check_google(&headers, &spreadsheet) {
        return rejection;
    }
    let api = api.lock().unwrap();
    let values: Vec<Vec<String>> = if range == quoted_sheet() {
        // The API drops trailing empty cells from each row.
        api.cells
            .iter()
            .map(|row| {
                let width = row.iter().rposition(|c| !c.is_empty()).map_or(0, |i| i + 1);
                row[..width].to_vec()
            })
            .collect()
    } else if range == format!("{}!A1", quoted_sheet()) {
        match api.cells.first().and_then(|row| row.first()) {
            Some(value) if !value.is_empty() => vec![vec![value.clone()]],
            _ => Vec::new(),
        }
    } else {
        return (StatusCode::BAD_REQUEST, format!("unexpected range {}", range)).into_response();
    };

    let mut body = json!({ "range": range, "majorDimension": "ROWS" });
    if !values.is_empty() {
        body["values"] = json!(values);
    }
    Json(body).into_response()
}

async fn update_values(
    State(api): State<Shared>,
    Path((spreadsheet, range)): Path<(String, String)>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if let Some(rejection) = check_google(&headers, &spreadsheet) {
        return rejection;
    }
    if range != format!("{}!A1", quoted_sheet()) {
        return (StatusCode::BAD_REQUEST, format!("unexpected range {}", range)).into_response();
    }
    let mut api = api.lock().unwrap();
    api.last_input_option = query.get("valueInputOption").cloned();
    let value = body["values"][0][0].as_str().unwrap_or_default().to_string();
    if api.cells.is_empty() {
        api.cells.push(vec![String::new()]);
    }
    api.cells[0][0] = value;
    Json(json!({ "updatedCells": 1 })).into_response()
}

async fn spawn_fake(api: Shared) -> String {
    let router = Router::new()
        .route("/api/channels/:channel/messages", post(create_message))
        .route("/api/channels/:channel/messages/:id", patch(edit_message))
        .route(
            "/v4/spreadsheets/:spreadsheet/values/:range",
            get(get_values).put(update_values),
        )
        .with_state(api);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

fn sheet_rows() -> Vec<Vec<String>> {
    fixtures::board_snapshot().rows
}

fn discord(base: &str, channel: u64, token: &str) -> DiscordClient {
    DiscordClient::new(
        ApiToken::new("DISCORD_TOKEN", token.to_string()).unwrap(),
        channel,
        Duration::from_secs(5),
    )
    .unwrap()
    .with_base_url(format!("{}/api", base))
}

fn sheets(base: &str) -> GoogleSheetsClient {
    GoogleSheetsClient::new(
        ApiToken::new("GOOGLE_ACCESS_TOKEN", GOOGLE_TOKEN.to_string()).unwrap(),
        Duration::from_secs(5),
    )
    .unwrap()
    .with_base_url(format!("{}/v4", base))
}

fn table() -> TableRef {
    TableRef::new(SPREADSHEET, SHEET)
}

fn quick_retry() -> RetryPolicy {
    RetryPolicy::new(3, Backoff::Fixed(Duration::from_millis(10)))
}

fn board() -> flightboard_core::RenderedMessage {
    fixtures::rendered_message(
        vec![Entry {
            name: "🏙️TC Torn".to_string(),
            body: "🛫 Out: **10:00** 🛬 In: **10:05** ↩ Return: **10:20**\n📦 Item: **Plushie**"
                .to_string(),
        }],
        1,
    )
}

// ============================================================================
// DISCORD
// ============================================================================

#[tokio::test]
async fn discord_create_then_edit() {
    let api = Shared::default();
    let base = spawn_fake(api.clone()).await;
    let client = discord(&base, CHANNEL, BOT_TOKEN);

    let id = client.create_message(&board()).await.unwrap();
    client.edit_message(id, &board()).await.unwrap();

    let api = api.lock().unwrap();
    let stored = &api.messages[&id.get()];
    assert_eq!(stored["embeds"][0]["fields"][0]["name"], "🏙️TC Torn");
    assert_eq!(stored["embeds"][0]["color"], 0x3498DB);
    assert_eq!(api.discord_calls, 2);
}

#[tokio::test]
async fn discord_edit_of_deleted_message_is_not_found() {
    let base = spawn_fake(Shared::default()).await;
    let client = discord(&base, CHANNEL, BOT_TOKEN);

    let err = client
        .edit_message(MessageId::new(123).unwrap(), &board())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TransportError::NotFound {
            message_id: "123".to_string()
        }
    );
}

#[tokio::test]
async fn discord_unknown_channel_and_bad_token_are_permanent() {
    let base = spawn_fake(Shared::default()).await;

    let unknown = discord(&base, UNKNOWN_CHANNEL, BOT_TOKEN)
        .edit_message(MessageId::new(123).unwrap(), &board())
        .await
        .unwrap_err();
    assert!(matches!(unknown, TransportError::Permanent { status: Some(404), .. }));

    let unauthorized = discord(&base, CHANNEL, "wrong")
        .create_message(&board())
        .await
        .unwrap_err();
    assert!(matches!(unauthorized, TransportError::Permanent { status: Some(401), .. }));
}

#[tokio::test]
async fn discord_rate_limit_reports_body_hint() {
    let api = Shared::default();
    api.lock().unwrap().rate_limit_next = 1;
    let base = spawn_fake(api).await;

    let err = discord(&base, CHANNEL, BOT_TOKEN)
        .create_message(&board())
        .await
        .unwrap_err();

    assert_eq!(
        err,
        TransportError::RateLimited {
            retry_after_ms: Some(10)
        }
    );
}

#[tokio::test]
async fn discord_connection_refused_is_transient() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = discord(&format!("http://{}", addr), CHANNEL, BOT_TOKEN)
        .create_message(&board())
        .await
        .unwrap_err();

    assert!(err.is_retryable(), "got {:?}", err);
}

#[tokio::test]
async fn coordinator_over_discord_retries_and_recovers() {
    let api = Shared::default();
    api.lock().unwrap().rate_limit_next = 2;
    let base = spawn_fake(api.clone()).await;
    let coordinator = UpsertCoordinator::new(
        Arc::new(discord(&base, CHANNEL, BOT_TOKEN)),
        quick_retry(),
        "A1",
    );
    // A stale id from a message deleted by a moderator.
    let state = MemoryStateStore::with_slot("A1", "42");

    let created = assert_created(&coordinator.sync(&board(), &state).await);
    assert_eq!(state.read_slot("A1").await.unwrap(), Some(created.to_string()));

    assert_edited(&coordinator.sync(&board(), &state).await, created);
    assert_eq!(api.lock().unwrap().messages.len(), 1);
}

// ============================================================================
// SHEETS
// ============================================================================

#[tokio::test]
async fn sheets_fetch_keeps_short_rows_short() {
    let api = Shared::default();
    api.lock().unwrap().cells = sheet_rows();
    let base = spawn_fake(api).await;

    let snapshot = sheets(&base).fetch_rows(&table()).await.unwrap();

    assert_eq!(snapshot.len(), sheet_rows().len());
    assert!(snapshot.rows[0].is_empty());
    assert_eq!(snapshot.rows[1].len(), 7);
    assert_eq!(snapshot.rows[4], vec!["Canada", "09:30"]);
    assert_eq!(snapshot.rows[5].len(), 7);
}

#[tokio::test]
async fn sheets_five_cell_row_is_dropped_by_renderer() {
    let api = Shared::default();
    api.lock().unwrap().cells = vec![
        vec![String::new()],
        fixtures::HEADER.iter().map(|c| c.to_string()).collect(),
        ["Canada", "09:30", "10:10", "10:50", "Maple Leaf"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
        ["Mexico", "10:00", "10:26", "10:52", "Dahlia", "", "MX"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    ];
    let base = spawn_fake(api).await;

    let snapshot = sheets(&base).fetch_rows(&table()).await.unwrap();
    assert_eq!(snapshot.rows[2].len(), 5);

    let rendered = Renderer::default().render(&snapshot, fixtures::fixed_time());
    assert_eq!(rendered.data_rows, 2);
    let names: Vec<&str> = rendered.entries.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, vec!["🇲🇽MX Mexico"]);
}

#[tokio::test]
async fn sheets_errors_are_source_errors() {
    let base = spawn_fake(Shared::default()).await;

    let err = sheets(&base)
        .fetch_rows(&TableRef::new("someone-elses-sheet", SHEET))
        .await
        .unwrap_err();

    match err {
        SourceError::Status { status, message, .. } => {
            assert_eq!(status, 403);
            assert!(message.starts_with("PERMISSION_DENIED"));
        }
        other => panic!("expected Status, got {:?}", other),
    }
}

#[tokio::test]
async fn sheet_cell_state_roundtrip() {
    let api = Shared::default();
    api.lock().unwrap().cells = sheet_rows();
    let base = spawn_fake(api.clone()).await;
    let store = SheetCellStateStore::new(sheets(&base), table());

    assert_eq!(store.read_slot("A1").await.unwrap(), None);
    store.write_slot("A1", "1458205750617833596").await.unwrap();
    assert_eq!(
        store.read_slot("A1").await.unwrap().as_deref(),
        Some("1458205750617833596")
    );
    assert_eq!(api.lock().unwrap().last_input_option.as_deref(), Some("RAW"));
}

#[tokio::test]
async fn sheet_cell_state_errors_are_remote() {
    let base = spawn_fake(Shared::default()).await;
    let store = SheetCellStateStore::new(sheets(&base), TableRef::new("other", SHEET));

    assert!(matches!(
        store.write_slot("A1", "1").await,
        Err(StateError::Remote { .. })
    ));
}

// ============================================================================
// END TO END
// ============================================================================

#[tokio::test]
async fn job_posts_once_then_edits_with_state_in_sheet() {
    let api = Shared::default();
    api.lock().unwrap().cells = sheet_rows();
    let base = spawn_fake(api.clone()).await;

    let sheets = sheets(&base);
    let job = SyncJob::new(
        table(),
        Arc::new(sheets.clone()),
        Arc::new(SheetCellStateStore::new(sheets, table())),
        Renderer::default(),
        UpsertCoordinator::new(Arc::new(discord(&base, CHANNEL, BOT_TOKEN)), quick_retry(), "A1"),
    );

    let created = assert_created(&job.run().await);
    assert_eq!(api.lock().unwrap().cells[0][0], created.to_string());

    // The id now sits in row 0 of the sheet; rendering still skips it.
    assert_edited(&job.run().await, created);

    let api = api.lock().unwrap();
    assert_eq!(api.messages.len(), 1);
    let fields = api.messages[&created.get()]["embeds"][0]["fields"]
        .as_array()
        .unwrap()
        .clone();
    let names: Vec<&str> = fields.iter().filter_map(|f| f["name"].as_str()).collect();
    assert_eq!(
        names,
        vec!["🌍AR argentina", "🇰🇾CI Cayman Islands", "🇯🇵JP Japan", "🇲🇽MX Mexico"]
    );
}
