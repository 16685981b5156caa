//! In-process mock of the Telegram Bot API.
//!
//! Tests point a [`teloxide::Bot`] at a local axum server that answers
//! the handful of methods the gate uses. Responses are scripted per
//! test (chat-member standings, resolvable chats, failing methods) and
//! every request is recorded for assertions.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};

use axum::{body::Bytes, extract::State, http::Uri, routing::post, Json, Router};
use serde_json::{json, Value};
use teloxide::types::{CallbackQuery, Me, Message, Update};
use teloxide::Bot;
use tokio::sync::oneshot;

/// One recorded Telegram API call
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub body: Value,
}

/// Scripted error for one API method, served `remaining` more times
#[derive(Debug, Clone)]
struct Failure {
    response: Value,
    remaining: u32,
}

#[derive(Clone)]
struct MockTelegramApi {
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    standings: Arc<Mutex<HashMap<(String, u64), String>>>,
    chats: Arc<Mutex<HashMap<String, Value>>>,
    failures: Arc<Mutex<HashMap<String, Failure>>>,
    next_message_id: Arc<AtomicI64>,
}

impl MockTelegramApi {
    fn new() -> Self {
        Self {
            requests: Arc::new(Mutex::new(Vec::new())),
            standings: Arc::new(Mutex::new(HashMap::new())),
            chats: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            next_message_id: Arc::new(AtomicI64::new(1)),
        }
    }

    fn scripted_failure(&self, method: &str) -> Option<Value> {
        let mut failures = self.failures.lock().expect("lock failures");
        let failure = failures.get_mut(method)?;
        let response = failure.response.clone();
        failure.remaining -= 1;
        if failure.remaining == 0 {
            failures.remove(method);
        }
        Some(response)
    }

    fn chat_member_response(&self, body: &Value) -> Value {
        let chat = canonical_chat_id(&body["chat_id"]);
        let user = body["user_id"].as_u64().unwrap_or_default();
        let standings = self.standings.lock().expect("lock standings");
        match standings.get(&(chat, user)) {
            Some(status) => json!({"ok": true, "result": chat_member(status, user)}),
            None => api_error("Bad Request: user not found"),
        }
    }

    fn chat_response(&self, body: &Value) -> Value {
        let id = canonical_chat_id(&body["chat_id"]);
        let chats = self.chats.lock().expect("lock chats");
        match chats.get(&id) {
            Some(chat) => json!({"ok": true, "result": chat}),
            None => api_error("Bad Request: chat not found"),
        }
    }

    fn respond(&self, method: &str, body: &Value) -> Value {
        match method {
            "GetMe" => json!({"ok": true, "result": me_fixture()}),
            "GetChatMember" => self.chat_member_response(body),
            "GetChat" => self.chat_response(body),
            "SendMessage" => {
                let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
                json!({"ok": true, "result": message_result(id, body)})
            }
            "EditMessageText" => {
                let id = body["message_id"].as_i64().unwrap_or(1);
                json!({"ok": true, "result": message_result(id, body)})
            }
            _ => json!({"ok": true, "result": true}),
        }
    }
}

/// Key form of a `chat_id` request field, which arrives as either a
/// numeric id or an `@handle` string
fn canonical_chat_id(value: &Value) -> String {
    match value.as_str() {
        Some(handle) => handle.to_string(),
        None => value.as_i64().unwrap_or_default().to_string(),
    }
}

async fn telegram_api_handler(
    State(api): State<MockTelegramApi>,
    uri: Uri,
    body: Bytes,
) -> Json<Value> {
    let method = uri.path().rsplit('/').next().unwrap_or_default().to_string();
    let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);

    api.requests
        .lock()
        .expect("lock requests")
        .push(CapturedRequest {
            method: method.clone(),
            body: body.clone(),
        });

    if let Some(error) = api.scripted_failure(&method) {
        return Json(error);
    }
    Json(api.respond(&method, &body))
}

/// A running mock API server plus a [`Bot`] pointed at it
pub struct TestServer {
    pub bot: Bot,
    api: MockTelegramApi,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub async fn start() -> Self {
        let api = MockTelegramApi::new();
        let app = Router::new()
            .route("/{*path}", post(telegram_api_handler))
            .with_state(api.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .expect("serve mock telegram api");
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let api_url = reqwest::Url::parse(&format!("http://{addr}/")).expect("parse api url");
        let bot = Bot::new("test-token").set_api_url(api_url);

        Self {
            bot,
            api,
            shutdown: Some(shutdown_tx),
        }
    }

    /// Script the chat-member status returned for `user` in `chat`.
    ///
    /// `chat` is an `@handle` or a numeric chat id; unscripted pairs
    /// answer with a "user not found" rejection.
    pub fn set_standing(&self, chat: impl ToString, user: u64, status: &str) {
        self.api
            .standings
            .lock()
            .expect("lock standings")
            .insert((chat.to_string(), user), status.to_string());
    }

    /// Script the chat document returned by `getChat` for `id`
    pub fn set_chat(&self, id: impl ToString, chat: Value) {
        self.api
            .chats
            .lock()
            .expect("lock chats")
            .insert(id.to_string(), chat);
    }

    /// Make `method` answer with `response` for the next `times` calls
    pub fn fail_method(&self, method: &str, response: Value, times: u32) {
        self.api.failures.lock().expect("lock failures").insert(
            method.to_string(),
            Failure {
                response,
                remaining: times,
            },
        );
    }

    /// Bodies of all recorded calls to `method`, in arrival order
    pub fn requests_of(&self, method: &str) -> Vec<Value> {
        self.api
            .requests
            .lock()
            .expect("lock requests")
            .iter()
            .filter(|r| r.method == method)
            .map(|r| r.body.clone())
            .collect()
    }

    pub fn request_count(&self, method: &str) -> usize {
        self.requests_of(method).len()
    }

    pub fn total_requests(&self) -> usize {
        self.api.requests.lock().expect("lock requests").len()
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

/// Telegram-style error body with the given description
pub fn api_error(description: &str) -> Value {
    json!({"ok": false, "error_code": 400, "description": description})
}

/// Telegram-style flood-wait error body
pub fn flood_wait_error() -> Value {
    json!({
        "ok": false,
        "error_code": 429,
        "description": "Too Many Requests: retry after 1",
        "parameters": {"retry_after": 1}
    })
}

/// Channel document for scripting `getChat` responses
pub fn channel_info(id: i64, title: &str, username: &str) -> Value {
    json!({
        "id": id,
        "type": "channel",
        "title": title,
        "username": username,
        "accent_color_id": 0,
        "max_reaction_count": 11,
        "accepted_gift_types": {
            "unlimited_gifts": false,
            "limited_gifts": false,
            "unique_gifts": false,
            "premium_subscription": false
        }
    })
}

fn me_fixture() -> Value {
    json!({
        "id": 8_000_000_001_i64,
        "is_bot": true,
        "first_name": "Gate Bot",
        "username": "subgate_bot",
        "can_join_groups": true,
        "can_read_all_group_messages": true,
        "supports_inline_queries": false,
        "can_connect_to_business": false,
        "has_main_web_app": false
    })
}

fn chat_member(status: &str, user_id: u64) -> Value {
    let user = json!({"id": user_id, "is_bot": false, "first_name": "Test"});
    match status {
        "creator" => json!({"status": "creator", "user": user, "is_anonymous": false}),
        "administrator" => json!({
            "status": "administrator",
            "user": user,
            "can_be_edited": false,
            "is_anonymous": false,
            "can_manage_chat": true,
            "can_delete_messages": true,
            "can_manage_video_chats": false,
            "can_restrict_members": true,
            "can_promote_members": false,
            "can_change_info": true,
            "can_invite_users": true,
            "can_post_stories": false,
            "can_edit_stories": false,
            "can_delete_stories": false
        }),
        "kicked" => json!({"status": "kicked", "user": user, "until_date": 0}),
        other => json!({"status": other, "user": user}),
    }
}

fn message_result(message_id: i64, request: &Value) -> Value {
    let chat_id = request["chat_id"].as_i64().unwrap_or(1);
    let chat = if chat_id < 0 {
        json!({"id": chat_id, "type": "supergroup", "title": "Test Group"})
    } else {
        json!({"id": chat_id, "type": "private", "first_name": "Test"})
    };
    json!({
        "message_id": message_id,
        "date": 1_700_000_000,
        "chat": chat,
        "text": request["text"].as_str().unwrap_or("")
    })
}

/// The bot's own identity, as the dispatcher would inject it
pub fn me() -> Me {
    serde_json::from_value(me_fixture()).expect("valid me fixture")
}

/// Text message posted in a supergroup
pub fn group_text_message(chat_id: i64, user_id: u64, message_id: i32, text: &str) -> Message {
    serde_json::from_value(json!({
        "message_id": message_id,
        "date": 1_700_000_000,
        "chat": {"id": chat_id, "type": "supergroup", "title": "Test Group"},
        "from": {"id": user_id, "is_bot": false, "first_name": "Alice", "username": "alice"},
        "text": text
    }))
    .expect("valid group message fixture")
}

/// Group message without an author, like an automatic channel forward
pub fn authorless_group_message(chat_id: i64, message_id: i32, text: &str) -> Message {
    serde_json::from_value(json!({
        "message_id": message_id,
        "date": 1_700_000_000,
        "chat": {"id": chat_id, "type": "supergroup", "title": "Test Group"},
        "text": text
    }))
    .expect("valid authorless message fixture")
}

/// Text message sent to the bot in a private chat
pub fn private_text_message(user_id: u64, text: &str) -> Message {
    serde_json::from_value(json!({
        "message_id": 1,
        "date": 1_700_000_000,
        "chat": {"id": user_id, "type": "private", "first_name": "Alice"},
        "from": {"id": user_id, "is_bot": false, "first_name": "Alice", "username": "alice"},
        "text": text
    }))
    .expect("valid private message fixture")
}

/// A bot-sent notice in a private chat, as a verify-button target
pub fn private_prompt(user_id: u64, message_id: i32) -> Message {
    serde_json::from_value(json!({
        "message_id": message_id,
        "date": 1_700_000_000,
        "chat": {"id": user_id, "type": "private", "first_name": "Alice"},
        "text": "prompt"
    }))
    .expect("valid prompt fixture")
}

/// Callback query pressed by `user_id` on `prompt`
pub fn callback_on(user_id: u64, prompt: &Message, data: &str) -> CallbackQuery {
    serde_json::from_value(json!({
        "id": "cq-1",
        "from": {"id": user_id, "is_bot": false, "first_name": "Alice"},
        "message": serde_json::to_value(prompt).expect("serialize prompt"),
        "chat_instance": "test-instance",
        "data": data
    }))
    .expect("valid callback fixture")
}

/// Callback query whose original message Telegram no longer references
pub fn detached_callback(user_id: u64, data: &str) -> CallbackQuery {
    serde_json::from_value(json!({
        "id": "cq-1",
        "from": {"id": user_id, "is_bot": false, "first_name": "Alice"},
        "chat_instance": "test-instance",
        "data": data
    }))
    .expect("valid detached callback fixture")
}

/// Wrap a message in an update, as polling would deliver it.
///
/// `Update` must be parsed from text: its hand-written deserializer
/// reads map keys as borrowed strings, which `from_value` cannot
/// provide, silently yielding `UpdateKind::Error`.
pub fn message_update(msg: &Message) -> Update {
    let update = json!({
        "update_id": 1,
        "message": serde_json::to_value(msg).expect("serialize message")
    });
    serde_json::from_str(&update.to_string()).expect("valid message update")
}

/// Wrap a callback query in an update
pub fn callback_update(query: &CallbackQuery) -> Update {
    let update = json!({
        "update_id": 2,
        "callback_query": serde_json::to_value(query).expect("serialize query")
    });
    serde_json::from_str(&update.to_string()).expect("valid callback update")
}
