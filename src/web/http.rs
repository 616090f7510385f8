// fetch()-based client for the points / tickets API.

use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{JsFuture, spawn_local};
use web_sys::{Request, RequestInit, Response, window};

use crate::error::PersistenceError;
use crate::persistence::wire::{self, SaveUserRequest, UpdateTicketsRequest};
use crate::persistence::{LeaderboardEntry, Persistence, UserRecord, Wallet};

async fn fetch_text(url: &str, method: &str, body: Option<String>) -> Result<String, PersistenceError> {
    let opts = RequestInit::new();
    opts.set_method(method);
    if let Some(body) = body.as_deref() {
        opts.set_body(&wasm_bindgen::JsValue::from_str(body));
    }
    let request = Request::new_with_str_and_init(url, &opts)?;
    request.headers().set("Content-Type", "application/json")?;

    let win = window().ok_or_else(|| PersistenceError::Network("no window".to_string()))?;
    let resp: Response = JsFuture::from(win.fetch_with_request(&request)).await?.dyn_into()?;
    if !resp.ok() {
        return Err(PersistenceError::Status(resp.status()));
    }
    let text = JsFuture::from(resp.text()?).await?;
    text.as_string()
        .ok_or_else(|| PersistenceError::Network("response body is not text".to_string()))
}

pub async fn fetch_user_data(api_base: &str, username: &str) -> Result<Wallet, PersistenceError> {
    let name: String = js_sys::encode_uri_component(username).into();
    let body = fetch_text(&format!("{api_base}/getUserData?username={name}"), "GET", None).await?;
    wire::decode_user_data(&body)
}

pub async fn update_tickets(api_base: &str, username: &str, tickets: u32) -> Result<UserRecord, PersistenceError> {
    let payload = serde_json::to_string(&UpdateTicketsRequest { username, tickets })?;
    let body = fetch_text(&format!("{api_base}/updateTickets"), "POST", Some(payload)).await?;
    wire::decode_record(&body)
}

pub async fn save_user(api_base: &str, username: &str, points: u32) -> Result<UserRecord, PersistenceError> {
    let payload = serde_json::to_string(&SaveUserRequest { username, points })?;
    let body = fetch_text(&format!("{api_base}/saveUser"), "POST", Some(payload)).await?;
    wire::decode_record(&body)
}

pub async fn top_users(api_base: &str) -> Result<Vec<LeaderboardEntry>, PersistenceError> {
    let body = fetch_text(&format!("{api_base}/topUsers"), "GET", None).await?;
    wire::decode_top_users(&body)
}

/// Called once the saved score comes back (or fails to).
pub type SavedHandler = Rc<dyn Fn(u32, Result<UserRecord, PersistenceError>)>;

/// Fire-and-forget persistence over HTTP. Failures are logged; the ticket
/// decrement already applied locally is kept either way.
pub struct HttpPersistence {
    api_base: String,
    on_saved: SavedHandler,
}

impl HttpPersistence {
    pub fn new(api_base: impl Into<String>, on_saved: SavedHandler) -> Self {
        Self {
            api_base: api_base.into(),
            on_saved,
        }
    }
}

impl Persistence for HttpPersistence {
    fn consume_ticket(&self, username: &str, remaining_tickets: u32) {
        let base = self.api_base.clone();
        let username = username.to_string();
        spawn_local(async move {
            if let Err(err) = update_tickets(&base, &username, remaining_tickets).await {
                tracing::error!(username = %username, "error updating tickets: {err}");
            }
        });
    }

    fn finalize_score(&self, username: &str, score: u32) {
        let base = self.api_base.clone();
        let username = username.to_string();
        let on_saved = self.on_saved.clone();
        spawn_local(async move {
            let result = save_user(&base, &username, score).await;
            if let Err(err) = &result {
                tracing::error!(username = %username, score, "error saving user: {err}");
            }
            on_saved(score, result);
        });
    }
}
