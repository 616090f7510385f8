//! Browser shell: mounts the game on a canvas, wires pointer / touch input,
//! drives frames from `requestAnimationFrame` and keeps the page header in
//! sync with the session.
//!
//! All game state lives in one `thread_local!` slot. Every frame and every
//! input event takes a single `borrow_mut` for its whole step, so a tick and a
//! tap never see each other's half-applied changes.

use std::cell::RefCell;
use std::rc::Rc;

use serde::Deserialize;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use web_sys::{CanvasRenderingContext2d, Document, HtmlCanvasElement, HtmlElement, MouseEvent, Touch, TouchEvent, window};

use crate::board::Surface;
use crate::clock::{FrameControl, FrameScheduler};
use crate::config::{EngineConfig, WebConfig};
use crate::error::{EngineError, PersistenceError};
use crate::input::{PointerId, ScreenPoint, ViewportRect};
use crate::persistence::UserRecord;
use crate::session::{FrameOutcome, GameSession, Phase, ReleaseOutcome, StartOutcome, TapOutcome};

pub mod host;
pub mod http;
pub mod logging;
pub mod render;
pub mod scheduler;

use http::HttpPersistence;
use render::Renderer;
use scheduler::AnimationFrameScheduler;

/// JSON accepted by `mount_game`: `{"engine": {...}, "web": {...}}`, both optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PageConfig {
    engine: Option<serde_json::Value>,
    web: WebConfig,
}

struct WebGame {
    session: GameSession<HttpPersistence>,
    canvas: HtmlCanvasElement,
    renderer: Renderer,
    scheduler: AnimationFrameScheduler,
    doc: Document,
    web: WebConfig,
}

thread_local! {
    static GAME: RefCell<Option<WebGame>> = const { RefCell::new(None) };
}

fn now_ms() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn random_seed() -> u64 {
    let mut buf = [0u8; 8];
    match getrandom::getrandom(&mut buf) {
        Ok(()) => u64::from_le_bytes(buf),
        Err(err) => {
            tracing::warn!("no browser entropy ({err}), seeding from the clock");
            now_ms().to_bits()
        }
    }
}

/// Mount the game on `<canvas id=canvas_id>`. Fails if the page is missing the
/// canvas or a 2d context; the game never runs against a half-built page.
#[wasm_bindgen]
pub fn mount_game(canvas_id: &str, config_json: Option<String>) -> Result<(), JsValue> {
    mount(canvas_id, config_json.as_deref()).map_err(|err| {
        tracing::error!("mount failed: {err}");
        JsValue::from(err)
    })
}

fn mount(canvas_id: &str, config_json: Option<&str>) -> Result<(), EngineError> {
    let win = window().ok_or(EngineError::NoWindow)?;
    let doc = win.document().ok_or(EngineError::NoDocument)?;
    let canvas: HtmlCanvasElement = doc
        .get_element_by_id(canvas_id)
        .ok_or_else(|| EngineError::MissingElement(canvas_id.to_string()))?
        .dyn_into()
        .map_err(|_| EngineError::NotACanvas(canvas_id.to_string()))?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or(EngineError::NoContext)?
        .dyn_into()
        .map_err(|_| EngineError::NoContext)?;

    let user_agent = win.navigator().user_agent().unwrap_or_default();
    let page: PageConfig = match config_json {
        Some(json) => serde_json::from_str(json)?,
        None => PageConfig::default(),
    };
    let engine = match page.engine {
        Some(value) => EngineConfig::from_value(value, &user_agent)?,
        None => EngineConfig::for_user_agent(&user_agent),
    };
    logging::init(&engine.log_filter);

    let webapp = host::webapp();
    let username = host::identity(webapp.as_ref());
    if let Some(app) = webapp.as_ref() {
        host::apply_theme(app, &doc);
        host::watch_theme(app, &doc);
        host::ready(app);
    }

    let on_saved: http::SavedHandler = Rc::new(on_score_saved);
    let persistence = HttpPersistence::new(page.web.api_base.clone(), on_saved);
    let session = GameSession::new(engine, username.clone(), persistence, random_seed())?;
    let game = WebGame {
        session,
        canvas: canvas.clone(),
        renderer: Renderer::new(canvas.clone(), ctx),
        scheduler: AnimationFrameScheduler::new(),
        doc,
        web: page.web,
    };
    game.set_text(&game.web.user_info_id, &username);
    game.refresh_header();
    game.renderer.clear();
    let api_base = game.web.api_base.clone();
    GAME.with(|g| g.replace(Some(game)));

    attach_input(&canvas)?;
    tracing::info!(username = %username, canvas = canvas_id, "game mounted");

    spawn_local(async move {
        match http::fetch_user_data(&api_base, &username).await {
            Ok(wallet) => {
                with_game(|game| {
                    game.session.load_wallet(wallet);
                    game.refresh_header();
                });
            }
            Err(err) => tracing::error!(username = %username, "error fetching user data: {err}"),
        }
    });
    Ok(())
}

fn with_game<R>(f: impl FnOnce(&mut WebGame) -> R) -> Option<R> {
    GAME.with(|cell| cell.borrow_mut().as_mut().map(f))
}

fn on_score_saved(score: u32, result: Result<UserRecord, PersistenceError>) {
    with_game(|game| {
        if let Ok(record) = &result {
            game.session.record_points(record.points);
            game.refresh_header();
        }
        if let Some(url) = game.web.transition_url.as_deref() {
            let target = format!("{url}?score={score}");
            if let Some(Err(err)) = window().map(|w| w.location().replace(&target)) {
                tracing::warn!("redirect to {target} failed: {}", crate::error::js_message(&err));
            }
        }
    });
}

/// Start a run. Returns false when no ticket is available or a run (or its
/// game-over screen) is still up.
#[wasm_bindgen]
pub fn play() -> Result<bool, JsValue> {
    let started = with_game(|game| game.start()).unwrap_or(Ok(false))?;
    if !started {
        return Ok(false);
    }
    // Loop frames outside the borrow taken by `start`.
    with_game(|game| {
        game.scheduler.request_tick(Box::new(|now| {
            with_game(|game| game.on_frame(now)).unwrap_or(FrameControl::Stop)
        }));
    });
    Ok(true)
}

#[wasm_bindgen]
pub fn dismiss_game_over() -> bool {
    with_game(|game| {
        let dismissed = game.session.dismiss();
        if dismissed {
            game.set_visible(&game.web.game_over_id, false);
            game.set_visible(&game.web.start_screen_id, true);
            game.set_visible(&game.web.footer_id, true);
            game.renderer.clear();
        }
        dismissed
    })
    .unwrap_or(false)
}

/// The canvas drawing size changed; a running board is rebuilt for it.
#[wasm_bindgen]
pub fn resize_game(width: u32, height: u32) -> Result<(), JsValue> {
    with_game(|game| {
        game.canvas.set_width(width);
        game.canvas.set_height(height);
        game.session.resize(Surface::new(width as f64, height as f64))
    })
    .unwrap_or(Ok(()))
    .map_err(JsValue::from)
}

#[wasm_bindgen]
pub fn game_score() -> u32 {
    with_game(|game| game.session.score()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn game_phase() -> String {
    let phase = with_game(|game| game.session.phase()).unwrap_or(Phase::Idle);
    match phase {
        Phase::Idle => "idle",
        Phase::Running => "running",
        Phase::Over => "over",
    }
    .to_string()
}

/// Top ten players as a JSON array of `{username, points}`.
#[wasm_bindgen]
pub async fn top_users() -> Result<JsValue, JsValue> {
    let base = with_game(|game| game.web.api_base.clone()).unwrap_or_default();
    let rows = http::top_users(&base)
        .await
        .map_err(|err| JsValue::from_str(&err.to_string()))?;
    let json = serde_json::to_string(&rows).map_err(|err| JsValue::from_str(&err.to_string()))?;
    Ok(JsValue::from_str(&json))
}

impl WebGame {
    fn surface(&self) -> Surface {
        Surface::new(self.canvas.width() as f64, self.canvas.height() as f64)
    }

    fn start(&mut self) -> Result<bool, JsValue> {
        let outcome = self.session.start(now_ms(), self.surface()).map_err(JsValue::from)?;
        match outcome {
            StartOutcome::Started { .. } => {
                self.refresh_header();
                self.set_visible(&self.web.start_screen_id, false);
                self.set_visible(&self.web.footer_id, false);
                self.set_visible(&self.web.game_over_id, false);
                Ok(true)
            }
            StartOutcome::NoTickets => {
                if let Some(w) = window() {
                    w.alert_with_message("No more tickets available!").ok();
                }
                Ok(false)
            }
            StartOutcome::NotIdle => Ok(false),
        }
    }

    fn on_frame(&mut self, now: f64) -> FrameControl {
        let outcome = self.session.frame(now);
        self.renderer.draw(self.session.board(), self.session.score());
        match outcome {
            FrameOutcome::Running => FrameControl::Continue,
            FrameOutcome::Ended(_) => {
                self.show_game_over();
                FrameControl::Stop
            }
            FrameOutcome::Inactive => FrameControl::Stop,
        }
    }

    fn viewport(&self) -> ViewportRect {
        let rect = self.canvas.get_bounding_client_rect();
        ViewportRect::new(rect.left(), rect.top(), rect.width(), rect.height())
    }

    fn on_press(&mut self, pointer: PointerId, client_x: f64, client_y: f64) {
        let point = ScreenPoint::new(client_x, client_y);
        if let TapOutcome::Ended(_) = self.session.press(pointer, point, self.viewport(), now_ms()) {
            self.show_game_over();
        }
    }

    fn on_release(&mut self, pointer: PointerId) {
        if let ReleaseOutcome::Ended(_) = self.session.release(pointer, now_ms()) {
            self.show_game_over();
        }
    }

    fn show_game_over(&self) {
        let Some(over) = self.session.game_over() else {
            return;
        };
        self.refresh_header();
        self.set_text(&self.web.game_over_id, &format!("Game over! Score: {}", over.score));
        self.set_visible(&self.web.game_over_id, true);
    }

    fn refresh_header(&self) {
        let wallet = self.session.wallet();
        self.set_text(&self.web.points_id, &format!("Points: {}", wallet.points));
        self.set_text(&self.web.tickets_id, &format!("Tickets: {}", wallet.tickets));
    }

    fn set_text(&self, id: &str, text: &str) {
        if let Some(el) = self.doc.get_element_by_id(id) {
            el.set_text_content(Some(text));
        }
    }

    fn set_visible(&self, id: &str, visible: bool) {
        let Some(el) = self.doc.get_element_by_id(id).and_then(|e| e.dyn_into::<HtmlElement>().ok()) else {
            return;
        };
        let display = if visible { "" } else { "none" };
        if let Err(err) = el.style().set_property("display", display) {
            tracing::warn!("failed to toggle #{id}: {}", crate::error::js_message(&err));
        }
    }
}

/// Touches that started or ended in this event, each with its finger id.
fn changed_touches(evt: &TouchEvent) -> Vec<Touch> {
    let list = evt.changed_touches();
    (0..list.length()).filter_map(|i| list.item(i)).collect()
}

fn attach_input(canvas: &HtmlCanvasElement) -> Result<(), EngineError> {
    let win = window().ok_or(EngineError::NoWindow)?;

    let mouse_down = Closure::wrap(Box::new(move |evt: MouseEvent| {
        with_game(|game| game.on_press(PointerId::MOUSE, evt.client_x() as f64, evt.client_y() as f64));
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("mousedown", mouse_down.as_ref().unchecked_ref())?;
    mouse_down.forget();

    // On the window, so letting go after dragging off the canvas still counts.
    let mouse_up = Closure::wrap(Box::new(move |_evt: MouseEvent| {
        with_game(|game| game.on_release(PointerId::MOUSE));
    }) as Box<dyn FnMut(_)>);
    win.add_event_listener_with_callback("mouseup", mouse_up.as_ref().unchecked_ref())?;
    mouse_up.forget();

    let touch_start = Closure::wrap(Box::new(move |evt: TouchEvent| {
        // Keep the browser from synthesising mouse events for the same touch.
        evt.prevent_default();
        for touch in changed_touches(&evt) {
            let pointer = PointerId(touch.identifier());
            with_game(|game| game.on_press(pointer, touch.client_x() as f64, touch.client_y() as f64));
        }
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("touchstart", touch_start.as_ref().unchecked_ref())?;
    touch_start.forget();

    let touch_end = Closure::wrap(Box::new(move |evt: TouchEvent| {
        evt.prevent_default();
        for touch in changed_touches(&evt) {
            let pointer = PointerId(touch.identifier());
            with_game(|game| game.on_release(pointer));
        }
    }) as Box<dyn FnMut(_)>);
    canvas.add_event_listener_with_callback("touchend", touch_end.as_ref().unchecked_ref())?;
    touch_end.forget();
    Ok(())
}
