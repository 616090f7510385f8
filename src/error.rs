//! Error types shared by the engine, the persistence client and the web shell.

use thiserror::Error;
use wasm_bindgen::JsValue;

/// Failures that prevent the engine from running at all.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no window")]
    NoWindow,
    #[error("no document")]
    NoDocument,
    #[error("missing element #{0}")]
    MissingElement(String),
    #[error("element #{0} is not a canvas")]
    NotACanvas(String),
    #[error("canvas has no 2d context")]
    NoContext,
    #[error("invalid surface {width}x{height}")]
    InvalidSurface { width: f64, height: f64 },
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    #[error("config json: {0}")]
    ConfigJson(#[from] serde_json::Error),
    #[error("js error: {0}")]
    Js(String),
}

impl From<JsValue> for EngineError {
    fn from(value: JsValue) -> Self {
        Self::Js(js_message(&value))
    }
}

impl From<EngineError> for JsValue {
    fn from(err: EngineError) -> Self {
        JsValue::from_str(&err.to_string())
    }
}

/// Failures talking to the points / tickets API. Always non-fatal for play.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("network: {0}")]
    Network(String),
    #[error("http status {0}")]
    Status(u16),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("server rejected request: {0}")]
    Rejected(String),
}

impl From<JsValue> for PersistenceError {
    fn from(value: JsValue) -> Self {
        Self::Network(js_message(&value))
    }
}

pub(crate) fn js_message(value: &JsValue) -> String {
    value
        .as_string()
        .unwrap_or_else(|| format!("{value:?}"))
}
