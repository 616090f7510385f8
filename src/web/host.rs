// Telegram WebApp integration: who is playing and which background to use.

use js_sys::{Function, Reflect};
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Document, window};

pub const FALLBACK_NAME: &str = "Username";

/// `username`, else "first last", else the literal fallback.
pub fn display_name(username: Option<&str>, first_name: Option<&str>, last_name: Option<&str>) -> String {
    if let Some(name) = username.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    let full = [first_name, last_name]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    if full.is_empty() { FALLBACK_NAME.to_string() } else { full }
}

/// The theme sometimes reports placeholders instead of a colour.
pub fn usable_bg_color(color: &str) -> Option<&str> {
    let color = color.trim();
    if color.is_empty() || color.contains("unset") || color.contains("none") {
        None
    } else {
        Some(color)
    }
}

fn get(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|v| !v.is_undefined() && !v.is_null())
}

fn get_str(target: &JsValue, key: &str) -> Option<String> {
    get(target, key).and_then(|v| v.as_string())
}

/// `window.Telegram.WebApp`, when running inside the messenger.
pub fn webapp() -> Option<JsValue> {
    let win: JsValue = window()?.into();
    get(&get(&win, "Telegram")?, "WebApp")
}

pub fn identity(webapp: Option<&JsValue>) -> String {
    let user = webapp.and_then(|w| get(w, "initDataUnsafe")).and_then(|d| get(&d, "user"));
    match user {
        Some(user) => display_name(
            get_str(&user, "username").as_deref(),
            get_str(&user, "first_name").as_deref(),
            get_str(&user, "last_name").as_deref(),
        ),
        None => FALLBACK_NAME.to_string(),
    }
}

/// Copy the theme background onto `<body>`.
pub fn apply_theme(webapp: &JsValue, doc: &Document) {
    let Some(color) = get(webapp, "themeParams").and_then(|t| get_str(&t, "bg_color")) else {
        return;
    };
    let Some(color) = usable_bg_color(&color) else {
        return;
    };
    if let Some(body) = doc.body() {
        if let Err(err) = body.style().set_property("background-color", color) {
            tracing::warn!("failed to apply theme: {}", crate::error::js_message(&err));
        }
    }
}

fn call_method(target: &JsValue, name: &str, args: &[&JsValue]) -> Result<JsValue, JsValue> {
    let method: Function = Reflect::get(target, &JsValue::from_str(name))?.dyn_into()?;
    match args {
        [] => method.call0(target),
        [a] => method.call1(target, a),
        [a, b] => method.call2(target, a, b),
        _ => Err(JsValue::from_str("too many arguments")),
    }
}

/// Tell the host the mini-app is ready to be shown.
pub fn ready(webapp: &JsValue) {
    if let Err(err) = call_method(webapp, "ready", &[]) {
        tracing::debug!("WebApp.ready unavailable: {}", crate::error::js_message(&err));
    }
}

/// Re-apply the background whenever the user switches theme.
pub fn watch_theme(webapp: &JsValue, doc: &Document) {
    let app = webapp.clone();
    let doc = doc.clone();
    let closure = Closure::wrap(Box::new(move || apply_theme(&app, &doc)) as Box<dyn FnMut()>);
    match call_method(webapp, "onEvent", &[&JsValue::from_str("themeChanged"), closure.as_ref()]) {
        Ok(_) => closure.forget(),
        Err(err) => tracing::debug!("themeChanged subscription failed: {}", crate::error::js_message(&err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(display_name(Some("ana"), Some("Ana"), Some("Lee")), "ana");
        assert_eq!(display_name(Some("  "), Some("Ana"), Some("Lee")), "Ana Lee");
        assert_eq!(display_name(None, Some("Ana"), None), "Ana");
        assert_eq!(display_name(None, None, None), "Username");
    }

    #[test]
    fn test_bg_color_placeholders_are_ignored() {
        assert_eq!(usable_bg_color("#17212b"), Some("#17212b"));
        assert_eq!(usable_bg_color("unset"), None);
        assert_eq!(usable_bg_color("none"), None);
        assert_eq!(usable_bg_color(""), None);
    }
}
