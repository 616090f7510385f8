// Browser tests for the wasm shell; run with `wasm-pack test --headless --firefox`.
#![cfg(target_arch = "wasm32")]

use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::HtmlCanvasElement;

wasm_bindgen_test_configure!(run_in_browser);

fn add_canvas(id: &str) {
    let doc = web_sys::window().unwrap().document().unwrap();
    let canvas: HtmlCanvasElement = doc.create_element("canvas").unwrap().dyn_into().unwrap();
    canvas.set_id(id);
    canvas.set_width(415);
    canvas.set_height(400);
    doc.body().unwrap().append_child(&canvas).unwrap();
}

#[wasm_bindgen_test]
fn mount_requires_a_canvas() {
    assert!(tap_tiles::web::mount_game("no-such-canvas", None).is_err());
}

#[wasm_bindgen_test]
fn mount_rejects_bad_config() {
    add_canvas("bad-config");
    let json = r#"{"engine": {"columns": 0}}"#.to_string();
    assert!(tap_tiles::web::mount_game("bad-config", Some(json)).is_err());
}

#[wasm_bindgen_test]
fn mounted_game_waits_for_tickets() {
    add_canvas("board");
    tap_tiles::web::mount_game("board", Some(r#"{"engine": {"log_filter": "warn"}}"#.to_string())).unwrap();
    assert_eq!(tap_tiles::web::game_phase(), "idle");
    assert_eq!(tap_tiles::web::game_score(), 0);
    // the wallet is still empty until the API answers
    assert!(!tap_tiles::web::dismiss_game_over());
}

#[wasm_bindgen_test]
fn mouse_release_is_heard_off_the_canvas() {
    add_canvas("release-board");
    tap_tiles::web::mount_game("release-board", None).unwrap();
    let win = web_sys::window().unwrap();
    let up = web_sys::MouseEvent::new("mouseup").unwrap();
    // dispatched on the window, outside the canvas; the listener must run cleanly
    assert!(win.dispatch_event(&up).unwrap());
    assert_eq!(tap_tiles::web::game_phase(), "idle");
}
