//! Turning pointer and touch positions into hits on the board.

use crate::board::Board;
use crate::tile::{Hold, TileId};

/// A point in page (client) pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Where the canvas is displayed on the page, as from `getBoundingClientRect`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ViewportRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl ViewportRect {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self { left, top, width, height }
    }
}

/// Which finger (touch identifier) or the mouse produced a press. A hold is
/// only resolved by the release of the pointer that started it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PointerId(pub i32);

impl PointerId {
    pub const MOUSE: PointerId = PointerId(-1);
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TapResolution {
    Hit { tile: TileId, long: bool },
    Miss,
    /// The canvas is not laid out (zero-sized); nothing can be resolved.
    Ignored,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseResolution {
    Safe,
    /// A long tile was let go before its hold duration elapsed.
    Early,
}

/// Map a page position into board space. CSS may stretch the canvas, so the
/// two axes scale independently. `None` when the viewport has no area.
pub fn map_to_board(
    point: ScreenPoint,
    viewport: ViewportRect,
    board_width: f64,
    board_height: f64,
) -> Option<(f64, f64)> {
    if viewport.width <= 0.0 || viewport.height <= 0.0 {
        return None;
    }
    let scale_x = board_width / viewport.width;
    let scale_y = board_height / viewport.height;
    Some((
        (point.x - viewport.left) * scale_x,
        (point.y - viewport.top) * scale_y,
    ))
}

/// Resolve a tap against the falling tiles. On a hit the tile starts retiring
/// (fading by `decay_step` at once) and a replacement is queued immediately.
pub fn resolve_tap(
    board: &mut Board,
    point: ScreenPoint,
    viewport: ViewportRect,
    decay_step: f64,
) -> TapResolution {
    let geometry = *board.geometry();
    let Some((bx, by)) = map_to_board(point, viewport, geometry.width, geometry.height) else {
        return TapResolution::Ignored;
    };
    let Some(id) = board.falling_tile_at(bx, by) else {
        return TapResolution::Miss;
    };
    let long = match board.tile_mut(id) {
        Some(tile) => {
            tile.begin_retiring(decay_step);
            tile.is_long
        }
        None => return TapResolution::Miss,
    };
    board.spawn_one();
    TapResolution::Hit { tile: id, long }
}

/// Press-start for the hold gesture: a tap that also starts the hold timer on
/// long tiles.
pub fn resolve_press(
    board: &mut Board,
    point: ScreenPoint,
    viewport: ViewportRect,
    decay_step: f64,
    now: f64,
    hold_duration_ms: f64,
) -> (TapResolution, Option<(TileId, Hold)>) {
    let resolution = resolve_tap(board, point, viewport, decay_step);
    let hold = match resolution {
        TapResolution::Hit { tile, long: true } => board.tile_mut(tile).and_then(|t| {
            t.begin_hold(now, hold_duration_ms);
            t.hold.map(|h| (tile, h))
        }),
        _ => None,
    };
    (resolution, hold)
}

/// Press-end: was the long tile held for its whole duration? The tile itself
/// may already have left the board; the recorded hold decides.
pub fn resolve_release(board: &mut Board, held: Option<(TileId, Hold)>, now: f64) -> ReleaseResolution {
    let Some((tile, hold)) = held else {
        return ReleaseResolution::Safe;
    };
    if let Some(t) = board.tile_mut(tile) {
        t.end_hold();
    }
    if now - hold.started_ms < hold.duration_ms() {
        ReleaseResolution::Early
    } else {
        ReleaseResolution::Safe
    }
}
