//! Tap Tiles core crate.
//!
//! Columns of black tiles fall down a canvas; tap each one before it leaves
//! the screen. Tapping empty space, letting a tile fall through, or letting go
//! of a long tile too early ends the run. Each run costs one ticket and the
//! final score is saved to the points API.
//!
//! The simulation (`board`, `clock`, `input`, `session`) is plain Rust and runs
//! anywhere; `web` mounts it on a browser canvas.

use wasm_bindgen::prelude::*;

pub mod board;
pub mod clock;
pub mod config;
pub mod error;
pub mod input;
pub mod persistence;
pub mod session;
pub mod tile;
pub mod web;

pub use board::{Board, BoardGeometry, SpawnRules, Surface, TickReport};
pub use clock::{FixedStepScheduler, FrameControl, FrameFn, FrameScheduler, SimClock};
pub use config::{ClockMode, EngineConfig, WebConfig};
pub use error::{EngineError, PersistenceError};
pub use input::{PointerId, ScreenPoint, TapResolution, ViewportRect};
pub use persistence::{MemoryPersistence, Persistence, Wallet};
pub use session::{EndReason, FrameOutcome, GameOver, GameSession, Phase, ReleaseOutcome, StartOutcome, TapOutcome};
pub use tile::{Tile, TileId, TileState};

// Optional small allocator for size (feature gated)
#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn wasm_start() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}
