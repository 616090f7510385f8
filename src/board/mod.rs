//! The falling-tile board.
//!
//! A board owns every active tile, decides where new tiles appear, moves them
//! each tick and reports when a falling tile slipped past the bottom edge. Tiles
//! live in a flat `Vec` and are addressed by `TileId`; nothing outside the board
//! keeps references into it.

use rand::Rng;
use rand::rngs::SmallRng;

use crate::config::EngineConfig;
use crate::tile::{Tile, TileId, TileState};

mod geometry;

pub use geometry::{BoardGeometry, Surface};

/// Spawn tuning copied out of the engine config when the board is built.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpawnRules {
    pub target: usize,
    pub attempts: u32,
    pub long_chance: f64,
    pub long_rows: u8,
}

impl SpawnRules {
    pub fn from_config(cfg: &EngineConfig) -> Self {
        Self {
            target: cfg.target_tiles,
            attempts: cfg.spawn_attempts,
            long_chance: cfg.long_tile_chance,
            long_rows: cfg.long_tile_rows,
        }
    }
}

/// Result of one board tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickReport {
    Clear,
    /// A falling tile reached the lower bound without being tapped.
    Missed(TileId),
}

pub struct Board {
    geometry: BoardGeometry,
    tiles: Vec<Tile>,
    next_id: u64,
    speed: f64,
    speed_increment: f64,
    rules: SpawnRules,
    rng: SmallRng,
}

impl Board {
    /// Empty board at `speed`; see [`Board::seeded`] for the opening layout.
    pub fn new(
        geometry: BoardGeometry,
        rules: SpawnRules,
        speed: f64,
        speed_increment: f64,
        rng: SmallRng,
    ) -> Self {
        Self {
            geometry,
            tiles: Vec::with_capacity(rules.target * 2),
            next_id: 0,
            speed,
            speed_increment,
            rules,
            rng,
        }
    }

    /// Board with `rules.target` regular tiles staggered above the visible area,
    /// the lowest one sitting just above the top edge.
    pub fn seeded(
        geometry: BoardGeometry,
        rules: SpawnRules,
        speed: f64,
        speed_increment: f64,
        rng: SmallRng,
    ) -> Self {
        let mut board = Self::new(geometry, rules, speed, speed_increment, rng);
        let pitch = geometry.tile_height + geometry.vertical_gap;
        for i in 0..rules.target {
            let column = board.rng.gen_range(0..geometry.columns);
            let y = -(i as f64 * pitch) - geometry.tile_height;
            board.place(column, y, geometry.tile_height, false);
        }
        board
    }

    pub fn geometry(&self) -> &BoardGeometry {
        &self.geometry
    }

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tile(&self, id: TileId) -> Option<&Tile> {
        self.tiles.iter().find(|t| t.id == id)
    }

    pub fn tile_mut(&mut self, id: TileId) -> Option<&mut Tile> {
        self.tiles.iter_mut().find(|t| t.id == id)
    }

    /// Tiles still on screen in play: falling or fading out.
    pub fn active_count(&self) -> usize {
        self.tiles
            .iter()
            .filter(|t| matches!(t.state, TileState::Falling | TileState::Retiring))
            .count()
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn speed_increment(&self) -> f64 {
        self.speed_increment
    }

    /// Difficulty ramp; never decreases.
    pub fn increase_speed(&mut self, increment: f64) {
        if increment > 0.0 {
            self.speed += increment;
        }
    }

    /// First falling tile containing the board-space point.
    pub fn falling_tile_at(&self, x: f64, y: f64) -> Option<TileId> {
        self.tiles.iter().find(|t| t.hit_test(x, y)).map(|t| t.id)
    }

    /// Queue one tile directly above the highest tile on the board.
    pub fn spawn_one(&mut self) -> TileId {
        let long = self.rules.long_chance > 0.0 && self.rng.gen_bool(self.rules.long_chance);
        let height = if long {
            self.geometry.span_height(self.rules.long_rows)
        } else {
            self.geometry.tile_height
        };
        let y = match self.highest_top() {
            Some(top) => top - height - self.geometry.vertical_gap,
            None => -height,
        };

        let mut column = 0;
        for _ in 0..self.rules.attempts {
            column = self.rng.gen_range(0..self.geometry.columns);
            if !self.conflicts(column, y, height, long) {
                return self.place(column, y, height, long);
            }
        }
        tracing::debug!(column, y, long, "no free spawn slot, placing at last candidate");
        self.place(column, y, height, long)
    }

    /// Spawn until `target` tiles are falling or retiring; returns how many were added.
    pub fn replenish(&mut self, target: usize) -> usize {
        let mut added = 0;
        while self.active_count() < target {
            self.spawn_one();
            added += 1;
        }
        added
    }

    /// Move every tile, fade or shrink retiring ones, drop finished tiles and
    /// report the first falling tile that crossed the lower bound.
    pub fn tick(&mut self, delta: f64, decay_step: f64, now: f64) -> TickReport {
        for tile in &mut self.tiles {
            tile.advance(delta);
            tile.apply_retirement_decay(decay_step);
            tile.apply_hold_shrink(now);
        }
        let bound = self.geometry.lower_bound();
        self.tiles.retain(|t| match t.state {
            TileState::Gone => false,
            TileState::Retiring => t.y < bound,
            TileState::Falling => true,
        });
        match self.tiles.iter().find(|t| t.missed(bound)) {
            Some(t) => TickReport::Missed(t.id),
            None => TickReport::Clear,
        }
    }

    fn highest_top(&self) -> Option<f64> {
        self.tiles
            .iter()
            .filter(|t| t.state != TileState::Gone)
            .map(|t| t.y)
            .reduce(f64::min)
    }

    fn conflicts(&self, column: u8, y: f64, height: f64, long: bool) -> bool {
        let x = self.geometry.column_x(column);
        let width = self.geometry.tile_width;
        // A long tile keeps one row of clearance in its column above and below.
        let pad = self.geometry.tile_height + self.geometry.vertical_gap;
        self.tiles.iter().filter(|t| t.state != TileState::Gone).any(|t| {
            if t.overlaps(x, y, width, height) {
                return true;
            }
            (long || t.is_long) && t.column == column && t.y - pad < y + height && y < t.bottom() + pad
        })
    }

    fn place(&mut self, column: u8, y: f64, height: f64, long: bool) -> TileId {
        let id = TileId(self.next_id);
        self.next_id += 1;
        let x = self.geometry.column_x(column);
        let width = self.geometry.tile_width;
        let tile = if long {
            Tile::long(id, column, x, y, width, height)
        } else {
            Tile::new(id, column, x, y, width, height)
        };
        self.tiles.push(tile);
        id
    }
}
