//! A single falling hit target.

/// Stable identity of a tile for the lifetime of one board.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TileState {
    Falling,
    /// Hit; fading out (or shrinking, for a held long tile).
    Retiring,
    Gone,
}

/// Press bookkeeping for a long tile.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hold {
    pub started_ms: f64,
    pub deadline_ms: f64,
}

impl Hold {
    pub fn duration_ms(&self) -> f64 {
        self.deadline_ms - self.started_ms
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub id: TileId,
    pub column: u8,
    pub x: f64,
    pub y: f64, // top edge, board space
    pub width: f64,
    pub height: f64,
    pub nominal_height: f64,
    pub opacity: f64,
    pub state: TileState,
    pub is_long: bool,
    /// Set only while a long tile is being held down.
    pub hold: Option<Hold>,
}

impl Tile {
    pub fn new(id: TileId, column: u8, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            id,
            column,
            x,
            y,
            width,
            height,
            nominal_height: height,
            opacity: 1.0,
            state: TileState::Falling,
            is_long: false,
            hold: None,
        }
    }

    pub fn long(id: TileId, column: u8, x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            is_long: true,
            ..Self::new(id, column, x, y, width, height)
        }
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn advance(&mut self, delta: f64) {
        self.y += delta;
    }

    /// Falling -> Retiring, with the first fade step applied at once.
    /// Returns false if the tile was not falling.
    pub fn begin_retiring(&mut self, step: f64) -> bool {
        if self.state != TileState::Falling {
            return false;
        }
        self.state = TileState::Retiring;
        self.fade(step);
        true
    }

    pub fn apply_retirement_decay(&mut self, step: f64) {
        // Held long tiles shrink instead of fading.
        if self.state != TileState::Retiring || self.hold.is_some() {
            return;
        }
        if self.opacity > 0.0 {
            self.fade(step);
        }
    }

    fn fade(&mut self, step: f64) {
        self.opacity = (self.opacity - step).max(0.0);
        if self.opacity <= 0.0 {
            self.opacity = 0.0;
            self.state = TileState::Gone;
        }
    }

    pub fn begin_hold(&mut self, now: f64, duration_ms: f64) {
        if self.is_long {
            self.hold = Some(Hold {
                started_ms: now,
                deadline_ms: now + duration_ms,
            });
        }
    }

    /// Release; the tile keeps retiring by fading from here on.
    pub fn end_hold(&mut self) -> Option<Hold> {
        self.hold.take()
    }

    pub fn apply_hold_shrink(&mut self, now: f64) {
        let Some(hold) = self.hold else { return };
        if !self.is_long || self.state == TileState::Gone {
            return;
        }
        let duration = hold.duration_ms();
        let progress = if duration <= 0.0 { 1.0 } else { (now - hold.started_ms) / duration };
        let remaining = (1.0 - progress).max(0.0);
        self.height = self.nominal_height * remaining.min(1.0);
        if self.height <= 0.0 {
            self.height = 0.0;
            self.opacity = 0.0;
            self.state = TileState::Gone;
            self.hold = None;
        }
    }

    /// Edges count as inside; only falling tiles can be hit.
    pub fn hit_test(&self, px: f64, py: f64) -> bool {
        self.state == TileState::Falling
            && self.x <= px
            && px <= self.x + self.width
            && self.y <= py
            && py <= self.y + self.height
    }

    pub fn missed(&self, lower_bound: f64) -> bool {
        self.state == TileState::Falling && self.bottom() >= lower_bound
    }

    pub fn overlaps(&self, x: f64, y: f64, width: f64, height: f64) -> bool {
        self.y < y + height && self.bottom() > y && self.x < x + width && self.x + self.width > x
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tile() -> Tile {
        Tile::new(TileId(1), 0, 0.0, -95.0, 100.0, 95.0)
    }

    #[test]
    fn test_retirement_fades_monotonically_to_gone() {
        let mut t = tile();
        assert!(t.begin_retiring(0.05));
        assert!(!t.begin_retiring(0.05), "retiring happens once");
        let mut last = t.opacity;
        let mut steps = 0;
        while t.state == TileState::Retiring {
            t.apply_retirement_decay(0.05);
            assert!(t.opacity <= last);
            last = t.opacity;
            steps += 1;
            assert!(steps < 100);
        }
        assert_eq!(t.state, TileState::Gone);
        assert_eq!(t.opacity, 0.0);
    }

    #[test]
    fn test_decay_ignores_falling_tiles() {
        let mut t = tile();
        t.apply_retirement_decay(0.5);
        assert_eq!(t.opacity, 1.0);
        assert_eq!(t.state, TileState::Falling);
    }

    #[test]
    fn test_hit_test_edges_and_state() {
        let mut t = tile();
        assert!(t.hit_test(0.0, -95.0));
        assert!(t.hit_test(100.0, 0.0));
        assert!(!t.hit_test(100.1, -10.0));
        t.begin_retiring(0.05);
        assert!(!t.hit_test(50.0, -50.0));
    }

    #[test]
    fn test_missed_only_when_falling_past_bound() {
        let mut t = tile();
        t.y = 305.0;
        assert!(t.missed(400.0));
        assert!(!t.missed(401.0));
        t.begin_retiring(0.05);
        assert!(!t.missed(400.0));
    }

    #[test]
    fn test_hold_shrink_reaches_gone() {
        let mut t = Tile::long(TileId(2), 1, 105.0, 0.0, 100.0, 195.0);
        t.begin_retiring(0.05);
        t.begin_hold(1_000.0, 500.0);
        t.apply_retirement_decay(0.05);
        assert!((t.opacity - 0.95).abs() < 1e-9, "held tiles do not fade");
        t.apply_hold_shrink(1_250.0);
        assert!((t.height - 97.5).abs() < 1e-9);
        t.apply_hold_shrink(1_500.0);
        assert_eq!(t.height, 0.0);
        assert_eq!(t.opacity, 0.0);
        assert_eq!(t.state, TileState::Gone);
    }

    #[test]
    fn test_short_tiles_ignore_holds() {
        let mut t = tile();
        t.begin_hold(0.0, 100.0);
        assert!(t.hold.is_none());
        t.apply_hold_shrink(50.0);
        assert_eq!(t.height, 95.0);
    }
}
