//! Simulation clock and frame scheduling.
//!
//! The clock turns "a frame happened at `now`" into fall distance, fade step and
//! speed ramp for the board. Who calls it, and when, is the scheduler's job: the
//! browser shell hooks `requestAnimationFrame`, tests use [`FixedStepScheduler`].

use crate::board::{Board, TickReport};
use crate::config::{ClockMode, EngineConfig};

/// Nominal refresh interval the per-frame tuning values were chosen for.
pub const REFERENCE_FRAME_MS: f64 = 1_000.0 / 60.0;

pub struct SimClock {
    mode: ClockMode,
    decay_step: f64,
    target_tiles: usize,
    max_frame_gap_ms: f64,
    last_ms: Option<f64>,
}

impl SimClock {
    pub fn new(cfg: &EngineConfig) -> Self {
        Self {
            mode: cfg.clock,
            decay_step: cfg.decay_step,
            target_tiles: cfg.target_tiles,
            max_frame_gap_ms: cfg.max_frame_gap_ms,
            last_ms: None,
        }
    }

    /// Forget the previous timestamp so the next frame starts a fresh delta.
    pub fn reset(&mut self) {
        self.last_ms = None;
    }

    /// How many reference frames `now` represents. Fixed-step: always one.
    /// Wall-time: elapsed since the previous frame (zero for the first),
    /// clamped to the max gap.
    pub fn frame_scale(&mut self, now: f64) -> f64 {
        let scale = match self.mode {
            ClockMode::FixedStep => 1.0,
            ClockMode::WallTime => match self.last_ms {
                Some(last) => (now - last).clamp(0.0, self.max_frame_gap_ms) / REFERENCE_FRAME_MS,
                None => 0.0,
            },
        };
        self.last_ms = Some(now);
        scale
    }

    /// One simulation step: move and fade, then (if nothing was missed) top up
    /// the board and ramp the speed.
    pub fn advance(&mut self, board: &mut Board, now: f64) -> TickReport {
        let scale = self.frame_scale(now);
        let report = board.tick(board.speed() * scale, self.decay_step * scale, now);
        if report != TickReport::Clear {
            return report;
        }
        board.replenish(self.target_tiles);
        board.increase_speed(board.speed_increment() * scale);
        report
    }
}

/// Returned by a frame callback to keep or stop the loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameControl {
    Continue,
    Stop,
}

pub type FrameFn = Box<dyn FnMut(f64) -> FrameControl>;

/// Drives a frame callback once per display refresh, yielding to the host
/// between frames, until the callback returns [`FrameControl::Stop`].
pub trait FrameScheduler {
    fn request_tick(&mut self, frame: FrameFn);
}

/// Deterministic scheduler: calls the frame synchronously with timestamps
/// `start_ms`, `start_ms + step_ms`, ... up to `max_frames` times.
pub struct FixedStepScheduler {
    pub start_ms: f64,
    pub step_ms: f64,
    pub max_frames: u64,
    now_ms: f64,
    ran: u64,
}

impl FixedStepScheduler {
    pub fn new(start_ms: f64, step_ms: f64, max_frames: u64) -> Self {
        Self {
            start_ms,
            step_ms,
            max_frames,
            now_ms: start_ms,
            ran: 0,
        }
    }

    /// Frames delivered so far, across all requests.
    pub fn frames_run(&self) -> u64 {
        self.ran
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }
}

impl FrameScheduler for FixedStepScheduler {
    fn request_tick(&mut self, mut frame: FrameFn) {
        let budget = self.ran + self.max_frames;
        while self.ran < budget {
            let now = self.now_ms;
            self.now_ms += self.step_ms;
            self.ran += 1;
            if frame(now) == FrameControl::Stop {
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{BoardGeometry, SpawnRules, Surface};
    use rand::SeedableRng;
    use rand::rngs::SmallRng;
    use std::cell::Cell;
    use std::rc::Rc;

    fn board(cfg: &EngineConfig) -> Board {
        let geometry = BoardGeometry::from_surface(Surface::new(415.0, 400.0), cfg).unwrap();
        Board::seeded(
            geometry,
            SpawnRules::from_config(cfg),
            cfg.base_speed,
            cfg.speed_increment,
            SmallRng::seed_from_u64(23),
        )
    }

    #[test]
    fn test_fixed_step_moves_speed_per_frame() {
        let cfg = EngineConfig::desktop();
        let mut b = board(&cfg);
        let mut clock = SimClock::new(&cfg);
        let first = b.tiles()[0].id;
        assert_eq!(clock.advance(&mut b, 0.0), TickReport::Clear);
        assert_eq!(b.tile(first).unwrap().y, -93.0);
        assert!((b.speed() - 2.002).abs() < 1e-12);
        // a long stall changes nothing in fixed-step mode
        clock.advance(&mut b, 5_000.0);
        assert!((b.tile(first).unwrap().y - (-93.0 + 2.002)).abs() < 1e-9);
    }

    #[test]
    fn test_wall_time_scales_and_clamps() {
        let cfg = EngineConfig {
            clock: ClockMode::WallTime,
            speed_increment: 0.0,
            ..EngineConfig::desktop()
        };
        let mut clock = SimClock::new(&cfg);
        assert_eq!(clock.frame_scale(1_000.0), 0.0);
        assert!((clock.frame_scale(1_000.0 + 2.0 * REFERENCE_FRAME_MS) - 2.0).abs() < 1e-9);
        let clamped = clock.frame_scale(60_000.0);
        assert!((clamped - 100.0 / REFERENCE_FRAME_MS).abs() < 1e-9);
        // going backwards never moves tiles upward
        assert_eq!(clock.frame_scale(0.0), 0.0);
    }

    #[test]
    fn test_speed_never_decreases_while_advancing() {
        let cfg = EngineConfig::desktop();
        let mut b = board(&cfg);
        let mut clock = SimClock::new(&cfg);
        let mut last = b.speed();
        for i in 0..30 {
            if clock.advance(&mut b, i as f64 * 16.0) != TickReport::Clear {
                break;
            }
            assert!(b.speed() >= last);
            assert!(b.active_count() >= cfg.target_tiles);
            last = b.speed();
        }
    }

    #[test]
    fn test_fixed_scheduler_stops_on_request() {
        let calls = Rc::new(Cell::new(0u32));
        let seen = calls.clone();
        let mut sched = FixedStepScheduler::new(100.0, 10.0, 50);
        sched.request_tick(Box::new(move |now| {
            seen.set(seen.get() + 1);
            if now >= 130.0 { FrameControl::Stop } else { FrameControl::Continue }
        }));
        assert_eq!(calls.get(), 4);
        assert_eq!(sched.frames_run(), 4);
        assert_eq!(sched.now_ms(), 140.0);
    }

    #[test]
    fn test_fixed_scheduler_respects_budget() {
        let mut sched = FixedStepScheduler::new(0.0, 16.0, 3);
        sched.request_tick(Box::new(|_| FrameControl::Continue));
        assert_eq!(sched.frames_run(), 3);
    }
}
