//! One play of the game: Idle -> Running -> Over -> (dismissed) Idle.
//!
//! The session owns the board for the length of a run, keeps the score and the
//! locally held wallet, and is the only place that talks to [`Persistence`].

use rand::rngs::SmallRng;
use rand::{RngCore, SeedableRng};

use crate::board::{Board, BoardGeometry, SpawnRules, Surface, TickReport};
use crate::clock::SimClock;
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::input::{self, PointerId, ReleaseResolution, ScreenPoint, TapResolution, ViewportRect};
use crate::persistence::{Persistence, Wallet};
use crate::tile::{Hold, TileId};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    Over,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EndReason {
    TappedEmptySpace,
    TileMissed(TileId),
    EarlyRelease,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameOver {
    pub score: u32,
    pub reason: EndReason,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started { remaining_tickets: u32 },
    NoTickets,
    /// A run is in progress or its game-over screen has not been dismissed.
    NotIdle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    Running,
    Ended(EndReason),
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TapOutcome {
    Hit { score: u32 },
    Ignored,
    Ended(EndReason),
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReleaseOutcome {
    Safe,
    Ended(EndReason),
    Inactive,
}

pub struct GameSession<P: Persistence> {
    config: EngineConfig,
    username: String,
    persistence: P,
    phase: Phase,
    score: u32,
    started_at: Option<f64>,
    wallet: Wallet,
    board: Option<Board>,
    clock: SimClock,
    rng: SmallRng,
    /// Long tiles currently held down, keyed by the pointer holding each.
    holds: Vec<(PointerId, TileId, Hold)>,
    game_over: Option<GameOver>,
}

impl<P: Persistence> GameSession<P> {
    pub fn new(config: EngineConfig, username: impl Into<String>, persistence: P, seed: u64) -> Result<Self, EngineError> {
        config.validate()?;
        let clock = SimClock::new(&config);
        Ok(Self {
            config,
            username: username.into(),
            persistence,
            phase: Phase::Idle,
            score: 0,
            started_at: None,
            wallet: Wallet::default(),
            board: None,
            clock,
            rng: SmallRng::seed_from_u64(seed),
            holds: Vec::new(),
            game_over: None,
        })
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn wallet(&self) -> Wallet {
        self.wallet
    }

    pub fn board(&self) -> Option<&Board> {
        self.board.as_ref()
    }

    pub fn speed(&self) -> Option<f64> {
        self.board.as_ref().map(Board::speed)
    }

    pub fn started_at(&self) -> Option<f64> {
        self.started_at
    }

    pub fn game_over(&self) -> Option<GameOver> {
        self.game_over
    }

    /// Balances fetched from the API.
    pub fn load_wallet(&mut self, wallet: Wallet) {
        self.wallet = wallet;
    }

    /// Authoritative points total returned after a score was saved.
    pub fn record_points(&mut self, points: u64) {
        self.wallet.points = points;
    }

    /// Spend one ticket and begin a run on a freshly seeded board.
    pub fn start(&mut self, now: f64, surface: Surface) -> Result<StartOutcome, EngineError> {
        if self.phase != Phase::Idle {
            return Ok(StartOutcome::NotIdle);
        }
        if self.wallet.tickets == 0 {
            tracing::info!(username = %self.username, "no more tickets available");
            return Ok(StartOutcome::NoTickets);
        }
        let geometry = BoardGeometry::from_surface(surface, &self.config)?;

        self.wallet.tickets -= 1;
        let remaining = self.wallet.tickets;
        self.persistence.consume_ticket(&self.username, remaining);

        self.score = 0;
        self.holds.clear();
        self.game_over = None;
        self.board = Some(self.build_board(geometry, self.config.base_speed));
        self.clock.reset();
        self.started_at = Some(now);
        self.phase = Phase::Running;
        tracing::info!(username = %self.username, remaining, "game started");
        Ok(StartOutcome::Started {
            remaining_tickets: remaining,
        })
    }

    /// Advance the simulation by one rendered frame.
    pub fn frame(&mut self, now: f64) -> FrameOutcome {
        let Some(board) = self.board.as_mut().filter(|_| self.phase == Phase::Running) else {
            return FrameOutcome::Inactive;
        };
        match self.clock.advance(board, now) {
            TickReport::Clear => FrameOutcome::Running,
            TickReport::Missed(tile) => {
                let reason = EndReason::TileMissed(tile);
                self.finish(reason);
                FrameOutcome::Ended(reason)
            }
        }
    }

    /// Instant tap: hit a falling tile or lose.
    pub fn tap(&mut self, point: ScreenPoint, viewport: ViewportRect) -> TapOutcome {
        let decay = self.config.decay_step;
        let Some(board) = self.board.as_mut().filter(|_| self.phase == Phase::Running) else {
            return TapOutcome::Inactive;
        };
        let resolution = input::resolve_tap(board, point, viewport, decay);
        self.apply_tap(resolution)
    }

    /// Press-start of the hold gesture; long tiles begin their hold timer,
    /// owned by `pointer`.
    pub fn press(&mut self, pointer: PointerId, point: ScreenPoint, viewport: ViewportRect, now: f64) -> TapOutcome {
        let decay = self.config.decay_step;
        let hold_ms = self.config.hold_duration_ms;
        let Some(board) = self.board.as_mut().filter(|_| self.phase == Phase::Running) else {
            return TapOutcome::Inactive;
        };
        let (resolution, held) = input::resolve_press(board, point, viewport, decay, now, hold_ms);
        if let Some((tile, hold)) = held {
            self.holds.retain(|(p, _, _)| *p != pointer);
            self.holds.push((pointer, tile, hold));
        }
        self.apply_tap(resolution)
    }

    /// Press-end of the hold gesture. Only the hold started by `pointer` is
    /// resolved; other fingers lifting never end a hold.
    pub fn release(&mut self, pointer: PointerId, now: f64) -> ReleaseOutcome {
        let Some(board) = self.board.as_mut().filter(|_| self.phase == Phase::Running) else {
            return ReleaseOutcome::Inactive;
        };
        let held = match self.holds.iter().position(|(p, _, _)| *p == pointer) {
            Some(i) => {
                let (_, tile, hold) = self.holds.remove(i);
                Some((tile, hold))
            }
            None => None,
        };
        match input::resolve_release(board, held, now) {
            ReleaseResolution::Safe => ReleaseOutcome::Safe,
            ReleaseResolution::Early => {
                self.finish(EndReason::EarlyRelease);
                ReleaseOutcome::Ended(EndReason::EarlyRelease)
            }
        }
    }

    /// Game-over screen dismissed; ready for another start.
    pub fn dismiss(&mut self) -> bool {
        if self.phase != Phase::Over {
            return false;
        }
        self.phase = Phase::Idle;
        self.game_over = None;
        true
    }

    /// The canvas changed size. A running board is rebuilt for the new
    /// geometry; score and current speed carry over.
    pub fn resize(&mut self, surface: Surface) -> Result<(), EngineError> {
        let Some(speed) = self.speed().filter(|_| self.phase == Phase::Running) else {
            return Ok(());
        };
        let geometry = BoardGeometry::from_surface(surface, &self.config)?;
        tracing::debug!(width = surface.width, height = surface.height, "rebuilding board after resize");
        self.holds.clear();
        self.board = Some(self.build_board(geometry, speed));
        self.clock.reset();
        Ok(())
    }

    fn apply_tap(&mut self, resolution: TapResolution) -> TapOutcome {
        match resolution {
            TapResolution::Hit { .. } => {
                self.score += 1;
                TapOutcome::Hit { score: self.score }
            }
            TapResolution::Ignored => TapOutcome::Ignored,
            TapResolution::Miss => {
                self.finish(EndReason::TappedEmptySpace);
                TapOutcome::Ended(EndReason::TappedEmptySpace)
            }
        }
    }

    fn finish(&mut self, reason: EndReason) {
        if self.phase != Phase::Running {
            return;
        }
        self.phase = Phase::Over;
        self.board = None;
        self.holds.clear();
        self.game_over = Some(GameOver {
            score: self.score,
            reason,
        });
        tracing::info!(username = %self.username, score = self.score, ?reason, "game over");
        self.persistence.finalize_score(&self.username, self.score);
    }

    fn build_board(&mut self, geometry: BoardGeometry, speed: f64) -> Board {
        Board::seeded(
            geometry,
            SpawnRules::from_config(&self.config),
            speed,
            self.config.speed_increment,
            SmallRng::seed_from_u64(self.rng.next_u64()),
        )
    }
}
