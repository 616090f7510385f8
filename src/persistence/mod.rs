//! Points / tickets persistence.
//!
//! The game talks to a small HTTP API (see `web::http`). The session only needs
//! two fire-and-forget calls, captured by [`Persistence`]; [`MemoryPersistence`]
//! implements the same contract in memory for tests and offline play.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::PersistenceError;

pub mod wire;

/// Tickets granted to a user the first time they are seen.
pub const DEFAULT_TICKETS: u32 = 100;
pub const LEADERBOARD_SIZE: usize = 10;

/// Locally held balances, shown in the page header.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Wallet {
    pub points: u64,
    pub tickets: u32,
}

/// A user row as the API returns it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserRecord {
    #[serde(default)]
    pub username: Option<String>,
    pub points: u64,
    #[serde(default)]
    pub tickets: Option<u32>,
    #[serde(default)]
    pub max_score: Option<u64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub username: String,
    pub points: u64,
}

/// Calls the session makes. Both are fire-and-forget: implementations report
/// failures through logging, never back into the simulation.
pub trait Persistence {
    /// Store the caller-computed remaining ticket count.
    fn consume_ticket(&self, username: &str, remaining_tickets: u32);
    /// Record the final score of a session.
    fn finalize_score(&self, username: &str, score: u32);
}

impl<P: Persistence + ?Sized> Persistence for Rc<P> {
    fn consume_ticket(&self, username: &str, remaining_tickets: u32) {
        (**self).consume_ticket(username, remaining_tickets);
    }

    fn finalize_score(&self, username: &str, score: u32) {
        (**self).finalize_score(username, score);
    }
}

/// One call received by [`MemoryPersistence`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ConsumeTicket { username: String, remaining: u32 },
    FinalizeScore { username: String, score: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
struct StoredUser {
    points: u64,
    tickets: u32,
    max_score: u64,
}

/// In-memory user table with the API's semantics; records every call.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    users: RefCell<HashMap<String, StoredUser>>,
    calls: RefCell<Vec<Call>>,
}

impl MemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user with explicit balances.
    pub fn with_user(self, username: &str, points: u64, tickets: u32) -> Self {
        self.users.borrow_mut().insert(
            username.to_string(),
            StoredUser {
                points,
                tickets,
                max_score: points,
            },
        );
        self
    }

    /// `GET /getUserData`: unknown users are created with the default balance.
    pub fn user_data(&self, username: &str) -> Wallet {
        let mut users = self.users.borrow_mut();
        let user = users.entry(username.to_string()).or_insert_with(|| StoredUser {
            points: 0,
            tickets: DEFAULT_TICKETS,
            max_score: 0,
        });
        Wallet {
            points: user.points,
            tickets: user.tickets,
        }
    }

    /// `POST /updateTickets`.
    pub fn update_tickets(&self, username: &str, tickets: u32) -> Result<UserRecord, PersistenceError> {
        let mut users = self.users.borrow_mut();
        let user = users
            .get_mut(username)
            .ok_or_else(|| PersistenceError::Rejected("User not found".to_string()))?;
        user.tickets = tickets;
        Ok(record(username, user))
    }

    /// `POST /saveUser`: the score becomes the user's points; the best score is kept.
    pub fn save_user(&self, username: &str, score: u32) -> UserRecord {
        let mut users = self.users.borrow_mut();
        let user = users.entry(username.to_string()).or_default();
        user.points = u64::from(score);
        user.max_score = user.max_score.max(u64::from(score));
        record(username, user)
    }

    /// `GET /topUsers`.
    pub fn top_users(&self) -> Vec<LeaderboardEntry> {
        let users = self.users.borrow();
        let mut rows: Vec<LeaderboardEntry> = users
            .iter()
            .map(|(name, u)| LeaderboardEntry {
                username: name.clone(),
                points: u.points,
            })
            .collect();
        rows.sort_by(|a, b| b.points.cmp(&a.points).then_with(|| a.username.cmp(&b.username)));
        rows.truncate(LEADERBOARD_SIZE);
        rows
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.borrow().clone()
    }

    pub fn finalize_calls(&self) -> Vec<u32> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|c| match c {
                Call::FinalizeScore { score, .. } => Some(*score),
                Call::ConsumeTicket { .. } => None,
            })
            .collect()
    }
}

fn record(username: &str, user: &StoredUser) -> UserRecord {
    UserRecord {
        username: Some(username.to_string()),
        points: user.points,
        tickets: Some(user.tickets),
        max_score: Some(user.max_score),
    }
}

impl Persistence for MemoryPersistence {
    fn consume_ticket(&self, username: &str, remaining_tickets: u32) {
        self.calls.borrow_mut().push(Call::ConsumeTicket {
            username: username.to_string(),
            remaining: remaining_tickets,
        });
        if let Err(err) = self.update_tickets(username, remaining_tickets) {
            tracing::warn!(username, "error updating tickets: {err}");
        }
    }

    fn finalize_score(&self, username: &str, score: u32) {
        self.calls.borrow_mut().push(Call::FinalizeScore {
            username: username.to_string(),
            score,
        });
        self.save_user(username, score);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_user_gets_default_tickets() {
        let store = MemoryPersistence::new();
        assert_eq!(store.user_data("ana"), Wallet { points: 0, tickets: 100 });
        // idempotent
        assert_eq!(store.user_data("ana"), Wallet { points: 0, tickets: 100 });
    }

    #[test]
    fn test_save_user_tracks_best_score() {
        let store = MemoryPersistence::new();
        store.user_data("ana");
        assert_eq!(store.save_user("ana", 30).max_score, Some(30));
        let rec = store.save_user("ana", 12);
        assert_eq!(rec.points, 12);
        assert_eq!(rec.max_score, Some(30));
    }

    #[test]
    fn test_update_tickets_requires_user() {
        let store = MemoryPersistence::new();
        assert!(store.update_tickets("ghost", 3).is_err());
        store.consume_ticket("ghost", 3);
        assert_eq!(store.calls().len(), 1, "the call is still recorded");
    }

    #[test]
    fn test_top_users_sorted_and_capped() {
        let store = MemoryPersistence::new();
        for i in 0..12u32 {
            store.save_user(&format!("u{i:02}"), i * 10);
        }
        let top = store.top_users();
        assert_eq!(top.len(), LEADERBOARD_SIZE);
        assert_eq!(top[0].username, "u11");
        assert!(top.windows(2).all(|w| w[0].points >= w[1].points));
    }
}
