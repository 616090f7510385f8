//! Engine tuning. Defaults mirror the classic four-column game; everything can
//! be overridden from JSON handed to `mount_game`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;

/// How the simulation clock turns a frame into fall distance.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockMode {
    /// `speed` units per rendered frame, regardless of refresh rate.
    FixedStep,
    /// `speed` units per 60 Hz frame-equivalent of elapsed wall time.
    WallTime,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub columns: u8,
    /// Horizontal gap between columns.
    pub separator: f64,
    pub vertical_gap: f64,
    /// Rows of tiles that fit the visible surface; drives tile height.
    pub visible_rows: u8,
    /// Falling-or-retiring tiles kept on the board.
    pub target_tiles: usize,
    pub spawn_attempts: u32,
    pub base_speed: f64,
    pub speed_increment: f64,
    pub decay_step: f64,
    pub clock: ClockMode,
    /// Clamp for a single wall-time frame (tab switches, debugger pauses).
    pub max_frame_gap_ms: f64,
    /// Probability in [0,1] that a spawned tile is a long (hold) tile.
    pub long_tile_chance: f64,
    pub long_tile_rows: u8,
    pub hold_duration_ms: f64,
    /// `tracing_subscriber::EnvFilter` directive for the browser console.
    pub log_filter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::desktop()
    }
}

impl EngineConfig {
    pub fn desktop() -> Self {
        Self {
            columns: 4,
            separator: 5.0,
            vertical_gap: 5.0,
            visible_rows: 4,
            target_tiles: 4,
            spawn_attempts: 100,
            base_speed: 2.0,
            speed_increment: 0.002,
            decay_step: 0.05,
            clock: ClockMode::FixedStep,
            max_frame_gap_ms: 100.0,
            long_tile_chance: 0.0,
            long_tile_rows: 2,
            hold_duration_ms: 600.0,
            log_filter: "info".to_string(),
        }
    }

    /// Touch devices get a faster start and a steeper ramp.
    pub fn mobile() -> Self {
        Self {
            base_speed: 6.0,
            speed_increment: 0.005,
            ..Self::desktop()
        }
    }

    pub fn for_user_agent(user_agent: &str) -> Self {
        if is_mobile_user_agent(user_agent) {
            Self::mobile()
        } else {
            Self::desktop()
        }
    }

    /// Parse overrides on top of the defaults for `user_agent`.
    pub fn from_json(json: &str, user_agent: &str) -> Result<Self, EngineError> {
        Self::from_value(serde_json::from_str(json)?, user_agent)
    }

    /// An optional `"preset": "mobile" | "desktop"` key picks the base; every
    /// other key overrides a single field of that base.
    pub fn from_value(mut value: Value, user_agent: &str) -> Result<Self, EngineError> {
        let Some(obj) = value.as_object_mut() else {
            return Err(EngineError::InvalidConfig("engine config must be an object".to_string()));
        };
        let base = match obj.remove("preset") {
            None => Self::for_user_agent(user_agent),
            Some(Value::String(name)) if name == "mobile" => Self::mobile(),
            Some(Value::String(name)) if name == "desktop" => Self::desktop(),
            Some(other) => {
                return Err(EngineError::InvalidConfig(format!("unknown preset {other}")));
            }
        };
        if let Value::Object(defaults) = serde_json::to_value(&base)? {
            for (key, default) in defaults {
                obj.entry(key).or_insert(default);
            }
        }
        let cfg: Self = serde_json::from_value(value)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let bad = |msg: &str| Err(EngineError::InvalidConfig(msg.to_string()));
        if self.columns == 0 {
            return bad("columns must be > 0");
        }
        if self.visible_rows == 0 {
            return bad("visible_rows must be > 0");
        }
        if self.target_tiles == 0 {
            return bad("target_tiles must be > 0");
        }
        if self.spawn_attempts == 0 {
            return bad("spawn_attempts must be > 0");
        }
        if !(self.separator >= 0.0 && self.vertical_gap >= 0.0) {
            return bad("gaps must be >= 0");
        }
        if !(self.base_speed.is_finite() && self.base_speed >= 0.0) {
            return bad("base_speed must be finite and >= 0");
        }
        if !(self.speed_increment.is_finite() && self.speed_increment >= 0.0) {
            return bad("speed_increment must be finite and >= 0");
        }
        if !(self.decay_step > 0.0 && self.decay_step <= 1.0) {
            return bad("decay_step must be in (0, 1]");
        }
        if !(0.0..=1.0).contains(&self.long_tile_chance) {
            return bad("long_tile_chance must be in [0, 1]");
        }
        if self.long_tile_rows == 0 {
            return bad("long_tile_rows must be > 0");
        }
        if !(self.hold_duration_ms > 0.0) {
            return bad("hold_duration_ms must be > 0");
        }
        if !(self.max_frame_gap_ms > 0.0) {
            return bad("max_frame_gap_ms must be > 0");
        }
        Ok(())
    }
}

/// Same test the page used: `/Mobi|Android/i`.
pub fn is_mobile_user_agent(user_agent: &str) -> bool {
    let ua = user_agent.to_ascii_lowercase();
    ua.contains("mobi") || ua.contains("android")
}

/// Page-level settings for the browser shell.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct WebConfig {
    /// Prefix for the API endpoints, e.g. `""` or `"https://host"`.
    pub api_base: String,
    pub user_info_id: String,
    pub points_id: String,
    pub tickets_id: String,
    pub start_screen_id: String,
    pub footer_id: String,
    pub game_over_id: String,
    /// When set, the page navigates to `<url>?score=N` after the score is saved.
    pub transition_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            api_base: String::new(),
            user_info_id: "userInfo".to_string(),
            points_id: "points".to_string(),
            tickets_id: "tickets".to_string(),
            start_screen_id: "startScreen".to_string(),
            footer_id: "footer".to_string(),
            game_over_id: "gameOver".to_string(),
            transition_url: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PHONE: &str = "Mozilla/5.0 (Linux; Android 14) Mobile Safari/537.36";
    const LAPTOP: &str = "Mozilla/5.0 (X11; Linux x86_64) Firefox/131.0";

    #[test]
    fn test_user_agent_presets() {
        assert!(is_mobile_user_agent(PHONE));
        assert!(is_mobile_user_agent("iPhone; CPU iPhone OS 17_0 like Mac OS X) MOBILE/15E148"));
        assert!(!is_mobile_user_agent(LAPTOP));
        assert_eq!(EngineConfig::for_user_agent(PHONE).base_speed, 6.0);
        assert_eq!(EngineConfig::for_user_agent(LAPTOP).speed_increment, 0.002);
    }

    #[test]
    fn test_json_overrides_keep_preset_fields() {
        let cfg = EngineConfig::from_json(r#"{"columns": 5, "clock": "wall_time"}"#, PHONE).unwrap();
        assert_eq!(cfg.columns, 5);
        assert_eq!(cfg.clock, ClockMode::WallTime);
        // untouched fields come from the mobile preset picked by the UA
        assert_eq!(cfg.base_speed, 6.0);
        assert_eq!(cfg.spawn_attempts, 100);
    }

    #[test]
    fn test_explicit_preset_wins_over_user_agent() {
        let cfg = EngineConfig::from_json(r#"{"preset": "desktop"}"#, PHONE).unwrap();
        assert_eq!(cfg, EngineConfig::desktop());
        assert!(EngineConfig::from_json(r#"{"preset": "tablet"}"#, PHONE).is_err());
    }

    #[test]
    fn test_validate_rejects_nonsense() {
        let cfg = EngineConfig { columns: 0, ..EngineConfig::desktop() };
        assert!(matches!(cfg.validate(), Err(EngineError::InvalidConfig(_))));
        let cfg = EngineConfig { decay_step: 0.0, ..EngineConfig::desktop() };
        assert!(cfg.validate().is_err());
        let cfg = EngineConfig { long_tile_chance: 1.5, ..EngineConfig::desktop() };
        assert!(cfg.validate().is_err());
        assert!(EngineConfig::from_json("[1, 2]", LAPTOP).is_err());
        assert!(EngineConfig::desktop().validate().is_ok());
    }
}
