//! Application-level configuration loading, including the round timing knobs.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::room::GameSettings;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "SECOND_GUESS_BACK_CONFIG_PATH";

/// Players required before a game can start (also the room quota).
const DEFAULT_MAX_PLAYERS: usize = 4;
/// Rounds each player answers over a full game.
const DEFAULT_ROUNDS_PER_PLAYER: u32 = 3;
/// Seconds the prediction window stays open.
const DEFAULT_PREDICTION_SECS: u64 = 30;
/// Seconds the answerer has once predictions close.
const DEFAULT_ANSWER_SECS: u64 = 15;
/// Seconds the per-round scoring screen stays up.
const DEFAULT_SCORING_SECS: u64 = 3;
/// Seconds the final leaderboard stays up.
const DEFAULT_FINAL_SCORES_SECS: u64 = 10;
/// Seconds the winner celebration lasts.
const DEFAULT_WINNER_ANIMATION_SECS: u64 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Room capacity and start quota.
    pub max_players: usize,
    /// Rounds each player answers; total rounds is this times the roster size.
    pub rounds_per_player: u32,
    settings: GameSettings,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        max_players = app_config.max_players,
                        "loaded game configuration from config file"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Timing settings stamped onto every newly created room.
    pub fn default_settings(&self) -> GameSettings {
        self.settings.clone()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_players: DEFAULT_MAX_PLAYERS,
            rounds_per_player: DEFAULT_ROUNDS_PER_PLAYER,
            settings: GameSettings {
                prediction_secs: DEFAULT_PREDICTION_SECS,
                answer_secs: DEFAULT_ANSWER_SECS,
                scoring_secs: DEFAULT_SCORING_SECS,
                final_scores_secs: DEFAULT_FINAL_SCORES_SECS,
                winner_animation_secs: DEFAULT_WINNER_ANIMATION_SECS,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    max_players: Option<usize>,
    rounds_per_player: Option<u32>,
    prediction_secs: Option<u64>,
    answer_secs: Option<u64>,
    scoring_secs: Option<u64>,
    final_scores_secs: Option<u64>,
    winner_animation_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            max_players: value.max_players.unwrap_or(defaults.max_players),
            rounds_per_player: value
                .rounds_per_player
                .unwrap_or(defaults.rounds_per_player),
            settings: GameSettings {
                prediction_secs: value
                    .prediction_secs
                    .unwrap_or(defaults.settings.prediction_secs),
                answer_secs: value.answer_secs.unwrap_or(defaults.settings.answer_secs),
                scoring_secs: value
                    .scoring_secs
                    .unwrap_or(defaults.settings.scoring_secs),
                final_scores_secs: value
                    .final_scores_secs
                    .unwrap_or(defaults.settings.final_scores_secs),
                winner_animation_secs: value
                    .winner_animation_secs
                    .unwrap_or(defaults.settings.winner_animation_secs),
            },
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
