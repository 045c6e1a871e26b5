//! World configuration.
//!
//! Rather than a process-wide global loaded once from a config file, the
//! bin crate loads configuration from the environment and hands each
//! `World` an explicit `Arc<WorldConfig>` at construction, so tests can
//! build worlds with whatever configuration they need without touching
//! process globals.

use std::collections::HashSet;
use std::time::Duration;

/// Tunables for one running world.
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Wall-clock duration of one simulation tick. Default 500ms.
    pub tick_interval: Duration,
    /// Default visibility radius `R` used to build a player's `(2R+1)x(2R+1)`
    /// visibility square when the player has not requested a different one.
    pub default_visibility_radius: u32,
    /// Seconds a `SoftDisconnected` session may be reclaimed before its
    /// character is logged out and persisted.
    pub reconnect_window_seconds: u64,
    /// Directory containing `chunk_<X>_<Y>.json` terrain files.
    pub terrain_dir: std::path::PathBuf,
    /// Whether a chunk whose terrain file is missing from disk should be
    /// treated as entirely walkable (`true`) or entirely unwalkable
    /// (`false`). Defaults to `true`.
    pub missing_chunk_is_walkable: bool,
    /// Secret used to verify `HS256` JWTs presented at login, or `None` to
    /// accept any well-formed, unverified token (development mode only).
    pub jwt_secret: Option<String>,
    /// This world's name, as recorded against `active_sessions.world` and
    /// reported by `/healthz`.
    pub world_name: String,
    /// Maximum number of concurrently connected players. A login attempt
    /// past this limit is refused with `WORLD_FULL`.
    pub max_players: usize,
    /// Account ids allowed to issue `adminCommand` messages. Empty by
    /// default: nobody may run admin commands until configured.
    pub operator_account_ids: HashSet<i64>,
}

impl WorldConfig {
    /// Builds a config with the documented default values, pointed at
    /// `terrain_dir`.
    #[must_use]
    pub fn with_terrain_dir(terrain_dir: impl Into<std::path::PathBuf>) -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            default_visibility_radius: 1,
            reconnect_window_seconds: 30,
            terrain_dir: terrain_dir.into(),
            missing_chunk_is_walkable: true,
            jwt_secret: None,
            world_name: "default".to_string(),
            max_players: 200,
            operator_account_ids: HashSet::new(),
        }
    }
}
