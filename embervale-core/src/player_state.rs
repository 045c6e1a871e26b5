//! Per-tick player intent state.
//!
//! Small single-purpose structs grouping related fields, owned by the
//! player rather than scattered across `World`. Nothing here is behind a
//! lock: the tick task has sole ownership of all world state, so player
//! intent is drained from the per-client mailbox into plain fields once at
//! the start of each tick (`World::phase_prologue`) rather than locked on
//! every read.

use crate::character::CharacterId;

/// A player's pending movement request for the current tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementIntent {
    /// The tile the player's client last asked to move toward, or `None`
    /// if no movement intent is outstanding.
    pub destination: Option<(i32, i32)>,
}

impl MovementIntent {
    /// Clears the intent, e.g. after the tile has been reached or the
    /// path is no longer walkable.
    pub fn clear(&mut self) {
        self.destination = None;
    }
}

/// A player's pending combat request for the current tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombatIntent {
    /// The character id the player's client most recently asked to
    /// attack, or `None` if the player is not currently engaging.
    pub target_id: Option<CharacterId>,
}

/// Tracks a dead player's pending respawn.
#[derive(Debug, Clone, Copy, Default)]
pub struct RespawnState {
    /// The tick the respawn-processing phase should act on this player, if
    /// they are currently dead and awaiting respawn.
    pub respawn_at_tick: Option<u64>,
}

impl RespawnState {
    /// Schedules a respawn `delay_ticks` after `current_tick`.
    pub fn schedule(&mut self, current_tick: u64, delay_ticks: u64) {
        self.respawn_at_tick = Some(current_tick + delay_ticks);
    }

    /// Returns `true` and clears the schedule if `current_tick` has
    /// reached the scheduled respawn tick.
    pub fn is_due(&mut self, current_tick: u64) -> bool {
        match self.respawn_at_tick {
            Some(due) if current_tick >= due => {
                self.respawn_at_tick = None;
                true
            }
            _ => false,
        }
    }
}

/// Liveness tracking for a player's network connection, independent of the
/// `Connected`/`SoftDisconnected` session state machine in
/// [`crate::session`]. Used to decide when a connected-but-silent client
/// should be treated as gone.
#[derive(Debug, Clone, Copy)]
pub struct HeartbeatState {
    /// The tick on which this player last had any ingress activity
    /// (movement, combat, or an explicit heartbeat message).
    pub last_activity_tick: u64,
}

impl HeartbeatState {
    /// A heartbeat state considered fresh as of `tick`.
    #[must_use]
    pub const fn new(tick: u64) -> Self {
        Self { last_activity_tick: tick }
    }

    /// Records activity at `tick`.
    pub fn touch(&mut self, tick: u64) {
        self.last_activity_tick = tick;
    }
}

/// All per-tick intent and liveness state for one player, bundled so
/// `World` can hold exactly one of these alongside each `Player`.
#[derive(Debug, Clone, Default)]
pub struct PlayerIntents {
    /// Pending movement.
    pub movement: MovementIntent,
    /// Pending combat target.
    pub combat: CombatIntent,
    /// Pending respawn schedule.
    pub respawn: RespawnState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respawn_state_is_not_due_before_its_tick() {
        let mut state = RespawnState::default();
        state.schedule(100, 10);
        assert!(!state.is_due(109));
        assert!(state.is_due(110));
        // Once fired, the schedule is cleared.
        assert!(!state.is_due(110));
    }

    #[test]
    fn movement_intent_clear_removes_destination() {
        let mut intent = MovementIntent { destination: Some((3, 4)) };
        intent.clear();
        assert_eq!(intent.destination, None);
    }
}
