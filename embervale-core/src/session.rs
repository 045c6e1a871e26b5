//! Connection/reconnection session state machine.
//!
//! A player's session is `Connected` while its WebSocket is
//! live. On disconnect it moves to `SoftDisconnected` for
//! [`crate::config::WorldConfig::reconnect_window_seconds`]; a reconnect
//! within that window resumes the same character, otherwise the character
//! is fully logged out. A second login attempt for an account already
//! `Connected`, or still within its reclaim window without presenting the
//! matching session, is rejected as a duplicate login.

use rustc_hash::FxHashMap;

use crate::character::CharacterId;
use crate::error::{WorldError, WorldResult};

/// A session's place in the connect/disconnect lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    /// The client's transport is live and ingress is being read normally.
    Connected,
    /// The transport dropped; the character remains in the world and can
    /// be reclaimed by a reconnect until `disconnected_at_tick +
    /// reconnect_window_ticks`.
    SoftDisconnected {
        /// The tick the disconnect was observed.
        disconnected_at_tick: u64,
    },
}

/// One account's session record.
#[derive(Debug, Clone)]
pub struct Session {
    /// The character this session is attached to.
    pub player_id: CharacterId,
    /// Current lifecycle status.
    pub status: SessionStatus,
}

/// Tracks exactly one session per account, enforcing the no-duplicate-login
/// and reconnect-reclaim rules.
#[derive(Debug, Default)]
pub struct SessionTable {
    by_account: FxHashMap<i64, Session>,
}

impl SessionTable {
    /// An empty table.
    #[must_use]
    pub fn new() -> Self {
        Self { by_account: FxHashMap::default() }
    }

    /// Registers a brand new `Connected` session for `account_id`,
    /// attached to `player_id`. Fails if the account already has a live or
    /// reclaimable session.
    pub fn login(&mut self, account_id: i64, player_id: CharacterId) -> WorldResult<()> {
        if self.by_account.contains_key(&account_id) {
            return Err(WorldError::DuplicateLogin(player_id));
        }
        self.by_account.insert(account_id, Session { player_id, status: SessionStatus::Connected });
        Ok(())
    }

    /// Moves `account_id`'s session to `SoftDisconnected` as of `tick`.
    /// No-op (not an error) if the account has no session, since ingress
    /// disconnects can race with an already-expired reclaim window.
    pub fn disconnect(&mut self, account_id: i64, tick: u64) {
        if let Some(session) = self.by_account.get_mut(&account_id) {
            session.status = SessionStatus::SoftDisconnected { disconnected_at_tick: tick };
        }
    }

    /// Attempts to reclaim a `SoftDisconnected` session for `account_id`
    /// within its reconnect window. On success, marks the session
    /// `Connected` again and returns the character id to resume. Fails
    /// with [`WorldError::DuplicateLogin`] if the session is already
    /// `Connected` (a second client racing in), or
    /// [`WorldError::UnknownSession`] if there is no session to reclaim.
    pub fn reclaim(
        &mut self,
        account_id: i64,
        tick: u64,
        reconnect_window_ticks: u64,
    ) -> WorldResult<CharacterId> {
        let session = self
            .by_account
            .get_mut(&account_id)
            .ok_or(WorldError::UnknownSession(0))?;

        match session.status {
            SessionStatus::Connected => Err(WorldError::DuplicateLogin(session.player_id)),
            SessionStatus::SoftDisconnected { disconnected_at_tick } => {
                if tick.saturating_sub(disconnected_at_tick) > reconnect_window_ticks {
                    Err(WorldError::UnknownSession(session.player_id))
                } else {
                    session.status = SessionStatus::Connected;
                    Ok(session.player_id)
                }
            }
        }
    }

    /// Removes and returns every session whose reclaim window has expired
    /// as of `tick`. The tick orchestrator fully logs these characters out
    /// (persists and despawns them) after calling this.
    pub fn expire_stale(&mut self, tick: u64, reconnect_window_ticks: u64) -> Vec<(i64, CharacterId)> {
        let expired: Vec<i64> = self
            .by_account
            .iter()
            .filter_map(|(account_id, session)| match session.status {
                SessionStatus::SoftDisconnected { disconnected_at_tick }
                    if tick.saturating_sub(disconnected_at_tick) > reconnect_window_ticks =>
                {
                    Some(*account_id)
                }
                _ => None,
            })
            .collect();

        expired
            .into_iter()
            .filter_map(|account_id| self.by_account.remove(&account_id).map(|s| (account_id, s.player_id)))
            .collect()
    }

    /// Removes a session outright, e.g. after a full logout. Used by the
    /// tick orchestrator once [`SessionTable::expire_stale`] has returned
    /// an account for final cleanup elsewhere (persistence etc.).
    pub fn remove(&mut self, account_id: i64) {
        self.by_account.remove(&account_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: u64 = 60; // 30s at 2 ticks/sec.

    #[test]
    fn duplicate_login_is_rejected_while_connected() {
        let mut table = SessionTable::new();
        table.login(1, 100).expect("first login");
        assert!(matches!(table.login(1, 200), Err(WorldError::DuplicateLogin(_))));
    }

    #[test]
    fn reclaim_within_window_resumes_the_same_character() {
        let mut table = SessionTable::new();
        table.login(1, 100).expect("login");
        table.disconnect(1, 1_000);
        let resumed = table.reclaim(1, 1_000 + WINDOW, WINDOW).expect("reclaim");
        assert_eq!(resumed, 100);
    }

    #[test]
    fn reclaim_past_the_window_fails() {
        let mut table = SessionTable::new();
        table.login(1, 100).expect("login");
        table.disconnect(1, 1_000);
        let result = table.reclaim(1, 1_000 + WINDOW + 1, WINDOW);
        assert!(matches!(result, Err(WorldError::UnknownSession(_))));
    }

    #[test]
    fn reclaiming_a_still_connected_session_is_a_duplicate_login() {
        let mut table = SessionTable::new();
        table.login(1, 100).expect("login");
        let result = table.reclaim(1, 10, WINDOW);
        assert!(matches!(result, Err(WorldError::DuplicateLogin(_))));
    }

    #[test]
    fn expire_stale_sweeps_only_sessions_past_their_window() {
        let mut table = SessionTable::new();
        table.login(1, 100).expect("login a");
        table.login(2, 200).expect("login b");
        table.disconnect(1, 0);
        table.disconnect(2, 1_000);

        let expired = table.expire_stale(1_000, WINDOW);
        assert_eq!(expired, vec![(1, 100)]);
    }

    #[test]
    fn after_full_logout_the_account_can_log_in_again() {
        let mut table = SessionTable::new();
        table.login(1, 100).expect("login");
        table.disconnect(1, 0);
        let _ = table.expire_stale(0 + WINDOW + 1, WINDOW);
        table.login(1, 999).expect("fresh login should succeed after logout");
    }
}
