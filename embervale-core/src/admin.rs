//! Administrative commands.
//!
//! A small closed command enum (`AdminCommand`) rather than a trait-object
//! command pattern, since this world has no argument grammar to parse —
//! commands arrive already structured from the network layer.

use crate::character::CharacterId;
use crate::error::{WorldError, WorldResult};

/// The narrow slice of world mutation an admin command is allowed to
/// perform. `World` implements this; tests can implement it over a bare
/// `HashMap` of character positions/health without constructing a world.
pub trait AdminCommandContext {
    /// Sets a character's health to zero and runs death settlement for it
    /// immediately, outside the normal combat phase.
    fn kill_character(&mut self, id: CharacterId) -> WorldResult<()>;

    /// Moves a character to `position` immediately, bypassing movement
    /// intent and pathing.
    fn teleport_character(&mut self, id: CharacterId, position: (i32, i32)) -> WorldResult<()>;
}

/// One administrative command, as decoded from the network layer.
#[derive(Debug, Clone, Copy)]
pub enum AdminCommand {
    /// Immediately kills a character.
    Kill {
        /// The character to kill.
        target: CharacterId,
    },
    /// Immediately moves a character.
    Teleport {
        /// The character to move.
        target: CharacterId,
        /// The destination tile.
        position: (i32, i32),
    },
}

impl AdminCommand {
    /// Executes this command against `context`.
    pub fn execute(self, context: &mut impl AdminCommandContext) -> WorldResult<()> {
        match self {
            Self::Kill { target } => context.kill_character(target),
            Self::Teleport { target, position } => context.teleport_character(target, position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct FakeWorld {
        health: HashMap<CharacterId, i32>,
        positions: HashMap<CharacterId, (i32, i32)>,
    }

    impl AdminCommandContext for FakeWorld {
        fn kill_character(&mut self, id: CharacterId) -> WorldResult<()> {
            let health = self.health.get_mut(&id).ok_or(WorldError::UnknownCharacter(id))?;
            *health = 0;
            Ok(())
        }

        fn teleport_character(&mut self, id: CharacterId, position: (i32, i32)) -> WorldResult<()> {
            let slot = self.positions.get_mut(&id).ok_or(WorldError::UnknownCharacter(id))?;
            *slot = position;
            Ok(())
        }
    }

    #[test]
    fn kill_command_zeroes_health() {
        let mut world = FakeWorld::default();
        world.health.insert(1, 10);
        AdminCommand::Kill { target: 1 }.execute(&mut world).expect("kill");
        assert_eq!(world.health[&1], 0);
    }

    #[test]
    fn teleport_command_moves_the_character() {
        let mut world = FakeWorld::default();
        world.positions.insert(1, (0, 0));
        AdminCommand::Teleport { target: 1, position: (5, 5) }.execute(&mut world).expect("teleport");
        assert_eq!(world.positions[&1], (5, 5));
    }

    #[test]
    fn unknown_character_is_an_error() {
        let mut world = FakeWorld::default();
        let result = AdminCommand::Kill { target: 99 }.execute(&mut world);
        assert!(matches!(result, Err(WorldError::UnknownCharacter(99))));
    }
}
