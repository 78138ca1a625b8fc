//! Board symbols and session roles.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two board symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// The first symbol, always bound to the host.
    X,
    /// The second symbol, always bound to the guest.
    O,
}

impl Mark {
    /// The other symbol.
    pub fn opponent(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }
}

impl Default for Mark {
    fn default() -> Self {
        Self::X
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X => write!(f, "X"),
            Self::O => write!(f, "O"),
        }
    }
}

/// One of the two fixed session roles.
///
/// Roles are assigned at session creation and never change: the creator is
/// the host, the joiner is the guest. Each role is bound to one [`Mark`]
/// for the session's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The participant that created the session.
    Host,
    /// The participant that joined the session.
    Guest,
}

impl Role {
    /// The mark this role plays with.
    pub fn mark(self) -> Mark {
        match self {
            Self::Host => Mark::X,
            Self::Guest => Mark::O,
        }
    }

    /// The other role.
    pub fn other(self) -> Self {
        match self {
            Self::Host => Self::Guest,
            Self::Guest => Self::Host,
        }
    }

    /// Whether it is this role's turn when `current` is next to move.
    pub fn is_turn(self, current: Mark) -> bool {
        self.mark() == current
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Host => write!(f, "host"),
            Self::Guest => write!(f, "guest"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_oppose_each_other() {
        assert_eq!(Mark::X.opponent(), Mark::O);
        assert_eq!(Mark::O.opponent(), Mark::X);
    }

    #[test]
    fn role_mark_assignment_is_fixed() {
        assert_eq!(Role::Host.mark(), Mark::X);
        assert_eq!(Role::Guest.mark(), Mark::O);
    }

    #[test]
    fn exactly_one_role_has_the_turn() {
        for current in [Mark::X, Mark::O] {
            let host_turn = Role::Host.is_turn(current);
            let guest_turn = Role::Guest.is_turn(current);
            assert!(host_turn != guest_turn);
        }
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Host).unwrap(), "\"host\"");
        assert_eq!(serde_json::to_string(&Role::Guest).unwrap(), "\"guest\"");
    }

    #[test]
    fn mark_serializes_as_symbol() {
        assert_eq!(serde_json::to_string(&Mark::X).unwrap(), "\"X\"");
        let restored: Mark = serde_json::from_str("\"O\"").unwrap();
        assert_eq!(restored, Mark::O);
    }
}
