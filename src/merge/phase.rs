//! Merge session phases.
//!
//! ```text
//! Initialized → Reviewing ⇄ Resolved → Committed
//!      │            │           │
//!      └────────────┴───────────┴→ Abandoned
//! ```
//!
//! Editing a resolved buffer, or a failed commit, moves the session back to
//! `Reviewing`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The current phase of a merge session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePhase {
    /// Diff computed, buffer seeded with the base side.
    Initialized,
    /// The user is navigating conflicts and editing the buffer.
    Reviewing,
    /// The buffer has been accepted and is ready to commit.
    Resolved,
    /// The merge commit was recorded.
    Committed,
    /// The session was dropped without committing.
    Abandoned,
}

impl MergePhase {
    /// Returns `true` for `Committed` and `Abandoned`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Committed | Self::Abandoned)
    }

    /// Returns `true` while the buffer may still change.
    #[must_use]
    pub const fn is_editable(self) -> bool {
        !self.is_terminal()
    }

    /// Returns the set of valid next phases from this phase.
    #[must_use]
    pub const fn valid_transitions(self) -> &'static [Self] {
        match self {
            Self::Initialized => &[Self::Reviewing, Self::Abandoned],
            Self::Reviewing => &[Self::Resolved, Self::Abandoned],
            Self::Resolved => &[Self::Reviewing, Self::Committed, Self::Abandoned],
            Self::Committed | Self::Abandoned => &[],
        }
    }

    /// Check whether transitioning to `next` is valid.
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.valid_transitions().contains(&next)
    }
}

impl fmt::Display for MergePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Initialized => write!(f, "initialized"),
            Self::Reviewing => write!(f, "reviewing"),
            Self::Resolved => write!(f, "resolved"),
            Self::Committed => write!(f, "committed"),
            Self::Abandoned => write!(f, "abandoned"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [MergePhase; 5] = [
        MergePhase::Initialized,
        MergePhase::Reviewing,
        MergePhase::Resolved,
        MergePhase::Committed,
        MergePhase::Abandoned,
    ];

    #[test]
    fn happy_path_is_valid() {
        assert!(MergePhase::Initialized.can_transition_to(MergePhase::Reviewing));
        assert!(MergePhase::Reviewing.can_transition_to(MergePhase::Resolved));
        assert!(MergePhase::Resolved.can_transition_to(MergePhase::Committed));
    }

    #[test]
    fn resolved_can_reopen() {
        assert!(MergePhase::Resolved.can_transition_to(MergePhase::Reviewing));
    }

    #[test]
    fn cannot_skip_review() {
        assert!(!MergePhase::Initialized.can_transition_to(MergePhase::Resolved));
        assert!(!MergePhase::Initialized.can_transition_to(MergePhase::Committed));
        assert!(!MergePhase::Reviewing.can_transition_to(MergePhase::Committed));
    }

    #[test]
    fn terminal_phases_have_no_exits() {
        for phase in ALL.into_iter().filter(|p| p.is_terminal()) {
            assert!(phase.valid_transitions().is_empty(), "{phase}");
            assert!(!phase.is_editable());
        }
    }

    #[test]
    fn every_live_phase_can_abandon() {
        for phase in ALL.into_iter().filter(|p| !p.is_terminal()) {
            assert!(phase.can_transition_to(MergePhase::Abandoned), "{phase}");
        }
    }

    #[test]
    fn display_and_serde_agree() {
        for phase in ALL {
            let json = serde_json::to_string(&phase).unwrap();
            assert_eq!(json, format!("\"{phase}\""));
        }
    }
}
