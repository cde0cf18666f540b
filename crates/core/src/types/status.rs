//! Ticket status and its transition rules.

use serde::{Deserialize, Serialize};

/// Ticket lifecycle status.
///
/// `Open` is the initial state and `Closed` is terminal. Work moves forward
/// from `Open` into `InProgress` or `OnHold`, those two may re-enter each
/// other, and any non-closed status may close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "helpdesk.ticket_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    #[default]
    Open,
    InProgress,
    OnHold,
    Closed,
}

impl TicketStatus {
    /// Every status, in display order.
    pub const ALL: [Self; 4] = [Self::Open, Self::InProgress, Self::OnHold, Self::Closed];

    /// Returns true when no further transition or edit is permitted.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Whether a ticket in `self` may move to `next`.
    ///
    /// Staying in the same non-terminal status is accepted as a no-op.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Closed, _) | (Self::InProgress | Self::OnHold, Self::Open) => false,
            (Self::Open, _)
            | (Self::InProgress | Self::OnHold, Self::InProgress | Self::OnHold | Self::Closed) => {
                true
            }
        }
    }

    /// Wire name of the status.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::InProgress => "in_progress",
            Self::OnHold => "on_hold",
            Self::Closed => "closed",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Open => "Open",
            Self::InProgress => "In progress",
            Self::OnHold => "On hold",
            Self::Closed => "Closed",
        }
    }
}

impl std::fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TicketStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(Self::Open),
            "in_progress" => Ok(Self::InProgress),
            "on_hold" => Ok(Self::OnHold),
            "closed" => Ok(Self::Closed),
            _ => Err(format!("invalid ticket status: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_closed_is_terminal() {
        assert!(TicketStatus::Closed.is_terminal());
        assert!(!TicketStatus::Open.is_terminal());
        assert!(!TicketStatus::InProgress.is_terminal());
        assert!(!TicketStatus::OnHold.is_terminal());
    }

    #[test]
    fn test_nothing_leaves_closed() {
        for next in TicketStatus::ALL {
            assert!(!TicketStatus::Closed.can_transition_to(next));
        }
    }

    #[test]
    fn test_work_states_reenter_each_other() {
        assert!(TicketStatus::InProgress.can_transition_to(TicketStatus::OnHold));
        assert!(TicketStatus::OnHold.can_transition_to(TicketStatus::InProgress));
        assert!(TicketStatus::OnHold.can_transition_to(TicketStatus::OnHold));
    }

    #[test]
    fn test_no_return_to_open() {
        assert!(!TicketStatus::InProgress.can_transition_to(TicketStatus::Open));
        assert!(!TicketStatus::OnHold.can_transition_to(TicketStatus::Open));
        assert!(TicketStatus::Open.can_transition_to(TicketStatus::Open));
    }

    #[test]
    fn test_every_open_state_may_close() {
        for from in [TicketStatus::Open, TicketStatus::InProgress, TicketStatus::OnHold] {
            assert!(from.can_transition_to(TicketStatus::Closed));
        }
    }

    #[test]
    fn test_status_parse_and_display_agree() {
        for status in TicketStatus::ALL {
            assert_eq!(status.as_str().parse::<TicketStatus>(), Ok(status));
            assert_eq!(status.to_string(), status.as_str());
        }
        assert!("resolved".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn test_status_serde_is_snake_case() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
