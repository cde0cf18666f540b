//! Actors supplied by the identity provider.

use serde::{Deserialize, Serialize};

use super::id::UserId;

/// The authenticated party performing an operation.
///
/// Actors are not owned by the helpdesk. The identity provider hands one over
/// per request and the helpdesk only reads its role flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: UserId,
    pub is_superuser: bool,
    /// Holds the explicit permission to manage tickets.
    pub has_staff_permission: bool,
}

impl Actor {
    /// An actor with no role flags.
    #[must_use]
    pub const fn requester(id: UserId) -> Self {
        Self {
            id,
            is_superuser: false,
            has_staff_permission: false,
        }
    }

    /// An actor holding the ticket-management permission.
    #[must_use]
    pub const fn staff(id: UserId) -> Self {
        Self {
            id,
            is_superuser: false,
            has_staff_permission: true,
        }
    }

    /// A superuser.
    #[must_use]
    pub const fn superuser(id: UserId) -> Self {
        Self {
            id,
            is_superuser: true,
            has_staff_permission: false,
        }
    }

    /// IT staff are superusers or holders of the ticket-management permission.
    #[must_use]
    pub const fn is_it_staff(&self) -> bool {
        self.is_superuser || self.has_staff_permission
    }
}

/// A user as mirrored in the helpdesk's directory.
///
/// The directory is fed by the identity provider and is consulted when a
/// ticket is assigned to somebody other than the caller, and to remember the
/// contact string a user last typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub id: UserId,
    pub display_name: String,
    pub is_superuser: bool,
    pub has_staff_permission: bool,
    pub is_active: bool,
    /// Phone number or chat handle remembered from the user's last ticket.
    pub contact: String,
}

impl DirectoryEntry {
    /// Role flags of this user as an [`Actor`].
    #[must_use]
    pub const fn actor(&self) -> Actor {
        Actor {
            id: self.id,
            is_superuser: self.is_superuser,
            has_staff_permission: self.has_staff_permission,
        }
    }

    /// Whether tickets may be assigned to this user.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        self.is_active && self.actor().is_it_staff()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(is_active: bool, is_superuser: bool, has_staff_permission: bool) -> DirectoryEntry {
        DirectoryEntry {
            id: UserId::new(9),
            display_name: "Somchai".to_string(),
            is_superuser,
            has_staff_permission,
            is_active,
            contact: String::new(),
        }
    }

    #[test]
    fn test_it_staff_flags() {
        assert!(!Actor::requester(UserId::new(1)).is_it_staff());
        assert!(Actor::staff(UserId::new(1)).is_it_staff());
        assert!(Actor::superuser(UserId::new(1)).is_it_staff());
    }

    #[test]
    fn test_assignable_requires_active_staff() {
        assert!(entry(true, false, true).is_assignable());
        assert!(entry(true, true, false).is_assignable());
        assert!(!entry(false, false, true).is_assignable());
        assert!(!entry(true, false, false).is_assignable());
    }
}
