//! Capability predicates.
//!
//! Each operation declares which predicates gate it; they compose by
//! plain `?` chaining:
//!
//! ```ignore
//! let actor = authenticated(actor)?;
//! staff_or_read_only(actor, Action::Create)?;
//! ```

use domains::{Actor, DomainError, DomainResult};
use uuid::Uuid;

/// What an operation does to the resource it touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    List,
    Retrieve,
    Create,
    Update,
    Delete,
}

impl Action {
    /// Read-only actions.
    pub fn is_safe(self) -> bool {
        matches!(self, Action::List | Action::Retrieve)
    }
}

/// Every endpoint requires an identity.
pub fn authenticated(actor: Option<&Actor>) -> DomainResult<&Actor> {
    actor.ok_or(DomainError::Unauthenticated)
}

/// Reads pass; writes require staff.
pub fn staff_or_read_only(actor: &Actor, action: Action) -> DomainResult<()> {
    if action.is_safe() || actor.is_staff {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}

/// Reads pass; writes require the actor to be the object's author.
pub fn author_or_read_only(actor: &Actor, action: Action, author_id: Uuid) -> DomainResult<()> {
    if action.is_safe() || actor.user_id == author_id {
        Ok(())
    } else {
        Err(DomainError::Forbidden)
    }
}
