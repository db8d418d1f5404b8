//! Invariants of the follow graph that hold independently of storage.

use uuid::Uuid;

use super::error::DomainError;

/// Reject edges that would point an author at themselves.
pub fn ensure_not_self(follower_id: Uuid, author_id: Uuid) -> Result<(), DomainError> {
    if follower_id == author_id {
        return Err(DomainError::invalid_operation(
            "an author cannot follow themselves",
        ));
    }
    Ok(())
}
