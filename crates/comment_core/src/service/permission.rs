//! Viewer/permission collaborator for owner-based commentables.
//!
//! # Invariants
//! - Authors may delete their own moment/strategy comments.
//! - Owners of a moment/strategy may delete any comment on it.
//! - Meetings and unrecognized kinds are never granted here; meeting rules
//!   live in the lifecycle service.

use crate::model::comment::{Comment, CommentableType, UserId};
use crate::repo::commentable_repo::CommentableOwners;
use crate::repo::RepoResult;

/// Deletion check for `Moment` and `Strategy` comments.
pub trait ViewerPermissions {
    fn is_deletable(&self, comment: &Comment, acting_user: UserId) -> RepoResult<bool>;
}

/// Author-or-owner permission rule.
pub struct OwnerPermissions<O: CommentableOwners> {
    owners: O,
}

impl<O: CommentableOwners> OwnerPermissions<O> {
    pub fn new(owners: O) -> Self {
        Self { owners }
    }
}

impl<O: CommentableOwners> ViewerPermissions for OwnerPermissions<O> {
    fn is_deletable(&self, comment: &Comment, acting_user: UserId) -> RepoResult<bool> {
        match comment.commentable_type {
            CommentableType::Moment | CommentableType::Strategy => {}
            CommentableType::Meeting | CommentableType::Unrecognized(_) => return Ok(false),
        }
        if comment.is_authored_by(acting_user) {
            return Ok(true);
        }
        let owner = self
            .owners
            .owner_of(&comment.commentable_type, comment.commentable_id)?;
        Ok(owner == Some(acting_user))
    }
}
