//! Domain model for comments and the entities they attach to.
//!
//! # Responsibility
//! - Define canonical data structures used by the lifecycle service.
//! - Keep commentable entities reduced to what authorization needs.
//!
//! # Invariants
//! - Every comment is identified by a stable `CommentId`.
//! - Comments are hard-deleted; derived notification state goes with them.

pub mod comment;
pub mod meeting;
pub mod notification;
