//! Comment lifecycle core.
//!
//! Owns comment storage, per-commentable deletion rules and the notification
//! side effects of creating and deleting comments.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::comment::{
    Comment, CommentId, CommentValidationError, CommentableId, CommentableType, NewComment,
    UserId, Visibility,
};
pub use model::meeting::{Meeting, MeetingMember};
pub use model::notification::{comment_notification_key, NotificationRecord};
pub use repo::comment_repo::{CommentStore, SqliteCommentStore};
pub use repo::commentable_repo::{
    CommentableOwners, MeetingDirectory, SqliteCommentableRepository,
};
pub use repo::notification_repo::{NotificationService, SqliteNotificationService};
pub use repo::{RepoError, RepoResult};
pub use service::comment_service::{
    CommentService, CommentServiceError, CommentView, SqliteCommentService,
};
pub use service::permission::{OwnerPermissions, ViewerPermissions};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
