//! Comment lifecycle use-case service.
//!
//! # Responsibility
//! - Create comments and trigger their creation notifications.
//! - Authorize deletions per commentable kind and clean up derived
//!   notification state before removing the comment.
//!
//! # Invariants
//! - The acting user is always an explicit argument.
//! - A failed create never notifies; a failed delete never mutates.
//! - Meeting deletion: (author AND member) OR leader. Any unrecognized
//!   commentable kind is denied.
//! - Notification removal precedes comment removal; callers that need both
//!   to land together run the service inside one transaction.

use crate::config::CoreConfig;
use crate::model::comment::{
    Comment, CommentId, CommentValidationError, CommentableId, CommentableType, NewComment,
    UserId, Visibility,
};
use crate::repo::comment_repo::{CommentStore, SqliteCommentStore};
use crate::repo::commentable_repo::{MeetingDirectory, SqliteCommentableRepository};
use crate::repo::notification_repo::{NotificationService, SqliteNotificationService};
use crate::repo::{RepoError, RepoResult};
use crate::service::permission::{OwnerPermissions, ViewerPermissions};
use log::{info, warn};
use rusqlite::Connection;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Lifecycle failures, before they are collapsed at the boundary.
#[derive(Debug)]
pub enum CommentServiceError {
    /// Creation payload failed validation. Nothing was written.
    Validation(CommentValidationError),
    /// No comment with this id.
    NotFound(CommentId),
    /// The acting user may not delete this comment.
    Unauthorized {
        comment_id: CommentId,
        user_id: UserId,
    },
    /// Storage failure.
    Repo(RepoError),
}

impl CommentServiceError {
    /// Whether the failure is caused by the request rather than the server.
    ///
    /// Not-found and unauthorized are both client errors and must look the
    /// same to the client.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Repo(_))
    }
}

impl Display for CommentServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "invalid comment: {err}"),
            Self::NotFound(id) => write!(f, "comment not found: {id}"),
            Self::Unauthorized {
                comment_id,
                user_id,
            } => write!(f, "user {user_id} may not delete comment {comment_id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CommentServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for CommentServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Client-facing projection of one comment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
    pub comment_id: CommentId,
    pub commentable_type: CommentableType,
    pub commentable_id: CommentableId,
    pub comment_by: UserId,
    pub comment: String,
    pub visibility: Visibility,
    pub viewers: Vec<UserId>,
    pub created_at: i64,
    /// Whether the requesting user may delete it.
    pub deletable: bool,
}

impl CommentView {
    fn from_comment(comment: Comment, deletable: bool) -> Self {
        Self {
            comment_id: comment.id,
            commentable_type: comment.commentable_type,
            commentable_id: comment.commentable_id,
            comment_by: comment.comment_by,
            comment: comment.comment,
            visibility: comment.visibility,
            viewers: comment.viewers,
            created_at: comment.created_at,
            deletable,
        }
    }
}

/// Lifecycle service over a comment store and its collaborators.
pub struct CommentService<S, N, P, M> {
    store: S,
    notifications: N,
    permissions: P,
    meetings: M,
}

/// Service wired to SQLite implementations sharing one connection.
pub type SqliteCommentService<'conn> = CommentService<
    SqliteCommentStore<'conn>,
    SqliteNotificationService<'conn>,
    OwnerPermissions<SqliteCommentableRepository<'conn>>,
    SqliteCommentableRepository<'conn>,
>;

impl<'conn> SqliteCommentService<'conn> {
    /// Builds the SQLite-backed service. Pass a `Transaction` (it derefs to
    /// `Connection`) to make each operation atomic.
    pub fn for_connection(conn: &'conn Connection, config: &CoreConfig) -> RepoResult<Self> {
        let commentables = SqliteCommentableRepository::try_new(conn)?;
        Ok(CommentService::new(
            SqliteCommentStore::try_new(conn)?.with_max_comment_chars(config.max_comment_chars),
            SqliteNotificationService::try_new(conn)?,
            OwnerPermissions::new(commentables),
            commentables,
        ))
    }
}

impl<S, N, P, M> CommentService<S, N, P, M>
where
    S: CommentStore,
    N: NotificationService,
    P: ViewerPermissions,
    M: MeetingDirectory,
{
    pub fn new(store: S, notifications: N, permissions: P, meetings: M) -> Self {
        Self {
            store,
            notifications,
            permissions,
            meetings,
        }
    }

    /// Persists a comment authored by `acting_user` and notifies about it.
    ///
    /// # Contract
    /// - Validation failure returns `Validation` with zero notifications.
    /// - Success issues exactly one `notify_created` call.
    /// - Once written, the comment is returned even if the `deletable` lookup
    ///   fails; the flag is then `false`.
    pub fn create(
        &self,
        input: &NewComment,
        acting_user: UserId,
    ) -> Result<CommentView, CommentServiceError> {
        let comment = match self.store.create_from(input, acting_user) {
            Ok(comment) => comment,
            Err(RepoError::Validation(err)) => {
                info!(
                    "event=comment_create module=service status=rejected user_id={acting_user} reason={err}"
                );
                return Err(CommentServiceError::Validation(err));
            }
            Err(err) => return Err(err.into()),
        };

        let recipients = self.notifications.notify_created(&comment, acting_user)?;
        info!(
            "event=comment_create module=service status=ok comment_id={} commentable_type={} commentable_id={} user_id={acting_user} recipients={recipients}",
            comment.id, comment.commentable_type, comment.commentable_id
        );

        // The comment is already written; a failed lookup only hides the flag.
        let deletable = self.may_delete(&comment, acting_user).unwrap_or_else(|err| {
            warn!(
                "event=comment_create module=service status=degraded comment_id={} user_id={acting_user} error={err}",
                comment.id
            );
            false
        });
        Ok(CommentView::from_comment(comment, deletable))
    }

    /// Deletes one comment on behalf of `acting_user` and returns its id.
    ///
    /// # Contract
    /// - Missing comment: `NotFound`. Denied: `Unauthorized`. Neither mutates.
    /// - Success removes notifications tagged `(id, commentable_type)`, then
    ///   the comment.
    pub fn delete(
        &self,
        comment_id: CommentId,
        acting_user: UserId,
    ) -> Result<CommentId, CommentServiceError> {
        let Some(comment) = self.store.find_by_id(comment_id)? else {
            info!(
                "event=comment_delete module=service status=not_found comment_id={comment_id} user_id={acting_user}"
            );
            return Err(CommentServiceError::NotFound(comment_id));
        };

        if !self.may_delete(&comment, acting_user)? {
            warn!(
                "event=comment_delete module=service status=denied comment_id={comment_id} commentable_type={} user_id={acting_user}",
                comment.commentable_type
            );
            return Err(CommentServiceError::Unauthorized {
                comment_id,
                user_id: acting_user,
            });
        }

        let removed = self
            .notifications
            .remove(comment.id, &comment.commentable_type)?;
        self.store.delete(comment.id)?;
        info!(
            "event=comment_delete module=service status=ok comment_id={comment_id} commentable_type={} user_id={acting_user} notifications_removed={removed}",
            comment.commentable_type
        );
        Ok(comment.id)
    }

    /// Comments on one commentable that `acting_user` can read.
    pub fn list_for_commentable(
        &self,
        commentable_type: &CommentableType,
        commentable_id: CommentableId,
        acting_user: UserId,
    ) -> Result<Vec<CommentView>, CommentServiceError> {
        let comments = self
            .store
            .list_for_commentable(commentable_type, commentable_id)?;
        let mut views = Vec::with_capacity(comments.len());
        for comment in comments {
            if !comment.is_visible_to(acting_user) {
                continue;
            }
            let deletable = self.may_delete(&comment, acting_user)?;
            views.push(CommentView::from_comment(comment, deletable));
        }
        Ok(views)
    }

    fn may_delete(&self, comment: &Comment, acting_user: UserId) -> RepoResult<bool> {
        match &comment.commentable_type {
            CommentableType::Moment | CommentableType::Strategy => {
                self.permissions.is_deletable(comment, acting_user)
            }
            CommentableType::Meeting => {
                let Some(meeting) = self.meetings.find_meeting(comment.commentable_id)? else {
                    return Ok(false);
                };
                let own_comment_while_member =
                    comment.is_authored_by(acting_user) && meeting.is_member(acting_user);
                Ok(own_comment_while_member || meeting.is_led_by(acting_user))
            }
            CommentableType::Unrecognized(_) => Ok(false),
        }
    }
}
