//! Comment notification contract and SQLite implementation.
//!
//! # Responsibility
//! - Record one notification per recipient when a comment is created.
//! - Remove every notification derived from a comment when it is deleted.
//!
//! # Invariants
//! - The acting user is never a recipient of their own comment.
//! - All records of one comment share `comment_on_<type>_<id>` as
//!   `unique_id`; removal is keyed on it, so it is idempotent.
//! - Payloads carry a short whitespace-normalized snippet, never the full body.

use crate::model::comment::{Comment, CommentId, CommentableType, UserId, Visibility};
use crate::model::notification::{comment_notification_key, NotificationRecord};
use crate::repo::commentable_repo::{
    CommentableOwners, MeetingDirectory, SqliteCommentableRepository,
};
use crate::repo::{ensure_tables, parse_uuid, with_savepoint, RepoError, RepoResult};
use log::info;
use once_cell::sync::Lazy;
use regex::Regex;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeSet;

const SNIPPET_MAX_CHARS: usize = 60;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Notification side effects driven by the lifecycle service.
pub trait NotificationService {
    /// Records "comment created" state; returns the number of recipients.
    fn notify_created(&self, comment: &Comment, acting_user: UserId) -> RepoResult<usize>;
    /// Removes state derived from `comment_id`; returns removed records.
    fn remove(&self, comment_id: CommentId, commentable_type: &CommentableType)
        -> RepoResult<usize>;
}

/// SQLite-backed notification records.
pub struct SqliteNotificationService<'conn> {
    conn: &'conn Connection,
    commentables: SqliteCommentableRepository<'conn>,
}

impl<'conn> SqliteNotificationService<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["notifications"])?;
        Ok(Self {
            conn,
            commentables: SqliteCommentableRepository::try_new(conn)?,
        })
    }

    /// Notifications addressed to `user_id`, newest first.
    pub fn list_for_user(&self, user_id: UserId) -> RepoResult<Vec<NotificationRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, unique_id, comment_id, commentable_type, data, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC;",
        )?;
        let mut rows = stmt.query([user_id])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let comment_id_text: String = row.get("comment_id")?;
            let type_text: String = row.get("commentable_type")?;
            let data_text: String = row.get("data")?;
            let data = serde_json::from_str(&data_text).map_err(|err| {
                RepoError::InvalidData(format!("invalid json in notifications.data: {err}"))
            })?;
            records.push(NotificationRecord {
                id: row.get("id")?,
                user_id: row.get("user_id")?,
                unique_id: row.get("unique_id")?,
                comment_id: parse_uuid(&comment_id_text, "notifications.comment_id")?,
                commentable_type: CommentableType::from_tag(&type_text),
                data,
                created_at: row.get("created_at")?,
            });
        }
        Ok(records)
    }

    fn recipients(&self, comment: &Comment, acting_user: UserId) -> RepoResult<BTreeSet<UserId>> {
        let audience: BTreeSet<UserId> = match &comment.commentable_type {
            CommentableType::Moment | CommentableType::Strategy => self
                .commentables
                .owner_of(&comment.commentable_type, comment.commentable_id)?
                .into_iter()
                .collect(),
            CommentableType::Meeting => self
                .commentables
                .find_meeting(comment.commentable_id)?
                .map(|meeting| meeting.members_except(acting_user).collect())
                .unwrap_or_default(),
            CommentableType::Unrecognized(_) => BTreeSet::new(),
        };

        let recipients = match comment.visibility {
            Visibility::All => audience,
            Visibility::Private => comment.viewers.iter().copied().collect(),
        };
        Ok(recipients
            .into_iter()
            .filter(|user_id| *user_id != acting_user)
            .collect())
    }
}

impl NotificationService for SqliteNotificationService<'_> {
    fn notify_created(&self, comment: &Comment, acting_user: UserId) -> RepoResult<usize> {
        let recipients = self.recipients(comment, acting_user)?;
        let unique_id = comment_notification_key(comment.id, &comment.commentable_type);
        let data = json!({
            "type": format!("comment_on_{}", comment.commentable_type.as_tag().to_ascii_lowercase()),
            "comment_id": comment.id,
            "commentable_type": comment.commentable_type.as_tag(),
            "commentable_id": comment.commentable_id,
            "actor_id": acting_user,
            "visibility": comment.visibility.as_str(),
            "snippet": comment_snippet(&comment.comment),
        })
        .to_string();

        with_savepoint(self.conn, "notification_write", || {
            for user_id in &recipients {
                self.conn.execute(
                    "INSERT INTO notifications (
                        user_id,
                        unique_id,
                        comment_id,
                        commentable_type,
                        data
                    ) VALUES (?1, ?2, ?3, ?4, ?5);",
                    params![
                        user_id,
                        unique_id.as_str(),
                        comment.id.to_string(),
                        comment.commentable_type.as_tag(),
                        data.as_str(),
                    ],
                )?;
            }
            Ok(())
        })?;

        info!(
            "event=notification_write module=repo status=ok comment_id={} commentable_type={} recipients={}",
            comment.id,
            comment.commentable_type,
            recipients.len()
        );
        Ok(recipients.len())
    }

    fn remove(
        &self,
        comment_id: CommentId,
        commentable_type: &CommentableType,
    ) -> RepoResult<usize> {
        let unique_id = comment_notification_key(comment_id, commentable_type);
        let removed = self.conn.execute(
            "DELETE FROM notifications WHERE unique_id = ?1;",
            [unique_id.as_str()],
        )?;
        info!(
            "event=notification_remove module=repo status=ok comment_id={comment_id} commentable_type={commentable_type} removed={removed}"
        );
        Ok(removed)
    }
}

/// Collapses whitespace and keeps the first `SNIPPET_MAX_CHARS` characters.
pub fn comment_snippet(body: &str) -> String {
    let normalized = WHITESPACE_RE.replace_all(body.trim(), " ");
    let mut snippet = normalized.chars().take(SNIPPET_MAX_CHARS).collect::<String>();
    if normalized.chars().count() > SNIPPET_MAX_CHARS {
        snippet.push_str("...");
    }
    snippet
}

#[cfg(test)]
mod tests {
    use super::comment_snippet;

    #[test]
    fn snippet_collapses_whitespace() {
        assert_eq!(comment_snippet("  hello \n\n  there "), "hello there");
    }

    #[test]
    fn snippet_truncates_long_bodies() {
        let snippet = comment_snippet(&"a".repeat(100));
        assert_eq!(snippet.chars().count(), 63);
        assert!(snippet.ends_with("..."));
    }
}
