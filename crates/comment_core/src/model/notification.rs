//! Derived notification state tied to a comment.

use crate::model::comment::{CommentId, CommentableType, UserId};
use serde::Serialize;

/// One stored notification for one recipient.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationRecord {
    pub id: i64,
    /// Recipient.
    pub user_id: UserId,
    /// Grouping key shared by every recipient of the same comment.
    pub unique_id: String,
    pub comment_id: CommentId,
    pub commentable_type: CommentableType,
    /// Client payload (actor, commentable id, snippet).
    pub data: serde_json::Value,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

/// Builds the grouping key, e.g. `comment_on_meeting_<uuid>`.
pub fn comment_notification_key(
    comment_id: CommentId,
    commentable_type: &CommentableType,
) -> String {
    format!(
        "comment_on_{}_{}",
        commentable_type.as_tag().to_ascii_lowercase(),
        comment_id
    )
}

#[cfg(test)]
mod tests {
    use super::comment_notification_key;
    use crate::model::comment::CommentableType;
    use uuid::Uuid;

    #[test]
    fn key_uses_lowercase_tag() {
        let id = Uuid::nil();
        assert_eq!(
            comment_notification_key(id, &CommentableType::Meeting),
            format!("comment_on_meeting_{id}")
        );
    }
}
