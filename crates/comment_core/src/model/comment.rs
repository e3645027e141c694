//! Comment domain model.
//!
//! # Responsibility
//! - Define the canonical comment record and its commentable reference.
//! - Validate inbound creation payloads before anything is persisted.
//!
//! # Invariants
//! - `(commentable_type, commentable_id)` and `comment_by` never change after
//!   creation; there is no update path.
//! - Unknown commentable tags are representable (`Unrecognized`) so that
//!   legacy rows can be loaded, but are never accepted for new comments.
//! - `viewers` is only meaningful for `Visibility::Private`.

use serde::{Deserialize, Serialize, Serializer};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable comment identifier.
pub type CommentId = Uuid;
/// Application user identifier (owned by the surrounding application).
pub type UserId = i64;
/// Identifier of a moment, strategy or meeting row.
pub type CommentableId = i64;

/// Default upper bound for comment body length, in characters.
pub const DEFAULT_MAX_COMMENT_CHARS: usize = 5000;

/// Entity kind a comment is attached to.
///
/// Dispatch over this enum is exhaustive; `Unrecognized` is the explicit
/// default-deny arm for tags persisted by another binary version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CommentableType {
    Moment,
    Strategy,
    Meeting,
    Unrecognized(String),
}

impl CommentableType {
    /// Canonical storage/wire tag (`Moment`, `Strategy`, `Meeting`).
    pub fn as_tag(&self) -> &str {
        match self {
            Self::Moment => "Moment",
            Self::Strategy => "Strategy",
            Self::Meeting => "Meeting",
            Self::Unrecognized(tag) => tag.as_str(),
        }
    }

    /// Maps a persisted tag back to a variant. Never fails.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Moment" => Self::Moment,
            "Strategy" => Self::Strategy,
            "Meeting" => Self::Meeting,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    /// Parses client input; accepts `moment` as well as `Moment`.
    ///
    /// Returns `None` for anything outside the known set.
    pub fn parse_input(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "moment" => Some(Self::Moment),
            "strategy" => Some(Self::Strategy),
            "meeting" => Some(Self::Meeting),
            _ => None,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized(_))
    }
}

impl Display for CommentableType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

impl Serialize for CommentableType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_tag())
    }
}

/// Who may see a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Anyone who can see the commentable.
    #[default]
    All,
    /// Only the author and the listed viewers.
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Private => "private",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// Persisted comment record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub commentable_type: CommentableType,
    pub commentable_id: CommentableId,
    /// Author id. Named after the storage column.
    pub comment_by: UserId,
    /// Comment body.
    pub comment: String,
    pub visibility: Visibility,
    /// Users allowed to read a private comment besides its author.
    pub viewers: Vec<UserId>,
    /// Unix epoch milliseconds.
    pub created_at: i64,
}

impl Comment {
    pub fn is_authored_by(&self, user_id: UserId) -> bool {
        self.comment_by == user_id
    }

    /// Returns whether `user_id` may read this comment.
    pub fn is_visible_to(&self, user_id: UserId) -> bool {
        match self.visibility {
            Visibility::All => true,
            Visibility::Private => {
                self.is_authored_by(user_id) || self.viewers.contains(&user_id)
            }
        }
    }

    /// Checks record-level invariants.
    ///
    /// Used on read paths so corrupted rows are rejected instead of masked.
    /// The commentable tag is not checked here.
    pub fn validate(&self) -> Result<(), CommentValidationError> {
        if self.comment.trim().is_empty() {
            return Err(CommentValidationError::MissingContent);
        }
        if self.visibility == Visibility::All && !self.viewers.is_empty() {
            return Err(CommentValidationError::ViewersRequirePrivate);
        }
        Ok(())
    }
}

/// Inbound creation payload as received from the client.
///
/// Every field is optional so that missing values surface as validation
/// errors rather than deserialization failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewComment {
    pub commentable_type: Option<String>,
    pub commentable_id: Option<CommentableId>,
    /// When present, must match the acting user.
    pub comment_by: Option<UserId>,
    #[serde(alias = "content")]
    pub comment: Option<String>,
    pub visibility: Option<String>,
    pub viewers: Vec<UserId>,
}

/// Field values accepted by [`NewComment::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidComment {
    pub commentable_type: CommentableType,
    pub commentable_id: CommentableId,
    pub comment_by: UserId,
    pub comment: String,
    pub visibility: Visibility,
    pub viewers: Vec<UserId>,
}

impl NewComment {
    /// Validates this payload for `acting_user`.
    ///
    /// # Invariants
    /// - The returned author is always `acting_user`.
    /// - Comment text is trimmed; viewers are deduplicated and never include
    ///   the author.
    pub fn validate(
        &self,
        acting_user: UserId,
        max_comment_chars: usize,
    ) -> Result<ValidComment, CommentValidationError> {
        let raw_type = self
            .commentable_type
            .as_deref()
            .filter(|value| !value.trim().is_empty())
            .ok_or(CommentValidationError::MissingCommentableType)?;
        let commentable_type = CommentableType::parse_input(raw_type).ok_or_else(|| {
            CommentValidationError::UnsupportedCommentableType(raw_type.trim().to_string())
        })?;

        let commentable_id = self
            .commentable_id
            .ok_or(CommentValidationError::MissingCommentableId)?;

        if let Some(claimed) = self.comment_by {
            if claimed != acting_user {
                return Err(CommentValidationError::AuthorMismatch {
                    acting_user,
                    claimed,
                });
            }
        }

        let comment = self
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .ok_or(CommentValidationError::MissingContent)?;
        let length = comment.chars().count();
        if length > max_comment_chars {
            return Err(CommentValidationError::ContentTooLong {
                max: max_comment_chars,
                actual: length,
            });
        }

        let visibility = match self.visibility.as_deref() {
            None => Visibility::All,
            Some(value) => Visibility::parse(value)
                .ok_or_else(|| CommentValidationError::InvalidVisibility(value.to_string()))?,
        };

        if visibility == Visibility::All && !self.viewers.is_empty() {
            return Err(CommentValidationError::ViewersRequirePrivate);
        }

        let mut viewers = self
            .viewers
            .iter()
            .copied()
            .filter(|viewer| *viewer != acting_user)
            .collect::<Vec<_>>();
        viewers.sort_unstable();
        viewers.dedup();

        Ok(ValidComment {
            commentable_type,
            commentable_id,
            comment_by: acting_user,
            comment: comment.to_string(),
            visibility,
            viewers,
        })
    }
}

/// Reasons a comment payload or record is rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentValidationError {
    MissingCommentableType,
    UnsupportedCommentableType(String),
    MissingCommentableId,
    MissingContent,
    ContentTooLong { max: usize, actual: usize },
    InvalidVisibility(String),
    ViewersRequirePrivate,
    AuthorMismatch { acting_user: UserId, claimed: UserId },
    /// The referenced moment, strategy or meeting does not exist.
    UnknownCommentable {
        commentable_type: CommentableType,
        commentable_id: CommentableId,
    },
}

impl Display for CommentValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingCommentableType => write!(f, "commentable_type is required"),
            Self::UnsupportedCommentableType(value) => {
                write!(f, "commentable_type `{value}` is not supported")
            }
            Self::MissingCommentableId => write!(f, "commentable_id is required"),
            Self::MissingContent => write!(f, "comment must not be blank"),
            Self::ContentTooLong { max, actual } => {
                write!(f, "comment has {actual} characters; at most {max} allowed")
            }
            Self::InvalidVisibility(value) => {
                write!(f, "visibility `{value}` is invalid; expected all|private")
            }
            Self::ViewersRequirePrivate => {
                write!(f, "viewers can only be set on private comments")
            }
            Self::AuthorMismatch {
                acting_user,
                claimed,
            } => write!(
                f,
                "comment_by {claimed} does not match acting user {acting_user}"
            ),
            Self::UnknownCommentable {
                commentable_type,
                commentable_id,
            } => write!(f, "{commentable_type} {commentable_id} does not exist"),
        }
    }
}

impl Error for CommentValidationError {}

#[cfg(test)]
mod tests {
    use super::{
        CommentValidationError, CommentableType, NewComment, Visibility,
        DEFAULT_MAX_COMMENT_CHARS,
    };

    fn meeting_payload(text: &str) -> NewComment {
        NewComment {
            commentable_type: Some("meeting".to_string()),
            commentable_id: Some(7),
            comment: Some(text.to_string()),
            ..NewComment::default()
        }
    }

    #[test]
    fn commentable_tags_map_unknown_values_to_unrecognized() {
        assert_eq!(CommentableType::from_tag("Meeting"), CommentableType::Meeting);
        assert_eq!(
            CommentableType::from_tag("Group"),
            CommentableType::Unrecognized("Group".to_string())
        );
        assert!(!CommentableType::from_tag("meeting").is_recognized());
        assert_eq!(CommentableType::parse_input(" Strategy "), Some(CommentableType::Strategy));
        assert_eq!(CommentableType::parse_input("group"), None);
    }

    #[test]
    fn validate_binds_author_and_trims_body() {
        let valid = meeting_payload("  hi  ")
            .validate(11, DEFAULT_MAX_COMMENT_CHARS)
            .expect("payload should validate");
        assert_eq!(valid.comment_by, 11);
        assert_eq!(valid.comment, "hi");
        assert_eq!(valid.visibility, Visibility::All);
    }

    #[test]
    fn validate_rejects_missing_and_blank_content() {
        let mut payload = meeting_payload("x");
        payload.comment = None;
        assert_eq!(
            payload.validate(1, DEFAULT_MAX_COMMENT_CHARS),
            Err(CommentValidationError::MissingContent)
        );
        assert_eq!(
            meeting_payload("   ").validate(1, DEFAULT_MAX_COMMENT_CHARS),
            Err(CommentValidationError::MissingContent)
        );
    }

    #[test]
    fn validate_rejects_unknown_type_and_missing_id() {
        let mut payload = meeting_payload("x");
        payload.commentable_type = Some("group".to_string());
        assert!(matches!(
            payload.validate(1, DEFAULT_MAX_COMMENT_CHARS),
            Err(CommentValidationError::UnsupportedCommentableType(value)) if value == "group"
        ));

        let mut payload = meeting_payload("x");
        payload.commentable_id = None;
        assert_eq!(
            payload.validate(1, DEFAULT_MAX_COMMENT_CHARS),
            Err(CommentValidationError::MissingCommentableId)
        );
    }

    #[test]
    fn validate_rejects_author_mismatch() {
        let mut payload = meeting_payload("x");
        payload.comment_by = Some(2);
        assert_eq!(
            payload.validate(1, DEFAULT_MAX_COMMENT_CHARS),
            Err(CommentValidationError::AuthorMismatch {
                acting_user: 1,
                claimed: 2
            })
        );
    }

    #[test]
    fn validate_enforces_length_limit_in_chars() {
        let err = meeting_payload("héllo")
            .validate(1, 4)
            .expect_err("five chars over a limit of four");
        assert_eq!(err, CommentValidationError::ContentTooLong { max: 4, actual: 5 });
    }

    #[test]
    fn private_viewers_are_deduplicated_and_exclude_author() {
        let mut payload = meeting_payload("secret");
        payload.visibility = Some("PRIVATE".to_string());
        payload.viewers = vec![3, 1, 3, 2];
        let valid = payload
            .validate(1, DEFAULT_MAX_COMMENT_CHARS)
            .expect("private payload should validate");
        assert_eq!(valid.visibility, Visibility::Private);
        assert_eq!(valid.viewers, vec![2, 3]);

        let mut public = meeting_payload("open");
        public.viewers = vec![2];
        assert_eq!(
            public.validate(1, DEFAULT_MAX_COMMENT_CHARS),
            Err(CommentValidationError::ViewersRequirePrivate)
        );
    }
}
