//! Comment store contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist validated comments together with their private viewer list.
//! - Look up and hard-delete comments by id.
//!
//! # Invariants
//! - `create_from` validates before writing; a rejected payload leaves no row.
//! - Comments only attach to a moment, strategy or meeting that exists.
//! - `delete` of a missing id is `NotFound`, never a silent success.
//! - Read paths load unknown commentable tags as `Unrecognized` but reject
//!   other corrupted values.

use crate::model::comment::{
    Comment, CommentId, CommentValidationError, CommentableId, CommentableType, NewComment,
    UserId, Visibility, DEFAULT_MAX_COMMENT_CHARS,
};
use crate::repo::commentable_repo::SqliteCommentableRepository;
use crate::repo::{ensure_tables, now_epoch_ms, parse_uuid, with_savepoint, RepoError, RepoResult};
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

const COMMENT_SELECT_SQL: &str = "SELECT
    id,
    commentable_type,
    commentable_id,
    comment_by,
    comment,
    visibility,
    created_at
FROM comments";

/// Storage contract for comment records.
pub trait CommentStore {
    /// Validates `input` for `author` and persists it.
    fn create_from(&self, input: &NewComment, author: UserId) -> RepoResult<Comment>;
    /// Absent ids return `Ok(None)`.
    fn find_by_id(&self, id: CommentId) -> RepoResult<Option<Comment>>;
    /// Removes one comment; `NotFound` when it does not exist.
    fn delete(&self, id: CommentId) -> RepoResult<()>;
    /// Comments on one commentable, oldest first.
    fn list_for_commentable(
        &self,
        commentable_type: &CommentableType,
        commentable_id: CommentableId,
    ) -> RepoResult<Vec<Comment>>;
}

/// SQLite-backed comment store.
pub struct SqliteCommentStore<'conn> {
    conn: &'conn Connection,
    commentables: SqliteCommentableRepository<'conn>,
    max_comment_chars: usize,
}

impl<'conn> SqliteCommentStore<'conn> {
    /// Constructs a store over a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["comments", "comment_viewers"])?;
        Ok(Self {
            conn,
            commentables: SqliteCommentableRepository::try_new(conn)?,
            max_comment_chars: DEFAULT_MAX_COMMENT_CHARS,
        })
    }

    /// Overrides the comment length limit (from `CoreConfig`).
    pub fn with_max_comment_chars(mut self, max_comment_chars: usize) -> Self {
        self.max_comment_chars = max_comment_chars;
        self
    }

    fn load_viewers(&self, comment_id: &str) -> RepoResult<Vec<UserId>> {
        let mut stmt = self.conn.prepare(
            "SELECT user_id
             FROM comment_viewers
             WHERE comment_id = ?1
             ORDER BY user_id ASC;",
        )?;
        let mut rows = stmt.query([comment_id])?;
        let mut viewers = Vec::new();
        while let Some(row) = rows.next()? {
            viewers.push(row.get(0)?);
        }
        Ok(viewers)
    }

    fn parse_comment_row(&self, row: &Row<'_>) -> RepoResult<Comment> {
        let id_text: String = row.get("id")?;
        let id = parse_uuid(&id_text, "comments.id")?;

        let type_text: String = row.get("commentable_type")?;
        let visibility_text: String = row.get("visibility")?;
        let visibility = Visibility::parse(&visibility_text).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "invalid visibility `{visibility_text}` in comments.visibility"
            ))
        })?;

        let comment = Comment {
            id,
            commentable_type: CommentableType::from_tag(&type_text),
            commentable_id: row.get("commentable_id")?,
            comment_by: row.get("comment_by")?,
            comment: row.get("comment")?,
            visibility,
            viewers: self.load_viewers(&id_text)?,
            created_at: row.get("created_at")?,
        };
        comment.validate().map_err(|err| {
            RepoError::InvalidData(format!("comment {id_text} violates invariants: {err}"))
        })?;
        Ok(comment)
    }
}

impl CommentStore for SqliteCommentStore<'_> {
    fn create_from(&self, input: &NewComment, author: UserId) -> RepoResult<Comment> {
        let valid = input.validate(author, self.max_comment_chars)?;
        if !self
            .commentables
            .exists(&valid.commentable_type, valid.commentable_id)?
        {
            return Err(CommentValidationError::UnknownCommentable {
                commentable_type: valid.commentable_type,
                commentable_id: valid.commentable_id,
            }
            .into());
        }
        let comment = Comment {
            id: Uuid::new_v4(),
            commentable_type: valid.commentable_type,
            commentable_id: valid.commentable_id,
            comment_by: valid.comment_by,
            comment: valid.comment,
            visibility: valid.visibility,
            viewers: valid.viewers,
            created_at: now_epoch_ms(),
        };
        let id_text = comment.id.to_string();

        with_savepoint(self.conn, "comment_create", || {
            self.conn.execute(
                "INSERT INTO comments (
                    id,
                    commentable_type,
                    commentable_id,
                    comment_by,
                    comment,
                    visibility,
                    created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
                params![
                    id_text.as_str(),
                    comment.commentable_type.as_tag(),
                    comment.commentable_id,
                    comment.comment_by,
                    comment.comment.as_str(),
                    comment.visibility.as_str(),
                    comment.created_at,
                ],
            )?;
            for viewer in &comment.viewers {
                self.conn.execute(
                    "INSERT INTO comment_viewers (comment_id, user_id) VALUES (?1, ?2);",
                    params![id_text.as_str(), viewer],
                )?;
            }
            Ok(())
        })?;

        Ok(comment)
    }

    fn find_by_id(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{COMMENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(self.parse_comment_row(row)?));
        }
        Ok(None)
    }

    fn delete(&self, id: CommentId) -> RepoResult<()> {
        let id_text = id.to_string();
        with_savepoint(self.conn, "comment_delete", || {
            self.conn.execute(
                "DELETE FROM comment_viewers WHERE comment_id = ?1;",
                [id_text.as_str()],
            )?;
            let changed = self
                .conn
                .execute("DELETE FROM comments WHERE id = ?1;", [id_text.as_str()])?;
            if changed == 0 {
                return Err(RepoError::NotFound(id));
            }
            Ok(())
        })
    }

    fn list_for_commentable(
        &self,
        commentable_type: &CommentableType,
        commentable_id: CommentableId,
    ) -> RepoResult<Vec<Comment>> {
        let mut stmt = self.conn.prepare(&format!(
            "{COMMENT_SELECT_SQL}
             WHERE commentable_type = ?1
               AND commentable_id = ?2
             ORDER BY created_at ASC, id ASC;"
        ))?;
        let mut rows = stmt.query(params![commentable_type.as_tag(), commentable_id])?;
        let mut comments = Vec::new();
        while let Some(row) = rows.next()? {
            comments.push(self.parse_comment_row(row)?);
        }
        Ok(comments)
    }
}
