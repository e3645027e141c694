//! Read access to the entities comments attach to.
//!
//! # Responsibility
//! - Resolve meetings (members and leaders) for moderation checks.
//! - Resolve owners of moments and strategies for permissions and
//!   notification recipients.
//! - Provide seed writes for fixtures and the CLI probe.
//!
//! # Invariants
//! - Lookups never create rows; a missing entity is `Ok(None)`.
//! - Unrecognized commentable kinds have no owner.

use crate::model::comment::{CommentableId, CommentableType, UserId};
use crate::model::meeting::{Meeting, MeetingMember};
use crate::repo::{ensure_tables, with_savepoint, RepoResult};
use rusqlite::{params, Connection, OptionalExtension};

/// Meeting lookup used by the meeting deletion rule.
pub trait MeetingDirectory {
    fn find_meeting(&self, id: CommentableId) -> RepoResult<Option<Meeting>>;
}

/// Owner lookup for owner-based commentables (moments, strategies).
pub trait CommentableOwners {
    /// `Ok(None)` when the entity is missing or has no single owner.
    fn owner_of(
        &self,
        commentable_type: &CommentableType,
        commentable_id: CommentableId,
    ) -> RepoResult<Option<UserId>>;
}

/// SQLite-backed commentable lookups.
#[derive(Clone, Copy)]
pub struct SqliteCommentableRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCommentableRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tables(conn, &["moments", "strategies", "meetings", "meeting_members"])?;
        Ok(Self { conn })
    }

    /// Inserts or replaces one moment owned by `user_id`.
    pub fn upsert_moment(&self, id: CommentableId, user_id: UserId, name: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO moments (id, user_id, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET user_id = excluded.user_id, name = excluded.name;",
            params![id, user_id, name],
        )?;
        Ok(())
    }

    /// Inserts or replaces one strategy owned by `user_id`.
    pub fn upsert_strategy(
        &self,
        id: CommentableId,
        user_id: UserId,
        name: &str,
    ) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO strategies (id, user_id, name) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET user_id = excluded.user_id, name = excluded.name;",
            params![id, user_id, name],
        )?;
        Ok(())
    }

    /// Replaces a meeting and its full member list.
    pub fn upsert_meeting(&self, meeting: &Meeting) -> RepoResult<()> {
        with_savepoint(self.conn, "meeting_upsert", || {
            self.conn.execute(
                "INSERT INTO meetings (id, name) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET name = excluded.name;",
                params![meeting.id, meeting.name.as_str()],
            )?;
            self.conn.execute(
                "DELETE FROM meeting_members WHERE meeting_id = ?1;",
                [meeting.id],
            )?;
            for member in &meeting.members {
                self.conn.execute(
                    "INSERT INTO meeting_members (meeting_id, user_id, leader)
                     VALUES (?1, ?2, ?3)
                     ON CONFLICT(meeting_id, user_id) DO UPDATE SET leader = excluded.leader;",
                    params![meeting.id, member.user_id, i64::from(member.leader)],
                )?;
            }
            Ok(())
        })
    }

    /// Whether the referenced entity exists. Unrecognized kinds never do.
    pub fn exists(
        &self,
        commentable_type: &CommentableType,
        commentable_id: CommentableId,
    ) -> RepoResult<bool> {
        let sql = match commentable_type {
            CommentableType::Moment => "SELECT EXISTS(SELECT 1 FROM moments WHERE id = ?1);",
            CommentableType::Strategy => "SELECT EXISTS(SELECT 1 FROM strategies WHERE id = ?1);",
            CommentableType::Meeting => "SELECT EXISTS(SELECT 1 FROM meetings WHERE id = ?1);",
            CommentableType::Unrecognized(_) => return Ok(false),
        };
        let found: i64 = self
            .conn
            .query_row(sql, [commentable_id], |row| row.get(0))?;
        Ok(found == 1)
    }

    /// Drops one membership row; returns whether a row existed.
    pub fn remove_meeting_member(
        &self,
        meeting_id: CommentableId,
        user_id: UserId,
    ) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM meeting_members WHERE meeting_id = ?1 AND user_id = ?2;",
            params![meeting_id, user_id],
        )?;
        Ok(changed > 0)
    }
}

impl MeetingDirectory for SqliteCommentableRepository<'_> {
    fn find_meeting(&self, id: CommentableId) -> RepoResult<Option<Meeting>> {
        let name: Option<String> = self
            .conn
            .query_row("SELECT name FROM meetings WHERE id = ?1;", [id], |row| {
                row.get(0)
            })
            .optional()?;
        let Some(name) = name else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT user_id, leader
             FROM meeting_members
             WHERE meeting_id = ?1
             ORDER BY user_id ASC;",
        )?;
        let mut rows = stmt.query([id])?;
        let mut members = Vec::new();
        while let Some(row) = rows.next()? {
            members.push(MeetingMember {
                user_id: row.get(0)?,
                leader: row.get::<_, i64>(1)? == 1,
            });
        }

        Ok(Some(Meeting { id, name, members }))
    }
}

impl CommentableOwners for SqliteCommentableRepository<'_> {
    fn owner_of(
        &self,
        commentable_type: &CommentableType,
        commentable_id: CommentableId,
    ) -> RepoResult<Option<UserId>> {
        let sql = match commentable_type {
            CommentableType::Moment => "SELECT user_id FROM moments WHERE id = ?1;",
            CommentableType::Strategy => "SELECT user_id FROM strategies WHERE id = ?1;",
            CommentableType::Meeting | CommentableType::Unrecognized(_) => return Ok(None),
        };
        let owner = self
            .conn
            .query_row(sql, [commentable_id], |row| row.get(0))
            .optional()?;
        Ok(owner)
    }
}

#[cfg(test)]
mod tests {
    use super::{CommentableOwners, MeetingDirectory, SqliteCommentableRepository};
    use crate::db::open_db_in_memory;
    use crate::model::comment::CommentableType;
    use crate::model::meeting::{Meeting, MeetingMember};

    #[test]
    fn meeting_roundtrip_replaces_members() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteCommentableRepository::try_new(&conn).unwrap();
        let mut meeting = Meeting {
            id: 4,
            name: "weekly".to_string(),
            members: vec![
                MeetingMember {
                    user_id: 1,
                    leader: true,
                },
                MeetingMember {
                    user_id: 2,
                    leader: false,
                },
            ],
        };
        repo.upsert_meeting(&meeting).unwrap();
        assert_eq!(repo.find_meeting(4).unwrap(), Some(meeting.clone()));

        meeting.members.pop();
        repo.upsert_meeting(&meeting).unwrap();
        let loaded = repo.find_meeting(4).unwrap().unwrap();
        assert!(!loaded.is_member(2));
        assert!(repo.find_meeting(99).unwrap().is_none());
    }

    #[test]
    fn owners_resolve_per_kind() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteCommentableRepository::try_new(&conn).unwrap();
        repo.upsert_moment(1, 10, "moment").unwrap();
        repo.upsert_strategy(1, 20, "strategy").unwrap();

        assert_eq!(repo.owner_of(&CommentableType::Moment, 1).unwrap(), Some(10));
        assert!(repo.exists(&CommentableType::Strategy, 1).unwrap());
        assert!(!repo.exists(&CommentableType::Meeting, 1).unwrap());
        assert!(!repo
            .exists(&CommentableType::Unrecognized("Group".into()), 1)
            .unwrap());
        assert_eq!(repo.owner_of(&CommentableType::Strategy, 1).unwrap(), Some(20));
        assert_eq!(repo.owner_of(&CommentableType::Meeting, 1).unwrap(), None);
        assert_eq!(
            repo.owner_of(&CommentableType::Unrecognized("Group".into()), 1)
                .unwrap(),
            None
        );
        assert_eq!(repo.owner_of(&CommentableType::Moment, 2).unwrap(), None);
    }
}
