//! Ordered schema steps for the comment database.
//!
//! `PRAGMA user_version` holds the last applied step. Pending steps run in
//! one transaction, so a failing step leaves the file at its old version.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

#[derive(Debug, Clone, Copy)]
struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "commentables",
        sql: include_str!("0001_commentables.sql"),
    },
    Step {
        version: 2,
        name: "comments",
        sql: include_str!("0002_comments.sql"),
    },
    Step {
        version: 3,
        name: "notifications",
        sql: include_str!("0003_notifications.sql"),
    },
];

/// Schema version this build upgrades to.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Schema version currently recorded in the database.
pub fn schema_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}

/// Brings `conn` up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<()> {
    run_steps(conn, STEPS)
}

fn run_steps(conn: &mut Connection, steps: &[Step]) -> DbResult<()> {
    let found = schema_version(conn)?;
    let target = steps.last().map_or(0, |step| step.version);
    if found > target {
        return Err(DbError::SchemaTooNew {
            found,
            supported: target,
        });
    }

    let pending: Vec<&Step> = steps.iter().filter(|step| step.version > found).collect();
    if pending.is_empty() {
        return Ok(());
    }

    let tx = conn.transaction()?;
    for step in pending {
        tx.execute_batch(step.sql)
            .and_then(|()| tx.pragma_update(None, "user_version", step.version))
            .map_err(|source| DbError::Migration {
                version: step.version,
                name: step.name,
                source,
            })?;
        debug!(
            "event=db_migrate module=db status=step version={} name={}",
            step.version, step.name
        );
    }
    tx.commit()?;

    info!("event=db_migrate module=db status=ok from={found} to={target}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{run_steps, schema_version, Step};
    use crate::db::DbError;
    use rusqlite::Connection;

    const GOOD: Step = Step {
        version: 1,
        name: "first",
        sql: "CREATE TABLE first (id INTEGER PRIMARY KEY);",
    };
    const BROKEN: Step = Step {
        version: 2,
        name: "broken",
        sql: "CREATE TABLE second (id INTEGER PRIMARY KEY); CREATE TABLE nope (;",
    };

    #[test]
    fn failing_step_is_named_and_rolls_back_all_pending_steps() {
        let mut conn = Connection::open_in_memory().unwrap();

        let err = run_steps(&mut conn, &[GOOD, BROKEN]).unwrap_err();
        assert!(matches!(
            err,
            DbError::Migration {
                version: 2,
                name: "broken",
                ..
            }
        ));
        assert_eq!(schema_version(&conn).unwrap(), 0);
        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name IN ('first', 'second');",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 0);
    }

    #[test]
    fn applied_steps_are_skipped() {
        let mut conn = Connection::open_in_memory().unwrap();
        run_steps(&mut conn, &[GOOD]).unwrap();
        run_steps(&mut conn, &[GOOD]).unwrap();
        assert_eq!(schema_version(&conn).unwrap(), 1);
    }
}
