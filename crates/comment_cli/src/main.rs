//! Command-line probe for the comment lifecycle core.
//!
//! Drives the same boundary functions a transport layer would call, against
//! a SQLite file, and prints `<status> <json body>`.
//!
//! ```bash
//! comments seed-meeting --id 1 --member 1 --leader 3
//! comments create --as 1 '{"comment": {"commentable_type": "Meeting", "commentable_id": 1, "comment": "hi"}}'
//! comments delete --as 1 <comment-id>
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use comment_api::{comment_create, comment_delete, comment_list, ApiResponse};
use comment_core::db::open_db_with;
use comment_core::{
    init_logging_from_config, CoreConfig, Meeting, MeetingMember, SqliteCommentableRepository,
    UserId,
};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "comments", version, about = "Comment lifecycle probe")]
struct Cli {
    /// TOML config file.
    #[arg(long, global = true, env = "COMMENTS_CONFIG")]
    config: Option<PathBuf>,

    /// SQLite database file; overrides the config value.
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a comment from a JSON payload.
    Create {
        #[arg(long = "as")]
        acting_user: UserId,
        payload: String,
    },
    /// Delete a comment by id.
    Delete {
        #[arg(long = "as")]
        acting_user: UserId,
        comment_id: String,
    },
    /// List comments visible to a user on one commentable.
    List {
        #[arg(long = "as")]
        acting_user: UserId,
        commentable_type: String,
        commentable_id: i64,
    },
    /// Insert or replace a meeting and its members.
    SeedMeeting {
        #[arg(long)]
        id: i64,
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long = "member")]
        members: Vec<UserId>,
        #[arg(long = "leader")]
        leaders: Vec<UserId>,
    },
    /// Insert or replace a moment owned by a user.
    SeedMoment {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        owner: UserId,
    },
    /// Insert or replace a strategy owned by a user.
    SeedStrategy {
        #[arg(long)]
        id: i64,
        #[arg(long)]
        owner: UserId,
    },
}

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => CoreConfig::load(path)?,
        None => CoreConfig::default(),
    };
    if let Some(db) = cli.db {
        config.db_path = Some(db);
    }
    init_logging_from_config(&config).map_err(anyhow::Error::msg)?;

    let db_path = config.resolved_db_path();
    let mut conn = open_db_with(&db_path, &config)
        .with_context(|| format!("failed to open `{}`", db_path.display()))?;

    let response = match cli.command {
        Command::Create {
            acting_user,
            payload,
        } => comment_create(&mut conn, &config, acting_user, &payload),
        Command::Delete {
            acting_user,
            comment_id,
        } => comment_delete(&mut conn, &config, acting_user, &comment_id),
        Command::List {
            acting_user,
            commentable_type,
            commentable_id,
        } => comment_list(
            &mut conn,
            &config,
            acting_user,
            &commentable_type,
            commentable_id,
        ),
        Command::SeedMeeting {
            id,
            name,
            members,
            leaders,
        } => {
            let repo = SqliteCommentableRepository::try_new(&conn)?;
            repo.upsert_meeting(&meeting_from_args(id, name, &members, &leaders))?;
            println!("seeded meeting {id}");
            return Ok(());
        }
        Command::SeedMoment { id, owner } => {
            SqliteCommentableRepository::try_new(&conn)?.upsert_moment(id, owner, "")?;
            println!("seeded moment {id}");
            return Ok(());
        }
        Command::SeedStrategy { id, owner } => {
            SqliteCommentableRepository::try_new(&conn)?.upsert_strategy(id, owner, "")?;
            println!("seeded strategy {id}");
            return Ok(());
        }
    };

    print_response(&response)
}

fn meeting_from_args(id: i64, name: String, members: &[UserId], leaders: &[UserId]) -> Meeting {
    let mut rows: Vec<MeetingMember> = members
        .iter()
        .map(|user_id| MeetingMember {
            user_id: *user_id,
            leader: leaders.contains(user_id),
        })
        .collect();
    for leader in leaders {
        if !members.contains(leader) {
            rows.push(MeetingMember {
                user_id: *leader,
                leader: true,
            });
        }
    }
    Meeting {
        id,
        name,
        members: rows,
    }
}

fn print_response(response: &ApiResponse) -> Result<()> {
    println!(
        "{} {}",
        response.status.code(),
        serde_json::to_string(&response.body)?
    );
    if !response.is_ok() {
        bail!("request failed with status {}", response.status.code());
    }
    Ok(())
}
