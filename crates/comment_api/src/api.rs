//! Boundary API for comment create/delete/list requests.
//!
//! # Responsibility
//! - Decode request payloads and bind them to the acting user.
//! - Run each use-case inside one SQLite transaction: `IMMEDIATE` for
//!   writes, deferred for reads.
//! - Collapse domain failures into client-visible responses.
//!
//! # Invariants
//! - Exported functions never panic.
//! - Validation, not-found and not-authorized all produce `400 {}`; a caller
//!   cannot tell a missing comment from one it may not touch.
//! - Storage failures produce `500 {}` and roll back every write.

use comment_core::{
    init_logging as init_logging_inner, CommentServiceError, CommentableType, CoreConfig,
    NewComment, SqliteCommentService, UserId,
};
use log::{error, warn};
use rusqlite::{Connection, TransactionBehavior};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

/// Client-visible outcome class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStatus {
    Ok,
    BadRequest,
    Internal,
}

impl ApiStatus {
    /// HTTP-equivalent status code.
    pub fn code(self) -> u16 {
        match self {
            Self::Ok => 200,
            Self::BadRequest => 400,
            Self::Internal => 500,
        }
    }
}

/// Response envelope handed back to the transport layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiResponse {
    pub status: ApiStatus,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self {
            status: ApiStatus::Ok,
            body,
        }
    }

    fn bad_request() -> Self {
        Self {
            status: ApiStatus::BadRequest,
            body: json!({}),
        }
    }

    fn internal() -> Self {
        Self {
            status: ApiStatus::Internal,
            body: json!({}),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == ApiStatus::Ok
    }
}

/// Create payload: `{"comment": {...}}`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CreateCommentRequest {
    comment: NewComment,
}

/// Starts core logging; returns an empty string on success.
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Creates a comment authored by `acting_user` from a JSON payload.
///
/// Success body: `{"comment": <projection>}`.
pub fn comment_create(
    conn: &mut Connection,
    config: &CoreConfig,
    acting_user: UserId,
    payload: &str,
) -> ApiResponse {
    let request: CreateCommentRequest = match serde_json::from_str(payload) {
        Ok(request) => request,
        Err(err) => {
            warn!(
                "event=api_request module=api status=rejected op=comment_create user_id={acting_user} reason=malformed_json error={err}"
            );
            return ApiResponse::bad_request();
        }
    };

    let result = with_comment_service(conn, config, TransactionBehavior::Immediate, |service| {
        service.create(&request.comment, acting_user)
    })
    .and_then(|view| {
        serde_json::to_value(&view)
            .map_err(|err| internal_error(format!("comment projection failed: {err}")))
    });

    match result {
        Ok(view) => ApiResponse::ok(json!({ "comment": view })),
        Err(err) => failure_response("comment_create", acting_user, &err),
    }
}

/// Deletes a comment by id on behalf of `acting_user`.
///
/// Success body: `{"id": "<uuid>"}`.
pub fn comment_delete(
    conn: &mut Connection,
    config: &CoreConfig,
    acting_user: UserId,
    comment_id: &str,
) -> ApiResponse {
    let Ok(comment_id) = Uuid::parse_str(comment_id.trim()) else {
        warn!(
            "event=api_request module=api status=rejected op=comment_delete user_id={acting_user} reason=malformed_id"
        );
        return ApiResponse::bad_request();
    };

    let result = with_comment_service(conn, config, TransactionBehavior::Immediate, |service| {
        service.delete(comment_id, acting_user)
    });
    match result {
        Ok(deleted) => ApiResponse::ok(json!({ "id": deleted })),
        Err(err) => failure_response("comment_delete", acting_user, &err),
    }
}

/// Lists comments on one commentable visible to `acting_user`.
///
/// Success body: `{"comments": [<projection>...]}`.
pub fn comment_list(
    conn: &mut Connection,
    config: &CoreConfig,
    acting_user: UserId,
    commentable_type: &str,
    commentable_id: i64,
) -> ApiResponse {
    let Some(commentable_type) = CommentableType::parse_input(commentable_type) else {
        return ApiResponse::bad_request();
    };

    let result = with_comment_service(conn, config, TransactionBehavior::Deferred, |service| {
        service.list_for_commentable(&commentable_type, commentable_id, acting_user)
    });

    match result {
        Ok(views) => ApiResponse::ok(json!({ "comments": views })),
        Err(err) => failure_response("comment_list", acting_user, &err),
    }
}

fn with_comment_service<T>(
    conn: &mut Connection,
    config: &CoreConfig,
    behavior: TransactionBehavior,
    f: impl FnOnce(&SqliteCommentService<'_>) -> Result<T, CommentServiceError>,
) -> Result<T, CommentServiceError> {
    let tx = conn
        .transaction_with_behavior(behavior)
        .map_err(|err| CommentServiceError::Repo(err.into()))?;
    let value = {
        let service = SqliteCommentService::for_connection(&tx, config)?;
        f(&service)?
    };
    tx.commit()
        .map_err(|err| CommentServiceError::Repo(err.into()))?;
    Ok(value)
}

fn internal_error(message: String) -> CommentServiceError {
    CommentServiceError::Repo(comment_core::RepoError::InvalidData(message))
}

fn failure_response(op: &str, acting_user: UserId, err: &CommentServiceError) -> ApiResponse {
    if err.is_client_error() {
        warn!(
            "event=api_request module=api status=rejected op={op} user_id={acting_user} error={err}"
        );
        ApiResponse::bad_request()
    } else {
        error!(
            "event=api_request module=api status=error op={op} user_id={acting_user} error={err}"
        );
        ApiResponse::internal()
    }
}

#[cfg(test)]
mod tests {
    use super::{comment_create, comment_delete, comment_list, init_logging, ApiStatus};
    use comment_core::db::{open_db, open_db_in_memory};
    use comment_core::{CoreConfig, Meeting, MeetingMember, SqliteCommentableRepository};
    use rusqlite::{Connection, TransactionBehavior};
    use serde_json::json;

    const U1: i64 = 1;
    const U2: i64 = 2;

    fn db_with_meeting() -> Connection {
        let conn = open_db_in_memory().expect("open db");
        SqliteCommentableRepository::try_new(&conn)
            .expect("commentable repo")
            .upsert_meeting(&Meeting {
                id: 1,
                name: "M1".to_string(),
                members: vec![MeetingMember {
                    user_id: U1,
                    leader: false,
                }],
            })
            .expect("seed meeting");
        conn
    }

    fn comment_count(conn: &Connection) -> i64 {
        conn.query_row("SELECT COUNT(*) FROM comments;", [], |row| row.get(0))
            .expect("count comments")
    }

    fn create_meeting_comment(conn: &mut Connection) -> String {
        let response = comment_create(
            conn,
            &CoreConfig::default(),
            U1,
            r#"{"comment": {"commentable_type": "Meeting", "commentable_id": 1, "comment": "hi"}}"#,
        );
        assert_eq!(response.status, ApiStatus::Ok, "{:?}", response.body);
        response.body["comment"]["commentId"]
            .as_str()
            .expect("projection carries commentId")
            .to_string()
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "/tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn create_returns_projection_bound_to_acting_user() {
        let mut conn = db_with_meeting();
        let response = comment_create(
            &mut conn,
            &CoreConfig::default(),
            U1,
            r#"{"comment": {"commentable_type": "meeting", "commentable_id": 1, "content": "hi"}}"#,
        );

        assert_eq!(response.status.code(), 200);
        let comment = &response.body["comment"];
        assert_eq!(comment["commentBy"], json!(U1));
        assert_eq!(comment["commentableType"], json!("Meeting"));
        assert_eq!(comment["comment"], json!("hi"));
        assert_eq!(comment["deletable"], json!(true));
    }

    #[test]
    fn create_with_missing_content_is_empty_bad_request() {
        let mut conn = db_with_meeting();
        let response = comment_create(
            &mut conn,
            &CoreConfig::default(),
            U1,
            r#"{"comment": {"commentable_type": "Meeting", "commentable_id": 1}}"#,
        );

        assert_eq!(response.status, ApiStatus::BadRequest);
        assert_eq!(response.body, json!({}));
        assert_eq!(comment_count(&conn), 0);
    }

    #[test]
    fn create_on_missing_meeting_is_empty_bad_request() {
        let mut conn = db_with_meeting();
        let response = comment_create(
            &mut conn,
            &CoreConfig::default(),
            U1,
            r#"{"comment": {"commentable_type": "Meeting", "commentable_id": 99, "comment": "hi"}}"#,
        );

        assert_eq!(response.status, ApiStatus::BadRequest);
        assert_eq!(response.body, json!({}));
        assert_eq!(comment_count(&conn), 0);
    }

    #[test]
    fn list_reads_while_another_connection_holds_the_write_lock() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("comments.db");
        let mut reader = open_db(&path).expect("open reader");
        let mut writer = open_db(&path).expect("open writer");
        let _lock = writer
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .expect("writer lock");

        let response = comment_list(&mut reader, &CoreConfig::default(), U1, "meeting", 1);
        assert_eq!(response.status, ApiStatus::Ok);
        assert_eq!(response.body, json!({ "comments": [] }));
    }

    #[test]
    fn create_with_malformed_json_is_bad_request() {
        let mut conn = db_with_meeting();
        let response = comment_create(&mut conn, &CoreConfig::default(), U1, "{not json");
        assert_eq!(response.status, ApiStatus::BadRequest);
        assert_eq!(response.body, json!({}));
    }

    #[test]
    fn delete_by_member_author_returns_id() {
        let mut conn = db_with_meeting();
        let comment_id = create_meeting_comment(&mut conn);

        let response = comment_delete(&mut conn, &CoreConfig::default(), U1, &comment_id);
        assert_eq!(response.status, ApiStatus::Ok);
        assert_eq!(response.body, json!({ "id": comment_id }));
        assert_eq!(comment_count(&conn), 0);
    }

    #[test]
    fn denied_and_missing_deletes_look_identical() {
        let mut conn = db_with_meeting();
        let comment_id = create_meeting_comment(&mut conn);
        let config = CoreConfig::default();

        let denied = comment_delete(&mut conn, &config, U2, &comment_id);
        let missing = comment_delete(
            &mut conn,
            &config,
            U1,
            "00000000-0000-4000-8000-000000000000",
        );
        let malformed = comment_delete(&mut conn, &config, U1, "not-a-uuid");

        assert_eq!(denied, missing);
        assert_eq!(missing, malformed);
        assert_eq!(denied.status, ApiStatus::BadRequest);
        assert_eq!(denied.body, json!({}));
        assert_eq!(comment_count(&conn), 1);
    }

    #[test]
    fn list_filters_private_comments() {
        let mut conn = db_with_meeting();
        let config = CoreConfig::default();
        create_meeting_comment(&mut conn);
        let private = comment_create(
            &mut conn,
            &config,
            U1,
            r#"{"comment": {"commentable_type": "Meeting", "commentable_id": 1, "comment": "psst", "visibility": "private"}}"#,
        );
        assert!(private.is_ok());

        let as_u2 = comment_list(&mut conn, &config, U2, "meeting", 1);
        assert_eq!(as_u2.status, ApiStatus::Ok);
        assert_eq!(as_u2.body["comments"].as_array().map(Vec::len), Some(1));

        let as_u1 = comment_list(&mut conn, &config, U1, "meeting", 1);
        assert_eq!(as_u1.body["comments"].as_array().map(Vec::len), Some(2));

        let unknown = comment_list(&mut conn, &config, U1, "group", 1);
        assert_eq!(unknown.status, ApiStatus::BadRequest);
    }

    #[test]
    fn unmigrated_connection_is_internal_error() {
        let mut conn = Connection::open_in_memory().expect("raw connection");
        let response = comment_delete(
            &mut conn,
            &CoreConfig::default(),
            U1,
            "00000000-0000-4000-8000-000000000000",
        );
        assert_eq!(response.status, ApiStatus::Internal);
        assert_eq!(response.status.code(), 500);
    }
}
