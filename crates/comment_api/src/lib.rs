//! Request/response boundary for the comment lifecycle core.

pub mod api;

pub use api::{
    comment_create, comment_delete, comment_list, init_logging, ApiResponse, ApiStatus,
};
