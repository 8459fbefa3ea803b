//! The uniform `code`/`message`/`data` wire envelope.

use serde::{Deserialize, Serialize};

/// Response envelope every backend payload is expected to follow.
///
/// Business success is defined by `code` matching the configured success code
/// (default `10000`), independent of the HTTP status. The pipeline unwraps
/// `data` on success; deserialize into `ApiResponse<T>` directly when the
/// whole envelope is needed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: T,
}
