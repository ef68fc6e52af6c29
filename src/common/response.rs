use axum::{
    Json,
    http::StatusCode as HttpStatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

/// Standard API response envelope: `{ "code": 200, "msg": "", "data": ... }`.
///
/// # Example
/// ```
/// use axum_boot::common::BaseResp;
///
/// async fn count_books() -> BaseResp<usize> {
///     BaseResp::ok(4)
/// }
///
/// async fn create_book() -> BaseResp<()> {
///     BaseResp::error(500, "create failed")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaseResp<T> {
    pub code: u16,

    pub msg: String,

    pub data: Option<T>,

    #[serde(skip)]
    pub http_status: HttpStatusCode,
}

impl<T> Default for BaseResp<T> {
    fn default() -> Self {
        Self {
            code: HttpStatusCode::OK.as_u16(),
            msg: String::new(),
            data: None,
            http_status: HttpStatusCode::OK,
        }
    }
}

impl<T> BaseResp<T> {
    /// Successful response carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            data: Some(data),
            ..Self::default()
        }
    }

    /// Error envelope. The HTTP status follows `code` when it is a valid status,
    /// otherwise it stays 200 and only the envelope carries the code.
    pub fn error(code: u16, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
            http_status: HttpStatusCode::from_u16(code).unwrap_or(HttpStatusCode::OK),
        }
    }

    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = msg.into();
        self
    }
}

impl<T: Serialize> IntoResponse for BaseResp<T> {
    fn into_response(self) -> Response {
        (self.http_status, Json(self)).into_response()
    }
}
