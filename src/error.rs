use thiserror::Error;

pub type Result<T> = std::result::Result<T, BootError>;

#[derive(Debug, Error)]
pub enum BootError {
    #[error("Dependency not found: {type_name}{}", qualifier(.name))]
    DependencyNotFound {
        type_name: String,
        name: Option<String>,
    },

    #[error("Cannot inject parameter '{param}' of {target}: add a type annotation or a default value")]
    InjectFail { target: String, param: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Tasks of origin '{origin}' were already drained")]
    OriginAlreadyDrained { origin: String },

    #[error("Controller {controller} is already declared with another prefix or route set")]
    ConflictingController { controller: String },

    #[error("Unsupported HTTP method: {method}")]
    UnsupportedMethod { method: String },

    #[error("Invalid configuration for {key}: {message}")]
    Config { key: String, message: String },

    #[error("Factory for {target} failed: {source}")]
    Factory {
        target: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("SQL template error: {0}")]
    Sql(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn qualifier(name: &Option<String>) -> String {
    name.as_ref()
        .map(|n| format!(" named '{n}'"))
        .unwrap_or_default()
}

impl BootError {
    pub fn not_found(type_name: &str, name: Option<&str>) -> Self {
        BootError::DependencyNotFound {
            type_name: type_name.to_string(),
            name: name.map(str::to_string),
        }
    }

    pub fn inject_fail(target: &str, param: &str) -> Self {
        BootError::InjectFail {
            target: target.to_string(),
            param: param.to_string(),
        }
    }
}

impl axum::response::IntoResponse for BootError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            BootError::Sql(_) => axum::http::StatusCode::BAD_REQUEST,
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}
