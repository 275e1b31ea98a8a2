//! Typed errors for the REST API
//!
//! Every failure a remote method can produce maps to one of the categories
//! below, each carrying its HTTP status and a stable error code.
//!
//! # Error Categories
//!
//! - [`ModelError`]: unknown models, relations or instances
//! - [`RequestError`]: authorization, disabled methods, malformed requests
//! - [`ValidationError`]: instance validation failures (422)
//! - [`ConfigError`]: configuration parsing and consistency
//! - [`StorageError`]: storage backend failures
//!
//! Errors render as
//! `{"error": {"statusCode", "name", "code", "message", "details"?}}`.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::fmt;

/// The main error type of the API
#[derive(Debug)]
pub enum ApiError {
    Model(ModelError),
    Request(RequestError),
    Validation(ValidationError),
    Config(ConfigError),
    Storage(StorageError),

    /// Anything else; the message is only shown in debug mode
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Model(e) => write!(f, "{}", e),
            ApiError::Request(e) => write!(f, "{}", e),
            ApiError::Validation(e) => write!(f, "{}", e),
            ApiError::Config(e) => write!(f, "{}", e),
            ApiError::Storage(e) => write!(f, "{}", e),
            ApiError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApiError::Model(e) => Some(e),
            ApiError::Request(e) => Some(e),
            ApiError::Validation(e) => Some(e),
            ApiError::Config(e) => Some(e),
            ApiError::Storage(e) => Some(e),
            ApiError::Internal(_) => None,
        }
    }
}

/// Payload of an error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub name: String,
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Error response envelope
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Model(e) => e.status_code(),
            ApiError::Request(e) => e.status_code(),
            ApiError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Model(e) => e.error_code(),
            ApiError::Request(e) => e.error_code(),
            ApiError::Validation(_) => "VALIDATION_ERROR",
            ApiError::Config(_) => "CONFIG_ERROR",
            ApiError::Storage(_) => "STORAGE_ERROR",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn name(&self) -> &'static str {
        match self {
            ApiError::Validation(_) => "ValidationError",
            _ => "Error",
        }
    }

    /// Build the response body; server errors stay opaque unless `debug` is set
    pub fn to_response(&self, debug: bool) -> ErrorResponse {
        let status = self.status_code();
        let opaque = status.is_server_error() && !debug;

        let message = if opaque {
            status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string()
        } else {
            self.to_string()
        };

        ErrorResponse {
            error: ErrorBody {
                status_code: status.as_u16(),
                name: self.name().to_string(),
                code: self.error_code().to_string(),
                message,
                details: if opaque { None } else { self.details() },
            },
        }
    }

    pub fn render(&self, debug: bool) -> Response {
        (self.status_code(), Json(self.to_response(debug))).into_response()
    }

    fn details(&self) -> Option<Value> {
        match self {
            ApiError::Model(ModelError::NotFound { model, id }) => {
                Some(json!({ "model": model, "id": id }))
            }
            ApiError::Validation(ValidationError::Invalid { model, fields }) => {
                Some(json!({ "context": model, "messages": fields }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.render(false)
    }
}

// =============================================================================
// Model Errors
// =============================================================================

#[derive(Debug)]
pub enum ModelError {
    /// No instance with this id (or the id cannot name one)
    NotFound { model: String, id: String },

    UnknownModel { model: String },

    UnknownRelation { model: String, relation: String },
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::NotFound { model, id } => {
                write!(f, "Unknown \"{}\" id \"{}\".", model, id)
            }
            ModelError::UnknownModel { model } => write!(f, "Unknown model \"{}\"", model),
            ModelError::UnknownRelation { model, relation } => {
                write!(f, "Model \"{}\" has no relation \"{}\"", model, relation)
            }
        }
    }
}

impl std::error::Error for ModelError {}

impl ModelError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::NOT_FOUND
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ModelError::NotFound { .. } => "MODEL_NOT_FOUND",
            ModelError::UnknownModel { .. } => "UNKNOWN_MODEL",
            ModelError::UnknownRelation { .. } => "UNKNOWN_RELATION",
        }
    }
}

impl From<ModelError> for ApiError {
    fn from(err: ModelError) -> Self {
        ApiError::Model(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

#[derive(Debug)]
pub enum RequestError {
    /// ACL denied the call
    AuthorizationRequired,

    LoginFailed,

    /// The method exists but is not on the model's allow-list
    MethodDisabled { model: String, method: String },

    RouteNotFound { verb: String, path: String },

    BadRequest { message: String },

    InvalidJson { message: String },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::AuthorizationRequired => write!(f, "Authorization Required"),
            RequestError::LoginFailed => write!(f, "login failed"),
            RequestError::MethodDisabled { model, method } => {
                write!(f, "Method \"{}\" of \"{}\" is disabled", method, model)
            }
            RequestError::RouteNotFound { verb, path } => {
                write!(f, "There is no method to handle {} {}", verb, path)
            }
            RequestError::BadRequest { message } => write!(f, "{}", message),
            RequestError::InvalidJson { message } => write!(f, "Invalid JSON: {}", message),
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::AuthorizationRequired | RequestError::LoginFailed => {
                StatusCode::UNAUTHORIZED
            }
            RequestError::MethodDisabled { .. } | RequestError::RouteNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            RequestError::BadRequest { .. } | RequestError::InvalidJson { .. } => {
                StatusCode::BAD_REQUEST
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::AuthorizationRequired => "AUTHORIZATION_REQUIRED",
            RequestError::LoginFailed => "LOGIN_FAILED",
            RequestError::MethodDisabled { .. } => "METHOD_DISABLED",
            RequestError::RouteNotFound { .. } => "ROUTE_NOT_FOUND",
            RequestError::BadRequest { .. } => "BAD_REQUEST",
            RequestError::InvalidJson { .. } => "INVALID_JSON",
        }
    }
}

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        ApiError::Request(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

#[derive(Debug)]
pub enum ValidationError {
    /// Field name -> messages
    Invalid {
        model: String,
        fields: BTreeMap<String, Vec<String>>,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Invalid { model, fields } => {
                let details: Vec<String> = fields
                    .iter()
                    .map(|(field, messages)| format!("`{}` {}", field, messages.join(", ")))
                    .collect();
                write!(
                    f,
                    "The `{}` instance is not valid. Details: {}.",
                    model,
                    details.join("; ")
                )
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::Validation(err)
    }
}

// =============================================================================
// Configuration Errors
// =============================================================================

#[derive(Debug)]
pub enum ConfigError {
    ParseError {
        file: Option<String>,
        message: String,
    },

    IoError { message: String },

    UnknownModel { model: String },

    UnknownRelationTarget {
        model: String,
        relation: String,
        target: String,
    },

    DuplicatePlural { plural: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => match file {
                Some(file) => write!(f, "Failed to parse config file '{}': {}", file, message),
                None => write!(f, "Failed to parse config: {}", message),
            },
            ConfigError::IoError { message } => write!(f, "Failed to read config: {}", message),
            ConfigError::UnknownModel { model } => {
                write!(f, "Configuration references unknown model '{}'", model)
            }
            ConfigError::UnknownRelationTarget {
                model,
                relation,
                target,
            } => write!(
                f,
                "Relation '{}.{}' targets unknown model '{}'",
                model, relation, target
            ),
            ConfigError::DuplicatePlural { plural } => {
                write!(f, "Plural '{}' is used by more than one model", plural)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Config(err)
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

#[derive(Debug)]
pub enum StorageError {
    OperationFailed {
        model: String,
        operation: String,
        message: String,
    },
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::OperationFailed {
                model,
                operation,
                message,
            } => write!(f, "Storage {} on '{}' failed: {}", operation, model, message),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<StorageError> for ApiError {
    fn from(err: StorageError) -> Self {
        ApiError::Storage(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Request(RequestError::InvalidJson {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::IoError {
            message: err.to_string(),
        }
    }
}

/// Library seams return `anyhow`; anything surfacing here is a server error
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<StorageError>() {
            Ok(storage) => ApiError::Storage(storage),
            Err(other) => ApiError::Internal(format!("{:#}", other)),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::from(RequestError::AuthorizationRequired).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::from(RequestError::MethodDisabled {
                model: "interaction".into(),
                method: "find".into(),
            })
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(ValidationError::Invalid {
                model: "job".into(),
                fields: BTreeMap::new(),
            })
            .status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            ApiError::Internal("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        let err = ModelError::NotFound {
            model: "interaction".into(),
            id: "count".into(),
        };
        assert_eq!(err.to_string(), "Unknown \"interaction\" id \"count\".");
        assert_eq!(err.error_code(), "MODEL_NOT_FOUND");
    }

    #[test]
    fn test_response_shape() {
        let err = ApiError::from(RequestError::AuthorizationRequired);
        let body = serde_json::to_value(err.to_response(false)).unwrap();

        assert_eq!(body["error"]["statusCode"], 401);
        assert_eq!(body["error"]["code"], "AUTHORIZATION_REQUIRED");
        assert_eq!(body["error"]["name"], "Error");
        assert!(body["error"].get("details").is_none());
    }

    #[test]
    fn test_validation_details() {
        let mut fields = BTreeMap::new();
        fields.insert("type".to_string(), vec!["can't be blank".to_string()]);
        let err = ApiError::from(ValidationError::Invalid {
            model: "interaction".into(),
            fields,
        });
        let body = serde_json::to_value(err.to_response(false)).unwrap();

        assert_eq!(body["error"]["name"], "ValidationError");
        assert_eq!(body["error"]["details"]["context"], "interaction");
        assert_eq!(body["error"]["details"]["messages"]["type"][0], "can't be blank");
    }

    #[test]
    fn test_server_errors_are_opaque_without_debug() {
        let err = ApiError::Internal("database exploded".into());

        let hidden = err.to_response(false);
        assert_eq!(hidden.error.message, "Internal Server Error");

        let shown = err.to_response(true);
        assert!(shown.error.message.contains("database exploded"));
    }

    #[test]
    fn test_anyhow_conversion_keeps_storage_errors() {
        let err: ApiError = anyhow::Error::new(StorageError::OperationFailed {
            model: "job".into(),
            operation: "create".into(),
            message: "lock poisoned".into(),
        })
        .into();
        assert_eq!(err.error_code(), "STORAGE_ERROR");

        let err: ApiError = anyhow::anyhow!("plain").into();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::UnknownRelationTarget {
            model: "job".into(),
            relation: "owner".into(),
            target: "person".into(),
        };
        assert_eq!(
            err.to_string(),
            "Relation 'job.owner' targets unknown model 'person'"
        );
    }
}
