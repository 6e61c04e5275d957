use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use provis_schema::{FieldError, SchemaError};
use provis_store::StoreError;
use thiserror::Error;

use crate::message::ErrorResponse;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("no in-flight item for handle {0}")]
    HandleNotFound(String),

    #[error("{item_type} named {name} not found")]
    NameNotFound { item_type: String, name: String },

    #[error("{item_type} named {name} already exists")]
    NameTaken { item_type: String, name: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("field error: {0}")]
    Field(#[from] FieldError),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::HandleNotFound(_) | Self::NameNotFound { .. } => StatusCode::NOT_FOUND,
            Self::NameTaken { .. } => StatusCode::CONFLICT,
            Self::Store(StoreError::UnknownType(_) | StoreError::ItemNotFound(_)) => {
                StatusCode::NOT_FOUND
            }
            Self::Store(
                StoreError::InvalidSource(_) | StoreError::InvalidUid(_) | StoreError::Field(_),
            )
            | Self::Field(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
