// ABOUTME: Unified error handling system with standard error codes and HTTP responses
// ABOUTME: AppError carries a code + message and converts directly into an axum response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Embedchat

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use thiserror::Error;

/// Result alias used across the server
pub type AppResult<T> = Result<T, AppError>;

/// Classified error codes with fixed HTTP status mappings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Missing credentials
    AuthRequired,
    /// Credentials present but rejected
    AuthInvalid,
    /// Authenticated but not allowed
    Forbidden,
    /// Request payload failed validation
    InvalidInput,
    /// Resource does not exist (business-logic miss, not a fault)
    NotFound,
    /// Uniqueness conflict at the storage layer
    Conflict,
    /// Storage fault
    Database,
    /// Upstream service fault
    ExternalService,
    /// Server misconfiguration
    Config,
    /// Anything else
    Internal,
}

impl ErrorCode {
    /// HTTP status this code maps to
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::AuthRequired | Self::AuthInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::InvalidInput => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::ExternalService => StatusCode::BAD_GATEWAY,
            Self::Database | Self::Config | Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Application error carrying a classified code and a human-readable message
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct AppError {
    /// Error classification
    pub code: ErrorCode,
    /// Human-readable detail, safe to return to API clients
    pub message: String,
}

impl AppError {
    /// Create an error with an explicit code
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Missing credentials
    pub fn auth_required(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthRequired, message)
    }

    /// Credentials rejected
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Authenticated but not allowed
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Forbidden, message)
    }

    /// Validation failure
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Business-logic miss
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    /// Uniqueness conflict
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    /// Storage fault
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Database, message)
    }

    /// Upstream service fault, prefixed with the service name
    pub fn external_service(service: &str, message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::new(ErrorCode::ExternalService, format!("{service}: {message}"))
    }

    /// Server misconfiguration
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, message)
    }

    /// Unclassified internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.status();
        // Storage faults keep their detail in the log, not the response body
        let message = if matches!(self.code, ErrorCode::Database | ErrorCode::Internal) {
            tracing::error!(code = ?self.code, detail = %self.message, "request failed");
            "internal server error".to_owned()
        } else {
            self.message
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
