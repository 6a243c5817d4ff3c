use serde::{Deserialize, Serialize};

use crate::contract::{CoreRequest, CoreResponse};
use crate::core_service::{CoreService, ServiceError};
use crate::query_engine::LookupError;
use crate::steam_api::FetchError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidJson,
    InvalidRequest,
    NetworkFailure,
    Timeout,
    InvalidResponse,
    NotFound,
    EmptyQuery,
    CatalogUnavailable,
    LoadInProgress,
    Store,
    Session,
    Config,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TransportResponse {
    Ok { response: CoreResponse },
    Err { error: ErrorResponse },
}

pub fn handle_request(service: &CoreService, request: CoreRequest) -> TransportResponse {
    match service.handle_command(request) {
        Ok(response) => TransportResponse::Ok { response },
        Err(error) => TransportResponse::Err {
            error: map_service_error(&error),
        },
    }
}

pub fn handle_json(service: &CoreService, payload: &str) -> String {
    let response = match serde_json::from_str::<CoreRequest>(payload) {
        Ok(request) => handle_request(service, request),
        Err(error) => TransportResponse::Err {
            error: ErrorResponse {
                code: ErrorCode::InvalidJson,
                message: error.to_string(),
                status: "Malformed request".to_string(),
            },
        },
    };

    serde_json::to_string(&response).unwrap_or_else(|error| {
        format!(
            r#"{{"status":"err","error":{{"code":"invalid_request","message":"failed to encode response: {}","status":"Internal error"}}}}"#,
            error.to_string().replace('"', "'")
        )
    })
}

pub fn error_code(error: &ServiceError) -> ErrorCode {
    match error {
        ServiceError::Fetch(FetchError::NetworkFailure(_)) => ErrorCode::NetworkFailure,
        ServiceError::Fetch(FetchError::Timeout) => ErrorCode::Timeout,
        ServiceError::Fetch(FetchError::InvalidResponse(_)) => ErrorCode::InvalidResponse,
        ServiceError::Lookup(LookupError::EmptyQuery) => ErrorCode::EmptyQuery,
        ServiceError::Lookup(LookupError::NotFound(_)) => ErrorCode::NotFound,
        ServiceError::UnknownEntry(_) => ErrorCode::NotFound,
        ServiceError::CatalogUnavailable => ErrorCode::CatalogUnavailable,
        ServiceError::LoadInProgress => ErrorCode::LoadInProgress,
        ServiceError::InvalidRequest(_) => ErrorCode::InvalidRequest,
        ServiceError::Store(_) => ErrorCode::Store,
        ServiceError::Session(_) => ErrorCode::Session,
        ServiceError::Config(_) => ErrorCode::Config,
    }
}

fn map_service_error(error: &ServiceError) -> ErrorResponse {
    ErrorResponse {
        code: error_code(error),
        message: error.to_string(),
        status: error.status_message(),
    }
}
