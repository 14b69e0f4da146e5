// src/models/config_result.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AppError;

/// Outcome of a configuration or maintenance action, shown as UI feedback.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ConfigResult {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ConfigResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
            code: None,
        }
    }

    pub fn failed(message: impl Into<String>, err: &AppError) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: Some(err.message().to_string()),
            code: Some(err.code().to_string()),
        }
    }
}

/// Body of `PUT /api/admin/service-role`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ServiceRoleRequest {
    pub key: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ServiceRoleStatus {
    pub configured: bool,
}
