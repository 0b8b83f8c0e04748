use serde::Serialize;

use crate::error::{ExoError, Result};

#[derive(Debug, Serialize)]
pub struct RobotResponse<T> {
    pub status: RobotStatus,
    pub version: String,
    pub data: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RobotStatus {
    Ok,
    Error { code: String, message: String },
}

pub fn robot_ok<T: Serialize>(data: T) -> RobotResponse<T> {
    RobotResponse {
        status: RobotStatus::Ok,
        version: crate::VERSION.to_string(),
        data,
        warnings: Vec::new(),
    }
}

pub fn robot_error(err: &ExoError) -> RobotResponse<serde_json::Value> {
    RobotResponse {
        status: RobotStatus::Error {
            code: error_code(err).to_string(),
            message: err.to_string(),
        },
        version: crate::VERSION.to_string(),
        data: serde_json::Value::Null,
        warnings: Vec::new(),
    }
}

pub fn emit_robot<T: Serialize>(response: &RobotResponse<T>) -> Result<()> {
    emit_json(response)
}

pub fn emit_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value)?;
    println!("{payload}");
    Ok(())
}

const fn error_code(err: &ExoError) -> &'static str {
    match err {
        ExoError::Database(_) => "database",
        ExoError::Io(_) => "io",
        ExoError::SearchIndex(_) => "search_index",
        ExoError::Json(_) => "json",
        ExoError::Config(_) | ExoError::MissingConfig(_) => "config",
        ExoError::Embedding(_) => "embedding",
        ExoError::Rerank(_) => "rerank",
        ExoError::Scoring(_) => "scoring",
        ExoError::Timeout(_) => "timeout",
        ExoError::NotFound(_) => "not_found",
    }
}
