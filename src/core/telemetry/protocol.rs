//! Worker message protocol.
//!
//! Request-tagged, JSON-serializable messages: `{id, action}` in,
//! `{id, success, data?, error?}` out. A host process can serialize these
//! types as-is across its own boundary.

use serde::{Deserialize, Serialize};

/// Reserved response id a host-boundary transport uses for the worker's
/// startup-complete message. In-process the same signal is exposed by
/// [`TelemetryHandle::wait_ready`](super::TelemetryHandle::wait_ready)
/// instead of a response.
pub const READY_ID: &str = "ready";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WorkerAction {
    GetUsage,
    GetProcesses,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerRequest {
    pub id: String,
    pub action: WorkerAction,
    /// Reserved for actions that take arguments; both current actions
    /// ignore it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerResponse {
    pub id: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl WorkerResponse {
    pub fn ok(id: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            id: id.into(),
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

}
