//! Wire frames exchanged between persistence clients and the worker.
//!
//! Requests are `{id, type, payload}` and responses `{id, status, result?, error?}`; every payload
//! is plain JSON so the same frames can cross a thread channel, a process pipe, or a socket.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Correlation id echoed back by the worker; unique per in-flight request of one client.
pub struct RequestId(pub u64);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "req-{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
/// Operations served by the persistence worker.
pub enum WorkerRequest {
    /// Read the value stored under `key`.
    Read {
        /// Absolute path key.
        key: String,
    },
    /// Store `value` under `key`.
    Write {
        /// Absolute path key.
        key: String,
        /// Serialized node.
        value: Value,
    },
    /// Remove `key`.
    Delete {
        /// Absolute path key.
        key: String,
    },
    /// List every stored key.
    GetAllKeys {},
}

impl WorkerRequest {
    /// Stable operation label used in logs.
    pub fn op_name(&self) -> &'static str {
        match self {
            Self::Read { .. } => "read",
            Self::Write { .. } => "write",
            Self::Delete { .. } => "delete",
            Self::GetAllKeys {} => "getAllKeys",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Request envelope carrying a correlation id.
pub struct RequestFrame<R> {
    /// Correlation id.
    pub id: RequestId,
    /// Operation and payload.
    #[serde(flatten)]
    pub request: R,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Outcome marker for a [`ResponseFrame`].
pub enum ResponseStatus {
    /// The operation completed; `result` holds its value.
    Success,
    /// The operation failed; `error` holds the message.
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Response envelope echoing the request id.
pub struct ResponseFrame {
    /// Correlation id copied from the request.
    pub id: RequestId,
    /// Success or error marker.
    pub status: ResponseStatus,
    /// Operation result on success.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error message on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResponseFrame {
    /// Builds a success response.
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            status: ResponseStatus::Success,
            result: Some(result),
            error: None,
        }
    }

    /// Builds an error response.
    pub fn failure(id: RequestId, error: impl Into<String>) -> Self {
        Self {
            id,
            status: ResponseStatus::Error,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Converts the frame into the result delivered to the waiting caller.
    pub fn into_result(self) -> Result<Value, String> {
        match self.status {
            ResponseStatus::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseStatus::Error => Err(self
                .error
                .unwrap_or_else(|| "worker reported an unspecified error".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn request_frames_use_type_and_payload_fields() {
        let frame = RequestFrame {
            id: RequestId(7),
            request: WorkerRequest::Write {
                key: "/a.txt".into(),
                value: json!({"name": "a.txt"}),
            },
        };
        assert_eq!(
            serde_json::to_value(&frame).expect("serialize"),
            json!({
                "id": 7,
                "type": "write",
                "payload": {"key": "/a.txt", "value": {"name": "a.txt"}},
            })
        );

        let keys = RequestFrame {
            id: RequestId(8),
            request: WorkerRequest::GetAllKeys {},
        };
        assert_eq!(
            serde_json::to_value(&keys).expect("serialize"),
            json!({"id": 8, "type": "getAllKeys", "payload": {}})
        );
    }

    #[test]
    fn request_frames_decode_from_wire_json() {
        let frame: RequestFrame<WorkerRequest> =
            serde_json::from_value(json!({"id": 3, "type": "read", "payload": {"key": "/x"}}))
                .expect("deserialize");
        assert_eq!(frame.id, RequestId(3));
        assert_eq!(frame.request, WorkerRequest::Read { key: "/x".into() });
        assert_eq!(frame.request.op_name(), "read");
    }

    #[test]
    fn response_frames_omit_absent_fields() {
        let ok = ResponseFrame::success(RequestId(1), json!(["/a"]));
        assert_eq!(
            serde_json::to_value(&ok).expect("serialize"),
            json!({"id": 1, "status": "success", "result": ["/a"]})
        );
        let err = ResponseFrame::failure(RequestId(2), "disk full");
        assert_eq!(
            serde_json::to_value(&err).expect("serialize"),
            json!({"id": 2, "status": "error", "error": "disk full"})
        );
        assert_eq!(err.into_result(), Err("disk full".to_string()));
    }

    #[test]
    fn success_without_result_decodes_as_null() {
        let frame: ResponseFrame =
            serde_json::from_value(json!({"id": 4, "status": "success"})).expect("deserialize");
        assert_eq!(frame.into_result(), Ok(Value::Null));
    }
}
