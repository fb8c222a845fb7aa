use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ "id"?: any, "type": string, "data": object }` (§6).
#[derive(Debug, Deserialize)]
pub struct Request {
    pub id: Option<Value>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Value,
}

/// `{ "id"?: echoed, "success": bool, "data"?: object, "errMsg"?: string }`
/// (§6). Responses echo the request's `id` (if any) and are otherwise
/// uncorrelated with request order.
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(rename = "errMsg", skip_serializing_if = "Option::is_none")]
    pub err_msg: Option<String>,
}

impl Response {
    pub fn ok(id: Option<Value>, data: Value) -> Self {
        Self {
            id,
            success: true,
            data: Some(data),
            err_msg: None,
        }
    }

    pub fn err(id: Option<Value>, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            data: None,
            err_msg: Some(message.into()),
        }
    }
}
