use std::{collections::HashMap, time::Duration};

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::app::Heads;
use crate::error::RpcError;

const GET_BLOCK_BY_NUMBER: &str = "eth_getBlockByNumber";

// Request ids follow the position of each tag
const HEAD_TAGS: [&str; 3] = ["latest", "safe", "finalized"];

/// Anything that can report the three head pointers of a node.
pub trait HeadSource {
    fn fetch_heads(&mut self) -> Result<Heads, RpcError>;
}

#[derive(Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: &'a Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RpcPayload {
    Batch(Vec<RpcResponse>),
    Single(RpcResponse),
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

impl From<RpcErrorObject> for RpcError {
    fn from(err: RpcErrorObject) -> Self {
        RpcError::Protocol {
            code: err.code,
            message: err.message,
        }
    }
}

pub struct RpcClient {
    client: Client,
    url: String,
}

impl RpcClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, RpcError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Sends all calls in one JSON-RPC batch and returns their results in
    /// call order. Responses are matched to calls by id, not by position.
    pub fn call_batch(&self, calls: &[(&str, Value)]) -> Result<Vec<Option<Value>>, RpcError> {
        let requests: Vec<RpcRequest> = calls
            .iter()
            .enumerate()
            .map(|(id, (method, params))| RpcRequest {
                jsonrpc: "2.0",
                id: id as u64,
                method: *method,
                params,
            })
            .collect();

        let response = self.client.post(&self.url).json(&requests).send()?;
        let status = response.status();
        let body = response.text()?;
        debug!(%status, bytes = body.len(), "batch response received");

        let payload: RpcPayload = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(_) if !status.is_success() => return Err(RpcError::HttpStatus(status)),
            Err(err) => return Err(RpcError::UnexpectedResponse(err.to_string())),
        };

        let items = match payload {
            RpcPayload::Batch(items) => items,
            RpcPayload::Single(RpcResponse { error: Some(err), .. }) => return Err(err.into()),
            RpcPayload::Single(_) if !status.is_success() => return Err(RpcError::HttpStatus(status)),
            RpcPayload::Single(_) => {
                return Err(RpcError::UnexpectedResponse(
                    "expected a batch array".to_string(),
                ))
            }
        };

        let mut by_id: HashMap<u64, Option<Value>> = HashMap::with_capacity(items.len());
        for item in items {
            if let Some(err) = item.error {
                return Err(err.into());
            }
            let id = item.id.as_ref().and_then(response_id).ok_or_else(|| {
                RpcError::UnexpectedResponse("batch entry without a usable id".to_string())
            })?;
            if by_id.insert(id, item.result).is_some() {
                return Err(RpcError::UnexpectedResponse(format!(
                    "duplicate response id {id}"
                )));
            }
        }

        (0..calls.len() as u64)
            .map(|id| by_id.remove(&id).ok_or(RpcError::MissingResponse { id }))
            .collect()
    }
}

impl HeadSource for RpcClient {
    fn fetch_heads(&mut self) -> Result<Heads, RpcError> {
        let calls: Vec<(&str, Value)> = HEAD_TAGS
            .iter()
            .map(|tag| (GET_BLOCK_BY_NUMBER, json!([tag, false])))
            .collect();

        let [latest, safe, finalized]: [Option<Value>; 3] = self
            .call_batch(&calls)?
            .try_into()
            .map_err(|_| RpcError::UnexpectedResponse("expected three results".to_string()))?;

        Ok(Heads {
            latest: header_number(latest.as_ref())?,
            safe: header_number(safe.as_ref())?,
            finalized: header_number(finalized.as_ref())?,
        })
    }
}

fn response_id(id: &Value) -> Option<u64> {
    match id {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

/// Extracts the block number from an `eth_getBlockByNumber` result. A null
/// result means the node has no block for that tag.
pub fn header_number(result: Option<&Value>) -> Result<Option<u64>, RpcError> {
    let number = match result {
        None | Some(Value::Null) => return Ok(None),
        Some(header) => header.get("number"),
    };
    match number {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(hex)) => parse_hex_quantity(hex).map(Some),
        Some(other) => Err(RpcError::Decode {
            value: other.to_string(),
        }),
    }
}

pub fn parse_hex_quantity(value: &str) -> Result<u64, RpcError> {
    let decode_err = || RpcError::Decode {
        value: value.to_string(),
    };
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .ok_or_else(decode_err)?;
    if digits.is_empty() {
        return Err(decode_err());
    }
    u64::from_str_radix(digits, 16).map_err(|_| decode_err())
}
