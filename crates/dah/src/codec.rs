//! Wire codec between the data model and the structured message format
//!
//! Messages are JSON documents. Records carry fixed PascalCase field names,
//! unknown fields are ignored and shape mismatches surface as
//! [`DahError::Codec`]. Every UUID travels as a one-field record
//! (`{"Uuid": "..."}`), both inside records and as a bare method argument.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::{DahError, Result};

/// Single-field record wrapping a UUID on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UuidRecord {
    #[serde(rename = "Uuid")]
    pub uuid: Uuid,
}

impl From<Uuid> for UuidRecord {
    fn from(uuid: Uuid) -> Self {
        Self { uuid }
    }
}

/// `#[serde(with = "uuid_record")]` adapter for UUID-valued record fields
pub mod uuid_record {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use uuid::Uuid;

    use super::UuidRecord;

    pub fn serialize<S: Serializer>(uuid: &Uuid, serializer: S) -> Result<S::Ok, S::Error> {
        UuidRecord::from(*uuid).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Uuid, D::Error> {
        UuidRecord::deserialize(deserializer).map(|record| record.uuid)
    }
}

/// Encode any model value into its wire form
pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| DahError::codec(e.to_string()))
}

/// Decode a wire value into a model value
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| DahError::codec(e.to_string()))
}

pub fn encode_uuids(ids: &[Uuid]) -> Result<Value> {
    let records: Vec<UuidRecord> = ids.iter().copied().map(UuidRecord::from).collect();
    encode(&records)
}

pub fn decode_uuids(value: Value) -> Result<Vec<Uuid>> {
    let records: Vec<UuidRecord> = decode(value)?;
    Ok(records.into_iter().map(|r| r.uuid).collect())
}

/// One remote method invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodCall {
    #[serde(rename = "Method")]
    pub method: String,

    #[serde(rename = "Params", default)]
    pub params: Vec<Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// Decode the positional argument at `index`
    pub fn param<T: DeserializeOwned>(&self, index: usize, name: &str) -> Result<T> {
        let value = self.params.get(index).cloned().ok_or_else(|| {
            DahError::codec(format!(
                "{}: missing argument '{}' at position {}",
                self.method, name, index
            ))
        })?;
        serde_json::from_value(value)
            .map_err(|e| DahError::codec(format!("{}: argument '{}': {}", self.method, name, e)))
    }

    pub fn uuids_param(&self, index: usize, name: &str) -> Result<Vec<Uuid>> {
        let records: Vec<UuidRecord> = self.param(index, name)?;
        Ok(records.into_iter().map(|r| r.uuid).collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FaultCode {
    UnknownMethod,
    InvalidArguments,
    InvalidTransition,
    Rejected,
    Internal,
}

/// Explicit error indicator carried in a reply envelope
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    #[serde(rename = "Code")]
    pub code: FaultCode,

    #[serde(rename = "Reason")]
    pub reason: String,
}

impl Fault {
    pub fn new(code: FaultCode, reason: impl Into<String>) -> Self {
        Self {
            code,
            reason: reason.into(),
        }
    }

    pub fn unknown_method(method: &str) -> Self {
        Self::new(FaultCode::UnknownMethod, format!("no handler for method '{}'", method))
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.reason)
    }
}

impl From<&DahError> for Fault {
    fn from(err: &DahError) -> Self {
        match err {
            DahError::Fault(fault) => fault.clone(),
            DahError::Codec(_) => Fault::new(FaultCode::InvalidArguments, err.to_string()),
            DahError::InvalidTransition { .. } => {
                Fault::new(FaultCode::InvalidTransition, err.to_string())
            }
            _ => Fault::new(FaultCode::Internal, err.to_string()),
        }
    }
}

/// Reply envelope: either a result value or a fault
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reply {
    Result(Value),
    Fault(Fault),
}

impl Reply {
    pub fn is_fault(&self) -> bool {
        matches!(self, Reply::Fault(_))
    }

    /// Decode the result value, turning a fault into [`DahError::Fault`]
    pub fn into_result<T: DeserializeOwned>(self) -> Result<T> {
        match self {
            Reply::Result(value) => decode(value),
            Reply::Fault(fault) => Err(DahError::Fault(fault)),
        }
    }
}

pub fn encode_call(call: &MethodCall) -> Result<Vec<u8>> {
    serde_json::to_vec(call).map_err(|e| DahError::codec(e.to_string()))
}

pub fn decode_call(body: &[u8]) -> Result<MethodCall> {
    serde_json::from_slice(body).map_err(|e| DahError::codec(e.to_string()))
}

pub fn encode_reply(reply: &Reply) -> Result<Vec<u8>> {
    serde_json::to_vec(reply).map_err(|e| DahError::codec(e.to_string()))
}

pub fn decode_reply(body: &[u8]) -> Result<Reply> {
    serde_json::from_slice(body).map_err(|e| DahError::codec(e.to_string()))
}
