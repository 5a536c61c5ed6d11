//! OCPP-J message framing with attached signatures
//!
//! OCPP-J frames are JSON arrays:
//! - CALL: [2, messageId, action, payload]
//! - CALLRESULT: [3, messageId, payload]
//! - CALLERROR: [4, messageId, errorCode, errorDescription, errorDetails]
//!
//! Signatures travel inside the payload as a top-level `signatures` array.
//! Parsing lifts them out into [`Signature`] values so the remaining payload
//! is exactly what was signed; serialization puts them back.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::types::*;
use crate::crypto::Signature;
use crate::error::{FormatError, SigningError};
use crate::security::{SignInfo, SignableMessage, VerificationStatus, SIGNATURES_FIELD};

/// OCPP message type identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    Call = 2,
    CallResult = 3,
    CallError = 4,
}

/// OCPP error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    FormatViolation,
    GenericError,
    InternalError,
    MessageTypeNotSupported,
    NotImplemented,
    NotSupported,
    OccurrenceConstraintViolation,
    PropertyConstraintViolation,
    ProtocolError,
    RpcFrameworkError,
    SecurityError,
    TypeConstraintViolation,
}

/// OCPP action names
///
/// The actions this crate builds have their own variants; every other
/// well-formed name (`Authorize`, `SignCertificate`, ...) is kept as
/// [`Action::Other`] so its signatures can still be verified.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    BootNotification,
    Heartbeat,
    DataTransfer,
    Other(String),
}

impl Action {
    pub fn as_str(&self) -> &str {
        match self {
            Action::BootNotification => "BootNotification",
            Action::Heartbeat => "Heartbeat",
            Action::DataTransfer => "DataTransfer",
            Action::Other(name) => name,
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Action {
    type Err = OcppError;

    /// Action names are non-empty ASCII alphanumerics.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BootNotification" => Ok(Action::BootNotification),
            "Heartbeat" => Ok(Action::Heartbeat),
            "DataTransfer" => Ok(Action::DataTransfer),
            _ if !s.is_empty() && s.bytes().all(|b| b.is_ascii_alphanumeric()) => {
                Ok(Action::Other(s.to_string()))
            }
            _ => Err(OcppError::InvalidAction(s.to_string())),
        }
    }
}

/// Errors in OCPP message handling
#[derive(Debug, Error)]
pub enum OcppError {
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid message format")]
    InvalidFormat,

    #[error("Invalid action name: {0:?}")]
    InvalidAction(String),

    #[error("Unknown message type: {0}")]
    UnknownMessageType(i64),

    #[error("Invalid signature data: {0}")]
    Format(#[from] FormatError),

    #[error("Signing failed: {0}")]
    Signing(#[from] SigningError),
}

/// Split `payload.signatures` off the payload.
fn take_signatures(payload: &mut Value) -> Result<Vec<Signature>, FormatError> {
    let Some(obj) = payload.as_object_mut() else {
        return Ok(Vec::new());
    };
    match obj.remove(SIGNATURES_FIELD) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => items.iter().map(Signature::parse).collect(),
        Some(_) => Err(FormatError::invalid(SIGNATURES_FIELD, "must be an array")),
    }
}

/// Payload with `signatures` put back, as sent on the wire.
fn with_signatures(payload: &Value, signatures: &[Signature]) -> Result<Value, OcppError> {
    if signatures.is_empty() {
        return Ok(payload.clone());
    }
    let mut obj: Map<String, Value> = payload
        .as_object()
        .cloned()
        .ok_or(OcppError::InvalidFormat)?;
    obj.insert(
        SIGNATURES_FIELD.to_string(),
        Value::Array(signatures.iter().map(Signature::to_json).collect()),
    );
    Ok(Value::Object(obj))
}

/// OCPP CALL message (request)
#[derive(Debug, Clone)]
pub struct Call {
    pub message_id: String,
    pub action: Action,
    /// Payload without `signatures`
    pub payload: Value,
    pub signatures: Vec<Signature>,
    /// Identities this call asks to be signed with, in addition to policy
    pub sign_infos: Vec<SignInfo>,
}

impl Call {
    /// Create a new CALL message with auto-generated ID
    pub fn new(action: Action, payload: impl Serialize) -> Result<Self, OcppError> {
        let mut payload = serde_json::to_value(payload)?;
        let signatures = take_signatures(&mut payload)?;
        Ok(Self {
            message_id: Uuid::new_v4().to_string(),
            action,
            payload,
            signatures,
            sign_infos: Vec::new(),
        })
    }

    /// Create BootNotification call
    pub fn boot_notification(station: ChargingStationInfo, reason: BootReason) -> Result<Self, OcppError> {
        Self::new(
            Action::BootNotification,
            BootNotificationRequest {
                charging_station: station,
                reason,
                custom_data: None,
                signatures: Vec::new(),
            },
        )
    }

    /// Create Heartbeat call
    pub fn heartbeat() -> Result<Self, OcppError> {
        Self::new(Action::Heartbeat, HeartbeatRequest::default())
    }

    /// Create DataTransfer call
    pub fn data_transfer(
        vendor_id: impl Into<String>,
        message_id: Option<String>,
        data: Option<Value>,
    ) -> Result<Self, OcppError> {
        Self::new(
            Action::DataTransfer,
            DataTransferRequest {
                vendor_id: vendor_id.into(),
                message_id,
                data,
                custom_data: None,
                signatures: Vec::new(),
            },
        )
    }

    /// Ask for this call to be signed with `info`
    pub fn with_sign_info(mut self, info: SignInfo) -> Self {
        self.sign_infos.push(info);
        self
    }

    /// Payload as sent, signatures included
    pub fn wire_payload(&self) -> Result<Value, OcppError> {
        with_signatures(&self.payload, &self.signatures)
    }

    /// Serialize to OCPP wire format: [2, messageId, action, payload]
    pub fn to_bytes(&self) -> Result<Vec<u8>, OcppError> {
        let array = serde_json::json!([
            MessageType::Call as i32,
            &self.message_id,
            self.action.as_str(),
            self.wire_payload()?
        ]);
        Ok(serde_json::to_vec(&array)?)
    }

    /// Parse the payload, signatures included, as a specific request type
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, OcppError> {
        Ok(serde_json::from_value(self.wire_payload()?)?)
    }
}

impl SignableMessage for Call {
    fn action(&self) -> &str {
        self.action.as_str()
    }

    fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    fn add_signature(&mut self, signature: Signature) {
        self.signatures.push(signature);
    }

    fn sign_infos(&self) -> &[SignInfo] {
        &self.sign_infos
    }

    fn signable_json(&self) -> Value {
        self.payload.clone()
    }
}

/// OCPP CALLRESULT message (success response)
#[derive(Debug, Clone)]
pub struct CallResult {
    pub message_id: String,
    pub payload: Value,
}

impl CallResult {
    /// Create a new CALLRESULT message
    pub fn new(message_id: String, payload: impl Serialize) -> Result<Self, OcppError> {
        Ok(Self {
            message_id,
            payload: serde_json::to_value(payload)?,
        })
    }

    /// Create response for DataTransfer
    pub fn data_transfer(message_id: String, status: DataTransferStatus) -> Result<Self, OcppError> {
        Self::new(
            message_id,
            DataTransferResponse {
                status,
                data: None,
                status_info: None,
                signatures: Vec::new(),
            },
        )
    }

    /// Serialize to OCPP wire format: [3, messageId, payload]
    pub fn to_bytes(&self) -> Result<Vec<u8>, OcppError> {
        let array = serde_json::json!([
            MessageType::CallResult as i32,
            &self.message_id,
            &self.payload
        ]);
        Ok(serde_json::to_vec(&array)?)
    }

    /// Parse the payload as a specific response type
    pub fn parse_payload<T: for<'de> Deserialize<'de>>(&self) -> Result<T, OcppError> {
        Ok(serde_json::from_value(self.payload.clone())?)
    }
}

/// OCPP CALLERROR message (error response)
#[derive(Debug, Clone)]
pub struct CallError {
    pub message_id: String,
    pub error_code: ErrorCode,
    pub error_description: String,
    pub error_details: Value,
}

impl CallError {
    /// Create a new CALLERROR message
    pub fn new(
        message_id: String,
        error_code: ErrorCode,
        error_description: impl Into<String>,
    ) -> Self {
        Self {
            message_id,
            error_code,
            error_description: error_description.into(),
            error_details: Value::Object(Map::new()),
        }
    }

    /// SecurityError answer to a call whose signatures were rejected
    pub fn signature_rejected(message_id: String, status: VerificationStatus) -> Self {
        let mut error = Self::new(
            message_id,
            ErrorCode::SecurityError,
            "Message signature verification failed",
        );
        error.error_details = serde_json::json!({ "verificationStatus": status });
        error
    }

    /// Serialize to OCPP wire format: [4, messageId, errorCode, errorDescription, errorDetails]
    pub fn to_bytes(&self) -> Result<Vec<u8>, OcppError> {
        let array = serde_json::json!([
            MessageType::CallError as i32,
            &self.message_id,
            format!("{:?}", self.error_code),
            &self.error_description,
            &self.error_details
        ]);
        Ok(serde_json::to_vec(&array)?)
    }
}

/// Parsed OCPP message (any type)
#[derive(Debug, Clone)]
pub enum OcppMessage {
    Call(Call),
    CallResult(CallResult),
    CallError(CallError),
}

impl OcppMessage {
    /// Parse an OCPP message from JSON bytes
    pub fn parse(bytes: &[u8]) -> Result<Self, OcppError> {
        let array: Vec<Value> = serde_json::from_slice(bytes)?;

        let msg_type = array
            .first()
            .and_then(Value::as_i64)
            .ok_or(OcppError::InvalidFormat)?;

        let message_id = || -> Result<String, OcppError> {
            array
                .get(1)
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or(OcppError::InvalidFormat)
        };

        match msg_type {
            2 => {
                // CALL: [2, messageId, action, payload]
                if array.len() != 4 {
                    return Err(OcppError::InvalidFormat);
                }

                let action: Action = array[2]
                    .as_str()
                    .ok_or(OcppError::InvalidFormat)?
                    .parse()?;

                let mut payload = array[3].clone();
                let signatures = take_signatures(&mut payload)?;

                Ok(OcppMessage::Call(Call {
                    message_id: message_id()?,
                    action,
                    payload,
                    signatures,
                    sign_infos: Vec::new(),
                }))
            }
            3 => {
                // CALLRESULT: [3, messageId, payload]
                if array.len() != 3 {
                    return Err(OcppError::InvalidFormat);
                }

                Ok(OcppMessage::CallResult(CallResult {
                    message_id: message_id()?,
                    payload: array[2].clone(),
                }))
            }
            4 => {
                // CALLERROR: [4, messageId, errorCode, errorDescription, errorDetails]
                if array.len() != 5 {
                    return Err(OcppError::InvalidFormat);
                }

                let error_code_str = array[2]
                    .as_str()
                    .ok_or(OcppError::InvalidFormat)?;

                let error_code: ErrorCode = serde_json::from_value(
                    Value::String(error_code_str.to_string())
                ).unwrap_or(ErrorCode::GenericError);

                Ok(OcppMessage::CallError(CallError {
                    message_id: message_id()?,
                    error_code,
                    error_description: array[3].as_str().unwrap_or("").to_string(),
                    error_details: array[4].clone(),
                }))
            }
            _ => Err(OcppError::UnknownMessageType(msg_type)),
        }
    }

    /// Get the message ID
    pub fn message_id(&self) -> &str {
        match self {
            OcppMessage::Call(c) => &c.message_id,
            OcppMessage::CallResult(r) => &r.message_id,
            OcppMessage::CallError(e) => &e.message_id,
        }
    }

    /// Serialize to bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, OcppError> {
        match self {
            OcppMessage::Call(c) => c.to_bytes(),
            OcppMessage::CallResult(r) => r.to_bytes(),
            OcppMessage::CallError(e) => e.to_bytes(),
        }
    }
}
