//! Cryptographic signatures attached to OCPP messages
//!
//! A [`Signature`] has two wire forms:
//!
//! - JSON, carrying every field:
//!   `{ "keyId", "value", "algorithm"?, "signingMethod"?, "encodingMethod"?,
//!      "name"?, "description"?, "timestamp"?, "customData"? }`
//! - binary, carrying only the key id and the value:
//!   `u16 keyIdLength | keyId | u16 valueLength | value` (big-endian)
//!
//! The binary form is a strict subset for bandwidth-constrained transports.
//! Algorithm, signing method, encoding, name, description and timestamp do not
//! survive it.
//! TODO: add a versioned binary layout that carries the algorithm and signing
//! method once peers can negotiate it.

use std::hash::{Hash, Hasher};
use std::sync::OnceLock;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::algorithm::{CurveAlgorithm, SignatureEncoding, SigningMethod, DEFAULT_ALGORITHM};
use super::encoding::{
    as_object, encode_base64, optional_str, put_u16_prefixed, required_base64,
    take_u16_prefixed,
};
use crate::error::FormatError;
use crate::ocpp::{CustomData, I18NString};
use crate::security::VerificationStatus;

/// Smallest binary signature: two empty length headers.
pub const MIN_BINARY_LEN: usize = 4;

static DEFAULT_CURVE: CurveAlgorithm = DEFAULT_ALGORITHM;

/// A signature over a message's canonical bytes.
///
/// Equality and hashing cover `key_id`, `value`, the effective `algorithm`,
/// `signing_method`, `encoding` and `custom_data` only. `name`,
/// `description`, `timestamp` and the verification status are annotations;
/// signatures differing only in those compare equal.
#[derive(Debug, Clone)]
pub struct Signature {
    key_id: Vec<u8>,
    value: Vec<u8>,
    /// `None` when the wire form did not say, as with binary signatures
    algorithm: Option<CurveAlgorithm>,
    signing_method: Option<SigningMethod>,
    encoding: Option<SignatureEncoding>,
    name: Option<String>,
    description: Option<I18NString>,
    timestamp: Option<DateTime<Utc>>,
    custom_data: Option<CustomData>,
    status: OnceLock<VerificationStatus>,
}

impl Signature {
    pub fn new(key_id: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key_id: key_id.into(),
            value: value.into(),
            algorithm: None,
            signing_method: None,
            encoding: None,
            name: None,
            description: None,
            timestamp: None,
            custom_data: None,
            status: OnceLock::new(),
        }
    }

    pub fn with_algorithm(mut self, algorithm: CurveAlgorithm) -> Self {
        self.algorithm = Some(algorithm);
        self
    }

    pub fn with_signing_method(mut self, method: SigningMethod) -> Self {
        self.signing_method = Some(method);
        self
    }

    pub fn with_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.encoding = Some(encoding);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: I18NString) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn key_id(&self) -> &[u8] {
        &self.key_id
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Curve of the signature, `secp256r1` unless stated otherwise.
    pub fn algorithm(&self) -> &CurveAlgorithm {
        self.algorithm.as_ref().unwrap_or(&DEFAULT_CURVE)
    }

    /// Curve named by the signature itself, if any.
    pub fn stated_algorithm(&self) -> Option<&CurveAlgorithm> {
        self.algorithm.as_ref()
    }

    pub fn signing_method(&self) -> Option<&SigningMethod> {
        self.signing_method.as_ref()
    }

    pub fn encoding(&self) -> Option<&SignatureEncoding> {
        self.encoding.as_ref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn description(&self) -> Option<&I18NString> {
        self.description.as_ref()
    }

    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
    }

    pub fn custom_data(&self) -> Option<&CustomData> {
        self.custom_data.as_ref()
    }

    /// Result of verification, once it has run.
    pub fn status(&self) -> Option<VerificationStatus> {
        self.status.get().copied()
    }

    /// Record the verification result. Only the first write sticks; returns
    /// whether this call was it.
    pub fn set_status(&self, status: VerificationStatus) -> bool {
        self.status.set(status).is_ok()
    }

    // ------------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------------

    pub fn parse(json: &Value) -> Result<Self, FormatError> {
        let obj = as_object(json, "signature")?;

        let mut signature = Self::new(
            required_base64(obj, "keyId")?,
            required_base64(obj, "value")?,
        );

        signature.algorithm = optional_str(obj, "algorithm")?.map(CurveAlgorithm::from);
        signature.signing_method = optional_str(obj, "signingMethod")?.map(SigningMethod::from);
        signature.encoding = optional_str(obj, "encodingMethod")?.map(SignatureEncoding::from);
        signature.name = optional_str(obj, "name")?.map(str::to_string);

        if let Some(description) = obj.get("description").filter(|d| !d.is_null()) {
            signature.description = Some(
                serde_json::from_value(description.clone())
                    .map_err(|e| FormatError::invalid("description", e.to_string()))?,
            );
        }

        if let Some(timestamp) = optional_str(obj, "timestamp")? {
            let parsed = DateTime::parse_from_rfc3339(timestamp)
                .map_err(|e| FormatError::invalid("timestamp", format!("is not ISO-8601: {e}")))?;
            signature.timestamp = Some(parsed.with_timezone(&Utc));
        }

        if let Some(cd) = obj.get("customData").filter(|cd| !cd.is_null()) {
            signature.custom_data = Some(
                serde_json::from_value(cd.clone())
                    .map_err(|e| FormatError::invalid("customData", e.to_string()))?,
            );
        }

        Ok(signature)
    }

    pub fn parse_str(text: &str) -> Result<Self, FormatError> {
        Self::parse(&serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("keyId".into(), Value::String(encode_base64(&self.key_id)));
        obj.insert("value".into(), Value::String(encode_base64(&self.value)));

        if let Some(algorithm) = self.algorithm.as_ref().filter(|a| !a.is_default()) {
            obj.insert("algorithm".into(), Value::String(algorithm.to_string()));
        }
        if let Some(method) = &self.signing_method {
            obj.insert("signingMethod".into(), Value::String(method.to_string()));
        }
        if let Some(encoding) = &self.encoding {
            obj.insert("encodingMethod".into(), Value::String(encoding.to_string()));
        }
        if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
            obj.insert("name".into(), Value::String(name.to_string()));
        }
        if let Some(description) = self.description.as_ref().filter(|d| !d.is_empty()) {
            obj.insert("description".into(), description.to_json());
        }
        if let Some(timestamp) = &self.timestamp {
            obj.insert(
                "timestamp".into(),
                Value::String(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            );
        }
        if let Some(cd) = &self.custom_data {
            obj.insert("customData".into(), cd.to_json());
        }

        Value::Object(obj)
    }

    // ------------------------------------------------------------------------
    // Binary
    // ------------------------------------------------------------------------

    /// Decode exactly one binary signature; trailing bytes are an error.
    pub fn parse_binary(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut input = bytes;
        let signature = Self::read_binary(&mut input)?;
        if !input.is_empty() {
            return Err(FormatError::TrailingBytes {
                what: "signature",
                trailing: input.len(),
            });
        }
        Ok(signature)
    }

    /// Decode one binary signature from the front of `input`, advancing it.
    pub fn read_binary(input: &mut &[u8]) -> Result<Self, FormatError> {
        if input.len() < MIN_BINARY_LEN {
            return Err(FormatError::Truncated {
                what: "signature",
                needed: MIN_BINARY_LEN,
                available: input.len(),
            });
        }

        let key_id = take_u16_prefixed(input, "keyId")?;
        if key_id.is_empty() {
            return Err(FormatError::invalid("keyId", "must not be empty"));
        }
        let value = take_u16_prefixed(input, "value")?;
        if value.is_empty() {
            return Err(FormatError::invalid("value", "must not be empty"));
        }

        Ok(Self::new(key_id, value))
    }

    pub fn to_binary(&self) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(MIN_BINARY_LEN + self.key_id.len() + self.value.len());
        self.write_binary(&mut out)?;
        Ok(out)
    }

    /// Append the binary form to `out`. Nothing is written on error.
    pub fn write_binary(&self, out: &mut Vec<u8>) -> Result<(), FormatError> {
        let start = out.len();
        let result = put_u16_prefixed(out, "keyId", &self.key_id)
            .and_then(|_| put_u16_prefixed(out, "value", &self.value));
        if result.is_err() {
            out.truncate(start);
        }
        result
    }
}

impl PartialEq for Signature {
    fn eq(&self, other: &Self) -> bool {
        self.key_id == other.key_id
            && self.value == other.value
            && self.algorithm() == other.algorithm()
            && self.signing_method == other.signing_method
            && self.encoding == other.encoding
            && self.custom_data == other.custom_data
    }
}

impl Eq for Signature {}

impl Hash for Signature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key_id.hash(state);
        self.value.hash(state);
        self.algorithm().hash(state);
        self.signing_method.hash(state);
        self.encoding.hash(state);
        self.custom_data.hash(state);
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Signature::parse(&value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;
    use std::collections::HashSet;

    fn full_signature() -> Signature {
        Signature::new(vec![0x04, 0xAA, 0xBB], vec![0x11; 64])
            .with_algorithm(CurveAlgorithm::Secp256k1)
            .with_signing_method(SigningMethod::Binary)
            .with_encoding(SignatureEncoding::Raw)
            .with_name("station operator")
            .with_description(I18NString::create("en", "Boot attestation"))
            .with_timestamp(Utc.with_ymd_and_hms(2026, 1, 20, 12, 0, 0).unwrap())
            .with_custom_data(CustomData::new("com.example"))
    }

    #[test]
    fn test_json_roundtrip_full() {
        let signature = full_signature();
        let parsed = Signature::parse(&signature.to_json()).unwrap();

        assert_eq!(parsed, signature);
        assert_eq!(parsed.key_id(), signature.key_id());
        assert_eq!(parsed.value(), signature.value());
        assert_eq!(parsed.algorithm(), &CurveAlgorithm::Secp256k1);
        assert_eq!(parsed.signing_method(), Some(&SigningMethod::Binary));
        assert_eq!(parsed.encoding(), Some(&SignatureEncoding::Raw));
        assert_eq!(parsed.name(), Some("station operator"));
        assert_eq!(parsed.description(), signature.description());
        assert_eq!(parsed.timestamp(), signature.timestamp());
        assert_eq!(parsed.custom_data(), signature.custom_data());
    }

    #[test]
    fn test_json_shape() {
        let json = full_signature().to_json();
        assert_eq!(json["keyId"], "BKq7");
        assert_eq!(json["algorithm"], "secp256k1");
        assert_eq!(json["signingMethod"], "binary");
        assert_eq!(json["encodingMethod"], "raw");
        assert_eq!(json["timestamp"], "2026-01-20T12:00:00Z");
        assert_eq!(json["description"], json!({"en": "Boot attestation"}));
        assert_eq!(json["customData"], json!({"vendorId": "com.example"}));
    }

    #[test]
    fn test_defaults_omitted_and_restored() {
        let signature = Signature::new(vec![1, 2, 3], vec![4, 5, 6]);
        let json = signature.to_json();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 2);
        assert!(!obj.contains_key("algorithm"));
        assert!(!obj.contains_key("signingMethod"));
        assert!(!obj.contains_key("encodingMethod"));

        let parsed = Signature::parse(&json).unwrap();
        assert_eq!(parsed.algorithm(), &CurveAlgorithm::Secp256r1);
        assert_eq!(parsed.stated_algorithm(), None);
        assert_eq!(parsed.signing_method(), None);
        assert_eq!(parsed, signature);
    }

    #[test]
    fn test_empty_name_and_description_omitted() {
        let json = Signature::new(vec![1], vec![2])
            .with_name("")
            .with_description(I18NString::new())
            .to_json();
        assert!(json.get("name").is_none());
        assert!(json.get("description").is_none());
    }

    #[test]
    fn test_unknown_algorithm_preserved() {
        let json = json!({"keyId": "AQ==", "value": "Ag==", "algorithm": "brainpoolP256r1"});
        let signature = Signature::parse(&json).unwrap();
        assert_eq!(
            signature.algorithm(),
            &CurveAlgorithm::Other("brainpoolP256r1".to_string())
        );
        assert_eq!(signature.to_json()["algorithm"], "brainpoolP256r1");
    }

    #[test]
    fn test_mandatory_fields() {
        assert_eq!(
            Signature::parse(&json!({"value": "AQ=="})).unwrap_err(),
            FormatError::MissingField("keyId")
        );
        assert_eq!(
            Signature::parse(&json!({"keyId": "AQ=="})).unwrap_err(),
            FormatError::MissingField("value")
        );
        assert!(matches!(
            Signature::parse(&json!({"keyId": "%%", "value": "AQ=="})),
            Err(FormatError::InvalidField { field: "keyId", .. })
        ));
        assert!(matches!(
            Signature::parse(&json!({"keyId": "AQ==", "value": "AQ==", "timestamp": "yesterday"})),
            Err(FormatError::InvalidField { field: "timestamp", .. })
        ));
    }

    #[test]
    fn test_equality_ignores_annotations() {
        let plain = Signature::new(vec![1, 2], vec![3, 4]);
        let annotated = plain
            .clone()
            .with_name("someone")
            .with_description(I18NString::create("en", "text"))
            .with_timestamp(Utc::now());
        annotated.set_status(VerificationStatus::InvalidSignature);

        assert_eq!(plain, annotated);

        let mut set = HashSet::new();
        set.insert(plain.clone());
        assert!(!set.insert(annotated));
    }

    #[test]
    fn test_equality_covers_identity_fields() {
        let base = Signature::new(vec![1, 2], vec![3, 4]);

        assert_ne!(base, Signature::new(vec![1, 9], vec![3, 4]));
        assert_ne!(base, Signature::new(vec![1, 2], vec![3, 9]));
        assert_ne!(base, base.clone().with_algorithm(CurveAlgorithm::Secp256k1));
        assert_ne!(base, base.clone().with_signing_method(SigningMethod::Json));
        assert_ne!(base, base.clone().with_encoding(SignatureEncoding::Der));
        assert_ne!(base, base.clone().with_custom_data(CustomData::new("v")));
    }

    #[test]
    fn test_status_written_once() {
        let signature = Signature::new(vec![1], vec![2]);
        assert_eq!(signature.status(), None);

        assert!(signature.set_status(VerificationStatus::ValidSignature));
        assert!(!signature.set_status(VerificationStatus::InvalidSignature));
        assert_eq!(signature.status(), Some(VerificationStatus::ValidSignature));
        assert!(signature.to_json().get("status").is_none());
    }

    #[test]
    fn test_binary_layout() {
        let signature = Signature::new(vec![0xAA, 0xBB], vec![0x01, 0x02, 0x03]);
        assert_eq!(
            signature.to_binary().unwrap(),
            vec![0x00, 0x02, 0xAA, 0xBB, 0x00, 0x03, 0x01, 0x02, 0x03]
        );
    }

    #[test]
    fn test_binary_roundtrip_is_lossy() {
        let signature = full_signature();
        let parsed = Signature::parse_binary(&signature.to_binary().unwrap()).unwrap();

        assert_eq!(parsed.key_id(), signature.key_id());
        assert_eq!(parsed.value(), signature.value());

        // Everything else falls back to defaults
        assert_eq!(parsed.algorithm(), &CurveAlgorithm::Secp256r1);
        assert_eq!(parsed.stated_algorithm(), None);
        assert_eq!(parsed.signing_method(), None);
        assert_eq!(parsed.encoding(), None);
        assert_eq!(parsed.name(), None);
        assert_eq!(parsed.description(), None);
        assert_eq!(parsed.timestamp(), None);
        assert_eq!(parsed.custom_data(), None);
        assert_ne!(parsed, signature);
    }

    #[test]
    fn test_binary_too_short() {
        for len in 0..MIN_BINARY_LEN {
            let bytes = vec![0u8; len];
            assert_eq!(
                Signature::parse_binary(&bytes).unwrap_err(),
                FormatError::Truncated {
                    what: "signature",
                    needed: MIN_BINARY_LEN,
                    available: len
                }
            );
        }
    }

    #[test]
    fn test_binary_length_header_overruns() {
        let bytes = [0x00, 0x05, 0xAA, 0x00, 0x01];
        assert!(matches!(
            Signature::parse_binary(&bytes),
            Err(FormatError::Truncated { what: "keyId", .. })
        ));

        let bytes = [0x00, 0x01, 0xAA, 0x00, 0x09, 0x01];
        assert!(matches!(
            Signature::parse_binary(&bytes),
            Err(FormatError::Truncated { what: "value", .. })
        ));
    }

    #[test]
    fn test_binary_rejects_trailing_and_empty_fields() {
        let mut bytes = Signature::new(vec![1], vec![2]).to_binary().unwrap();
        bytes.push(0xFF);
        assert!(matches!(
            Signature::parse_binary(&bytes),
            Err(FormatError::TrailingBytes { trailing: 1, .. })
        ));

        assert!(matches!(
            Signature::parse_binary(&[0, 0, 0, 1, 7]),
            Err(FormatError::InvalidField { field: "keyId", .. })
        ));
    }

    #[test]
    fn test_binary_write_failure_leaves_buffer_untouched() {
        let signature = Signature::new(vec![1], vec![0u8; 70_000]);
        let mut out = vec![0xEE];
        assert!(signature.write_binary(&mut out).is_err());
        assert_eq!(out, vec![0xEE]);
    }

    #[test]
    fn test_read_binary_sequence() {
        let a = Signature::new(vec![1], vec![2]);
        let b = Signature::new(vec![3, 4], vec![5, 6, 7]);
        let mut bytes = a.to_binary().unwrap();
        b.write_binary(&mut bytes).unwrap();

        let mut input = bytes.as_slice();
        assert_eq!(Signature::read_binary(&mut input).unwrap(), a);
        assert_eq!(Signature::read_binary(&mut input).unwrap(), b);
        assert!(input.is_empty());
    }
}
