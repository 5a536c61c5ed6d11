//! Standalone public keys, for parties that only verify

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::algorithm::{CurveAlgorithm, KeyEncoding, KeySerialization, DEFAULT_ALGORITHM};
use super::curve::VerifyingKey;
use super::encoding::{as_object, optional_str, required_str};
use crate::error::FormatError;
use crate::ocpp::CustomData;

/// A validated public key: `{ "value": "...", "algorithm"?, "serialization"?, "encoding"? }`.
#[derive(Clone)]
pub struct PublicKey {
    value: Vec<u8>,
    algorithm: CurveAlgorithm,
    serialization: KeySerialization,
    encoding: KeyEncoding,
    custom_data: Option<CustomData>,
    verifying: VerifyingKey,
}

impl PublicKey {
    /// Validate a SEC1 point; its serialization is read from the tag byte.
    pub fn new(value: &[u8], algorithm: CurveAlgorithm) -> Result<Self, FormatError> {
        let verifying = VerifyingKey::from_sec1(&algorithm, value)?;
        Ok(Self {
            value: value.to_vec(),
            algorithm,
            serialization: KeySerialization::of_sec1(value),
            encoding: KeyEncoding::default(),
            custom_data: None,
            verifying,
        })
    }

    pub(crate) fn from_verifying_key(
        value: Vec<u8>,
        verifying: VerifyingKey,
        serialization: KeySerialization,
        encoding: KeyEncoding,
    ) -> Self {
        Self {
            value,
            algorithm: verifying.algorithm(),
            serialization,
            encoding,
            custom_data: None,
            verifying,
        }
    }

    pub fn with_encoding(mut self, encoding: KeyEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    pub fn parse(json: &Value) -> Result<Self, FormatError> {
        let obj = as_object(json, "public key")?;

        let algorithm = optional_str(obj, "algorithm")?
            .map(CurveAlgorithm::from)
            .unwrap_or(DEFAULT_ALGORITHM);
        let serialization = match optional_str(obj, "serialization")? {
            Some(s) => s.parse()?,
            None => KeySerialization::default(),
        };
        let encoding: KeyEncoding = match optional_str(obj, "encoding")? {
            Some(s) => s.parse()?,
            None => KeyEncoding::default(),
        };
        let value = encoding.decode("value", required_str(obj, "value")?)?;

        let mut key = Self::new(&value, algorithm)?.with_encoding(encoding);
        serialization.check("value", &value)?;

        if let Some(cd) = obj.get("customData").filter(|cd| !cd.is_null()) {
            key.custom_data = Some(
                serde_json::from_value(cd.clone())
                    .map_err(|e| FormatError::invalid("customData", e.to_string()))?,
            );
        }
        Ok(key)
    }

    pub fn parse_str(text: &str) -> Result<Self, FormatError> {
        Self::parse(&serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("value".into(), Value::String(self.encoding.encode(&self.value)));
        if !self.algorithm.is_default() {
            obj.insert("algorithm".into(), Value::String(self.algorithm.to_string()));
        }
        if self.serialization != KeySerialization::default() {
            obj.insert("serialization".into(), Value::String(self.serialization.to_string()));
        }
        if self.encoding != KeyEncoding::default() {
            obj.insert("encoding".into(), Value::String(self.encoding.to_string()));
        }
        if let Some(cd) = &self.custom_data {
            obj.insert("customData".into(), cd.to_json());
        }
        Value::Object(obj)
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn algorithm(&self) -> &CurveAlgorithm {
        &self.algorithm
    }

    pub fn serialization(&self) -> KeySerialization {
        self.serialization
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }

    pub fn custom_data(&self) -> Option<&CustomData> {
        self.custom_data.as_ref()
    }

    /// True if `key_id` is a non-empty prefix of this key in any SEC1 form.
    pub fn matches_key_id(&self, key_id: &[u8]) -> bool {
        if key_id.is_empty() {
            return false;
        }
        self.value.starts_with(key_id)
            || self.verifying.to_sec1(false).starts_with(key_id)
            || self.verifying.to_sec1(true).starts_with(key_id)
    }

    /// Short hex tag for log lines.
    pub fn short_id(&self) -> String {
        let point = self.verifying.to_sec1(true);
        hex::encode(&point[..point.len().min(9)])
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }
}

impl PartialEq for PublicKey {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
            && self.algorithm == other.algorithm
            && self.serialization == other.serialization
            && self.encoding == other.encoding
            && self.custom_data == other.custom_data
    }
}

impl Eq for PublicKey {}

impl Hash for PublicKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
        self.algorithm.hash(state);
        self.serialization.hash(state);
        self.encoding.hash(state);
        self.custom_data.hash(state);
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("value", &hex::encode(&self.value))
            .field("algorithm", &self.algorithm)
            .field("serialization", &self.serialization)
            .field("encoding", &self.encoding)
            .finish()
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        PublicKey::parse(&value).map_err(serde::de::Error::custom)
    }
}
