//! Elliptic curve key pairs
//!
//! A [`KeyPair`] keeps the exact bytes it was built from alongside the decoded
//! curve keys. Equality, hashing and JSON output work on the bytes; signing
//! and verification use the decoded keys.
//!
//! JSON shape:
//!
//! ```text
//! { "public": "...", "private": "...", "algorithm": "secp256k1",
//!   "serialization": "compressed", "encoding": "hex", "customData": {...} }
//! ```
//!
//! `algorithm`, `serialization` and `encoding` are written only when they
//! differ from their defaults. `private` is optional on input.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::info;
use zeroize::Zeroizing;

use super::algorithm::{
    CurveAlgorithm, KeyEncoding, KeySerialization, SignatureEncoding, DEFAULT_ALGORITHM,
};
use super::curve::{SigningKey, VerifyingKey};
use super::encoding::{as_object, optional_str, required_str};
use super::public_key::PublicKey;
use crate::error::FormatError;
use crate::ocpp::CustomData;

/// Public key, optional private key and their format metadata.
#[derive(Clone)]
pub struct KeyPair {
    public: Vec<u8>,
    private: Option<Zeroizing<Vec<u8>>>,
    algorithm: CurveAlgorithm,
    serialization: KeySerialization,
    encoding: KeyEncoding,
    custom_data: Option<CustomData>,
    verifying: VerifyingKey,
    signing: Option<SigningKey>,
}

impl KeyPair {
    /// Build a key pair from raw bytes.
    ///
    /// `public` must be a point on `algorithm`'s curve, laid out as
    /// `serialization` says. An empty or absent
    /// `private` means "public key only"; otherwise it must be a valid scalar
    /// whose public point is `public`.
    pub fn new(
        public: &[u8],
        private: Option<&[u8]>,
        algorithm: CurveAlgorithm,
        serialization: KeySerialization,
        encoding: KeyEncoding,
    ) -> Result<Self, FormatError> {
        if let CurveAlgorithm::Other(name) = &algorithm {
            return Err(FormatError::UnknownAlgorithm(name.clone()));
        }

        let verifying = VerifyingKey::from_sec1(&algorithm, public)?;
        serialization.check("public", public)?;

        let private = private.filter(|bytes| !bytes.is_empty());
        let signing = match private {
            Some(bytes) => {
                let signing = SigningKey::from_scalar(&algorithm, bytes)?;
                if signing.verifying_key() != verifying {
                    return Err(FormatError::KeyMismatch);
                }
                Some(signing)
            }
            None => None,
        };

        Ok(Self {
            public: public.to_vec(),
            private: private.map(|bytes| Zeroizing::new(bytes.to_vec())),
            algorithm,
            serialization,
            encoding,
            custom_data: None,
            verifying,
            signing,
        })
    }

    /// Public-key-only pair with default metadata.
    pub fn from_public(public: &[u8], algorithm: CurveAlgorithm) -> Result<Self, FormatError> {
        Self::new(public, None, algorithm, KeySerialization::default(), KeyEncoding::default())
    }

    /// Generate a fresh key pair on the named curve.
    pub fn generate(algorithm: &CurveAlgorithm) -> Result<Self, FormatError> {
        Self::generate_with(algorithm, KeySerialization::default(), KeyEncoding::default())
    }

    /// Generate with explicit public key serialization and text encoding.
    pub fn generate_with(
        algorithm: &CurveAlgorithm,
        serialization: KeySerialization,
        encoding: KeyEncoding,
    ) -> Result<Self, FormatError> {
        let signing = SigningKey::generate(algorithm)?;
        let verifying = signing.verifying_key();
        let public = verifying.to_sec1(serialization.is_compressed());

        info!("Generated {} key pair", algorithm);

        Ok(Self {
            public,
            private: Some(signing.to_scalar()),
            algorithm: algorithm.clone(),
            serialization,
            encoding,
            custom_data: None,
            verifying,
            signing: Some(signing),
        })
    }

    /// Attach vendor extension data
    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    // ------------------------------------------------------------------------
    // JSON
    // ------------------------------------------------------------------------

    pub fn parse(json: &Value) -> Result<Self, FormatError> {
        let obj = as_object(json, "key pair")?;

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

        let public = encoding.decode("public", required_str(obj, "public")?)?;
        let private = match optional_str(obj, "private")? {
            Some(text) => Some(Zeroizing::new(encoding.decode("private", text)?)),
            None => None,
        };

        let key_pair = Self::new(
            &public,
            private.as_deref().map(Vec::as_slice),
            algorithm,
            serialization,
            encoding,
        )?;

        match obj.get("customData") {
            Some(cd) if !cd.is_null() => Ok(key_pair.with_custom_data(
                serde_json::from_value(cd.clone())
                    .map_err(|e| FormatError::invalid("customData", e.to_string()))?,
            )),
            _ => Ok(key_pair),
        }
    }

    pub fn parse_str(text: &str) -> Result<Self, FormatError> {
        Self::parse(&serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Value {
        let mut obj = Map::new();
        obj.insert("public".into(), Value::String(self.encoding.encode(&self.public)));
        if let Some(private) = &self.private {
            obj.insert("private".into(), Value::String(self.encoding.encode(private)));
        }
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

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    pub fn public_bytes(&self) -> &[u8] {
        &self.public
    }

    pub fn private_bytes(&self) -> Option<&[u8]> {
        self.private.as_deref().map(Vec::as_slice)
    }

    pub fn has_private_key(&self) -> bool {
        self.signing.is_some()
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

    /// Identifier placed in signatures made with this key: the public key bytes.
    pub fn key_id(&self) -> &[u8] {
        &self.public
    }

    /// The public half as a standalone value object.
    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_verifying_key(
            self.public.clone(),
            self.verifying.clone(),
            self.serialization,
            self.encoding,
        )
    }

    /// Sign `message` with the private key, if there is one.
    pub fn sign(
        &self,
        message: &[u8],
        encoding: &SignatureEncoding,
    ) -> Option<Result<Vec<u8>, FormatError>> {
        self.signing.as_ref().map(|key| key.sign(message, encoding))
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying
    }
}

impl PartialEq for KeyPair {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
            && self.private_bytes() == other.private_bytes()
            && self.algorithm == other.algorithm
            && self.serialization == other.serialization
            && self.encoding == other.encoding
            && self.custom_data == other.custom_data
    }
}

impl Eq for KeyPair {}

impl Hash for KeyPair {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.public.hash(state);
        self.private_bytes().hash(state);
        self.algorithm.hash(state);
        self.serialization.hash(state);
        self.encoding.hash(state);
        self.custom_data.hash(state);
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("public", &hex::encode(&self.public))
            .field("private", &self.private.as_ref().map(|_| "<redacted>"))
            .field("algorithm", &self.algorithm)
            .field("serialization", &self.serialization)
            .field("encoding", &self.encoding)
            .field("custom_data", &self.custom_data)
            .finish()
    }
}

impl Serialize for KeyPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for KeyPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        KeyPair::parse(&value).map_err(serde::de::Error::custom)
    }
}
