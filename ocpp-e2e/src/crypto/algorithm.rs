//! Algorithm and format identifiers shared by key pairs, public keys and signatures
//!
//! All names compare case-insensitively on input and are written back in their
//! canonical lower-case spelling.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::encoding;
use crate::error::FormatError;

/// Curve used when none is given, for keys and signatures alike.
pub const DEFAULT_ALGORITHM: CurveAlgorithm = CurveAlgorithm::Secp256r1;

/// Public key serialization used when none is given.
pub const DEFAULT_SERIALIZATION: KeySerialization = KeySerialization::Raw;

/// Text encoding of key material used when none is given.
pub const DEFAULT_ENCODING: KeyEncoding = KeyEncoding::Base64;

// ============================================================================
// Curve
// ============================================================================

/// Named elliptic curve.
///
/// Unrecognized names are kept verbatim so that a signature naming an exotic
/// curve can still be parsed and reported as `UnknownSignatureAlgorithm`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CurveAlgorithm {
    Secp256r1,
    Secp256k1,
    Other(String),
}

impl CurveAlgorithm {
    pub fn as_str(&self) -> &str {
        match self {
            CurveAlgorithm::Secp256r1 => "secp256r1",
            CurveAlgorithm::Secp256k1 => "secp256k1",
            CurveAlgorithm::Other(name) => name,
        }
    }

    pub fn is_default(&self) -> bool {
        *self == DEFAULT_ALGORITHM
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, CurveAlgorithm::Other(_))
    }

    /// Length of a fixed-size `r || s` signature on this curve.
    pub fn raw_signature_len(&self) -> Option<usize> {
        match self {
            CurveAlgorithm::Secp256r1 | CurveAlgorithm::Secp256k1 => Some(64),
            CurveAlgorithm::Other(_) => None,
        }
    }
}

impl Default for CurveAlgorithm {
    fn default() -> Self {
        DEFAULT_ALGORITHM
    }
}

impl From<&str> for CurveAlgorithm {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "secp256r1" | "prime256v1" | "p-256" => CurveAlgorithm::Secp256r1,
            "secp256k1" => CurveAlgorithm::Secp256k1,
            _ => CurveAlgorithm::Other(s.to_string()),
        }
    }
}

impl From<String> for CurveAlgorithm {
    fn from(s: String) -> Self {
        CurveAlgorithm::from(s.as_str())
    }
}

impl From<CurveAlgorithm> for String {
    fn from(a: CurveAlgorithm) -> Self {
        a.as_str().to_string()
    }
}

impl fmt::Display for CurveAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Key serialization / encoding
// ============================================================================

/// How a public point is laid out before text encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeySerialization {
    /// Uncompressed SEC1 point (`0x04 || x || y`)
    #[default]
    Raw,
    /// Compressed SEC1 point (`0x02|0x03 || x`)
    Compressed,
}

impl KeySerialization {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeySerialization::Raw => "raw",
            KeySerialization::Compressed => "compressed",
        }
    }

    pub fn is_compressed(&self) -> bool {
        matches!(self, KeySerialization::Compressed)
    }

    /// Serialization of a SEC1 point, read from its tag byte.
    pub fn of_sec1(point: &[u8]) -> Self {
        match point.first() {
            Some(0x02) | Some(0x03) => KeySerialization::Compressed,
            _ => KeySerialization::Raw,
        }
    }

    /// Fails when `self` does not describe the SEC1 point in `point`.
    pub(crate) fn check(self, field: &'static str, point: &[u8]) -> Result<(), FormatError> {
        let actual = Self::of_sec1(point);
        if actual == self {
            return Ok(());
        }
        Err(FormatError::invalid(
            field,
            format!("is a {} point but serialization says {}", actual, self),
        ))
    }
}

impl FromStr for KeySerialization {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(KeySerialization::Raw),
            "compressed" => Ok(KeySerialization::Compressed),
            _ => Err(FormatError::UnknownSerialization(s.to_string())),
        }
    }
}

impl TryFrom<String> for KeySerialization {
    type Error = FormatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeySerialization> for String {
    fn from(s: KeySerialization) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for KeySerialization {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Text encoding of key bytes inside JSON documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum KeyEncoding {
    #[default]
    Base64,
    Hex,
}

impl KeyEncoding {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyEncoding::Base64 => "base64",
            KeyEncoding::Hex => "hex",
        }
    }

    pub fn encode(&self, bytes: &[u8]) -> String {
        match self {
            KeyEncoding::Base64 => encoding::encode_base64(bytes),
            KeyEncoding::Hex => hex::encode(bytes),
        }
    }

    pub fn decode(&self, field: &'static str, text: &str) -> Result<Vec<u8>, FormatError> {
        match self {
            KeyEncoding::Base64 => encoding::decode_base64(field, text),
            KeyEncoding::Hex => hex::decode(text.trim())
                .map_err(|e| FormatError::invalid(field, format!("is not valid hex: {e}"))),
        }
    }
}

impl FromStr for KeyEncoding {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(KeyEncoding::Base64),
            "hex" => Ok(KeyEncoding::Hex),
            _ => Err(FormatError::UnknownEncoding(s.to_string())),
        }
    }
}

impl TryFrom<String> for KeyEncoding {
    type Error = FormatError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<KeyEncoding> for String {
    fn from(e: KeyEncoding) -> Self {
        e.as_str().to_string()
    }
}

impl fmt::Display for KeyEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Signature metadata
// ============================================================================

/// Which canonical representation of a message was fed to the signer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SigningMethod {
    /// Canonical JSON of the payload without its `signatures` member
    #[default]
    Json,
    /// The message's binary form without its signature section
    Binary,
    Other(String),
}

impl SigningMethod {
    pub fn as_str(&self) -> &str {
        match self {
            SigningMethod::Json => "json",
            SigningMethod::Binary => "binary",
            SigningMethod::Other(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, SigningMethod::Other(_))
    }
}

impl From<&str> for SigningMethod {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => SigningMethod::Json,
            "binary" => SigningMethod::Binary,
            _ => SigningMethod::Other(s.to_string()),
        }
    }
}

impl From<String> for SigningMethod {
    fn from(s: String) -> Self {
        SigningMethod::from(s.as_str())
    }
}

impl From<SigningMethod> for String {
    fn from(m: SigningMethod) -> Self {
        m.as_str().to_string()
    }
}

impl fmt::Display for SigningMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Byte layout of a signature value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum SignatureEncoding {
    /// Fixed-size big-endian `r || s`
    #[default]
    Raw,
    /// ASN.1 DER `SEQUENCE { r INTEGER, s INTEGER }`
    Der,
    Other(String),
}

impl SignatureEncoding {
    pub fn as_str(&self) -> &str {
        match self {
            SignatureEncoding::Raw => "raw",
            SignatureEncoding::Der => "der",
            SignatureEncoding::Other(name) => name,
        }
    }

    pub fn is_supported(&self) -> bool {
        !matches!(self, SignatureEncoding::Other(_))
    }
}

impl From<&str> for SignatureEncoding {
    fn from(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => SignatureEncoding::Raw,
            "der" => SignatureEncoding::Der,
            _ => SignatureEncoding::Other(s.to_string()),
        }
    }
}

impl From<String> for SignatureEncoding {
    fn from(s: String) -> Self {
        SignatureEncoding::from(s.as_str())
    }
}

impl From<SignatureEncoding> for String {
    fn from(e: SignatureEncoding) -> Self {
        e.as_str().to_string()
    }
}

impl fmt::Display for SignatureEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
