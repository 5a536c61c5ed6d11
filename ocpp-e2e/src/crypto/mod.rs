//! Elliptic-curve key material and signatures
//!
//! - `algorithm`: curve names and metadata enums, with their defaults
//! - `curve`: ECDSA over secp256r1 and secp256k1
//! - `encoding`: text and binary field codecs
//! - `key_pair`, `public_key`, `signature`: the wire-level value objects

pub mod algorithm;
pub(crate) mod curve;
pub(crate) mod encoding;
pub mod key_pair;
pub mod public_key;
pub mod signature;

pub use algorithm::{
    CurveAlgorithm, KeyEncoding, KeySerialization, SignatureEncoding, SigningMethod,
    DEFAULT_ALGORITHM, DEFAULT_ENCODING, DEFAULT_SERIALIZATION,
};
pub use encoding::{decode_base64, encode_base64};
pub use key_pair::KeyPair;
pub use public_key::PublicKey;
pub use signature::Signature;
