//! Curve dispatch for ECDSA over secp256r1 (`p256`) and secp256k1 (`k256`)
//!
//! Both curves hash the input with SHA-256 before signing. Everything above
//! this module works on byte slices and [`CurveAlgorithm`] tags; only here do
//! the concrete curve types appear.

use std::fmt;

use k256::ecdsa as k1;
use p256::ecdsa as r1;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use super::algorithm::{CurveAlgorithm, SignatureEncoding};
use crate::error::FormatError;

/// Why a signature value could not be checked or did not check out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SignatureFault {
    /// Value encoding is not one we can decode
    Unsupported,
    /// Wrong length, bad DER or out-of-range scalars
    Malformed,
    /// Well-formed but does not verify
    Mismatch,
}

// ============================================================================
// Verifying keys
// ============================================================================

/// A validated public point on a supported curve.
#[derive(Clone, PartialEq, Eq)]
pub(crate) enum VerifyingKey {
    Secp256r1(r1::VerifyingKey),
    Secp256k1(k1::VerifyingKey),
}

impl VerifyingKey {
    /// Decode a SEC1 point (compressed or uncompressed); off-curve points fail.
    pub fn from_sec1(algorithm: &CurveAlgorithm, bytes: &[u8]) -> Result<Self, FormatError> {
        match algorithm {
            CurveAlgorithm::Secp256r1 => r1::VerifyingKey::from_sec1_bytes(bytes)
                .map(VerifyingKey::Secp256r1)
                .map_err(|e| FormatError::InvalidPublicKey(format!("not a secp256r1 point: {e}"))),
            CurveAlgorithm::Secp256k1 => k1::VerifyingKey::from_sec1_bytes(bytes)
                .map(VerifyingKey::Secp256k1)
                .map_err(|e| FormatError::InvalidPublicKey(format!("not a secp256k1 point: {e}"))),
            CurveAlgorithm::Other(name) => Err(FormatError::UnknownAlgorithm(name.clone())),
        }
    }

    pub fn algorithm(&self) -> CurveAlgorithm {
        match self {
            VerifyingKey::Secp256r1(_) => CurveAlgorithm::Secp256r1,
            VerifyingKey::Secp256k1(_) => CurveAlgorithm::Secp256k1,
        }
    }

    pub fn to_sec1(&self, compress: bool) -> Vec<u8> {
        match self {
            VerifyingKey::Secp256r1(key) => key.to_encoded_point(compress).as_bytes().to_vec(),
            VerifyingKey::Secp256k1(key) => key.to_encoded_point(compress).as_bytes().to_vec(),
        }
    }

    pub fn verify(
        &self,
        message: &[u8],
        value: &[u8],
        encoding: &SignatureEncoding,
    ) -> Result<(), SignatureFault> {
        match self {
            VerifyingKey::Secp256r1(key) => verify_r1(key, message, value, encoding),
            VerifyingKey::Secp256k1(key) => verify_k1(key, message, value, encoding),
        }
    }
}

impl fmt::Debug for VerifyingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VerifyingKey({}, {})", self.algorithm(), hex::encode(self.to_sec1(true)))
    }
}

fn verify_r1(
    key: &r1::VerifyingKey,
    message: &[u8],
    value: &[u8],
    encoding: &SignatureEncoding,
) -> Result<(), SignatureFault> {
    use p256::ecdsa::signature::Verifier;

    let signature = match encoding {
        SignatureEncoding::Raw if value.len() != 64 => return Err(SignatureFault::Malformed),
        SignatureEncoding::Raw => r1::Signature::from_slice(value),
        SignatureEncoding::Der => r1::Signature::from_der(value),
        SignatureEncoding::Other(_) => return Err(SignatureFault::Unsupported),
    }
    .map_err(|_| SignatureFault::Malformed)?;

    key.verify(message, &signature)
        .map_err(|_| SignatureFault::Mismatch)
}

fn verify_k1(
    key: &k1::VerifyingKey,
    message: &[u8],
    value: &[u8],
    encoding: &SignatureEncoding,
) -> Result<(), SignatureFault> {
    use k256::ecdsa::signature::Verifier;

    let signature = match encoding {
        SignatureEncoding::Raw if value.len() != 64 => return Err(SignatureFault::Malformed),
        SignatureEncoding::Raw => k1::Signature::from_slice(value),
        SignatureEncoding::Der => k1::Signature::from_der(value),
        SignatureEncoding::Other(_) => return Err(SignatureFault::Unsupported),
    }
    .map_err(|_| SignatureFault::Malformed)?;

    key.verify(message, &signature)
        .map_err(|_| SignatureFault::Mismatch)
}

// ============================================================================
// Signing keys
// ============================================================================

/// A validated private scalar on a supported curve.
#[derive(Clone)]
pub(crate) enum SigningKey {
    Secp256r1(r1::SigningKey),
    Secp256k1(k1::SigningKey),
}

impl SigningKey {
    pub fn from_scalar(algorithm: &CurveAlgorithm, bytes: &[u8]) -> Result<Self, FormatError> {
        match algorithm {
            CurveAlgorithm::Secp256r1 => r1::SigningKey::from_slice(bytes)
                .map(SigningKey::Secp256r1)
                .map_err(|e| FormatError::InvalidPrivateKey(format!("not a secp256r1 scalar: {e}"))),
            CurveAlgorithm::Secp256k1 => k1::SigningKey::from_slice(bytes)
                .map(SigningKey::Secp256k1)
                .map_err(|e| FormatError::InvalidPrivateKey(format!("not a secp256k1 scalar: {e}"))),
            CurveAlgorithm::Other(name) => Err(FormatError::UnknownAlgorithm(name.clone())),
        }
    }

    /// Fresh key from the operating system's CSPRNG.
    pub fn generate(algorithm: &CurveAlgorithm) -> Result<Self, FormatError> {
        match algorithm {
            CurveAlgorithm::Secp256r1 => Ok(SigningKey::Secp256r1(r1::SigningKey::random(&mut OsRng))),
            CurveAlgorithm::Secp256k1 => Ok(SigningKey::Secp256k1(k1::SigningKey::random(&mut OsRng))),
            CurveAlgorithm::Other(name) => Err(FormatError::UnknownAlgorithm(name.clone())),
        }
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        match self {
            SigningKey::Secp256r1(key) => VerifyingKey::Secp256r1(*key.verifying_key()),
            SigningKey::Secp256k1(key) => VerifyingKey::Secp256k1(*key.verifying_key()),
        }
    }

    /// Big-endian scalar bytes.
    pub fn to_scalar(&self) -> Zeroizing<Vec<u8>> {
        match self {
            SigningKey::Secp256r1(key) => Zeroizing::new(key.to_bytes().to_vec()),
            SigningKey::Secp256k1(key) => Zeroizing::new(key.to_bytes().to_vec()),
        }
    }

    pub fn sign(&self, message: &[u8], encoding: &SignatureEncoding) -> Result<Vec<u8>, FormatError> {
        if let SignatureEncoding::Other(name) = encoding {
            return Err(FormatError::UnknownEncoding(name.clone()));
        }
        let der = matches!(encoding, SignatureEncoding::Der);

        Ok(match self {
            SigningKey::Secp256r1(key) => {
                use p256::ecdsa::signature::Signer;
                let signature: r1::Signature = key.sign(message);
                if der {
                    signature.to_der().as_bytes().to_vec()
                } else {
                    signature.to_bytes().to_vec()
                }
            }
            SigningKey::Secp256k1(key) => {
                use k256::ecdsa::signature::Signer;
                let signature: k1::Signature = key.sign(message);
                if der {
                    signature.to_der().as_bytes().to_vec()
                } else {
                    signature.to_bytes().to_vec()
                }
            }
        })
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SigningKey({}, ..)", self.verifying_key().algorithm())
    }
}
