//! Compact binary DataTransfer for constrained links
//!
//! Layout (big-endian):
//!
//! ```text
//! u16 vendorIdLength  | vendorId (UTF-8)
//! u16 messageIdLength | messageId (UTF-8, empty = none)
//! u32 dataLength      | data
//! [ u16 signatureCount | signatureCount x binary signature ]
//! ```
//!
//! The signature section is optional. Signatures are signed over everything
//! before it, and use the binary signature form, so only key id and value
//! survive the trip.

use serde_json::{json, Value};

use crate::crypto::encoding::{
    put_u16_prefixed, put_u32_prefixed, take_u16, take_u16_prefixed, take_u32_prefixed,
};
use crate::crypto::{encode_base64, Signature, SigningMethod};
use crate::error::FormatError;
use crate::security::{SignInfo, SignableMessage};

#[derive(Debug, Clone, Default)]
pub struct BinaryDataTransferRequest {
    pub vendor_id: String,
    pub message_id: Option<String>,
    pub data: Vec<u8>,
    pub signatures: Vec<Signature>,
    pub sign_infos: Vec<SignInfo>,
}

impl BinaryDataTransferRequest {
    pub const ACTION: &'static str = "BinaryDataTransfer";

    pub fn new(vendor_id: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            vendor_id: vendor_id.into(),
            data: data.into(),
            ..Default::default()
        }
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_sign_info(mut self, info: SignInfo) -> Self {
        self.sign_infos.push(info);
        self
    }

    /// Header and data, without the signature section.
    pub fn to_binary_unsigned(&self) -> Result<Vec<u8>, FormatError> {
        let mut out = Vec::with_capacity(8 + self.vendor_id.len() + self.data.len());
        put_u16_prefixed(&mut out, "vendorId", self.vendor_id.as_bytes())?;
        put_u16_prefixed(
            &mut out,
            "messageId",
            self.message_id.as_deref().unwrap_or("").as_bytes(),
        )?;
        put_u32_prefixed(&mut out, "data", &self.data)?;
        Ok(out)
    }

    /// Full frame; the signature section is written only when signatures exist.
    pub fn to_binary(&self) -> Result<Vec<u8>, FormatError> {
        let mut out = self.to_binary_unsigned()?;
        if self.signatures.is_empty() {
            return Ok(out);
        }
        let count = u16::try_from(self.signatures.len()).map_err(|_| FormatError::TooLong {
            field: "signatures",
            len: self.signatures.len(),
            max: u16::MAX as usize,
        })?;
        out.extend_from_slice(&count.to_be_bytes());
        for signature in &self.signatures {
            signature.write_binary(&mut out)?;
        }
        Ok(out)
    }

    pub fn parse_binary(bytes: &[u8]) -> Result<Self, FormatError> {
        let mut input = bytes;

        let vendor_id = utf8("vendorId", take_u16_prefixed(&mut input, "vendorId")?)?;
        if vendor_id.is_empty() {
            return Err(FormatError::invalid("vendorId", "must not be empty"));
        }
        let message_id = utf8("messageId", take_u16_prefixed(&mut input, "messageId")?)?;
        let data = take_u32_prefixed(&mut input, "data")?;

        let mut signatures = Vec::new();
        if !input.is_empty() {
            let count = take_u16(&mut input, "signatureCount")?;
            signatures.reserve(count as usize);
            for _ in 0..count {
                signatures.push(Signature::read_binary(&mut input)?);
            }
            if !input.is_empty() {
                return Err(FormatError::TrailingBytes {
                    what: "binary data transfer",
                    trailing: input.len(),
                });
            }
        }

        Ok(Self {
            vendor_id,
            message_id: (!message_id.is_empty()).then_some(message_id),
            data,
            signatures,
            sign_infos: Vec::new(),
        })
    }
}

fn utf8(field: &'static str, bytes: Vec<u8>) -> Result<String, FormatError> {
    String::from_utf8(bytes).map_err(|_| FormatError::invalid(field, "is not valid UTF-8"))
}

impl SignableMessage for BinaryDataTransferRequest {
    fn action(&self) -> &str {
        Self::ACTION
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
        let mut value = json!({
            "vendorId": self.vendor_id,
            "data": encode_base64(&self.data),
        });
        if let Some(message_id) = &self.message_id {
            value["messageId"] = Value::String(message_id.clone());
        }
        value
    }

    fn signable_binary(&self) -> Option<Result<Vec<u8>, FormatError>> {
        Some(self.to_binary_unsigned())
    }

    fn default_signing_method(&self) -> SigningMethod {
        SigningMethod::Binary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CurveAlgorithm, KeyPair};
    use crate::security::{SignaturePolicy, VerificationRule, VerificationStatus, ANY_ACTION};

    #[test]
    fn test_layout() {
        let request = BinaryDataTransferRequest::new("ek", vec![0xDE, 0xAD]).with_message_id("m");
        assert_eq!(
            request.to_binary().unwrap(),
            vec![0, 2, b'e', b'k', 0, 1, b'm', 0, 0, 0, 2, 0xDE, 0xAD]
        );
    }

    #[test]
    fn test_unsigned_roundtrip() {
        let request = BinaryDataTransferRequest::new("com.example", b"meter:42".to_vec());
        let parsed = BinaryDataTransferRequest::parse_binary(&request.to_binary().unwrap()).unwrap();

        assert_eq!(parsed.vendor_id, "com.example");
        assert_eq!(parsed.message_id, None);
        assert_eq!(parsed.data, b"meter:42");
        assert!(parsed.signatures.is_empty());
    }

    #[test]
    fn test_signed_over_the_wire() {
        let key_pair = KeyPair::generate(&CurveAlgorithm::Secp256r1).unwrap();
        let policy = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(key_pair.clone()).with_key_id_len(16))
            .with_trusted_key(key_pair.public_key(), [BinaryDataTransferRequest::ACTION])
            .with_verification_rule(VerificationRule::new(ANY_ACTION).required());

        let mut request = BinaryDataTransferRequest::new("com.example", vec![7u8; 300])
            .with_message_id("firmware-chunk");
        policy.sign_message(&mut request).unwrap();
        assert_eq!(request.signatures[0].signing_method(), Some(&SigningMethod::Binary));

        let received = BinaryDataTransferRequest::parse_binary(&request.to_binary().unwrap()).unwrap();
        assert_eq!(received.signatures.len(), 1);
        assert_eq!(received.signatures[0].signing_method(), None);
        assert_eq!(policy.verify_message(&received), VerificationStatus::ValidSignature);

        let mut tampered = received.clone();
        tampered.signatures = received
            .signatures
            .iter()
            .map(|s| Signature::new(s.key_id().to_vec(), s.value().to_vec()))
            .collect();
        tampered.data[0] = 8;
        assert_eq!(policy.verify_message(&tampered), VerificationStatus::InvalidSignature);
    }

    #[test]
    fn test_secp256k1_signed_over_the_wire() {
        let key_pair = KeyPair::generate(&CurveAlgorithm::Secp256k1).unwrap();
        let other = KeyPair::generate(&CurveAlgorithm::Secp256r1).unwrap();
        let policy = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(key_pair.clone()))
            .with_trusted_key(other.public_key(), Vec::<String>::new())
            .with_trusted_key(key_pair.public_key(), [BinaryDataTransferRequest::ACTION])
            .with_verification_rule(VerificationRule::new(ANY_ACTION).required());

        let mut request = BinaryDataTransferRequest::new("com.example", b"meter:42".to_vec());
        policy.sign_message(&mut request).unwrap();
        assert_eq!(request.signatures[0].algorithm(), &CurveAlgorithm::Secp256k1);

        let received = BinaryDataTransferRequest::parse_binary(&request.to_binary().unwrap()).unwrap();
        assert_eq!(received.signatures[0].stated_algorithm(), None);
        assert_eq!(policy.verify_message(&received), VerificationStatus::ValidSignature);
    }

    #[test]
    fn test_json_signing_method_also_works() {
        let key_pair = KeyPair::generate(&CurveAlgorithm::Secp256k1).unwrap();
        let policy = SignaturePolicy::new()
            .with_signer(
                ANY_ACTION,
                SignInfo::new(key_pair.clone()).with_signing_method(SigningMethod::Json),
            )
            .with_trusted_key(key_pair.public_key(), Vec::<String>::new());

        let mut request = BinaryDataTransferRequest::new("v", vec![1, 2, 3]);
        policy.sign_message(&mut request).unwrap();
        assert_eq!(policy.verify_message(&request), VerificationStatus::ValidSignature);
    }

    #[test]
    fn test_truncated_and_trailing() {
        let request = BinaryDataTransferRequest::new("v", vec![1, 2, 3]);
        let bytes = request.to_binary().unwrap();

        assert!(matches!(
            BinaryDataTransferRequest::parse_binary(&bytes[..bytes.len() - 1]),
            Err(FormatError::Truncated { what: "data", .. })
        ));

        // A lone count byte cannot hold the u16 signature count
        let mut odd = bytes.clone();
        odd.push(0);
        assert!(matches!(
            BinaryDataTransferRequest::parse_binary(&odd),
            Err(FormatError::Truncated { what: "signatureCount", .. })
        ));

        let mut extra = bytes;
        extra.extend_from_slice(&[0, 0, 0xFF]);
        assert!(matches!(
            BinaryDataTransferRequest::parse_binary(&extra),
            Err(FormatError::TrailingBytes { trailing: 1, .. })
        ));
    }

    #[test]
    fn test_invalid_vendor_id() {
        assert!(matches!(
            BinaryDataTransferRequest::parse_binary(&[0, 0, 0, 0, 0, 0, 0, 0]),
            Err(FormatError::InvalidField { field: "vendorId", .. })
        ));
        assert!(matches!(
            BinaryDataTransferRequest::parse_binary(&[0, 1, 0xFF, 0, 0, 0, 0, 0, 0]),
            Err(FormatError::InvalidField { field: "vendorId", .. })
        ));
    }
}
