//! Messages that carry signatures, and the identities that sign them

use serde_json::{Map, Value};

use crate::crypto::{KeyPair, Signature, SignatureEncoding, SigningMethod};
use crate::error::FormatError;
use crate::ocpp::{CustomData, I18NString};

/// Member holding attached signatures in a JSON payload.
pub const SIGNATURES_FIELD: &str = "signatures";

/// A protocol message that can be signed and verified.
pub trait SignableMessage {
    /// Action name used to select signing and verification rules.
    fn action(&self) -> &str;

    fn signatures(&self) -> &[Signature];

    fn add_signature(&mut self, signature: Signature);

    /// Identities this particular message asks to be signed with.
    fn sign_infos(&self) -> &[SignInfo] {
        &[]
    }

    /// JSON payload without its signatures.
    fn signable_json(&self) -> Value;

    /// Binary form without its signature section, if the message has one.
    fn signable_binary(&self) -> Option<Result<Vec<u8>, FormatError>> {
        None
    }

    fn default_signing_method(&self) -> SigningMethod {
        SigningMethod::Json
    }

    /// Exact bytes fed to the signer for `method`.
    fn canonical_bytes(&self, method: &SigningMethod) -> Result<Vec<u8>, FormatError> {
        match method {
            SigningMethod::Json => canonical_json(&self.signable_json()),
            SigningMethod::Binary => self
                .signable_binary()
                .unwrap_or_else(|| Err(FormatError::UnsupportedSigningMethod("binary".into()))),
            SigningMethod::Other(name) => Err(FormatError::UnsupportedSigningMethod(name.clone())),
        }
    }
}

/// Compact JSON with object keys in lexicographic order at every level and
/// the top-level `signatures` member removed.
pub fn canonical_json(payload: &Value) -> Result<Vec<u8>, FormatError> {
    let stripped = match payload {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(key, _)| key.as_str() != SIGNATURES_FIELD)
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        ),
        other => other.clone(),
    };
    Ok(serde_json::to_vec(&sorted(stripped))?)
}

fn sorted(value: Value) -> Value {
    match value {
        Value::Object(obj) => {
            let mut entries: Vec<(String, Value)> = obj.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            let mut out = Map::new();
            for (key, value) in entries {
                out.insert(key, sorted(value));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted).collect()),
        other => other,
    }
}

/// One signing identity: the key pair plus how its signatures are annotated.
#[derive(Debug, Clone)]
pub struct SignInfo {
    pub key_pair: KeyPair,
    pub name: Option<String>,
    pub description: Option<I18NString>,
    pub custom_data: Option<CustomData>,
    /// Stamp each signature with the current time
    pub include_timestamp: bool,
    /// `None` uses the message's default method
    pub signing_method: Option<SigningMethod>,
    pub encoding: SignatureEncoding,
    /// Truncate the key id to this many leading bytes
    pub key_id_len: Option<usize>,
}

impl SignInfo {
    pub fn new(key_pair: KeyPair) -> Self {
        Self {
            key_pair,
            name: None,
            description: None,
            custom_data: None,
            include_timestamp: false,
            signing_method: None,
            encoding: SignatureEncoding::default(),
            key_id_len: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: I18NString) -> Self {
        self.description = Some(description);
        self
    }

    pub fn with_custom_data(mut self, custom_data: CustomData) -> Self {
        self.custom_data = Some(custom_data);
        self
    }

    pub fn with_timestamp(mut self) -> Self {
        self.include_timestamp = true;
        self
    }

    pub fn with_signing_method(mut self, method: SigningMethod) -> Self {
        self.signing_method = Some(method);
        self
    }

    pub fn with_encoding(mut self, encoding: SignatureEncoding) -> Self {
        self.encoding = encoding;
        self
    }

    pub fn with_key_id_len(mut self, len: usize) -> Self {
        self.key_id_len = Some(len);
        self
    }

    /// Key id written into signatures made with this identity.
    pub fn key_id(&self) -> &[u8] {
        let full = self.key_pair.key_id();
        match self.key_id_len {
            Some(len) if len > 0 && len < full.len() => &full[..len],
            _ => full,
        }
    }
}
