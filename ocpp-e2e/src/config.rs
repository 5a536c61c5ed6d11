//! Policy configuration
//!
//! A JSON document describing signing identities, verification rules and
//! trusted keys, turned into a [`SignaturePolicy`] by [`PolicyConfig::build`].
//!
//! ```json
//! {
//!   "signing": [
//!     { "action": "*", "keyPair": { "public": "...", "private": "..." },
//!       "name": "CSMS", "timestamp": true, "keyIdLength": 16 }
//!   ],
//!   "verification": [
//!     { "action": "BootNotification", "requireSignatures": true, "onFailure": "reject" }
//!   ],
//!   "trustedKeys": [
//!     { "publicKey": { "value": "..." }, "actions": ["BootNotification"] }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::crypto::{KeyPair, PublicKey, SignatureEncoding, SigningMethod};
use crate::ocpp::I18NString;
use crate::security::{FailureDisposition, SignInfo, SignaturePolicy, VerificationRule};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid policy document: {0}")]
    Json(#[from] serde_json::Error),
}

/// Complete policy configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConfig {
    pub signing: Vec<SigningConfig>,
    pub verification: Vec<VerificationConfig>,
    pub trusted_keys: Vec<TrustedKeyConfig>,
}

/// One signing identity for an action (`"*"` for all)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningConfig {
    pub action: String,
    pub key_pair: KeyPair,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<I18NString>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_method: Option<SigningMethod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding_method: Option<SignatureEncoding>,
    #[serde(default)]
    pub timestamp: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_id_length: Option<usize>,
}

impl SigningConfig {
    pub fn new(action: impl Into<String>, key_pair: KeyPair) -> Self {
        Self {
            action: action.into(),
            key_pair,
            name: None,
            description: None,
            signing_method: None,
            encoding_method: None,
            timestamp: false,
            key_id_length: None,
        }
    }

    fn sign_info(&self) -> SignInfo {
        let mut info = SignInfo::new(self.key_pair.clone());
        info.name = self.name.clone();
        info.description = self.description.clone();
        info.include_timestamp = self.timestamp;
        info.signing_method = self.signing_method.clone();
        info.key_id_len = self.key_id_length;
        if let Some(encoding) = &self.encoding_method {
            info.encoding = encoding.clone();
        }
        info
    }
}

/// Verification rule for an action (`"*"` replaces the default)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationConfig {
    pub action: String,
    #[serde(default)]
    pub require_signatures: bool,
    #[serde(default)]
    pub on_failure: FailureDisposition,
}

/// A trusted public key; empty `actions` trusts it for every action
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustedKeyConfig {
    pub public_key: PublicKey,
    #[serde(default)]
    pub actions: Vec<String>,
}

impl PolicyConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&text)?;
        info!(
            "Loaded policy {}: {} signer(s), {} rule(s), {} trusted key(s)",
            path.display(),
            config.signing.len(),
            config.verification.len(),
            config.trusted_keys.len()
        );
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Add a signing identity
    pub fn with_signer(mut self, signer: SigningConfig) -> Self {
        self.signing.push(signer);
        self
    }

    /// Add a verification rule
    pub fn with_rule(
        mut self,
        action: impl Into<String>,
        require_signatures: bool,
        on_failure: FailureDisposition,
    ) -> Self {
        self.verification.push(VerificationConfig {
            action: action.into(),
            require_signatures,
            on_failure,
        });
        self
    }

    /// Trust a public key for `actions` (empty = all)
    pub fn with_trusted_key(mut self, public_key: PublicKey, actions: Vec<String>) -> Self {
        self.trusted_keys.push(TrustedKeyConfig { public_key, actions });
        self
    }

    /// Build the policy. Later rules for the same action win.
    pub fn build(&self) -> SignaturePolicy {
        let mut policy = SignaturePolicy::new();
        for signer in &self.signing {
            policy = policy.with_signer(signer.action.clone(), signer.sign_info());
        }
        for rule in &self.verification {
            let mut built = VerificationRule::new(rule.action.clone()).on_failure(rule.on_failure);
            built.require_signatures = rule.require_signatures;
            policy = policy.with_verification_rule(built);
        }
        for key in &self.trusted_keys {
            policy = policy.with_trusted_key(key.public_key.clone(), key.actions.iter().cloned());
        }
        policy
    }
}
