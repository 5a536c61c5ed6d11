//! Signature policy: who signs outgoing messages, and how incoming
//! signatures are judged.
//!
//! Verification checks each attached signature in this order and stops at
//! the first failure:
//!
//! 1. algorithm, signing method and value encoding are known
//!    (`UnknownSignatureAlgorithm`)
//! 2. a trusted key matches the key id (`UnknownSigner`), on the signature's
//!    curve when it names one and on any curve otherwise
//! 3. the value is well formed for its encoding (`BrokenSignature`)
//! 4. the value verifies over the canonical bytes (`InvalidSignature`)
//! 5. the signer is authorized for the action (`InvalidSigner`)
//!
//! The message status is the most severe per-signature status, or
//! `NoSignaturesFound` when a rule requires signatures and there are none.
//! When that is not `ValidSignature` the matching rule's
//! [`FailureDisposition`] decides whether it is reported as is or escalated
//! to `RejectMessage` or `DropMessage`.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::signable::{SignInfo, SignableMessage};
use super::status::VerificationStatus;
use super::trust_store::{TrustStore, TrustedKey};
use crate::crypto::curve::SignatureFault;
use crate::crypto::{PublicKey, Signature, SigningMethod};
use crate::error::{FormatError, SigningError};

/// Matches every action.
pub const ANY_ACTION: &str = "*";

/// What to do with a message whose signatures do not all verify.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureDisposition {
    /// Surface the per-signature status
    #[default]
    Report,
    Reject,
    Drop,
}

#[derive(Debug, Clone)]
pub struct SigningRule {
    pub action: String,
    pub sign_infos: Vec<SignInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRule {
    pub action: String,
    pub require_signatures: bool,
    pub on_failure: FailureDisposition,
}

impl VerificationRule {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            require_signatures: false,
            on_failure: FailureDisposition::Report,
        }
    }

    pub fn required(mut self) -> Self {
        self.require_signatures = true;
        self
    }

    pub fn on_failure(mut self, disposition: FailureDisposition) -> Self {
        self.on_failure = disposition;
        self
    }

    /// Message-level status for the worst per-signature status.
    fn conclude(&self, worst: VerificationStatus) -> VerificationStatus {
        if worst == VerificationStatus::ValidSignature {
            return worst;
        }
        match self.on_failure {
            FailureDisposition::Report => worst,
            FailureDisposition::Reject => VerificationStatus::RejectMessage,
            FailureDisposition::Drop => VerificationStatus::DropMessage,
        }
    }
}

/// Signing and verification rules over a shared [`TrustStore`].
#[derive(Debug, Clone)]
pub struct SignaturePolicy {
    signing_rules: Vec<SigningRule>,
    verification_rules: Vec<VerificationRule>,
    default_verification: VerificationRule,
    trust_store: Arc<TrustStore>,
}

impl Default for SignaturePolicy {
    fn default() -> Self {
        Self {
            signing_rules: Vec::new(),
            verification_rules: Vec::new(),
            default_verification: VerificationRule::new(ANY_ACTION),
            trust_store: Arc::new(TrustStore::new()),
        }
    }
}

impl SignaturePolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Share an existing trust store
    pub fn with_trust_store(mut self, trust_store: Arc<TrustStore>) -> Self {
        self.trust_store = trust_store;
        self
    }

    /// Trust `public_key` for `actions` (empty = all).
    ///
    /// Only this policy gains the key: a store shared with clones or through
    /// [`with_trust_store`](Self::with_trust_store) is copied first. Add to
    /// the shared [`TrustStore`] itself to reach every holder.
    pub fn with_trusted_key<I, S>(mut self, public_key: PublicKey, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Arc::make_mut(&mut self.trust_store)
            .add(TrustedKey::new(public_key).for_actions(actions));
        self
    }

    /// Sign `action` messages with `info` (`"*"` for all)
    pub fn with_signer(mut self, action: impl Into<String>, info: SignInfo) -> Self {
        let action = action.into();
        match self.signing_rules.iter_mut().find(|r| r.action == action) {
            Some(rule) => rule.sign_infos.push(info),
            None => self.signing_rules.push(SigningRule {
                action,
                sign_infos: vec![info],
            }),
        }
        self
    }

    /// Add a verification rule; a `"*"` rule replaces the default
    pub fn with_verification_rule(mut self, rule: VerificationRule) -> Self {
        if rule.action == ANY_ACTION {
            self.default_verification = rule;
        } else {
            self.verification_rules.retain(|r| r.action != rule.action);
            self.verification_rules.push(rule);
        }
        self
    }

    pub fn trust_store(&self) -> &Arc<TrustStore> {
        &self.trust_store
    }

    pub fn signing_rules(&self) -> &[SigningRule] {
        &self.signing_rules
    }

    /// Identities configured for `action`; an exact rule beats `"*"`.
    pub fn sign_infos_for(&self, action: &str) -> &[SignInfo] {
        self.signing_rules
            .iter()
            .find(|r| r.action == action)
            .or_else(|| self.signing_rules.iter().find(|r| r.action == ANY_ACTION))
            .map(|r| r.sign_infos.as_slice())
            .unwrap_or(&[])
    }

    /// Verification rule for `action`; an exact rule beats the default.
    pub fn verification_rule_for(&self, action: &str) -> &VerificationRule {
        self.verification_rules
            .iter()
            .find(|r| r.action == action)
            .unwrap_or(&self.default_verification)
    }

    // ------------------------------------------------------------------------
    // Signing
    // ------------------------------------------------------------------------

    /// Sign `message` with its own identities followed by the policy's.
    ///
    /// All signatures are produced before any is attached, so a failing
    /// identity leaves the message untouched. Returns the number attached.
    pub fn sign_message<M>(&self, message: &mut M) -> Result<usize, SigningError>
    where
        M: SignableMessage + ?Sized,
    {
        let infos: Vec<SignInfo> = message
            .sign_infos()
            .iter()
            .chain(self.sign_infos_for(message.action()))
            .cloned()
            .collect();
        if infos.is_empty() {
            return Err(SigningError::NoSignInfos(message.action().to_string()));
        }

        let mut canonical: Vec<(SigningMethod, Vec<u8>)> = Vec::new();
        let mut signatures = Vec::with_capacity(infos.len());
        for info in &infos {
            let method = info
                .signing_method
                .clone()
                .unwrap_or_else(|| message.default_signing_method());
            let index = match canonical.iter().position(|(m, _)| *m == method) {
                Some(index) => index,
                None => {
                    let bytes = message.canonical_bytes(&method)?;
                    canonical.push((method.clone(), bytes));
                    canonical.len() - 1
                }
            };
            signatures.push(sign_with(info, &canonical[index].1, method)?);
        }

        let count = signatures.len();
        for signature in signatures {
            message.add_signature(signature);
        }
        debug!("Signed {} with {} signature(s)", message.action(), count);
        Ok(count)
    }

    /// Sign precomputed canonical bytes with explicit identities.
    pub fn sign_canonical<M>(
        &self,
        message: &mut M,
        canonical: &[u8],
        infos: &[SignInfo],
    ) -> Result<usize, SigningError>
    where
        M: SignableMessage + ?Sized,
    {
        if infos.is_empty() {
            return Err(SigningError::NoSignInfos(message.action().to_string()));
        }
        let signatures = infos
            .iter()
            .map(|info| {
                let method = info
                    .signing_method
                    .clone()
                    .unwrap_or_else(|| message.default_signing_method());
                sign_with(info, canonical, method)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let count = signatures.len();
        for signature in signatures {
            message.add_signature(signature);
        }
        debug!("Signed {} with {} signature(s)", message.action(), count);
        Ok(count)
    }

    // ------------------------------------------------------------------------
    // Verification
    // ------------------------------------------------------------------------

    /// Verify every attached signature and decide the message's fate.
    ///
    /// Each signature's status slot receives its individual result.
    pub fn verify_message<M>(&self, message: &M) -> VerificationStatus
    where
        M: SignableMessage + ?Sized,
    {
        let action = message.action();
        let mut canonical: Vec<(SigningMethod, Result<Vec<u8>, VerificationStatus>)> = Vec::new();

        self.judge(action, message.signatures(), |signature| {
            let method = signature
                .signing_method()
                .cloned()
                .unwrap_or_else(|| message.default_signing_method());
            if let Some((_, bytes)) = canonical.iter().find(|(m, _)| *m == method) {
                return bytes.clone();
            }
            let bytes = message.canonical_bytes(&method).map_err(|e| match e {
                FormatError::UnsupportedSigningMethod(_) => {
                    VerificationStatus::UnknownSignatureAlgorithm
                }
                _ => VerificationStatus::BrokenSignature,
            });
            canonical.push((method, bytes.clone()));
            bytes
        })
    }

    /// Verify `signatures` against canonical bytes computed by the caller.
    pub fn verify_canonical(
        &self,
        action: &str,
        signatures: &[Signature],
        canonical: &[u8],
    ) -> VerificationStatus {
        self.judge(action, signatures, |_| Ok(canonical.to_vec()))
    }

    fn judge<F>(&self, action: &str, signatures: &[Signature], mut canonical: F) -> VerificationStatus
    where
        F: FnMut(&Signature) -> Result<Vec<u8>, VerificationStatus>,
    {
        let rule = self.verification_rule_for(action);

        if signatures.is_empty() {
            if !rule.require_signatures {
                return VerificationStatus::Unverified;
            }
            let outcome = rule.conclude(VerificationStatus::NoSignaturesFound);
            warn!("{} carries no signatures but requires them: {}", action, outcome);
            return outcome;
        }

        let mut worst = VerificationStatus::ValidSignature;
        for signature in signatures {
            let status = if !is_understood(signature) {
                VerificationStatus::UnknownSignatureAlgorithm
            } else {
                match canonical(signature) {
                    Ok(bytes) => self.check_signature(action, signature, &bytes),
                    Err(status) => status,
                }
            };
            debug!(
                "{} signature by {}: {}",
                action,
                hex::encode(&signature.key_id()[..signature.key_id().len().min(9)]),
                status
            );
            signature.set_status(status);
            worst = worst.worst(status);
        }

        let outcome = rule.conclude(worst);
        if !outcome.accepts_message() {
            warn!("{} not accepted: {} (worst signature: {})", action, outcome, worst);
        }
        outcome
    }

    /// Steps 2 to 5 for one signature whose algorithm is understood.
    fn check_signature(&self, action: &str, signature: &Signature, canonical: &[u8]) -> VerificationStatus {
        let candidates = self
            .trust_store
            .candidates(signature.key_id(), signature.stated_algorithm());
        if candidates.is_empty() {
            return VerificationStatus::UnknownSigner;
        }

        let encoding = signature.encoding().cloned().unwrap_or_default();
        let mut verified = Vec::new();
        for candidate in &candidates {
            match candidate
                .public_key()
                .verifying_key()
                .verify(canonical, signature.value(), &encoding)
            {
                Ok(()) => verified.push(candidate),
                Err(SignatureFault::Malformed) => return VerificationStatus::BrokenSignature,
                Err(SignatureFault::Unsupported) => {
                    return VerificationStatus::UnknownSignatureAlgorithm
                }
                Err(SignatureFault::Mismatch) => {}
            }
        }

        if verified.is_empty() {
            VerificationStatus::InvalidSignature
        } else if verified.iter().any(|k| k.authorizes(action)) {
            VerificationStatus::ValidSignature
        } else {
            VerificationStatus::InvalidSigner
        }
    }
}

fn is_understood(signature: &Signature) -> bool {
    signature.algorithm().is_supported()
        && signature.signing_method().map_or(true, SigningMethod::is_supported)
        && signature.encoding().map_or(true, |e| e.is_supported())
}

fn sign_with(info: &SignInfo, canonical: &[u8], method: SigningMethod) -> Result<Signature, SigningError> {
    let key_pair = &info.key_pair;
    let value = key_pair
        .sign(canonical, &info.encoding)
        .ok_or_else(|| SigningError::MissingPrivateKey {
            key_id: key_pair.public_key().short_id(),
        })??;

    let mut signature = Signature::new(info.key_id().to_vec(), value)
        .with_algorithm(key_pair.algorithm().clone())
        .with_signing_method(method)
        .with_encoding(info.encoding.clone());
    if let Some(name) = &info.name {
        signature = signature.with_name(name.clone());
    }
    if let Some(description) = &info.description {
        signature = signature.with_description(description.clone());
    }
    if let Some(custom_data) = &info.custom_data {
        signature = signature.with_custom_data(custom_data.clone());
    }
    if info.include_timestamp {
        signature = signature.with_timestamp(Utc::now());
    }
    Ok(signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{CurveAlgorithm, KeyPair, SignatureEncoding};
    use crate::ocpp::I18NString;
    use serde_json::{json, Value};

    #[derive(Clone)]
    struct TestMessage {
        action: String,
        payload: Value,
        signatures: Vec<Signature>,
    }

    impl TestMessage {
        fn new(action: &str) -> Self {
            Self {
                action: action.to_string(),
                payload: json!({"vendorId": "com.example", "data": {"kw": 11, "evse": 1}}),
                signatures: Vec::new(),
            }
        }
    }

    impl SignableMessage for TestMessage {
        fn action(&self) -> &str {
            &self.action
        }

        fn signatures(&self) -> &[Signature] {
            &self.signatures
        }

        fn add_signature(&mut self, signature: Signature) {
            self.signatures.push(signature);
        }

        fn signable_json(&self) -> Value {
            self.payload.clone()
        }
    }

    fn key(alg: CurveAlgorithm) -> KeyPair {
        KeyPair::generate(&alg).unwrap()
    }

    fn signing_policy(key_pair: &KeyPair) -> SignaturePolicy {
        SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(key_pair.clone()))
            .with_trusted_key(key_pair.public_key(), Vec::<String>::new())
            .with_verification_rule(VerificationRule::new(ANY_ACTION).required())
    }

    fn signed(policy: &SignaturePolicy, action: &str) -> TestMessage {
        let mut message = TestMessage::new(action);
        policy.sign_message(&mut message).unwrap();
        message
    }

    /// Rebuild the first signature with a replaced value.
    fn with_value(message: &TestMessage, value: Vec<u8>) -> TestMessage {
        let original = &message.signatures[0];
        let mut tampered = message.clone();
        let mut replacement = Signature::new(original.key_id().to_vec(), value)
            .with_algorithm(original.algorithm().clone());
        if let Some(m) = original.signing_method() {
            replacement = replacement.with_signing_method(m.clone());
        }
        tampered.signatures = vec![replacement];
        tampered
    }

    #[test]
    fn test_no_signatures_required() {
        let policy = signing_policy(&key(CurveAlgorithm::Secp256r1));
        let message = TestMessage::new("DataTransfer");
        assert_eq!(policy.verify_message(&message), VerificationStatus::NoSignaturesFound);
    }

    #[test]
    fn test_no_signatures_under_disposition() {
        let policy = signing_policy(&key(CurveAlgorithm::Secp256r1));
        let message = TestMessage::new("Heartbeat");

        let dropping = policy.clone().with_verification_rule(
            VerificationRule::new(ANY_ACTION).required().on_failure(FailureDisposition::Drop),
        );
        assert_eq!(dropping.verify_message(&message), VerificationStatus::DropMessage);

        let rejecting = policy.with_verification_rule(
            VerificationRule::new("Heartbeat").required().on_failure(FailureDisposition::Reject),
        );
        assert_eq!(rejecting.verify_message(&message), VerificationStatus::RejectMessage);

        // Disposition does not apply when signatures are optional
        let optional = SignaturePolicy::new().with_verification_rule(
            VerificationRule::new(ANY_ACTION).on_failure(FailureDisposition::Drop),
        );
        assert_eq!(optional.verify_message(&message), VerificationStatus::Unverified);
    }

    #[test]
    fn test_no_signatures_optional_is_unverified() {
        let policy = SignaturePolicy::new();
        let status = policy.verify_message(&TestMessage::new("Heartbeat"));
        assert_eq!(status, VerificationStatus::Unverified);
        assert!(status.accepts_message());
    }

    #[test]
    fn test_valid_signature() {
        for alg in [CurveAlgorithm::Secp256r1, CurveAlgorithm::Secp256k1] {
            let key_pair = key(alg);
            let policy = signing_policy(&key_pair);
            let message = signed(&policy, "DataTransfer");

            assert_eq!(message.signatures.len(), 1);
            assert_eq!(policy.verify_message(&message), VerificationStatus::ValidSignature);
            assert_eq!(
                message.signatures[0].status(),
                Some(VerificationStatus::ValidSignature)
            );
        }
    }

    #[test]
    fn test_flipped_byte_is_invalid() {
        let policy = signing_policy(&key(CurveAlgorithm::Secp256r1));
        let message = signed(&policy, "DataTransfer");

        let mut value = message.signatures[0].value().to_vec();
        value[10] ^= 0x01;
        let tampered = with_value(&message, value);
        assert_eq!(policy.verify_message(&tampered), VerificationStatus::InvalidSignature);
    }

    #[test]
    fn test_modified_payload_is_invalid() {
        let policy = signing_policy(&key(CurveAlgorithm::Secp256r1));
        let mut message = signed(&policy, "DataTransfer");
        message.payload["data"]["kw"] = json!(50);
        assert_eq!(policy.verify_message(&message), VerificationStatus::InvalidSignature);
    }

    #[test]
    fn test_unknown_signer() {
        let signer = key(CurveAlgorithm::Secp256r1);
        let sign_only = SignaturePolicy::new().with_signer(ANY_ACTION, SignInfo::new(signer));
        let message = signed(&sign_only, "DataTransfer");

        let verifier = signing_policy(&key(CurveAlgorithm::Secp256r1));
        assert_eq!(verifier.verify_message(&message), VerificationStatus::UnknownSigner);
    }

    #[test]
    fn test_unknown_algorithm() {
        let policy = signing_policy(&key(CurveAlgorithm::Secp256r1));
        let message = signed(&policy, "DataTransfer");

        let original = &message.signatures[0];
        let mut relabeled = message.clone();
        relabeled.signatures = vec![Signature::new(
            original.key_id().to_vec(),
            original.value().to_vec(),
        )
        .with_algorithm(CurveAlgorithm::Other("ed25519".into()))];

        assert_eq!(
            policy.verify_message(&relabeled),
            VerificationStatus::UnknownSignatureAlgorithm
        );
    }

    #[test]
    fn test_unknown_signing_method_or_encoding() {
        let key_pair = key(CurveAlgorithm::Secp256r1);
        let policy = signing_policy(&key_pair);
        let message = signed(&policy, "DataTransfer");
        let original = &message.signatures[0];

        let mut odd_method = message.clone();
        odd_method.signatures = vec![Signature::new(original.key_id().to_vec(), original.value().to_vec())
            .with_signing_method(SigningMethod::Other("xml".into()))];
        assert_eq!(
            policy.verify_message(&odd_method),
            VerificationStatus::UnknownSignatureAlgorithm
        );

        let mut odd_encoding = message.clone();
        odd_encoding.signatures = vec![Signature::new(original.key_id().to_vec(), original.value().to_vec())
            .with_encoding(SignatureEncoding::Other("jws".into()))];
        assert_eq!(
            policy.verify_message(&odd_encoding),
            VerificationStatus::UnknownSignatureAlgorithm
        );

        // Binary method on a message without a binary form
        let mut no_binary = message.clone();
        no_binary.signatures = vec![Signature::new(original.key_id().to_vec(), original.value().to_vec())
            .with_signing_method(SigningMethod::Binary)];
        assert_eq!(
            policy.verify_message(&no_binary),
            VerificationStatus::UnknownSignatureAlgorithm
        );
    }

    #[test]
    fn test_wrong_length_is_broken() {
        let policy = signing_policy(&key(CurveAlgorithm::Secp256r1));
        let message = signed(&policy, "DataTransfer");

        let mut value = message.signatures[0].value().to_vec();
        value.pop();
        let truncated = with_value(&message, value);
        assert_eq!(policy.verify_message(&truncated), VerificationStatus::BrokenSignature);
    }

    #[test]
    fn test_unauthorized_signer() {
        let key_pair = key(CurveAlgorithm::Secp256r1);
        let policy = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(key_pair.clone()))
            .with_trusted_key(key_pair.public_key(), ["Heartbeat"]);

        let heartbeat = signed(&policy, "Heartbeat");
        assert_eq!(policy.verify_message(&heartbeat), VerificationStatus::ValidSignature);

        let transfer = signed(&policy, "DataTransfer");
        assert_eq!(policy.verify_message(&transfer), VerificationStatus::InvalidSigner);
    }

    #[test]
    fn test_failure_beats_valid_and_disposition_applies() {
        let good = key(CurveAlgorithm::Secp256r1);
        let stranger = key(CurveAlgorithm::Secp256r1);
        let policy = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(good.clone()))
            .with_signer(ANY_ACTION, SignInfo::new(stranger))
            .with_trusted_key(good.public_key(), Vec::<String>::new());

        let message = signed(&policy, "DataTransfer");
        assert_eq!(message.signatures.len(), 2);
        assert_eq!(policy.verify_message(&message), VerificationStatus::UnknownSigner);
        assert_eq!(
            message.signatures[0].status(),
            Some(VerificationStatus::ValidSignature)
        );
        assert_eq!(
            message.signatures[1].status(),
            Some(VerificationStatus::UnknownSigner)
        );

        let rejecting = policy.clone().with_verification_rule(
            VerificationRule::new("DataTransfer").on_failure(FailureDisposition::Reject),
        );
        let fresh = signed(&policy, "DataTransfer");
        assert_eq!(rejecting.verify_message(&fresh), VerificationStatus::RejectMessage);

        let dropping = policy.clone().with_verification_rule(
            VerificationRule::new(ANY_ACTION).on_failure(FailureDisposition::Drop),
        );
        let fresh = signed(&policy, "DataTransfer");
        assert_eq!(dropping.verify_message(&fresh), VerificationStatus::DropMessage);
    }

    #[test]
    fn test_precedence_between_failures() {
        let key_pair = key(CurveAlgorithm::Secp256r1);
        let policy = signing_policy(&key_pair);
        let message = signed(&policy, "DataTransfer");
        let original = &message.signatures[0];

        let mut flipped = original.value().to_vec();
        flipped[40] ^= 0x01;
        let mut mixed = message.clone();
        mixed.signatures = vec![
            Signature::new(original.key_id().to_vec(), flipped)
                .with_signing_method(SigningMethod::Json),
            Signature::new(original.key_id().to_vec(), vec![1, 2, 3])
                .with_signing_method(SigningMethod::Json),
            Signature::new(vec![0xEE; 8], original.value().to_vec()),
        ];

        assert_eq!(policy.verify_message(&mixed), VerificationStatus::BrokenSignature);
        let statuses: Vec<_> = mixed.signatures.iter().map(|s| s.status()).collect();
        assert_eq!(
            statuses,
            vec![
                Some(VerificationStatus::InvalidSignature),
                Some(VerificationStatus::BrokenSignature),
                Some(VerificationStatus::UnknownSigner),
            ]
        );
    }

    #[test]
    fn test_exact_rule_beats_wildcard() {
        let a = key(CurveAlgorithm::Secp256r1);
        let b = key(CurveAlgorithm::Secp256k1);
        let policy = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(a))
            .with_signer("BootNotification", SignInfo::new(b.clone()))
            .with_verification_rule(VerificationRule::new("BootNotification").required());

        assert_eq!(policy.sign_infos_for("BootNotification").len(), 1);
        assert_eq!(
            policy.sign_infos_for("BootNotification")[0].key_pair,
            b
        );
        assert_eq!(policy.sign_infos_for("Heartbeat").len(), 1);
        assert!(policy.verification_rule_for("BootNotification").require_signatures);
        assert!(!policy.verification_rule_for("Heartbeat").require_signatures);
    }

    #[test]
    fn test_signing_errors() {
        let policy = SignaturePolicy::new();
        let mut message = TestMessage::new("Heartbeat");
        assert!(matches!(
            policy.sign_message(&mut message),
            Err(SigningError::NoSignInfos(action)) if action == "Heartbeat"
        ));

        let full = key(CurveAlgorithm::Secp256r1);
        let public_only = KeyPair::from_public(full.public_bytes(), CurveAlgorithm::Secp256r1).unwrap();
        let policy = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(full))
            .with_signer(ANY_ACTION, SignInfo::new(public_only));
        assert!(matches!(
            policy.sign_message(&mut message),
            Err(SigningError::MissingPrivateKey { .. })
        ));
        assert!(message.signatures.is_empty());
    }

    #[test]
    fn test_signature_annotations_and_der() {
        let key_pair = key(CurveAlgorithm::Secp256r1);
        let info = SignInfo::new(key_pair.clone())
            .with_name("CSMS")
            .with_description(I18NString::create("en", "Operator key"))
            .with_timestamp()
            .with_encoding(SignatureEncoding::Der)
            .with_key_id_len(12);
        let policy = SignaturePolicy::new()
            .with_signer("DataTransfer", info)
            .with_trusted_key(key_pair.public_key(), ["DataTransfer"]);

        let message = signed(&policy, "DataTransfer");
        let signature = &message.signatures[0];
        assert_eq!(signature.key_id(), &key_pair.key_id()[..12]);
        assert_eq!(signature.name(), Some("CSMS"));
        assert!(signature.timestamp().is_some());
        assert_eq!(signature.encoding(), Some(&SignatureEncoding::Der));
        assert_eq!(signature.signing_method(), Some(&SigningMethod::Json));

        assert_eq!(policy.verify_message(&message), VerificationStatus::ValidSignature);
    }

    #[test]
    fn test_canonical_variants() {
        let key_pair = key(CurveAlgorithm::Secp256r1);
        let policy = signing_policy(&key_pair);
        let mut message = TestMessage::new("DataTransfer");
        let infos = [SignInfo::new(key_pair)];

        policy.sign_canonical(&mut message, b"detached bytes", &infos).unwrap();
        assert_eq!(
            policy.verify_canonical("DataTransfer", &message.signatures, b"detached bytes"),
            VerificationStatus::ValidSignature
        );
        let fresh: Vec<Signature> = message
            .signatures
            .iter()
            .map(|s| Signature::new(s.key_id().to_vec(), s.value().to_vec()))
            .collect();
        assert_eq!(
            policy.verify_canonical("DataTransfer", &fresh, b"other bytes"),
            VerificationStatus::InvalidSignature
        );
    }

    #[test]
    fn test_status_slot_not_overwritten() {
        let policy = signing_policy(&key(CurveAlgorithm::Secp256r1));
        let message = signed(&policy, "DataTransfer");
        assert_eq!(policy.verify_message(&message), VerificationStatus::ValidSignature);

        let other = signing_policy(&key(CurveAlgorithm::Secp256r1));
        assert_eq!(other.verify_message(&message), VerificationStatus::UnknownSigner);
        assert_eq!(
            message.signatures[0].status(),
            Some(VerificationStatus::ValidSignature)
        );
    }

    #[test]
    fn test_unstated_curve_finds_secp256k1_signer() {
        let key_pair = key(CurveAlgorithm::Secp256k1);
        let policy = signing_policy(&key_pair);
        let message = signed(&policy, "DataTransfer");

        let original = &message.signatures[0];
        let mut bare = message.clone();
        bare.signatures = vec![Signature::new(original.key_id().to_vec(), original.value().to_vec())
            .with_signing_method(SigningMethod::Json)];
        assert_eq!(bare.signatures[0].stated_algorithm(), None);
        assert_eq!(policy.verify_message(&bare), VerificationStatus::ValidSignature);

        // A stated curve still restricts the search
        let mut mislabeled = message.clone();
        mislabeled.signatures = vec![Signature::new(original.key_id().to_vec(), original.value().to_vec())
            .with_algorithm(CurveAlgorithm::Secp256r1)];
        assert_eq!(policy.verify_message(&mislabeled), VerificationStatus::UnknownSigner);
    }

    #[test]
    fn test_trusted_key_not_shared_with_clones() {
        let key_pair = key(CurveAlgorithm::Secp256r1);
        let strict = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(key_pair.clone()))
            .with_verification_rule(VerificationRule::new(ANY_ACTION).required());
        let lenient = strict
            .clone()
            .with_trusted_key(key_pair.public_key(), Vec::<String>::new());

        assert!(strict.trust_store().is_empty());
        assert_eq!(lenient.trust_store().len(), 1);

        let message = signed(&strict, "Heartbeat");
        assert_eq!(lenient.verify_message(&message), VerificationStatus::ValidSignature);
        let message = signed(&strict, "Heartbeat");
        assert_eq!(strict.verify_message(&message), VerificationStatus::UnknownSigner);
    }

    #[test]
    fn test_trust_store_shared_at_runtime() {
        let key_pair = key(CurveAlgorithm::Secp256r1);
        let store = Arc::new(TrustStore::new());
        let policy = SignaturePolicy::new()
            .with_signer(ANY_ACTION, SignInfo::new(key_pair.clone()))
            .with_trust_store(Arc::clone(&store));

        assert_eq!(
            policy.verify_message(&signed(&policy, "Heartbeat")),
            VerificationStatus::UnknownSigner
        );
        store.add(TrustedKey::new(key_pair.public_key()));
        assert_eq!(
            policy.verify_message(&signed(&policy, "Heartbeat")),
            VerificationStatus::ValidSignature
        );
    }
}
