//! # OCPP E2E
//!
//! End-to-end signatures for OCPP 1.6 / 2.1 messages exchanged between
//! charging stations and central systems.
//!
//! Messages are signed by the party that creates them and verified by the
//! party that acts on them, independently of the transport and of any
//! intermediaries (local controllers, proxies, roaming hubs) in between.
//!
//! ## Architecture
//!
//! ```text
//!  outgoing message                          incoming message
//!        │                                          │
//!        ▼                                          ▼
//! ┌─────────────────┐  canonical bytes  ┌────────────────────┐
//! │ SignableMessage │ ────────────────► │  SignaturePolicy   │
//! │ (Call, binary   │ ◄──────────────── │  sign  │  verify   │
//! │  DataTransfer)  │   Signature(s)    └────┬───┴─────┬─────┘
//! └─────────────────┘                        │         │
//!                                        KeyPair   TrustStore
//!                                     (secp256r1 / secp256k1)
//! ```
//!
//! ## Verification outcomes
//!
//! | Status | Accepted? |
//! |--------|-----------|
//! | `ValidSignature` | Yes |
//! | `Unverified` (no signatures, none required) | Yes |
//! | `NoSignaturesFound`, `UnknownSigner`, `InvalidSigner`, `InvalidSignature`, `UnknownSignatureAlgorithm`, `BrokenSignature` | No |
//! | `RejectMessage`, `DropMessage` (policy dispositions) | No |
//!
//! ## Usage
//!
//! ```no_run
//! use ocpp_e2e::{Call, CurveAlgorithm, KeyPair, SignInfo, SignaturePolicy, ANY_ACTION};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let key_pair = KeyPair::generate(&CurveAlgorithm::Secp256r1)?;
//!     let policy = SignaturePolicy::new()
//!         .with_signer(ANY_ACTION, SignInfo::new(key_pair.clone()))
//!         .with_trusted_key(key_pair.public_key(), ["Heartbeat"]);
//!
//!     let mut call = Call::heartbeat()?;
//!     policy.sign_message(&mut call)?;
//!
//!     let status = policy.verify_message(&call);
//!     assert!(status.accepts_message());
//!     Ok(())
//! }
//! ```

pub mod crypto;
pub mod security;
pub mod ocpp;
pub mod config;
pub mod error;

pub use config::{ConfigError, PolicyConfig};
pub use error::{FormatError, SigningError};

// Re-export key types
pub use crypto::{
    CurveAlgorithm, KeyEncoding, KeyPair, KeySerialization, PublicKey, Signature,
    SignatureEncoding, SigningMethod, DEFAULT_ALGORITHM,
};
pub use ocpp::{Action, BinaryDataTransferRequest, Call, CustomData, I18NString, OcppError, OcppMessage};
pub use security::{
    FailureDisposition, SignInfo, SignableMessage, SignaturePolicy, TrustStore, TrustedKey,
    VerificationRule, VerificationStatus, ANY_ACTION,
};
