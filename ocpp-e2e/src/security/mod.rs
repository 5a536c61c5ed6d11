//! Signing and verification of OCPP messages
//!
//! - `status`: verification outcomes and their severity
//! - `signable`: the `SignableMessage` capability and canonical bytes
//! - `trust_store`: public keys trusted per action
//! - `policy`: rules deciding who signs and how signatures are judged

pub mod status;
pub mod signable;
pub mod trust_store;
pub mod policy;

pub use status::VerificationStatus;
pub use signable::{canonical_json, SignInfo, SignableMessage, SIGNATURES_FIELD};
pub use trust_store::{TrustStore, TrustedKey};
pub use policy::{
    FailureDisposition, SignaturePolicy, SigningRule, VerificationRule, ANY_ACTION,
};
