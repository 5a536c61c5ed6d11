//! Verification outcomes

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of verifying one signature, or the disposition of a whole message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VerificationStatus {
    Unverified,
    DropMessage,
    RejectMessage,
    NoSignaturesFound,
    UnknownSignatureAlgorithm,
    BrokenSignature,
    InvalidSignature,
    ValidSignature,
    UnknownSigner,
    InvalidSigner,
}

impl VerificationStatus {
    /// Rank used when several signatures disagree; the highest wins.
    ///
    /// `DropMessage` > `RejectMessage` > `BrokenSignature` >
    /// `UnknownSignatureAlgorithm` > `InvalidSignature` > `InvalidSigner` >
    /// `UnknownSigner` > `NoSignaturesFound` > `Unverified` > `ValidSignature`
    pub fn severity(&self) -> u8 {
        match self {
            VerificationStatus::DropMessage => 9,
            VerificationStatus::RejectMessage => 8,
            VerificationStatus::BrokenSignature => 7,
            VerificationStatus::UnknownSignatureAlgorithm => 6,
            VerificationStatus::InvalidSignature => 5,
            VerificationStatus::InvalidSigner => 4,
            VerificationStatus::UnknownSigner => 3,
            VerificationStatus::NoSignaturesFound => 2,
            VerificationStatus::Unverified => 1,
            VerificationStatus::ValidSignature => 0,
        }
    }

    /// Whether a message with this status may be acted upon.
    pub fn accepts_message(&self) -> bool {
        matches!(
            self,
            VerificationStatus::ValidSignature | VerificationStatus::Unverified
        )
    }

    /// Policy-level dispositions rather than per-signature results.
    pub fn is_disposition(&self) -> bool {
        matches!(
            self,
            VerificationStatus::DropMessage | VerificationStatus::RejectMessage
        )
    }

    /// The more severe of two statuses.
    pub fn worst(self, other: Self) -> Self {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [VerificationStatus; 10] = [
        VerificationStatus::Unverified,
        VerificationStatus::DropMessage,
        VerificationStatus::RejectMessage,
        VerificationStatus::NoSignaturesFound,
        VerificationStatus::UnknownSignatureAlgorithm,
        VerificationStatus::BrokenSignature,
        VerificationStatus::InvalidSignature,
        VerificationStatus::ValidSignature,
        VerificationStatus::UnknownSigner,
        VerificationStatus::InvalidSigner,
    ];

    #[test]
    fn test_severity_is_total() {
        let mut ranks: Vec<u8> = ALL.iter().map(VerificationStatus::severity).collect();
        ranks.sort_unstable();
        ranks.dedup();
        assert_eq!(ranks.len(), ALL.len());
    }

    #[test]
    fn test_failures_dominate_valid() {
        for status in ALL {
            assert_eq!(VerificationStatus::ValidSignature.worst(status), status);
            assert_eq!(status.worst(VerificationStatus::ValidSignature), status);
        }
        assert_eq!(
            VerificationStatus::InvalidSignature.worst(VerificationStatus::DropMessage),
            VerificationStatus::DropMessage
        );
        assert_eq!(
            VerificationStatus::UnknownSigner.worst(VerificationStatus::BrokenSignature),
            VerificationStatus::BrokenSignature
        );
    }

    #[test]
    fn test_acceptance() {
        let accepted: Vec<_> = ALL.into_iter().filter(|s| s.accepts_message()).collect();
        assert_eq!(
            accepted,
            vec![VerificationStatus::Unverified, VerificationStatus::ValidSignature]
        );
        assert!(VerificationStatus::RejectMessage.is_disposition());
        assert!(!VerificationStatus::InvalidSigner.is_disposition());
    }

    #[test]
    fn test_display_and_serde_names() {
        assert_eq!(VerificationStatus::UnknownSigner.to_string(), "UnknownSigner");
        assert_eq!(
            serde_json::to_string(&VerificationStatus::BrokenSignature).unwrap(),
            "\"BrokenSignature\""
        );
    }
}
