//! OCPP protocol layer carrying E2E signatures
//!
//! - `types`: OCPP data types and requests with `signatures`
//! - `messages`: OCPP-J framing (CALL, CALLRESULT, CALLERROR)
//! - `binary`: compact binary DataTransfer

pub mod types;
pub mod messages;
pub mod binary;

pub use types::*;
pub use messages::*;
pub use binary::BinaryDataTransferRequest;
