//! Inbound push-path plumbing: signature verification and payload parsing.
//!
//! Verification happens before any parsing; a delivery that fails the
//! signature check is rejected without looking at its body.

pub mod events;
pub mod signature;

pub use events::{ParseError, PushIssueData, PushPayload, UpdatedFrom, parse_push};
pub use signature::{compute_signature, encode_signature, verify_signature};
