//! Terminal verdicts of an authentication attempt.

use std::fmt;

/// The graded result of verifying one credential.
///
/// The four-way split lets a host distinguish "this subject does not
/// exist at the provider" from "the subject exists but a claim failed",
/// and both from the pipeline itself breaking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every configured claim matched; the identity is confirmed.
    Success,
    /// The identity field is absent from the tokeninfo response.
    UserUnknown,
    /// The endpoint rejected the credential (non-200 status), a claim
    /// value mismatched, or a secondary claim is missing.
    AuthMismatch,
    /// Transport, allocation, or response-contract failure; the attempt
    /// never reached a credential decision.
    ServiceUnavailable,
}

impl Outcome {
    /// Stable lowercase name, used in logs and CLI verdict output.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::UserUnknown => "user-unknown",
            Outcome::AuthMismatch => "auth-mismatch",
            Outcome::ServiceUnavailable => "service-unavailable",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
