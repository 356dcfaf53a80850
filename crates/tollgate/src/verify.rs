//! The verification pipeline: fetch, scan, match, reduce.

use tollgate_json::{scan, TokenKind};
use tracing::{debug, warn};

use crate::assertion::AssertionSet;
use crate::config::ModuleConfig;
use crate::fetch::{FetchError, HttpFetcher, HttpFetcherConfig, TokenInfoFetch};
use crate::outcome::Outcome;

/// Audit log event names emitted by the pipeline.
///
/// Every terminal outcome other than success is accompanied by exactly
/// one of these. The credential — and the assembled URL, which embeds
/// it — never appears in any event.
pub mod events {
    /// Configuration or input preconditions failed.
    pub const BAD_INPUT: &str = "bad_input";
    /// The tokeninfo request could not be performed.
    pub const FETCH_FAILED: &str = "fetch_failed";
    /// The endpoint answered with a non-200 status.
    pub const STATUS_REJECTED: &str = "status_rejected";
    /// The response body was not valid bounded JSON.
    pub const SCAN_FAILED: &str = "scan_failed";
    /// The response's top level was not a JSON object.
    pub const SHAPE_VIOLATION: &str = "shape_violation";
    /// A configured claim was present with the wrong value.
    pub const CLAIM_MISMATCH: &str = "claim_mismatch";
    /// A configured claim was absent from the response.
    pub const CLAIM_MISSING: &str = "claim_missing";
    /// All claims matched.
    pub const AUTHENTICATED: &str = "authenticated";
}

/// Run one verification attempt against `fetcher`.
///
/// `credential` is appended to `tokeninfo_url` verbatim; callers that
/// cannot guarantee a URL-safe credential must percent-encode it before
/// calling.
///
/// Transport and allocation failures, unparseable or oversized bodies,
/// and a non-object top level all report as
/// [`Outcome::ServiceUnavailable`]: the pipeline could not reach a
/// credential decision. A non-200 status and any decisive claim
/// mismatch report as [`Outcome::AuthMismatch`]. Otherwise the
/// assertion set's reduction decides.
pub fn verify<F: TokenInfoFetch>(
    fetcher: &F,
    tokeninfo_url: &str,
    credential: &str,
    assertions: &mut AssertionSet,
    max_tokens: usize,
) -> Outcome {
    let url = format!("{tokeninfo_url}{credential}");

    let fetched = match fetcher.fetch(&url) {
        Ok(fetched) => fetched,
        Err(err) => {
            warn!(event = events::FETCH_FAILED, error = %err, "tokeninfo request failed");
            return Outcome::ServiceUnavailable;
        }
    };

    if fetched.status != 200 {
        warn!(
            event = events::STATUS_REJECTED,
            status = fetched.status,
            "endpoint rejected the credential"
        );
        return Outcome::AuthMismatch;
    }

    let body = fetched.body.bytes();
    let tokens = match scan(body, max_tokens) {
        Ok(tokens) => tokens,
        Err(err) => {
            warn!(event = events::SCAN_FAILED, error = %err, "failed to parse tokeninfo response");
            return Outcome::ServiceUnavailable;
        }
    };

    // The endpoint contract promises a top-level object.
    if tokens.first().map(|t| t.kind) != Some(TokenKind::Object) {
        warn!(
            event = events::SHAPE_VIOLATION,
            "tokeninfo response: JSON object expected"
        );
        return Outcome::ServiceUnavailable;
    }

    if let Err(mismatch) = assertions.check(&tokens, body) {
        warn!(
            event = events::CLAIM_MISMATCH,
            key = %mismatch.key,
            expected = %mismatch.expected,
            actual = %mismatch.actual,
            "claim value does not meet expectation"
        );
        return Outcome::AuthMismatch;
    }

    for absent in assertions.missing() {
        warn!(
            event = events::CLAIM_MISSING,
            key = %absent.key(),
            "claim field absent from tokeninfo response"
        );
    }

    let outcome = assertions.outcome();
    if outcome == Outcome::Success {
        debug!(
            event = events::AUTHENTICATED,
            subject = %assertions.identity().expected(),
            "successfully authenticated"
        );
    }
    outcome
}

/// Host-facing authentication backend: a configuration plus a fetcher.
///
/// Each [`authenticate`](Authenticator::authenticate) call is one
/// independent attempt with its own buffer, token sequence, and
/// assertion set; concurrent attempts share nothing mutable.
pub struct Authenticator<F = HttpFetcher> {
    config: ModuleConfig,
    fetcher: F,
}

impl Authenticator<HttpFetcher> {
    /// Build an authenticator with the default blocking HTTPS fetcher.
    pub fn new(config: ModuleConfig) -> Result<Self, FetchError> {
        let fetcher = HttpFetcher::new(HttpFetcherConfig::default())?;
        Ok(Self::with_fetcher(config, fetcher))
    }
}

impl<F: TokenInfoFetch> Authenticator<F> {
    /// Build an authenticator over a caller-supplied fetcher.
    pub fn with_fetcher(config: ModuleConfig, fetcher: F) -> Self {
        Self { config, fetcher }
    }

    pub fn config(&self) -> &ModuleConfig {
        &self.config
    }

    /// Verify one `username` + `credential` pair.
    ///
    /// An invalid configuration or empty inputs mean the attempt cannot
    /// be decided at all and report as service-unavailable, mirroring
    /// the non-200/transport taxonomy of [`verify`].
    pub fn authenticate(&self, username: &str, credential: &str) -> Outcome {
        if let Err(err) = self.config.validate() {
            warn!(event = events::BAD_INPUT, error = %err, "rejecting attempt");
            return Outcome::ServiceUnavailable;
        }
        if username.is_empty() {
            warn!(event = events::BAD_INPUT, "rejecting attempt: empty username");
            return Outcome::ServiceUnavailable;
        }
        if credential.is_empty() {
            warn!(
                event = events::BAD_INPUT,
                "rejecting attempt: empty credential"
            );
            return Outcome::ServiceUnavailable;
        }

        let mut assertions = self.config.assertions_for(username);
        verify(
            &self.fetcher,
            &self.config.tokeninfo_url,
            credential,
            &mut assertions,
            self.config.max_tokens,
        )
    }
}
