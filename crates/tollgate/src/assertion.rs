//! Claim assertions checked against a scanned tokeninfo document.

use thiserror::Error;
use tollgate_json::{value_extent, Token, TokenKind};

use crate::outcome::Outcome;

/// One expected claim: the response field `key` must be the string
/// `expected`.
#[derive(Debug, Clone)]
pub struct Assertion {
    key: String,
    expected: String,
    matched: bool,
}

impl Assertion {
    pub fn new(key: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            expected: expected.into(),
            matched: false,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn expected(&self) -> &str {
        &self.expected
    }

    pub fn is_matched(&self) -> bool {
        self.matched
    }
}

/// Decisive rejection: a configured field is present with the wrong
/// value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("'{key}' value doesn't meet expectation: '{actual}' != '{expected}'")]
pub struct ClaimMismatch {
    pub key: String,
    pub expected: String,
    pub actual: String,
}

/// The set of claims one authentication attempt must satisfy.
///
/// The identity assertion is distinguished from the secondary checks: a
/// response that never names the identity field describes an unknown
/// subject, not a failed claim. Match flags live here and are scoped to
/// a single attempt.
#[derive(Debug, Clone)]
pub struct AssertionSet {
    identity: Assertion,
    secondary: Vec<Assertion>,
}

impl AssertionSet {
    pub fn new(identity: Assertion, secondary: Vec<Assertion>) -> Self {
        Self {
            identity,
            secondary,
        }
    }

    pub fn identity(&self) -> &Assertion {
        &self.identity
    }

    pub fn secondary(&self) -> &[Assertion] {
        &self.secondary
    }

    /// Clear all match flags, returning the set to its pre-walk state.
    pub fn reset(&mut self) {
        self.identity.matched = false;
        for assertion in &mut self.secondary {
            assertion.matched = false;
        }
    }

    /// Walk the root object's key/value pairs in document order, marking
    /// each assertion whose key and value both match, and skipping
    /// uninteresting values structurally — nested objects and arrays of
    /// arbitrary shape never desynchronize the walk.
    ///
    /// A key that matches an assertion whose value differs (or is not a
    /// string) is a decisive rejection and stops the walk immediately.
    /// Non-string top-level keys are stepped over as a whole pair.
    ///
    /// Comparison is over raw byte spans: JSON escape sequences in the
    /// response are not decoded first. Keys and values with escapes in
    /// them will not match their decoded form.
    ///
    /// The caller is responsible for ensuring `tokens[0]` is an object.
    pub fn check(&mut self, tokens: &[Token], body: &[u8]) -> Result<(), ClaimMismatch> {
        let Some(root) = tokens.first() else {
            return Ok(());
        };

        let mut index = 1;
        for _ in 0..root.children / 2 {
            let Some(key) = tokens.get(index) else {
                break;
            };
            if key.kind != TokenKind::String {
                index += value_extent(tokens, index);
                index += value_extent(tokens, index);
                continue;
            }

            match self.find_expected(key.span(body)) {
                Some(assertion) => {
                    let Some(value) = tokens.get(index + 1) else {
                        break;
                    };
                    if value.kind == TokenKind::String
                        && value.span(body) == assertion.expected.as_bytes()
                    {
                        assertion.matched = true;
                        index += 2;
                    } else {
                        return Err(ClaimMismatch {
                            key: assertion.key.clone(),
                            expected: assertion.expected.clone(),
                            actual: String::from_utf8_lossy(value.span(body)).into_owned(),
                        });
                    }
                }
                None => {
                    index += 1;
                    index += value_extent(tokens, index);
                }
            }
        }

        Ok(())
    }

    /// Reduce the match flags to a terminal outcome. A missing identity
    /// claim is reported ahead of any missing secondary claim.
    pub fn outcome(&self) -> Outcome {
        if !self.identity.matched {
            Outcome::UserUnknown
        } else if self.secondary.iter().any(|a| !a.matched) {
            Outcome::AuthMismatch
        } else {
            Outcome::Success
        }
    }

    /// Assertions left unmatched after a walk.
    pub fn missing(&self) -> impl Iterator<Item = &Assertion> {
        std::iter::once(&self.identity)
            .chain(self.secondary.iter())
            .filter(|a| !a.matched)
    }

    /// First assertion configured for `key`, in identity-then-secondary
    /// order, regardless of its current match flag.
    fn find_expected(&mut self, key: &[u8]) -> Option<&mut Assertion> {
        std::iter::once(&mut self.identity)
            .chain(self.secondary.iter_mut())
            .find(|a| a.key.as_bytes() == key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_json::{scan, DEFAULT_MAX_TOKENS};

    const BODY: &str =
        r#"{"sub":"alice","scope":"read","extra":{"a":1,"b":[1,2,3]},"aud":"svc1"}"#;

    fn set(identity: (&str, &str), secondary: &[(&str, &str)]) -> AssertionSet {
        AssertionSet::new(
            Assertion::new(identity.0, identity.1),
            secondary
                .iter()
                .map(|(k, v)| Assertion::new(*k, *v))
                .collect(),
        )
    }

    fn check(body: &str, assertions: &mut AssertionSet) -> Result<(), ClaimMismatch> {
        let tokens = scan(body.as_bytes(), DEFAULT_MAX_TOKENS).unwrap();
        assertions.check(&tokens, body.as_bytes())
    }

    #[test]
    fn matches_expected_claims_across_nested_noise() {
        let mut assertions = set(("sub", "alice"), &[("aud", "svc1")]);
        check(BODY, &mut assertions).unwrap();
        assert_eq!(assertions.outcome(), Outcome::Success);
    }

    #[test]
    fn wrong_identity_value_is_a_decisive_mismatch() {
        let mut assertions = set(("sub", "bob"), &[]);
        let err = check(BODY, &mut assertions).unwrap_err();
        assert_eq!(err.key, "sub");
        assert_eq!(err.expected, "bob");
        assert_eq!(err.actual, "alice");
    }

    #[test]
    fn mismatch_stops_before_later_matches() {
        // "scope" appears before "aud"; the walk must stop on the scope
        // mismatch even though the aud claim would match afterwards.
        let mut assertions = set(("sub", "alice"), &[("scope", "write"), ("aud", "svc1")]);
        let err = check(BODY, &mut assertions).unwrap_err();
        assert_eq!(err.key, "scope");
        assert!(!assertions.secondary()[1].is_matched());
    }

    #[test]
    fn non_string_value_for_expected_key_is_a_mismatch() {
        let mut assertions = set(("sub", "alice"), &[("extra", "x")]);
        let err = check(BODY, &mut assertions).unwrap_err();
        assert_eq!(err.key, "extra");
        assert_eq!(err.actual, r#"{"a":1,"b":[1,2,3]}"#);
    }

    #[test]
    fn absent_identity_reduces_to_user_unknown() {
        let mut assertions = set(("username", "alice"), &[("aud", "svc1")]);
        check(BODY, &mut assertions).unwrap();
        assert_eq!(assertions.outcome(), Outcome::UserUnknown);
    }

    #[test]
    fn absent_secondary_reduces_to_auth_mismatch() {
        let mut assertions = set(("sub", "alice"), &[("client_id", "app")]);
        check(BODY, &mut assertions).unwrap();
        assert_eq!(assertions.outcome(), Outcome::AuthMismatch);
    }

    #[test]
    fn missing_identity_wins_over_missing_secondary() {
        let mut assertions = set(("username", "alice"), &[("client_id", "app")]);
        check(BODY, &mut assertions).unwrap();
        assert_eq!(assertions.outcome(), Outcome::UserUnknown);
        assert_eq!(assertions.missing().count(), 2);
    }

    #[test]
    fn walk_is_deterministic_after_reset() {
        let mut assertions = set(("sub", "alice"), &[("aud", "svc1"), ("nope", "x")]);
        check(BODY, &mut assertions).unwrap();
        let first: Vec<bool> = assertions.secondary().iter().map(|a| a.is_matched()).collect();
        let first_outcome = assertions.outcome();

        assertions.reset();
        assert!(!assertions.identity().is_matched());

        check(BODY, &mut assertions).unwrap();
        let second: Vec<bool> = assertions.secondary().iter().map(|a| a.is_matched()).collect();
        assert_eq!(first, second);
        assert_eq!(first_outcome, assertions.outcome());
    }

    #[test]
    fn non_string_top_level_keys_are_stepped_over() {
        let body = r#"{1:{"deep":[1,2]},"sub":"alice"}"#;
        let mut assertions = set(("sub", "alice"), &[]);
        check(body, &mut assertions).unwrap();
        assert_eq!(assertions.outcome(), Outcome::Success);
    }

    #[test]
    fn duplicate_field_is_rechecked_in_document_order() {
        // First occurrence matches, second differs: the walk re-examines
        // the key and rejects decisively.
        let body = r#"{"sub":"alice","sub":"mallory"}"#;
        let mut assertions = set(("sub", "alice"), &[]);
        let err = check(body, &mut assertions).unwrap_err();
        assert_eq!(err.actual, "mallory");
    }

    #[test]
    fn raw_byte_comparison_does_not_decode_escapes() {
        // Known limitation: the span `alic\u0065` decodes to "alice"
        // but does not match it byte-for-byte.
        let body = r#"{"sub":"alic\u0065"}"#;
        let mut assertions = set(("sub", "alice"), &[]);
        let err = check(body, &mut assertions).unwrap_err();
        assert_eq!(err.actual, r#"alic\u0065"#);
    }

    #[test]
    fn deeply_nested_siblings_do_not_desynchronize_the_walk() {
        let body = format!(
            r#"{{"pad":{},"sub":"alice","tail":[[],[[1],[2,[3]]]],"aud":"svc1"}}"#,
            r#"{"a":{"b":{"c":{"d":[1,2,{"e":null}]}}}}"#
        );
        let mut assertions = set(("sub", "alice"), &[("aud", "svc1")]);
        check(&body, &mut assertions).unwrap();
        assert_eq!(assertions.outcome(), Outcome::Success);
    }
}
