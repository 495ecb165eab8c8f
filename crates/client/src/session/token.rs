//! Bearer token handling and expiry checks.
//!
//! Access tokens are JWTs. The client never verifies signatures (that is the
//! API's job); it only reads the `exp` claim from the payload segment to know
//! when a stored credential is no longer worth sending. Anything it cannot
//! read is treated as expired.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};

/// Bearer credential for authenticated API requests.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct BearerToken(SecretString);

impl BearerToken {
    /// Wrap a raw token string.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The wrapped secret.
    #[must_use]
    pub const fn secret(&self) -> &SecretString {
        &self.0
    }

    /// The `exp` claim, in seconds since the Unix epoch.
    #[must_use]
    pub fn expires_at(&self) -> Option<i64> {
        token_expiry(self.0.expose_secret())
    }

    /// Check expiry against the current time.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Check expiry against a given Unix timestamp.
    #[must_use]
    pub fn is_expired_at(&self, now: i64) -> bool {
        is_token_expired_at(self.0.expose_secret(), now)
    }
}

impl std::fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("BearerToken").field(&"[REDACTED]").finish()
    }
}

/// Returns true if `token` is expired at `now` (seconds since epoch).
///
/// Fails closed: a token without a readable numeric `exp` claim is expired.
#[must_use]
pub fn is_token_expired_at(token: &str, now: i64) -> bool {
    token_expiry(token).is_none_or(|exp| exp <= now)
}

/// Decode the `exp` claim from a JWT's payload segment.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // Fractional timestamps are floored to whole seconds
pub fn token_expiry(token: &str) -> Option<i64> {
    let payload = token.split('.').nth(1)?;
    if payload.is_empty() {
        return None;
    }

    // Accept standard-alphabet and padded encodings as well as base64url.
    let normalized: String = payload
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect();

    let bytes = URL_SAFE_NO_PAD.decode(normalized).ok()?;
    let claims: serde_json::Value = serde_json::from_slice(&bytes).ok()?;

    match claims.get("exp")? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.floor() as i64)),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn jwt_with_payload(payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    #[test]
    fn test_expiry_future_and_past() {
        let now = 1_700_000_000;
        let future = jwt_with_payload(&format!(r#"{{"exp":{}}}"#, now + 3600));
        let past = jwt_with_payload(&format!(r#"{{"exp":{}}}"#, now - 1));

        assert!(!is_token_expired_at(&future, now));
        assert!(is_token_expired_at(&past, now));
        assert!(is_token_expired_at(
            &jwt_with_payload(&format!(r#"{{"exp":{now}}}"#)),
            now
        ));
    }

    #[test]
    fn test_missing_exp_is_expired() {
        let token = jwt_with_payload(r#"{"user_id":1}"#);
        assert_eq!(token_expiry(&token), None);
        assert!(is_token_expired_at(&token, 0));
    }

    #[test]
    fn test_non_numeric_exp_is_expired() {
        let token = jwt_with_payload(r#"{"exp":"tomorrow"}"#);
        assert!(is_token_expired_at(&token, 0));
    }

    #[test]
    fn test_malformed_tokens_are_expired() {
        for token in ["", "not-a-jwt", "a..c", "a.!!!.c", "a.bm90IGpzb24.c"] {
            assert!(is_token_expired_at(token, 0), "token {token:?} should be expired");
        }
    }

    #[test]
    fn test_fractional_and_padded_exp() {
        let payload = base64::engine::general_purpose::STANDARD.encode(r#"{"exp":1700000000.9}"#);
        let token = format!("h.{payload}.s");
        assert_eq!(token_expiry(&token), Some(1_700_000_000));
    }

    #[test]
    fn test_bearer_token_debug_redacts() {
        let token = BearerToken::new(jwt_with_payload(r#"{"exp":1}"#));
        assert_eq!(format!("{token:?}"), "BearerToken(\"[REDACTED]\")");
        assert!(token.is_expired());
    }
}
