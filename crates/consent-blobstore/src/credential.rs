//! Structural check of the pinning credential.
//!
//! Only the shape is checked. Whether the service accepts the token is
//! learned on the first upload.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Whether `token` looks like a JWT: three non-empty dot-separated segments,
/// each valid unpadded base64url.
#[must_use]
pub fn is_structurally_valid_jwt(token: &str) -> bool {
    let segments: Vec<&str> = token.trim().split('.').collect();
    segments.len() == 3
        && segments
            .iter()
            .all(|segment| !segment.is_empty() && URL_SAFE_NO_PAD.decode(segment).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(part: &str) -> String {
        URL_SAFE_NO_PAD.encode(part)
    }

    fn sample_jwt() -> String {
        format!(
            "{}.{}.{}",
            encode(r#"{"alg":"HS256","typ":"JWT"}"#),
            encode(r#"{"sub":"consent-ledger"}"#),
            encode("signature")
        )
    }

    #[test]
    fn test_accepts_well_formed_token() {
        assert!(is_structurally_valid_jwt(&sample_jwt()));
    }

    #[test]
    fn test_rejects_malformed_tokens() {
        assert!(!is_structurally_valid_jwt(""));
        assert!(!is_structurally_valid_jwt("not-a-jwt"));
        assert!(!is_structurally_valid_jwt("a.b"));
        assert!(!is_structurally_valid_jwt("a..c"));
        assert!(!is_structurally_valid_jwt("a.b.c.d"));
        assert!(!is_structurally_valid_jwt("e30.e30.sig+with/padding=="));
    }
}
