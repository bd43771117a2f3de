use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde::{Deserialize, Serialize};

/// A short-lived bearer token issued by the banking auth service.
///
/// `Debug` never prints the token itself so credentials cannot leak
/// through log fields.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

#[derive(Debug, Deserialize)]
struct Claims {
    sub: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Read the `sub` claim from the JWT payload.
    ///
    /// The signature is not checked; the subject is only used as a display
    /// name and the server remains the authority on the token.
    pub fn subject(&self) -> Option<String> {
        let payload = self.0.split('.').nth(1)?;
        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        let claims: Claims = serde_json::from_slice(&bytes).ok()?;
        claims.sub.filter(|s| !s.is_empty())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg(test)]
pub(crate) fn jwt_with_subject(sub: &str) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"sub":"{}","role":"OFFICER"}}"#, sub));
    format!("{}.{}.signature", header, payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_from_jwt() {
        let credential = Credential::new(jwt_with_subject("teller01"));
        assert_eq!(credential.subject(), Some("teller01".to_string()));
    }

    #[test]
    fn test_subject_tolerates_padding() {
        let token = jwt_with_subject("ab");
        let mut parts: Vec<String> = token.split('.').map(String::from).collect();
        parts[1].push_str("==");
        let credential = Credential::new(parts.join("."));
        assert_eq!(credential.subject(), Some("ab".to_string()));
    }

    #[test]
    fn test_subject_missing_for_opaque_token() {
        assert_eq!(Credential::new("opaque-token").subject(), None);
        assert_eq!(Credential::new("a.!!!.c").subject(), None);
    }

    #[test]
    fn test_debug_is_redacted() {
        let credential = Credential::new("super-secret");
        let printed = format!("{:?}", credential);
        assert!(!printed.contains("super-secret"));
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let json = serde_json::to_string(&Credential::new("T1")).unwrap();
        assert_eq!(json, "\"T1\"");
    }
}
