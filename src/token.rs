//! Identity token claims extraction.

/// Claims carried by the caller's identity token.
///
/// Only the payload segment is decoded; signature and expiry are NOT verified
/// here. The raw token is forwarded as a login assertion to the federated
/// identity exchange, which is the party that actually validates it.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct IdentityClaims {
    #[serde(rename = "sub")]
    pub subject: String,
    pub email: String,
}

impl IdentityClaims {
    pub fn decode(token: &str) -> Result<Self, crate::error::Error> {
        use base64ct::Encoding;

        let segments: Vec<&str> = token.split('.').collect();
        if segments.len() != 3 {
            return Err(crate::error::Error::MalformedToken(format!(
                "expected a three-segment compact token, got {} segment(s)",
                segments.len()
            )));
        }

        // Some issuers pad the payload segment; base64url in tokens is
        // canonically unpadded.
        let payload = base64ct::Base64UrlUnpadded::decode_vec(segments[1].trim_end_matches('='))
            .map_err(|_| {
                crate::error::Error::MalformedToken(
                    "token payload is not valid base64url".to_string(),
                )
            })?;

        serde_json::from_slice(&payload).map_err(|e| {
            crate::error::Error::MalformedToken(format!(
                "token payload is not a valid claim set: {e}"
            ))
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode() {
        let token = crate::dev::encode_token(&serde_json::json!({
            "sub": "user-123",
            "email": "a@b.com",
            "aud": "client-id",
            "exp": 1893456000u64,
        }));
        let claims = IdentityClaims::decode(&token).unwrap();
        assert_eq!(claims.subject, "user-123");
        assert_eq!(claims.email, "a@b.com");
    }

    #[test]
    fn test_decode_padded_payload() {
        let token = crate::dev::encode_token(&serde_json::json!({
            "sub": "user-123",
            "email": "a@b.com",
        }));
        let (head, rest) = token.split_once('.').unwrap();
        let (payload, signature) = rest.split_once('.').unwrap();
        let token = format!("{head}.{payload}==.{signature}");
        let claims = IdentityClaims::decode(&token).unwrap();
        assert_eq!(claims.subject, "user-123");
    }

    #[test]
    fn test_decode_wrong_segment_count() {
        assert!(matches!(
            IdentityClaims::decode("onlyonesegment"),
            Err(crate::error::Error::MalformedToken(_))
        ));
        assert!(matches!(
            IdentityClaims::decode("two.segments"),
            Err(crate::error::Error::MalformedToken(_))
        ));
        assert!(matches!(
            IdentityClaims::decode("a.b.c.d"),
            Err(crate::error::Error::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert!(matches!(
            IdentityClaims::decode("aGVhZGVy.~~~.c2ln"),
            Err(crate::error::Error::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_payload_not_json() {
        use base64ct::Encoding;
        let payload = base64ct::Base64UrlUnpadded::encode_string(b"not json");
        assert!(matches!(
            IdentityClaims::decode(&format!("aGVhZGVy.{payload}.c2ln")),
            Err(crate::error::Error::MalformedToken(_))
        ));
    }

    #[test]
    fn test_decode_missing_claims() {
        let token = crate::dev::encode_token(&serde_json::json!({"sub": "user-123"}));
        assert!(matches!(
            IdentityClaims::decode(&token),
            Err(crate::error::Error::MalformedToken(_))
        ));

        let token = crate::dev::encode_token(&serde_json::json!({"email": "a@b.com"}));
        assert!(matches!(
            IdentityClaims::decode(&token),
            Err(crate::error::Error::MalformedToken(_))
        ));
    }
}
