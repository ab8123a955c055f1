//! Gateway Request Signing
//!
//! HMAC-based canonical-request signing for the AI gateway. The remote
//! verifier recomputes the exact same canonical string, so every byte here
//! is part of the contract: query parameters are sorted by raw key before
//! encoding, and the signed header block has a fixed three-line order.
//!
//! Signing is a pure function of its inputs plus a fresh timestamp/nonce
//! pair; nothing is cached or shared, so it is safe to call concurrently.

use std::collections::BTreeMap;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rand::Rng;
use rand::distr::Alphanumeric;
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;

use crate::types::{LingoError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of the random alphanumeric nonce.
const NONCE_LEN: usize = 16;

/// Signed header names in canonical block order. The order is part of the
/// wire contract, not a style choice.
pub const HEADER_APP_ID: &str = "X-AI-GATEWAY-APP-ID";
pub const HEADER_TIMESTAMP: &str = "X-AI-GATEWAY-TIMESTAMP";
pub const HEADER_NONCE: &str = "X-AI-GATEWAY-NONCE";
pub const HEADER_SIGNED_HEADERS: &str = "X-AI-GATEWAY-SIGNED-HEADERS";
pub const HEADER_SIGNATURE: &str = "X-AI-GATEWAY-SIGNATURE";

const SIGNED_HEADERS_VALUE: &str = "x-ai-gateway-app-id;x-ai-gateway-timestamp;x-ai-gateway-nonce";

/// Credentials for the signing gateway.
///
/// The secret is held as a `SecretString` so it never appears in Debug
/// output or logs.
#[derive(Clone)]
pub struct GatewayCredentials {
    pub app_id: String,
    app_key: SecretString,
}

impl std::fmt::Debug for GatewayCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayCredentials")
            .field("app_id", &self.app_id)
            .field("app_key", &"[REDACTED]")
            .finish()
    }
}

impl GatewayCredentials {
    /// Build credentials, rejecting missing values up front so the caller
    /// can skip the signed call path entirely.
    pub fn new(app_id: Option<String>, app_key: Option<String>) -> Result<Self> {
        match (app_id, app_key) {
            (Some(id), Some(key)) if !id.is_empty() && !key.is_empty() => Ok(Self {
                app_id: id,
                app_key: SecretString::from(key),
            }),
            _ => Err(LingoError::CredentialsMissing("ai gateway".to_string())),
        }
    }
}

/// The complete signed header set for one outbound request.
///
/// Created fresh per call and discarded after use; the timestamp and nonce
/// are never reused.
#[derive(Debug, Clone)]
pub struct SignedHeaders {
    pub content_type: &'static str,
    pub app_id: String,
    pub timestamp: String,
    pub nonce: String,
    pub signed_headers: &'static str,
    pub signature: String,
}

impl SignedHeaders {
    /// Header name/value pairs in emit order.
    pub fn pairs(&self) -> [(&'static str, &str); 6] {
        [
            ("Content-Type", self.content_type),
            (HEADER_APP_ID, &self.app_id),
            (HEADER_TIMESTAMP, &self.timestamp),
            (HEADER_NONCE, &self.nonce),
            (HEADER_SIGNED_HEADERS, self.signed_headers),
            (HEADER_SIGNATURE, &self.signature),
        ]
    }
}

/// Sign a request with a freshly generated timestamp and nonce.
pub fn sign(
    credentials: &GatewayCredentials,
    method: &str,
    uri: &str,
    query: &BTreeMap<String, String>,
) -> Result<SignedHeaders> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
        .to_string();
    let nonce: String = rand::rng()
        .sample_iter(Alphanumeric)
        .take(NONCE_LEN)
        .map(char::from)
        .collect();
    sign_with(credentials, method, uri, query, &timestamp, &nonce)
}

/// Sign with explicit timestamp and nonce. Split out so the deterministic
/// parts are testable against reference values.
pub fn sign_with(
    credentials: &GatewayCredentials,
    method: &str,
    uri: &str,
    query: &BTreeMap<String, String>,
    timestamp: &str,
    nonce: &str,
) -> Result<SignedHeaders> {
    let signing_string =
        build_signing_string(method, uri, query, &credentials.app_id, timestamp, nonce);

    let mut mac = HmacSha256::new_from_slice(credentials.app_key.expose_secret().as_bytes())
        .map_err(|e| LingoError::Config(format!("invalid signing key: {e}")))?;
    mac.update(signing_string.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    Ok(SignedHeaders {
        content_type: "application/json",
        app_id: credentials.app_id.clone(),
        timestamp: timestamp.to_string(),
        nonce: nonce.to_string(),
        signed_headers: SIGNED_HEADERS_VALUE,
        signature,
    })
}

/// Build the canonical signing string:
///
/// ```text
/// {METHOD}\n{uri}\n{canonical query}\n{app id}\n{timestamp}\n{header block}
/// ```
///
/// where the header block is the three signed headers, newline-joined, in
/// the order named by [`SIGNED_HEADERS_VALUE`].
fn build_signing_string(
    method: &str,
    uri: &str,
    query: &BTreeMap<String, String>,
    app_id: &str,
    timestamp: &str,
    nonce: &str,
) -> String {
    let header_block = format!(
        "x-ai-gateway-app-id:{app_id}\nx-ai-gateway-timestamp:{timestamp}\nx-ai-gateway-nonce:{nonce}"
    );
    format!(
        "{method}\n{uri}\n{}\n{app_id}\n{timestamp}\n{header_block}",
        canonical_query(query)
    )
}

/// Canonical query string: entries sorted by raw key (BTreeMap ordering),
/// keys and values percent-encoded as URL query components, joined with
/// `&`. An empty map yields the empty string with no stray separators.
fn canonical_query(query: &BTreeMap<String, String>) -> String {
    query
        .iter()
        .map(|(k, v)| format!("{}={}", encode_component(k), encode_component(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Query-component encoding: UTF-8 bytes percent-encoded, space as `+`.
fn encode_component(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_credentials() -> GatewayCredentials {
        GatewayCredentials::new(
            Some("2025765980".to_string()),
            Some("test-secret-key".to_string()),
        )
        .unwrap()
    }

    fn request_query() -> BTreeMap<String, String> {
        BTreeMap::from([("requestId".to_string(), "abc-123".to_string())])
    }

    #[test]
    fn test_golden_signature() {
        // Reference value computed independently with the same canonical
        // string and HMAC-SHA256(base64) over it.
        let headers = sign_with(
            &test_credentials(),
            "POST",
            "/vivogpt/completions",
            &request_query(),
            "1700000000",
            "aJ3kQ9mX2nL7pR5t",
        )
        .unwrap();
        assert_eq!(headers.signature, "sK/MxVOxJmCEAwPmqVxmbxS/7Ug+AB3zW1G0Td79Elg=");
        assert_eq!(headers.app_id, "2025765980");
        assert_eq!(
            headers.signed_headers,
            "x-ai-gateway-app-id;x-ai-gateway-timestamp;x-ai-gateway-nonce"
        );
    }

    #[test]
    fn test_golden_signature_empty_query() {
        let headers = sign_with(
            &test_credentials(),
            "GET",
            "/vivogpt/completions",
            &BTreeMap::new(),
            "1700000000",
            "aJ3kQ9mX2nL7pR5t",
        )
        .unwrap();
        assert_eq!(headers.signature, "RZgGgV79XBGggn7bq2DWzFPe5XRQrZZdfvcmUl5YXrg=");
    }

    #[test]
    fn test_canonical_string_layout() {
        let s = build_signing_string(
            "POST",
            "/vivogpt/completions",
            &request_query(),
            "2025765980",
            "1700000000",
            "aJ3kQ9mX2nL7pR5t",
        );
        assert_eq!(
            s,
            "POST\n/vivogpt/completions\nrequestId=abc-123\n2025765980\n1700000000\n\
             x-ai-gateway-app-id:2025765980\nx-ai-gateway-timestamp:1700000000\n\
             x-ai-gateway-nonce:aJ3kQ9mX2nL7pR5t"
        );
    }

    #[test]
    fn test_empty_query_has_no_stray_separators() {
        assert_eq!(canonical_query(&BTreeMap::new()), "");
        let s = build_signing_string("POST", "/x", &BTreeMap::new(), "id", "1", "n");
        assert!(s.contains("/x\n\nid"));
    }

    #[test]
    fn test_query_encoding() {
        let query = BTreeMap::from([
            ("b key".to_string(), "v 1".to_string()),
            ("a".to_string(), "café".to_string()),
        ]);
        // Sorted by raw key; UTF-8 percent-encoded; space as '+'
        assert_eq!(canonical_query(&query), "a=caf%C3%A9&b+key=v+1");
    }

    #[test]
    fn test_different_nonce_changes_signature() {
        let creds = test_credentials();
        let query = request_query();
        let a = sign_with(&creds, "POST", "/p", &query, "1700000000", "nonceAAAAAAAAAA1").unwrap();
        let b = sign_with(&creds, "POST", "/p", &query, "1700000000", "nonceBBBBBBBBBB2").unwrap();
        let c = sign_with(&creds, "POST", "/p", &query, "1700000001", "nonceAAAAAAAAAA1").unwrap();
        assert_ne!(a.signature, b.signature);
        assert_ne!(a.signature, c.signature);
    }

    #[test]
    fn test_fresh_sign_generates_nonce_and_timestamp() {
        let creds = test_credentials();
        let h = sign(&creds, "POST", "/p", &BTreeMap::new()).unwrap();
        assert_eq!(h.nonce.len(), 16);
        assert!(h.nonce.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(h.timestamp.parse::<u64>().unwrap() > 1_700_000_000);

        // Two consecutive calls must not reuse the nonce
        let h2 = sign(&creds, "POST", "/p", &BTreeMap::new()).unwrap();
        assert_ne!(h.nonce, h2.nonce);
    }

    #[test]
    fn test_missing_credentials_rejected() {
        assert!(GatewayCredentials::new(None, Some("k".into())).is_err());
        assert!(GatewayCredentials::new(Some("id".into()), None).is_err());
        assert!(GatewayCredentials::new(Some(String::new()), Some("k".into())).is_err());
    }

    proptest! {
        /// Inserting the same entries in any order yields an identical
        /// signature: canonicalization sorts internally.
        #[test]
        fn prop_signature_order_independent(
            mut entries in proptest::collection::vec(("[a-zA-Z0-9_]{1,12}", "[ -~]{0,20}"), 0..8)
        ) {
            let creds = test_credentials();
            let forward: BTreeMap<String, String> = entries.iter().cloned().collect();
            entries.reverse();
            let reversed: BTreeMap<String, String> = entries.into_iter().collect();

            let a = sign_with(&creds, "POST", "/p", &forward, "1700000000", "fixedNonce123456").unwrap();
            let b = sign_with(&creds, "POST", "/p", &reversed, "1700000000", "fixedNonce123456").unwrap();
            prop_assert_eq!(a.signature, b.signature);
        }
    }
}
