/// OAuth 1.0a request signing
///
/// Posting on behalf of the bot account needs user-context credentials. The
/// X API accepts OAuth 1.0a HMAC-SHA1 signatures for `POST /2/tweets`; JSON
/// bodies are not part of the signature base string, so only the oauth
/// parameters and any query parameters are signed.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::config::TwitterCredentials;
use crate::error::{BotError, BotResult};

type HmacSha1 = Hmac<Sha1>;

/// Per-request values that must be unique (nonce) or current (timestamp)
#[derive(Debug, Clone)]
pub struct OAuthNonce {
    pub nonce: String,
    pub timestamp: i64,
}

impl OAuthNonce {
    pub fn generate() -> Self {
        Self {
            nonce: uuid::Uuid::new_v4().simple().to_string(),
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// RFC 3986 percent-encoding as required by RFC 5849
fn encode(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Build the signature base string and sign it with the consumer and token secrets
pub fn sign(
    method: &str,
    url: &str,
    params: &[(String, String)],
    consumer_secret: &str,
    token_secret: &str,
) -> BotResult<String> {
    let mut encoded: Vec<(String, String)> = params
        .iter()
        .map(|(k, v)| (encode(k), encode(v)))
        .collect();
    encoded.sort();

    let param_string = encoded
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_uppercase(),
        encode(url),
        encode(&param_string)
    );
    let key = format!("{}&{}", encode(consumer_secret), encode(token_secret));

    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| BotError::Signing(e.to_string()))?;
    mac.update(base.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Produce the `Authorization` header value for a request
pub fn authorization_header(
    credentials: &TwitterCredentials,
    method: &str,
    url: &str,
    query: &[(String, String)],
    nonce: &OAuthNonce,
) -> BotResult<String> {
    let mut oauth_params = vec![
        ("oauth_consumer_key".to_string(), credentials.api_key.clone()),
        ("oauth_nonce".to_string(), nonce.nonce.clone()),
        ("oauth_signature_method".to_string(), "HMAC-SHA1".to_string()),
        ("oauth_timestamp".to_string(), nonce.timestamp.to_string()),
        ("oauth_token".to_string(), credentials.access_token.clone()),
        ("oauth_version".to_string(), "1.0".to_string()),
    ];

    let mut signed = oauth_params.clone();
    signed.extend_from_slice(query);
    let signature = sign(
        method,
        url,
        &signed,
        &credentials.api_secret,
        &credentials.access_token_secret,
    )?;
    oauth_params.push(("oauth_signature".to_string(), signature));

    let fields = oauth_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!("OAuth {}", fields))
}
