//! Compact JWS issuance for identity-signed claims

use super::errors::{IdentityError, IdentityResult};
use super::keyring::JwtSigner;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as BASE64URL;
use base64::Engine;
use serde_json::{json, Value};
use std::time::{SystemTime, UNIX_EPOCH};

/// Sign `payload` as a JWT issued by `issuer`
///
/// `iss` is always set to `issuer`; `iat` is added when the payload lacks one.
pub fn create_jwt(payload: Value, signer: &JwtSigner, issuer: &str) -> IdentityResult<String> {
    let mut claims = match payload {
        Value::Object(map) => map,
        other => {
            return Err(IdentityError::Serialization(format!(
                "JWT payload must be an object, got {}",
                other
            )))
        }
    };

    if !claims.contains_key("iat") {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| IdentityError::Crypto(e.to_string()))?
            .as_secs();
        claims.insert("iat".to_string(), json!(now));
    }
    claims.insert("iss".to_string(), json!(issuer));

    let header = json!({ "typ": "JWT", "alg": "EdDSA" });
    let signing_input = format!(
        "{}.{}",
        BASE64URL.encode(serde_json::to_vec(&header)?),
        BASE64URL.encode(serde_json::to_vec(&Value::Object(claims))?)
    );
    let signature = signer.sign(signing_input.as_bytes());

    Ok(format!("{}.{}", signing_input, BASE64URL.encode(signature)))
}
