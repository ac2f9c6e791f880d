//! Token inspection: expiry checks and payload decoding.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration, Utc};
use serde_json::Value;

/// Reads meaning out of an otherwise opaque access token.
///
/// Both methods return `None` when the token cannot be judged, which callers
/// must read as "unknown", never as "not expired".
pub trait TokenInspector: Send + Sync {
    fn is_expired(&self, token: &str) -> Option<bool>;
    fn payload(&self, token: &str) -> Option<Value>;
}

/// Inspector for JSON Web Tokens. Opaque (non-JWT) tokens yield `None`.
#[derive(Debug, Clone)]
pub struct JwtInspector {
    expiry_margin: Duration,
}

impl Default for JwtInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtInspector {
    pub fn new() -> Self {
        Self {
            expiry_margin: Duration::zero(),
        }
    }

    /// Treat tokens as expired `secs` seconds before their `exp` claim.
    pub fn with_expiry_margin_secs(mut self, secs: i64) -> Self {
        self.expiry_margin = Duration::seconds(secs);
        self
    }
}

impl TokenInspector for JwtInspector {
    fn is_expired(&self, token: &str) -> Option<bool> {
        let payload = decode_jwt_payload(token)?;
        let exp = payload.get("exp")?;
        let exp = exp.as_i64().or_else(|| exp.as_f64().map(|v| v as i64))?;
        let deadline = Utc::now() + self.expiry_margin;
        Some(deadline.timestamp() >= exp)
    }

    fn payload(&self, token: &str) -> Option<Value> {
        decode_jwt_payload(token)
    }
}

fn decode_jwt_payload(token: &str) -> Option<Value> {
    let mut segments = token.split('.');
    let (_header, payload, _signature) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice::<Value>(&bytes)
        .ok()
        .filter(Value::is_object)
}
