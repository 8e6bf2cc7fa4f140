use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded session-token payload.
///
/// Backends disagree on which claims they emit (role claims in particular
/// come under several names), so the payload is kept as an open JSON object
/// and read through accessors rather than a fixed struct.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    pub fn new(claims: Map<String, Value>) -> Self {
        Self(claims)
    }

    /// Raw claim lookup. `null` values are reported as absent.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).filter(|v| !v.is_null())
    }

    /// Expiration, seconds since the Unix epoch.
    ///
    /// Accepts integer or floating point encodings; anything else is absent.
    pub fn exp(&self) -> Option<i64> {
        let value = self.get("exp")?;
        value
            .as_i64()
            .or_else(|| value.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
    }

    /// Expiration in milliseconds since the Unix epoch, keeping any
    /// fractional seconds.
    pub fn exp_millis(&self) -> Option<i64> {
        let value = self.get("exp")?;
        match value.as_i64() {
            Some(secs) => Some(secs.saturating_mul(1000)),
            None => value
                .as_f64()
                .filter(|f| f.is_finite())
                .map(|f| (f * 1000.0) as i64),
        }
    }

    /// Expiration as an instant, if present and representable.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_millis_opt(self.exp_millis()?).single()
    }

    /// Subject identifier, when the issuer provides one.
    pub fn sub(&self) -> Option<&str> {
        self.get("sub").and_then(Value::as_str)
    }

    /// Best-effort display name for the signed-in principal.
    pub fn display_name(&self) -> Option<&str> {
        ["email", "unique_name", "name"]
            .into_iter()
            .find_map(|key| self.get(key).and_then(Value::as_str))
    }

    /// Whether the token is expired at `now`.
    ///
    /// Fails closed: a payload without `exp` is always expired. The boundary
    /// is inclusive (`now >= exp` is expired), compared in milliseconds.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp_millis() {
            Some(exp) => now.timestamp_millis() >= exp,
            None => true,
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Claims {
    fn from(value: Map<String, Value>) -> Self {
        Self(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn claims(value: Value) -> Claims {
        match value {
            Value::Object(map) => Claims::new(map),
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn missing_exp_is_expired() {
        let c = claims(json!({ "sub": "u1" }));
        assert_eq!(c.exp(), None);
        assert!(c.is_expired_at(Utc::now()));
    }

    #[test]
    fn null_exp_is_expired() {
        let c = claims(json!({ "exp": null }));
        assert!(c.is_expired_at(Utc::now()));
    }

    #[test]
    fn future_exp_is_not_expired() {
        let now = Utc::now();
        let c = claims(json!({ "exp": (now + Duration::hours(1)).timestamp() }));
        assert!(!c.is_expired_at(now));
    }

    #[test]
    fn exp_boundary_is_inclusive() {
        let exp = 1_700_000_000i64;
        let c = claims(json!({ "exp": exp }));
        let at = Utc.timestamp_opt(exp, 0).single().unwrap();
        assert!(c.is_expired_at(at));
        assert!(!c.is_expired_at(at - Duration::milliseconds(1)));
    }

    #[test]
    fn float_exp_is_accepted() {
        let c = claims(json!({ "exp": 1_700_000_000.5 }));
        assert_eq!(c.exp(), Some(1_700_000_000));
    }

    #[test]
    fn fractional_exp_keeps_millisecond_boundary() {
        let c = claims(json!({ "exp": 1_700_000_000.5 }));
        let at = |ms: i64| Utc.timestamp_millis_opt(ms).single().unwrap();
        assert_eq!(c.exp_millis(), Some(1_700_000_000_500));
        assert!(!c.is_expired_at(at(1_700_000_000_499)));
        assert!(c.is_expired_at(at(1_700_000_000_500)));
    }

    #[test]
    fn display_name_prefers_email() {
        let c = claims(json!({ "name": "Ann", "email": "ann@example.com" }));
        assert_eq!(c.display_name(), Some("ann@example.com"));
    }
}
