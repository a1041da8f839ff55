//! Wire-level event shapes shared by the HTTP surface and the Hub.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Facts attached to a submitted viewer event. Everything beyond the
/// username is optional; the resolver reads what it needs. Callers are
/// loose about JSON types, so tier and amount accept both strings and
/// numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventFacts {
    pub username: Option<String>,
    #[serde(alias = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_stringish")]
    pub tier: Option<String>,
    pub message: Option<String>,
    #[serde(
        default,
        alias = "customValue",
        deserialize_with = "de_opt_stringish"
    )]
    pub custom_value: Option<String>,
}

/// A message received from a connected client. Known events are looked
/// up in the namespace dispatch table; unknown ones are dropped. The
/// payload stays opaque JSON so the Hub never needs to understand it.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Accept a JSON string or number and stringify it.
pub fn de_opt_stringish<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}

/// Accept a JSON number or a numeric string.
pub fn de_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .parse::<f64>()
            .map(Some)
            .map_err(|_| serde::de::Error::custom(format!("not a number: {s:?}"))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected number, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn facts_accept_both_naming_styles() {
        let facts: EventFacts =
            serde_json::from_str(r#"{"displayName":"Alice","customValue":"x"}"#).unwrap();
        assert_eq!(facts.display_name.as_deref(), Some("Alice"));
        assert_eq!(facts.custom_value.as_deref(), Some("x"));

        let facts: EventFacts =
            serde_json::from_str(r#"{"display_name":"Bob","amount":12.5}"#).unwrap();
        assert_eq!(facts.display_name.as_deref(), Some("Bob"));
        assert_eq!(facts.amount, Some(12.5));
    }

    #[test]
    fn tier_and_amount_accept_numbers_and_strings() {
        let facts: EventFacts =
            serde_json::from_str(r#"{"tier":3,"amount":"500"}"#).unwrap();
        assert_eq!(facts.tier.as_deref(), Some("3"));
        assert_eq!(facts.amount, Some(500.0));

        assert!(serde_json::from_str::<EventFacts>(r#"{"amount":"lots"}"#).is_err());
        assert!(serde_json::from_str::<EventFacts>(r#"{"tier":[3]}"#).is_err());
    }

    #[test]
    fn client_message_defaults_data_to_null() {
        let msg: ClientMessage = serde_json::from_str(r#"{"event":"alert:done"}"#).unwrap();
        assert_eq!(msg.event, "alert:done");
        assert!(msg.data.is_null());
    }
}
