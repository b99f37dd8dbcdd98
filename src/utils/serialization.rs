use serde::{de, Deserialize, Deserializer};
use serde_json::Value;

/// Accepts a JSON number or a numeric string ("7" or 7) and yields a `u8`.
///
/// The draw-history endpoint is inconsistent about how it encodes the winning
/// number between pages, so we take either form.
pub(crate) fn de_u8_flexible<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| u8::try_from(n).ok())
            .ok_or_else(|| de::Error::custom(format!("number out of u8 range: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<u8>()
            .map_err(|_| de::Error::custom(format!("could not parse u8 from string: {s}"))),
        other => Err(de::Error::custom(format!(
            "expected number or string, got: {other}"
        ))),
    }
}
