use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrStr {
    Number(f64),
    Str(String),
}

/// Accepts `1.5` as well as `"1.5"`.
pub fn f64_from_number_or_str<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrStr::deserialize(deserializer)? {
        NumberOrStr::Number(value) => Ok(value),
        NumberOrStr::Str(raw) => raw.trim().parse::<f64>().map_err(|_| {
            de::Error::invalid_value(Unexpected::Str(&raw), &"a number or a numeric string")
        }),
    }
}
