//! Lenient decoders for the loosely typed values found in host records.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Unexpected, Visitor};
use serde::Deserialize;

use crate::question::{EmbeddedQuestions, Question};

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Accept `true`/`false`, `0`/`1` and their string forms.
pub(crate) fn flexible_bool<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    match RawScalar::deserialize(deserializer)? {
        RawScalar::Bool(value) => Ok(value),
        RawScalar::Int(value) => Ok(value != 0),
        RawScalar::Float(value) => Ok(value != 0.0),
        RawScalar::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => Ok(true),
            "" | "0" | "false" | "no" => Ok(false),
            _ => Err(de::Error::invalid_value(
                Unexpected::Str(&text),
                &"a boolean flag",
            )),
        },
    }
}

/// Accept a number or a numeric string such as `"1.0000000"`.
pub(crate) fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match RawScalar::deserialize(deserializer)? {
        RawScalar::Int(value) => Ok(value as f64),
        RawScalar::Float(value) => Ok(value),
        RawScalar::Text(text) => text
            .trim()
            .parse::<f64>()
            .map_err(|_| de::Error::invalid_value(Unexpected::Str(&text), &"a number")),
        RawScalar::Bool(value) => Err(de::Error::invalid_type(
            Unexpected::Bool(value),
            &"a number",
        )),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawTolerance {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

/// Tolerances that are missing or not numeric count as zero.
pub(crate) fn tolerance<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = match RawTolerance::deserialize(deserializer)? {
        RawTolerance::Number(value) => value,
        RawTolerance::Text(text) => text.trim().parse::<f64>().unwrap_or(0.0),
        RawTolerance::Other(_) => 0.0,
    };
    Ok(if value.is_finite() { value } else { 0.0 })
}

/// Answer text may arrive as a JSON number for numerical questions.
pub(crate) fn text_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<String, D::Error> {
    match RawScalar::deserialize(deserializer)? {
        RawScalar::Text(text) => Ok(text),
        RawScalar::Int(value) => Ok(value.to_string()),
        RawScalar::Float(value) => Ok(value.to_string()),
        RawScalar::Bool(value) => Ok(value.to_string()),
    }
}

/// Collect either a sequence or the values of an id-keyed map, in document order.
pub(crate) fn ordered_values<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct ValuesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for ValuesVisitor<T> {
        type Value = Vec<T>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a list or an id-keyed map")
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut values = Vec::with_capacity(seq.size_hint().unwrap_or(0));
            while let Some(value) = seq.next_element()? {
                values.push(value);
            }
            Ok(values)
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut values = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((_, value)) = map.next_entry::<IgnoredAny, T>()? {
                values.push(value);
            }
            Ok(values)
        }
    }

    deserializer.deserialize_any(ValuesVisitor(PhantomData))
}

impl<'de> Deserialize<'de> for EmbeddedQuestions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EmbeddedVisitor;

        impl<'de> Visitor<'de> for EmbeddedVisitor {
            type Value = EmbeddedQuestions;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map from placeholder key to sub-question")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut questions = EmbeddedQuestions::new();
                while let Some(key) = map.next_key::<PlaceholderKey>()? {
                    let question: Question = map.next_value()?;
                    questions.insert(key.0, question);
                }
                Ok(questions)
            }
        }

        deserializer.deserialize_map(EmbeddedVisitor)
    }
}

/// Placeholder keys are usually numbers but are kept as text.
struct PlaceholderKey(String);

impl<'de> Deserialize<'de> for PlaceholderKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        text_or_number(deserializer).map(PlaceholderKey)
    }
}
