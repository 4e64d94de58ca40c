use std::fmt;

use serde::de::{self, Unexpected};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::value::RawValue;

/// A tag for an image in the registry.
///
/// Deserializes from either a JSON string or a JSON number. Numbers keep the
/// exact text of the literal, so `1.50` becomes `"1.50"`, `1E3` stays `"1E3"`
/// and `7` becomes `"7"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Tag(String);

impl Tag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Tag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for Tag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        let text = raw.get().trim();

        // The raw text is already valid JSON, so its first byte names its kind.
        match text.as_bytes().first() {
            Some(b'-' | b'0'..=b'9') => Ok(Tag(text.to_string())),
            Some(b'"') => serde_json::from_str(text)
                .map(Tag)
                .map_err(de::Error::custom),
            Some(b'n') => Err(de::Error::invalid_type(Unexpected::Unit, &EXPECTED)),
            Some(b't') => Err(de::Error::invalid_type(Unexpected::Bool(true), &EXPECTED)),
            Some(b'f') => Err(de::Error::invalid_type(Unexpected::Bool(false), &EXPECTED)),
            Some(b'[') => Err(de::Error::invalid_type(Unexpected::Seq, &EXPECTED)),
            Some(b'{') => Err(de::Error::invalid_type(Unexpected::Map, &EXPECTED)),
            _ => Err(de::Error::invalid_value(Unexpected::Other(text), &EXPECTED)),
        }
    }
}

const EXPECTED: &str = "a string or number tag";

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(r#""7""#, "7")]
    #[case("7", "7")]
    #[case("42", "42")]
    #[case("1.50", "1.50")]
    #[case("-3", "-3")]
    #[case("1e3", "1e3")]
    #[case("1E3", "1E3")]
    #[case("2.5E+10", "2.5E+10")]
    #[case("0.000", "0.000")]
    #[case("12345678901234567890123", "12345678901234567890123")]
    #[case(r#""v2""#, "v2")]
    #[case(r#"" spaced ""#, " spaced ")]
    #[case(r#""Latest""#, "Latest")]
    fn test_decode_tag(#[case] input: &str, #[case] expected: &str) {
        let tag: Tag = serde_json::from_str(input).expect("decode tag failed");
        assert_eq!(tag.as_str(), expected);
    }

    #[rstest]
    #[case("null")]
    #[case("true")]
    #[case("false")]
    #[case("[]")]
    #[case(r#"["v1"]"#)]
    #[case(r#"{"tag": "v1"}"#)]
    fn test_reject_non_scalar_tag(#[case] input: &str) {
        assert!(serde_json::from_str::<Tag>(input).is_err());
    }

    #[test]
    fn test_string_and_number_are_equivalent() {
        let number: Tag = serde_json::from_str("7").unwrap();
        let string: Tag = serde_json::from_str(r#""7""#).unwrap();
        assert_eq!(number, string);
    }

    #[test]
    fn test_number_tag_in_struct() {
        #[derive(Deserialize)]
        struct Wrapper {
            tag: Option<Tag>,
        }

        let wrapper: Wrapper = serde_json::from_str(r#"{"tag": 1E3 }"#).unwrap();
        assert_eq!(wrapper.tag.unwrap().as_str(), "1E3");

        let wrapper: Wrapper = serde_json::from_str(r#"{"tag": null}"#).unwrap();
        assert!(wrapper.tag.is_none());
    }

    #[test]
    fn test_serialize_as_string() {
        let tag: Tag = serde_json::from_str("42").unwrap();
        assert_eq!(serde_json::to_string(&tag).unwrap(), r#""42""#);
    }
}
