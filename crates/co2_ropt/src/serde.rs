use std::fmt;

use serde::{
    de::{self, Visitor},
    Deserialize, Serialize,
};

use crate::types::FixedString;

impl<const N: usize> Serialize for FixedString<N> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string_lossy())
    }
}

struct FixedStringVisitor<const N: usize>;

impl<'de, const N: usize> Visitor<'de> for FixedStringVisitor<N> {
    type Value = FixedString<N>;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        write!(formatter, "a string of at most {} bytes", N - 1)
    }

    fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        FixedString::try_from(value).map_err(E::custom)
    }
}

impl<'de, const N: usize> Deserialize<'de> for FixedString<N> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(FixedStringVisitor::<N>)
    }
}
