//! Utility functions useful throughout the codebase.

use std::{
    cmp::Ordering,
    fmt::{Debug, Display, Formatter},
};

use ethnum::{I256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Formats a UUID as its first eight hex digits, rather than the full thing.
/// This allows for more-compact printing.
#[must_use]
pub fn clip_uuid(uuid: &Uuid) -> String {
    let string = format!("{uuid}");
    string[0..8].to_string()
}

/// Reinterprets the provided 256-bit word as a two's complement signed value,
/// returning it if it fits in the solver's native 32-bit integers.
#[must_use]
pub fn solver_number(value: U256) -> Option<i32> {
    let signed = I256::from_ne_bytes(value.to_ne_bytes());
    i32::try_from(signed).ok()
}

/// Converts the provided 256-bit word to a `u32` if it fits.
#[must_use]
pub fn small_word(value: U256) -> Option<u32> {
    u32::try_from(value).ok()
}

/// A type alias to make [`U256Wrapper`] easier to type internally.
pub type U256W = U256Wrapper;

/// The `U256Wrapper` is responsible for allowing the serialisation of the
/// [`U256`] type to JSON.
///
/// Values are written as `0x`-prefixed big-endian hex strings.
#[derive(Clone, Copy, Default, Eq, Hash, PartialEq)]
#[repr(transparent)]
pub struct U256Wrapper(pub U256);

impl Debug for U256Wrapper {
    /// The wrapper has absolutely no semantic meaning, so we print the
    /// underlying value for the debug representation.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for U256Wrapper {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

impl PartialOrd for U256Wrapper {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for U256Wrapper {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl From<U256> for U256Wrapper {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<U256Wrapper> for U256 {
    fn from(U256Wrapper(value): U256Wrapper) -> Self {
        value
    }
}

impl From<u128> for U256Wrapper {
    fn from(value: u128) -> Self {
        Self(U256::from(value))
    }
}

impl Serialize for U256Wrapper {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut value = String::from("0x");
        value.push_str(&hex::encode(self.0.to_be_bytes()));

        serializer.serialize_str(&value)
    }
}

impl<'de> Deserialize<'de> for U256Wrapper {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = Deserialize::deserialize(deserializer)?;
        let u256 = U256::from_str_hex(&s).map_err(serde::de::Error::custom)?;
        Ok(U256Wrapper(u256))
    }
}

#[cfg(test)]
mod test {
    use ethnum::U256;

    use crate::utility::{solver_number, small_word, U256Wrapper};

    #[test]
    fn solver_numbers_are_read_as_signed() {
        assert_eq!(solver_number(U256::new(42)), Some(42));
        assert_eq!(solver_number(U256::MAX), Some(-1));
        assert_eq!(solver_number(U256::new(1 << 40)), None);
        assert_eq!(solver_number(U256::MAX - U256::new(1 << 40)), None);
    }

    #[test]
    fn small_words_reject_large_values() {
        assert_eq!(small_word(U256::new(7)), Some(7));
        assert_eq!(small_word(U256::new(u128::from(u32::MAX) + 1)), None);
    }

    #[test]
    fn wrapper_serializes_as_prefixed_hex() -> anyhow::Result<()> {
        let wrapper = U256Wrapper(U256::new(0x2a));
        let json = serde_json::to_string(&wrapper)?;
        assert!(json.starts_with("\"0x"));
        assert!(json.ends_with("2a\""));

        let back: U256Wrapper = serde_json::from_str(&json)?;
        assert_eq!(back, wrapper);

        let short: U256Wrapper = serde_json::from_str("\"0x20\"")?;
        assert_eq!(short.0, U256::new(32));

        Ok(())
    }
}
