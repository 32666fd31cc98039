use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CommonError;

const MIN_LEN: usize = 3;
const MAX_LEN: usize = 20;

/// A validated station identifier: 3-20 characters, letters/digits/hyphens
/// only, and never leading or trailing with a hyphen.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct StationId(String);

impl StationId {
    /// Validates and constructs a station id from its string form.
    pub fn new(value: impl Into<String>) -> Result<Self, CommonError> {
        let value = value.into();
        Self::validate(&value)?;
        Ok(Self(value))
    }

    /// Returns the identifier as a plain string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(value: &str) -> Result<(), CommonError> {
        if value.len() < MIN_LEN || value.len() > MAX_LEN {
            return Err(CommonError::InvalidStationId(format!(
                "station id must be {MIN_LEN}-{MAX_LEN} characters, got {}",
                value.len()
            )));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-')
        {
            return Err(CommonError::InvalidStationId(
                "station id may only contain letters, digits, and hyphens".into(),
            ));
        }
        if value.starts_with('-') || value.ends_with('-') {
            return Err(CommonError::InvalidStationId(
                "station id may not start or end with a hyphen".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for StationId {
    type Err = CommonError;

    fn from_str(src: &str) -> Result<Self, Self::Err> {
        Self::new(src)
    }
}

impl TryFrom<String> for StationId {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<StationId> for String {
    fn from(id: StationId) -> Self {
        id.0
    }
}

impl AsRef<str> for StationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_ids() {
        assert!(StationId::new("alpha-1").is_ok());
        assert!(StationId::new("abc").is_ok());
        assert!(StationId::new("a".repeat(20)).is_ok());
    }

    #[test]
    fn rejects_out_of_range_length() {
        assert!(StationId::new("ab").is_err());
        assert!(StationId::new("a".repeat(21)).is_err());
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(StationId::new("alpha_1").is_err());
        assert!(StationId::new("alpha 1").is_err());
    }

    #[test]
    fn rejects_leading_or_trailing_hyphen() {
        assert!(StationId::new("-alpha").is_err());
        assert!(StationId::new("alpha-").is_err());
    }

    #[test]
    fn serde_round_trip() {
        let id = StationId::new("field-7").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"field-7\"");
        let back: StationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
