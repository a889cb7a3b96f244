//! Entity ID type representing a domain.object_id pair

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for invalid entity IDs
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("entity_id must contain exactly one '.' separator")]
    InvalidFormat,

    #[error("domain cannot be empty")]
    EmptyDomain,

    #[error("object_id cannot be empty")]
    EmptyObjectId,

    #[error("domain '{0}' must be lowercase alphanumeric with single underscores")]
    InvalidDomain(String),

    #[error("object_id '{0}' must be lowercase alphanumeric with underscores")]
    InvalidObjectId(String),
}

/// Represents an entity ID (e.g., "binary_sensor.kitchen_proximity")
///
/// Both parts are lowercase alphanumeric with underscores and may not start
/// or end with an underscore. The domain additionally rejects `__`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId {
    domain: String,
    object_id: String,
}

impl EntityId {
    /// Create a new EntityId from domain and object_id parts
    pub fn new(
        domain: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Result<Self, EntityIdError> {
        let domain = domain.into();
        let object_id = object_id.into();

        if domain.is_empty() {
            return Err(EntityIdError::EmptyDomain);
        }
        if object_id.is_empty() {
            return Err(EntityIdError::EmptyObjectId);
        }
        if domain.contains("__") || !is_slug(&domain) {
            return Err(EntityIdError::InvalidDomain(domain));
        }
        if !is_slug(&object_id) {
            return Err(EntityIdError::InvalidObjectId(object_id));
        }

        Ok(Self { domain, object_id })
    }

    /// Build an entity ID by slugifying a display name
    ///
    /// `("binary_sensor", "Kitchen Battery charging")` becomes
    /// `binary_sensor.kitchen_battery_charging`.
    pub fn from_name(domain: impl Into<String>, name: &str) -> Result<Self, EntityIdError> {
        Self::new(domain, slugify(name))
    }

    /// Get the domain part of the entity ID
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Get the object_id part of the entity ID
    pub fn object_id(&self) -> &str {
        &self.object_id
    }

    /// Return a copy of this ID with `_{n}` appended to the object_id
    pub fn with_suffix(&self, n: usize) -> Self {
        Self {
            domain: self.domain.clone(),
            object_id: format!("{}_{}", self.object_id, n),
        }
    }
}

fn is_slug(s: &str) -> bool {
    !s.starts_with('_')
        && !s.ends_with('_')
        && s
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}

/// Turn arbitrary text into an object_id-safe slug
///
/// Non-ASCII letters are transliterated (`Køkken` becomes `kokken`) and
/// runs of separators collapse into a single underscore. Text with no
/// usable characters slugs to `"unknown"`.
pub fn slugify(text: &str) -> String {
    let slug = slug::slugify(text).replace('-', "_");
    if slug.is_empty() {
        "unknown".to_string()
    } else {
        slug
    }
}

impl FromStr for EntityId {
    type Err = EntityIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('.') {
            Some((domain, object_id)) if !object_id.contains('.') => Self::new(domain, object_id),
            _ => Err(EntityIdError::InvalidFormat),
        }
    }
}

impl TryFrom<String> for EntityId {
    type Error = EntityIdError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> String {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.domain, self.object_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entity_id() {
        let id: EntityId = "binary_sensor.living_room_proximity".parse().unwrap();
        assert_eq!(id.domain(), "binary_sensor");
        assert_eq!(id.object_id(), "living_room_proximity");
        assert_eq!(id.to_string(), "binary_sensor.living_room_proximity");
    }

    #[test]
    fn test_invalid_format() {
        assert_eq!(
            "no_separator".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
        assert_eq!(
            "too.many.parts".parse::<EntityId>().unwrap_err(),
            EntityIdError::InvalidFormat
        );
        assert_eq!(
            ".object".parse::<EntityId>().unwrap_err(),
            EntityIdError::EmptyDomain
        );
    }

    #[test]
    fn test_invalid_chars() {
        assert!(matches!(
            "Binary_Sensor.x".parse::<EntityId>(),
            Err(EntityIdError::InvalidDomain(_))
        ));
        assert!(matches!(
            "binary__sensor.x".parse::<EntityId>(),
            Err(EntityIdError::InvalidDomain(_))
        ));
        assert!(matches!(
            "sensor._x".parse::<EntityId>(),
            Err(EntityIdError::InvalidObjectId(_))
        ));
        // Double underscores are allowed in the object_id
        assert!("sensor.my__room".parse::<EntityId>().is_ok());
    }

    #[test]
    fn test_slugify() {
        assert_eq!(
            slugify("Beosound Balance Battery charging"),
            "beosound_balance_battery_charging"
        );
        assert_eq!(slugify("  Kitchen -- A9  "), "kitchen_a9");
        assert_eq!(slugify("Ærø proximity"), "aero_proximity");
        assert_eq!(slugify("Køkken Højttaler"), "kokken_hojttaler");
        assert_eq!(slugify("!!!"), "unknown");
    }

    #[test]
    fn test_from_name_and_suffix() {
        let id = EntityId::from_name("binary_sensor", "Kitchen proximity").unwrap();
        assert_eq!(id.to_string(), "binary_sensor.kitchen_proximity");
        assert_eq!(
            id.with_suffix(2).to_string(),
            "binary_sensor.kitchen_proximity_2"
        );
    }

    #[test]
    fn test_serde_as_string() {
        let id = EntityId::new("binary_sensor", "kitchen").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"binary_sensor.kitchen\"");
        assert_eq!(serde_json::from_str::<EntityId>(&json).unwrap(), id);
    }
}
