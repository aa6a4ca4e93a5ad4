use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_NAME: &str = "Alex";
const DEFAULT_RELATIONSHIP: &str = "caring and supportive AI companion";
const DEFAULT_PERSONALITY: &str = "Warm, empathetic, and genuinely caring.";

/// The companion's configuration: display name, relationship framing and
/// personality description.
///
/// The backend owns the record; the client only holds a working copy while
/// the settings form is open and always submits it wholesale.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Persona {
    /// Display name of the companion.
    pub name: String,
    /// How the companion relates to the user.
    pub relationship: String,
    /// Free-form personality description.
    pub personality: String,
}

impl Persona {
    /// Creates a new persona.
    pub fn new(
        name: impl Into<String>,
        relationship: impl Into<String>,
        personality: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            relationship: relationship.into(),
            personality: personality.into(),
        }
    }

    /// Returns the value of one field.
    pub fn get(&self, field: PersonaField) -> &str {
        match field {
            PersonaField::Name => &self.name,
            PersonaField::Relationship => &self.relationship,
            PersonaField::Personality => &self.personality,
        }
    }

    /// Replaces the value of one field.
    pub fn set(&mut self, field: PersonaField, value: impl Into<String>) {
        let value = value.into();
        match field {
            PersonaField::Name => self.name = value,
            PersonaField::Relationship => self.relationship = value,
            PersonaField::Personality => self.personality = value,
        }
    }

    /// Checks every field against the backend's column limits.
    pub fn validate(&self) -> Result<()> {
        for field in PersonaField::ALL {
            let len = self.get(field).chars().count();
            let max = field.max_len();
            if len > max {
                return Err(Error::validation(
                    format!("{field} must be at most {max} characters (got {len})"),
                    Some(field.to_string()),
                ));
            }
        }
        Ok(())
    }
}

impl Default for Persona {
    fn default() -> Self {
        Self::new(DEFAULT_NAME, DEFAULT_RELATIONSHIP, DEFAULT_PERSONALITY)
    }
}

/// One editable field of a [`Persona`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PersonaField {
    /// The display name.
    Name,
    /// The relationship framing.
    Relationship,
    /// The personality description.
    Personality,
}

impl PersonaField {
    /// Every field, in form order.
    pub const ALL: [PersonaField; 3] = [
        PersonaField::Name,
        PersonaField::Relationship,
        PersonaField::Personality,
    ];

    /// Maximum length in characters accepted by the backend.
    pub fn max_len(&self) -> usize {
        match self {
            PersonaField::Name => 50,
            PersonaField::Relationship => 100,
            PersonaField::Personality => 500,
        }
    }
}

impl fmt::Display for PersonaField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PersonaField::Name => f.write_str("name"),
            PersonaField::Relationship => f.write_str("relationship"),
            PersonaField::Personality => f.write_str("personality"),
        }
    }
}

impl FromStr for PersonaField {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "name" => Ok(PersonaField::Name),
            "relationship" => Ok(PersonaField::Relationship),
            "personality" => Ok(PersonaField::Personality),
            _ => Err(format!(
                "Unknown persona field: {s}. Valid fields: name, relationship, personality"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_backend_defaults() {
        let persona = Persona::default();
        assert_eq!(persona.name, "Alex");
        assert_eq!(persona.relationship, "caring and supportive AI companion");
        assert!(persona.validate().is_ok());
    }

    #[test]
    fn set_and_get_fields() {
        let mut persona = Persona::default();
        persona.set(PersonaField::Name, "Nova");
        persona.set(PersonaField::Personality, "warm");
        assert_eq!(persona.get(PersonaField::Name), "Nova");
        assert_eq!(persona.get(PersonaField::Personality), "warm");
        assert_eq!(persona.get(PersonaField::Relationship), persona.relationship);
    }

    #[test]
    fn validate_rejects_long_name() {
        let persona = Persona::new("x".repeat(51), "friend", "warm");
        let err = persona.validate().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn validate_counts_characters_not_bytes() {
        let persona = Persona::new("é".repeat(50), "friend", "warm");
        assert!(persona.validate().is_ok());
    }

    #[test]
    fn parse_field_names() {
        assert_eq!("Name".parse::<PersonaField>(), Ok(PersonaField::Name));
        assert_eq!(
            "relationship".parse::<PersonaField>(),
            Ok(PersonaField::Relationship)
        );
        assert!("mood".parse::<PersonaField>().is_err());
    }

    #[test]
    fn wire_format() {
        let persona = Persona::new("Nova", "friend", "warm");
        let json = serde_json::to_value(&persona).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "Nova", "relationship": "friend", "personality": "warm"})
        );
    }
}
