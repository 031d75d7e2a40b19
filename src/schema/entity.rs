// SPDX-License-Identifier: Apache-2.0

//! Entity identifiers
//!
//! The set of entities is closed. Names coming from callers are parsed
//! leniently (`players`, `Player`, `calendar_events` ...) and anything that
//! does not match lands in [`EntityRef::Unknown`].

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Known application entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    Tenant,
    User,
    Player,
    Trial,
    CalendarEvent,
    Team,
    TrialEvaluation,
    PlayerTeam,
    TenantMember,
}

impl Entity {
    pub const ALL: [Entity; 9] = [
        Entity::Tenant,
        Entity::User,
        Entity::Player,
        Entity::Trial,
        Entity::CalendarEvent,
        Entity::Team,
        Entity::TrialEvaluation,
        Entity::PlayerTeam,
        Entity::TenantMember,
    ];

    /// Canonical model name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tenant => "tenant",
            Self::User => "user",
            Self::Player => "player",
            Self::Trial => "trial",
            Self::CalendarEvent => "calendarEvent",
            Self::Team => "team",
            Self::TrialEvaluation => "trialEvaluation",
            Self::PlayerTeam => "playerTeam",
            Self::TenantMember => "tenantMember",
        }
    }

    /// Parses a model or table name. Case, separators and a plural `s` are ignored.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            return None;
        }

        let find = |candidate: &str| {
            Self::ALL
                .iter()
                .copied()
                .find(|entity| normalize(entity.name()) == candidate)
        };

        find(normalized.as_str()).or_else(|| normalized.strip_suffix('s').and_then(find))
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn normalize(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Entity named by a call site: either known, or an unrecognized name kept verbatim
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Known(Entity),
    Unknown(String),
}

impl EntityRef {
    pub fn parse(raw: &str) -> Self {
        match Entity::parse(raw) {
            Some(entity) => Self::Known(entity),
            None => Self::Unknown(raw.to_string()),
        }
    }

    pub fn known(&self) -> Option<Entity> {
        match self {
            Self::Known(entity) => Some(*entity),
            Self::Unknown(_) => None,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Known(entity) => entity.name(),
            Self::Unknown(name) => name,
        }
    }
}

impl From<Entity> for EntityRef {
    fn from(entity: Entity) -> Self {
        Self::Known(entity)
    }
}

impl From<&str> for EntityRef {
    fn from(raw: &str) -> Self {
        Self::parse(raw)
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for EntityRef {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for EntityRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(|raw| EntityRef::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plural_and_table_names() {
        assert_eq!(Entity::parse("players"), Some(Entity::Player));
        assert_eq!(Entity::parse("Player"), Some(Entity::Player));
        assert_eq!(Entity::parse("calendar_events"), Some(Entity::CalendarEvent));
        assert_eq!(Entity::parse("PlayerTeam"), Some(Entity::PlayerTeam));
        assert_eq!(Entity::parse("tenant_members"), Some(Entity::TenantMember));
    }

    #[test]
    fn unrecognized_names_are_kept() {
        let entity = EntityRef::parse("avatarBlobs");
        assert_eq!(entity, EntityRef::Unknown("avatarBlobs".to_string()));
        assert_eq!(entity.name(), "avatarBlobs");
        assert!(Entity::parse("").is_none());
    }

    #[test]
    fn serializes_as_canonical_name() {
        let json = serde_json::to_string(&EntityRef::parse("trials")).unwrap();
        assert_eq!(json, "\"trial\"");

        let parsed: EntityRef = serde_json::from_str("\"calendarEvents\"").unwrap();
        assert_eq!(parsed, EntityRef::Known(Entity::CalendarEvent));
    }
}
