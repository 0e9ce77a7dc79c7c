//! Priority classification for notifications
//!
//! Producers attach a `Priority` to each notification. The tray backend uses it
//! to pick a fallback icon when the entity carries no pixmap of its own:
//! - INFO: `dialog-information`
//! - WARNING: `dialog-warning`
//! - CRITICAL: `dialog-error`

use crate::entity::{keys, Entity, Variant};

/// Priority level for notifications
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub enum Priority {
    #[default]
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Info => "INFO",
            Priority::Warning => "WARNING",
            Priority::Critical => "CRITICAL",
        }
    }

    /// Themed icon used when a notification has no pixmap
    pub fn icon_name(&self) -> &'static str {
        match self {
            Priority::Info => "dialog-information",
            Priority::Warning => "dialog-warning",
            Priority::Critical => "dialog-error",
        }
    }

    fn from_index(index: i64) -> Priority {
        match index {
            1 => Priority::Warning,
            2 => Priority::Critical,
            _ => Priority::Info,
        }
    }
}

/// Normalize a priority name (case-insensitive, underscores ignored)
fn normalize_priority(name: &str) -> String {
    name.to_lowercase().replace('_', "")
}

/// Parse a priority from its name
///
/// Unknown names fall back to `Info`, the same as a missing priority.
pub fn parse_priority(name: &str) -> Priority {
    match normalize_priority(name).as_str() {
        "warning" | "warn" => Priority::Warning,
        "critical" | "error" => Priority::Critical,
        _ => Priority::Info,
    }
}

/// Read the priority from an entity
///
/// Accepts either a numeric index (0 = info, 1 = warning, 2 = critical) or a name.
pub fn get_priority(entity: &Entity) -> Priority {
    match entity.get(keys::PRIORITY) {
        Some(Variant::Int(index)) => Priority::from_index(*index),
        Some(Variant::String(name)) => parse_priority(name),
        Some(other) => other.as_i64().map(Priority::from_index).unwrap_or_default(),
        None => Priority::Info,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{mime, Payload};

    #[test]
    fn test_parse_priority() {
        assert_eq!(parse_priority("Warning"), Priority::Warning);
        assert_eq!(parse_priority("CRITICAL"), Priority::Critical);
        assert_eq!(parse_priority("error"), Priority::Critical);
        assert_eq!(parse_priority("info"), Priority::Info);
        assert_eq!(parse_priority("something_else"), Priority::Info);
    }

    #[test]
    fn test_get_priority_from_index() {
        let entity = Entity::new(Payload::Empty, mime::NOTIFICATION).with(keys::PRIORITY, 2);
        assert_eq!(get_priority(&entity), Priority::Critical);

        let entity = Entity::new(Payload::Empty, mime::NOTIFICATION).with(keys::PRIORITY, 1);
        assert_eq!(get_priority(&entity), Priority::Warning);
    }

    #[test]
    fn test_get_priority_missing() {
        let entity = Entity::new(Payload::Empty, mime::NOTIFICATION);
        assert_eq!(get_priority(&entity), Priority::Info);
    }

    #[test]
    fn test_icon_name() {
        assert_eq!(Priority::Info.icon_name(), "dialog-information");
        assert_eq!(Priority::Warning.icon_name(), "dialog-warning");
        assert_eq!(Priority::Critical.icon_name(), "dialog-error");
    }

    #[test]
    fn test_priority_display() {
        assert_eq!(format!("{}", Priority::Warning), "WARNING");
        assert_eq!(Priority::Critical.as_str(), "CRITICAL");
    }
}
