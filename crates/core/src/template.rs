//! Template lifecycle rules.
//!
//! A template moves `DRAFT -> ACTIVE <-> INACTIVE`; snapshots can be taken
//! from any of those states and restored only into a new draft. Published
//! templates are never deleted.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

// ---------------------------------------------------------------------------
// Limits
// ---------------------------------------------------------------------------

/// Maximum length of a template key.
pub const MAX_TEMPLATE_KEY_LENGTH: usize = 128;

/// Maximum length of a template or snapshot name.
pub const MAX_TEMPLATE_NAME_LENGTH: usize = 200;

/// Maximum size of a process document in bytes (5 MB).
pub const MAX_CONTENT_SIZE: usize = 5_000_000;

/// Infix joining the original key and the uniqueness suffix of a restored draft.
pub const RESTORE_KEY_INFIX: &str = "_restore_";

/// Template keys follow XML NCName rules closely enough to be used as a
/// process definition id: a letter or underscore, then letters, digits,
/// `_`, `-` or `.`.
static TEMPLATE_KEY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a template record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateStatus {
    Draft,
    Active,
    Inactive,
}

impl TemplateStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TemplateStatus::Draft => "DRAFT",
            TemplateStatus::Active => "ACTIVE",
            TemplateStatus::Inactive => "INACTIVE",
        }
    }

    /// Whether this is one of the published states.
    pub fn is_published(self) -> bool {
        matches!(self, TemplateStatus::Active | TemplateStatus::Inactive)
    }
}

impl fmt::Display for TemplateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TemplateStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(TemplateStatus::Draft),
            "ACTIVE" => Ok(TemplateStatus::Active),
            "INACTIVE" => Ok(TemplateStatus::Inactive),
            other => Err(CoreError::Validation(format!(
                "Unknown template status: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for TemplateStatus {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Which collection a snapshot is captured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceKind {
    Draft,
    Published,
}

impl FromStr for SourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(SourceKind::Draft),
            "PUBLISHED" => Ok(SourceKind::Published),
            _ => Err(CoreError::InvalidSourceKind(s.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Transition guards
// ---------------------------------------------------------------------------

/// Check that a published template may be suspended.
pub fn ensure_suspendable(
    id: DbId,
    status: TemplateStatus,
    running_instance_count: i32,
) -> Result<(), CoreError> {
    if status != TemplateStatus::Active {
        return Err(CoreError::NotActive(id));
    }
    if running_instance_count > 0 {
        return Err(CoreError::HasRunningInstances {
            count: running_instance_count,
        });
    }
    Ok(())
}

/// Check that a published template may be re-activated.
pub fn ensure_activatable(id: DbId, status: TemplateStatus) -> Result<(), CoreError> {
    if status != TemplateStatus::Inactive {
        return Err(CoreError::NotInactive(id));
    }
    Ok(())
}

/// Check engine-reported instance counters for consistency.
pub fn validate_instance_counts(instance_count: i32, running: i32) -> Result<(), CoreError> {
    if instance_count < 0 || running < 0 {
        return Err(CoreError::Validation(
            "Instance counts must not be negative".to_string(),
        ));
    }
    if running > instance_count {
        return Err(CoreError::Validation(format!(
            "Running instances ({running}) cannot exceed total instances ({instance_count})"
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Keys and versions
// ---------------------------------------------------------------------------

/// Validate a caller-chosen template key.
pub fn validate_template_key(key: &str) -> Result<(), CoreError> {
    if key.is_empty() {
        return Err(CoreError::Validation(
            "Template key must not be empty".to_string(),
        ));
    }
    if key.len() > MAX_TEMPLATE_KEY_LENGTH {
        return Err(CoreError::Validation(format!(
            "Template key exceeds {MAX_TEMPLATE_KEY_LENGTH} characters"
        )));
    }
    if !TEMPLATE_KEY_RE.is_match(key) {
        return Err(CoreError::Validation(format!(
            "Template key '{key}' must start with a letter or underscore and contain only \
             letters, digits, '_', '-' or '.'"
        )));
    }
    Ok(())
}

/// Validate a template or snapshot display name.
pub fn validate_template_name(name: &str) -> Result<(), CoreError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CoreError::Validation("Name must not be empty".to_string()));
    }
    if trimmed.len() > MAX_TEMPLATE_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "Name exceeds {MAX_TEMPLATE_NAME_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Next number in a per-key sequence given the current maximum.
pub fn next_version(current_max: Option<i32>) -> i32 {
    current_max.unwrap_or(0) + 1
}

/// Key for a draft restored from a snapshot of `original_key`.
///
/// `attempt` 0 yields `{key}_restore_{suffix}`; later attempts append a
/// counter so callers can retry after a collision.
pub fn restore_key(original_key: &str, suffix: i64, attempt: u32) -> String {
    if attempt == 0 {
        format!("{original_key}{RESTORE_KEY_INFIX}{suffix}")
    } else {
        format!("{original_key}{RESTORE_KEY_INFIX}{suffix}_{attempt}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::new_id;
    use assert_matches::assert_matches;

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            TemplateStatus::Draft,
            TemplateStatus::Active,
            TemplateStatus::Inactive,
        ] {
            assert_eq!(status.as_str().parse::<TemplateStatus>().unwrap(), status);
        }
        assert!("archived".parse::<TemplateStatus>().is_err());
    }

    #[test]
    fn source_kind_rejects_unknown() {
        assert_eq!("draft".parse::<SourceKind>().unwrap(), SourceKind::Draft);
        assert_matches!(
            "SNAPSHOT".parse::<SourceKind>(),
            Err(CoreError::InvalidSourceKind(kind)) if kind == "SNAPSHOT"
        );
    }

    #[test]
    fn suspend_requires_active_and_idle() {
        let id = new_id();
        assert!(ensure_suspendable(id, TemplateStatus::Active, 0).is_ok());
        assert_matches!(
            ensure_suspendable(id, TemplateStatus::Active, 3),
            Err(CoreError::HasRunningInstances { count: 3 })
        );
        assert_matches!(
            ensure_suspendable(id, TemplateStatus::Inactive, 0),
            Err(CoreError::NotActive(_))
        );
    }

    #[test]
    fn activate_requires_inactive() {
        let id = new_id();
        assert!(ensure_activatable(id, TemplateStatus::Inactive).is_ok());
        assert_matches!(
            ensure_activatable(id, TemplateStatus::Active),
            Err(CoreError::NotInactive(_))
        );
    }

    #[test]
    fn instance_counts_must_be_consistent() {
        assert!(validate_instance_counts(5, 2).is_ok());
        assert!(validate_instance_counts(-1, 0).is_err());
        assert!(validate_instance_counts(1, 2).is_err());
    }

    #[test]
    fn template_key_rules() {
        assert!(validate_template_key("leave_request.v2").is_ok());
        assert!(validate_template_key("").is_err());
        assert!(validate_template_key("1abc").is_err());
        assert!(validate_template_key("has space").is_err());
        assert!(validate_template_key(&"k".repeat(MAX_TEMPLATE_KEY_LENGTH + 1)).is_err());
    }

    #[test]
    fn versions_start_at_one() {
        assert_eq!(next_version(None), 1);
        assert_eq!(next_version(Some(4)), 5);
    }

    #[test]
    fn restore_keys_carry_attempt_counter() {
        assert_eq!(restore_key("proc", 1700, 0), "proc_restore_1700");
        assert_eq!(restore_key("proc", 1700, 2), "proc_restore_1700_2");
    }
}
