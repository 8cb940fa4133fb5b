//! Backup and restore resource types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backup lifecycle state as reported by the control plane
///
/// `Deleted` is synthetic: the delete operation maps resource absence
/// onto it.
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BackupState {
    /// Backup accepted but not yet started
    #[default]
    Pending,
    /// Backup in progress
    Running,
    /// Backup completed and is restorable
    Succeeded,
    /// Backup hit an unrecoverable error
    Failed,
    /// Synthetic: the backup no longer exists
    Deleted,
}

impl fmt::Display for BackupState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
            Self::Deleted => write!(f, "DELETED"),
        }
    }
}

/// A cluster backup as observed from the control plane
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    /// Control-plane identifier
    pub id: String,
    /// Identifier of the owning cluster
    pub cluster_id: String,
    /// User-facing backup name
    pub name: String,
    /// Current lifecycle state
    pub state: BackupState,
    /// Diagnostic message attached by the control plane, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Backup payload size, once known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,
    /// When the backup was created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Backup {
    /// The diagnostic message, or a generic description of the state
    pub fn diagnostic(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("backup reported state {}", self.state))
    }
}

/// Restore lifecycle state as reported by the control plane
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestoreState {
    /// Restore accepted but not yet started
    #[default]
    Pending,
    /// Target cluster is being provisioned from the backup
    Running,
    /// Restore completed; the target cluster is serving
    Succeeded,
    /// Restore hit an unrecoverable error
    Failed,
}

impl fmt::Display for RestoreState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "PENDING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Succeeded => write!(f, "SUCCEEDED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// A restore operation as observed from the control plane
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Restore {
    /// Control-plane identifier
    pub id: String,
    /// The backup being restored from
    pub backup_id: String,
    /// The cluster being provisioned, once the control plane assigns it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cluster_id: Option<String>,
    /// Current lifecycle state
    pub state: RestoreState,
    /// Diagnostic message attached by the control plane, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// When the restore was requested
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Restore {
    /// The diagnostic message, or a generic description of the state
    pub fn diagnostic(&self) -> String {
        self.message
            .clone()
            .unwrap_or_else(|| format!("restore reported state {}", self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backup_state_wire_format() {
        assert_eq!(
            serde_json::to_string(&BackupState::Succeeded).unwrap(),
            "\"SUCCEEDED\""
        );
        assert_eq!(
            serde_json::to_string(&BackupState::Pending).unwrap(),
            "\"PENDING\""
        );
    }

    #[test]
    fn test_backup_state_serde_roundtrip() {
        let states = [
            BackupState::Pending,
            BackupState::Running,
            BackupState::Succeeded,
            BackupState::Failed,
            BackupState::Deleted,
        ];
        for state in states {
            let json = serde_json::to_string(&state).unwrap();
            let parsed: BackupState = serde_json::from_str(&json).unwrap();
            assert_eq!(state, parsed);
        }
    }

    #[test]
    fn test_backup_diagnostic_fallback() {
        let backup = Backup {
            id: "bk-1".to_string(),
            cluster_id: "c-1".to_string(),
            name: "nightly".to_string(),
            state: BackupState::Failed,
            message: None,
            size_bytes: None,
            created_at: None,
        };
        assert!(backup.diagnostic().contains("FAILED"));

        let backup = Backup {
            message: Some("snapshot store unreachable".to_string()),
            ..backup
        };
        assert_eq!(backup.diagnostic(), "snapshot store unreachable");
    }

    #[test]
    fn test_restore_roundtrip() {
        let restore = Restore {
            id: "rs-1".to_string(),
            backup_id: "bk-1".to_string(),
            cluster_id: Some("c-2".to_string()),
            state: RestoreState::Running,
            message: None,
            created_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&restore).unwrap();
        let parsed: Restore = serde_json::from_str(&json).unwrap();
        assert_eq!(restore, parsed);
    }

    #[test]
    fn test_display_matches_wire_format() {
        let json = serde_json::to_string(&RestoreState::Succeeded).unwrap();
        assert_eq!(json.trim_matches('"'), RestoreState::Succeeded.to_string());
    }
}
