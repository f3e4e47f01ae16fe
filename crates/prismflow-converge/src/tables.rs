//! Classification tables of the shipped operation kinds
//!
//! Every table is closed: a state outside its three sets raises
//! `UnrecognizedState` rather than being treated as pending. For NDB this
//! means only the codes "0" through "5" are known, and any other code ends
//! the poll as a table defect.

use crate::classify::ClassificationTable;
use crate::error::ConvergeError;
use crate::settings::{NotFoundPolicy, PollSettings};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

const MINUTE: u64 = 60;

pub const BLUEPRINT_LAUNCH: ClassificationTable = ClassificationTable::new(
    "blueprint-launch",
    &["pending", "running"],
    &["success"],
    &["failed", "error"],
);

pub const APP_PROVISIONING: ClassificationTable = ClassificationTable::new(
    "app-provisioning",
    &["provisioning"],
    &["running"],
    &["error", "failed"],
);

pub const APP_DELETION: ClassificationTable = ClassificationTable::new(
    "app-deletion",
    &["running", "deleting"],
    &["deleted"],
    &["error", "failed"],
);

pub const APP_RUNLOG: ClassificationTable = ClassificationTable::new(
    "app-runlog",
    &[
        "PENDING",
        "RUNNING",
        "QUEUED",
        "POLICY_EXEC",
        "ABORTING",
        "APPROVAL",
    ],
    &["SUCCESS", "WARNING"],
    &[
        "FAILURE",
        "ERROR",
        "SYS_FAILURE",
        "SYS_ERROR",
        "SYS_ABORTED",
        "ABORTED",
        "TIMEOUT",
        "APPROVAL_FAILED",
    ],
);

pub const RUNBOOK_RUNLOG: ClassificationTable = ClassificationTable::new(
    "runbook-runlog",
    &["PENDING", "RUNNING", "QUEUED", "ABORTING"],
    &["SUCCESS", "WARNING"],
    &[
        "FAILURE",
        "ERROR",
        "ABORTED",
        "SYS_FAILURE",
        "SYS_ERROR",
        "SYS_ABORTED",
        "TIMEOUT",
    ],
);

pub const PRISM_TASK: ClassificationTable = ClassificationTable::new(
    "prism-task",
    &["QUEUED", "RUNNING", "PENDING"],
    &["SUCCEEDED"],
    &["FAILED", "ABORTED", "INVALID_UUID"],
);

// NDB reports numeric status codes as strings; codes outside 0-5 are unrecognized
pub const NDB_OPERATION: ClassificationTable =
    ClassificationTable::new("ndb-operation", &["0", "1", "2", "3"], &["5"], &["4"]);

/// Kinds of remote operation the poller knows how to judge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OperationKind {
    BlueprintLaunch,
    AppProvisioning,
    AppDeletion,
    AppRunlog,
    RunbookRunlog,
    PrismTask,
    NdbOperation,
}

impl OperationKind {
    pub const ALL: [OperationKind; 7] = [
        OperationKind::BlueprintLaunch,
        OperationKind::AppProvisioning,
        OperationKind::AppDeletion,
        OperationKind::AppRunlog,
        OperationKind::RunbookRunlog,
        OperationKind::PrismTask,
        OperationKind::NdbOperation,
    ];

    pub fn table(self) -> ClassificationTable {
        match self {
            OperationKind::BlueprintLaunch => BLUEPRINT_LAUNCH,
            OperationKind::AppProvisioning => APP_PROVISIONING,
            OperationKind::AppDeletion => APP_DELETION,
            OperationKind::AppRunlog => APP_RUNLOG,
            OperationKind::RunbookRunlog => RUNBOOK_RUNLOG,
            OperationKind::PrismTask => PRISM_TASK,
            OperationKind::NdbOperation => NDB_OPERATION,
        }
    }

    /// Delay and timeout used when the caller configures nothing
    ///
    /// Run-log handles are created by the caller's own request, so a run-log
    /// that stops resolving is treated as a failed operation.
    pub fn default_settings(self) -> PollSettings {
        let (delay_secs, timeout_mins, not_found) = match self {
            OperationKind::BlueprintLaunch => (1, 60, NotFoundPolicy::Propagate),
            OperationKind::AppProvisioning => (1, 60, NotFoundPolicy::Propagate),
            OperationKind::AppDeletion => (1, 20, NotFoundPolicy::Propagate),
            OperationKind::AppRunlog => (5, 20, NotFoundPolicy::Failure),
            OperationKind::RunbookRunlog => (5, 20, NotFoundPolicy::Failure),
            OperationKind::PrismTask => (1, 20, NotFoundPolicy::Propagate),
            OperationKind::NdbOperation => (5, 60, NotFoundPolicy::Propagate),
        };

        PollSettings::new(
            Duration::from_secs(delay_secs),
            Duration::from_secs(timeout_mins * MINUTE),
        )
        .with_not_found(not_found)
    }

    pub fn as_str(self) -> &'static str {
        self.table().name
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OperationKind {
    type Err = ConvergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        OperationKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| ConvergeError::UnknownKind(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::StateClass;

    #[test]
    fn test_every_shipped_table_is_valid() {
        for kind in OperationKind::ALL {
            kind.table()
                .validate()
                .unwrap_or_else(|e| panic!("{} table invalid: {}", kind, e));
        }
    }

    #[test]
    fn test_kind_names_round_trip() {
        for kind in OperationKind::ALL {
            assert_eq!(kind.as_str().parse::<OperationKind>().unwrap(), kind);
        }
        assert_eq!(
            "APP_RUNLOG".parse::<OperationKind>().unwrap(),
            OperationKind::AppRunlog
        );
        let err = "vm-migration".parse::<OperationKind>().unwrap_err();
        assert!(matches!(err, ConvergeError::UnknownKind(ref kind) if kind == "vm-migration"));
        assert!(!err.is_config_defect());
    }

    #[test]
    fn test_serde_name_matches_display() {
        for kind in OperationKind::ALL {
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind));
        }
    }

    #[test]
    fn test_running_depends_on_kind() {
        assert_eq!(
            APP_PROVISIONING.classify("running").unwrap(),
            StateClass::Success
        );
        assert_eq!(
            APP_DELETION.classify("running").unwrap(),
            StateClass::Pending
        );
        assert!(APP_RUNLOG.classify("running").is_err());
    }

    #[test]
    fn test_runlog_warning_is_success() {
        assert_eq!(APP_RUNLOG.classify("WARNING").unwrap(), StateClass::Success);
        assert_eq!(
            RUNBOOK_RUNLOG.classify("WARNING").unwrap(),
            StateClass::Success
        );
    }

    #[test]
    fn test_runlog_failure_literals_are_terminal_failures() {
        for state in ["FAILURE", "ERROR", "SYS_ABORTED", "TIMEOUT"] {
            assert_eq!(APP_RUNLOG.classify(state).unwrap(), StateClass::Failure);
            assert_eq!(RUNBOOK_RUNLOG.classify(state).unwrap(), StateClass::Failure);
        }
        assert_eq!(
            APP_RUNLOG.classify("APPROVAL_FAILED").unwrap(),
            StateClass::Failure
        );
        assert!(RUNBOOK_RUNLOG.classify("POLICY_EXEC").is_err());
    }

    #[test]
    fn test_ndb_status_codes() {
        assert_eq!(NDB_OPERATION.classify("1").unwrap(), StateClass::Pending);
        assert_eq!(NDB_OPERATION.classify("4").unwrap(), StateClass::Failure);
        assert_eq!(NDB_OPERATION.classify("5").unwrap(), StateClass::Success);
        for code in ["6", "9", "-1"] {
            assert!(matches!(
                NDB_OPERATION.classify(code),
                Err(ConvergeError::UnrecognizedState { .. })
            ));
        }
    }

    #[test]
    fn test_default_settings() {
        let runlog = OperationKind::AppRunlog.default_settings();
        assert_eq!(runlog.delay, Duration::from_secs(5));
        assert_eq!(runlog.timeout, Duration::from_secs(20 * 60));
        assert_eq!(runlog.not_found, NotFoundPolicy::Failure);

        let launch = OperationKind::BlueprintLaunch.default_settings();
        assert_eq!(launch.delay, Duration::from_secs(1));
        assert_eq!(launch.timeout, Duration::from_secs(60 * 60));
        assert_eq!(launch.not_found, NotFoundPolicy::Propagate);
    }
}
