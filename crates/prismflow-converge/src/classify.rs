//! State classification
//!
//! Control-plane services report progress as bare string literals with
//! inconsistent casing and vocabulary: `"running"` is the steady state of a
//! provisioned application, while `"RUNNING"` means a run-log is still busy.
//! Every operation kind therefore carries its own [`ClassificationTable`].

use crate::error::{ConvergeError, Result};
use serde::{Deserialize, Serialize};

/// Class of an observed remote state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateClass {
    /// The operation is still in progress
    Pending,
    /// The operation reached a successful terminal state
    Success,
    /// The operation reached a failed terminal state
    Failure,
}

impl StateClass {
    pub fn is_terminal(self) -> bool {
        !matches!(self, StateClass::Pending)
    }
}

impl std::fmt::Display for StateClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateClass::Pending => write!(f, "pending"),
            StateClass::Success => write!(f, "success"),
            StateClass::Failure => write!(f, "failure"),
        }
    }
}

/// Static mapping from raw status literals to a [`StateClass`]
///
/// Matching is exact and case-sensitive. The three sets must be pairwise
/// disjoint and at least one terminal literal must exist; see
/// [`ClassificationTable::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ClassificationTable {
    /// Table name used in diagnostics (e.g. "app-runlog")
    pub name: &'static str,

    /// Literals meaning "keep waiting"
    pub pending: &'static [&'static str],

    /// Literals meaning "done"
    pub success: &'static [&'static str],

    /// Literals meaning "the remote gave up"
    pub failure: &'static [&'static str],
}

impl ClassificationTable {
    pub const fn new(
        name: &'static str,
        pending: &'static [&'static str],
        success: &'static [&'static str],
        failure: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            pending,
            success,
            failure,
        }
    }

    /// Check that the table is well-formed
    ///
    /// Fails on an empty literal, a literal listed twice, a literal shared by
    /// two classes, or a table with no terminal literal at all.
    pub fn validate(&self) -> Result<()> {
        if self.success.is_empty() && self.failure.is_empty() {
            return Err(self.invalid("no terminal literals"));
        }

        let literals: Vec<(&str, StateClass)> = self.literals().collect();
        for (i, (literal, class)) in literals.iter().enumerate() {
            if literal.is_empty() {
                return Err(self.invalid(format!("empty literal in {} set", class)));
            }
            if let Some((_, other)) = literals[i + 1..].iter().find(|(l, _)| l == literal) {
                return Err(if other == class {
                    self.invalid(format!("literal {:?} listed twice in {} set", literal, class))
                } else {
                    self.invalid(format!(
                        "literal {:?} is both {} and {}",
                        literal, class, other
                    ))
                });
            }
        }

        Ok(())
    }

    /// Classify a raw state reported by the remote system
    ///
    /// A literal found in no set is a defect in the table and is reported as
    /// [`ConvergeError::UnrecognizedState`], never treated as pending.
    pub fn classify(&self, raw_state: &str) -> Result<StateClass> {
        let mut matched = self
            .literals()
            .filter(|(literal, _)| *literal == raw_state)
            .map(|(_, class)| class);

        match (matched.next(), matched.next()) {
            (Some(class), None) => Ok(class),
            (Some(_), Some(_)) => Err(ConvergeError::AmbiguousState {
                table: self.name,
                state: raw_state.to_string(),
            }),
            (None, _) => Err(ConvergeError::UnrecognizedState {
                table: self.name,
                state: raw_state.to_string(),
            }),
        }
    }

    /// All literals with their class, in pending, success, failure order
    pub fn literals(&self) -> impl Iterator<Item = (&'static str, StateClass)> + '_ {
        let pending = self.pending.iter().map(|l| (*l, StateClass::Pending));
        let success = self.success.iter().map(|l| (*l, StateClass::Success));
        let failure = self.failure.iter().map(|l| (*l, StateClass::Failure));
        pending.chain(success).chain(failure)
    }

    fn invalid(&self, reason: impl Into<String>) -> ConvergeError {
        ConvergeError::InvalidTable {
            table: self.name,
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for ClassificationTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: pending [{}], success [{}], failure [{}]",
            self.name,
            self.pending.join(", "),
            self.success.join(", "),
            self.failure.join(", ")
        )
    }
}
