use serde::{Deserialize, Serialize};

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlanKind {
    Create,
    Drop,
    Alter,
    Rename,
    Comment,
}

/// One executable statement of a plan, with the single statement that
/// undoes it when one exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanChange {
    pub cmd: String,
    pub reverse: Option<String>,
    pub comment: String,
    pub kind: PlanKind,
}

impl PlanChange {
    pub fn new(kind: PlanKind, cmd: impl Into<String>, comment: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            reverse: None,
            comment: comment.into(),
            kind,
        }
    }

    pub fn with_reverse(mut self, reverse: impl Into<String>) -> Self {
        self.reverse = Some(reverse.into());
        self
    }
}

/// An ordered, reversible-when-possible sequence of statements produced by
/// a dialect planner. `transactional` is dialect-wide: drivers whose DDL
/// cannot run inside a transaction set it to false and the applier runs
/// statements individually.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub reversible: bool,
    pub transactional: bool,
    pub changes: Vec<PlanChange>,
}

impl Plan {
    pub fn new(name: impl Into<String>, transactional: bool) -> Self {
        Self {
            name: name.into(),
            reversible: true,
            transactional,
            changes: Vec::new(),
        }
    }

    /// Append a change, downgrading reversibility when it has no reverse.
    pub fn push(&mut self, change: PlanChange) {
        if change.reverse.is_none() {
            self.reversible = false;
        }
        self.changes.push(change);
    }

    /// Reverse statements mirroring the forward ordering in reverse index.
    /// Fails with [`Error::Irreversible`] naming the first change that has
    /// no reverse.
    pub fn reverse(&self) -> Result<Vec<String>> {
        let mut out = Vec::with_capacity(self.changes.len());
        for change in self.changes.iter().rev() {
            match &change.reverse {
                Some(reverse) => out.push(reverse.clone()),
                None => {
                    return Err(Error::Irreversible {
                        name: self.name.clone(),
                        reason: format!("{:?} has no reverse", change.comment),
                    });
                }
            }
        }
        Ok(out)
    }
}
