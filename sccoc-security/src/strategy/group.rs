//! Group strategies for fsGroup and supplemental groups

use sccoc_core::{Error, IdRange, Result};

use crate::constraints::GroupStrategyOptions;
use crate::validation::FieldError;

/// Chooses and checks group IDs
pub trait GroupStrategy: Send + Sync + std::fmt::Debug {
    /// Groups to assign when the pod sets none
    fn generate(&self) -> Vec<i64>;

    /// Single group to assign (fsGroup) when the pod sets none
    fn generate_single(&self) -> Option<i64>;

    /// Check a list of supplemental groups
    fn validate(&self, path: &str, groups: &[i64]) -> Vec<FieldError>;

    /// Check a single fsGroup
    fn validate_single(&self, path: &str, group: Option<i64>) -> Vec<FieldError>;
}

/// Build the strategy named by the options
///
/// # Errors
/// Returns [`Error::Strategy`] if `MustRunAs` has no ranges
pub fn from_options(
    opts: &GroupStrategyOptions,
    kind: &str,
) -> Result<Box<dyn GroupStrategy>> {
    match opts {
        GroupStrategyOptions::MustRunAs { ranges } if ranges.is_empty() => Err(Error::Strategy {
            message: format!("ranges must be supplied for MustRunAs {kind} strategy"),
        }),
        GroupStrategyOptions::MustRunAs { ranges } => Ok(Box::new(MustRunAs {
            ranges: ranges.clone(),
        })),
        GroupStrategyOptions::RunAsAny => Ok(Box::new(RunAsAny)),
    }
}

/// Groups must fall within one of the ranges
#[derive(Debug, Clone)]
pub struct MustRunAs {
    ranges: Vec<IdRange>,
}

impl MustRunAs {
    fn allowed(&self, group: i64) -> bool {
        self.ranges.iter().any(|r| r.contains(group))
    }

    fn check(&self, path: &str, group: i64) -> Option<FieldError> {
        (!self.allowed(group)).then(|| {
            FieldError::invalid(path, group, format!("{group} is not an allowed group"))
        })
    }
}

impl GroupStrategy for MustRunAs {
    fn generate(&self) -> Vec<i64> {
        self.generate_single().into_iter().collect()
    }

    fn generate_single(&self) -> Option<i64> {
        self.ranges.first().map(|r| r.min)
    }

    fn validate(&self, path: &str, groups: &[i64]) -> Vec<FieldError> {
        if groups.is_empty() {
            return vec![FieldError::invalid(
                path,
                "[]",
                "unable to validate empty groups against required ranges",
            )];
        }
        groups.iter().filter_map(|g| self.check(path, *g)).collect()
    }

    fn validate_single(&self, path: &str, group: Option<i64>) -> Vec<FieldError> {
        match group {
            None => vec![FieldError::required(path, "")],
            Some(group) => self.check(path, group).into_iter().collect(),
        }
    }
}

/// Any group
#[derive(Debug, Clone, Copy)]
pub struct RunAsAny;

impl GroupStrategy for RunAsAny {
    fn generate(&self) -> Vec<i64> {
        Vec::new()
    }

    fn generate_single(&self) -> Option<i64> {
        None
    }

    fn validate(&self, _path: &str, _groups: &[i64]) -> Vec<FieldError> {
        Vec::new()
    }

    fn validate_single(&self, _path: &str, _group: Option<i64>) -> Vec<FieldError> {
        Vec::new()
    }
}
