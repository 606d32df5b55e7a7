//! Run-as-user strategies

use sccoc_core::{Error, IdRange, Result};

use crate::constraints::RunAsUserStrategyOptions;
use crate::validation::{FieldError, child};

/// Chooses and checks the UID a container runs as
pub trait RunAsUserStrategy: Send + Sync + std::fmt::Debug {
    /// UID to assign when the container sets none
    fn generate(&self) -> Option<i64>;

    /// Check the effective `runAsNonRoot` and `runAsUser` of a container
    fn validate(
        &self,
        path: &str,
        container: &str,
        run_as_non_root: Option<bool>,
        run_as_user: Option<i64>,
    ) -> Vec<FieldError>;
}

/// Build the strategy named by the options
///
/// # Errors
/// Returns [`Error::Strategy`] if the options still lack namespace allocations
pub fn from_options(opts: &RunAsUserStrategyOptions) -> Result<Box<dyn RunAsUserStrategy>> {
    match opts {
        RunAsUserStrategyOptions::MustRunAs { uid } => {
            let uid = uid.ok_or_else(|| Error::Strategy {
                message: "MustRunAs requires a UID".to_string(),
            })?;
            Ok(Box::new(MustRunAs { uid }))
        }
        RunAsUserStrategyOptions::MustRunAsRange {
            uid_range_min,
            uid_range_max,
        } => match (uid_range_min, uid_range_max) {
            (Some(min), Some(max)) => Ok(Box::new(MustRunAsRange {
                range: IdRange::new(*min, *max)?,
            })),
            _ => Err(Error::Strategy {
                message: "MustRunAsRange requires a UID range minimum and maximum".to_string(),
            }),
        },
        RunAsUserStrategyOptions::MustRunAsNonRoot => Ok(Box::new(MustRunAsNonRoot)),
        RunAsUserStrategyOptions::RunAsAny => Ok(Box::new(RunAsAny)),
    }
}

/// Exactly one UID
#[derive(Debug, Clone, Copy)]
pub struct MustRunAs {
    uid: i64,
}

impl RunAsUserStrategy for MustRunAs {
    fn generate(&self) -> Option<i64> {
        Some(self.uid)
    }

    fn validate(
        &self,
        path: &str,
        container: &str,
        _run_as_non_root: Option<bool>,
        run_as_user: Option<i64>,
    ) -> Vec<FieldError> {
        let field = child(path, "runAsUser");
        match run_as_user {
            None => vec![FieldError::required(field, "")],
            Some(uid) if uid != self.uid => vec![FieldError::invalid(
                field,
                uid,
                format!(
                    "UID on container {container} does not match required UID.  Found {uid}, required {}",
                    self.uid
                ),
            )],
            Some(_) => Vec::new(),
        }
    }
}

/// A UID within an inclusive range
#[derive(Debug, Clone, Copy)]
pub struct MustRunAsRange {
    range: IdRange,
}

impl RunAsUserStrategy for MustRunAsRange {
    fn generate(&self) -> Option<i64> {
        Some(self.range.min)
    }

    fn validate(
        &self,
        path: &str,
        container: &str,
        _run_as_non_root: Option<bool>,
        run_as_user: Option<i64>,
    ) -> Vec<FieldError> {
        let field = child(path, "runAsUser");
        match run_as_user {
            None => vec![FieldError::required(field, "")],
            Some(uid) if !self.range.contains(uid) => vec![FieldError::invalid(
                field,
                uid,
                format!(
                    "UID on container {container} does not match required range.  Found {uid}, required min: {} max: {}",
                    self.range.min, self.range.max
                ),
            )],
            Some(_) => Vec::new(),
        }
    }
}

/// Any UID except 0; the image or the pod must supply one
#[derive(Debug, Clone, Copy)]
pub struct MustRunAsNonRoot;

impl RunAsUserStrategy for MustRunAsNonRoot {
    fn generate(&self) -> Option<i64> {
        None
    }

    fn validate(
        &self,
        path: &str,
        _container: &str,
        run_as_non_root: Option<bool>,
        run_as_user: Option<i64>,
    ) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if run_as_non_root.is_none() && run_as_user.is_none() {
            errors.push(FieldError::required(
                child(path, "runAsNonRoot"),
                "must be true",
            ));
        }
        if run_as_non_root == Some(false) {
            errors.push(FieldError::invalid(
                child(path, "runAsNonRoot"),
                false,
                "must be true",
            ));
        }
        if run_as_user == Some(0) {
            errors.push(FieldError::invalid(
                child(path, "runAsUser"),
                0,
                "running with the root UID is forbidden",
            ));
        }

        errors
    }
}

/// Any UID
#[derive(Debug, Clone, Copy)]
pub struct RunAsAny;

impl RunAsUserStrategy for RunAsAny {
    fn generate(&self) -> Option<i64> {
        None
    }

    fn validate(
        &self,
        _path: &str,
        _container: &str,
        _run_as_non_root: Option<bool>,
        _run_as_user: Option<i64>,
    ) -> Vec<FieldError> {
        Vec::new()
    }
}
