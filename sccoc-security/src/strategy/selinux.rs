//! SELinux context strategies

use sccoc_core::{Error, McsLabel, Result, SELinuxOptions};

use crate::constraints::SELinuxContextStrategyOptions;
use crate::validation::{FieldError, child};

/// Chooses and checks the SELinux label of a pod or container
pub trait SELinuxStrategy: Send + Sync + std::fmt::Debug {
    /// Label to assign when none is set
    fn generate(&self) -> Option<SELinuxOptions>;

    /// Check an effective label; `path` points at `seLinuxOptions`
    fn validate(&self, path: &str, options: Option<&SELinuxOptions>) -> Vec<FieldError>;
}

/// Build the strategy named by the options
///
/// # Errors
/// Returns [`Error::Strategy`] if `MustRunAs` has no label to enforce
pub fn from_options(opts: &SELinuxContextStrategyOptions) -> Result<Box<dyn SELinuxStrategy>> {
    match opts {
        SELinuxContextStrategyOptions::MustRunAs {
            selinux_options: Some(options),
        } => Ok(Box::new(MustRunAs {
            options: options.clone(),
        })),
        SELinuxContextStrategyOptions::MustRunAs {
            selinux_options: None,
        } => Err(Error::Strategy {
            message: "MustRunAs requires SELinux options".to_string(),
        }),
        SELinuxContextStrategyOptions::RunAsAny => Ok(Box::new(RunAsAny)),
    }
}

/// Compare two MCS levels, ignoring category order
///
/// Levels that do not parse are compared as plain strings.
#[must_use]
pub fn equal_levels(a: &str, b: &str) -> bool {
    match (a.parse::<McsLabel>(), b.parse::<McsLabel>()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

/// A fixed label
#[derive(Debug, Clone)]
pub struct MustRunAs {
    options: SELinuxOptions,
}

impl MustRunAs {
    fn check(
        errors: &mut Vec<FieldError>,
        path: &str,
        name: &str,
        found: Option<&String>,
        wanted: Option<&String>,
        equal: impl Fn(&str, &str) -> bool,
    ) {
        let found = found.map_or("", String::as_str);
        let wanted = wanted.map_or("", String::as_str);
        if !equal(found, wanted) {
            errors.push(FieldError::invalid(
                child(path, name),
                found,
                format!("{name} does not match required {name}.  Found {found}, wanted {wanted}"),
            ));
        }
    }
}

impl SELinuxStrategy for MustRunAs {
    fn generate(&self) -> Option<SELinuxOptions> {
        Some(self.options.clone())
    }

    fn validate(&self, path: &str, options: Option<&SELinuxOptions>) -> Vec<FieldError> {
        let Some(options) = options else {
            return vec![FieldError::required(path, "")];
        };

        let mut errors = Vec::new();
        let exact = |a: &str, b: &str| a == b;

        Self::check(
            &mut errors,
            path,
            "level",
            options.level.as_ref(),
            self.options.level.as_ref(),
            equal_levels,
        );
        Self::check(
            &mut errors,
            path,
            "user",
            options.user.as_ref(),
            self.options.user.as_ref(),
            exact,
        );
        Self::check(
            &mut errors,
            path,
            "role",
            options.role.as_ref(),
            self.options.role.as_ref(),
            exact,
        );
        Self::check(
            &mut errors,
            path,
            "type",
            options.type_.as_ref(),
            self.options.type_.as_ref(),
            exact,
        );

        errors
    }
}

/// Any label
#[derive(Debug, Clone, Copy)]
pub struct RunAsAny;

impl SELinuxStrategy for RunAsAny {
    fn generate(&self) -> Option<SELinuxOptions> {
        None
    }

    fn validate(&self, _path: &str, _options: Option<&SELinuxOptions>) -> Vec<FieldError> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn must_run_as(level: &str) -> Box<dyn SELinuxStrategy> {
        from_options(&SELinuxContextStrategyOptions::MustRunAs {
            selinux_options: Some(SELinuxOptions::with_level(level)),
        })
        .unwrap()
    }

    #[test]
    fn test_unallocated_rejected() {
        assert!(from_options(&SELinuxContextStrategyOptions::unallocated()).is_err());
    }

    #[test]
    fn test_generate() {
        let strategy = must_run_as("s0:c1,c0");
        assert_eq!(
            strategy.generate(),
            Some(SELinuxOptions::with_level("s0:c1,c0"))
        );
        assert_eq!(
            from_options(&SELinuxContextStrategyOptions::RunAsAny)
                .unwrap()
                .generate(),
            None
        );
    }

    #[test]
    fn test_level_order_ignored() {
        let strategy = must_run_as("s0:c1,c0");
        let options = SELinuxOptions::with_level("s0:c0,c1");
        assert!(strategy.validate("se", Some(&options)).is_empty());
    }

    #[test]
    fn test_mismatches() {
        let strategy = must_run_as("s0:c1,c0");

        let options = SELinuxOptions {
            type_: Some("spc_t".to_string()),
            ..SELinuxOptions::with_level("s0:c2,c3")
        };
        let errors = strategy.validate("se", Some(&options));
        let fields: Vec<_> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, ["se.level", "se.type"]);

        assert_eq!(strategy.validate("se", None).len(), 1);
    }

    #[test]
    fn test_equal_levels() {
        assert!(equal_levels("s0:c1,c2", "s0:c2,c1"));
        assert!(!equal_levels("s0:c1", "s1:c1"));
        assert!(equal_levels("", ""));
    }
}
