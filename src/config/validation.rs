//! Configuration validation.
//!
//! # Responsibilities
//! - Check numeric leaves against their declared ranges
//! - Check string leaves against their custom rules
//! - Run the schema's instance-level hook once every leaf passed
//!
//! # Design Decisions
//! - Returns all leaf errors, not just the first
//! - Validation is a pure function of (layout, instance, hook)
//! - A failure rejects the instance; the caller keeps the previous one live

use std::fmt;

use crate::config::instance::ConfigInstance;
use crate::schema::{Schema, SchemaLayout, Value};

/// Path used for failures raised by the instance-level hook.
pub const ROOT_PATH: &str = "<root>";

/// A single validation failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub path: String,
    pub reason: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

impl std::error::Error for ValidationError {}

/// Validate `instance` against the layout's leaf metadata and the schema's
/// custom hook.
pub fn validate(
    schema: &Schema,
    layout: &SchemaLayout,
    instance: &ConfigInstance,
) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    for leaf in layout.leaves() {
        let Some(value) = instance.get(&leaf.path) else {
            continue;
        };

        if let (Some(range), Some(n)) = (leaf.range, value.as_f64()) {
            if !range.contains(n) {
                errors.push(ValidationError::new(
                    &leaf.path,
                    format!(
                        "value {} is out of range [{}, {}]",
                        value, range.min, range.max
                    ),
                ));
            }
        }

        if let (Some(rule), Value::String(s)) = (&leaf.rule, value) {
            if let Err(reason) = rule.check(s) {
                errors.push(ValidationError::new(&leaf.path, reason));
            }
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    if let Some(hook) = schema.validation_hook() {
        hook(instance).map_err(|e| {
            vec![ValidationError::new(
                ROOT_PATH,
                format!("custom validation failed: {e}"),
            )]
        })?;
    }

    Ok(())
}
