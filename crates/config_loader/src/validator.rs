//! Configuration validation
//!
//! Field rules are declared on `WriterConfig` with `validator`; this module
//! turns the first violation into a `ContractError::ConfigValidation` with a
//! dotted field path (e.g. `sink.name`).

use contracts::{ContractError, WriterConfig};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Validate a WriterConfig
///
/// Returns the first violation found, or Ok(()).
pub fn validate(config: &WriterConfig) -> Result<(), ContractError> {
    match config.validate() {
        Ok(()) => Ok(()),
        Err(errors) => {
            let (field, message) = first_violation(&errors, "")
                .unwrap_or_else(|| ("config".to_string(), errors.to_string()));
            Err(ContractError::config_validation(field, message))
        }
    }
}

/// Depth-first search for the first violation, in field name order
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = field_path(prefix, field);
        match kind {
            ValidationErrorsKind::Field(errs) => {
                if let Some(err) = errs.first() {
                    return Some((path, describe(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

fn field_path(prefix: &str, field: &str) -> String {
    // Struct-level (schema) errors are reported against the parent
    if field == "__all__" {
        return if prefix.is_empty() {
            "config".to_string()
        } else {
            prefix.to_string()
        };
    }
    if prefix.is_empty() {
        field.to_string()
    } else {
        format!("{prefix}.{field}")
    }
}

fn describe(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
