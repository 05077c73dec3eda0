//! Config validation
//!
//! Rules:
//! - mongodb_uri uses a mongodb scheme
//! - store database / collection non-empty
//! - connect_timeout_secs, reconnect_delay_ms >= 1
//! - metrics_port, if set, >= 1
//! - a broker password requires a username

use contracts::{BridgeConfig, ContractError};
use validator::{Validate, ValidationError, ValidationErrors, ValidationErrorsKind};

/// Validate BridgeConfig
///
/// Returns the first error (ordered by field path), or Ok(()).
pub fn validate(config: &BridgeConfig) -> Result<(), ContractError> {
    if let Err(errors) = config.validate() {
        let mut flat = Vec::new();
        flatten("", &errors, &mut flat);
        flat.sort();
        if let Some((field, message)) = flat.into_iter().next() {
            return Err(ContractError::config_validation(field, message));
        }
    }
    validate_credentials(config)?;
    Ok(())
}

fn validate_credentials(config: &BridgeConfig) -> Result<(), ContractError> {
    if config.username.is_empty() && !config.password.is_empty() {
        return Err(ContractError::config_validation(
            "username",
            "password is set but username is empty",
        ));
    }
    Ok(())
}

fn flatten(prefix: &str, errors: &ValidationErrors, out: &mut Vec<(String, String)>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                for err in errs {
                    out.push((path.clone(), describe(err)));
                }
            }
            ValidationErrorsKind::Struct(inner) => flatten(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    flatten(&format!("{path}[{idx}]"), inner, out);
                }
            }
        }
    }
}

fn describe(err: &ValidationError) -> String {
    err.message
        .as_ref()
        .map(|m| m.to_string())
        .unwrap_or_else(|| err.code.to_string())
}
