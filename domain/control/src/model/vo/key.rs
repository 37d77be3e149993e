//! Composite keys binding a job code or a group name to a batch number.
//!
//! A key is `entity#batch_no`. Generators are strict and refuse components that are
//! empty or contain the separator; extractors are lenient and degrade to `""` on
//! malformed input so that readers of historical keys never fail.

use chrono::Utc;

use crate::exception::{ControlException, ControlResult};

/// The reserved separator between the entity name and the batch number.
pub const KEY_SEPARATOR: char = '#';

/// Entity name used by the safe generators when the input is rejected.
pub const INVALID_KEY_ENTITY: &str = "INVALID";

/// Build `job_code#batch_no`.
pub fn make_job_key(job_code: &str, batch_no: &str) -> ControlResult<String> {
    make_key("job_code", job_code, batch_no)
}

/// Build `group_name#batch_no`.
pub fn make_group_key(group_name: &str, batch_no: &str) -> ControlResult<String> {
    make_key("group_name", group_name, batch_no)
}

/// Same as [`make_job_key`] but never fails.
///
/// Invalid input yields a placeholder `INVALID#<unix millis>`, which is not stable
/// across calls and must not be used for correlation.
pub fn make_safe_job_key(job_code: &str, batch_no: &str) -> String {
    make_job_key(job_code, batch_no).unwrap_or_else(|e| {
        tracing::warn!(job_code, batch_no, "Unable to build job key, using placeholder: {e}");
        placeholder_key()
    })
}

/// Same as [`make_group_key`] but never fails.
pub fn make_safe_group_key(group_name: &str, batch_no: &str) -> String {
    make_group_key(group_name, batch_no).unwrap_or_else(|e| {
        tracing::warn!(group_name, batch_no, "Unable to build group key, using placeholder: {e}");
        placeholder_key()
    })
}

/// A key is valid iff it has exactly one separator and more than two characters.
pub fn is_valid_key(key: &str) -> bool {
    key.chars().count() > 2 && key.matches(KEY_SEPARATOR).count() == 1
}

/// The part before the separator, or `""` when the key is not valid.
pub fn extract_entity_name(key: &str) -> &str {
    if !is_valid_key(key) {
        return "";
    }
    key.rsplit_once(KEY_SEPARATOR).map(|(entity, _)| entity).unwrap_or_default()
}

/// The part after the last separator, or `""` when there is none.
///
/// Unlike [`extract_entity_name`] this accepts any key containing a separator.
pub fn extract_batch_no(key: &str) -> &str {
    key.rsplit_once(KEY_SEPARATOR).map(|(_, batch_no)| batch_no).unwrap_or_default()
}

pub fn belongs_to_batch(key: &str, batch_no: &str) -> bool {
    if batch_no.is_empty() {
        return false;
    }
    let extracted = extract_batch_no(key);
    !extracted.is_empty() && extracted == batch_no
}

/// Strict counterpart of the extractors, returns `(entity, batch_no)`.
pub fn parse_key(key: &str) -> ControlResult<(&str, &str)> {
    let malformed = || ControlException::MalformedKey {
        key: key.to_owned(),
    };
    if !is_valid_key(key) {
        return Err(malformed());
    }
    match key.split_once(KEY_SEPARATOR) {
        Some((entity, batch_no)) if !entity.is_empty() && !batch_no.is_empty() => {
            Ok((entity, batch_no))
        }
        _ => Err(malformed()),
    }
}

fn make_key(field: &'static str, entity: &str, batch_no: &str) -> ControlResult<String> {
    validate_component(field, entity)?;
    validate_component("batch_no", batch_no)?;
    Ok(format!("{entity}{KEY_SEPARATOR}{batch_no}"))
}

fn validate_component(field: &'static str, value: &str) -> ControlResult<()> {
    if value.is_empty() {
        return Err(ControlException::invalid_argument(field, value, "must not be empty"));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(ControlException::invalid_argument(
            field,
            value,
            "must not contain the key separator",
        ));
    }
    Ok(())
}

fn placeholder_key() -> String {
    format!(
        "{INVALID_KEY_ENTITY}{KEY_SEPARATOR}{}",
        Utc::now().timestamp_millis()
    )
}
