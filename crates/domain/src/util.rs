use std::time::{SystemTime, UNIX_EPOCH};

use uuid::Uuid;

pub fn uuid_v7_without_dashes() -> String {
    Uuid::now_v7().simple().to_string()
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

pub(crate) fn require_non_empty(field: &str, value: &str) -> crate::DomainResult<()> {
    if value.trim().is_empty() {
        return Err(crate::error::DomainError::Validation(format!(
            "{field} is required"
        )));
    }
    Ok(())
}

pub(crate) fn normalize_scope(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
