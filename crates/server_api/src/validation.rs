use shared::error::{ApiException, ErrorCode};

fn fails() -> ApiException {
    ApiException::new(ErrorCode::Validation, "Validation fails")
}

/// Present and non-empty.
pub(crate) fn required_text(value: Option<&str>) -> Result<&str, ApiException> {
    match value {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(fails()),
    }
}

pub(crate) fn required<T: Copy>(value: Option<T>) -> Result<T, ApiException> {
    value.ok_or_else(fails)
}

pub(crate) fn optional_email(value: Option<&str>) -> Result<Option<&str>, ApiException> {
    match value {
        Some(email) if !is_valid_email(email) => Err(fails()),
        other => Ok(other),
    }
}

/// Loose address check: one `@`, a non-empty local part, and a dotted domain
/// without empty labels or whitespace.
pub fn is_valid_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    let labels: Vec<&str> = domain.split('.').collect();
    labels.len() >= 2 && labels.iter().all(|label| !label.is_empty())
}
