use regex::Regex;
use std::sync::LazyLock;

use crate::error::ValidationError;
use crate::models::{ApplicationDraft, Field, ResumeFile};

pub const MAX_RESUME_BYTES: u64 = 5 * 1024 * 1024;

pub const ALLOWED_CONTENT_TYPES: [&str; 4] =
    ["application/pdf", "image/jpeg", "image/png", "image/jpg"];

/// Extensions offered by the file picker.
pub const ACCEPTED_EXTENSIONS: &str = ".pdf,.jpg,.jpeg,.png";

// The browser's `type=email` rule.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
    )
    .expect("email pattern is valid")
});

/// Gates a file selection. Size is checked before type; the type is the one
/// the file declared, contents are never inspected.
pub fn check_resume(file: Option<ResumeFile>) -> Result<Option<ResumeFile>, ValidationError> {
    let Some(file) = file else {
        return Ok(None);
    };

    if file.size > MAX_RESUME_BYTES {
        return Err(ValidationError::FileTooLarge { size: file.size });
    }

    if !ALLOWED_CONTENT_TYPES.contains(&file.content_type.as_str()) {
        return Err(ValidationError::UnsupportedFileType {
            content_type: file.content_type,
        });
    }

    Ok(Some(file))
}

/// Required-field checks, in form order. Like a browser form, a value made of
/// spaces counts as filled in; only the email is trimmed before its shape is
/// checked.
pub fn check_fields(draft: &ApplicationDraft) -> Result<(), ValidationError> {
    for field in Field::ALL {
        if draft.get(field).is_empty() {
            return Err(ValidationError::MissingField(field));
        }
    }

    if !is_email(draft.email.trim()) {
        return Err(ValidationError::InvalidEmail);
    }

    Ok(())
}

pub fn is_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}
