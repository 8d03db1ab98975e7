use serde::Serialize;
use sqlx::FromRow;

use crate::error::AppError;

pub const TAG_NAME_MAX_LEN: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// Tag names are matched exactly as given, so only emptiness and length are
/// checked here.
pub fn validate_tag_names(names: &[String]) -> Result<(), AppError> {
    for name in names {
        if name.is_empty() {
            return Err(AppError::validation("Tag names must not be empty"));
        }
        if name.chars().count() > TAG_NAME_MAX_LEN {
            return Err(AppError::validation(format!(
                "Tag '{name}' must be at most {TAG_NAME_MAX_LEN} characters"
            )));
        }
    }
    Ok(())
}
