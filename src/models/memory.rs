use chrono::{NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::FromRow;

use crate::error::AppError;
use crate::models::tag::validate_tag_names;

/// Wire and storage format for memory dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const TITLE_MAX_LEN: usize = 80;
pub const DESCRIPTION_MAX_LEN: usize = 500;
pub const IMAGE_MAX_LEN: usize = 255;

pub fn parse_date(value: &str) -> Result<NaiveDateTime, AppError> {
    let invalid = || AppError::validation(format!("Invalid date '{value}', expected YYYY-MM-DD HH:MM:SS"));

    // chrono accepts unpadded fields, the wire format does not.
    if value.len() != 19 {
        return Err(invalid());
    }
    NaiveDateTime::parse_from_str(value, DATE_FORMAT).map_err(|_| invalid())
}

pub fn format_date(date: &NaiveDateTime) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Current UTC time truncated to whole seconds, matching what the wire format
/// can carry.
pub fn now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    now.with_nanosecond(0).unwrap_or(now)
}

fn serialize_date<S: Serializer>(date: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&date.format(DATE_FORMAT))
}

// Distinguishes `"image": null` (Some(None)) from a missing key (None).
fn deserialize_present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

fn check_text(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("'{field}' must not be empty")));
    }
    check_len(field, value, max)
}

fn check_len(field: &str, value: &str, max: usize) -> Result<(), AppError> {
    if value.chars().count() > max {
        return Err(AppError::validation(format!("'{field}' must be at most {max} characters")));
    }
    Ok(())
}

/// A `memory` row without its tags.
#[derive(Debug, Clone, FromRow)]
pub struct MemoryRow {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub date: NaiveDateTime,
}

impl MemoryRow {
    pub fn with_tags(self, tags: Vec<String>) -> Memory {
        Memory {
            id: self.id,
            title: self.title,
            description: self.description,
            image: self.image,
            date: self.date,
            tags,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Memory {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    #[serde(serialize_with = "serialize_date")]
    pub date: NaiveDateTime,
    pub tags: Vec<String>,
}

/// Body of `POST /memory`. Every field is optional at the serde level so that
/// missing fields can be reported together. `image` must be present but may
/// be null.
#[derive(Debug, Default, Deserialize)]
pub struct NewMemory {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub image: Option<Option<String>>,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug)]
pub struct ValidMemory {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub date: NaiveDateTime,
    pub tags: Vec<String>,
}

impl NewMemory {
    pub fn validate(self) -> Result<ValidMemory, AppError> {
        let (Some(title), Some(description), Some(image)) =
            (self.title.as_ref(), self.description.as_ref(), self.image.as_ref())
        else {
            let missing: Vec<&str> = [
                ("title", self.title.is_none()),
                ("description", self.description.is_none()),
                ("image", self.image.is_none()),
            ]
            .into_iter()
            .filter(|(_, absent)| *absent)
            .map(|(name, _)| name)
            .collect();
            return Err(AppError::validation(format!(
                "Missing fields: {}",
                missing.iter().map(|f| format!("'{f}'")).collect::<Vec<_>>().join(", ")
            )));
        };

        check_text("title", title, TITLE_MAX_LEN)?;
        check_text("description", description, DESCRIPTION_MAX_LEN)?;
        if let Some(image) = image {
            check_len("image", image, IMAGE_MAX_LEN)?;
        }

        let date = match &self.date {
            Some(value) => parse_date(value)?,
            None => now(),
        };

        let tags = self.tags.unwrap_or_default();
        validate_tag_names(&tags)?;

        Ok(ValidMemory {
            title: title.clone(),
            description: description.clone(),
            image: image.clone(),
            date,
            tags,
        })
    }
}

/// Body of `PUT /memories/{id}`. Absent fields are left untouched.
#[derive(Debug, Default, Deserialize)]
pub struct MemoryPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub image: Option<Option<String>>,
    pub date: Option<String>,
    pub tags: Option<Vec<String>>,
}

impl MemoryPatch {
    /// Merges the patch onto `current`. The returned tag list is `Some` only
    /// when the whole tag set is to be replaced.
    pub fn apply(self, mut current: MemoryRow) -> Result<(MemoryRow, Option<Vec<String>>), AppError> {
        if let Some(title) = self.title {
            check_text("title", &title, TITLE_MAX_LEN)?;
            current.title = title;
        }
        if let Some(description) = self.description {
            check_text("description", &description, DESCRIPTION_MAX_LEN)?;
            current.description = description;
        }
        if let Some(image) = self.image {
            if let Some(image) = &image {
                check_len("image", image, IMAGE_MAX_LEN)?;
            }
            current.image = image;
        }
        if let Some(date) = &self.date {
            current.date = parse_date(date)?;
        }
        if let Some(tags) = &self.tags {
            validate_tag_names(tags)?;
        }
        Ok((current, self.tags))
    }
}
