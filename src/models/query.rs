use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::memory::{parse_date, Memory};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    /// Only `asc` (any case) sorts ascending; every other value is descending.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("asc") {
            SortOrder::Asc
        } else {
            SortOrder::Desc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Raw query string of `GET /memories`. Kept as strings so that junk values
/// fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub order: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListQuery {
    pub order: SortOrder,
    pub page: i64,
    pub limit: i64,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            order: SortOrder::Desc,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

fn positive_or(value: Option<&str>, default: i64) -> i64 {
    value
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
        .unwrap_or(default)
}

impl From<ListParams> for ListQuery {
    fn from(params: ListParams) -> Self {
        Self {
            order: params.order.as_deref().map(SortOrder::parse).unwrap_or_default(),
            page: positive_or(params.page.as_deref(), DEFAULT_PAGE),
            limit: positive_or(params.limit.as_deref(), DEFAULT_LIMIT),
        }
    }
}

impl ListQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Serialize)]
pub struct MemoryPage {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub memories: Vec<Memory>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
    pub tag: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchCriteria {
    pub query: Option<String>,
    pub tag: Option<String>,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.query.is_none() && self.tag.is_none() && self.start.is_none() && self.end.is_none()
    }
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

/// A bare `YYYY-MM-DD` covers the whole day on either side of the range.
fn parse_bound(value: &str, bound: Bound) -> Result<NaiveDateTime, AppError> {
    if let Ok(day) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        if value.len() == 10 {
            let time = match bound {
                Bound::Start => day.and_hms_opt(0, 0, 0),
                Bound::End => day.and_hms_opt(23, 59, 59),
            };
            if let Some(time) = time {
                return Ok(time);
            }
        }
    }
    parse_date(value)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

impl TryFrom<SearchParams> for SearchCriteria {
    type Error = AppError;

    fn try_from(params: SearchParams) -> Result<Self, Self::Error> {
        let start = non_empty(params.start_date)
            .map(|v| parse_bound(&v, Bound::Start))
            .transpose()?;
        let end = non_empty(params.end_date)
            .map(|v| parse_bound(&v, Bound::End))
            .transpose()?;

        Ok(Self {
            query: non_empty(params.query),
            tag: non_empty(params.tag),
            start,
            end,
        })
    }
}
