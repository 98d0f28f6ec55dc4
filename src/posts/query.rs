use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, FieldError};
use crate::posts::models::Post;

pub const DEFAULT_PAGE: u32 = 1;
pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

const SELECT_POSTS: &str = "SELECT p.id, p.user_id, p.title, p.description, p.tags, p.image_url, \
     p.upload_time, p.created_at, p.updated_at, a.name AS owner_name, a.email AS owner_email \
     FROM posts p LEFT JOIN accounts a ON a.id = p.user_id";
const COUNT_POSTS: &str = "SELECT COUNT(*) FROM posts p";

/// Typed bind parameter for the generated SQL
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Text(String),
    Timestamp(DateTime<Utc>),
    TextArray(Vec<String>),
}

/// SQL query builder for the post listing
/// Builds the page query and a matching count query from the same filters
#[derive(Debug)]
pub struct SqlQueryBuilder {
    where_clauses: Vec<String>,
    params: Vec<SqlParam>,
    limit: u64,
    offset: u64,
}

impl Default for SqlQueryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlQueryBuilder {
    pub fn new() -> Self {
        Self {
            where_clauses: Vec::new(),
            params: Vec::new(),
            limit: DEFAULT_LIMIT as u64,
            offset: 0,
        }
    }

    /// Builder with every predicate of `filter` applied
    pub fn from_filter(filter: &PostFilter) -> Self {
        let mut builder = Self::new();
        if let Some(text) = filter.search_text.as_deref() {
            builder.add_search_filter(text);
        }
        builder.add_date_range(filter.start_date, filter.end_date);
        builder.add_tags_filter(&filter.tags);
        builder
    }

    fn next_placeholder(&self) -> usize {
        self.params.len() + 1
    }

    /// Full-text match against the stored search document.
    /// The parsed terms are OR-ed so any one of them matches.
    pub fn add_search_filter(&mut self, text: &str) {
        let index = self.next_placeholder();
        self.where_clauses.push(format!(
            "p.search_document @@ replace(plainto_tsquery('english', ${})::text, '&', '|')::tsquery",
            index
        ));
        self.params.push(SqlParam::Text(text.to_string()));
    }

    /// Inclusive bounds on the upload time
    pub fn add_date_range(&mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) {
        if let Some(start) = start {
            let index = self.next_placeholder();
            self.where_clauses.push(format!("p.upload_time >= ${}", index));
            self.params.push(SqlParam::Timestamp(start));
        }

        if let Some(end) = end {
            let index = self.next_placeholder();
            self.where_clauses.push(format!("p.upload_time <= ${}", index));
            self.params.push(SqlParam::Timestamp(end));
        }
    }

    /// Matches posts sharing at least one tag. No-op for an empty list.
    pub fn add_tags_filter(&mut self, tags: &[String]) {
        if tags.is_empty() {
            return;
        }
        let index = self.next_placeholder();
        self.where_clauses.push(format!("p.tags && ${}", index));
        self.params.push(SqlParam::TextArray(tags.to_vec()));
    }

    pub fn set_pagination(&mut self, window: PageWindow) {
        self.limit = window.limit;
        self.offset = window.skip;
    }

    fn where_sql(&self) -> String {
        if self.where_clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.where_clauses.join(" AND "))
        }
    }

    /// Page query, newest first. LIMIT/OFFSET are inlined integers.
    pub fn build(&self) -> (String, Vec<SqlParam>) {
        let query = format!(
            "{}{} ORDER BY p.upload_time DESC, p.id DESC LIMIT {} OFFSET {}",
            SELECT_POSTS,
            self.where_sql(),
            self.limit,
            self.offset
        );
        (query, self.params.clone())
    }

    /// Count of every post the filters match, ignoring pagination
    pub fn build_count(&self) -> (String, Vec<SqlParam>) {
        (format!("{}{}", COUNT_POSTS, self.where_sql()), self.params.clone())
    }
}

/// Raw query string of `GET /api/posts`. Everything arrives as text and is
/// checked by `QueryValidator`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PostListParams {
    /// Words matched against title, description and tags (any word matches)
    pub search_text: Option<String>,
    /// Inclusive lower bound on upload time (RFC 3339 or YYYY-MM-DD)
    pub start_date: Option<String>,
    /// Inclusive upper bound on upload time (RFC 3339 or YYYY-MM-DD)
    pub end_date: Option<String>,
    /// Comma-separated tags; a post matches if it has any of them
    pub tags: Option<String>,
    /// Page number, starting at 1
    pub page: Option<String>,
    /// Page size, 1 to 100
    pub limit: Option<String>,
}

/// Store-independent post predicate
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostFilter {
    pub search_text: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl PostFilter {
    /// In-memory evaluation of the filter. Text search is a case-insensitive
    /// whole-word match over title, description and tags.
    pub fn matches(&self, post: &Post) -> bool {
        if let Some(start) = self.start_date {
            if post.upload_time < start {
                return false;
            }
        }
        if let Some(end) = self.end_date {
            if post.upload_time > end {
                return false;
            }
        }
        if !self.tags.is_empty() && !post.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }
        match self.search_text.as_deref() {
            Some(text) => {
                let terms = words(text);
                if terms.is_empty() {
                    return true;
                }
                let document: Vec<String> = words(&post.title)
                    .into_iter()
                    .chain(words(&post.description))
                    .chain(post.tags.iter().flat_map(|tag| words(tag)))
                    .collect();
                terms.iter().any(|term| document.contains(term))
            }
            None => true,
        }
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Skip/take pair for one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub skip: u64,
    pub limit: u64,
}

/// Validated listing request
#[derive(Debug, Clone, PartialEq)]
pub struct PostQuery {
    pub filter: PostFilter,
    pub page: u32,
    pub limit: u32,
}

impl PostQuery {
    pub fn window(&self) -> PageWindow {
        PageWindow {
            skip: (self.page as u64 - 1) * self.limit as u64,
            limit: self.limit as u64,
        }
    }
}

impl Default for PostQuery {
    fn default() -> Self {
        Self {
            filter: PostFilter::default(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// Pagination block of the listing response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total_posts: u64,
    pub total_pages: u64,
    pub current_page: u32,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl Pagination {
    /// `returned` is the number of posts on the current page
    pub fn new(total_posts: u64, page: u32, limit: u32, returned: usize) -> Self {
        let skip = (page as u64).saturating_sub(1) * limit as u64;
        Self {
            total_posts,
            total_pages: total_posts.div_ceil(limit.max(1) as u64),
            current_page: page,
            has_next_page: skip + (returned as u64) < total_posts,
            has_prev_page: page > 1,
        }
    }
}

/// Query parameter validator
pub struct QueryValidator;

impl QueryValidator {
    /// Validates and normalizes listing parameters, reporting every bad field
    pub fn validate(params: PostListParams) -> Result<PostQuery, ApiError> {
        let mut errors = Vec::new();

        let start_date = Self::parse_bound(params.start_date, "startDate", "Start date must be a valid date", &mut errors);
        let end_date = Self::parse_bound(params.end_date, "endDate", "End date must be a valid date", &mut errors);

        let page = match Self::normalize_string(params.page) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(page) if page >= 1 => page,
                _ => {
                    errors.push(FieldError::new("page", "Page must be a positive integer"));
                    DEFAULT_PAGE
                }
            },
            None => DEFAULT_PAGE,
        };

        let limit = match Self::normalize_string(params.limit) {
            Some(raw) => match raw.parse::<u32>() {
                Ok(limit) if (1..=MAX_LIMIT).contains(&limit) => limit,
                _ => {
                    errors.push(FieldError::new("limit", "Limit must be between 1 and 100"));
                    DEFAULT_LIMIT
                }
            },
            None => DEFAULT_LIMIT,
        };

        if !errors.is_empty() {
            return Err(ApiError::Validation(errors));
        }

        Ok(PostQuery {
            filter: PostFilter {
                search_text: Self::normalize_string(params.search_text),
                start_date,
                end_date,
                tags: Self::parse_tags(params.tags),
            },
            page,
            limit,
        })
    }

    fn parse_bound(
        raw: Option<String>,
        field: &str,
        message: &str,
        errors: &mut Vec<FieldError>,
    ) -> Option<DateTime<Utc>> {
        let raw = Self::normalize_string(raw)?;
        match Self::parse_date(&raw) {
            Some(date) => Some(date),
            None => {
                errors.push(FieldError::new(field, message));
                None
            }
        }
    }

    /// Accepts RFC 3339, an offset-less datetime (taken as UTC) or a bare
    /// date (midnight UTC)
    fn parse_date(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(date) = DateTime::parse_from_rfc3339(raw) {
            return Some(date.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Some(Utc.from_utc_datetime(&naive));
            }
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Utc.from_utc_datetime(&naive))
    }

    fn parse_tags(raw: Option<String>) -> Vec<String> {
        raw.map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|tag| !tag.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
    }

    /// Trims whitespace; empty strings count as absent
    fn normalize_string(s: Option<String>) -> Option<String> {
        s.and_then(|s| {
            let trimmed = s.trim().to_string();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed)
            }
        })
    }
}
