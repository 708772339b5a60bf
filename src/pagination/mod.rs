//! Generic offset pagination over pluggable persistence backends.
//!
//! A [`PageSource`] knows how to fetch one window of rows and how to count the
//! rows matching a filter. [`paginate`] validates the requested ordering,
//! runs both reads concurrently and assembles the page metadata. The filter
//! is opaque here: each backend defines its own predicate type and the engine
//! only hands the same value to the fetch and the count.
//!
//! - `sql` - relational backend built on `sqlx::QueryBuilder`
//! - `document` - backend over the in-process document store

pub mod document;
pub mod sql;


use std::error::Error as StdError;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const DEFAULT_PAGE: u64 = 1;
pub const DEFAULT_LIMIT: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum PaginationError {
    #[error("Invalid sort field: {0}")]
    InvalidSortField(String),
    #[error("Invalid sort value '{0}'. Must be ASC or DESC")]
    InvalidSortDirection(String),
    #[error("backend error: {0}")]
    Backend(#[source] Box<dyn StdError + Send + Sync>),
}

impl PaginationError {
    /// Caller errors are raised before any I/O happens.
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, PaginationError::Backend(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

impl SortDirection {
    pub fn parse(token: &str) -> Result<Self, PaginationError> {
        if token.eq_ignore_ascii_case("asc") {
            Ok(SortDirection::Ascending)
        } else if token.eq_ignore_ascii_case("desc") {
            Ok(SortDirection::Descending)
        } else {
            Err(PaginationError::InvalidSortDirection(token.to_string()))
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Field selection applied to serialized results. Never changes which rows
/// are selected or counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Include(Vec<String>),
    Exclude(Vec<String>),
}

impl Projection {
    /// Parses a select string such as `"-en.document -kh.document"` or
    /// `"username role"`. Mixing included and excluded fields is rejected.
    pub fn parse(select: &str) -> Option<Self> {
        let tokens: Vec<&str> = select.split_whitespace().collect();
        if tokens.is_empty() {
            return None;
        }

        let excluded = tokens.iter().filter(|t| t.starts_with('-')).count();
        if excluded == tokens.len() {
            Some(Projection::Exclude(
                tokens.iter().map(|t| t[1..].to_string()).collect(),
            ))
        } else if excluded == 0 {
            Some(Projection::Include(
                tokens.iter().map(|t| t.to_string()).collect(),
            ))
        } else {
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct PageRequest<F> {
    pub page: u64,
    pub limit: u64,
    /// `"<field>"` or `"<field> <ASC|DESC>"`.
    pub sort: Option<String>,
    /// Used when `sort` carries no direction token.
    pub sort_direction: SortDirection,
    pub filter: F,
    pub allowed_sort_fields: Vec<String>,
    pub projection: Option<Projection>,
    pub relations: Vec<String>,
}

impl<F> PageRequest<F> {
    pub fn new(filter: F) -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            sort: None,
            sort_direction: SortDirection::Descending,
            filter,
            allowed_sort_fields: Vec::new(),
            projection: None,
            relations: Vec::new(),
        }
    }

    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    pub fn sort(mut self, order_by: impl Into<String>) -> Self {
        self.sort = Some(order_by.into());
        self
    }

    pub fn sort_by(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort = Some(format!("{} {}", field, direction));
        self
    }

    pub fn sort_direction(mut self, direction: SortDirection) -> Self {
        self.sort_direction = direction;
        self
    }

    pub fn allow_sort<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_sort_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn project(mut self, projection: Projection) -> Self {
        self.projection = Some(projection);
        self
    }

    pub fn expand<I, S>(mut self, relations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.relations = relations.into_iter().map(Into::into).collect();
        self
    }

    /// Page and limit below one are treated as one.
    pub fn normalized_window(&self) -> (u64, u64) {
        (self.page.max(1), self.limit.max(1))
    }

    pub fn offset(&self) -> u64 {
        let (page, limit) = self.normalized_window();
        (page - 1).saturating_mul(limit)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageMeta {
    pub items_per_page: u64,
    pub current_page: u64,
    pub total_count: u64,
    pub total_pages: u64,
}

impl PageMeta {
    pub fn new(page: u64, limit: u64, total_count: u64) -> Self {
        let limit = limit.max(1);
        Self {
            items_per_page: limit,
            current_page: page.max(1),
            total_count,
            total_pages: total_count.div_ceil(limit).max(1),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult<T> {
    pub results: Vec<T>,
    pub meta: PageMeta,
}

impl<T> PageResult<T> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PageResult<U> {
        PageResult {
            results: self.results.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}

/// Everything a backend needs to read one window.
#[derive(Debug)]
pub struct PageQuery<'a, F> {
    pub filter: &'a F,
    pub sort: &'a SortSpec,
    pub offset: u64,
    pub limit: u64,
    pub projection: Option<&'a Projection>,
    pub relations: &'a [String],
}

#[async_trait]
pub trait PageSource: Send + Sync {
    type Item: Send;
    type Filter: Send + Sync;
    type Error: StdError + Send + Sync + 'static;

    /// Field used for the default ordering (newest first).
    fn identity_field(&self) -> &str;

    async fn fetch(&self, query: &PageQuery<'_, Self::Filter>) -> Result<Vec<Self::Item>, Self::Error>;

    async fn count(&self, filter: &Self::Filter, relations: &[String]) -> Result<u64, Self::Error>;
}

pub fn resolve_sort<F>(request: &PageRequest<F>, identity_field: &str) -> Result<SortSpec, PaginationError> {
    let order_by = match request.sort.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => {
            return Ok(SortSpec {
                field: identity_field.to_string(),
                direction: SortDirection::Descending,
            })
        }
    };

    let mut parts = order_by.split_whitespace();
    let field = parts.next().unwrap_or_default();
    let direction = match parts.next() {
        Some(token) => SortDirection::parse(token)?,
        None => request.sort_direction,
    };
    if let Some(extra) = parts.next() {
        return Err(PaginationError::InvalidSortDirection(extra.to_string()));
    }

    if !request.allowed_sort_fields.iter().any(|allowed| allowed == field) {
        return Err(PaginationError::InvalidSortField(field.to_string()));
    }

    Ok(SortSpec {
        field: field.to_string(),
        direction,
    })
}

pub async fn paginate<S>(source: &S, request: &PageRequest<S::Filter>) -> Result<PageResult<S::Item>, PaginationError>
where
    S: PageSource + ?Sized,
{
    let sort = resolve_sort(request, source.identity_field())?;
    let (page, limit) = request.normalized_window();

    let query = PageQuery {
        filter: &request.filter,
        sort: &sort,
        offset: request.offset(),
        limit,
        projection: request.projection.as_ref(),
        relations: &request.relations,
    };

    let (results, total_count) = futures::try_join!(
        source.fetch(&query),
        source.count(&request.filter, &request.relations),
    )
    .map_err(|e| PaginationError::Backend(Box::new(e)))?;

    Ok(PageResult {
        results,
        meta: PageMeta::new(page, limit, total_count),
    })
}
