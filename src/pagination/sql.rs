//! Pagination over a Postgres table with `sqlx::QueryBuilder`.
//!
//! The count query shares the select's joins and filter but counts distinct
//! identities, so joined relations never change `total_count`.

use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{PageQuery, PageSource, Projection, SortSpec};

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i64),
    Bool(bool),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

/// A predicate that knows how to render itself into a `WHERE` clause.
pub trait SqlPredicate: Send + Sync {
    fn apply_to<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>);
}

/// Column names are trusted identifiers supplied by the service layer.
/// Values are always bound as parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlFilter {
    All,
    Eq(String, SqlValue),
    /// Case-insensitive substring match.
    ILike(String, String),
    IsNull(String),
    And(Vec<SqlFilter>),
    Or(Vec<SqlFilter>),
}

impl SqlFilter {
    pub fn and(filters: Vec<SqlFilter>) -> Self {
        let mut filters: Vec<SqlFilter> = filters.into_iter().filter(|f| *f != SqlFilter::All).collect();
        match filters.len() {
            0 => SqlFilter::All,
            1 => filters.remove(0),
            _ => SqlFilter::And(filters),
        }
    }
}

fn escape_like(needle: &str) -> String {
    needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn push_value<'args>(qb: &mut QueryBuilder<'args, Postgres>, value: &SqlValue) {
    match value {
        SqlValue::Text(v) => {
            qb.push_bind(v.clone());
        }
        SqlValue::Int(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Bool(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Uuid(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Timestamp(v) => {
            qb.push_bind(*v);
        }
    }
}

impl SqlPredicate for SqlFilter {
    fn apply_to<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>) {
        match self {
            SqlFilter::All => {
                qb.push("TRUE");
            }
            SqlFilter::Eq(column, value) => {
                qb.push(column).push(" = ");
                push_value(qb, value);
            }
            SqlFilter::ILike(column, needle) => {
                qb.push(column)
                    .push(" ILIKE ")
                    .push_bind(format!("%{}%", escape_like(needle)));
            }
            SqlFilter::IsNull(column) => {
                qb.push(column).push(" IS NULL");
            }
            SqlFilter::And(filters) | SqlFilter::Or(filters) => {
                if filters.is_empty() {
                    qb.push(if matches!(self, SqlFilter::And(_)) { "TRUE" } else { "FALSE" });
                    return;
                }
                let joiner = if matches!(self, SqlFilter::And(_)) { " AND " } else { " OR " };
                qb.push("(");
                for (i, filter) in filters.iter().enumerate() {
                    if i > 0 {
                        qb.push(joiner);
                    }
                    filter.apply_to(qb);
                }
                qb.push(")");
            }
        }
    }
}

/// A named LEFT JOIN that contributes extra columns when requested.
#[derive(Debug, Clone)]
pub struct SqlRelation {
    pub name: String,
    pub join: String,
    pub columns: Vec<String>,
}

impl SqlRelation {
    pub fn new(name: &str, join: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            join: join.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// Table description used to render the page and count statements.
#[derive(Debug, Clone)]
pub struct SqlTable {
    pub table: String,
    pub alias: String,
    pub id_column: String,
    pub columns: Vec<String>,
    pub relations: Vec<SqlRelation>,
}

impl SqlTable {
    pub fn new(table: &str, alias: &str, columns: &[&str]) -> Self {
        Self {
            table: table.to_string(),
            alias: alias.to_string(),
            id_column: "id".to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            relations: Vec::new(),
        }
    }

    pub fn relation(mut self, relation: SqlRelation) -> Self {
        self.relations.push(relation);
        self
    }

    fn requested<'a>(&'a self, names: &'a [String]) -> impl Iterator<Item = &'a SqlRelation> {
        self.relations.iter().filter(move |r| names.contains(&r.name))
    }

    fn selected_columns(&self, projection: Option<&Projection>, relations: &[String]) -> Vec<String> {
        let keep = |column: &String| match projection {
            None => true,
            Some(Projection::Include(fields)) => *column == self.id_column || fields.contains(column),
            Some(Projection::Exclude(fields)) => !fields.contains(column),
        };

        let mut columns: Vec<String> = self
            .columns
            .iter()
            .filter(|c| keep(c))
            .map(|c| format!("{}.{}", self.alias, c))
            .collect();
        for relation in self.requested(relations) {
            columns.extend(relation.columns.iter().cloned());
        }
        columns
    }

    fn push_from<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>, relations: &[String]) {
        qb.push(" FROM ").push(&self.table).push(" ").push(&self.alias);
        for relation in self.requested(relations) {
            qb.push(" ").push(&relation.join);
        }
    }

    fn push_order<'args>(&self, qb: &mut QueryBuilder<'args, Postgres>, sort: &SortSpec) {
        qb.push(" ORDER BY ")
            .push(format!("{}.{} {}", self.alias, sort.field, sort.direction.as_sql()));
        if sort.field != self.id_column {
            qb.push(format!(", {}.{} {}", self.alias, self.id_column, sort.direction.as_sql()));
        }
    }

    pub fn select_query<'args, F: SqlPredicate>(&self, query: &PageQuery<'_, F>) -> QueryBuilder<'args, Postgres> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(self.selected_columns(query.projection, query.relations).join(", "));
        self.push_from(&mut qb, query.relations);
        qb.push(" WHERE ");
        query.filter.apply_to(&mut qb);
        self.push_order(&mut qb, query.sort);
        qb.push(" LIMIT ")
            .push_bind(i64::try_from(query.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(query.offset).unwrap_or(i64::MAX));
        qb
    }

    pub fn count_query<'args, F: SqlPredicate>(&self, filter: &F, relations: &[String]) -> QueryBuilder<'args, Postgres> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(DISTINCT {}.{})", self.alias, self.id_column));
        self.push_from(&mut qb, relations);
        qb.push(" WHERE ");
        filter.apply_to(&mut qb);
        qb
    }
}

pub struct SqlSource<T, F = SqlFilter> {
    pool: PgPool,
    table: SqlTable,
    _marker: PhantomData<fn() -> (T, F)>,
}

impl<T, F> SqlSource<T, F> {
    pub fn new(pool: PgPool, table: SqlTable) -> Self {
        Self {
            pool,
            table,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<T, F> PageSource for SqlSource<T, F>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    F: SqlPredicate,
{
    type Item = T;
    type Filter = F;
    type Error = sqlx::Error;

    fn identity_field(&self) -> &str {
        &self.table.id_column
    }

    async fn fetch(&self, query: &PageQuery<'_, F>) -> Result<Vec<T>, sqlx::Error> {
        let mut qb = self.table.select_query(query);
        qb.build_query_as::<T>().fetch_all(&self.pool).await
    }

    async fn count(&self, filter: &F, relations: &[String]) -> Result<u64, sqlx::Error> {
        let mut qb = self.table.count_query(filter, relations);
        let total: i64 = qb.build_query_scalar().fetch_one(&self.pool).await?;
        Ok(u64::try_from(total).unwrap_or(0))
    }
}
