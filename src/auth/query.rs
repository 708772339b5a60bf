use serde::Deserialize;
use utoipa::IntoParams;

use crate::pagination::sql::{SqlFilter, SqlRelation, SqlTable, SqlValue};
use crate::pagination::{PageRequest, DEFAULT_LIMIT, DEFAULT_PAGE};

pub fn admin_table() -> SqlTable {
    SqlTable::new(
        "admins",
        "a",
        &["id", "username", "display_name", "is_active", "created_at"],
    )
    .relation(SqlRelation::new(
        "role",
        "LEFT JOIN roles r ON r.id = a.role_id",
        &["r.code AS role_code"],
    ))
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AdminListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive match on username or display name.
    pub search: Option<String>,
    pub is_active: Option<bool>,
    /// `id`, `created_at` or `username`.
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl AdminListQuery {
    pub fn to_filter(&self) -> SqlFilter {
        let mut filters = Vec::new();
        if let Some(term) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            filters.push(SqlFilter::Or(vec![
                SqlFilter::ILike("a.username".to_string(), term.to_string()),
                SqlFilter::ILike("a.display_name".to_string(), term.to_string()),
            ]));
        }
        if let Some(active) = self.is_active {
            filters.push(SqlFilter::Eq("a.is_active".to_string(), SqlValue::Bool(active)));
        }
        SqlFilter::and(filters)
    }

    pub fn page_request(&self) -> PageRequest<SqlFilter> {
        let mut request = PageRequest::new(self.to_filter())
            .page(self.page.unwrap_or(DEFAULT_PAGE))
            .limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .allow_sort(["id", "created_at", "username"])
            .expand(["role"]);
        if let Some(field) = self.sort_by.as_deref() {
            request = request.sort(format!("{} {}", field, self.sort_order.as_deref().unwrap_or("desc")));
        }
        request
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{resolve_sort, PageQuery, PaginationError, SortDirection};

    #[test]
    fn test_default_listing_sql() {
        let query = AdminListQuery::default();
        let request = query.page_request();
        let sort = resolve_sort(&request, "id").unwrap();
        assert_eq!(sort.field, "id");
        assert_eq!(sort.direction, SortDirection::Descending);

        let page = PageQuery {
            filter: &request.filter,
            sort: &sort,
            offset: request.offset(),
            limit: request.limit,
            projection: None,
            relations: &request.relations,
        };
        assert_eq!(
            admin_table().select_query(&page).sql(),
            "SELECT a.id, a.username, a.display_name, a.is_active, a.created_at, r.code AS role_code \
             FROM admins a LEFT JOIN roles r ON r.id = a.role_id WHERE TRUE \
             ORDER BY a.id DESC LIMIT $1 OFFSET $2"
        );
    }

    #[test]
    fn test_search_and_active_filter() {
        let query = AdminListQuery {
            search: Some("  jo ".to_string()),
            is_active: Some(false),
            ..AdminListQuery::default()
        };
        assert_eq!(
            query.to_filter(),
            SqlFilter::And(vec![
                SqlFilter::Or(vec![
                    SqlFilter::ILike("a.username".to_string(), "jo".to_string()),
                    SqlFilter::ILike("a.display_name".to_string(), "jo".to_string()),
                ]),
                SqlFilter::Eq("a.is_active".to_string(), SqlValue::Bool(false)),
            ])
        );

        let request = query.page_request();
        let count = admin_table().count_query(&request.filter, &request.relations);
        assert_eq!(
            count.sql(),
            "SELECT COUNT(DISTINCT a.id) FROM admins a LEFT JOIN roles r ON r.id = a.role_id \
             WHERE ((a.username ILIKE $1 OR a.display_name ILIKE $2) AND a.is_active = $3)"
        );
    }

    #[test]
    fn test_password_hash_is_not_sortable() {
        let query = AdminListQuery {
            sort_by: Some("password_hash".to_string()),
            ..AdminListQuery::default()
        };
        let err = resolve_sort(&query.page_request(), "id").unwrap_err();
        assert!(matches!(err, PaginationError::InvalidSortField(ref f) if f == "password_hash"));
    }

    #[test]
    fn test_username_sort() {
        let query = AdminListQuery {
            sort_by: Some("username".to_string()),
            sort_order: Some("ASC".to_string()),
            ..AdminListQuery::default()
        };
        let sort = resolve_sort(&query.page_request(), "id").unwrap();
        assert_eq!(sort.field, "username");
        assert_eq!(sort.direction, SortDirection::Ascending);
    }
}
