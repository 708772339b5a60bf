//! Translation of listing query strings into document filters and page
//! requests.

use serde::Deserialize;
use utoipa::IntoParams;

use crate::document::Filter;
use crate::pagination::{PageRequest, Projection, DEFAULT_LIMIT, DEFAULT_PAGE};

const DEFAULT_SORT_FIELD: &str = "created_at";
const DEFAULT_SORT_ORDER: &str = "desc";

fn search_term(search: &Option<String>) -> Option<&str> {
    search.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn order_by(sort_by: &Option<String>, sort_order: &Option<String>) -> String {
    let field = sort_by.as_deref().unwrap_or(DEFAULT_SORT_FIELD);
    // Titles live per locale; English is the sort key.
    let field = if field == "title" { "en.title" } else { field };
    format!("{} {}", field, sort_order.as_deref().unwrap_or(DEFAULT_SORT_ORDER))
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TagQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Case-insensitive match on either locale's name.
    pub search: Option<String>,
    /// `created_at` or `updated_at`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`.
    pub sort_order: Option<String>,
}

impl TagQuery {
    pub fn to_filter(&self) -> Filter {
        match search_term(&self.search) {
            Some(term) => Filter::or(vec![Filter::contains("en.name", term), Filter::contains("kh.name", term)]),
            None => Filter::All,
        }
    }

    pub fn page_request(&self) -> PageRequest<Filter> {
        PageRequest::new(self.to_filter())
            .page(self.page.unwrap_or(DEFAULT_PAGE))
            .limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .sort(order_by(&self.sort_by, &self.sort_order))
            .allow_sort(["created_at", "updated_at"])
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MinistryQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub search: Option<String>,
    /// Only ministries that carry this locale (`en` or `kh`).
    pub lang: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl MinistryQuery {
    pub fn to_filter(&self) -> Filter {
        let mut filters = vec![Filter::is_null("deleted_at")];
        if let Some(term) = search_term(&self.search) {
            filters.push(Filter::or(vec![
                Filter::contains("en.name", term),
                Filter::contains("kh.name", term),
            ]));
        }
        if let Some(lang) = self.lang.as_deref().filter(|l| matches!(*l, "en" | "kh")) {
            filters.push(Filter::exists(&format!("{}.name", lang)));
        }
        Filter::and(filters)
    }

    pub fn page_request(&self) -> PageRequest<Filter> {
        PageRequest::new(self.to_filter())
            .page(self.page.unwrap_or(DEFAULT_PAGE))
            .limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .sort(order_by(&self.sort_by, &self.sort_order))
            .allow_sort(["created_at", "updated_at"])
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ContentQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Comma separated list of categories.
    pub category: Option<String>,
    pub status: Option<String>,
    /// Tag id.
    pub tag: Option<String>,
    /// Calendar year of `created_at`.
    pub year: Option<i32>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_deleted: bool,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ContentQuery {
    pub fn categories(&self) -> Vec<String> {
        self.category
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn to_filter(&self) -> Filter {
        let mut filters = Vec::new();
        if !self.include_deleted {
            filters.push(Filter::is_null("deleted_at"));
        }

        let categories = self.categories();
        if !categories.is_empty() {
            filters.push(Filter::is_in("category", categories));
        }
        if let Some(status) = self.status.as_deref().filter(|s| !s.is_empty()) {
            filters.push(Filter::eq("status", status));
        }
        if let Some(tag) = self.tag.as_deref().filter(|t| !t.is_empty()) {
            filters.push(Filter::eq("tags", tag));
        }
        if let Some(term) = search_term(&self.search) {
            filters.push(Filter::or(vec![
                Filter::contains("en.title", term),
                Filter::contains("kh.title", term),
            ]));
        }
        if let Some(year) = self.year {
            filters.push(Filter::gte("created_at", format!("{:04}-01-01T00:00:00Z", year)));
            filters.push(Filter::lte("created_at", format!("{:04}-12-31T23:59:59.999999999Z", year)));
        }
        Filter::and(filters)
    }

    pub fn page_request(&self) -> PageRequest<Filter> {
        PageRequest::new(self.to_filter())
            .page(self.page.unwrap_or(DEFAULT_PAGE))
            .limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .sort(order_by(&self.sort_by, &self.sort_order))
            .allow_sort(["created_at", "updated_at", "en.title", "category", "status"])
            .expand(["tags", "source"])
            .project(Projection::Exclude(vec!["en.document".to_string(), "kh.document".to_string()]))
    }
}

/// Resources sort on their publication date by default.
const RESOURCE_SORT_FIELD: &str = "publishedAt";

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResourceQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sub_type: Option<String>,
    pub lang: Option<String>,
    /// Ministry id.
    pub source: Option<String>,
    /// Case-insensitive match on the title.
    pub keyword: Option<String>,
    /// Calendar year of `publishedAt`.
    pub year: Option<i32>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl ResourceQuery {
    pub fn to_filter(&self) -> Filter {
        let mut filters = Vec::new();
        for (field, value) in [
            ("type", &self.kind),
            ("sub_type", &self.sub_type),
            ("lang", &self.lang),
            ("source", &self.source),
        ] {
            if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
                filters.push(Filter::eq(field, value));
            }
        }
        if let Some(term) = search_term(&self.keyword) {
            filters.push(Filter::contains("title", term));
        }
        if let Some(year) = self.year {
            filters.push(Filter::gte("publishedAt", format!("{:04}-01-01T00:00:00Z", year)));
            filters.push(Filter::lte("publishedAt", format!("{:04}-12-31T23:59:59.999999999Z", year)));
        }
        Filter::and(filters)
    }

    pub fn page_request(&self) -> PageRequest<Filter> {
        let field = self.sort_by.as_deref().unwrap_or(RESOURCE_SORT_FIELD);
        let order = self.sort_order.as_deref().unwrap_or(DEFAULT_SORT_ORDER);
        PageRequest::new(self.to_filter())
            .page(self.page.unwrap_or(DEFAULT_PAGE))
            .limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .sort(format!("{} {}", field, order))
            .allow_sort(["publishedAt", "title", "created_at", "type", "lang"])
            .expand(["source"])
    }
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PartnerQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    /// Matches names and descriptions in either locale.
    pub search: Option<String>,
    /// Only partners that carry this locale (`en` or `kh`).
    pub lang: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

impl PartnerQuery {
    pub fn to_filter(&self) -> Filter {
        let mut filters = vec![Filter::is_null("deleted_at")];
        if let Some(term) = search_term(&self.search) {
            filters.push(Filter::or(
                ["en.name", "kh.name", "en.description", "kh.description"]
                    .into_iter()
                    .map(|field| Filter::contains(field, term))
                    .collect(),
            ));
        }
        if let Some(lang) = self.lang.as_deref().filter(|l| matches!(*l, "en" | "kh")) {
            filters.push(Filter::exists(lang));
        }
        Filter::and(filters)
    }

    pub fn page_request(&self) -> PageRequest<Filter> {
        PageRequest::new(self.to_filter())
            .page(self.page.unwrap_or(DEFAULT_PAGE))
            .limit(self.limit.unwrap_or(DEFAULT_LIMIT))
            .sort(order_by(&self.sort_by, &self.sort_order))
            .allow_sort(["created_at", "updated_at"])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pagination::{resolve_sort, PaginationError, SortDirection};
    use serde_json::json;

    #[test]
    fn test_tag_query_defaults() {
        let request = TagQuery::default().page_request();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        let sort = resolve_sort(&request, "_id").unwrap();
        assert_eq!(sort.field, "created_at");
        assert_eq!(sort.direction, SortDirection::Descending);
        assert!(request.filter.matches(&json!({"en": {"name": "x"}})));
    }

    #[test]
    fn test_tag_query_rejects_unknown_sort() {
        let query = TagQuery {
            sort_by: Some("en.name".to_string()),
            ..TagQuery::default()
        };
        let err = resolve_sort(&query.page_request(), "_id").unwrap_err();
        assert!(matches!(err, PaginationError::InvalidSortField(_)));
    }

    #[test]
    fn test_ministry_lang_filter() {
        let query = MinistryQuery {
            lang: Some("kh".to_string()),
            ..MinistryQuery::default()
        };
        let filter = query.to_filter();
        assert!(filter.matches(&json!({"kh": {"name": "ក្រសួង"}, "deleted_at": null})));
        assert!(!filter.matches(&json!({"en": {"name": "Ministry"}, "deleted_at": null})));
        assert!(!filter.matches(&json!({"kh": {"name": "x"}, "deleted_at": "2024-01-01T00:00:00Z"})));
    }

    #[test]
    fn test_content_filter_translation() {
        let query = ContentQuery {
            category: Some("news, events,".to_string()),
            status: Some("published".to_string()),
            tag: Some("t1".to_string()),
            year: Some(2024),
            search: Some("budget".to_string()),
            ..ContentQuery::default()
        };
        assert_eq!(query.categories(), vec!["news".to_string(), "events".to_string()]);

        let filter = query.to_filter();
        let doc = json!({
            "en": {"title": "Budget 2024"},
            "category": "events",
            "status": "published",
            "tags": ["t0", "t1"],
            "created_at": "2024-06-01T08:00:00Z",
            "deleted_at": null,
        });
        assert!(filter.matches(&doc));

        let mut other_year = doc.clone();
        other_year["created_at"] = json!("2025-01-01T00:00:00Z");
        assert!(!filter.matches(&other_year));

        let mut deleted = doc.clone();
        deleted["deleted_at"] = json!("2024-07-01T00:00:00Z");
        assert!(!filter.matches(&deleted));

        let include = ContentQuery {
            include_deleted: true,
            ..ContentQuery::default()
        };
        assert!(include.to_filter().matches(&deleted));
    }

    #[test]
    fn test_content_sort_by_title_uses_english_title() {
        let query = ContentQuery {
            sort_by: Some("title".to_string()),
            sort_order: Some("asc".to_string()),
            ..ContentQuery::default()
        };
        let request = query.page_request();
        let sort = resolve_sort(&request, "_id").unwrap();
        assert_eq!(sort.field, "en.title");
        assert_eq!(sort.direction, SortDirection::Ascending);
        assert_eq!(request.relations, vec!["tags".to_string(), "source".to_string()]);
    }

    #[test]
    fn test_content_bad_sort_order() {
        let query = ContentQuery {
            sort_order: Some("sideways".to_string()),
            ..ContentQuery::default()
        };
        let err = resolve_sort(&query.page_request(), "_id").unwrap_err();
        assert!(matches!(err, PaginationError::InvalidSortDirection(ref d) if d == "sideways"));
    }

    #[test]
    fn test_resource_query_defaults_to_newest_publication() {
        let request = ResourceQuery::default().page_request();
        let sort = resolve_sort(&request, "_id").unwrap();
        assert_eq!(sort.field, "publishedAt");
        assert_eq!(sort.direction, SortDirection::Descending);
        assert_eq!(request.relations, vec!["source".to_string()]);
        assert!(request.filter.matches(&json!({"title": "anything"})));
    }

    #[test]
    fn test_resource_filter_translation() {
        let query = ResourceQuery {
            kind: Some("law".to_string()),
            lang: Some("kh".to_string()),
            source: Some("m1".to_string()),
            keyword: Some(" TAX ".to_string()),
            year: Some(2023),
            ..ResourceQuery::default()
        };
        let doc = json!({
            "title": "Tax code amendments",
            "type": "law",
            "lang": "kh",
            "source": "m1",
            "publishedAt": "2023-12-31T23:00:00Z",
        });
        let filter = query.to_filter();
        assert!(filter.matches(&doc));

        let mut other_type = doc.clone();
        other_type["type"] = json!("form");
        assert!(!filter.matches(&other_type));

        let mut next_year = doc.clone();
        next_year["publishedAt"] = json!("2024-01-01T00:00:00Z");
        assert!(!filter.matches(&next_year));

        let mut other_title = doc.clone();
        other_title["title"] = json!("Budget law");
        assert!(!filter.matches(&other_title));
    }

    #[test]
    fn test_resource_sort_by_title_stays_top_level() {
        let query = ResourceQuery {
            sort_by: Some("title".to_string()),
            sort_order: Some("asc".to_string()),
            ..ResourceQuery::default()
        };
        let sort = resolve_sort(&query.page_request(), "_id").unwrap();
        assert_eq!(sort.field, "title");
        assert_eq!(sort.direction, SortDirection::Ascending);

        let query = ResourceQuery {
            sort_by: Some("download_count".to_string()),
            ..ResourceQuery::default()
        };
        let err = resolve_sort(&query.page_request(), "_id").unwrap_err();
        assert!(matches!(err, PaginationError::InvalidSortField(ref f) if f == "download_count"));
    }

    #[test]
    fn test_partner_query_filters_and_sort() {
        let query = PartnerQuery {
            search: Some("water".to_string()),
            lang: Some("en".to_string()),
            ..PartnerQuery::default()
        };
        let filter = query.to_filter();
        let partner = json!({
            "en": {"name": "Aqua Alliance", "description": "Clean water programs", "lang": "en"},
            "deleted_at": null,
        });
        assert!(filter.matches(&partner));
        assert!(!filter.matches(&json!({"kh": {"name": "water", "description": "", "lang": "kh"}})));

        let mut deleted = partner.clone();
        deleted["deleted_at"] = json!("2024-02-01T00:00:00Z");
        assert!(!filter.matches(&deleted));

        let request = query.page_request();
        assert_eq!(request.page, 1);
        assert_eq!(request.limit, 10);
        let sort = resolve_sort(&request, "_id").unwrap();
        assert_eq!(sort.field, "created_at");
        assert_eq!(sort.direction, SortDirection::Descending);

        let bad = PartnerQuery {
            sort_by: Some("url".to_string()),
            ..PartnerQuery::default()
        };
        assert!(resolve_sort(&bad.page_request(), "_id").is_err());
    }
}
