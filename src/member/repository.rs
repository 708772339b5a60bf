use async_trait::async_trait;

use super::model::{Member, MemberListQuery, Position, PositionInfo};
use crate::document::{DocumentStore, Filter, ID_FIELD};
use crate::error::AppError;
use crate::pagination::document::DocumentSource;
use crate::pagination::{paginate, PageRequest, PageResult, SortDirection, SortSpec, DEFAULT_LIMIT, DEFAULT_PAGE};

pub const MEMBERS: &str = "members";
pub const POSITIONS: &str = "positions";

/// Read/write port for members and positions.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Distinct generations of active members, in any order.
    async fn generations(&self) -> Result<Vec<i32>, AppError>;

    /// Active members of one generation, oldest first.
    async fn members_in_generation(&self, generation: i32) -> Result<Vec<Member>, AppError>;

    /// Active members, oldest first.
    async fn active_members(&self) -> Result<Vec<Member>, AppError>;

    async fn list_members(&self, query: &MemberListQuery) -> Result<PageResult<Member>, AppError>;

    /// Looks up a member whether or not it is deleted.
    async fn find_member(&self, id: &str) -> Result<Option<Member>, AppError>;

    async fn insert_member(&self, member: &Member) -> Result<(), AppError>;

    async fn save_member(&self, member: &Member) -> Result<bool, AppError>;

    async fn positions(&self) -> Result<Vec<Position>, AppError>;

    async fn find_position(&self, id: &str) -> Result<Option<Position>, AppError>;

    /// True when another position already uses either locale's title and level.
    async fn position_taken(&self, en: &PositionInfo, kh: &PositionInfo, except: Option<&str>) -> Result<bool, AppError>;

    /// True when an active member holds the position.
    async fn position_in_use(&self, id: &str) -> Result<bool, AppError>;

    async fn insert_position(&self, position: &Position) -> Result<(), AppError>;

    async fn save_position(&self, position: &Position) -> Result<bool, AppError>;

    async fn delete_position(&self, id: &str) -> Result<bool, AppError>;
}

fn active() -> Filter {
    Filter::is_null("deleted_at")
}

fn oldest_first() -> SortSpec {
    SortSpec {
        field: "created_at".to_string(),
        direction: SortDirection::Ascending,
    }
}

pub fn member_filter(query: &MemberListQuery) -> Filter {
    let mut filters = vec![active()];
    if let Some(generation) = query.generation {
        filters.push(Filter::eq("generation", generation));
    }
    if let Some(search) = query.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        filters.push(Filter::or(vec![
            Filter::contains("en.name", search),
            Filter::contains("kh.name", search),
        ]));
    }
    Filter::and(filters)
}

fn locale_clash(locale: &str, info: &PositionInfo) -> Filter {
    Filter::and(vec![
        Filter::eq(&format!("{}.title", locale), info.title.as_str()),
        Filter::eq(&format!("{}.level", locale), info.level),
    ])
}

#[derive(Clone)]
pub struct DocumentMemberRepository {
    store: DocumentStore,
}

impl DocumentMemberRepository {
    pub fn new(store: &DocumentStore) -> Self {
        Self { store: store.clone() }
    }
}

#[async_trait]
impl MemberRepository for DocumentMemberRepository {
    async fn generations(&self) -> Result<Vec<i32>, AppError> {
        Ok(self
            .store
            .collection(MEMBERS)
            .distinct("generation", &active())
            .into_iter()
            .filter_map(|v| v.as_i64().and_then(|g| i32::try_from(g).ok()))
            .collect())
    }

    async fn members_in_generation(&self, generation: i32) -> Result<Vec<Member>, AppError> {
        let filter = Filter::and(vec![active(), Filter::eq("generation", generation)]);
        Ok(self.store.collection(MEMBERS).find_as(&filter, Some(&oldest_first()))?)
    }

    async fn active_members(&self) -> Result<Vec<Member>, AppError> {
        Ok(self.store.collection(MEMBERS).find_as(&active(), Some(&oldest_first()))?)
    }

    async fn list_members(&self, query: &MemberListQuery) -> Result<PageResult<Member>, AppError> {
        let source: DocumentSource<Member> = DocumentSource::new(&self.store, MEMBERS);
        let request = PageRequest::new(member_filter(query))
            .page(query.page.unwrap_or(DEFAULT_PAGE))
            .limit(query.limit.unwrap_or(DEFAULT_LIMIT));
        Ok(paginate(&source, &request).await?)
    }

    async fn find_member(&self, id: &str) -> Result<Option<Member>, AppError> {
        Ok(self.store.collection(MEMBERS).get(id)?)
    }

    async fn insert_member(&self, member: &Member) -> Result<(), AppError> {
        Ok(self.store.collection(MEMBERS).insert(member)?)
    }

    async fn save_member(&self, member: &Member) -> Result<bool, AppError> {
        Ok(self.store.collection(MEMBERS).replace(member)?)
    }

    async fn positions(&self) -> Result<Vec<Position>, AppError> {
        let by_level = SortSpec {
            field: "en.level".to_string(),
            direction: SortDirection::Ascending,
        };
        Ok(self.store.collection(POSITIONS).find_as(&Filter::All, Some(&by_level))?)
    }

    async fn find_position(&self, id: &str) -> Result<Option<Position>, AppError> {
        Ok(self.store.collection(POSITIONS).get(id)?)
    }

    async fn position_taken(&self, en: &PositionInfo, kh: &PositionInfo, except: Option<&str>) -> Result<bool, AppError> {
        let mut filters = vec![Filter::or(vec![locale_clash("en", en), locale_clash("kh", kh)])];
        if let Some(id) = except {
            filters.push(Filter::ne(ID_FIELD, id));
        }
        Ok(self.store.collection(POSITIONS).exists(&Filter::and(filters)))
    }

    async fn position_in_use(&self, id: &str) -> Result<bool, AppError> {
        let filter = Filter::and(vec![active(), Filter::eq("position", id)]);
        Ok(self.store.collection(MEMBERS).exists(&filter))
    }

    async fn insert_position(&self, position: &Position) -> Result<(), AppError> {
        Ok(self.store.collection(POSITIONS).insert(position)?)
    }

    async fn save_position(&self, position: &Position) -> Result<bool, AppError> {
        Ok(self.store.collection(POSITIONS).replace(position)?)
    }

    async fn delete_position(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.store.collection(POSITIONS).delete(id))
    }
}
