use chrono::Utc;

use super::model::{
    Content, ContentInfo, ContentInfoPatch, ContentSummary, CreateContentRequest, CreateResourceRequest, Ministry,
    MinistryRequest, Partner, PartnerInfo, PartnerInfoPatch, PartnerRequest, Resource, ResourceFile,
    ResourceFileRequest, ResourceView, Tag, TagRequest, UpdateContentRequest, UpdateMinistryRequest,
    UpdatePartnerRequest, UpdateResourceRequest, UpdateTagRequest,
};
use super::query::{ContentQuery, MinistryQuery, PartnerQuery, ResourceQuery, TagQuery};
use crate::document::{new_id, Collection, DocumentStore, Filter, ID_FIELD};
use crate::error::AppError;
use crate::pagination::document::{DocumentSource, Relation};
use crate::pagination::{paginate, PageResult, Projection};

pub const TAGS: &str = "tags";
pub const MINISTRIES: &str = "ministries";
pub const CONTENTS: &str = "contents";
pub const RESOURCES: &str = "resources";
pub const PARTNERS: &str = "partners";

/// Fails with 422 when another document in `collection` already uses one of
/// the localized names. Missing locales are not compared.
fn ensure_unique_names(
    collection: &Collection,
    field: &str,
    en: Option<&str>,
    kh: Option<&str>,
    except: Option<&str>,
    message: &str,
) -> Result<(), AppError> {
    let names: Vec<Filter> = [("en", en), ("kh", kh)]
        .into_iter()
        .filter_map(|(locale, name)| name.map(|n| Filter::eq(&format!("{}.{}", locale, field), n)))
        .collect();
    if names.is_empty() {
        return Ok(());
    }
    let mut filters = vec![Filter::or(names)];
    if let Some(id) = except {
        filters.push(Filter::ne(ID_FIELD, id));
    }
    if collection.exists(&Filter::and(filters)) {
        return Err(AppError::Unprocessable(message.to_string()));
    }
    Ok(())
}

fn active_ministry(store: &DocumentStore, id: &str) -> Result<Option<Ministry>, AppError> {
    Ok(store
        .collection(MINISTRIES)
        .get::<Ministry>(id)?
        .filter(|m| m.deleted_at.is_none()))
}

#[derive(Clone)]
pub struct TagService {
    store: DocumentStore,
}

impl TagService {
    pub fn new(store: &DocumentStore) -> Self {
        Self { store: store.clone() }
    }

    fn tags(&self) -> Collection {
        self.store.collection(TAGS)
    }

    pub async fn list(&self, query: &TagQuery) -> Result<PageResult<Tag>, AppError> {
        let source: DocumentSource<Tag> = DocumentSource::new(&self.store, TAGS);
        Ok(paginate(&source, &query.page_request()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Tag, AppError> {
        self.tags()
            .get(id)?
            .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))
    }

    pub async fn create(&self, req: TagRequest) -> Result<Tag, AppError> {
        ensure_unique_names(
            &self.tags(),
            "name",
            Some(req.en.name.as_str()),
            Some(req.kh.name.as_str()),
            None,
            "Tag already exists",
        )?;
        let now = Utc::now();
        let tag = Tag {
            id: new_id().to_string(),
            en: req.en,
            kh: req.kh,
            created_at: now,
            updated_at: now,
        };
        self.tags().insert(&tag)?;
        Ok(tag)
    }

    pub async fn update(&self, id: &str, req: UpdateTagRequest) -> Result<Tag, AppError> {
        let mut tag = self.get(id).await?;
        for (info, patch) in [(&mut tag.en, req.en), (&mut tag.kh, req.kh)] {
            if let Some(patch) = patch {
                if let Some(name) = patch.name {
                    info.name = name;
                }
                if let Some(lang) = patch.lang {
                    info.lang = lang;
                }
            }
        }
        ensure_unique_names(
            &self.tags(),
            "name",
            Some(tag.en.name.as_str()),
            Some(tag.kh.name.as_str()),
            Some(id),
            "Tag already exists",
        )?;
        tag.updated_at = Utc::now();
        self.tags().replace(&tag)?;
        Ok(tag)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.tags().delete(id) {
            return Err(AppError::NotFound("Tag not found".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct MinistryService {
    store: DocumentStore,
}

impl MinistryService {
    pub fn new(store: &DocumentStore) -> Self {
        Self { store: store.clone() }
    }

    fn ministries(&self) -> Collection {
        self.store.collection(MINISTRIES)
    }

    pub async fn list(&self, query: &MinistryQuery) -> Result<PageResult<Ministry>, AppError> {
        let source: DocumentSource<Ministry> = DocumentSource::new(&self.store, MINISTRIES);
        Ok(paginate(&source, &query.page_request()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Ministry, AppError> {
        self.ministries()
            .get::<Ministry>(id)?
            .filter(|m| m.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("Ministry not found".to_string()))
    }

    pub async fn create(&self, req: MinistryRequest) -> Result<Ministry, AppError> {
        ensure_unique_names(
            &self.ministries(),
            "name",
            Some(req.en.name.as_str()),
            Some(req.kh.name.as_str()),
            None,
            "Ministry already exists",
        )?;
        let now = Utc::now();
        let ministry = Ministry {
            id: new_id().to_string(),
            en: req.en,
            kh: req.kh,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.ministries().insert(&ministry)?;
        Ok(ministry)
    }

    pub async fn update(&self, id: &str, req: UpdateMinistryRequest) -> Result<Ministry, AppError> {
        let mut ministry = self.get(id).await?;
        for (info, patch) in [(&mut ministry.en, req.en), (&mut ministry.kh, req.kh)] {
            if let Some(patch) = patch {
                if let Some(name) = patch.name {
                    info.name = name;
                }
                if let Some(image_url) = patch.image_url {
                    info.image_url = image_url;
                }
            }
        }
        ensure_unique_names(
            &self.ministries(),
            "name",
            Some(ministry.en.name.as_str()),
            Some(ministry.kh.name.as_str()),
            Some(id),
            "Ministry already exists",
        )?;
        ministry.updated_at = Utc::now();
        self.ministries().replace(&ministry)?;
        Ok(ministry)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut ministry = self.get(id).await?;
        let now = Utc::now();
        ministry.deleted_at = Some(now);
        ministry.updated_at = now;
        self.ministries().replace(&ministry)?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct ContentService {
    store: DocumentStore,
}

impl ContentService {
    pub fn new(store: &DocumentStore) -> Self {
        Self { store: store.clone() }
    }

    fn contents(&self) -> Collection {
        self.store.collection(CONTENTS)
    }

    fn source(&self) -> DocumentSource<ContentSummary> {
        DocumentSource::new(&self.store, CONTENTS)
            .relation(Relation::new("tags", TAGS))
            .relation(Relation::new("source", MINISTRIES).select(Projection::Exclude(vec!["deleted_at".to_string()])))
    }

    pub async fn list(&self, query: &ContentQuery) -> Result<PageResult<ContentSummary>, AppError> {
        Ok(paginate(&self.source(), &query.page_request()).await?)
    }

    fn find_active(&self, id: &str) -> Result<Content, AppError> {
        self.contents()
            .get::<Content>(id)?
            .filter(|c| c.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("Content not found".to_string()))
    }

    /// Returns the content and bumps its view counter.
    pub async fn view(&self, id: &str) -> Result<Content, AppError> {
        self.find_active(id)?;
        self.contents()
            .update_with(id, |content: &mut Content| content.view_count += 1)?
            .ok_or_else(|| AppError::NotFound("Content not found".to_string()))
    }

    fn check_references(&self, tags: &[String], source: &str) -> Result<(), AppError> {
        if tags.is_empty() {
            return Err(AppError::BadRequest("At least one tag is required".to_string()));
        }
        let known = self.store.collection(TAGS);
        if let Some(missing) = tags.iter().find(|t| known.find_by_id(t).is_none()) {
            return Err(AppError::NotFound(format!("Tag {} not found", missing)));
        }
        active_ministry(&self.store, source)?
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound("Ministry not found".to_string()))
    }

    pub async fn create(&self, req: CreateContentRequest, created_by: Option<String>) -> Result<Content, AppError> {
        if req.en.is_none() && req.kh.is_none() {
            return Err(AppError::BadRequest("Content needs at least one locale".to_string()));
        }
        self.check_references(&req.tags, &req.source)?;

        let now = Utc::now();
        let content = Content {
            id: new_id().to_string(),
            en: req.en,
            kh: req.kh,
            category: req.category,
            tags: req.tags,
            cover: req.cover,
            source: req.source,
            status: req.status,
            created_by,
            view_count: 0,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.contents().insert(&content)?;
        Ok(content)
    }

    pub async fn update(&self, id: &str, req: UpdateContentRequest) -> Result<Content, AppError> {
        let mut content = self.find_active(id)?;

        if req.tags.is_some() || req.source.is_some() {
            let tags = req.tags.as_deref().unwrap_or(&content.tags);
            let source = req.source.as_deref().unwrap_or(&content.source);
            self.check_references(tags, source)?;
        }
        if let Some(tags) = req.tags {
            content.tags = tags;
        }
        if let Some(source) = req.source {
            content.source = source;
        }
        if let Some(cover) = req.cover.filter(|c| !c.is_empty()) {
            content.cover = cover;
        }
        if let Some(category) = req.category {
            content.category = Some(category);
        }
        if let Some(status) = req.status {
            content.status = status;
        }
        if let Some(patch) = req.en {
            content.en = merge_info(content.en.take(), patch)?;
        }
        if let Some(patch) = req.kh {
            content.kh = merge_info(content.kh.take(), patch)?;
        }
        content.updated_at = Utc::now();

        self.contents().replace(&content)?;
        Ok(content)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut content = self.find_active(id)?;
        let now = Utc::now();
        content.deleted_at = Some(now);
        content.updated_at = now;
        self.contents().replace(&content)?;
        Ok(())
    }
}

/// Applies a locale patch. A locale that does not exist yet needs both a
/// title and a document.
fn merge_info(current: Option<ContentInfo>, patch: ContentInfoPatch) -> Result<Option<ContentInfo>, AppError> {
    let merged = match current {
        Some(mut info) => {
            if let Some(title) = patch.title.filter(|t| !t.is_empty()) {
                info.title = title;
            }
            if let Some(document) = patch.document {
                info.document = document;
            }
            if let Some(description) = patch.description {
                info.description = Some(description);
            }
            info
        }
        None => match (patch.title, patch.document) {
            (Some(title), Some(document)) => ContentInfo {
                title,
                document,
                description: patch.description,
            },
            _ => {
                return Err(AppError::BadRequest(
                    "A new locale needs a title and a document".to_string(),
                ))
            }
        },
    };
    Ok(Some(merged))
}

fn resource_files(files: Vec<ResourceFileRequest>, previous: &[ResourceFile]) -> Result<Vec<ResourceFile>, AppError> {
    files
        .into_iter()
        .map(|file| {
            if file.file_name.trim().is_empty() || file.url.trim().is_empty() {
                return Err(AppError::BadRequest("Every file needs a name and a url".to_string()));
            }
            let kept = previous.iter().find(|p| p.url == file.url);
            Ok(ResourceFile {
                id: kept.map_or_else(|| new_id().to_string(), |p| p.id.clone()),
                file_name: file.file_name,
                url: file.url,
                size: file.size,
                download_count: kept.map_or(0, |p| p.download_count),
            })
        })
        .collect()
}

fn require_text(value: &str, field: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{} is required", field)));
    }
    Ok(())
}

#[derive(Clone)]
pub struct ResourceService {
    store: DocumentStore,
}

impl ResourceService {
    pub fn new(store: &DocumentStore) -> Self {
        Self { store: store.clone() }
    }

    fn resources(&self) -> Collection {
        self.store.collection(RESOURCES)
    }

    pub async fn list(&self, query: &ResourceQuery) -> Result<PageResult<ResourceView>, AppError> {
        let source: DocumentSource<ResourceView> = DocumentSource::new(&self.store, RESOURCES)
            .relation(Relation::new("source", MINISTRIES).select(Projection::Exclude(vec!["deleted_at".to_string()])));
        Ok(paginate(&source, &query.page_request()).await?)
    }

    fn find(&self, id: &str) -> Result<Resource, AppError> {
        self.resources()
            .get::<Resource>(id)?
            .ok_or_else(|| AppError::NotFound("Resource not found".to_string()))
    }

    fn view(&self, resource: Resource) -> Result<ResourceView, AppError> {
        let source = self.store.collection(MINISTRIES).get::<Ministry>(&resource.source)?;
        Ok(ResourceView::new(resource, source))
    }

    pub async fn get(&self, id: &str) -> Result<ResourceView, AppError> {
        let resource = self.find(id)?;
        self.view(resource)
    }

    fn require_source(&self, id: &str) -> Result<(), AppError> {
        match active_ministry(&self.store, id)? {
            Some(_) => Ok(()),
            None => Err(AppError::NotFound("Source ministry not found".to_string())),
        }
    }

    pub async fn create(&self, req: CreateResourceRequest) -> Result<ResourceView, AppError> {
        require_text(&req.title, "Title")?;
        require_text(&req.lang, "Language")?;
        require_text(&req.kind, "Type")?;
        self.require_source(&req.source)?;

        let now = Utc::now();
        let resource = Resource {
            id: new_id().to_string(),
            title: req.title,
            lang: req.lang,
            cover: req.cover,
            file: resource_files(req.file, &[])?,
            kind: req.kind,
            sub_type: req.sub_type.filter(|s| !s.is_empty()),
            published_at: req.published_at,
            source: req.source,
            download_count: 0,
            created_at: now,
            updated_at: now,
        };
        self.resources().insert(&resource)?;
        self.view(resource)
    }

    pub async fn update(&self, id: &str, req: UpdateResourceRequest) -> Result<ResourceView, AppError> {
        let mut resource = self.find(id)?;

        if let Some(source) = req.source {
            self.require_source(&source)?;
            resource.source = source;
        }
        if let Some(title) = req.title {
            require_text(&title, "Title")?;
            resource.title = title;
        }
        if let Some(lang) = req.lang {
            require_text(&lang, "Language")?;
            resource.lang = lang;
        }
        if let Some(kind) = req.kind {
            require_text(&kind, "Type")?;
            resource.kind = kind;
        }
        if let Some(sub_type) = req.sub_type {
            resource.sub_type = Some(sub_type).filter(|s| !s.is_empty());
        }
        if let Some(cover) = req.cover {
            resource.cover = cover;
        }
        if let Some(published_at) = req.published_at {
            resource.published_at = published_at;
        }
        if let Some(files) = req.file {
            resource.file = resource_files(files, &resource.file)?;
        }
        resource.updated_at = Utc::now();

        self.resources().replace(&resource)?;
        self.view(resource)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.resources().delete(id) {
            return Err(AppError::NotFound("Resource not found".to_string()));
        }
        Ok(())
    }

    /// Counts one download of `file_id`, on the file and on the resource.
    pub async fn record_download(&self, id: &str, file_id: &str) -> Result<Resource, AppError> {
        let mut counted = false;
        let updated = self.resources().update_with(id, |resource: &mut Resource| {
            if let Some(file) = resource.file.iter_mut().find(|f| f.id == file_id) {
                file.download_count += 1;
                resource.download_count += 1;
                counted = true;
            }
        })?;
        match updated {
            Some(resource) if counted => Ok(resource),
            _ => Err(AppError::NotFound("Resource not found".to_string())),
        }
    }
}

#[derive(Clone)]
pub struct PartnerService {
    store: DocumentStore,
}

impl PartnerService {
    pub fn new(store: &DocumentStore) -> Self {
        Self { store: store.clone() }
    }

    fn partners(&self) -> Collection {
        self.store.collection(PARTNERS)
    }

    pub async fn list(&self, query: &PartnerQuery) -> Result<PageResult<Partner>, AppError> {
        let source: DocumentSource<Partner> = DocumentSource::new(&self.store, PARTNERS);
        Ok(paginate(&source, &query.page_request()).await?)
    }

    pub async fn get(&self, id: &str) -> Result<Partner, AppError> {
        self.partners()
            .get::<Partner>(id)?
            .filter(|p| p.deleted_at.is_none())
            .ok_or_else(|| AppError::NotFound("Partner not found".to_string()))
    }

    fn ensure_unique(
        &self,
        en: Option<&PartnerInfo>,
        kh: Option<&PartnerInfo>,
        except: Option<&str>,
    ) -> Result<(), AppError> {
        ensure_unique_names(
            &self.partners(),
            "name",
            en.map(|i| i.name.as_str()),
            kh.map(|i| i.name.as_str()),
            except,
            "Partner already exists",
        )
    }

    pub async fn create(&self, req: PartnerRequest) -> Result<Partner, AppError> {
        if req.en.is_none() && req.kh.is_none() {
            return Err(AppError::BadRequest("Partner needs at least one locale".to_string()));
        }
        require_text(&req.url, "Url")?;
        require_text(&req.logo, "Logo")?;
        self.ensure_unique(req.en.as_ref(), req.kh.as_ref(), None)?;

        let now = Utc::now();
        let partner = Partner {
            id: new_id().to_string(),
            en: req.en,
            kh: req.kh,
            url: req.url,
            logo: req.logo,
            deleted_at: None,
            created_at: now,
            updated_at: now,
        };
        self.partners().insert(&partner)?;
        Ok(partner)
    }

    pub async fn update(&self, id: &str, req: UpdatePartnerRequest) -> Result<Partner, AppError> {
        let mut partner = self.get(id).await?;
        if let Some(patch) = req.en {
            partner.en = Some(merge_partner_info(partner.en.take(), patch)?);
        }
        if let Some(patch) = req.kh {
            partner.kh = Some(merge_partner_info(partner.kh.take(), patch)?);
        }
        if let Some(url) = req.url.filter(|u| !u.is_empty()) {
            partner.url = url;
        }
        if let Some(logo) = req.logo.filter(|l| !l.is_empty()) {
            partner.logo = logo;
        }
        self.ensure_unique(partner.en.as_ref(), partner.kh.as_ref(), Some(id))?;
        partner.updated_at = Utc::now();
        self.partners().replace(&partner)?;
        Ok(partner)
    }

    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut partner = self.get(id).await?;
        let now = Utc::now();
        partner.deleted_at = Some(now);
        partner.updated_at = now;
        self.partners().replace(&partner)?;
        Ok(())
    }

    /// Removes the partner for good, soft-deleted or not.
    pub async fn delete_permanently(&self, id: &str) -> Result<(), AppError> {
        if !self.partners().delete(id) {
            return Err(AppError::NotFound("Partner not found".to_string()));
        }
        Ok(())
    }
}

/// A locale that does not exist yet needs every field.
fn merge_partner_info(current: Option<PartnerInfo>, patch: PartnerInfoPatch) -> Result<PartnerInfo, AppError> {
    match current {
        Some(mut info) => {
            if let Some(name) = patch.name {
                info.name = name;
            }
            if let Some(description) = patch.description {
                info.description = description;
            }
            if let Some(lang) = patch.lang {
                info.lang = lang;
            }
            Ok(info)
        }
        None => match (patch.name, patch.description, patch.lang) {
            (Some(name), Some(description), Some(lang)) => Ok(PartnerInfo {
                name,
                description,
                lang,
            }),
            _ => Err(AppError::BadRequest(
                "A new locale needs a name, a description and a language".to_string(),
            )),
        },
    }
}
