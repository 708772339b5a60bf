use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct TagInfo {
    pub name: String,
    pub lang: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Tag {
    #[serde(rename = "_id")]
    pub id: String,
    pub en: TagInfo,
    pub kh: TagInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct TagRequest {
    pub en: TagInfo,
    pub kh: TagInfo,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct TagInfoPatch {
    pub name: Option<String>,
    pub lang: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateTagRequest {
    pub en: Option<TagInfoPatch>,
    pub kh: Option<TagInfoPatch>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MinistryInfo {
    pub name: String,
    pub image_url: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Ministry {
    #[serde(rename = "_id")]
    pub id: String,
    pub en: MinistryInfo,
    pub kh: MinistryInfo,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct MinistryRequest {
    pub en: MinistryInfo,
    pub kh: MinistryInfo,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MinistryInfoPatch {
    pub name: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateMinistryRequest {
    pub en: Option<MinistryInfoPatch>,
    pub kh: Option<MinistryInfoPatch>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    #[default]
    Draft,
    Published,
    Archived,
}

impl ContentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::Published => "published",
            ContentStatus::Archived => "archived",
        }
    }
}

/// One locale of a blog entry. `document` is a rich-text editor tree stored
/// as-is.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ContentInfo {
    pub title: String,
    #[schema(value_type = Object)]
    pub document: Value,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Content {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub en: Option<ContentInfo>,
    #[serde(default)]
    pub kh: Option<ContentInfo>,
    #[serde(default)]
    pub category: Option<String>,
    /// Tag ids.
    pub tags: Vec<String>,
    pub cover: String,
    /// Ministry id.
    pub source: String,
    pub status: ContentStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ContentInfoSummary {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Listing shape of a content: documents left out, tags and source expanded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ContentSummary {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub en: Option<ContentInfoSummary>,
    #[serde(default)]
    pub kh: Option<ContentInfoSummary>,
    #[serde(default)]
    pub category: Option<String>,
    pub tags: Vec<Tag>,
    pub cover: String,
    pub source: Option<Ministry>,
    pub status: ContentStatus,
    #[serde(default)]
    pub created_by: Option<String>,
    #[serde(default)]
    pub view_count: u64,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateContentRequest {
    pub en: Option<ContentInfo>,
    pub kh: Option<ContentInfo>,
    pub tags: Vec<String>,
    pub source: String,
    #[serde(default)]
    pub cover: String,
    pub category: Option<String>,
    #[serde(default)]
    pub status: ContentStatus,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct ContentInfoPatch {
    pub title: Option<String>,
    #[schema(value_type = Option<Object>)]
    pub document: Option<Value>,
    pub description: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateContentRequest {
    pub en: Option<ContentInfoPatch>,
    pub kh: Option<ContentInfoPatch>,
    pub tags: Option<Vec<String>>,
    pub source: Option<String>,
    pub cover: Option<String>,
    pub category: Option<String>,
    pub status: Option<ContentStatus>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ResourceFile {
    #[serde(rename = "_id")]
    pub id: String,
    pub file_name: String,
    pub url: String,
    /// Bytes.
    pub size: u64,
    #[serde(default)]
    pub download_count: u64,
}

/// A downloadable publication (law, report, form) issued by a ministry.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Resource {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub lang: String,
    pub cover: String,
    pub file: Vec<ResourceFile>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    /// Ministry id.
    pub source: String,
    /// Sum over all files.
    #[serde(default)]
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A resource with its source ministry expanded.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct ResourceView {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub lang: String,
    pub cover: String,
    pub file: Vec<ResourceFile>,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub sub_type: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub source: Option<Ministry>,
    #[serde(default)]
    pub download_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ResourceView {
    pub fn new(resource: Resource, source: Option<Ministry>) -> Self {
        Self {
            id: resource.id,
            title: resource.title,
            lang: resource.lang,
            cover: resource.cover,
            file: resource.file,
            kind: resource.kind,
            sub_type: resource.sub_type,
            published_at: resource.published_at,
            source,
            download_count: resource.download_count,
            created_at: resource.created_at,
            updated_at: resource.updated_at,
        }
    }
}

#[derive(Deserialize, Debug, Clone, ToSchema)]
pub struct ResourceFileRequest {
    pub file_name: String,
    pub url: String,
    pub size: u64,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateResourceRequest {
    pub title: String,
    pub lang: String,
    #[serde(default)]
    pub cover: String,
    pub file: Vec<ResourceFileRequest>,
    #[serde(rename = "type")]
    pub kind: String,
    pub sub_type: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: DateTime<Utc>,
    pub source: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateResourceRequest {
    pub title: Option<String>,
    pub lang: Option<String>,
    pub cover: Option<String>,
    /// Replaces the file list. Files keep their counters when the url is unchanged.
    pub file: Option<Vec<ResourceFileRequest>>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sub_type: Option<String>,
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PartnerInfo {
    pub name: String,
    pub description: String,
    pub lang: String,
}

/// A collaboration partner shown on the portal.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Partner {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub en: Option<PartnerInfo>,
    #[serde(default)]
    pub kh: Option<PartnerInfo>,
    pub url: String,
    pub logo: String,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct PartnerRequest {
    pub en: Option<PartnerInfo>,
    pub kh: Option<PartnerInfo>,
    pub url: String,
    pub logo: String,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct PartnerInfoPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub lang: Option<String>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdatePartnerRequest {
    pub en: Option<PartnerInfoPatch>,
    pub kh: Option<PartnerInfoPatch>,
    pub url: Option<String>,
    pub logo: Option<String>,
}
