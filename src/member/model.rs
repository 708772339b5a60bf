use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub house_number: String,
    pub street: String,
    pub district: String,
    pub city: String,
    pub country: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct CareerDetail {
    pub value: String,
    pub detail: String,
}

/// One locale of a member profile.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfo {
    pub image_url: String,
    pub birth_date: String,
    pub email: String,
    pub nationality: String,
    pub name: String,
    pub place_of_birth: Address,
    #[serde(default)]
    pub career_status: Vec<CareerDetail>,
    #[serde(default)]
    pub experience: Vec<CareerDetail>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: String,
    pub en: MemberInfo,
    pub kh: MemberInfo,
    /// Position id.
    pub position: String,
    /// Parent member id; `None` for top-level members.
    #[serde(default)]
    pub parent: Option<String>,
    pub generation: i32,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Member {
    pub fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct PositionInfo {
    pub title: String,
    pub level: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: String,
    pub en: PositionInfo,
    pub kh: PositionInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateMemberRequest {
    pub en: MemberInfo,
    pub kh: MemberInfo,
    pub parent: Option<String>,
    pub position: String,
    pub generation: i32,
}

/// Partial update of one locale; absent fields keep their stored value.
#[derive(Deserialize, Debug, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MemberInfoPatch {
    pub image_url: Option<String>,
    pub birth_date: Option<String>,
    pub email: Option<String>,
    pub nationality: Option<String>,
    pub name: Option<String>,
    pub place_of_birth: Option<Address>,
    pub career_status: Option<Vec<CareerDetail>>,
    pub experience: Option<Vec<CareerDetail>>,
}

impl MemberInfoPatch {
    pub fn apply(self, info: &mut MemberInfo) {
        if let Some(v) = self.image_url {
            info.image_url = v;
        }
        if let Some(v) = self.birth_date {
            info.birth_date = v;
        }
        if let Some(v) = self.email {
            info.email = v;
        }
        if let Some(v) = self.nationality {
            info.nationality = v;
        }
        if let Some(v) = self.name {
            info.name = v;
        }
        if let Some(v) = self.place_of_birth {
            info.place_of_birth = v;
        }
        if let Some(v) = self.career_status {
            info.career_status = v;
        }
        if let Some(v) = self.experience {
            info.experience = v;
        }
    }
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdateMemberRequest {
    pub en: Option<MemberInfoPatch>,
    pub kh: Option<MemberInfoPatch>,
    /// Absent keeps the parent, `null` detaches the member.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub parent: Option<Option<String>>,
    pub position: Option<String>,
    pub generation: Option<i32>,
}

/// Tells a field sent as `null` apart from a missing one.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Deserialize, Debug, Default, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct MemberListQuery {
    pub page: Option<u64>,
    pub limit: Option<u64>,
    pub generation: Option<i32>,
    /// Case-insensitive match on either locale's name.
    pub search: Option<String>,
}

#[derive(Deserialize, Debug, ToSchema)]
pub struct CreatePositionRequest {
    pub en: PositionInfo,
    pub kh: PositionInfo,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct PositionInfoPatch {
    pub title: Option<String>,
    pub level: Option<i32>,
}

#[derive(Deserialize, Debug, Default, ToSchema)]
pub struct UpdatePositionRequest {
    pub en: Option<PositionInfoPatch>,
    pub kh: Option<PositionInfoPatch>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
pub struct GenerationSummary {
    pub generations: Vec<i32>,
    #[serde(rename = "currentGeneration")]
    pub current_generation: Option<i32>,
}

/// Listing projection of a member used by the grouped view.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct MemberBrief {
    #[serde(rename = "_id")]
    pub id: String,
    pub name_en: String,
    pub name_kh: String,
    #[serde(rename = "imageUrl_en")]
    pub image_url_en: String,
    #[serde(rename = "imageUrl_kh")]
    pub image_url_kh: String,
}

impl From<&Member> for MemberBrief {
    fn from(member: &Member) -> Self {
        Self {
            id: member.id.clone(),
            name_en: member.en.name.clone(),
            name_kh: member.kh.name.clone(),
            image_url_en: member.en.image_url.clone(),
            image_url_kh: member.kh.image_url.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct MemberGroup {
    pub position: Position,
    pub members: Vec<MemberBrief>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ToSchema)]
pub struct GroupedMembers {
    pub list: Vec<MemberGroup>,
    pub generations: Vec<i32>,
    #[serde(rename = "currentGeneration")]
    pub current_generation: Option<i32>,
}

/// A member reached from a tree root, with its distance from that root.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct Descendant {
    #[serde(flatten)]
    pub member: Member,
    pub level: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ToSchema)]
pub struct MemberTreeNode {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    /// English title of the member's position, when it resolves.
    pub position: Option<String>,
    pub generation: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub descendants: Vec<Descendant>,
}
