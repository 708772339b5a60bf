use actix_web::{web, HttpRequest, HttpResponse};

use super::model::{
    Content, CreateContentRequest, CreateResourceRequest, Ministry, MinistryRequest, Partner, PartnerRequest,
    Resource, ResourceView, Tag, TagRequest, UpdateContentRequest, UpdateMinistryRequest, UpdatePartnerRequest,
    UpdateResourceRequest, UpdateTagRequest,
};
use super::query::{ContentQuery, MinistryQuery, PartnerQuery, ResourceQuery, TagQuery};
use super::service::{ContentService, MinistryService, PartnerService, ResourceService, TagService};
use crate::auth::validate_request_token;
use crate::error::AppError;
use crate::AppState;

#[utoipa::path(
    get,
    path = "/api/tags",
    tag = "Tags",
    params(TagQuery),
    responses(
        (status = 200, description = "Paginated tags"),
        (status = 400, description = "Invalid sort")
    )
)]
pub async fn list_tags(state: web::Data<AppState>, query: web::Query<TagQuery>) -> Result<HttpResponse, AppError> {
    let page = TagService::new(&state.documents).list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/tags/{id}",
    tag = "Tags",
    params(("id" = String, Path, description = "Tag ID")),
    responses(
        (status = 200, description = "Tag", body = Tag),
        (status = 404, description = "Tag not found")
    )
)]
pub async fn get_tag(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(TagService::new(&state.documents).get(&path).await?))
}

#[utoipa::path(
    post,
    path = "/api/tags",
    tag = "Tags",
    request_body = TagRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Tag created", body = Tag),
        (status = 422, description = "Tag already exists")
    )
)]
pub async fn create_tag(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<TagRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let tag = TagService::new(&state.documents).create(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(tag))
}

#[utoipa::path(
    put,
    path = "/api/tags/{id}",
    tag = "Tags",
    params(("id" = String, Path, description = "Tag ID")),
    request_body = UpdateTagRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tag updated", body = Tag),
        (status = 404, description = "Tag not found"),
        (status = 422, description = "Tag already exists")
    )
)]
pub async fn update_tag(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateTagRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let tag = TagService::new(&state.documents).update(&path, body.into_inner()).await?;
    Ok(HttpResponse::Ok().json(tag))
}

#[utoipa::path(
    delete,
    path = "/api/tags/{id}",
    tag = "Tags",
    params(("id" = String, Path, description = "Tag ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Tag deleted"),
        (status = 404, description = "Tag not found")
    )
)]
pub async fn delete_tag(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    TagService::new(&state.documents).delete(&path).await?;
    log::info!("Tag {} deleted", path);
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/ministries",
    tag = "Ministries",
    params(MinistryQuery),
    responses(
        (status = 200, description = "Paginated ministries"),
        (status = 400, description = "Invalid sort")
    )
)]
pub async fn list_ministries(
    state: web::Data<AppState>,
    query: web::Query<MinistryQuery>,
) -> Result<HttpResponse, AppError> {
    let page = MinistryService::new(&state.documents).list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/ministries/{id}",
    tag = "Ministries",
    params(("id" = String, Path, description = "Ministry ID")),
    responses(
        (status = 200, description = "Ministry", body = Ministry),
        (status = 404, description = "Ministry not found")
    )
)]
pub async fn get_ministry(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(MinistryService::new(&state.documents).get(&path).await?))
}

#[utoipa::path(
    post,
    path = "/api/ministries",
    tag = "Ministries",
    request_body = MinistryRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Ministry created", body = Ministry),
        (status = 422, description = "Ministry already exists")
    )
)]
pub async fn create_ministry(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<MinistryRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let ministry = MinistryService::new(&state.documents).create(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(ministry))
}

#[utoipa::path(
    put,
    path = "/api/ministries/{id}",
    tag = "Ministries",
    params(("id" = String, Path, description = "Ministry ID")),
    request_body = UpdateMinistryRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ministry updated", body = Ministry),
        (status = 404, description = "Ministry not found"),
        (status = 422, description = "Ministry already exists")
    )
)]
pub async fn update_ministry(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateMinistryRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let ministry = MinistryService::new(&state.documents)
        .update(&path, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(ministry))
}

#[utoipa::path(
    delete,
    path = "/api/ministries/{id}",
    tag = "Ministries",
    params(("id" = String, Path, description = "Ministry ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Ministry soft-deleted"),
        (status = 404, description = "Ministry not found")
    )
)]
pub async fn delete_ministry(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    MinistryService::new(&state.documents).delete(&path).await?;
    log::info!("Ministry {} deleted", path);
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/contents",
    tag = "Contents",
    params(ContentQuery),
    responses(
        (status = 200, description = "Paginated content summaries with tags and source expanded"),
        (status = 400, description = "Invalid sort")
    )
)]
pub async fn list_contents(
    state: web::Data<AppState>,
    query: web::Query<ContentQuery>,
) -> Result<HttpResponse, AppError> {
    let page = ContentService::new(&state.documents).list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/contents/{id}",
    tag = "Contents",
    params(("id" = String, Path, description = "Content ID")),
    responses(
        (status = 200, description = "Content with its documents", body = Content),
        (status = 404, description = "Content not found")
    )
)]
pub async fn get_content(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ContentService::new(&state.documents).view(&path).await?))
}

#[utoipa::path(
    post,
    path = "/api/contents",
    tag = "Contents",
    request_body = CreateContentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Content created", body = Content),
        (status = 400, description = "Missing locale or tags"),
        (status = 404, description = "Tag or ministry not found")
    )
)]
pub async fn create_content(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateContentRequest>,
) -> Result<HttpResponse, AppError> {
    let claims = validate_request_token(&req)?;
    let content = ContentService::new(&state.documents)
        .create(body.into_inner(), Some(claims.username))
        .await?;
    log::info!("Content {} created", content.id);
    Ok(HttpResponse::Created().json(content))
}

#[utoipa::path(
    put,
    path = "/api/contents/{id}",
    tag = "Contents",
    params(("id" = String, Path, description = "Content ID")),
    request_body = UpdateContentRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Content updated", body = Content),
        (status = 404, description = "Content, tag or ministry not found")
    )
)]
pub async fn update_content(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateContentRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let content = ContentService::new(&state.documents)
        .update(&path, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(content))
}

#[utoipa::path(
    delete,
    path = "/api/contents/{id}",
    tag = "Contents",
    params(("id" = String, Path, description = "Content ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Content soft-deleted"),
        (status = 404, description = "Content not found")
    )
)]
pub async fn delete_content(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    ContentService::new(&state.documents).delete(&path).await?;
    log::info!("Content {} deleted", path);
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/resources",
    tag = "Resources",
    params(ResourceQuery),
    responses(
        (status = 200, description = "Paginated resources with source expanded"),
        (status = 400, description = "Invalid sort")
    )
)]
pub async fn list_resources(
    state: web::Data<AppState>,
    query: web::Query<ResourceQuery>,
) -> Result<HttpResponse, AppError> {
    let page = ResourceService::new(&state.documents).list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource ID")),
    responses(
        (status = 200, description = "Resource", body = ResourceView),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn get_resource(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(ResourceService::new(&state.documents).get(&path).await?))
}

#[utoipa::path(
    post,
    path = "/api/resources",
    tag = "Resources",
    request_body = CreateResourceRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Resource created", body = ResourceView),
        (status = 400, description = "Missing title, language, type or file fields"),
        (status = 404, description = "Source ministry not found")
    )
)]
pub async fn create_resource(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateResourceRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let resource = ResourceService::new(&state.documents).create(body.into_inner()).await?;
    log::info!("Resource {} created", resource.id);
    Ok(HttpResponse::Created().json(resource))
}

#[utoipa::path(
    put,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource ID")),
    request_body = UpdateResourceRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Resource updated", body = ResourceView),
        (status = 404, description = "Resource or source ministry not found")
    )
)]
pub async fn update_resource(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateResourceRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let resource = ResourceService::new(&state.documents)
        .update(&path, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(resource))
}

#[utoipa::path(
    delete,
    path = "/api/resources/{id}",
    tag = "Resources",
    params(("id" = String, Path, description = "Resource ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Resource deleted"),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn delete_resource(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    ResourceService::new(&state.documents).delete(&path).await?;
    log::info!("Resource {} deleted", path);
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    post,
    path = "/api/resources/{id}/files/{file_id}/download",
    tag = "Resources",
    params(
        ("id" = String, Path, description = "Resource ID"),
        ("file_id" = String, Path, description = "File ID within the resource")
    ),
    responses(
        (status = 200, description = "Download counted", body = Resource),
        (status = 404, description = "Resource not found")
    )
)]
pub async fn record_download(
    state: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, AppError> {
    let (id, file_id) = path.into_inner();
    let resource = ResourceService::new(&state.documents)
        .record_download(&id, &file_id)
        .await?;
    Ok(HttpResponse::Ok().json(resource))
}

#[utoipa::path(
    get,
    path = "/api/partners",
    tag = "Partners",
    params(PartnerQuery),
    responses(
        (status = 200, description = "Paginated partners"),
        (status = 400, description = "Invalid sort")
    )
)]
pub async fn list_partners(
    state: web::Data<AppState>,
    query: web::Query<PartnerQuery>,
) -> Result<HttpResponse, AppError> {
    let page = PartnerService::new(&state.documents).list(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/partners/{id}",
    tag = "Partners",
    params(("id" = String, Path, description = "Partner ID")),
    responses(
        (status = 200, description = "Partner", body = Partner),
        (status = 404, description = "Partner not found")
    )
)]
pub async fn get_partner(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(PartnerService::new(&state.documents).get(&path).await?))
}

#[utoipa::path(
    post,
    path = "/api/partners",
    tag = "Partners",
    request_body = PartnerRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Partner created", body = Partner),
        (status = 400, description = "No locale, url or logo"),
        (status = 422, description = "Partner already exists")
    )
)]
pub async fn create_partner(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<PartnerRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let partner = PartnerService::new(&state.documents).create(body.into_inner()).await?;
    Ok(HttpResponse::Created().json(partner))
}

#[utoipa::path(
    put,
    path = "/api/partners/{id}",
    tag = "Partners",
    params(("id" = String, Path, description = "Partner ID")),
    request_body = UpdatePartnerRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Partner updated", body = Partner),
        (status = 404, description = "Partner not found"),
        (status = 422, description = "Partner already exists")
    )
)]
pub async fn update_partner(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdatePartnerRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let partner = PartnerService::new(&state.documents)
        .update(&path, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(partner))
}

#[utoipa::path(
    delete,
    path = "/api/partners/{id}",
    tag = "Partners",
    params(("id" = String, Path, description = "Partner ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Partner soft-deleted"),
        (status = 404, description = "Partner not found")
    )
)]
pub async fn delete_partner(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    PartnerService::new(&state.documents).delete(&path).await?;
    log::info!("Partner {} deleted", path);
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    delete,
    path = "/api/partners/{id}/permanent",
    tag = "Partners",
    params(("id" = String, Path, description = "Partner ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Partner removed"),
        (status = 404, description = "Partner not found")
    )
)]
pub async fn delete_partner_permanently(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let claims = validate_request_token(&req)?;
    PartnerService::new(&state.documents).delete_permanently(&path).await?;
    log::warn!("Partner {} permanently deleted by {}", path, claims.username);
    Ok(HttpResponse::Ok().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/tags")
            .route(web::get().to(list_tags))
            .route(web::post().to(create_tag)),
    )
    .service(
        web::resource("/tags/{id}")
            .route(web::get().to(get_tag))
            .route(web::put().to(update_tag))
            .route(web::delete().to(delete_tag)),
    )
    .service(
        web::resource("/ministries")
            .route(web::get().to(list_ministries))
            .route(web::post().to(create_ministry)),
    )
    .service(
        web::resource("/ministries/{id}")
            .route(web::get().to(get_ministry))
            .route(web::put().to(update_ministry))
            .route(web::delete().to(delete_ministry)),
    )
    .service(
        web::resource("/contents")
            .route(web::get().to(list_contents))
            .route(web::post().to(create_content)),
    )
    .service(
        web::resource("/contents/{id}")
            .route(web::get().to(get_content))
            .route(web::put().to(update_content))
            .route(web::delete().to(delete_content)),
    )
    .service(
        web::resource("/resources")
            .route(web::get().to(list_resources))
            .route(web::post().to(create_resource)),
    )
    .service(
        web::resource("/resources/{id}")
            .route(web::get().to(get_resource))
            .route(web::put().to(update_resource))
            .route(web::delete().to(delete_resource)),
    )
    .service(web::resource("/resources/{id}/files/{file_id}/download").route(web::post().to(record_download)))
    .service(
        web::resource("/partners")
            .route(web::get().to(list_partners))
            .route(web::post().to(create_partner)),
    )
    .service(
        web::resource("/partners/{id}")
            .route(web::get().to(get_partner))
            .route(web::put().to(update_partner))
            .route(web::delete().to(delete_partner)),
    )
    .service(web::resource("/partners/{id}/permanent").route(web::delete().to(delete_partner_permanently)));
}
