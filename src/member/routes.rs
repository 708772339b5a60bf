use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;
use utoipa::IntoParams;

use super::model::{
    CreateMemberRequest, CreatePositionRequest, GenerationSummary, GroupedMembers, Member, MemberListQuery,
    MemberTreeNode, Position, UpdateMemberRequest, UpdatePositionRequest,
};
use super::repository::DocumentMemberRepository;
use super::service::MemberService;
use crate::auth::validate_request_token;
use crate::error::AppError;
use crate::AppState;

fn service(state: &AppState) -> MemberService<DocumentMemberRepository> {
    MemberService::new(DocumentMemberRepository::new(&state.documents))
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct GroupedQuery {
    /// Defaults to the latest generation.
    pub generation: Option<i32>,
}

#[derive(Deserialize, Debug, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TreeQuery {
    /// Build the tree below this member instead of from the top-level members.
    pub root: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/members",
    tag = "Members",
    params(MemberListQuery),
    responses(
        (status = 200, description = "Paginated active members, newest first")
    )
)]
pub async fn list_members(
    state: web::Data<AppState>,
    query: web::Query<MemberListQuery>,
) -> Result<HttpResponse, AppError> {
    let page = service(&state).list_members(&query).await?;
    Ok(HttpResponse::Ok().json(page))
}

#[utoipa::path(
    get,
    path = "/api/members/generations",
    tag = "Members",
    responses(
        (status = 200, description = "Distinct generations and the current one", body = GenerationSummary)
    )
)]
pub async fn get_generations(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let summary = service(&state).generations().await?;
    Ok(HttpResponse::Ok().json(summary))
}

#[utoipa::path(
    get,
    path = "/api/members/grouped",
    tag = "Members",
    params(GroupedQuery),
    responses(
        (status = 200, description = "Members of one generation grouped by position", body = GroupedMembers)
    )
)]
pub async fn get_grouped_members(
    state: web::Data<AppState>,
    query: web::Query<GroupedQuery>,
) -> Result<HttpResponse, AppError> {
    let generation = query.generation;
    if let Some(cached) = state.member_cache.grouped(generation).await {
        log::debug!("Grouped members cache hit for generation {:?}", generation);
        return Ok(HttpResponse::Ok().json(cached));
    }

    let epoch = state.member_cache.epoch();
    let grouped = service(&state).grouped_members(generation).await?;
    state.member_cache.store_grouped(epoch, generation, grouped.clone()).await;
    Ok(HttpResponse::Ok().json(grouped))
}

#[utoipa::path(
    get,
    path = "/api/members/tree",
    tag = "Members",
    params(TreeQuery),
    responses(
        (status = 200, description = "Member forest with bounded descendants", body = Vec<MemberTreeNode>)
    )
)]
pub async fn get_member_tree(
    state: web::Data<AppState>,
    query: web::Query<TreeQuery>,
) -> Result<HttpResponse, AppError> {
    let root = query.into_inner().root.filter(|r| !r.is_empty());
    if let Some(cached) = state.member_cache.tree(root.clone()).await {
        return Ok(HttpResponse::Ok().json(cached));
    }

    let epoch = state.member_cache.epoch();
    let tree = service(&state).member_tree(root.as_deref()).await?;
    state.member_cache.store_tree(epoch, root, tree.clone()).await;
    Ok(HttpResponse::Ok().json(tree))
}

#[utoipa::path(
    get,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = String, Path, description = "Member ID")),
    responses(
        (status = 200, description = "Member", body = Member),
        (status = 404, description = "Member not found")
    )
)]
pub async fn get_member(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    let member = service(&state).get_member(&path).await?;
    Ok(HttpResponse::Ok().json(member))
}

#[utoipa::path(
    post,
    path = "/api/members",
    tag = "Members",
    request_body = CreateMemberRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Member created", body = Member),
        (status = 404, description = "Position or parent not found")
    )
)]
pub async fn create_member(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreateMemberRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let member = service(&state).create_member(body.into_inner()).await?;
    state.member_cache.invalidate();
    log::info!("Member {} created", member.id);
    Ok(HttpResponse::Created().json(member))
}

#[utoipa::path(
    put,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = String, Path, description = "Member ID")),
    request_body = UpdateMemberRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Member updated", body = Member),
        (status = 400, description = "Parent would create a cycle"),
        (status = 404, description = "Member, position or parent not found")
    )
)]
pub async fn update_member(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdateMemberRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let member = service(&state).update_member(&path, body.into_inner()).await?;
    state.member_cache.invalidate();
    Ok(HttpResponse::Ok().json(member))
}

#[utoipa::path(
    delete,
    path = "/api/members/{id}",
    tag = "Members",
    params(("id" = String, Path, description = "Member ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Member soft-deleted"),
        (status = 404, description = "Member not found")
    )
)]
pub async fn delete_member(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    service(&state).delete_member(&path).await?;
    state.member_cache.invalidate();
    log::info!("Member {} deleted", path);
    Ok(HttpResponse::Ok().finish())
}

#[utoipa::path(
    get,
    path = "/api/positions",
    tag = "Members",
    responses(
        (status = 200, description = "Positions ordered by level", body = Vec<Position>)
    )
)]
pub async fn list_positions(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(service(&state).list_positions().await?))
}

#[utoipa::path(
    get,
    path = "/api/positions/{id}",
    tag = "Members",
    params(("id" = String, Path, description = "Position ID")),
    responses(
        (status = 200, description = "Position", body = Position),
        (status = 404, description = "Position not found")
    )
)]
pub async fn get_position(state: web::Data<AppState>, path: web::Path<String>) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(service(&state).get_position(&path).await?))
}

#[utoipa::path(
    post,
    path = "/api/positions",
    tag = "Members",
    request_body = CreatePositionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 201, description = "Position created", body = Position),
        (status = 422, description = "Duplicate position or mismatched levels")
    )
)]
pub async fn create_position(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<CreatePositionRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let position = service(&state).create_position(body.into_inner()).await?;
    state.member_cache.invalidate();
    Ok(HttpResponse::Created().json(position))
}

#[utoipa::path(
    put,
    path = "/api/positions/{id}",
    tag = "Members",
    params(("id" = String, Path, description = "Position ID")),
    request_body = UpdatePositionRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Position updated", body = Position),
        (status = 404, description = "Position not found"),
        (status = 422, description = "Duplicate position or mismatched levels")
    )
)]
pub async fn update_position(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
    body: web::Json<UpdatePositionRequest>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    let position = service(&state).update_position(&path, body.into_inner()).await?;
    state.member_cache.invalidate();
    Ok(HttpResponse::Ok().json(position))
}

#[utoipa::path(
    delete,
    path = "/api/positions/{id}",
    tag = "Members",
    params(("id" = String, Path, description = "Position ID")),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Position deleted"),
        (status = 404, description = "Position not found"),
        (status = 422, description = "Position still assigned")
    )
)]
pub async fn delete_position(
    req: HttpRequest,
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    validate_request_token(&req)?;
    service(&state).delete_position(&path).await?;
    state.member_cache.invalidate();
    Ok(HttpResponse::Ok().finish())
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/members")
            .route(web::get().to(list_members))
            .route(web::post().to(create_member)),
    )
    .service(web::resource("/members/generations").route(web::get().to(get_generations)))
    .service(web::resource("/members/grouped").route(web::get().to(get_grouped_members)))
    .service(web::resource("/members/tree").route(web::get().to(get_member_tree)))
    .service(
        web::resource("/members/{id}")
            .route(web::get().to(get_member))
            .route(web::put().to(update_member))
            .route(web::delete().to(delete_member)),
    )
    .service(
        web::resource("/positions")
            .route(web::get().to(list_positions))
            .route(web::post().to(create_position)),
    )
    .service(
        web::resource("/positions/{id}")
            .route(web::get().to(get_position))
            .route(web::put().to(update_position))
            .route(web::delete().to(delete_position)),
    );
}
