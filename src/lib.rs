use actix_cors::Cors;
use actix_web::middleware::Compress;
use actix_web::{http::header, web, App, HttpServer};
use actix_web_prometheus::PrometheusMetricsBuilder;
use serde::{Deserialize, Serialize};
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub mod asset;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod member;
pub mod pagination;
pub mod storage;

pub use crate::db::AppState;

use crate::config::{AppConfig, StorageDriver};

#[derive(Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub timestamp: String,
}

impl ErrorResponse {
    pub fn new(error_type: &str, message: &str) -> Self {
        Self {
            error: error_type.to_string(),
            message: message.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        member::routes::list_members,
        member::routes::get_generations,
        member::routes::get_grouped_members,
        member::routes::get_member_tree,
        member::routes::get_member,
        member::routes::create_member,
        member::routes::update_member,
        member::routes::delete_member,
        member::routes::list_positions,
        member::routes::get_position,
        member::routes::create_position,
        member::routes::update_position,
        member::routes::delete_position,
        catalog::routes::list_tags,
        catalog::routes::get_tag,
        catalog::routes::create_tag,
        catalog::routes::update_tag,
        catalog::routes::delete_tag,
        catalog::routes::list_ministries,
        catalog::routes::get_ministry,
        catalog::routes::create_ministry,
        catalog::routes::update_ministry,
        catalog::routes::delete_ministry,
        catalog::routes::list_contents,
        catalog::routes::get_content,
        catalog::routes::create_content,
        catalog::routes::update_content,
        catalog::routes::delete_content,
        catalog::routes::list_resources,
        catalog::routes::get_resource,
        catalog::routes::create_resource,
        catalog::routes::update_resource,
        catalog::routes::delete_resource,
        catalog::routes::record_download,
        catalog::routes::list_partners,
        catalog::routes::get_partner,
        catalog::routes::create_partner,
        catalog::routes::update_partner,
        catalog::routes::delete_partner,
        catalog::routes::delete_partner_permanently,
        auth::handlers::get_auth_status,
        auth::handlers::login,
        auth::handlers::refresh_token,
        auth::handlers::logout,
        auth::handlers::list_admins,
        auth::handlers::create_admin,
        auth::handlers::toggle_admin_active,
        auth::handlers::delete_admin,
        auth::handlers::list_roles,
        auth::handlers::create_role,
        asset::handlers::upload_file,
        asset::handlers::delete_file
    ),
    components(
        schemas(
            ErrorResponse,
            pagination::PageMeta,
            member::model::Member,
            member::model::MemberInfo,
            member::model::Position,
            member::model::CreateMemberRequest,
            member::model::UpdateMemberRequest,
            member::model::CreatePositionRequest,
            member::model::UpdatePositionRequest,
            member::model::GenerationSummary,
            member::model::GroupedMembers,
            member::model::MemberTreeNode,
            catalog::model::Tag,
            catalog::model::TagRequest,
            catalog::model::UpdateTagRequest,
            catalog::model::Ministry,
            catalog::model::MinistryRequest,
            catalog::model::UpdateMinistryRequest,
            catalog::model::Content,
            catalog::model::ContentSummary,
            catalog::model::CreateContentRequest,
            catalog::model::UpdateContentRequest,
            catalog::model::Resource,
            catalog::model::ResourceFile,
            catalog::model::ResourceView,
            catalog::model::CreateResourceRequest,
            catalog::model::UpdateResourceRequest,
            catalog::model::Partner,
            catalog::model::PartnerInfo,
            catalog::model::PartnerRequest,
            catalog::model::UpdatePartnerRequest,
            auth::model::AdminInfo,
            auth::model::Role,
            auth::model::CreateRoleRequest,
            auth::model::CreateAdminRequest,
            auth::model::LoginRequest,
            auth::model::RefreshRequest,
            auth::model::TokenResponse,
            auth::model::AuthStatusResponse,
            asset::model::UploadedFile,
        )
    ),
    tags(
        (name = "Members", description = "Organization members, positions and their aggregated views."),
        (name = "Tags", description = "Content tags."),
        (name = "Ministries", description = "Ministries that publish content."),
        (name = "Contents", description = "Blog contents."),
        (name = "Resources", description = "Downloadable publications issued by ministries."),
        (name = "Partners", description = "Collaboration partners."),
        (name = "Authentication", description = "Admin accounts, roles and sessions."),
        (name = "Files", description = "File uploads.")
    ),
    modifiers(&BearerAuth)
)]
pub struct ApiDoc;

/// Routes under `/api`, shared by the server and the HTTP tests.
pub fn api_config(cfg: &mut web::ServiceConfig) {
    cfg.configure(member::routes::config)
        .configure(catalog::routes::config)
        .configure(auth::config)
        .configure(asset::config);
}

pub async fn run() -> std::io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };

    let app_state = match AppState::new(&config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            log::error!("Failed to start: {:#}. Check DATABASE_URL and the storage settings.", e);
            std::process::exit(1);
        }
    };

    let prometheus = match PrometheusMetricsBuilder::new("gov_portal_server")
        .endpoint("/metrics")
        .build()
    {
        Ok(prometheus) => prometheus,
        Err(e) => {
            log::error!("Failed to create Prometheus metrics middleware: {}", e);
            std::process::exit(1);
        }
    };

    let upload_dir = match &config.storage.driver {
        StorageDriver::Local { dir } => Some(dir.clone()),
        StorageDriver::Remote { .. } => None,
    };
    let cors_origins = config.cors_origins.clone();

    log::info!("Starting server at http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
            .supports_credentials()
            .max_age(3600);

        let mut app = App::new()
            .wrap(Compress::default())
            .wrap(prometheus.clone())
            .wrap(cors)
            .app_data(app_state.clone())
            .service(web::scope("/api").configure(api_config))
            .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()));
        if let Some(dir) = &upload_dir {
            app = app.service(actix_files::Files::new("/uploads", dir));
        }
        app
    })
    .keep_alive(actix_web::http::KeepAlive::Os)
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
