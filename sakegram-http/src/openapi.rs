use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Sakegram API",
        version = "0.1.0",
        description = "Schedule Instagram image posts and prepare product photos with AI backdrops.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:3001", description = "Local development")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::session::login,
        crate::handlers::session::auth_status,
        crate::handlers::config::get_config,
        crate::handlers::config::update_config,
        crate::handlers::posts::schedule_post,
        crate::handlers::posts::list_posts,
        crate::handlers::posts::retry_post,
        crate::handlers::posts::delete_post,
        crate::handlers::studio::analyze_sake,
        crate::handlers::studio::generate_background,
        crate::handlers::studio::clean_background,
        crate::handlers::studio::label_export,
    ),
    components(
        schemas(
            sakegram::Post,
            sakegram::PostStatus,
            sakegram::SettingsView,
            sakegram::SettingsUpdate,
            crate::dto::HealthResponse,
            crate::dto::LoginRequest,
            crate::dto::LoginResponse,
            crate::dto::AuthStatusResponse,
            crate::dto::MessageResponse,
            crate::dto::ScheduleResponse,
            crate::dto::RetryResponse,
            crate::dto::SuccessResponse,
            crate::dto::GeneratedImageResponse,
            crate::dto::BrandAnalysisResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check"),
        (name = "session", description = "Password login"),
        (name = "config", description = "Integration settings"),
        (name = "posts", description = "Scheduling and publishing"),
        (name = "studio", description = "Image preparation"),
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "auth_token",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new(crate::auth::AUTH_HEADER),
                    ),
                ),
            );
        }
    }
}
