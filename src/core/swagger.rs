use anyhow::Result;
use axum::Router;
use utoipa::openapi::OpenApi;
use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa_swagger_ui::SwaggerUi;

use crate::core::{app_state::AppState, auth};

/// Mounts the swagger UI for a finished OpenAPI document, registering the
/// session-cookie security scheme referenced by annotated routes.
pub fn create_swagger_ui(mut openapi: OpenApi) -> Result<Router<AppState>> {
    openapi
        .components
        .get_or_insert_with(Default::default)
        .add_security_scheme(
            "cookieAuth",
            SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(auth::SESSION_COOKIE))),
        );

    Ok(SwaggerUi::new("/swagger-ui")
        .url("/api-docs/openapi.json", openapi)
        .into())
}
