use anyhow::Result;
use axum::Router;
use carelink_portalservice::core::{app_state::AppState, bootstrap, config, db, swagger};
use carelink_portalservice::routes;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let db_pool = db::connect(&config.database.url).await?;
    let state = AppState::new(db_pool, config);

    let api = routes::auth::routes_with_openapi(state.clone())
        .merge(routes::patients::appointments::routes_with_openapi(
            state.clone(),
        ))
        .merge(routes::doctors::prescriptions::routes_with_openapi(
            state.clone(),
        ))
        .merge(routes::pharmacists::inventory::routes_with_openapi(
            state.clone(),
        ))
        .merge(routes::admins::blogs::routes_with_openapi(state.clone()));

    let mut openapi = api.get_openapi().clone();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("CareLink PortalService API")
        .version("1.0.0")
        .build();
    let swagger_ui = swagger::create_swagger_ui(openapi)?;

    let app = Router::new()
        .merge(api)
        .merge(routes::patients::profile::routes(state.clone()))
        .merge(routes::patients::records::routes(state.clone()))
        .merge(routes::patients::documents::routes(state.clone()))
        .merge(routes::doctors::dashboard::routes(state.clone()))
        .merge(routes::doctors::appointments::routes(state.clone()))
        .merge(routes::doctors::patients::routes(state.clone()))
        .merge(routes::doctors::lab_tests::routes(state.clone()))
        .merge(routes::nurses::routes(state.clone()))
        .merge(routes::pharmacists::prescriptions::routes(state.clone()))
        .merge(routes::pharmacists::medications::routes(state.clone()))
        .merge(routes::lab::routes(state.clone()))
        .merge(routes::admins::users::routes(state.clone()))
        .merge(routes::admins::doctors::routes(state.clone()))
        .merge(routes::notifications::routes(state.clone()))
        .merge(routes::blogs::routes())
        .merge(swagger_ui);

    tracing::info!("Bootstrapping...");
    bootstrap::serve("PortalService", app, state).await?;
    Ok(())
}
