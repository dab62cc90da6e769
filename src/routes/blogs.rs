use anyhow::Context;
use axum::{
    Router,
    extract::{Path, State},
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
    },
    models::BlogEntity,
    schema::blogs,
};

/// Public, unauthenticated blog surface: published posts only.
pub fn routes() -> Router<AppState> {
    Router::new().nest(
        "/api/blogs",
        Router::new()
            .route("/", routing::get(get_published_blogs))
            .route("/{slug}", routing::get(get_published_blog)),
    )
}

async fn get_published_blogs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let blogs: Vec<BlogEntity> = blogs::table
        .filter(blogs::status.eq("published"))
        .order_by(blogs::published_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get published blogs")?;

    Ok(StdResponse {
        data: Some(blogs),
        message: Some("Get blogs successfully"),
    })
}

async fn get_published_blog(
    Path(slug): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let blog: BlogEntity = blogs::table
        .filter(blogs::slug.eq(&slug))
        .filter(blogs::status.eq("published"))
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    Ok(StdResponse {
        data: Some(blog),
        message: Some("Get blog successfully"),
    })
}
