use anyhow::Context;
use axum::{
    Extension, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::NotificationEntity,
    schema::notifications,
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/notifications",
        Router::new()
            .route("/", routing::get(get_notifications))
            .route("/{id}/read", routing::patch(mark_read))
            .route("/read-all", routing::patch(mark_all_read))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::users_authorization,
            )),
    )
}

/// Fetch the authenticated user's notifications, newest first.
async fn get_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let notifications: Vec<NotificationEntity> = notifications::table
        .filter(notifications::user_id.eq(user.id))
        .order_by(notifications::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get notifications")?;

    Ok(StdResponse {
        data: Some(notifications),
        message: Some("Get notifications successfully"),
    })
}

/// Mark one of the user's notifications as read.
async fn mark_read(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let notification: NotificationEntity = diesel::update(
        notifications::table
            .find(id)
            .filter(notifications::user_id.eq(user.id)),
    )
    .set(notifications::is_read.eq(true))
    .returning(NotificationEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|err| match err {
        DieselError::NotFound => AppError::NotFound,
        _ => AppError::Other(err.into()),
    })?;

    Ok(StdResponse {
        data: Some(notification),
        message: Some("Marked notification as read"),
    })
}

#[derive(Serialize)]
struct MarkAllReadRes {
    updated: usize,
}

/// Mark every unread notification for the user as read.
async fn mark_all_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated = diesel::update(
        notifications::table
            .filter(notifications::user_id.eq(user.id))
            .filter(notifications::is_read.eq(false)),
    )
    .set(notifications::is_read.eq(true))
    .execute(conn)
    .await
    .context("Failed to mark notifications as read")?;

    Ok(StdResponse {
        data: Some(MarkAllReadRes { updated }),
        message: Some("Marked all notifications as read"),
    })
}
