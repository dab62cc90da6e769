use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;

use crate::{
    core::{
        aliases::{DieselError, DieselErrorKind},
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{DoctorEntity, UpdateDoctorEntity},
    schema::doctors,
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/admins/doctors",
        Router::new()
            .route("/", routing::get(get_doctors))
            .route("/{id}", routing::patch(update_doctor))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

/// All doctors on staff.
async fn get_doctors(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctors: Vec<DoctorEntity> = doctors::table
        .order_by(doctors::department.asc())
        .get_results(conn)
        .await
        .context("Failed to get doctors")?;

    Ok(StdResponse {
        data: Some(doctors),
        message: Some("Get doctors successfully"),
    })
}

/// Partial update of a doctor's practice details.
async fn update_doctor(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateDoctorEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.consultation_fee.is_some_and(|fee| fee < 0.0) {
        return Err(AppError::BadRequest(
            "Consultation fee cannot be negative".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor: DoctorEntity = diesel::update(doctors::table.find(id))
        .set((&body, doctors::updated_at.eq(diesel::dsl::now)))
        .returning(DoctorEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            DieselError::DatabaseError(DieselErrorKind::UniqueViolation, _) => {
                AppError::Conflict("License number already registered".to_string())
            }
            _ => AppError::Other(err.into()),
        })?;

    Ok(StdResponse {
        data: Some(doctor),
        message: Some("Updated doctor successfully"),
    })
}
