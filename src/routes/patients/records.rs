use anyhow::Context;
use axum::{Extension, Router, extract::State, response::IntoResponse, routing};
use diesel::{ExpressionMethods, QueryDsl};
use diesel_async::RunQueryDsl;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{LabTestEntity, PrescriptionEntity},
    routes::patients::patient_for_user,
    schema::{lab_tests, prescriptions},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/patients",
        Router::new()
            .route(
                "/prescriptions/my-prescriptions",
                routing::get(get_my_prescriptions),
            )
            .route("/lab-tests/my-lab-tests", routing::get(get_my_lab_tests))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::patients_authorization,
            )),
    )
}

/// Fetch all prescriptions issued to the authenticated patient.
async fn get_my_prescriptions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let prescriptions: Vec<PrescriptionEntity> = prescriptions::table
        .filter(prescriptions::patient_id.eq(patient.id))
        .order_by(prescriptions::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my prescriptions")?;

    Ok(StdResponse {
        data: Some(prescriptions),
        message: Some("Get my prescriptions successfully"),
    })
}

/// Fetch all lab tests ordered for the authenticated patient.
async fn get_my_lab_tests(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let lab_tests: Vec<LabTestEntity> = lab_tests::table
        .filter(lab_tests::patient_id.eq(patient.id))
        .order_by(lab_tests::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my lab tests")?;

    Ok(StdResponse {
        data: Some(lab_tests),
        message: Some("Get my lab tests successfully"),
    })
}
