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
    models::{LabTestEntity, PatientEntity, PrescriptionEntity, UserProfileEntity},
    routes::doctors::{doctor_for_user, ensure_patient_relationship},
    schema::{lab_tests, patients, prescriptions, user_profiles},
};

const CHART_HISTORY_LIMIT: i64 = 10;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/doctors/patients",
        Router::new()
            .route("/", routing::get(get_my_patients))
            .route("/{id}", routing::get(get_patient_chart))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Patients who have an appointment with this doctor.
async fn get_my_patients(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor = doctor_for_user(conn, user.id).await?;

    let patients: Vec<PatientEntity> = crate::schema::appointments::table
        .inner_join(patients::table)
        .filter(crate::schema::appointments::doctor_id.eq(doctor.id))
        .select(PatientEntity::as_select())
        .distinct()
        .get_results(conn)
        .await
        .context("Failed to get my patients")?;

    Ok(StdResponse {
        data: Some(patients),
        message: Some("Get my patients successfully"),
    })
}

#[derive(Serialize)]
struct PatientChartRes {
    patient: PatientEntity,
    profile: UserProfileEntity,
    prescriptions: Vec<PrescriptionEntity>,
    lab_tests: Vec<LabTestEntity>,
}

/// Chart view for a related patient: profile, recent prescriptions and labs.
async fn get_patient_chart(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor = doctor_for_user(conn, user.id).await?;

    let patient: PatientEntity = patients::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    ensure_patient_relationship(conn, doctor.id, patient.id).await?;

    let profile: UserProfileEntity = user_profiles::table
        .find(patient.user_id)
        .get_result(conn)
        .await
        .context("Failed to get patient profile")?;

    let prescriptions: Vec<PrescriptionEntity> = prescriptions::table
        .filter(prescriptions::patient_id.eq(patient.id))
        .order_by(prescriptions::created_at.desc())
        .limit(CHART_HISTORY_LIMIT)
        .get_results(conn)
        .await
        .context("Failed to get patient prescriptions")?;

    let lab_tests: Vec<LabTestEntity> = lab_tests::table
        .filter(lab_tests::patient_id.eq(patient.id))
        .order_by(lab_tests::created_at.desc())
        .limit(CHART_HISTORY_LIMIT)
        .get_results(conn)
        .await
        .context("Failed to get patient lab tests")?;

    Ok(StdResponse {
        data: Some(PatientChartRes {
            patient,
            profile,
            prescriptions,
            lab_tests,
        }),
        message: Some("Get patient chart successfully"),
    })
}
