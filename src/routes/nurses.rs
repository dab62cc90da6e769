use anyhow::Context;
use axum::{
    Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{AppointmentEntity, DoctorEntity, PatientEntity, UserProfileEntity},
    routes::doctors::appointments::validate_transition,
    schema::{appointments, doctors, patients, user_profiles},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/nurses",
        Router::new()
            .route("/appointments", routing::get(get_todays_schedule))
            .route(
                "/appointments/{id}/status",
                routing::patch(update_appointment_status),
            )
            .route("/patients/{id}", routing::get(get_patient))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::nurses_authorization,
            )),
    )
}

#[derive(Serialize)]
struct ScheduleEntryRes {
    appointment: AppointmentEntity,
    patient: PatientEntity,
    doctor: DoctorEntity,
}

/// The clinic-wide schedule for the current clinic-local day.
async fn get_todays_schedule(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (day_start, day_end) = state.clock.today_window(Utc::now());

    let rows: Vec<(AppointmentEntity, PatientEntity, DoctorEntity)> = appointments::table
        .inner_join(patients::table)
        .inner_join(doctors::table)
        .filter(appointments::appointment_date.ge(day_start))
        .filter(appointments::appointment_date.lt(day_end))
        .order_by(appointments::appointment_date.asc())
        .select((
            AppointmentEntity::as_select(),
            PatientEntity::as_select(),
            DoctorEntity::as_select(),
        ))
        .get_results(conn)
        .await
        .context("Failed to get today's schedule")?;

    Ok(StdResponse {
        data: Some(
            rows.into_iter()
                .map(|(appointment, patient, doctor)| ScheduleEntryRes {
                    appointment,
                    patient,
                    doctor,
                })
                .collect::<Vec<_>>(),
        ),
        message: Some("Get today's schedule successfully"),
    })
}

#[derive(Deserialize)]
struct UpdateStatusReq {
    status: String,
}

/// Nurses handle check-in outcomes only: confirm or mark no-show.
async fn update_appointment_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    if !matches!(body.status.as_str(), "confirmed" | "no_show") {
        return Err(AppError::BadRequest(
            "Nurses may only confirm appointments or mark them as no-show".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let appointment: AppointmentEntity = appointments::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    validate_transition(&appointment.status, &body.status)?;

    let updated: AppointmentEntity = diesel::update(appointments::table.find(appointment.id))
        .set((
            appointments::status.eq(&body.status),
            appointments::updated_at.eq(diesel::dsl::now),
        ))
        .returning(AppointmentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to update appointment status")?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Updated appointment status successfully"),
    })
}

#[derive(Serialize)]
struct PatientSummaryRes {
    patient: PatientEntity,
    profile: UserProfileEntity,
}

/// Care summary for one patient.
async fn get_patient(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient: PatientEntity = patients::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    let profile: UserProfileEntity = user_profiles::table
        .find(patient.user_id)
        .get_result(conn)
        .await
        .context("Failed to get patient profile")?;

    Ok(StdResponse {
        data: Some(PatientSummaryRes { patient, profile }),
        message: Some("Get patient successfully"),
    })
}
