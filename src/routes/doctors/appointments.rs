use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{AppointmentEntity, PatientEntity},
    routes::doctors::{
        dashboard::{DoctorAppointmentRes, UPCOMING_APPOINTMENTS_LIMIT},
        doctor_for_user,
    },
    schema::{appointments, patients},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/doctors/appointments",
        Router::new()
            .route("/today", routing::get(get_today))
            .route("/upcoming", routing::get(get_upcoming))
            .route("/{id}/status", routing::patch(update_status))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

/// Appointment lifecycle: scheduled -> confirmed -> completed, with
/// cancelled/no_show exits. Completed, cancelled and no_show are terminal.
pub fn validate_transition(current: &str, next: &str) -> Result<(), AppError> {
    if !matches!(
        next,
        "scheduled" | "confirmed" | "completed" | "cancelled" | "no_show"
    ) {
        return Err(AppError::BadRequest(format!(
            "'{next}' is not a valid appointment status"
        )));
    }

    let allowed = matches!(
        (current, next),
        ("scheduled", "confirmed" | "cancelled" | "no_show")
            | ("confirmed", "completed" | "cancelled" | "no_show")
    );
    if !allowed {
        return Err(AppError::BadRequest(format!(
            "Cannot change appointment status from '{current}' to '{next}'"
        )));
    }
    Ok(())
}

/// Today's appointments in the clinic-local day window.
async fn get_today(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor = doctor_for_user(conn, user.id).await?;
    let (day_start, day_end) = state.clock.today_window(Utc::now());

    let rows: Vec<(AppointmentEntity, PatientEntity)> = appointments::table
        .inner_join(patients::table)
        .filter(appointments::doctor_id.eq(doctor.id))
        .filter(appointments::appointment_date.ge(day_start))
        .filter(appointments::appointment_date.lt(day_end))
        .order_by(appointments::appointment_date.asc())
        .select((AppointmentEntity::as_select(), PatientEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get today's appointments")?;

    Ok(StdResponse {
        data: Some(
            rows.into_iter()
                .map(|(appointment, patient)| DoctorAppointmentRes {
                    appointment,
                    patient,
                })
                .collect::<Vec<_>>(),
        ),
        message: Some("Get today's appointments successfully"),
    })
}

/// Appointments from the next clinic-local midnight onward, soonest first.
async fn get_upcoming(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor = doctor_for_user(conn, user.id).await?;
    let (_, day_end) = state.clock.today_window(Utc::now());

    let rows: Vec<(AppointmentEntity, PatientEntity)> = appointments::table
        .inner_join(patients::table)
        .filter(appointments::doctor_id.eq(doctor.id))
        .filter(appointments::appointment_date.ge(day_end))
        .order_by(appointments::appointment_date.asc())
        .limit(UPCOMING_APPOINTMENTS_LIMIT)
        .select((AppointmentEntity::as_select(), PatientEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get upcoming appointments")?;

    Ok(StdResponse {
        data: Some(
            rows.into_iter()
                .map(|(appointment, patient)| DoctorAppointmentRes {
                    appointment,
                    patient,
                })
                .collect::<Vec<_>>(),
        ),
        message: Some("Get upcoming appointments successfully"),
    })
}

#[derive(Deserialize)]
struct UpdateStatusReq {
    status: String,
}

/// Move one of the doctor's own appointments through its lifecycle.
async fn update_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor = doctor_for_user(conn, user.id).await?;

    let appointment: AppointmentEntity = appointments::table
        .find(id)
        .filter(appointments::doctor_id.eq(doctor.id))
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

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("scheduled", "confirmed", true)]
    #[test_case("scheduled", "cancelled", true)]
    #[test_case("scheduled", "no_show", true)]
    #[test_case("scheduled", "completed", false; "must confirm before completing")]
    #[test_case("confirmed", "completed", true)]
    #[test_case("confirmed", "no_show", true)]
    #[test_case("completed", "cancelled", false; "completed is terminal")]
    #[test_case("completed", "confirmed", false)]
    #[test_case("cancelled", "confirmed", false; "cancelled is terminal")]
    #[test_case("no_show", "confirmed", false)]
    fn lifecycle_transitions(current: &str, next: &str, ok: bool) {
        assert_eq!(validate_transition(current, next).is_ok(), ok);
    }

    #[test]
    fn unknown_status_rejected() {
        assert!(validate_transition("scheduled", "rescheduled").is_err());
    }
}
