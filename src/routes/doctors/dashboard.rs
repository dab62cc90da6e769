use anyhow::Context;
use axum::{Extension, Router, extract::State, response::IntoResponse, routing};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Serialize;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{AppointmentEntity, PatientEntity},
    routes::doctors::doctor_for_user,
    schema::{appointments, patients},
};

/// Upper bound on the "upcoming" list shown on the dashboard.
pub const UPCOMING_APPOINTMENTS_LIMIT: i64 = 10;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/doctors/dashboard",
        Router::new()
            .route("/", routing::get(get_dashboard))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

#[derive(Serialize)]
pub struct DoctorAppointmentRes {
    pub appointment: AppointmentEntity,
    pub patient: PatientEntity,
}

#[derive(Serialize)]
struct DashboardRes {
    today: Vec<DoctorAppointmentRes>,
    upcoming: Vec<DoctorAppointmentRes>,
    today_count: usize,
    upcoming_total: i64,
}

/// Partition the doctor's schedule into the clinic-local "today" window and
/// everything from the next local midnight onward.
async fn get_dashboard(
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

    let today: Vec<(AppointmentEntity, PatientEntity)> = appointments::table
        .inner_join(patients::table)
        .filter(appointments::doctor_id.eq(doctor.id))
        .filter(appointments::appointment_date.ge(day_start))
        .filter(appointments::appointment_date.lt(day_end))
        .order_by(appointments::appointment_date.asc())
        .select((AppointmentEntity::as_select(), PatientEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get today's appointments")?;

    let upcoming: Vec<(AppointmentEntity, PatientEntity)> = appointments::table
        .inner_join(patients::table)
        .filter(appointments::doctor_id.eq(doctor.id))
        .filter(appointments::appointment_date.ge(day_end))
        .order_by(appointments::appointment_date.asc())
        .limit(UPCOMING_APPOINTMENTS_LIMIT)
        .select((AppointmentEntity::as_select(), PatientEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get upcoming appointments")?;

    let upcoming_total: i64 = appointments::table
        .filter(appointments::doctor_id.eq(doctor.id))
        .filter(appointments::appointment_date.ge(day_end))
        .count()
        .get_result(conn)
        .await
        .context("Failed to count upcoming appointments")?;

    let into_res = |rows: Vec<(AppointmentEntity, PatientEntity)>| {
        rows.into_iter()
            .map(|(appointment, patient)| DoctorAppointmentRes {
                appointment,
                patient,
            })
            .collect::<Vec<_>>()
    };

    let today = into_res(today);
    Ok(StdResponse {
        data: Some(DashboardRes {
            today_count: today.len(),
            today,
            upcoming: into_res(upcoming),
            upcoming_total,
        }),
        message: Some("Get dashboard successfully"),
    })
}
