use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::{NaiveDateTime, Utc};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{AppointmentEntity, CreateAppointmentEntity, DoctorEntity},
    routes::patients::patient_for_user,
    schema::{appointments, doctors},
};

const DEFAULT_DURATION_MINUTES: i32 = 30;

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/api/patients/appointments",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(book_appointment))
            .routes(utoipa_axum::routes!(get_my_appointments))
            .routes(utoipa_axum::routes!(cancel_appointment))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::patients_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
struct BookAppointmentReq {
    doctor_id: i32,
    /// Clinic-local wall-clock datetime, e.g. "2026-08-10T14:30:00".
    appointment_date: NaiveDateTime,
    duration_minutes: Option<i32>,
    reason: Option<String>,
}

/// Book an appointment with a doctor. The submitted datetime is interpreted
/// in the clinic's configured offset and stored as UTC.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Appointments"],
    security(("cookieAuth" = [])),
    request_body = BookAppointmentReq,
    responses(
        (status = 200, description = "Booked appointment successfully", body = StdResponse<AppointmentEntity, String>)
    )
)]
async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<BookAppointmentReq>,
) -> Result<impl IntoResponse, AppError> {
    let duration_minutes = body.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
    if !(5..=240).contains(&duration_minutes) {
        return Err(AppError::BadRequest(
            "Duration must be between 5 and 240 minutes".to_string(),
        ));
    }

    let appointment_date = state.clock.to_utc(body.appointment_date);
    if appointment_date <= Utc::now() {
        return Err(AppError::BadRequest(
            "Appointment must be in the future".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let doctor_exists: i64 = doctors::table
        .find(body.doctor_id)
        .count()
        .get_result(conn)
        .await
        .context("Failed to check doctor")?;
    if doctor_exists == 0 {
        return Err(AppError::NotFound);
    }

    let appointment: AppointmentEntity = diesel::insert_into(appointments::table)
        .values(CreateAppointmentEntity {
            patient_id: patient.id,
            doctor_id: body.doctor_id,
            appointment_date,
            duration_minutes,
            status: "scheduled".to_string(),
            reason: body.reason,
        })
        .returning(AppointmentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create appointment")?;

    Ok(StdResponse {
        data: Some(appointment),
        message: Some("Booked appointment successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct PatientAppointmentRes {
    appointment: AppointmentEntity,
    doctor: DoctorEntity,
}

/// Fetch all appointments belonging to the authenticated patient.
#[utoipa::path(
    get,
    path = "/my-appointments",
    tags = ["Appointments"],
    security(("cookieAuth" = [])),
    responses(
        (status = 200, description = "List my appointments", body = StdResponse<Vec<PatientAppointmentRes>, String>)
    )
)]
async fn get_my_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let rows: Vec<(AppointmentEntity, DoctorEntity)> = appointments::table
        .inner_join(doctors::table)
        .filter(appointments::patient_id.eq(patient.id))
        .order_by(appointments::appointment_date.desc())
        .select((
            AppointmentEntity::as_select(),
            DoctorEntity::as_select(),
        ))
        .get_results(conn)
        .await
        .context("Failed to get my appointments")?;

    let appointments = rows
        .into_iter()
        .map(|(appointment, doctor)| PatientAppointmentRes {
            appointment,
            doctor,
        })
        .collect::<Vec<_>>();

    Ok(StdResponse {
        data: Some(appointments),
        message: Some("Get my appointments successfully"),
    })
}

/// Cancel an appointment that has not yet taken place.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Appointments"],
    security(("cookieAuth" = [])),
    params(
        ("id" = i32, Path, description = "Appointment ID to cancel")
    ),
    responses(
        (status = 200, description = "Cancelled appointment successfully", body = StdResponse<AppointmentEntity, String>)
    )
)]
async fn cancel_appointment(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let appointment: AppointmentEntity = appointments::table
        .find(id)
        .filter(appointments::patient_id.eq(patient.id))
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    if !matches!(appointment.status.as_str(), "scheduled" | "confirmed") {
        return Err(AppError::BadRequest(
            "Appointment can no longer be cancelled".to_string(),
        ));
    }

    let cancelled: AppointmentEntity = diesel::update(appointments::table.find(appointment.id))
        .set((
            appointments::status.eq("cancelled"),
            appointments::updated_at.eq(diesel::dsl::now),
        ))
        .returning(AppointmentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to cancel appointment")?;

    Ok(StdResponse {
        data: Some(cancelled),
        message: Some("Cancelled appointment successfully"),
    })
}
