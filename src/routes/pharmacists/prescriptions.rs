use anyhow::Context;
use axum::{
    Extension, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Serialize;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{CreateNotificationEntity, PatientEntity, PrescriptionEntity},
    schema::{notifications, patients, prescriptions},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/pharmacists/prescriptions",
        Router::new()
            .route("/pending", routing::get(get_pending))
            .route("/{id}/fill", routing::patch(fill_prescription))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::pharmacists_authorization,
            )),
    )
}

#[derive(Serialize)]
struct PendingPrescriptionRes {
    prescription: PrescriptionEntity,
    patient: PatientEntity,
}

/// The dispensing queue: pending prescriptions, oldest first.
async fn get_pending(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(PrescriptionEntity, PatientEntity)> = prescriptions::table
        .inner_join(patients::table)
        .filter(prescriptions::status.eq("pending"))
        .order_by(prescriptions::created_at.asc())
        .select((PrescriptionEntity::as_select(), PatientEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get pending prescriptions")?;

    Ok(StdResponse {
        data: Some(
            rows.into_iter()
                .map(|(prescription, patient)| PendingPrescriptionRes {
                    prescription,
                    patient,
                })
                .collect::<Vec<_>>(),
        ),
        message: Some("Get pending prescriptions successfully"),
    })
}

/// Dispense a pending prescription. Filled is terminal, so the guarded
/// update only matches rows still pending; the patient is notified in the
/// same transaction.
async fn fill_prescription(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let filled = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let filled: PrescriptionEntity = diesel::update(
                    prescriptions::table
                        .find(id)
                        .filter(prescriptions::status.eq("pending")),
                )
                .set((
                    prescriptions::status.eq("filled"),
                    prescriptions::filled_by.eq(Some(user.id)),
                    prescriptions::filled_at.eq(Some(Utc::now())),
                    prescriptions::updated_at.eq(diesel::dsl::now),
                ))
                .returning(PrescriptionEntity::as_returning())
                .get_result(tx)
                .await
                .map_err(|err| match err {
                    DieselError::NotFound => AppError::NotFound,
                    _ => AppError::Other(err.into()),
                })?;

                let patient: PatientEntity = patients::table
                    .find(filled.patient_id)
                    .get_result(tx)
                    .await
                    .context("Failed to get patient")?;

                diesel::insert_into(notifications::table)
                    .values(CreateNotificationEntity {
                        user_id: patient.user_id,
                        title: "Prescription filled".to_string(),
                        message: format!(
                            "Your prescription for {} is ready for pickup",
                            filled.medication_name
                        ),
                        notification_type: "prescription".to_string(),
                        related_id: Some(filled.id),
                    })
                    .execute(tx)
                    .await
                    .context("Failed to create fill notification")?;

                Ok::<PrescriptionEntity, AppError>(filled)
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(filled),
        message: Some("Filled prescription successfully"),
    })
}
