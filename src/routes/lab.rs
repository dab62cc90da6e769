use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    response::IntoResponse,
    routing,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{CreateNotificationEntity, DoctorEntity, LabTestEntity, PatientEntity},
    schema::{doctors, lab_tests, notifications, patients},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/lab/lab-tests",
        Router::new()
            .route("/worklist", routing::get(get_worklist))
            .route("/{id}/start", routing::patch(start_test))
            .route("/{id}/complete", routing::patch(complete_test))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::lab_technicians_authorization,
            )),
    )
}

/// Open lab orders: everything not yet completed, oldest first.
async fn get_worklist(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let worklist: Vec<LabTestEntity> = lab_tests::table
        .filter(lab_tests::status.eq_any(["ordered", "in_progress"]))
        .order_by(lab_tests::created_at.asc())
        .get_results(conn)
        .await
        .context("Failed to get lab worklist")?;

    Ok(StdResponse {
        data: Some(worklist),
        message: Some("Get worklist successfully"),
    })
}

/// Claim an ordered test for processing.
async fn start_test(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let updated: LabTestEntity = diesel::update(
        lab_tests::table
            .find(id)
            .filter(lab_tests::status.eq("ordered")),
    )
    .set((
        lab_tests::status.eq("in_progress"),
        lab_tests::updated_at.eq(diesel::dsl::now),
    ))
    .returning(LabTestEntity::as_returning())
    .get_result(conn)
    .await
    .map_err(|err| match err {
        DieselError::NotFound => AppError::NotFound,
        _ => AppError::Other(err.into()),
    })?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Started lab test successfully"),
    })
}

#[derive(Deserialize)]
struct CompleteTestReq {
    /// Semi-structured results: `{parameters: [...], interpretation, comments}`.
    results: Value,
}

fn validate_results(results: &Value) -> Result<(), AppError> {
    let parameters_ok = results
        .get("parameters")
        .is_some_and(Value::is_array);
    if !parameters_ok {
        return Err(AppError::BadRequest(
            "Results must contain a 'parameters' array".to_string(),
        ));
    }
    Ok(())
}

/// Record results and close the test, notifying the patient and the
/// ordering doctor in the same transaction as the status change.
async fn complete_test(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CompleteTestReq>,
) -> Result<impl IntoResponse, AppError> {
    validate_results(&body.results)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let lab_test: LabTestEntity = lab_tests::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    if lab_test.status == "completed" {
        return Err(AppError::BadRequest(
            "Lab test is already completed".to_string(),
        ));
    }

    let patient: PatientEntity = patients::table
        .find(lab_test.patient_id)
        .get_result(conn)
        .await
        .context("Failed to get patient")?;
    let doctor: DoctorEntity = doctors::table
        .find(lab_test.doctor_id)
        .get_result(conn)
        .await
        .context("Failed to get ordering doctor")?;

    let completed = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let completed: LabTestEntity = diesel::update(lab_tests::table.find(lab_test.id))
                    .set((
                        lab_tests::status.eq("completed"),
                        lab_tests::results.eq(Some(body.results)),
                        lab_tests::completed_by.eq(Some(user.id)),
                        lab_tests::completed_at.eq(Some(Utc::now())),
                        lab_tests::updated_at.eq(diesel::dsl::now),
                    ))
                    .returning(LabTestEntity::as_returning())
                    .get_result(tx)
                    .await
                    .context("Failed to complete lab test")?;

                let recipients = [
                    (patient.user_id, "Your lab results are ready"),
                    (doctor.user_id, "Lab results ready for review"),
                ];
                for (user_id, title) in recipients {
                    diesel::insert_into(notifications::table)
                        .values(CreateNotificationEntity {
                            user_id,
                            title: title.to_string(),
                            message: format!("Results for {} are available", completed.test_name),
                            notification_type: "lab_result".to_string(),
                            related_id: Some(completed.id),
                        })
                        .execute(tx)
                        .await
                        .context("Failed to create lab result notification")?;
                }

                Ok::<LabTestEntity, anyhow::Error>(completed)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(completed),
        message: Some("Completed lab test successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn results_require_parameters_array() {
        assert!(validate_results(&json!({
            "parameters": [{"name": "WBC", "value": 6.1, "unit": "10^9/L"}],
            "interpretation": "normal",
            "comments": ""
        }))
        .is_ok());
        assert!(validate_results(&json!({"interpretation": "normal"})).is_err());
        assert!(validate_results(&json!({"parameters": "not-an-array"})).is_err());
    }
}
