use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::State,
    response::IntoResponse,
    routing,
};
use diesel::{QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::Deserialize;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{CreateLabTestEntity, CreateNotificationEntity, LabTestEntity, PatientEntity},
    routes::doctors::{doctor_for_user, ensure_patient_relationship},
    schema::{lab_tests, notifications, patients},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/doctors/lab-tests",
        Router::new()
            .route("/", routing::post(order_lab_test))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

#[derive(Deserialize)]
struct OrderLabTestReq {
    patient_id: i32,
    test_name: String,
    test_type: String,
}

/// Order a lab test for a related patient and notify them.
async fn order_lab_test(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<OrderLabTestReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.test_name.trim().is_empty() || body.test_type.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Test name and type are required".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor = doctor_for_user(conn, user.id).await?;

    let patient: PatientEntity = patients::table
        .find(body.patient_id)
        .get_result(conn)
        .await
        .map_err(|_| AppError::NotFound)?;

    ensure_patient_relationship(conn, doctor.id, patient.id).await?;

    let lab_test = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let lab_test: LabTestEntity = diesel::insert_into(lab_tests::table)
                    .values(CreateLabTestEntity {
                        patient_id: patient.id,
                        doctor_id: doctor.id,
                        test_name: body.test_name,
                        test_type: body.test_type,
                        status: "ordered".to_string(),
                    })
                    .returning(LabTestEntity::as_returning())
                    .get_result(tx)
                    .await
                    .context("Failed to create lab test")?;

                diesel::insert_into(notifications::table)
                    .values(CreateNotificationEntity {
                        user_id: patient.user_id,
                        title: "Lab test ordered".to_string(),
                        message: format!("A {} test has been ordered for you", lab_test.test_name),
                        notification_type: "lab_test".to_string(),
                        related_id: Some(lab_test.id),
                    })
                    .execute(tx)
                    .await
                    .context("Failed to create lab test notification")?;

                Ok::<LabTestEntity, anyhow::Error>(lab_test)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(lab_test),
        message: Some("Ordered lab test successfully"),
    })
}
