use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{
        CreateNotificationEntity, CreatePrescriptionEntity, PatientEntity, PrescriptionEntity,
    },
    routes::doctors::{doctor_for_user, ensure_patient_relationship},
    schema::{notifications, patients, prescriptions},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/api/doctors/prescriptions",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(create_prescriptions))
            .routes(utoipa_axum::routes!(get_my_prescriptions))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::doctors_authorization,
            )),
    )
}

#[derive(Deserialize, ToSchema)]
struct PrescriptionItemReq {
    medication_name: String,
    dosage: String,
    frequency: String,
    duration_days: i32,
    route: Option<String>,
    notes: Option<String>,
}

#[derive(Deserialize, ToSchema)]
struct CreatePrescriptionsReq {
    patient_id: i32,
    medications: Vec<PrescriptionItemReq>,
}

/// Assembles the free-text instruction line shown to patients and
/// pharmacists from the structured clinical fields.
fn compile_instructions(item: &PrescriptionItemReq) -> String {
    let mut text = format!("Take {} {}", item.dosage, item.frequency);
    if let Some(route) = item.route.as_deref().filter(|r| !r.trim().is_empty()) {
        text.push_str(&format!(" via {route}"));
    }
    text.push_str(&format!(" for {} days.", item.duration_days));
    if let Some(notes) = item.notes.as_deref().filter(|n| !n.trim().is_empty()) {
        text.push(' ');
        text.push_str(notes.trim());
        if !text.ends_with('.') {
            text.push('.');
        }
    }
    text
}

fn validate_items(items: &[PrescriptionItemReq]) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest(
            "At least one medication is required".to_string(),
        ));
    }
    for item in items {
        if item.medication_name.trim().is_empty()
            || item.dosage.trim().is_empty()
            || item.frequency.trim().is_empty()
        {
            return Err(AppError::BadRequest(
                "Medication name, dosage and frequency are required".to_string(),
            ));
        }
        if item.duration_days <= 0 {
            return Err(AppError::BadRequest(
                "Duration must be at least one day".to_string(),
            ));
        }
    }
    Ok(())
}

/// Issue prescriptions for a related patient. One row per medication plus a
/// notification per row, all inside a single transaction: either every
/// prescription and notification commits, or none do.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Prescriptions"],
    security(("cookieAuth" = [])),
    request_body = CreatePrescriptionsReq,
    responses(
        (status = 200, description = "Created prescriptions successfully", body = StdResponse<Vec<PrescriptionEntity>, String>)
    )
)]
async fn create_prescriptions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreatePrescriptionsReq>,
) -> Result<impl IntoResponse, AppError> {
    validate_items(&body.medications)?;

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

    let created = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let mut created = Vec::with_capacity(body.medications.len());
                for item in &body.medications {
                    let prescription: PrescriptionEntity =
                        diesel::insert_into(prescriptions::table)
                            .values(CreatePrescriptionEntity {
                                patient_id: patient.id,
                                doctor_id: doctor.id,
                                medication_name: item.medication_name.clone(),
                                dosage: item.dosage.clone(),
                                frequency: item.frequency.clone(),
                                duration_days: item.duration_days,
                                instructions: compile_instructions(item),
                                status: "pending".to_string(),
                            })
                            .returning(PrescriptionEntity::as_returning())
                            .get_result(tx)
                            .await
                            .context("Failed to create prescription")?;

                    diesel::insert_into(notifications::table)
                        .values(CreateNotificationEntity {
                            user_id: patient.user_id,
                            title: "New prescription".to_string(),
                            message: format!(
                                "You have been prescribed {}",
                                prescription.medication_name
                            ),
                            notification_type: "prescription".to_string(),
                            related_id: Some(prescription.id),
                        })
                        .execute(tx)
                        .await
                        .context("Failed to create prescription notification")?;

                    created.push(prescription);
                }
                Ok::<Vec<PrescriptionEntity>, anyhow::Error>(created)
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(created),
        message: Some("Created prescriptions successfully"),
    })
}

#[derive(Serialize, ToSchema)]
struct AuthoredPrescriptionRes {
    prescription: PrescriptionEntity,
    patient: PatientEntity,
}

/// Prescriptions authored by the authenticated doctor.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Prescriptions"],
    security(("cookieAuth" = [])),
    responses(
        (status = 200, description = "List authored prescriptions", body = StdResponse<Vec<AuthoredPrescriptionRes>, String>)
    )
)]
async fn get_my_prescriptions(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let doctor = doctor_for_user(conn, user.id).await?;

    let rows: Vec<(PrescriptionEntity, PatientEntity)> = prescriptions::table
        .inner_join(patients::table)
        .filter(prescriptions::doctor_id.eq(doctor.id))
        .order_by(prescriptions::created_at.desc())
        .select((PrescriptionEntity::as_select(), PatientEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get authored prescriptions")?;

    Ok(StdResponse {
        data: Some(
            rows.into_iter()
                .map(|(prescription, patient)| AuthoredPrescriptionRes {
                    prescription,
                    patient,
                })
                .collect::<Vec<_>>(),
        ),
        message: Some("Get authored prescriptions successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(route: Option<&str>, notes: Option<&str>) -> PrescriptionItemReq {
        PrescriptionItemReq {
            medication_name: "Amoxicillin".to_string(),
            dosage: "500mg".to_string(),
            frequency: "twice daily".to_string(),
            duration_days: 7,
            route: route.map(str::to_string),
            notes: notes.map(str::to_string),
        }
    }

    #[test]
    fn compiles_minimal_instructions() {
        assert_eq!(
            compile_instructions(&item(None, None)),
            "Take 500mg twice daily for 7 days."
        );
    }

    #[test]
    fn compiles_full_instructions() {
        assert_eq!(
            compile_instructions(&item(Some("oral"), Some("Take with food"))),
            "Take 500mg twice daily via oral for 7 days. Take with food."
        );
    }

    #[test]
    fn blank_optional_fields_are_skipped() {
        assert_eq!(
            compile_instructions(&item(Some("  "), Some(""))),
            "Take 500mg twice daily for 7 days."
        );
    }

    #[test]
    fn validation_rejects_bad_items() {
        assert!(validate_items(&[]).is_err());
        let mut bad = item(None, None);
        bad.duration_days = 0;
        assert!(validate_items(&[bad]).is_err());
        let mut blank = item(None, None);
        blank.dosage = " ".to_string();
        assert!(validate_items(&[blank]).is_err());
        assert!(validate_items(&[item(None, None)]).is_ok());
    }
}
