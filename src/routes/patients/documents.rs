use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::State,
    response::IntoResponse,
    routing,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{CreateMedicalDocumentEntity, MedicalDocumentEntity},
    routes::patients::patient_for_user,
    schema::medical_documents,
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/patients/documents",
        Router::new()
            .route("/", routing::post(upload_document))
            .route("/my-documents", routing::get(get_my_documents))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::patients_authorization,
            )),
    )
}

#[derive(Deserialize)]
struct UploadDocumentReq {
    file_name: String,
    content_type: String,
    /// Base64-encoded document payload, embedded in the request body.
    data: String,
}

/// Upload a medical history document. The payload must be valid base64.
async fn upload_document(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UploadDocumentReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.file_name.trim().is_empty() {
        return Err(AppError::BadRequest("File name is required".to_string()));
    }
    if STANDARD.decode(&body.data).is_err() {
        return Err(AppError::BadRequest(
            "Document payload is not valid base64".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let document: MedicalDocumentEntity = diesel::insert_into(medical_documents::table)
        .values(CreateMedicalDocumentEntity {
            patient_id: patient.id,
            file_name: body.file_name,
            content_type: body.content_type,
            data: body.data,
        })
        .returning(MedicalDocumentEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to store document")?;

    Ok(StdResponse {
        data: Some(document),
        message: Some("Uploaded document successfully"),
    })
}

/// Fetch all documents uploaded by the authenticated patient.
async fn get_my_documents(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let documents: Vec<MedicalDocumentEntity> = medical_documents::table
        .filter(medical_documents::patient_id.eq(patient.id))
        .order_by(medical_documents::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get my documents")?;

    Ok(StdResponse {
        data: Some(documents),
        message: Some("Get my documents successfully"),
    })
}
