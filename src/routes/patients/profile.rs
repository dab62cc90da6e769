use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::State,
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{PatientEntity, UpdatePatientEntity, UpdateUserProfileEntity, UserProfileEntity},
    routes::patients::patient_for_user,
    schema::{patients, user_profiles},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/patients/profile",
        Router::new()
            .route("/", routing::get(get_profile))
            .route("/", routing::patch(update_profile))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::patients_authorization,
            )),
    )
}

#[derive(Serialize)]
struct ProfileRes {
    profile: UserProfileEntity,
    patient: PatientEntity,
}

/// Fetch the authenticated patient's demographic and clinical profile.
async fn get_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;
    let profile: UserProfileEntity = user_profiles::table
        .find(user.id)
        .get_result(conn)
        .await
        .context("Failed to get user profile")?;

    Ok(StdResponse {
        data: Some(ProfileRes { profile, patient }),
        message: Some("Get profile successfully"),
    })
}

#[derive(Deserialize, Default)]
struct UpdateProfileReq {
    profile: Option<UpdateUserProfileEntity>,
    medical: Option<UpdatePatientEntity>,
}

/// Partial update of profile and/or clinical fields. Absent fields are left
/// untouched; an empty section still touches `updated_at`.
async fn update_profile(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<UpdateProfileReq>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let patient = patient_for_user(conn, user.id).await?;

    let (profile, patient) = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let profile: UserProfileEntity = match body.profile {
                    Some(changes) => diesel::update(user_profiles::table.find(user.id))
                        .set((&changes, user_profiles::updated_at.eq(diesel::dsl::now)))
                        .returning(UserProfileEntity::as_returning())
                        .get_result(tx)
                        .await
                        .context("Failed to update user profile")?,
                    None => user_profiles::table
                        .find(user.id)
                        .get_result(tx)
                        .await
                        .context("Failed to get user profile")?,
                };

                let patient: PatientEntity = match body.medical {
                    Some(changes) => diesel::update(patients::table.find(patient.id))
                        .set((&changes, patients::updated_at.eq(diesel::dsl::now)))
                        .returning(PatientEntity::as_returning())
                        .get_result(tx)
                        .await
                        .context("Failed to update patient record")?,
                    None => patient,
                };

                Ok::<(UserProfileEntity, PatientEntity), anyhow::Error>((profile, patient))
            })
        })
        .await
        .context("Transaction failed")?;

    Ok(StdResponse {
        data: Some(ProfileRes { profile, patient }),
        message: Some("Updated profile successfully"),
    })
}
