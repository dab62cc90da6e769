use anyhow::Context;
use axum::{
    Json, Router,
    extract::State,
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;

use crate::{
    core::{
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CreateMedicationEntity, MedicationEntity},
    schema::medications,
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/pharmacists/medications",
        Router::new()
            .route("/", routing::get(get_medications))
            .route("/", routing::post(create_medication))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::pharmacists_authorization,
            )),
    )
}

/// The medication catalog, alphabetical.
async fn get_medications(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let medications: Vec<MedicationEntity> = medications::table
        .order_by(medications::name.asc())
        .get_results(conn)
        .await
        .context("Failed to get medications")?;

    Ok(StdResponse {
        data: Some(medications),
        message: Some("Get medications successfully"),
    })
}

/// Add a catalog entry.
async fn create_medication(
    State(state): State<AppState>,
    Json(body): Json<CreateMedicationEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.name.trim().is_empty() || body.category.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Name and category are required".to_string(),
        ));
    }
    if body.unit_price < 0.0 {
        return Err(AppError::BadRequest(
            "Unit price cannot be negative".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let medication: MedicationEntity = diesel::insert_into(medications::table)
        .values(body)
        .returning(MedicationEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create medication")?;

    Ok(StdResponse {
        data: Some(medication),
        message: Some("Created medication successfully"),
    })
}
