use anyhow::Context;
use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Serialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        aliases::DieselError,
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware,
    },
    models::{CreateInventoryEntity, InventoryEntity, MedicationEntity, UpdateInventoryEntity},
    schema::{inventory, medications},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/api/pharmacists/inventory",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_inventory))
            .routes(utoipa_axum::routes!(create_batch))
            .routes(utoipa_axum::routes!(get_low_stock))
            .routes(utoipa_axum::routes!(update_batch))
            .routes(utoipa_axum::routes!(delete_batch))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::pharmacists_authorization,
            )),
    )
}

#[derive(Serialize, ToSchema)]
struct InventoryBatchRes {
    batch: InventoryEntity,
    medication: MedicationEntity,
}

/// All stock batches with their catalog entries.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Inventory"],
    security(("cookieAuth" = [])),
    responses(
        (status = 200, description = "List inventory batches", body = StdResponse<Vec<InventoryBatchRes>, String>)
    )
)]
async fn get_inventory(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(InventoryEntity, MedicationEntity)> = inventory::table
        .inner_join(medications::table)
        .order_by(inventory::expiry_date.asc())
        .select((InventoryEntity::as_select(), MedicationEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get inventory")?;

    Ok(StdResponse {
        data: Some(
            rows.into_iter()
                .map(|(batch, medication)| InventoryBatchRes { batch, medication })
                .collect::<Vec<_>>(),
        ),
        message: Some("Get inventory successfully"),
    })
}

/// Register a new stock batch for a medication.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Inventory"],
    security(("cookieAuth" = [])),
    request_body = CreateInventoryEntity,
    responses(
        (status = 200, description = "Created batch successfully", body = StdResponse<InventoryEntity, String>)
    )
)]
async fn create_batch(
    State(state): State<AppState>,
    Json(body): Json<CreateInventoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.quantity_available < 0 || body.minimum_stock_level < 0 {
        return Err(AppError::BadRequest(
            "Quantities cannot be negative".to_string(),
        ));
    }
    if body.batch_number.trim().is_empty() {
        return Err(AppError::BadRequest("Batch number is required".to_string()));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let medication_exists: i64 = medications::table
        .find(body.medication_id)
        .count()
        .get_result(conn)
        .await
        .context("Failed to check medication")?;
    if medication_exists == 0 {
        return Err(AppError::NotFound);
    }

    let batch: InventoryEntity = diesel::insert_into(inventory::table)
        .values(body)
        .returning(InventoryEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to create inventory batch")?;

    Ok(StdResponse {
        data: Some(batch),
        message: Some("Created batch successfully"),
    })
}

/// Batches at or below their minimum stock level.
#[utoipa::path(
    get,
    path = "/low-stock",
    tags = ["Inventory"],
    security(("cookieAuth" = [])),
    responses(
        (status = 200, description = "List low-stock batches", body = StdResponse<Vec<InventoryBatchRes>, String>)
    )
)]
async fn get_low_stock(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let rows: Vec<(InventoryEntity, MedicationEntity)> = inventory::table
        .inner_join(medications::table)
        .filter(inventory::quantity_available.le(inventory::minimum_stock_level))
        .order_by(inventory::quantity_available.asc())
        .select((InventoryEntity::as_select(), MedicationEntity::as_select()))
        .get_results(conn)
        .await
        .context("Failed to get low-stock batches")?;

    Ok(StdResponse {
        data: Some(
            rows.into_iter()
                .map(|(batch, medication)| InventoryBatchRes { batch, medication })
                .collect::<Vec<_>>(),
        ),
        message: Some("Get low-stock batches successfully"),
    })
}

/// Partial update of a batch. Only supplied fields change; `updated_at` is
/// always touched, so a body with no fields is an accepted no-op.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Inventory"],
    security(("cookieAuth" = [])),
    params(
        ("id" = i32, Path, description = "Batch ID to update")
    ),
    request_body = UpdateInventoryEntity,
    responses(
        (status = 200, description = "Updated batch successfully", body = StdResponse<InventoryEntity, String>)
    )
)]
async fn update_batch(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateInventoryEntity>,
) -> Result<impl IntoResponse, AppError> {
    if body.quantity_available.is_some_and(|q| q < 0)
        || body.minimum_stock_level.is_some_and(|m| m < 0)
    {
        return Err(AppError::BadRequest(
            "Quantities cannot be negative".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let batch: InventoryEntity = diesel::update(inventory::table.find(id))
        .set((&body, inventory::updated_at.eq(diesel::dsl::now)))
        .returning(InventoryEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    Ok(StdResponse {
        data: Some(batch),
        message: Some("Updated batch successfully"),
    })
}

/// Remove a batch (e.g. expired or recalled stock).
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Inventory"],
    security(("cookieAuth" = [])),
    params(
        ("id" = i32, Path, description = "Batch ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted batch successfully", body = StdResponse<InventoryEntity, String>)
    )
)]
async fn delete_batch(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let batch = diesel::delete(inventory::table.find(id))
        .returning(InventoryEntity::as_returning())
        .get_result(conn)
        .await;

    match batch {
        Ok(batch) => Ok(StdResponse {
            data: Some(batch),
            message: Some("Deleted batch successfully"),
        }),
        Err(err) => match err {
            DieselError::NotFound => Err(AppError::NotFound),
            _ => Err(AppError::Other(err.into())),
        },
    }
}
