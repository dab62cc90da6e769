use anyhow::Context;
use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    response::IntoResponse,
    routing,
};
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        aliases::{DieselError, DieselErrorKind},
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::{self, Role},
        middleware::{self, AuthUser},
    },
    models::{
        CreateDoctorEntity, CreateUserEntity, CreateUserProfileEntity, DoctorEntity, UserEntity,
    },
    schema::{doctors, user_profiles, users},
};

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new().nest(
        "/api/admins",
        Router::new()
            .route("/users", routing::get(get_users))
            .route("/users/{id}/status", routing::patch(update_user_status))
            .route("/users/{id}/role", routing::patch(update_user_role))
            .route("/staff", routing::post(create_staff))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

#[derive(Deserialize, Default)]
struct UsersQuery {
    role: Option<String>,
    status: Option<String>,
}

/// List users, optionally filtered by role and/or status.
async fn get_users(
    State(state): State<AppState>,
    Query(query): Query<UsersQuery>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let mut statement = users::table.order_by(users::created_at.desc()).into_boxed();
    if let Some(role) = query.role {
        statement = statement.filter(users::role.eq(role));
    }
    if let Some(status) = query.status {
        statement = statement.filter(users::status.eq(status));
    }

    let users: Vec<UserEntity> = statement
        .get_results(conn)
        .await
        .context("Failed to get users")?;

    Ok(StdResponse {
        data: Some(users),
        message: Some("Get users successfully"),
    })
}

#[derive(Deserialize)]
struct UpdateUserStatusReq {
    status: String,
}

/// Activate or deactivate an account. Deactivation is the portal's
/// soft-delete: the row stays, every subsequent request resolves to 401.
async fn update_user_status(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(body): Json<UpdateUserStatusReq>,
) -> Result<impl IntoResponse, AppError> {
    if !matches!(body.status.as_str(), "active" | "inactive") {
        return Err(AppError::BadRequest(
            "Status must be 'active' or 'inactive'".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let target: UserEntity = users::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    if target.role == "super_admin" && actor.role != Role::SuperAdmin {
        return Err(AppError::ForbiddenResource(
            "Only a super admin can modify a super admin account".to_string(),
        ));
    }

    let updated: UserEntity = diesel::update(users::table.find(target.id))
        .set((
            users::status.eq(&body.status),
            // A deactivated account also loses its live session.
            users::session_token.eq(None::<uuid::Uuid>),
            users::updated_at.eq(diesel::dsl::now),
        ))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to update user status")?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Updated user status successfully"),
    })
}

#[derive(Deserialize)]
struct UpdateUserRoleReq {
    role: String,
}

/// Reassign a staff role. Patient and doctor roles carry their own backing
/// rows and cannot be assigned here.
async fn update_user_role(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Extension(actor): Extension<AuthUser>,
    Json(body): Json<UpdateUserRoleReq>,
) -> Result<impl IntoResponse, AppError> {
    if actor.role != Role::SuperAdmin {
        return Err(AppError::ForbiddenResource(
            "Only a super admin can change roles".to_string(),
        ));
    }
    if !matches!(
        body.role.as_str(),
        "nurse" | "pharmacist" | "lab_technician" | "admin"
    ) {
        return Err(AppError::BadRequest(
            "Role must be one of nurse, pharmacist, lab_technician, admin".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let target: UserEntity = users::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    if matches!(target.role.as_str(), "patient" | "doctor") {
        return Err(AppError::BadRequest(
            "Patient and doctor accounts cannot be reassigned".to_string(),
        ));
    }

    let updated: UserEntity = diesel::update(users::table.find(target.id))
        .set((
            users::role.eq(&body.role),
            users::session_token.eq(None::<uuid::Uuid>),
            users::updated_at.eq(diesel::dsl::now),
        ))
        .returning(UserEntity::as_returning())
        .get_result(conn)
        .await
        .context("Failed to update user role")?;

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Updated user role successfully"),
    })
}

#[derive(Deserialize)]
struct CreateStaffReq {
    email: String,
    password: String,
    role: String,
    first_name: Option<String>,
    last_name: Option<String>,
    doctor: Option<CreateStaffDoctorReq>,
}

#[derive(Deserialize)]
struct CreateStaffDoctorReq {
    specialization: String,
    department: String,
    license_number: String,
    consultation_fee: f32,
}

#[derive(Serialize)]
struct CreateStaffRes {
    user: UserEntity,
    doctor: Option<DoctorEntity>,
}

/// Provision a staff account. Doctors additionally get their practice row.
async fn create_staff(
    State(state): State<AppState>,
    Json(body): Json<CreateStaffReq>,
) -> Result<impl IntoResponse, AppError> {
    if !matches!(
        body.role.as_str(),
        "doctor" | "nurse" | "pharmacist" | "lab_technician" | "admin"
    ) {
        return Err(AppError::BadRequest(
            "Role must be one of doctor, nurse, pharmacist, lab_technician, admin".to_string(),
        ));
    }
    if body.role == "doctor" && body.doctor.is_none() {
        return Err(AppError::BadRequest(
            "Doctor accounts require specialization details".to_string(),
        ));
    }
    if body.password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (user, doctor) = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let user: UserEntity = diesel::insert_into(users::table)
                    .values(CreateUserEntity {
                        email: body.email,
                        password_hash: auth::hash_password(&body.password),
                        role: body.role.clone(),
                        status: "active".to_string(),
                    })
                    .returning(UserEntity::as_returning())
                    .get_result(tx)
                    .await
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DieselErrorKind::UniqueViolation, _) => {
                            AppError::Conflict("Email already registered".to_string())
                        }
                        _ => AppError::Other(err.into()),
                    })?;

                diesel::insert_into(user_profiles::table)
                    .values(CreateUserProfileEntity {
                        user_id: user.id,
                        first_name: body.first_name,
                        last_name: body.last_name,
                    })
                    .execute(tx)
                    .await
                    .context("Failed to create user profile")?;

                let doctor = match body.doctor {
                    Some(details) if body.role == "doctor" => {
                        let doctor: DoctorEntity = diesel::insert_into(doctors::table)
                            .values(CreateDoctorEntity {
                                user_id: user.id,
                                specialization: details.specialization,
                                department: details.department,
                                license_number: details.license_number,
                                consultation_fee: details.consultation_fee,
                            })
                            .returning(DoctorEntity::as_returning())
                            .get_result(tx)
                            .await
                            .map_err(|err| match err {
                                DieselError::DatabaseError(
                                    DieselErrorKind::UniqueViolation,
                                    _,
                                ) => AppError::Conflict(
                                    "License number already registered".to_string(),
                                ),
                                _ => AppError::Other(err.into()),
                            })?;
                        Some(doctor)
                    }
                    _ => None,
                };

                Ok::<(UserEntity, Option<DoctorEntity>), AppError>((user, doctor))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(CreateStaffRes { user, doctor }),
        message: Some("Created staff account successfully"),
    })
}
