use anyhow::Context;
use axum::{
    Extension, Json,
    extract::State,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, SelectableHelper};
use diesel_async::{AsyncConnection, RunQueryDsl};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;
use uuid::Uuid;

use crate::{
    core::{
        aliases::{DieselError, DieselErrorKind},
        app_error::{AppError, StdResponse},
        app_state::AppState,
        auth::{self, Claims},
        middleware::{self, AuthUser},
    },
    models::{
        CreatePatientEntity, CreateUserEntity, CreateUserProfileEntity, PatientEntity, UserEntity,
        UserProfileEntity,
    },
    schema::{patients, user_profiles, users},
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    let protected = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(logout))
        .routes(utoipa_axum::routes!(me))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::users_authorization,
        ));

    let public = OpenApiRouter::new()
        .routes(utoipa_axum::routes!(register))
        .routes(utoipa_axum::routes!(login));

    OpenApiRouter::new().nest("/api/auth", public.merge(protected))
}

fn validate_email(email: &str) -> Result<(), AppError> {
    let valid = email
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
    if !valid {
        return Err(AppError::BadRequest("Invalid email address".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.len() < 8 {
        return Err(AppError::BadRequest(
            "Password must be at least 8 characters".to_string(),
        ));
    }
    Ok(())
}

#[derive(Deserialize, ToSchema)]
struct RegisterReq {
    email: String,
    password: String,
    first_name: Option<String>,
    last_name: Option<String>,
}

#[derive(Serialize, ToSchema)]
struct RegisterRes {
    user: UserEntity,
    patient: PatientEntity,
}

/// Register a patient account. Staff accounts are provisioned by admins.
#[utoipa::path(
    post,
    path = "/register",
    tags = ["Auth"],
    request_body = RegisterReq,
    responses(
        (status = 200, description = "Registered successfully", body = StdResponse<RegisterRes, String>)
    )
)]
async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterReq>,
) -> Result<impl IntoResponse, AppError> {
    validate_email(&body.email)?;
    validate_password(&body.password)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let (user, patient) = conn
        .transaction(move |tx| {
            Box::pin(async move {
                let user: UserEntity = diesel::insert_into(users::table)
                    .values(CreateUserEntity {
                        email: body.email,
                        password_hash: auth::hash_password(&body.password),
                        role: "patient".to_string(),
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

                let patient: PatientEntity = diesel::insert_into(patients::table)
                    .values(CreatePatientEntity {
                        user_id: user.id,
                        medical_record_number: format!("MRN-{:08X}", rand::random::<u32>()),
                    })
                    .returning(PatientEntity::as_returning())
                    .get_result(tx)
                    .await
                    .context("Failed to create patient record")?;

                Ok::<(UserEntity, PatientEntity), AppError>((user, patient))
            })
        })
        .await?;

    Ok(StdResponse {
        data: Some(RegisterRes { user, patient }),
        message: Some("Registered successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct LoginReq {
    email: String,
    password: String,
}

#[derive(Serialize, ToSchema)]
struct LoginRes {
    id: i32,
    email: String,
    role: String,
}

/// Log in and receive the session cookie. Rotates the session token, so any
/// previously issued cookie for this user stops verifying.
#[utoipa::path(
    post,
    path = "/login",
    tags = ["Auth"],
    request_body = LoginReq,
    responses(
        (status = 200, description = "Logged in successfully", body = StdResponse<LoginRes, String>),
        (status = 401, description = "Invalid credentials")
    )
)]
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginReq>,
) -> Result<Response, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table
        .filter(users::email.eq(&body.email))
        .get_result(conn)
        .await
        .map_err(|_| AppError::Unauthorized)?;

    if user.status != "active" || !auth::verify_password(&body.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let jti = Uuid::new_v4();
    diesel::update(users::table.find(user.id))
        .set((
            users::session_token.eq(Some(jti)),
            users::updated_at.eq(diesel::dsl::now),
        ))
        .execute(conn)
        .await
        .context("Failed to rotate session token")?;

    let claims = Claims::new(user.id, jti, state.config.auth.token_ttl_hours);
    let token = auth::create_token(&state.config.auth.token_secret, &claims)?;
    let cookie = format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        auth::SESSION_COOKIE,
        token,
        state.config.auth.token_ttl_hours * 3600
    );

    let mut response = StdResponse {
        data: Some(LoginRes {
            id: user.id,
            email: user.email,
            role: user.role,
        }),
        message: Some("Logged in successfully"),
    }
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).context("Invalid cookie value")?,
    );

    Ok(response)
}

/// Log out: invalidate the session token and expire the cookie.
#[utoipa::path(
    post,
    path = "/logout",
    tags = ["Auth"],
    security(("cookieAuth" = [])),
    responses(
        (status = 200, description = "Logged out successfully", body = StdResponse<String, String>)
    )
)]
async fn logout(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Result<Response, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    diesel::update(users::table.find(user.id))
        .set(users::session_token.eq(None::<Uuid>))
        .execute(conn)
        .await
        .context("Failed to clear session token")?;

    let cookie = format!("{}=; HttpOnly; Path=/; Max-Age=0", auth::SESSION_COOKIE);
    let mut response = StdResponse::<String, _> {
        data: None,
        message: Some("Logged out successfully"),
    }
    .into_response();
    response.headers_mut().insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).context("Invalid cookie value")?,
    );

    Ok(response)
}

#[derive(Serialize, ToSchema)]
struct MeRes {
    user: UserEntity,
    profile: Option<UserProfileEntity>,
}

/// The server-trusted identity for the current session.
#[utoipa::path(
    get,
    path = "/me",
    tags = ["Auth"],
    security(("cookieAuth" = [])),
    responses(
        (status = 200, description = "Current identity", body = StdResponse<MeRes, String>)
    )
)]
async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table
        .find(auth_user.id)
        .get_result(conn)
        .await
        .map_err(|_| AppError::Unauthorized)?;

    let profile: Option<UserProfileEntity> = user_profiles::table
        .find(auth_user.id)
        .get_result(conn)
        .await
        .optional()
        .context("Failed to get user profile")?;

    Ok(StdResponse {
        data: Some(MeRes { user, profile }),
        message: Some("Get identity successfully"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation() {
        assert!(validate_email("a@clinic.example").is_ok());
        assert!(validate_email("missing-at.example").is_err());
        assert!(validate_email("@clinic.example").is_err());
        assert!(validate_email("a@nodot").is_err());
    }

    #[test]
    fn password_validation() {
        assert!(validate_password("longenough").is_ok());
        assert!(validate_password("short").is_err());
    }
}
