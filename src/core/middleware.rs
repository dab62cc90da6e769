use anyhow::Context;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::Next,
    response::Response,
};
use diesel_async::RunQueryDsl;
use diesel::QueryDsl;

use crate::{
    core::{
        app_error::AppError,
        app_state::AppState,
        auth::{self, Role},
    },
    models::UserEntity,
    schema::users,
};

/// Identity resolved for the current request. Role and status come from the
/// fresh user row, not from token claims, so revocation applies immediately.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i32,
    pub role: Role,
}

fn extract_session_cookie(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name == auth::SESSION_COOKIE).then(|| value.to_string())
    })
}

/// The shared pipeline: cookie -> token verification -> user re-load ->
/// status and session check -> role allow-list.
async fn authorize(
    state: &AppState,
    headers: &HeaderMap,
    allowed: &[Role],
) -> Result<AuthUser, AppError> {
    let token = extract_session_cookie(headers).ok_or(AppError::Unauthorized)?;
    let claims = auth::verify_token(&state.config.auth.token_secret, &token)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let user: UserEntity = users::table
        .find(claims.sub)
        .get_result(conn)
        .await
        .map_err(|_| AppError::Unauthorized)?;

    if user.status != "active" || user.session_token != Some(claims.jti) {
        return Err(AppError::Unauthorized);
    }

    let role = Role::from_str(&user.role).ok_or(AppError::Unauthorized)?;
    if !allowed.contains(&role) {
        return Err(AppError::ForbiddenResource(
            "You do not have permission to access this resource".to_string(),
        ));
    }

    Ok(AuthUser { id: user.id, role })
}

macro_rules! role_authorization {
    ($name:ident, $allowed:expr) => {
        pub async fn $name(
            State(state): State<AppState>,
            mut req: Request,
            next: Next,
        ) -> Result<Response, AppError> {
            let user = authorize(&state, req.headers(), $allowed).await?;
            req.extensions_mut().insert(user);
            Ok(next.run(req).await)
        }
    };
}

role_authorization!(patients_authorization, &[Role::Patient]);
role_authorization!(doctors_authorization, &[Role::Doctor]);
role_authorization!(nurses_authorization, &[Role::Nurse]);
role_authorization!(pharmacists_authorization, &[Role::Pharmacist]);
role_authorization!(lab_technicians_authorization, &[Role::LabTechnician]);
role_authorization!(admins_authorization, &[Role::Admin, Role::SuperAdmin]);
role_authorization!(
    users_authorization,
    &[
        Role::Patient,
        Role::Doctor,
        Role::Nurse,
        Role::Pharmacist,
        Role::LabTechnician,
        Role::Admin,
        Role::SuperAdmin,
    ]
);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; portal_session=abc.def.ghi; lang=en"),
        );
        assert_eq!(
            extract_session_cookie(&headers),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn missing_cookie_yields_none() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_cookie(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(extract_session_cookie(&headers), None);
    }
}
