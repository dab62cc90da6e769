use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use diesel::{ExpressionMethods, QueryDsl, SelectableHelper};
use diesel_async::RunQueryDsl;
use serde::Deserialize;
use utoipa::ToSchema;
use utoipa_axum::router::OpenApiRouter;

use crate::{
    core::{
        aliases::{DieselError, DieselErrorKind},
        app_error::{AppError, StdResponse},
        app_state::AppState,
        middleware::{self, AuthUser},
    },
    models::{BlogEntity, CreateBlogEntity, UpdateBlogEntity},
    schema::blogs,
};

pub fn routes_with_openapi(state: AppState) -> OpenApiRouter<AppState> {
    OpenApiRouter::new().nest(
        "/api/admins/blogs",
        OpenApiRouter::new()
            .routes(utoipa_axum::routes!(get_blogs))
            .routes(utoipa_axum::routes!(create_blog))
            .routes(utoipa_axum::routes!(get_blog))
            .routes(utoipa_axum::routes!(update_blog))
            .routes(utoipa_axum::routes!(delete_blog))
            .route_layer(axum::middleware::from_fn_with_state(
                state,
                middleware::admins_authorization,
            )),
    )
}

fn validate_slug(slug: &str) -> Result<(), AppError> {
    let chars_ok = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if slug.is_empty() || !chars_ok || slug.starts_with('-') || slug.ends_with('-') {
        return Err(AppError::BadRequest(
            "Slug must be lowercase alphanumeric words separated by hyphens".to_string(),
        ));
    }
    Ok(())
}

fn validate_status(status: &str) -> Result<(), AppError> {
    if !matches!(status, "draft" | "published") {
        return Err(AppError::BadRequest(
            "Status must be 'draft' or 'published'".to_string(),
        ));
    }
    Ok(())
}

/// `published_at` is stamped exactly once: on the first transition into
/// 'published'. Re-saving an already published post keeps the original time.
fn should_stamp_published(current_status: &str, new_status: Option<&str>) -> bool {
    new_status == Some("published") && current_status != "published"
}

/// All posts, any status, newest first.
#[utoipa::path(
    get,
    path = "/",
    tags = ["Blogs"],
    security(("cookieAuth" = [])),
    responses(
        (status = 200, description = "List blogs", body = StdResponse<Vec<BlogEntity>, String>)
    )
)]
async fn get_blogs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let blogs: Vec<BlogEntity> = blogs::table
        .order_by(blogs::created_at.desc())
        .get_results(conn)
        .await
        .context("Failed to get blogs")?;

    Ok(StdResponse {
        data: Some(blogs),
        message: Some("Get blogs successfully"),
    })
}

#[derive(Deserialize, ToSchema)]
struct CreateBlogReq {
    title: String,
    slug: String,
    excerpt: Option<String>,
    content: String,
    category: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    status: Option<String>,
}

/// Create a post. A duplicate slug is a 400 with a specific message.
#[utoipa::path(
    post,
    path = "/",
    tags = ["Blogs"],
    security(("cookieAuth" = [])),
    request_body = CreateBlogReq,
    responses(
        (status = 200, description = "Created blog successfully", body = StdResponse<BlogEntity, String>),
        (status = 400, description = "Validation failure or duplicate slug")
    )
)]
async fn create_blog(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(body): Json<CreateBlogReq>,
) -> Result<impl IntoResponse, AppError> {
    if body.title.trim().is_empty() || body.content.trim().is_empty() {
        return Err(AppError::BadRequest(
            "Title and content are required".to_string(),
        ));
    }
    validate_slug(&body.slug)?;
    let status = body.status.unwrap_or("draft".to_string());
    validate_status(&status)?;

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let blog: BlogEntity = diesel::insert_into(blogs::table)
        .values(CreateBlogEntity {
            author_id: user.id,
            title: body.title,
            slug: body.slug,
            excerpt: body.excerpt,
            content: body.content,
            category: body.category,
            tags: body.tags,
            published_at: (status == "published").then(Utc::now),
            status,
        })
        .returning(BlogEntity::as_returning())
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::DatabaseError(DieselErrorKind::UniqueViolation, _) => {
                AppError::Conflict("Slug already exists".to_string())
            }
            _ => AppError::Other(err.into()),
        })?;

    Ok(StdResponse {
        data: Some(blog),
        message: Some("Created blog successfully"),
    })
}

/// Fetch one post by id, any status.
#[utoipa::path(
    get,
    path = "/{id}",
    tags = ["Blogs"],
    security(("cookieAuth" = [])),
    params(
        ("id" = i32, Path, description = "Blog ID to fetch")
    ),
    responses(
        (status = 200, description = "Get blog successfully", body = StdResponse<BlogEntity, String>)
    )
)]
async fn get_blog(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let blog: BlogEntity = blogs::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    Ok(StdResponse {
        data: Some(blog),
        message: Some("Get blog successfully"),
    })
}

/// Partial update. Only supplied fields change; publishing stamps
/// `published_at` once.
#[utoipa::path(
    patch,
    path = "/{id}",
    tags = ["Blogs"],
    security(("cookieAuth" = [])),
    params(
        ("id" = i32, Path, description = "Blog ID to update")
    ),
    request_body = UpdateBlogEntity,
    responses(
        (status = 200, description = "Updated blog successfully", body = StdResponse<BlogEntity, String>)
    )
)]
async fn update_blog(
    Path(id): Path<i32>,
    State(state): State<AppState>,
    Json(body): Json<UpdateBlogEntity>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(slug) = &body.slug {
        validate_slug(slug)?;
    }
    if let Some(status) = &body.status {
        validate_status(status)?;
    }

    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let blog: BlogEntity = blogs::table
        .find(id)
        .get_result(conn)
        .await
        .map_err(|err| match err {
            DieselError::NotFound => AppError::NotFound,
            _ => AppError::Other(err.into()),
        })?;

    let map_unique = |err: DieselError| match err {
        DieselError::DatabaseError(DieselErrorKind::UniqueViolation, _) => {
            AppError::Conflict("Slug already exists".to_string())
        }
        _ => AppError::Other(err.into()),
    };

    let updated: BlogEntity = if should_stamp_published(&blog.status, body.status.as_deref()) {
        diesel::update(blogs::table.find(blog.id))
            .set((
                &body,
                blogs::published_at.eq(Some(Utc::now())),
                blogs::updated_at.eq(diesel::dsl::now),
            ))
            .returning(BlogEntity::as_returning())
            .get_result(conn)
            .await
            .map_err(map_unique)?
    } else {
        diesel::update(blogs::table.find(blog.id))
            .set((&body, blogs::updated_at.eq(diesel::dsl::now)))
            .returning(BlogEntity::as_returning())
            .get_result(conn)
            .await
            .map_err(map_unique)?
    };

    Ok(StdResponse {
        data: Some(updated),
        message: Some("Updated blog successfully"),
    })
}

/// Remove a post.
#[utoipa::path(
    delete,
    path = "/{id}",
    tags = ["Blogs"],
    security(("cookieAuth" = [])),
    params(
        ("id" = i32, Path, description = "Blog ID to delete")
    ),
    responses(
        (status = 200, description = "Deleted blog successfully", body = StdResponse<BlogEntity, String>)
    )
)]
async fn delete_blog(
    Path(id): Path<i32>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let conn = &mut state
        .db_pool
        .get()
        .await
        .context("Failed to obtain a DB connection pool")?;

    let blog = diesel::delete(blogs::table.find(id))
        .returning(BlogEntity::as_returning())
        .get_result(conn)
        .await;

    match blog {
        Ok(blog) => Ok(StdResponse {
            data: Some(blog),
            message: Some("Deleted blog successfully"),
        }),
        Err(err) => match err {
            DieselError::NotFound => Err(AppError::NotFound),
            _ => Err(AppError::Other(err.into())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("flu-season-tips", true)]
    #[test_case("2026-vaccine-update", true)]
    #[test_case("", false; "empty")]
    #[test_case("Flu-Season", false; "uppercase")]
    #[test_case("flu season", false; "space")]
    #[test_case("-leading", false)]
    #[test_case("trailing-", false)]
    fn slug_validation(slug: &str, ok: bool) {
        assert_eq!(validate_slug(slug).is_ok(), ok);
    }

    #[test]
    fn publish_stamp_happens_exactly_once() {
        assert!(should_stamp_published("draft", Some("published")));
        assert!(!should_stamp_published("published", Some("published")));
        assert!(!should_stamp_published("draft", Some("draft")));
        assert!(!should_stamp_published("draft", None));
        assert!(!should_stamp_published("published", None));
    }
}
