//! Category handlers. Any signed-in author may manage categories.

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::Category;
use quill_core::domain::validation::{self, Validator};
use quill_core::ports::{BaseRepository, CategoryRepository, PostRepository};
use quill_shared::ApiResponse;
use quill_shared::dto::{CategoryResponse, CreateCategoryRequest, UpdateCategoryRequest};

use super::parse_path_id;
use crate::middleware::auth::Identity;
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn category_response(category: &Category) -> CategoryResponse {
    CategoryResponse {
        id: category.id.to_string(),
        name: category.name.clone(),
    }
}

async fn find_category(state: &AppState, raw_id: &str) -> AppResult<Category> {
    let id = parse_path_id("category", raw_id)?;
    state
        .categories
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("category", id))
}

/// Names are unique regardless of case; `except` is the category being renamed.
async fn ensure_unique_name(state: &AppState, name: &str, except: Option<Uuid>) -> AppResult<()> {
    match state.categories.find_by_name(name.trim()).await? {
        Some(existing) if Some(existing.id) != except => Err(AppError::Conflict(format!(
            "Category '{}' already exists",
            existing.name
        ))),
        _ => Ok(()),
    }
}

/// GET /api/categories
pub async fn list_categories(state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let categories: Vec<CategoryResponse> = state
        .categories
        .find_all()
        .await?
        .iter()
        .map(category_response)
        .collect();

    Ok(HttpResponse::Ok().json(categories))
}

/// POST /api/categories
pub async fn create_category(
    state: web::Data<AppState>,
    _identity: Identity,
    body: web::Json<CreateCategoryRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut v = Validator::new();
    validation::category_name(&mut v, &req.name);
    v.finish()?;
    ensure_unique_name(&state, &req.name, None).await?;

    let category = state.categories.insert(Category::new(req.name)).await?;
    tracing::info!(category_id = %category.id, name = %category.name, "Category created");

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        category_response(&category),
        "Category created",
    )))
}

/// PUT /api/categories/{id}
pub async fn update_category(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<String>,
    body: web::Json<UpdateCategoryRequest>,
) -> AppResult<HttpResponse> {
    let mut category = find_category(&state, &path).await?;

    if let Some(name) = body.into_inner().name {
        let mut v = Validator::new();
        validation::category_name(&mut v, &name);
        v.finish()?;

        if category.name != name.trim() {
            ensure_unique_name(&state, &name, Some(category.id)).await?;
            category.name = name.trim().to_string();
            category = state.categories.update(category).await?;
            tracing::info!(category_id = %category.id, name = %category.name, "Category renamed");
        }
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        category_response(&category),
        "Category updated",
    )))
}

/// DELETE /api/categories/{id}
///
/// Refused with 409 while any post is still filed under the category.
pub async fn delete_category(
    state: web::Data<AppState>,
    _identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let category = find_category(&state, &path).await?;

    let in_use = state.posts.find_by_category(category.id).await?.len();
    if in_use > 0 {
        return Err(AppError::Conflict(format!(
            "Category '{}' is still used by {in_use} post(s)",
            category.name
        )));
    }

    state.categories.delete(category.id).await?;
    tracing::info!(category_id = %category.id, "Category deleted");

    Ok(HttpResponse::Ok().json(ApiResponse::message("Category deleted")))
}
