//! Post handlers.
//!
//! Reads go through the publication gate: drafts are only returned to their
//! author. Writes resolve the post first (404), then check authorship (403),
//! then validate the payload (400).

use actix_web::{HttpResponse, web};
use uuid::Uuid;

use quill_core::domain::validation::{self, Validator};
use quill_core::domain::{Post, PostChanges};
use quill_core::ports::{BaseRepository, PostRepository};
use quill_shared::ApiResponse;
use quill_shared::dto::{
    CreatePostRequest, PostListQuery, PostResponse, PublishRequest, UpdatePostRequest,
};

use super::parse_path_id;
use crate::middleware::auth::{Identity, OptionalIdentity};
use crate::middleware::error::{AppError, AppResult};
use crate::state::AppState;

fn post_response(post: &Post) -> PostResponse {
    PostResponse {
        id: post.id.to_string(),
        title: post.title.clone(),
        content: post.content.clone(),
        slug: post.slug.clone(),
        author_id: post.author_id.to_string(),
        category_id: post.category_id.to_string(),
        published: post.published,
        featured_image: post.featured_image.clone(),
        created_at: post.created_at,
    }
}

async fn find_post(state: &AppState, raw_id: &str) -> AppResult<Post> {
    let id = parse_path_id("post", raw_id)?;
    state
        .posts
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::not_found("post", id))
}

/// Resolve a category reference from a request body, recording a field error
/// when it is malformed or unknown.
async fn check_category(state: &AppState, v: &mut Validator, raw: &str) -> AppResult<Option<Uuid>> {
    let Ok(id) = Uuid::parse_str(raw.trim()) else {
        v.push("category_id", "Category must be a valid id");
        return Ok(None);
    };

    if state.categories.find_by_id(id).await?.is_none() {
        v.push("category_id", "Category does not exist");
        return Ok(None);
    }
    Ok(Some(id))
}

fn check_featured_image(v: &mut Validator, path: Option<&str>) {
    if path.is_some_and(|p| p.trim().is_empty()) {
        v.push("featured_image", "Featured image path cannot be empty");
    }
}

/// GET /api/posts
pub async fn list_posts(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    query: web::Query<PostListQuery>,
) -> AppResult<HttpResponse> {
    let posts = match query.category.as_deref() {
        Some(raw) => {
            let category_id = Uuid::parse_str(raw)
                .map_err(|_| AppError::BadRequest(format!("Invalid category filter: {raw}")))?;
            state.posts.find_by_category(category_id).await?
        }
        None => state.posts.find_all().await?,
    };

    let requester = identity.user_id();
    let visible: Vec<PostResponse> = posts
        .iter()
        .filter(|p| p.is_visible_to(requester))
        .map(post_response)
        .collect();

    Ok(HttpResponse::Ok().json(visible))
}

/// GET /api/posts/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    identity: OptionalIdentity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, &path).await?;
    post.authorize_read(identity.user_id())?;

    Ok(HttpResponse::Ok().json(post_response(&post)))
}

/// POST /api/posts
pub async fn create_post(
    state: web::Data<AppState>,
    identity: Identity,
    body: web::Json<CreatePostRequest>,
) -> AppResult<HttpResponse> {
    let req = body.into_inner();

    let mut v = Validator::new();
    validation::post_title(&mut v, &req.title);
    validation::post_content(&mut v, &req.content);
    check_featured_image(&mut v, req.featured_image.as_deref());
    let category_id = check_category(&state, &mut v, &req.category_id).await?;
    v.finish()?;
    let Some(category_id) = category_id else {
        return Err(AppError::Internal("category resolved without id".to_string()));
    };

    let mut post = Post::new(identity.user_id, category_id, req.title, req.content)
        .with_featured_image(req.featured_image.map(|p| p.trim().to_string()));
    post.set_published(req.published);

    let post = state.posts.insert(post).await?;
    tracing::info!(post_id = %post.id, author_id = %post.author_id, slug = %post.slug, "Post created");

    Ok(HttpResponse::Created().json(ApiResponse::ok_with_message(
        post_response(&post),
        "Post created",
    )))
}

/// PUT /api/posts/{id}
pub async fn update_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<UpdatePostRequest>,
) -> AppResult<HttpResponse> {
    let mut post = find_post(&state, &path).await?;
    post.authorize_write(identity.user_id)?;

    let req = body.into_inner();
    let mut v = Validator::new();
    if let Some(title) = &req.title {
        validation::post_title(&mut v, title);
    }
    if let Some(content) = &req.content {
        validation::post_content(&mut v, content);
    }
    check_featured_image(&mut v, req.featured_image.as_deref());
    let category_id = match &req.category_id {
        Some(raw) => check_category(&state, &mut v, raw).await?,
        None => None,
    };
    v.finish()?;

    let changed = post.apply(PostChanges {
        title: req.title,
        content: req.content,
        category_id,
        featured_image: req.featured_image.map(|p| p.trim().to_string()),
    });
    if changed {
        post = state.posts.update(post).await?;
        tracing::info!(post_id = %post.id, "Post updated");
    }

    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(
        post_response(&post),
        "Post updated",
    )))
}

/// DELETE /api/posts/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
) -> AppResult<HttpResponse> {
    let post = find_post(&state, &path).await?;
    post.authorize_write(identity.user_id)?;

    state.posts.delete(post.id).await?;
    tracing::info!(post_id = %post.id, "Post deleted");

    Ok(HttpResponse::Ok().json(ApiResponse::message("Post deleted")))
}

/// PATCH /api/posts/{id}/publish
///
/// Idempotent: asking for the state the post is already in succeeds without
/// touching storage.
pub async fn set_published(
    state: web::Data<AppState>,
    identity: Identity,
    path: web::Path<String>,
    body: web::Json<PublishRequest>,
) -> AppResult<HttpResponse> {
    let mut post = find_post(&state, &path).await?;
    post.authorize_write(identity.user_id)?;

    if post.set_published(body.published) {
        post = state.posts.update(post).await?;
        tracing::info!(post_id = %post.id, published = post.published, "Publication state changed");
    }

    let message = if post.published {
        "Post published"
    } else {
        "Post unpublished"
    };
    Ok(HttpResponse::Ok().json(ApiResponse::ok_with_message(post_response(&post), message)))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use quill_core::ports::BaseRepository;
    use serde_json::json;

    use crate::handlers::testing::{TestContext, json_body};

    #[actix_rt::test]
    async fn test_create_post_returns_draft_with_slug() {
        let ctx = TestContext::new();
        let (ada, token) = ctx.author("Ada").await;
        let rust = ctx.category("Rust").await;
        let app = test_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(("Authorization", token))
                .set_json(json!({
                    "title": "Hello,   World!",
                    "content": "First post",
                    "category_id": rust.id.to_string(),
                }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::CREATED);
        let json = json_body(res).await;
        assert_eq!(json["message"], "Post created");
        assert_eq!(json["data"]["slug"], "hello-world");
        assert_eq!(json["data"]["published"], false);
        assert_eq!(json["data"]["author_id"], ada.id.to_string());
    }

    #[actix_rt::test]
    async fn test_create_post_with_empty_title_names_field() {
        let ctx = TestContext::new();
        let (_, token) = ctx.author("Ada").await;
        let rust = ctx.category("Rust").await;
        let app = test_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(("Authorization", token))
                .set_json(json!({
                    "title": "",
                    "content": "Body",
                    "category_id": rust.id.to_string(),
                }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let json = json_body(res).await;
        assert_eq!(json["errors"][0]["field"], "title");
        assert_eq!(json["errors"].as_array().unwrap().len(), 1);
    }

    #[actix_rt::test]
    async fn test_create_post_rejects_unknown_category() {
        let ctx = TestContext::new();
        let (_, token) = ctx.author("Ada").await;
        let app = test_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/posts")
                .insert_header(("Authorization", token))
                .set_json(json!({
                    "title": "Orphan",
                    "content": "Body",
                    "category_id": uuid::Uuid::new_v4().to_string(),
                }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(res).await["errors"][0]["field"], "category_id");
    }

    #[actix_rt::test]
    async fn test_create_post_requires_token() {
        let ctx = TestContext::new();
        let app = test_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::post()
                .uri("/api/posts")
                .set_json(json!({ "title": "t", "content": "c", "category_id": "x" }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_draft_visible_to_author_only() {
        let ctx = TestContext::new();
        let (ada, ada_token) = ctx.author("Ada").await;
        let (_, bob_token) = ctx.author("Bob").await;
        let rust = ctx.category("Rust").await;
        let draft = ctx.post(&ada, &rust, false).await;
        let app = test_app!(ctx);
        let uri = format!("/api/posts/{}", draft.id);

        let as_author = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(("Authorization", ada_token))
                .to_request(),
        )
        .await;
        let as_other = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&uri)
                .insert_header(("Authorization", bob_token))
                .to_request(),
        )
        .await;
        let anonymous =
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;

        assert_eq!(as_author.status(), StatusCode::OK);
        assert_eq!(as_other.status(), StatusCode::FORBIDDEN);
        assert_eq!(anonymous.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn test_list_hides_other_authors_drafts() {
        let ctx = TestContext::new();
        let (ada, ada_token) = ctx.author("Ada").await;
        let (bob, _) = ctx.author("Bob").await;
        let rust = ctx.category("Rust").await;
        ctx.post(&ada, &rust, true).await;
        ctx.post(&ada, &rust, false).await;
        ctx.post(&bob, &rust, false).await;
        let app = test_app!(ctx);

        let anonymous = json_body(
            test::call_service(&app, test::TestRequest::get().uri("/api/posts").to_request())
                .await,
        )
        .await;
        let as_ada = json_body(
            test::call_service(
                &app,
                test::TestRequest::get()
                    .uri("/api/posts")
                    .insert_header(("Authorization", ada_token))
                    .to_request(),
            )
            .await,
        )
        .await;

        assert_eq!(anonymous.as_array().unwrap().len(), 1);
        assert_eq!(as_ada.as_array().unwrap().len(), 2);
    }

    #[actix_rt::test]
    async fn test_list_filters_by_category() {
        let ctx = TestContext::new();
        let (ada, _) = ctx.author("Ada").await;
        let rust = ctx.category("Rust").await;
        let go = ctx.category("Go").await;
        ctx.post(&ada, &rust, true).await;
        ctx.post(&ada, &go, true).await;
        let app = test_app!(ctx);

        let filtered = json_body(
            test::call_service(
                &app,
                test::TestRequest::get()
                    .uri(&format!("/api/posts?category={}", go.id))
                    .to_request(),
            )
            .await,
        )
        .await;
        let bad = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/api/posts?category=not-an-id")
                .to_request(),
        )
        .await;

        assert_eq!(filtered.as_array().unwrap().len(), 1);
        assert_eq!(filtered[0]["category_id"], go.id.to_string());
        assert_eq!(bad.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_other_author_cannot_delete() {
        let ctx = TestContext::new();
        let (ada, _) = ctx.author("Ada").await;
        let (_, bob_token) = ctx.author("Bob").await;
        let rust = ctx.category("Rust").await;
        let post = ctx.post(&ada, &rust, true).await;
        let app = test_app!(ctx);
        let uri = format!("/api/posts/{}", post.id);

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri(&uri)
                .insert_header(("Authorization", bob_token))
                .to_request(),
        )
        .await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let still_there =
            test::call_service(&app, test::TestRequest::get().uri(&uri).to_request()).await;
        assert_eq!(still_there.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_author_deletes_post() {
        let ctx = TestContext::new();
        let (ada, token) = ctx.author("Ada").await;
        let rust = ctx.category("Rust").await;
        let post = ctx.post(&ada, &rust, true).await;
        let state = ctx.state.clone();
        let app = test_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::delete()
                .uri(&format!("/api/posts/{}", post.id))
                .insert_header(("Authorization", token))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        assert!(state.posts.find_by_id(post.id).await.unwrap().is_none());
    }

    #[actix_rt::test]
    async fn test_write_checks_run_404_then_403_then_400() {
        let ctx = TestContext::new();
        let (ada, ada_token) = ctx.author("Ada").await;
        let (_, bob_token) = ctx.author("Bob").await;
        let rust = ctx.category("Rust").await;
        let post = ctx.post(&ada, &rust, true).await;
        let app = test_app!(ctx);
        let invalid = json!({ "title": "" });

        let missing = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&format!("/api/posts/{}", uuid::Uuid::new_v4()))
                .insert_header(("Authorization", bob_token.clone()))
                .set_json(&invalid)
                .to_request(),
        )
        .await;
        let not_author = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&format!("/api/posts/{}", post.id))
                .insert_header(("Authorization", bob_token))
                .set_json(&invalid)
                .to_request(),
        )
        .await;

        let author = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&format!("/api/posts/{}", post.id))
                .insert_header(("Authorization", ada_token))
                .set_json(&invalid)
                .to_request(),
        )
        .await;

        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
        assert_eq!(not_author.status(), StatusCode::FORBIDDEN);
        assert_eq!(author.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_rt::test]
    async fn test_update_keeps_slug() {
        let ctx = TestContext::new();
        let (ada, token) = ctx.author("Ada").await;
        let rust = ctx.category("Rust").await;
        let post = ctx.post(&ada, &rust, false).await;
        let app = test_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::put()
                .uri(&format!("/api/posts/{}", post.id))
                .insert_header(("Authorization", token))
                .set_json(json!({ "title": "A brand new title" }))
                .to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::OK);
        let json = json_body(res).await;
        assert_eq!(json["data"]["title"], "A brand new title");
        assert_eq!(json["data"]["slug"], post.slug);
    }

    #[actix_rt::test]
    async fn test_publish_toggle_is_idempotent() {
        let ctx = TestContext::new();
        let (ada, token) = ctx.author("Ada").await;
        let rust = ctx.category("Rust").await;
        let post = ctx.post(&ada, &rust, false).await;
        let app = test_app!(ctx);
        let uri = format!("/api/posts/{}/publish", post.id);

        for _ in 0..2 {
            let res = test::call_service(
                &app,
                test::TestRequest::patch()
                    .uri(&uri)
                    .insert_header(("Authorization", token.clone()))
                    .set_json(json!({ "published": true }))
                    .to_request(),
            )
            .await;

            assert_eq!(res.status(), StatusCode::OK);
            let json = json_body(res).await;
            assert_eq!(json["data"]["published"], true);
            assert_eq!(json["message"], "Post published");
        }

        let public = test::call_service(
            &app,
            test::TestRequest::get()
                .uri(&format!("/api/posts/{}", post.id))
                .to_request(),
        )
        .await;
        assert_eq!(public.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_non_uuid_path_is_not_found() {
        let ctx = TestContext::new();
        let app = test_app!(ctx);

        let res = test::call_service(
            &app,
            test::TestRequest::get().uri("/api/posts/tmp-123").to_request(),
        )
        .await;

        assert_eq!(res.status(), StatusCode::NOT_FOUND);
    }
}
