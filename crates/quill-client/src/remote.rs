//! The API surface the store depends on.

use async_trait::async_trait;
use quill_shared::dto::{
    CategoryResponse, CreateCategoryRequest, CreatePostRequest, PostResponse,
    UpdateCategoryRequest, UpdatePostRequest,
};

use crate::error::RemoteError;

/// Remote resource service for posts and categories.
///
/// Every call either yields the persisted entity (as the server now sees it)
/// or a [`RemoteError`]. Forbidden, not-found and validation failures are
/// distinct variants.
#[async_trait]
pub trait RemoteResources: Send + Sync {
    async fn list_posts(&self) -> Result<Vec<PostResponse>, RemoteError>;

    async fn list_categories(&self) -> Result<Vec<CategoryResponse>, RemoteError>;

    async fn get_post(&self, id: &str) -> Result<PostResponse, RemoteError>;

    async fn create_post(&self, draft: &CreatePostRequest) -> Result<PostResponse, RemoteError>;

    async fn update_post(
        &self,
        id: &str,
        patch: &UpdatePostRequest,
    ) -> Result<PostResponse, RemoteError>;

    /// Move a post to the given publication state. Idempotent.
    async fn set_published(&self, id: &str, published: bool) -> Result<PostResponse, RemoteError>;

    async fn delete_post(&self, id: &str) -> Result<(), RemoteError>;

    async fn create_category(
        &self,
        draft: &CreateCategoryRequest,
    ) -> Result<CategoryResponse, RemoteError>;

    async fn update_category(
        &self,
        id: &str,
        patch: &UpdateCategoryRequest,
    ) -> Result<CategoryResponse, RemoteError>;

    async fn delete_category(&self, id: &str) -> Result<(), RemoteError>;
}
