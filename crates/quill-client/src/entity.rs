//! Entities the store mirrors, and the placeholder ids used for them before
//! the server has confirmed a create.

use chrono::Utc;
use quill_core::domain::slugify;
use quill_shared::dto::{
    CategoryResponse, CreateCategoryRequest, CreatePostRequest, PostResponse,
    UpdateCategoryRequest, UpdatePostRequest,
};
use uuid::Uuid;

use crate::store::{CollectionKind, StoreState};

/// Reserved prefix of locally generated ids. Server ids are bare UUIDs.
pub const TEMP_ID_PREFIX: &str = "tmp-";

pub(crate) fn temporary_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

pub fn is_temporary_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// A record kind held in one of the store's collections.
pub trait Resource: Clone + Send + Sync + 'static {
    /// Payload used to create one.
    type Draft: Send + Sync;
    /// Partial update payload.
    type Patch: Send + Sync;

    const KIND: CollectionKind;

    fn id(&self) -> &str;

    /// Local stand-in shown until the server answers the create.
    fn speculative(id: String, draft: &Self::Draft, author: Option<&str>) -> Self;

    fn apply_patch(&mut self, patch: &Self::Patch);

    fn collection_mut(state: &mut StoreState) -> &mut Vec<Self>;
}

impl Resource for PostResponse {
    type Draft = CreatePostRequest;
    type Patch = UpdatePostRequest;

    const KIND: CollectionKind = CollectionKind::Posts;

    fn id(&self) -> &str {
        &self.id
    }

    fn speculative(id: String, draft: &CreatePostRequest, author: Option<&str>) -> Self {
        let title = draft.title.trim().to_string();
        Self {
            id,
            slug: slugify(&title),
            title,
            content: draft.content.trim().to_string(),
            author_id: author.unwrap_or_default().to_string(),
            category_id: draft.category_id.clone(),
            published: draft.published,
            featured_image: draft.featured_image.clone(),
            created_at: Utc::now(),
        }
    }

    // The slug is fixed at creation, a new title does not change it.
    fn apply_patch(&mut self, patch: &UpdatePostRequest) {
        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(content) = &patch.content {
            self.content = content.trim().to_string();
        }
        if let Some(category_id) = &patch.category_id {
            self.category_id = category_id.clone();
        }
        if let Some(path) = &patch.featured_image {
            self.featured_image = Some(path.clone());
        }
    }

    fn collection_mut(state: &mut StoreState) -> &mut Vec<Self> {
        &mut state.posts
    }
}

impl Resource for CategoryResponse {
    type Draft = CreateCategoryRequest;
    type Patch = UpdateCategoryRequest;

    const KIND: CollectionKind = CollectionKind::Categories;

    fn id(&self) -> &str {
        &self.id
    }

    fn speculative(id: String, draft: &CreateCategoryRequest, _author: Option<&str>) -> Self {
        Self {
            id,
            name: draft.name.trim().to_string(),
        }
    }

    fn apply_patch(&mut self, patch: &UpdateCategoryRequest) {
        if let Some(name) = &patch.name {
            self.name = name.trim().to_string();
        }
    }

    fn collection_mut(state: &mut StoreState) -> &mut Vec<Self> {
        &mut state.categories
    }
}
