//! Optimistic state container.
//!
//! The [`Store`] keeps a local copy of the post and category collections and
//! applies every mutation to it before the server has answered:
//!
//! - **create** inserts a speculative entity under a `tmp-` id, then swaps it
//!   for the server's record, or drops it if the call fails;
//! - **edit**, **publish** and **delete** snapshot the collection, change it
//!   in place, and restore the snapshot verbatim if the call fails.
//!
//! Mutations on the same entity are not serialized. A mutation's snapshot is
//! whatever the collection held when it started, so the last response to
//! arrive wins.
//!
//! No operation returns `Err` or panics; each yields a [`MutationResult`].

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use quill_shared::dto::{
    CategoryResponse, CreateCategoryRequest, CreatePostRequest, PostResponse,
    UpdateCategoryRequest, UpdatePostRequest,
};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::config::{LoadPolicy, StoreConfig};
use crate::entity::{Resource, is_temporary_id, temporary_id};
use crate::error::RemoteError;
use crate::remote::RemoteResources;

/// Which collection an entity lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CollectionKind {
    Posts,
    Categories,
}

impl CollectionKind {
    fn singular(self) -> &'static str {
        match self {
            Self::Posts => "post",
            Self::Categories => "category",
        }
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Posts => f.write_str("posts"),
            Self::Categories => f.write_str("categories"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MutationKind {
    Create,
    Edit,
    Publish,
    Delete,
}

/// An in-flight mutation, keyed in [`StoreState::pending`] by the temporary
/// or real id it targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingMutation {
    pub collection: CollectionKind,
    pub kind: MutationKind,
    /// Monotonic per store; the newest mutation on a key owns the record.
    pub seq: u64,
    pub started_at: DateTime<Utc>,
}

/// Outcome handed back to whoever triggered an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MutationResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
        }
    }
}

/// Everything consumers can observe.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreState {
    pub posts: Vec<PostResponse>,
    pub categories: Vec<CategoryResponse>,
    pub loading: bool,
    /// Most recent load failure, and mutation failure when
    /// `record_mutation_errors` is on.
    pub error: Option<String>,
    pub pending: HashMap<String, PendingMutation>,
}

impl Default for StoreState {
    /// Empty collections, waiting for the first load.
    fn default() -> Self {
        Self {
            posts: Vec::new(),
            categories: Vec::new(),
            loading: true,
            error: None,
            pending: HashMap::new(),
        }
    }
}

/// Client-side mirror of the remote collections. Share it as `Arc<Store>`.
pub struct Store {
    remote: Arc<dyn RemoteResources>,
    config: StoreConfig,
    author: Option<String>,
    state: RwLock<StoreState>,
    seq: AtomicU64,
}

impl Store {
    pub fn new(remote: Arc<dyn RemoteResources>, config: StoreConfig) -> Self {
        Self {
            remote,
            config,
            author: None,
            state: RwLock::new(StoreState::default()),
            seq: AtomicU64::new(0),
        }
    }

    /// Attribute speculative posts to this user id until the server answers.
    pub fn with_author(mut self, author_id: impl Into<String>) -> Self {
        self.author = Some(author_id.into());
        self
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    // ---- reads ----------------------------------------------------------

    pub async fn snapshot(&self) -> StoreState {
        self.state.read().await.clone()
    }

    pub async fn posts(&self) -> Vec<PostResponse> {
        self.state.read().await.posts.clone()
    }

    pub async fn post(&self, id: &str) -> Option<PostResponse> {
        self.state
            .read()
            .await
            .posts
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub async fn categories(&self) -> Vec<CategoryResponse> {
        self.state.read().await.categories.clone()
    }

    pub async fn is_loading(&self) -> bool {
        self.state.read().await.loading
    }

    pub async fn error(&self) -> Option<String> {
        self.state.read().await.error.clone()
    }

    pub async fn pending(&self) -> HashMap<String, PendingMutation> {
        self.state.read().await.pending.clone()
    }

    pub async fn clear_error(&self) {
        self.state.write().await.error = None;
    }

    // ---- loading --------------------------------------------------------

    /// Fetch posts and categories concurrently.
    ///
    /// The loading flag is cleared whatever happens. On failure the shared
    /// error is set; which collections are replaced depends on
    /// [`LoadPolicy`].
    pub async fn load_all(&self) -> MutationResult {
        {
            let mut state = self.state.write().await;
            state.loading = true;
            state.error = None;
        }

        let (posts, categories) = tokio::join!(
            self.bounded(self.remote.list_posts()),
            self.bounded(self.remote.list_categories()),
        );

        let mut state = self.state.write().await;
        state.loading = false;

        let failure = posts
            .as_ref()
            .err()
            .or(categories.as_ref().err())
            .map(ToString::to_string);

        match self.config.load_policy {
            LoadPolicy::Independent => {
                if let Ok(posts) = posts {
                    state.posts = posts;
                }
                if let Ok(categories) = categories {
                    state.categories = categories;
                }
            }
            LoadPolicy::AllOrNothing => {
                if let (Ok(posts), Ok(categories)) = (posts, categories) {
                    state.posts = posts;
                    state.categories = categories;
                }
            }
        }

        match failure {
            Some(message) => {
                tracing::warn!(error = %message, policy = ?self.config.load_policy, "Load failed");
                state.error = Some(message.clone());
                MutationResult::failed(message)
            }
            None => {
                tracing::debug!(
                    posts = state.posts.len(),
                    categories = state.categories.len(),
                    "Collections loaded"
                );
                MutationResult::ok()
            }
        }
    }

    /// Re-fetch one post and merge it into the collection.
    pub async fn refresh_post(&self, id: &str) -> MutationResult {
        match self.bounded(self.remote.get_post(id)).await {
            Ok(post) => {
                let mut state = self.state.write().await;
                upsert(&mut state.posts, post);
                MutationResult::ok()
            }
            Err(err) => MutationResult::failed(err.to_string()),
        }
    }

    // ---- posts ----------------------------------------------------------

    pub async fn create_post(&self, draft: CreatePostRequest) -> MutationResult {
        self.create::<PostResponse, _>(&draft, self.remote.create_post(&draft))
            .await
    }

    pub async fn edit_post(&self, id: &str, patch: UpdatePostRequest) -> MutationResult {
        self.edit::<PostResponse, _, _>(
            id,
            MutationKind::Edit,
            |post| post.apply_patch(&patch),
            self.remote.update_post(id, &patch),
        )
        .await
    }

    /// Optimistically move a post between draft and published.
    pub async fn set_published(&self, id: &str, published: bool) -> MutationResult {
        self.edit::<PostResponse, _, _>(
            id,
            MutationKind::Publish,
            |post| post.published = published,
            self.remote.set_published(id, published),
        )
        .await
    }

    pub async fn delete_post(&self, id: &str) -> MutationResult {
        self.delete::<PostResponse, _>(id, self.remote.delete_post(id))
            .await
    }

    // ---- categories -----------------------------------------------------

    pub async fn create_category(&self, draft: CreateCategoryRequest) -> MutationResult {
        self.create::<CategoryResponse, _>(&draft, self.remote.create_category(&draft))
            .await
    }

    pub async fn edit_category(&self, id: &str, patch: UpdateCategoryRequest) -> MutationResult {
        self.edit::<CategoryResponse, _, _>(
            id,
            MutationKind::Edit,
            |category| category.apply_patch(&patch),
            self.remote.update_category(id, &patch),
        )
        .await
    }

    pub async fn delete_category(&self, id: &str) -> MutationResult {
        self.delete::<CategoryResponse, _>(id, self.remote.delete_category(id))
            .await
    }

    // ---- protocol -------------------------------------------------------

    async fn create<T, F>(&self, draft: &T::Draft, call: F) -> MutationResult
    where
        T: Resource,
        F: Future<Output = Result<T, RemoteError>>,
    {
        let temp_id = temporary_id();
        let speculative = T::speculative(temp_id.clone(), draft, self.author.as_deref());

        let seq = {
            let mut state = self.state.write().await;
            T::collection_mut(&mut state).push(speculative);
            self.begin(&mut state, &temp_id, T::KIND, MutationKind::Create)
        };
        tracing::debug!(collection = %T::KIND, temp_id = %temp_id, "Speculative create applied");

        let outcome = self.bounded(call).await;

        let mut state = self.state.write().await;
        finish(&mut state, &temp_id, seq);

        match outcome {
            Ok(entity) => {
                tracing::debug!(
                    collection = %T::KIND,
                    temp_id = %temp_id,
                    id = %entity.id(),
                    "Create confirmed"
                );
                promote(T::collection_mut(&mut state), &temp_id, entity);
                MutationResult::ok()
            }
            Err(err) => {
                T::collection_mut(&mut state).retain(|e| e.id() != temp_id);
                self.fail(&mut state, T::KIND, MutationKind::Create, &temp_id, err)
            }
        }
    }

    async fn edit<T, M, F>(&self, id: &str, kind: MutationKind, mutate: M, call: F) -> MutationResult
    where
        T: Resource,
        M: FnOnce(&mut T),
        F: Future<Output = Result<T, RemoteError>>,
    {
        let (snapshot, seq) = {
            let mut state = self.state.write().await;
            let items = T::collection_mut(&mut state);
            let position = match locate(items, T::KIND, id) {
                Ok(position) => position,
                Err(result) => return result,
            };

            let snapshot = items.clone();
            mutate(&mut items[position]);
            let seq = self.begin(&mut state, id, T::KIND, kind);
            (snapshot, seq)
        };

        let outcome = self.bounded(call).await;

        let mut state = self.state.write().await;
        finish(&mut state, id, seq);

        match outcome {
            Ok(entity) => {
                if let Some(slot) = T::collection_mut(&mut state)
                    .iter_mut()
                    .find(|e| e.id() == id)
                {
                    *slot = entity;
                }
                MutationResult::ok()
            }
            Err(err) => {
                *T::collection_mut(&mut state) = snapshot;
                self.fail(&mut state, T::KIND, kind, id, err)
            }
        }
    }

    async fn delete<T, F>(&self, id: &str, call: F) -> MutationResult
    where
        T: Resource,
        F: Future<Output = Result<(), RemoteError>>,
    {
        let (snapshot, seq) = {
            let mut state = self.state.write().await;
            let items = T::collection_mut(&mut state);
            if let Err(result) = locate(items, T::KIND, id) {
                return result;
            }

            let snapshot = items.clone();
            items.retain(|e| e.id() != id);
            let seq = self.begin(&mut state, id, T::KIND, MutationKind::Delete);
            (snapshot, seq)
        };

        let outcome = self.bounded(call).await;

        let mut state = self.state.write().await;
        finish(&mut state, id, seq);

        match outcome {
            Ok(()) => MutationResult::ok(),
            Err(err) => {
                *T::collection_mut(&mut state) = snapshot;
                self.fail(&mut state, T::KIND, MutationKind::Delete, id, err)
            }
        }
    }

    /// Apply the configured timeout to a remote call.
    async fn bounded<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match self.config.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(RemoteError::Timeout)),
            None => call.await,
        }
    }

    fn begin(
        &self,
        state: &mut StoreState,
        key: &str,
        collection: CollectionKind,
        kind: MutationKind,
    ) -> u64 {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        state.pending.insert(
            key.to_string(),
            PendingMutation {
                collection,
                kind,
                seq,
                started_at: Utc::now(),
            },
        );
        seq
    }

    fn fail(
        &self,
        state: &mut StoreState,
        collection: CollectionKind,
        kind: MutationKind,
        id: &str,
        err: RemoteError,
    ) -> MutationResult {
        let message = err.to_string();
        tracing::warn!(
            collection = %collection,
            kind = ?kind,
            id = %id,
            error = %message,
            "Mutation rolled back"
        );

        if self.config.record_mutation_errors {
            state.error = Some(message.clone());
        }
        MutationResult::failed(message)
    }
}

/// Find the entity an edit or delete targets.
fn locate<T: Resource>(items: &[T], kind: CollectionKind, id: &str) -> Result<usize, MutationResult> {
    if is_temporary_id(id) {
        return Err(MutationResult::failed(format!(
            "{} {id} is still pending confirmation",
            kind.singular()
        )));
    }

    items
        .iter()
        .position(|e| e.id() == id)
        .ok_or_else(|| MutationResult::failed(format!("{} {id} not found", kind.singular())))
}

/// Drop the pending record unless a newer mutation has taken it over.
fn finish(state: &mut StoreState, key: &str, seq: u64) {
    if state.pending.get(key).is_some_and(|p| p.seq == seq) {
        state.pending.remove(key);
    }
}

/// Replace the speculative entry with the confirmed entity.
///
/// A reload may have replaced the collection while the create was in
/// flight; the entity then lands on its server id, or is appended.
fn promote<T: Resource>(items: &mut Vec<T>, temp_id: &str, entity: T) {
    match items.iter().position(|e| e.id() == temp_id) {
        Some(position) => items[position] = entity,
        None => upsert(items, entity),
    }
}

fn upsert<T: Resource>(items: &mut Vec<T>, entity: T) {
    match items.iter().position(|e| e.id() == entity.id()) {
        Some(position) => items[position] = entity,
        None => items.push(entity),
    }
}

#[cfg(test)]
mod tests;
