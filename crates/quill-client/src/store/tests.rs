use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::*;
use crate::entity::TEMP_ID_PREFIX;

/// In-process stand-in for the API with switchable failures.
#[derive(Default)]
struct FakeRemote {
    posts: Mutex<Vec<PostResponse>>,
    categories: Mutex<Vec<CategoryResponse>>,
    fail_posts: Mutex<Option<RemoteError>>,
    fail_categories: Mutex<Option<RemoteError>>,
    fail_mutations: Mutex<Option<RemoteError>>,
    hold: Mutex<Option<oneshot::Receiver<()>>>,
    hang: Mutex<bool>,
    next_id: Mutex<u32>,
}

impl FakeRemote {
    fn with_posts(posts: Vec<PostResponse>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Default::default()
        }
    }

    fn fail_mutations_with(&self, err: RemoteError) {
        *self.fail_mutations.lock().unwrap() = Some(err);
    }

    /// Park the next mutation until the returned sender fires.
    fn hold_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.hold.lock().unwrap() = Some(rx);
        tx
    }

    async fn gate(&self) -> Result<(), RemoteError> {
        let hang = *self.hang.lock().unwrap();
        if hang {
            std::future::pending::<()>().await;
        }
        let hold = self.hold.lock().unwrap().take();
        if let Some(rx) = hold {
            let _ = rx.await;
        }
        let failure = self.fail_mutations.lock().unwrap().clone();
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn server_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        *next += 1;
        format!("00000000-0000-4000-8000-{:012}", *next)
    }
}

#[async_trait]
impl RemoteResources for FakeRemote {
    async fn list_posts(&self) -> Result<Vec<PostResponse>, RemoteError> {
        match self.fail_posts.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.posts.lock().unwrap().clone()),
        }
    }

    async fn list_categories(&self) -> Result<Vec<CategoryResponse>, RemoteError> {
        match self.fail_categories.lock().unwrap().clone() {
            Some(err) => Err(err),
            None => Ok(self.categories.lock().unwrap().clone()),
        }
    }

    async fn get_post(&self, id: &str) -> Result<PostResponse, RemoteError> {
        self.posts
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))
    }

    async fn create_post(&self, draft: &CreatePostRequest) -> Result<PostResponse, RemoteError> {
        self.gate().await?;
        let mut post = PostResponse::speculative(self.server_id(), draft, Some("author-1"));
        post.content = format!("{} (saved)", post.content);
        self.posts.lock().unwrap().push(post.clone());
        Ok(post)
    }

    async fn update_post(
        &self,
        id: &str,
        patch: &UpdatePostRequest,
    ) -> Result<PostResponse, RemoteError> {
        self.gate().await?;
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        post.apply_patch(patch);
        Ok(post.clone())
    }

    async fn set_published(&self, id: &str, published: bool) -> Result<PostResponse, RemoteError> {
        self.gate().await?;
        let mut posts = self.posts.lock().unwrap();
        let post = posts
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        post.published = published;
        Ok(post.clone())
    }

    async fn delete_post(&self, id: &str) -> Result<(), RemoteError> {
        self.gate().await?;
        self.posts.lock().unwrap().retain(|p| p.id != id);
        Ok(())
    }

    async fn create_category(
        &self,
        draft: &CreateCategoryRequest,
    ) -> Result<CategoryResponse, RemoteError> {
        self.gate().await?;
        let category = CategoryResponse::speculative(self.server_id(), draft, None);
        self.categories.lock().unwrap().push(category.clone());
        Ok(category)
    }

    async fn update_category(
        &self,
        id: &str,
        patch: &UpdateCategoryRequest,
    ) -> Result<CategoryResponse, RemoteError> {
        self.gate().await?;
        let mut categories = self.categories.lock().unwrap();
        let category = categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| RemoteError::NotFound(id.to_string()))?;
        category.apply_patch(patch);
        Ok(category.clone())
    }

    async fn delete_category(&self, id: &str) -> Result<(), RemoteError> {
        self.gate().await?;
        self.categories.lock().unwrap().retain(|c| c.id != id);
        Ok(())
    }
}

fn post(id: &str, title: &str) -> PostResponse {
    PostResponse {
        id: id.to_string(),
        title: title.to_string(),
        content: "Body".to_string(),
        slug: quill_core::domain::slugify(title),
        author_id: "author-1".to_string(),
        category_id: "cat-1".to_string(),
        published: true,
        featured_image: None,
        created_at: Utc::now(),
    }
}

fn draft(title: &str) -> CreatePostRequest {
    CreatePostRequest {
        title: title.to_string(),
        content: "Fresh content".to_string(),
        category_id: "cat-1".to_string(),
        ..Default::default()
    }
}

async fn loaded_store(remote: Arc<FakeRemote>, config: StoreConfig) -> Store {
    let store = Store::new(remote, config);
    assert!(store.load_all().await.success);
    store
}

fn forbidden() -> RemoteError {
    RemoteError::Forbidden("only the author may modify this post".to_string())
}

#[tokio::test]
async fn test_new_store_starts_loading_and_empty() {
    let store = Store::new(Arc::new(FakeRemote::default()), StoreConfig::default());
    let state = store.snapshot().await;

    assert!(state.loading);
    assert!(state.posts.is_empty());
    assert!(state.categories.is_empty());
    assert!(state.error.is_none());
}

#[tokio::test]
async fn test_load_all_fills_collections() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One"), post("p2", "Two")]));
    remote.categories.lock().unwrap().push(CategoryResponse {
        id: "cat-1".to_string(),
        name: "Rust".to_string(),
    });

    let store = loaded_store(remote, StoreConfig::default()).await;

    assert!(!store.is_loading().await);
    assert_eq!(store.posts().await.len(), 2);
    assert_eq!(store.categories().await.len(), 1);
    assert_eq!(store.error().await, None);
}

#[tokio::test]
async fn test_load_all_independent_keeps_successful_half() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    *remote.fail_categories.lock().unwrap() = Some(RemoteError::Status {
        status: 500,
        message: "boom".to_string(),
    });
    let store = Store::new(remote, StoreConfig::default());

    let result = store.load_all().await;

    assert!(!result.success);
    assert!(!store.is_loading().await);
    assert!(store.error().await.is_some());
    assert_eq!(store.posts().await.len(), 1);
}

#[tokio::test]
async fn test_load_all_all_or_nothing_applies_neither() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    *remote.fail_categories.lock().unwrap() = Some(RemoteError::Transport("offline".to_string()));
    let store = Store::new(
        remote,
        StoreConfig {
            load_policy: LoadPolicy::AllOrNothing,
            ..Default::default()
        },
    );

    let result = store.load_all().await;

    assert!(!result.success);
    assert!(!store.is_loading().await);
    assert_eq!(
        store.error().await.as_deref(),
        Some("network error: offline")
    );
    assert!(store.posts().await.is_empty());
}

#[tokio::test]
async fn test_successful_load_clears_previous_error() {
    let remote = Arc::new(FakeRemote::default());
    *remote.fail_posts.lock().unwrap() = Some(RemoteError::Transport("offline".to_string()));
    let store = Store::new(remote.clone(), StoreConfig::default());
    store.load_all().await;
    assert!(store.error().await.is_some());

    *remote.fail_posts.lock().unwrap() = None;
    store.load_all().await;

    assert_eq!(store.error().await, None);
}

#[tokio::test]
async fn test_create_promotes_speculative_entry() {
    let remote = Arc::new(FakeRemote::default());
    let store = loaded_store(remote, StoreConfig::default()).await;

    let result = store.create_post(draft("Hello World")).await;

    assert_eq!(result, MutationResult::ok());
    let posts = store.posts().await;
    assert_eq!(posts.len(), 1);
    assert!(!posts[0].id.starts_with(TEMP_ID_PREFIX));
    assert_eq!(posts[0].content, "Fresh content (saved)");
    assert_eq!(posts[0].slug, "hello-world");
    assert!(store.pending().await.is_empty());
}

#[tokio::test]
async fn test_speculative_entry_visible_while_in_flight() {
    let remote = Arc::new(FakeRemote::default());
    let store = Arc::new(loaded_store(remote.clone(), StoreConfig::default()).await);
    let release = remote.hold_next();

    let task = {
        let store = store.clone();
        tokio::spawn(async move { store.create_post(draft("Pending")).await })
    };

    let speculative = loop {
        if let Some(p) = store.posts().await.into_iter().next() {
            break p;
        }
        tokio::task::yield_now().await;
    };
    assert!(speculative.id.starts_with(TEMP_ID_PREFIX));
    assert_eq!(speculative.content, "Fresh content");
    let pending = store.pending().await;
    assert_eq!(pending[&speculative.id].kind, MutationKind::Create);

    release.send(()).unwrap();
    assert!(task.await.unwrap().success);

    let ids: Vec<String> = store.posts().await.into_iter().map(|p| p.id).collect();
    assert_eq!(ids.len(), 1);
    assert_ne!(ids[0], speculative.id);
}

#[tokio::test]
async fn test_failed_create_rolls_back() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    let store = loaded_store(remote.clone(), StoreConfig::default()).await;
    let before = store.posts().await;
    remote.fail_mutations_with(RemoteError::Validation(vec![quill_shared::FieldIssue {
        field: "title".to_string(),
        message: "Title is required".to_string(),
    }]));

    let result = store.create_post(draft("")).await;

    assert!(!result.success);
    assert_eq!(
        result.error.as_deref(),
        Some("validation failed: title: Title is required")
    );
    assert_eq!(store.posts().await, before);
    assert_eq!(store.error().await, result.error);
    assert!(store.pending().await.is_empty());
}

#[tokio::test]
async fn test_edit_replaces_with_server_version() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    let store = loaded_store(remote, StoreConfig::default()).await;

    let result = store
        .edit_post(
            "p1",
            UpdatePostRequest {
                title: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(result.success);
    let edited = store.post("p1").await.unwrap();
    assert_eq!(edited.title, "Renamed");
    assert_eq!(edited.slug, "one");
}

#[tokio::test]
async fn test_failed_edit_restores_snapshot() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One"), post("p2", "Two")]));
    let store = loaded_store(remote.clone(), StoreConfig::default()).await;
    let before = store.posts().await;
    remote.fail_mutations_with(forbidden());

    let result = store
        .edit_post(
            "p2",
            UpdatePostRequest {
                content: Some("Hijacked".to_string()),
                ..Default::default()
            },
        )
        .await;

    assert!(!result.success);
    assert_eq!(store.posts().await, before);
    assert!(store.error().await.unwrap().starts_with("forbidden"));
}

#[tokio::test]
async fn test_failed_delete_restores_snapshot() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One"), post("p2", "Two")]));
    let store = loaded_store(remote.clone(), StoreConfig::default()).await;
    let before = store.posts().await;
    remote.fail_mutations_with(forbidden());

    let result = store.delete_post("p1").await;

    assert!(!result.success);
    assert_eq!(store.posts().await, before);
}

#[tokio::test]
async fn test_delete_removes_immediately_and_stays_removed() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One"), post("p2", "Two")]));
    let store = Arc::new(loaded_store(remote.clone(), StoreConfig::default()).await);
    let release = remote.hold_next();

    let task = {
        let store = store.clone();
        tokio::spawn(async move { store.delete_post("p1").await })
    };

    while store.post("p1").await.is_some() {
        tokio::task::yield_now().await;
    }
    assert_eq!(store.pending().await["p1"].kind, MutationKind::Delete);

    release.send(()).unwrap();
    assert!(task.await.unwrap().success);
    assert_eq!(store.posts().await.len(), 1);
    assert!(store.pending().await.is_empty());
}

#[tokio::test]
async fn test_failed_publish_rolls_back_flag() {
    let mut draft_post = post("p1", "One");
    draft_post.published = false;
    let remote = Arc::new(FakeRemote::with_posts(vec![draft_post]));
    let store = loaded_store(remote.clone(), StoreConfig::default()).await;
    remote.fail_mutations_with(RemoteError::Unauthenticated);

    let result = store.set_published("p1", true).await;

    assert!(!result.success);
    assert!(!store.post("p1").await.unwrap().published);
}

#[tokio::test]
async fn test_publish_twice_is_harmless() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    let store = loaded_store(remote, StoreConfig::default()).await;

    assert!(store.set_published("p1", true).await.success);
    assert!(store.set_published("p1", true).await.success);
    assert!(store.post("p1").await.unwrap().published);
}

#[tokio::test]
async fn test_missing_or_pending_target_fails_locally() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    let store = loaded_store(remote, StoreConfig::default()).await;
    let before = store.snapshot().await;

    let missing = store.delete_post("nope").await;
    let pending = store
        .edit_post("tmp-123", UpdatePostRequest::default())
        .await;

    assert_eq!(missing.error.as_deref(), Some("post nope not found"));
    assert_eq!(
        pending.error.as_deref(),
        Some("post tmp-123 is still pending confirmation")
    );
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn test_mutation_errors_can_stay_local() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    let store = loaded_store(
        remote.clone(),
        StoreConfig {
            record_mutation_errors: false,
            ..Default::default()
        },
    )
    .await;
    remote.fail_mutations_with(forbidden());

    let result = store.delete_post("p1").await;

    assert!(!result.success);
    assert!(result.error.is_some());
    assert_eq!(store.error().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_rolls_back() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    let store = loaded_store(
        remote.clone(),
        StoreConfig {
            request_timeout: Some(Duration::from_secs(5)),
            ..Default::default()
        },
    )
    .await;
    let before = store.posts().await;
    *remote.hang.lock().unwrap() = true;

    let created = store.create_post(draft("Never")).await;
    let deleted = store.delete_post("p1").await;

    assert_eq!(created.error.as_deref(), Some("request timed out"));
    assert_eq!(deleted.error.as_deref(), Some("request timed out"));
    assert_eq!(store.posts().await, before);
    assert!(store.pending().await.is_empty());
}

#[tokio::test]
async fn test_category_lifecycle() {
    let remote = Arc::new(FakeRemote::default());
    let store = loaded_store(remote.clone(), StoreConfig::default()).await;

    assert!(
        store
            .create_category(CreateCategoryRequest {
                name: " Systems ".to_string()
            })
            .await
            .success
    );
    let id = store.categories().await[0].id.clone();
    assert!(!is_temporary_id(&id));

    assert!(
        store
            .edit_category(
                &id,
                UpdateCategoryRequest {
                    name: Some("Low level".to_string())
                }
            )
            .await
            .success
    );
    assert_eq!(store.categories().await[0].name, "Low level");

    remote.fail_mutations_with(RemoteError::Status {
        status: 409,
        message: "still referenced".to_string(),
    });
    assert!(!store.delete_category(&id).await.success);
    assert_eq!(store.categories().await.len(), 1);
}

#[tokio::test]
async fn test_refresh_post_upserts() {
    let remote = Arc::new(FakeRemote::default());
    let store = loaded_store(remote.clone(), StoreConfig::default()).await;
    remote.posts.lock().unwrap().push(post("p9", "Late arrival"));

    assert!(store.refresh_post("p9").await.success);
    assert!(store.refresh_post("p9").await.success);
    assert_eq!(store.posts().await.len(), 1);
    assert!(!store.refresh_post("missing").await.success);
}

async fn wait_for_pending(store: &Store, id: &str, kind: MutationKind) -> PendingMutation {
    loop {
        if let Some(p) = store.pending().await.get(id).filter(|p| p.kind == kind) {
            return p.clone();
        }
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_older_mutation_keeps_newer_pending_record() {
    let remote = Arc::new(FakeRemote::with_posts(vec![post("p1", "One")]));
    let store = Arc::new(loaded_store(remote.clone(), StoreConfig::default()).await);

    let release_edit = remote.hold_next();
    let edit = {
        let store = store.clone();
        tokio::spawn(async move {
            store
                .edit_post(
                    "p1",
                    UpdatePostRequest {
                        title: Some("First".to_string()),
                        ..Default::default()
                    },
                )
                .await
        })
    };
    let older = wait_for_pending(&store, "p1", MutationKind::Edit).await;

    let release_publish = remote.hold_next();
    let publish = {
        let store = store.clone();
        tokio::spawn(async move { store.set_published("p1", false).await })
    };
    let newer = wait_for_pending(&store, "p1", MutationKind::Publish).await;
    assert!(newer.seq > older.seq);

    release_edit.send(()).unwrap();
    assert!(edit.await.unwrap().success);

    let pending = store.pending().await;
    assert_eq!(pending["p1"].kind, MutationKind::Publish);
    assert_eq!(pending["p1"].seq, newer.seq);

    release_publish.send(()).unwrap();
    assert!(publish.await.unwrap().success);
    assert!(store.pending().await.is_empty());
}

#[tokio::test]
async fn test_create_confirmed_after_reload_is_not_duplicated() {
    let remote = Arc::new(FakeRemote::default());
    let store = Arc::new(loaded_store(remote.clone(), StoreConfig::default()).await);
    // First id the fake server hands out.
    let server_id = "00000000-0000-4000-8000-000000000001";

    let release = remote.hold_next();
    let create = {
        let store = store.clone();
        tokio::spawn(async move { store.create_post(draft("Racing")).await })
    };
    loop {
        if store.posts().await.iter().any(|p| is_temporary_id(&p.id)) {
            break;
        }
        tokio::task::yield_now().await;
    }

    // The reload already sees the stored record and drops the placeholder.
    remote.posts.lock().unwrap().push(post(server_id, "Racing"));
    assert!(store.load_all().await.success);
    let reloaded: Vec<String> = store.posts().await.into_iter().map(|p| p.id).collect();
    assert_eq!(reloaded, vec![server_id.to_string()]);

    release.send(()).unwrap();
    assert!(create.await.unwrap().success);

    let posts = store.posts().await;
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].id, server_id);
    assert_eq!(posts[0].content, "Fresh content (saved)");
    assert!(store.pending().await.is_empty());
}
