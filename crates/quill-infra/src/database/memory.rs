//! In-memory repositories - used when no database is configured and in tests.
//!
//! Data is lost on process restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use quill_core::domain::{Category, Post, User};
use quill_core::error::RepoError;
use quill_core::ports::{BaseRepository, CategoryRepository, PostRepository, UserRepository};

/// Anything stored by primary key.
trait Keyed: Clone + Send + Sync + 'static {
    fn key(&self) -> Uuid;
}

impl Keyed for User {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Post {
    fn key(&self) -> Uuid {
        self.id
    }
}

impl Keyed for Category {
    fn key(&self) -> Uuid {
        self.id
    }
}

/// HashMap table guarded by an async RwLock.
struct Table<T> {
    rows: RwLock<HashMap<Uuid, T>>,
}

impl<T: Keyed> Table<T> {
    fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
        }
    }

    async fn get(&self, id: Uuid) -> Option<T> {
        self.rows.read().await.get(&id).cloned()
    }

    async fn insert(&self, entity: T) -> Result<T, RepoError> {
        let mut rows = self.rows.write().await;
        if rows.contains_key(&entity.key()) {
            return Err(RepoError::Constraint("Entity already exists".to_string()));
        }
        rows.insert(entity.key(), entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: T) -> Result<T, RepoError> {
        let mut rows = self.rows.write().await;
        match rows.get_mut(&entity.key()) {
            Some(row) => {
                *row = entity.clone();
                Ok(entity)
            }
            None => Err(RepoError::NotFound),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
        self.rows
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound)
    }

    async fn filter(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows
            .read()
            .await
            .values()
            .filter(|row| pred(row))
            .cloned()
            .collect()
    }
}

macro_rules! in_memory_repository {
    ($name:ident, $entity:ty) => {
        pub struct $name {
            table: Table<$entity>,
        }

        impl $name {
            pub fn new() -> Self {
                Self {
                    table: Table::new(),
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        #[async_trait]
        impl BaseRepository<$entity, Uuid> for $name {
            async fn find_by_id(&self, id: Uuid) -> Result<Option<$entity>, RepoError> {
                Ok(self.table.get(id).await)
            }

            async fn insert(&self, entity: $entity) -> Result<$entity, RepoError> {
                self.table.insert(entity).await
            }

            async fn update(&self, entity: $entity) -> Result<$entity, RepoError> {
                self.table.update(entity).await
            }

            async fn delete(&self, id: Uuid) -> Result<(), RepoError> {
                self.table.delete(id).await
            }
        }
    };
}

in_memory_repository!(InMemoryUserRepository, User);
in_memory_repository!(InMemoryPostRepository, Post);
in_memory_repository!(InMemoryCategoryRepository, Category);

fn newest_first(mut posts: Vec<Post>) -> Vec<Post> {
    posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    posts
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepoError> {
        let email = email.trim().to_lowercase();
        Ok(self
            .table
            .filter(|u| u.email == email)
            .await
            .into_iter()
            .next())
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_all(&self) -> Result<Vec<Post>, RepoError> {
        Ok(newest_first(self.table.filter(|_| true).await))
    }

    async fn find_by_author(&self, author_id: Uuid) -> Result<Vec<Post>, RepoError> {
        Ok(newest_first(
            self.table.filter(|p| p.author_id == author_id).await,
        ))
    }

    async fn find_by_category(&self, category_id: Uuid) -> Result<Vec<Post>, RepoError> {
        Ok(newest_first(
            self.table.filter(|p| p.category_id == category_id).await,
        ))
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_all(&self) -> Result<Vec<Category>, RepoError> {
        let mut categories = self.table.filter(|_| true).await;
        categories.sort_by_key(|c| c.name.to_lowercase());
        Ok(categories)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Category>, RepoError> {
        Ok(self
            .table
            .filter(|c| c.same_name(name))
            .await
            .into_iter()
            .next())
    }
}
