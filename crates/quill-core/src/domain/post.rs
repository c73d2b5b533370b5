use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::slug::slugify;
use crate::error::DomainError;

/// Post entity - a blog post owned by its author.
///
/// A post starts out as a draft. Drafts are only visible to their author;
/// published posts are visible to everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: Uuid,
    pub author_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub content: String,
    pub slug: String,
    pub published: bool,
    pub featured_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Field changes accepted by a post update. `None` leaves the field alone.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category_id: Option<Uuid>,
    pub featured_image: Option<String>,
}

impl Post {
    /// Create a new draft post. The slug is derived from the title here and
    /// never recomputed afterwards.
    pub fn new(author_id: Uuid, category_id: Uuid, title: String, content: String) -> Self {
        let now = Utc::now();
        let title = title.trim().to_string();
        Self {
            id: Uuid::new_v4(),
            author_id,
            category_id,
            slug: slugify(&title),
            title,
            content: content.trim().to_string(),
            published: false,
            featured_image: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_featured_image(mut self, path: Option<String>) -> Self {
        self.featured_image = path;
        self
    }

    pub fn is_author(&self, user_id: Uuid) -> bool {
        self.author_id == user_id
    }

    /// Published posts are public, drafts only show up for their author.
    pub fn is_visible_to(&self, requester: Option<Uuid>) -> bool {
        self.published || requester.is_some_and(|id| self.is_author(id))
    }

    pub fn authorize_read(&self, requester: Option<Uuid>) -> Result<(), DomainError> {
        if self.is_visible_to(requester) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "post {} is not published",
                self.id
            )))
        }
    }

    /// Updates, deletes and publish toggles are reserved for the author.
    pub fn authorize_write(&self, requester: Uuid) -> Result<(), DomainError> {
        if self.is_author(requester) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(format!(
                "only the author may modify post {}",
                self.id
            )))
        }
    }

    /// Apply already-validated changes. Returns `true` if anything changed.
    pub fn apply(&mut self, changes: PostChanges) -> bool {
        let mut changed = false;

        if let Some(title) = changes.title {
            let title = title.trim().to_string();
            changed |= self.title != title;
            self.title = title;
        }
        if let Some(content) = changes.content {
            let content = content.trim().to_string();
            changed |= self.content != content;
            self.content = content;
        }
        if let Some(category_id) = changes.category_id {
            changed |= self.category_id != category_id;
            self.category_id = category_id;
        }
        if let Some(path) = changes.featured_image {
            changed |= self.featured_image.as_deref() != Some(path.as_str());
            self.featured_image = Some(path);
        }

        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Move between draft and published. Setting the current state again is
    /// a no-op and returns `false`.
    pub fn set_published(&mut self, published: bool) -> bool {
        if self.published == published {
            return false;
        }
        self.published = published;
        self.updated_at = Utc::now();
        true
    }
}
