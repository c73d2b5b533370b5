//! Domain entities - the core business objects.

mod category;
mod post;
mod slug;
mod user;
pub mod validation;

pub use category::Category;
pub use post::{Post, PostChanges};
pub use slug::slugify;
pub use user::User;
pub use validation::FieldError;
