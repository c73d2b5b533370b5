//! # Quill Client
//!
//! Client-side mirror of the blog's posts and categories.
//!
//! [`Store`] applies every mutation locally first, then confirms it against
//! the API through a [`RemoteResources`] implementation ([`HttpRemote`] in
//! production). Failed calls are rolled back; successful creates swap their
//! `tmp-` placeholder for the server's record.

pub mod config;
pub mod entity;
pub mod error;
pub mod http;
pub mod remote;
pub mod store;

pub use config::{ClientConfig, LoadPolicy, StoreConfig};
pub use entity::{Resource, TEMP_ID_PREFIX, is_temporary_id};
pub use error::RemoteError;
pub use http::HttpRemote;
pub use remote::RemoteResources;
pub use store::{
    CollectionKind, MutationKind, MutationResult, PendingMutation, Store, StoreState,
};
