//! reqwest-backed [`RemoteResources`].

use async_trait::async_trait;
use quill_shared::dto::{
    CategoryResponse, CreateCategoryRequest, CreatePostRequest, LoginRequest, PostResponse,
    PublishRequest, RegisterUserRequest, SessionResponse, UpdateCategoryRequest,
    UpdatePostRequest, UserResponse,
};
use quill_shared::{ApiResponse, ErrorResponse};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;

use crate::config::ClientConfig;
use crate::error::RemoteError;
use crate::remote::RemoteResources;

/// Talks to the blog API over HTTP.
///
/// Writes need a bearer token, obtained through [`HttpRemote::login`],
/// [`HttpRemote::register`] or handed in with [`HttpRemote::set_token`].
pub struct HttpRemote {
    config: ClientConfig,
    client: Client,
    token: RwLock<Option<String>>,
}

impl HttpRemote {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            client: Client::new(),
            token: RwLock::new(None),
        }
    }

    pub fn from_env() -> Self {
        Self::new(ClientConfig::from_env())
    }

    pub async fn set_token(&self, token: Option<String>) {
        *self.token.write().await = token;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    pub async fn register(
        &self,
        request: &RegisterUserRequest,
    ) -> Result<SessionResponse, RemoteError> {
        let session: SessionResponse = self
            .send_enveloped(Method::POST, "/auth/register", Some(request))
            .await?;
        self.set_token(Some(session.access_token.clone())).await;
        Ok(session)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<SessionResponse, RemoteError> {
        let session: SessionResponse = self
            .send_enveloped(Method::POST, "/auth/login", Some(request))
            .await?;
        self.set_token(Some(session.access_token.clone())).await;
        Ok(session)
    }

    pub async fn me(&self) -> Result<UserResponse, RemoteError> {
        self.send_enveloped::<(), _>(Method::GET, "/auth/me", None)
            .await
    }

    async fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.config.api_url(path);
        tracing::debug!(method = %method, url = %url, "API request");

        let builder = self.client.request(method, url);
        match self.token.read().await.as_deref() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<Response, RemoteError> {
        let mut builder = self.request(method, path).await;
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // Not every failure carries a problem body (proxies, panics upstream).
        let problem = response.json::<ErrorResponse>().await.ok();
        let err = RemoteError::from_status(status.as_u16(), problem);
        tracing::debug!(status = status.as_u16(), path = %path, error = %err, "API request failed");
        Err(err)
    }

    /// Decode a bare JSON body.
    async fn send_plain<B, T>(&self, method: Method, path: &str, body: Option<&B>) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self.execute(method, path, body).await?;
        Ok(response.json::<T>().await?)
    }

    /// Decode the `data` member of an [`ApiResponse`] envelope.
    async fn send_enveloped<B, T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, RemoteError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let envelope: ApiResponse<T> = self.send_plain(method, path, body).await?;
        envelope
            .data
            .ok_or_else(|| RemoteError::Decode("response carried no data".to_string()))
    }
}

#[async_trait]
impl RemoteResources for HttpRemote {
    async fn list_posts(&self) -> Result<Vec<PostResponse>, RemoteError> {
        self.send_plain::<(), _>(Method::GET, "/posts", None).await
    }

    async fn list_categories(&self) -> Result<Vec<CategoryResponse>, RemoteError> {
        self.send_plain::<(), _>(Method::GET, "/categories", None)
            .await
    }

    async fn get_post(&self, id: &str) -> Result<PostResponse, RemoteError> {
        self.send_plain::<(), _>(Method::GET, &format!("/posts/{id}"), None)
            .await
    }

    async fn create_post(&self, draft: &CreatePostRequest) -> Result<PostResponse, RemoteError> {
        self.send_enveloped(Method::POST, "/posts", Some(draft))
            .await
    }

    async fn update_post(
        &self,
        id: &str,
        patch: &UpdatePostRequest,
    ) -> Result<PostResponse, RemoteError> {
        self.send_enveloped(Method::PUT, &format!("/posts/{id}"), Some(patch))
            .await
    }

    async fn set_published(&self, id: &str, published: bool) -> Result<PostResponse, RemoteError> {
        self.send_enveloped(
            Method::PATCH,
            &format!("/posts/{id}/publish"),
            Some(&PublishRequest { published }),
        )
        .await
    }

    async fn delete_post(&self, id: &str) -> Result<(), RemoteError> {
        self.execute::<()>(Method::DELETE, &format!("/posts/{id}"), None)
            .await
            .map(|_| ())
    }

    async fn create_category(
        &self,
        draft: &CreateCategoryRequest,
    ) -> Result<CategoryResponse, RemoteError> {
        self.send_enveloped(Method::POST, "/categories", Some(draft))
            .await
    }

    async fn update_category(
        &self,
        id: &str,
        patch: &UpdateCategoryRequest,
    ) -> Result<CategoryResponse, RemoteError> {
        self.send_enveloped(Method::PUT, &format!("/categories/{id}"), Some(patch))
            .await
    }

    async fn delete_category(&self, id: &str) -> Result<(), RemoteError> {
        self.execute::<()>(Method::DELETE, &format!("/categories/{id}"), None)
            .await
            .map(|_| ())
    }
}
