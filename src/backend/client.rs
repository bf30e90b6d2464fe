//! # Backend Client
//!
//! Thin reqwest wrapper for the NavArya backend. Authenticated calls fetch the
//! session token first and fail with `Unauthenticated` without touching the
//! network when none is available. Non-2xx responses become `RequestFailed`
//! carrying the backend's error message when one can be found in the body.

use log::debug;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;

use crate::backend::auth::TokenProvider;
use crate::backend::error::GatewayError;

#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    session: Arc<dyn TokenProvider>,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, session: Arc<dyn TokenProvider>) -> Self {
        let base_url: String = base_url.into();
        BackendClient {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start an authenticated request, or fail before any I/O if signed out
    async fn authed(&self, method: Method, path: &str) -> Result<RequestBuilder, GatewayError> {
        let token = self
            .session
            .token()
            .await
            .ok_or(GatewayError::Unauthenticated)?;

        debug!("{method} {path}");
        Ok(self.http.request(method, self.url(path)).bearer_auth(token))
    }

    async fn execute(&self, builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = extract_error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string()
        });

        Err(GatewayError::RequestFailed {
            status: status.as_u16(),
            message,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, GatewayError> {
        let builder = self.authed(Method::GET, path).await?;
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    pub async fn post<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.authed(Method::POST, path).await?.json(body);
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    pub async fn put<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.authed(Method::PUT, path).await?.json(body);
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }

    /// PUT without a body, ignoring the response payload
    pub async fn put_empty(&self, path: &str) -> Result<(), GatewayError> {
        let builder = self.authed(Method::PUT, path).await?;
        self.execute(builder).await?;
        Ok(())
    }

    pub async fn delete(&self, path: &str) -> Result<(), GatewayError> {
        let builder = self.authed(Method::DELETE, path).await?;
        self.execute(builder).await?;
        Ok(())
    }

    /// POST without a bearer token, for endpoints that do not require a session
    pub async fn post_public<B, T>(&self, path: &str, body: &B) -> Result<T, GatewayError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!("POST {path} (public)");
        let builder = self.http.post(self.url(path)).json(body);
        let response = self.execute(builder).await?;
        Self::decode(response).await
    }
}

/// Pull a message out of `{"error": {"message": ..}}`, `{"error": ".."}` or
/// `{"detail": ..}` bodies; fall back to short plain-text bodies
fn extract_error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let candidate = value
            .get("error")
            .and_then(|e| e.get("message").or(Some(e)))
            .or_else(|| value.get("detail"))
            .or_else(|| value.get("message"));

        return candidate.map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        });
    }

    if trimmed.len() <= 200 {
        Some(trimmed.to_string())
    } else {
        None
    }
}
