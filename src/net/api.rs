//! Comics API endpoints.
//!
//! Thin typed layer over [`HttpClient`]: each call picks the method, the
//! auth flag and the envelope type. A `204` or a `null` envelope payload is
//! treated as "no data" rather than a parse error.

#[cfg(test)]
#[path = "api_test.rs"]
mod api_test;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::http::{ApiError, HttpClient, Method, RequestOptions};
use super::types::{Comic, ComicInput, DataEnvelope};

fn comic_endpoint(id: i64) -> String {
    format!("/comics/{id}")
}

#[derive(Clone)]
pub struct ComicsApi {
    http: HttpClient,
}

impl ComicsApi {
    #[must_use]
    pub fn new(http: HttpClient) -> Self {
        Self { http }
    }

    /// `GET /comics`.
    ///
    /// # Errors
    ///
    /// Returns any [`ApiError`] raised by the request or envelope parsing.
    pub async fn get_comics(&self) -> Result<Vec<Comic>, ApiError> {
        let body = self.http.request("/comics", RequestOptions::new(Method::GET)).await?;
        Ok(unwrap_envelope::<Vec<Comic>>(body)?.unwrap_or_default())
    }

    /// `GET /comics/:id`. The server answers `404` when the comic is absent.
    ///
    /// # Errors
    ///
    /// Returns any [`ApiError`] raised by the request or envelope parsing.
    pub async fn get_comic_detail(&self, id: i64) -> Result<Option<Comic>, ApiError> {
        let body = self.http.request(&comic_endpoint(id), RequestOptions::new(Method::GET)).await?;
        unwrap_envelope(body)
    }

    /// `POST /comics` with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns any [`ApiError`] raised by the request or envelope parsing.
    pub async fn create_comic(&self, input: &ComicInput) -> Result<Option<Comic>, ApiError> {
        let options = RequestOptions::new(Method::POST).json(to_body(input)?).authenticated();
        let body = self.http.request("/comics", options).await?;
        unwrap_envelope(body)
    }

    /// `PUT /comics/:id` with a bearer token and a partial body.
    ///
    /// # Errors
    ///
    /// Returns any [`ApiError`] raised by the request or envelope parsing.
    pub async fn update_comic(&self, id: i64, input: &ComicInput) -> Result<Option<Comic>, ApiError> {
        let options = RequestOptions::new(Method::PUT).json(to_body(input)?).authenticated();
        let body = self.http.request(&comic_endpoint(id), options).await?;
        unwrap_envelope(body)
    }
}

fn to_body(input: &ComicInput) -> Result<Value, ApiError> {
    serde_json::to_value(input).map_err(|e| ApiError::Decode(e.to_string()))
}

fn unwrap_envelope<T: DeserializeOwned>(body: Option<Value>) -> Result<Option<T>, ApiError> {
    let Some(body) = body.filter(|b| !b.is_null()) else {
        return Ok(None);
    };
    let envelope: DataEnvelope<T> = serde_json::from_value(body).map_err(|e| ApiError::Decode(e.to_string()))?;
    Ok(envelope.data)
}
