//! Submitted form binding and validation
//!
//! Forms are bound from `application/x-www-form-urlencoded` bodies (and, for
//! posts, `multipart/form-data`) and cleaned into typed values. Cleaning
//! failures are collected per field so the page can be rendered again with
//! the messages next to the offending inputs.

pub mod auth;
pub mod comment;
pub mod post;

pub use auth::{LoginForm, SignupForm};
pub use comment::CommentForm;
pub use post::{ImageChange, PostForm, PostFormInput, UploadedFile};

use actix_web::web;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;

use crate::error::{AppError, Result};

pub const REQUIRED: &str = "This field is required.";

/// Field name to validation messages; `__all__` holds form-wide errors.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub const NON_FIELD: &'static str = "__all__";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }
}

impl From<validator::ValidationErrors> for FormErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut form_errors = FormErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({}).", error.code));
                form_errors.add(&field.to_string(), message);
            }
        }
        form_errors
    }
}

/// Buffer a request body, refusing anything larger than `limit` bytes.
pub async fn read_body(mut payload: web::Payload, limit: usize) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| AppError::BadRequest(format!("Body read error: {}", e)))?;
        if body.len() + chunk.len() > limit {
            return Err(AppError::BadRequest("Request body too large".to_string()));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Bind an url-encoded body into `T`.
pub fn parse_urlencoded<T: DeserializeOwned>(body: &[u8]) -> Result<T> {
    let body = std::str::from_utf8(body)
        .map_err(|_| AppError::BadRequest("Form body is not valid UTF-8".to_string()))?;
    web::Query::<T>::from_query(body)
        .map(web::Query::into_inner)
        .map_err(|e| AppError::BadRequest(format!("Malformed form body: {}", e)))
}

/// Trimmed value, or `None` when missing or blank.
pub(crate) fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
