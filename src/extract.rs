use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `Json` with rejections rendered through [`AppError`], so malformed bodies get a 400 `{message}`.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// `Path` with rejections rendered through [`AppError`].
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
