//! Embedded static assets
//!
//! In development, falls back to serving from the filesystem.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    response::{IntoResponse, Response},
};
use rust_embed::Embed;
use std::borrow::Cow;
use std::path::PathBuf;

const UI_DIR: &str = "ui";

#[derive(Embed)]
#[folder = "ui"]
struct Assets;

fn asset_response(path: &str, data: Cow<'static, [u8]>) -> Response {
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, mime.as_ref().to_string())],
        Body::from(data),
    )
        .into_response()
}

fn load(path: &str) -> Option<Cow<'static, [u8]>> {
    if let Some(content) = Assets::get(path) {
        return Some(content.data);
    }
    // Reject traversal before touching the filesystem.
    if path.split('/').any(|part| part == "..") {
        return None;
    }
    std::fs::read(PathBuf::from(UI_DIR).join(path))
        .ok()
        .map(Cow::Owned)
}

/// Serve embedded static files, with filesystem fallback for development
pub async fn serve_static(req: Request<Body>) -> Response {
    let path = req.uri().path().trim_start_matches('/');
    match load(path) {
        Some(data) => asset_response(path, data),
        None => (StatusCode::NOT_FOUND, "Not found").into_response(),
    }
}

/// Get the index.html content (embedded or from filesystem)
pub fn get_index_html() -> Option<String> {
    load("index.html").and_then(|data| String::from_utf8(data.into_owned()).ok())
}
