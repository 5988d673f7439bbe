//! Serves stored images. Bodies are streamed from disk, never buffered.

use crate::{
    errors::AppError, models::asset::Asset, services::timestamp::parse_timestamp, state::AppState,
};
use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::Response,
};
use tokio_util::io::ReaderStream;

/// GET `/assets/{*path}`
pub async fn get_asset(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response, AppError> {
    let (meta, file) = state.assets.open(&path).await?;
    let body = Body::from_stream(ReaderStream::new(file));

    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    set_asset_headers(response.headers_mut(), &meta);
    Ok(response)
}

fn set_asset_headers(headers: &mut HeaderMap, meta: &Asset) {
    let content_type = meta
        .content_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".into());
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(&content_type)
            .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
    );

    headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from(meta.size_bytes.max(0)),
    );

    if let Some(etag) = meta.etag.as_ref() {
        let quoted = format!("\"{}\"", etag);
        if let Ok(value) = HeaderValue::from_str(&quoted) {
            headers.insert(header::ETAG, value);
        }
    }

    if let Some(modified) = parse_timestamp(&meta.created_at) {
        if let Ok(value) = HeaderValue::from_str(&modified.to_rfc2822()) {
            headers.insert(header::LAST_MODIFIED, value);
        }
    }

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=86400"),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn asset(content_type: Option<&str>, created_at: &str) -> Asset {
        Asset {
            id: 1,
            model_type: None,
            model_id: None,
            path: "report-images/a.png".into(),
            content_type: content_type.map(str::to_string),
            size_bytes: 42,
            etag: Some("abc123".into()),
            created_at: created_at.into(),
        }
    }

    #[test]
    fn headers_describe_the_payload() {
        let mut headers = HeaderMap::new();
        set_asset_headers(&mut headers, &asset(Some("image/png"), "2024-01-15T08:00:00Z"));
        assert_eq!(headers[header::CONTENT_TYPE], "image/png");
        assert_eq!(headers[header::CONTENT_LENGTH], "42");
        assert_eq!(headers[header::ETAG], "\"abc123\"");
        assert_eq!(headers[header::LAST_MODIFIED], "Mon, 15 Jan 2024 08:00:00 +0000");
    }

    #[test]
    fn unknown_type_and_bad_timestamp_degrade_quietly() {
        let mut headers = HeaderMap::new();
        set_asset_headers(&mut headers, &asset(None, "yesterday"));
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert!(headers.get(header::LAST_MODIFIED).is_none());
    }
}
