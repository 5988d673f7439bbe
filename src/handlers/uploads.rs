//! Multipart helpers shared by the report and article forms.

use crate::{
    errors::AppError,
    services::asset_service::{AssetService, StoredObject, ensure_image, generate_path},
};
use axum::extract::multipart::Field;
use futures::StreamExt;
use std::io;

/// Stream one file part into the asset store under `prefix`.
///
/// Only `image/*` parts are accepted.
pub async fn store_image(
    assets: &AssetService,
    prefix: &str,
    field: Field<'_>,
) -> Result<StoredObject, AppError> {
    let content_type = field.content_type().map(str::to_string);
    ensure_image(content_type.as_deref())?;

    let path = generate_path(prefix, field.file_name());
    let stream = field.map(|chunk| chunk.map_err(|err| io::Error::other(err.body_text())));
    Ok(assets.store_stream(&path, content_type, stream).await?)
}

/// Remove payloads that never got an `assets` row.
pub async fn discard_all(assets: &AssetService, stored: &[StoredObject]) {
    for object in stored {
        assets.discard(&object.path).await;
    }
}
