//! src/services/asset_service.rs
//!
//! AssetService: image storage for reports, articles and conservation
//! entries. Payloads live on local disk sharded beneath
//! `base_path/{shard}/{shard}/{path}`; the `assets` table links each stored
//! path to the record that owns it.

use crate::{models::asset::{Asset, AssetView}, services::timestamp::now_text};
use bytes::Bytes;
use futures::{Stream, StreamExt, pin_mut};
use md5::Context;
use sqlx::SqlitePool;
use std::{
    collections::HashMap,
    io::{self, ErrorKind},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset `{0}` not found")]
    NotFound(String),
    #[error("invalid asset path")]
    InvalidPath,
    #[error("unsupported content type `{0}`, expected an image")]
    NotAnImage(String),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type AssetResult<T> = Result<T, AssetError>;

/// A payload written to disk that has no `assets` row yet.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub path: String,
    pub content_type: Option<String>,
    pub size_bytes: i64,
    pub etag: String,
}

#[derive(Clone)]
pub struct AssetService {
    pub db: Arc<SqlitePool>,

    /// Base directory on disk where payloads are stored.
    pub base_path: PathBuf,

    /// Externally reachable origin used to build asset URLs.
    pub public_url: String,
}

const MAX_PATH_LEN: usize = 1024;
const MAX_FILENAME_LEN: usize = 100;
const ASSET_COLUMNS: &str =
    "id, model_type, model_id, path, content_type, size_bytes, etag, created_at";

impl AssetService {
    pub fn new(db: Arc<SqlitePool>, base_path: impl Into<PathBuf>, public_url: &str) -> Self {
        Self {
            db,
            base_path: base_path.into(),
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    /// Basic path validation to avoid trivial path traversal vectors.
    fn ensure_path_safe(&self, path: &str) -> AssetResult<()> {
        if path.is_empty() || path.len() > MAX_PATH_LEN {
            return Err(AssetError::InvalidPath);
        }
        if path.starts_with('/') || path.contains("..") {
            return Err(AssetError::InvalidPath);
        }
        if path
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(AssetError::InvalidPath);
        }
        Ok(())
    }

    /// Two-level shard directories from MD5(path), as lowercase hex bytes.
    fn object_shards(path: &str) -> (String, String) {
        let digest = md5::compute(path);
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    fn object_path(&self, path: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::object_shards(path);
        let mut full = self.base_path.clone();
        full.push(shard_a);
        full.push(shard_b);
        full.push(path);
        full
    }

    pub fn public_url_for(&self, path: &str) -> String {
        format!("{}/assets/{}", self.public_url, path)
    }

    pub fn view(&self, asset: Asset) -> AssetView {
        AssetView {
            url: self.public_url_for(&asset.path),
            asset,
        }
    }

    /// Stream a payload to disk under `path`.
    ///
    /// Writes to a temporary file while computing size and MD5, fsyncs, then
    /// renames into place. The temp file is removed on any error.
    pub async fn store_stream<S>(
        &self,
        path: &str,
        content_type: Option<String>,
        stream: S,
    ) -> AssetResult<StoredObject>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        self.ensure_path_safe(path)?;

        let file_path = self.object_path(path);
        let parent = file_path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| io::Error::other("asset path missing parent directory"))?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(AssetError::Io(err));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(AssetError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AssetError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AssetError::Io(err));
        }

        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(AssetError::Io(err));
        }

        debug!("stored {} ({} bytes)", path, size_bytes);
        Ok(StoredObject {
            path: path.to_string(),
            content_type,
            size_bytes,
            etag: format!("{:x}", digest.compute()),
        })
    }

    /// Record a stored payload in `assets`, linked to its owner.
    ///
    /// The payload is removed again if the row cannot be written.
    pub async fn attach(
        &self,
        stored: &StoredObject,
        model_type: Option<&str>,
        model_id: Option<i64>,
    ) -> AssetResult<Asset> {
        let insert_result = sqlx::query_as::<_, Asset>(&format!(
            "INSERT INTO assets (model_type, model_id, path, content_type, size_bytes, etag, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?)
             RETURNING {ASSET_COLUMNS}"
        ))
        .bind(model_type)
        .bind(model_id)
        .bind(&stored.path)
        .bind(&stored.content_type)
        .bind(stored.size_bytes)
        .bind(&stored.etag)
        .bind(now_text())
        .fetch_one(&*self.db)
        .await;

        match insert_result {
            Ok(asset) => Ok(asset),
            Err(err) => {
                self.discard(&stored.path).await;
                Err(AssetError::Sqlx(err))
            }
        }
    }

    /// Best-effort removal of a payload that has no row, or whose row is gone.
    pub async fn discard(&self, path: &str) {
        if self.ensure_path_safe(path).is_err() {
            return;
        }
        let file_path = self.object_path(path);
        match fs::remove_file(&file_path).await {
            Ok(_) => debug!("removed physical file {}", file_path.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("file {} already missing", file_path.display());
            }
            Err(err) => debug!("failed to remove {}: {}", file_path.display(), err),
        }
        if let Some(parent) = file_path.parent() {
            self.prune_empty_dirs(parent, &self.base_path).await;
        }
    }

    pub async fn find(&self, id: i64) -> AssetResult<Asset> {
        sqlx::query_as::<_, Asset>(&format!("SELECT {ASSET_COLUMNS} FROM assets WHERE id = ?"))
            .bind(id)
            .fetch_one(&*self.db)
            .await
            .map_err(|err| match err {
                sqlx::Error::RowNotFound => AssetError::NotFound(id.to_string()),
                other => AssetError::Sqlx(other),
            })
    }

    /// Assets owned by one record, oldest first.
    pub async fn list_for(&self, model_type: &str, model_id: i64) -> AssetResult<Vec<Asset>> {
        let assets = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets
             WHERE model_type = ? AND model_id = ? ORDER BY id ASC"
        ))
        .bind(model_type)
        .bind(model_id)
        .fetch_all(&*self.db)
        .await?;
        Ok(assets)
    }

    /// Path of the oldest asset of every record of one owner kind, keyed by
    /// record id.
    pub async fn first_paths(&self, model_type: &str) -> AssetResult<HashMap<i64, String>> {
        let rows = sqlx::query_as::<_, (i64, String)>(
            "SELECT model_id, path FROM assets
             WHERE id IN (
                 SELECT MIN(id) FROM assets
                 WHERE model_type = ? AND model_id IS NOT NULL
                 GROUP BY model_id
             )",
        )
        .bind(model_type)
        .fetch_all(&*self.db)
        .await?;
        Ok(rows.into_iter().collect())
    }

    /// Open a payload for streaming out, together with its metadata row.
    pub async fn open(&self, path: &str) -> AssetResult<(Asset, File)> {
        self.ensure_path_safe(path)?;
        let asset = sqlx::query_as::<_, Asset>(&format!(
            "SELECT {ASSET_COLUMNS} FROM assets WHERE path = ?"
        ))
        .bind(path)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => AssetError::NotFound(path.to_string()),
            other => AssetError::Sqlx(other),
        })?;

        let file = File::open(self.object_path(path)).await.map_err(|err| {
            if err.kind() == ErrorKind::NotFound {
                AssetError::NotFound(path.to_string())
            } else {
                AssetError::Io(err)
            }
        })?;

        Ok((asset, file))
    }

    /// Delete one asset row and its payload.
    pub async fn delete(&self, id: i64) -> AssetResult<Asset> {
        let asset = sqlx::query_as::<_, Asset>(&format!(
            "DELETE FROM assets WHERE id = ? RETURNING {ASSET_COLUMNS}"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => AssetError::NotFound(id.to_string()),
            other => AssetError::Sqlx(other),
        })?;
        self.discard(&asset.path).await;
        Ok(asset)
    }

    /// Delete every asset owned by one record. Returns how many were removed.
    pub async fn delete_for(&self, model_type: &str, model_id: i64) -> AssetResult<usize> {
        let removed = sqlx::query_as::<_, Asset>(&format!(
            "DELETE FROM assets WHERE model_type = ? AND model_id = ? RETURNING {ASSET_COLUMNS}"
        ))
        .bind(model_type)
        .bind(model_id)
        .fetch_all(&*self.db)
        .await?;
        for asset in &removed {
            self.discard(&asset.path).await;
        }
        Ok(removed.len())
    }

    /// Recursively remove empty directories up to the storage root.
    async fn prune_empty_dirs(&self, start: &Path, stop: &Path) {
        let mut current = start.to_path_buf();
        while current.starts_with(stop) && current != stop {
            match fs::remove_dir(&current).await {
                Ok(_) => {
                    if let Some(parent) = current.parent() {
                        current = parent.to_path_buf();
                    } else {
                        break;
                    }
                }
                Err(err) if err.kind() == ErrorKind::NotFound => break,
                Err(err) if err.kind() == ErrorKind::DirectoryNotEmpty => break,
                Err(err) => {
                    debug!("failed to prune directory {}: {}", current.display(), err);
                    break;
                }
            }
        }
    }
}

/// Build a collision-free storage path such as `report-images/<uuid>-river.jpg`.
pub fn generate_path(prefix: &str, filename: Option<&str>) -> String {
    format!("{}/{}-{}", prefix, Uuid::new_v4(), sanitize_filename(filename))
}

/// Accept only `image/*` content types.
pub fn ensure_image(content_type: Option<&str>) -> AssetResult<()> {
    match content_type {
        Some(ct) if ct.to_ascii_lowercase().starts_with("image/") => Ok(()),
        other => Err(AssetError::NotAnImage(other.unwrap_or("none").to_string())),
    }
}

fn sanitize_filename(filename: Option<&str>) -> String {
    let name = filename
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .unwrap_or_default();
    let cleaned: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .take(MAX_FILENAME_LEN)
        .collect();
    let mut cleaned = cleaned.trim_matches('.').to_string();
    while cleaned.contains("..") {
        cleaned = cleaned.replace("..", ".");
    }
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}
