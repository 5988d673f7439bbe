//! ConservationService: read access to volunteer opportunities.

use crate::{
    models::{
        asset::owner,
        conservation::{Conservation, ConservationView},
    },
    services::asset_service::{AssetError, AssetService},
};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConservationError {
    #[error("conservation entry {0} not found")]
    NotFound(i64),
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

const CONSERVATION_COLUMNS: &str = "id, title, location, description, link, created_at";

/// Case-insensitive substring filters for the opportunity listing. An empty
/// string matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConservationFilter {
    /// Matched against title or description.
    pub search: String,
    pub location: String,
}

impl ConservationFilter {
    pub fn admits(&self, entry: &Conservation) -> bool {
        let search = self.search.to_lowercase();
        let location = self.location.to_lowercase();
        let search_hit = search.is_empty()
            || contains_folded(Some(&entry.title), &search)
            || contains_folded(entry.description.as_deref(), &search);
        search_hit && (location.is_empty() || contains_folded(entry.location.as_deref(), &location))
    }
}

fn contains_folded(field: Option<&str>, needle: &str) -> bool {
    field.unwrap_or_default().to_lowercase().contains(needle)
}

#[derive(Clone)]
pub struct ConservationService {
    pub db: Arc<SqlitePool>,
    pub assets: AssetService,
}

impl ConservationService {
    pub fn new(db: Arc<SqlitePool>, assets: AssetService) -> Self {
        Self { db, assets }
    }

    /// Newest first, each with its first image.
    pub async fn list(&self, filter: &ConservationFilter) -> Result<Vec<ConservationView>, ConservationError> {
        let rows = sqlx::query_as::<_, Conservation>(&format!(
            "SELECT {CONSERVATION_COLUMNS} FROM conservation ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(&*self.db)
        .await?;

        let mut images = self.assets.first_paths(owner::CONSERVATION).await?;
        Ok(rows
            .into_iter()
            .filter(|row| filter.admits(row))
            .map(|conservation| {
                let image_url = images
                    .remove(&conservation.id)
                    .map(|path| self.assets.public_url_for(&path))
                    .unwrap_or_default();
                ConservationView {
                    conservation,
                    image_url,
                }
            })
            .collect())
    }

    pub async fn get(&self, id: i64) -> Result<ConservationView, ConservationError> {
        let conservation = sqlx::query_as::<_, Conservation>(&format!(
            "SELECT {CONSERVATION_COLUMNS} FROM conservation WHERE id = ?"
        ))
        .bind(id)
        .fetch_one(&*self.db)
        .await
        .map_err(|err| match err {
            sqlx::Error::RowNotFound => ConservationError::NotFound(id),
            other => ConservationError::Sqlx(other),
        })?;

        let image_url = self
            .assets
            .list_for(owner::CONSERVATION, id)
            .await?
            .first()
            .map(|asset| self.assets.public_url_for(&asset.path))
            .unwrap_or_default();
        Ok(ConservationView {
            conservation,
            image_url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{db, services::timestamp::now_text};
    use bytes::Bytes;
    use futures::stream;

    #[tokio::test]
    async fn entries_carry_their_first_image() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::test_pool().await;
        let assets = AssetService::new(pool.clone(), dir.path(), "http://cdn.test");
        let service = ConservationService::new(pool.clone(), assets.clone());

        for title in ["Bersih Pantai", "Tanam Mangrove"] {
            sqlx::query("INSERT INTO conservation (title, location, created_at) VALUES (?, 'Bali', ?)")
                .bind(title)
                .bind(now_text())
                .execute(&*pool)
                .await
                .unwrap();
        }
        let stored = assets
            .store_stream(
                "conservation/beach.jpg",
                Some("image/jpeg".into()),
                stream::iter(vec![Ok(Bytes::from_static(b"jpg"))]),
            )
            .await
            .unwrap();
        assets.attach(&stored, Some(owner::CONSERVATION), Some(1)).await.unwrap();

        let later = assets
            .store_stream(
                "conservation/second.jpg",
                Some("image/jpeg".into()),
                stream::iter(vec![Ok(Bytes::from_static(b"jpg"))]),
            )
            .await
            .unwrap();
        assets.attach(&later, Some(owner::CONSERVATION), Some(1)).await.unwrap();

        let first = service.get(1).await.unwrap();
        assert_eq!(first.image_url, "http://cdn.test/assets/conservation/beach.jpg");
        assert_eq!(service.get(2).await.unwrap().image_url, "");
        assert!(matches!(service.get(3).await, Err(ConservationError::NotFound(3))));

        let listed = service.list(&ConservationFilter::default()).await.unwrap();
        let urls: Vec<(i64, &str)> = listed
            .iter()
            .map(|view| (view.conservation.id, view.image_url.as_str()))
            .collect();
        assert_eq!(
            urls,
            vec![(2, ""), (1, "http://cdn.test/assets/conservation/beach.jpg")]
        );
    }

    fn entry(id: i64, title: &str, location: Option<&str>, description: Option<&str>) -> Conservation {
        Conservation {
            id,
            title: title.to_string(),
            location: location.map(str::to_string),
            description: description.map(str::to_string),
            link: None,
            created_at: "2024-03-01 09:00:00".to_string(),
        }
    }

    #[test]
    fn filter_matches_title_or_description_and_location() {
        let beach = entry(1, "Bersih Pantai Kuta", Some("Bali"), Some("Collect plastic on the shore"));
        let mangrove = entry(2, "Tanam Mangrove", Some("Jakarta Utara"), None);

        let by_search = |search: &str| ConservationFilter {
            search: search.into(),
            ..Default::default()
        };
        assert!(by_search("pantai").admits(&beach));
        assert!(by_search("PLASTIC").admits(&beach));
        assert!(!by_search("plastic").admits(&mangrove));
        assert!(!by_search("bali").admits(&beach));
        assert!(!by_search("   ").admits(&mangrove));

        let by_location = ConservationFilter {
            location: "jakarta".into(),
            ..Default::default()
        };
        assert!(by_location.admits(&mangrove));
        assert!(!by_location.admits(&beach));

        let both = ConservationFilter {
            search: "mangrove".into(),
            location: "bali".into(),
        };
        assert!(!both.admits(&mangrove));
        assert!(ConservationFilter::default().admits(&entry(3, "", None, None)));
    }

    #[tokio::test]
    async fn list_applies_filter() {
        let dir = tempfile::tempdir().unwrap();
        let pool = db::test_pool().await;
        let assets = AssetService::new(pool.clone(), dir.path(), "http://cdn.test");
        let service = ConservationService::new(pool.clone(), assets);

        for (title, location) in [("Bersih Pantai", "Bali"), ("Tanam Mangrove", "Jakarta")] {
            sqlx::query("INSERT INTO conservation (title, location, created_at) VALUES (?, ?, ?)")
                .bind(title)
                .bind(location)
                .bind(now_text())
                .execute(&*pool)
                .await
                .unwrap();
        }

        let filter = ConservationFilter {
            location: "BALI".into(),
            ..Default::default()
        };
        let listed = service.list(&filter).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].conservation.title, "Bersih Pantai");
    }
}
