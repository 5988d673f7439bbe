//! Shared application state handed to every handler.

use crate::{
    config::AppConfig,
    services::{
        article_service::ArticleService, asset_service::AssetService,
        conservation_service::ConservationService, prediction_service::PredictionService,
        report_service::ReportService, subscription_service::SubscriptionService,
    },
};
use anyhow::{Context, Result};
use chrono::FixedOffset;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<SqlitePool>,
    pub reports: ReportService,
    pub assets: AssetService,
    pub articles: ArticleService,
    pub conservation: ConservationService,
    pub subscriptions: SubscriptionService,
    pub predictor: PredictionService,
    /// Offset whose calendar months the dashboard chart uses.
    pub chart_offset: FixedOffset,
}

impl AppState {
    pub fn new(db: Arc<SqlitePool>, cfg: &AppConfig) -> Result<Self> {
        let assets = AssetService::new(db.clone(), cfg.storage_dir.clone(), &cfg.public_url);
        let chart_offset = FixedOffset::east_opt(cfg.utc_offset_minutes * 60)
            .with_context(|| format!("UTC offset of {} minutes is out of range", cfg.utc_offset_minutes))?;
        let predictor = PredictionService::new(&cfg.prediction_url)
            .context("building prediction service client")?;

        Ok(Self {
            reports: ReportService::new(db.clone()),
            articles: ArticleService::new(db.clone(), assets.clone()),
            conservation: ConservationService::new(db.clone(), assets.clone()),
            subscriptions: SubscriptionService::new(db.clone()),
            assets,
            predictor,
            chart_offset,
            db,
        })
    }
}
