pub mod article_service;
pub mod asset_service;
pub mod conservation_service;
pub mod prediction_service;
pub mod report_filter;
pub mod report_service;
pub mod severity_aggregator;
pub mod status_transition;
pub mod subscription_service;
pub mod timestamp;
