pub mod admin_handlers;
pub mod article_handlers;
pub mod asset_handlers;
pub mod conservation_handlers;
pub mod health_handlers;
pub mod prediction_handlers;
pub mod report_handlers;
pub mod subscription_handlers;
pub mod uploads;
