pub mod analytics;
pub mod health;
pub mod sleep_logs;
pub mod tips;
