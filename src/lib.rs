pub mod config;
pub mod curator;
pub mod digest;
pub mod dispatch;
pub mod domain;
pub mod email_client;
pub mod news_client;
pub mod routes;
pub mod scheduler;
pub mod startup;
pub mod store;
pub mod telemetry;
pub mod utils;
