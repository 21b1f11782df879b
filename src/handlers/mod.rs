// src/handlers/mod.rs

pub mod admin;
pub mod assessment;
pub mod auth;
pub mod background;
pub mod profile;
pub mod session;

use crate::config::Config;

/// Fixed artificial delay, used to mimic a remote backend during demos.
pub(crate) async fn simulate_latency(config: &Config) {
    if !config.simulated_latency.is_zero() {
        tokio::time::sleep(config.simulated_latency).await;
    }
}
