// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `herald serve` command implementation.
//!
//! Opens SQLite storage and the Telegram transport, installs the Prometheus
//! recorder, and serves the HTTP gateway until SIGINT or SIGTERM. Broadcasts
//! still running at shutdown stop early and report partial stats.

use std::sync::Arc;

use herald_broadcast::{BroadcastDefaults, Broadcaster};
use herald_config::model::HeraldConfig;
use herald_core::error::HeraldError;
use herald_core::{PluginAdapter, StorageAdapter};
use herald_gateway::{AuthConfig, GatewayState, HealthState, ServerConfig};
use herald_storage::SqliteStorage;
use herald_telegram::TelegramTransport;
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::shutdown;

/// Adapters shared by the serve and broadcast commands.
pub(crate) struct Components {
    pub storage: Arc<SqliteStorage>,
    pub transport: Arc<TelegramTransport>,
}

impl Components {
    pub(crate) async fn open(config: &HeraldConfig) -> Result<Self, HeraldError> {
        let transport = Arc::new(TelegramTransport::new(&config.telegram)?);
        let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
        storage.initialize().await?;
        info!(path = %config.storage.database_path, "storage ready");
        Ok(Self { storage, transport })
    }

    pub(crate) fn broadcaster(&self, config: &HeraldConfig, shutdown: CancellationToken) -> Broadcaster {
        Broadcaster::new(
            self.storage.clone(),
            self.storage.clone(),
            self.storage.clone(),
            self.transport.clone(),
            BroadcastDefaults::from(&config.broadcast),
        )
        .with_shutdown(shutdown)
    }

    pub(crate) async fn close(&self) {
        if let Err(e) = self.storage.shutdown().await {
            warn!(error = %e, "storage did not close cleanly");
        }
        if let Err(e) = self.transport.shutdown().await {
            warn!(error = %e, "transport did not close cleanly");
        }
    }
}

/// Install the global Prometheus recorder and register metric descriptions.
///
/// Returns the render function for `GET /metrics`, or `None` when metrics are
/// disabled or a recorder is already installed.
fn install_metrics(enabled: bool) -> Option<Arc<dyn Fn() -> String + Send + Sync>> {
    if !enabled {
        info!("metrics disabled");
        return None;
    }
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            herald_broadcast::recording::register_metrics();
            info!("prometheus metrics recorder installed");
            Some(Arc::new(move || handle.render()))
        }
        Err(e) => {
            warn!(error = %e, "failed to install Prometheus recorder, metrics disabled");
            None
        }
    }
}

pub async fn run_serve(config: HeraldConfig) -> Result<(), HeraldError> {
    let prometheus_render = install_metrics(config.metrics.enabled);
    let components = Components::open(&config).await?;

    match components.transport.health_check().await? {
        herald_core::HealthStatus::Healthy => info!("telegram bot reachable"),
        status => warn!(?status, "telegram bot is not healthy at startup"),
    }

    let cancel = shutdown::install_signal_handler();

    let state = GatewayState {
        broadcaster: Arc::new(components.broadcaster(&config, cancel.clone())),
        auth: AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
        health: HealthState {
            start_time: std::time::Instant::now(),
            prometheus_render,
            components: vec![
                components.storage.clone() as Arc<dyn PluginAdapter>,
                components.transport.clone() as Arc<dyn PluginAdapter>,
            ],
        },
    };

    let result =
        herald_gateway::start_server(&ServerConfig::from(&config.gateway), state, cancel).await;

    components.close().await;
    info!("herald serve shutdown complete");
    result
}
