// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Bridge runtime orchestration.
//!
//! The composition root. Startup order:
//!
//! 1. build the control-plane client and poll until connected;
//! 2. discover machines and subscribe to their trigger nodes;
//! 3. start the extract scheduler and the keep-alive watcher;
//! 4. pump notifications into the dispatcher until shutdown.
//!
//! A lost control-plane session is reconnected by the keep-alive watcher,
//! which restores the subscription set and re-runs discovery; machine
//! sessions are untouched by control-plane churn and re-open lazily on the
//! next dispatch that needs them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use oconn_config::Settings;
use oconn_core::control::ControlPlane;
use oconn_core::registry::DescriptorRegistry;
use oconn_core::sink::{EventSink, NoopSink, TracingSink};
use oconn_core::{
    discover_and_subscribe, Dispatcher, ExtractScheduler, GeneralCollector, MacManCollector,
    Notification, ProgramExecutor, SessionPool,
};
use oconn_opcua::{ControlPlaneClient, OpcUaConfig, RealOpcUaTransport};
use oconn_osp::SimConnector;

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

/// Grace period for in-flight workflows after the dispatcher stops
/// accepting work.
const DRAIN_GRACE: Duration = Duration::from_secs(2);

/// The bridge runtime.
pub struct BridgeRuntime {
    settings: Settings,
    registry: Arc<DescriptorRegistry>,
    shutdown: ShutdownCoordinator,
}

impl BridgeRuntime {
    /// Creates a runtime.
    pub fn new(settings: Settings, registry: DescriptorRegistry) -> Self {
        Self {
            settings,
            registry: Arc::new(registry),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Runs the bridge until a shutdown signal.
    pub async fn run(self) -> BinResult<()> {
        info!(version = oconn_core::VERSION, "Starting OCONN bridge");

        // Control-plane client with its notification channel.
        let (notification_tx, mut notification_rx) = mpsc::unbounded_channel::<Notification>();
        let opcua_config = self.opcua_config();
        let transport = RealOpcUaTransport::new(opcua_config.clone(), notification_tx);
        let client = Arc::new(ControlPlaneClient::new(opcua_config, transport));

        self.connect_with_retries(&client).await?;

        let plane: Arc<dyn ControlPlane> = client.clone();

        // Data plane. The native binding is out of tree; the simulated
        // controller serves both simulate mode and binding-less builds.
        if !self.settings.ospapi_simulate {
            warn!("Native OSPAPI connector not linked in this build, using the simulated controller");
        }
        let connector = Arc::new(SimConnector::new());
        let pool = Arc::new(SessionPool::new(connector, plane.clone()));

        let sink: Arc<dyn EventSink> = if self.settings.eventhub_enabled {
            info!(
                stream = %self.settings.eventhub_name,
                "Event stream enabled"
            );
            Arc::new(TracingSink)
        } else {
            Arc::new(NoopSink)
        };

        // Collectors and dispatcher.
        let general = Arc::new(GeneralCollector::new(
            plane.clone(),
            pool.clone(),
            self.registry.clone(),
        ));
        let macman = Arc::new(MacManCollector::new(plane.clone(), pool.clone(), sink));
        let program = Arc::new(ProgramExecutor::new(plane.clone(), pool.clone()));
        let dispatcher = Arc::new(Dispatcher::new(general, macman, program));

        // Initial discovery + subscriptions.
        let report = discover_and_subscribe(&plane)
            .await
            .map_err(|e| BinError::Initialization(format!("discovery: {}", e)))?;
        info!(
            machines = report.machines.len(),
            triggers = report.trigger_count(),
            "Fleet discovered"
        );

        // Periodic MacMan trigger.
        let scheduler = Arc::new(ExtractScheduler::new(
            plane.clone(),
            self.settings.macman_extract_interval,
        ));
        let scheduler_handle = scheduler.start();

        // Keep-alive: reconnect, restore subscriptions, rediscover.
        let keepalive_handle = {
            let client = client.clone();
            let plane = plane.clone();
            let token = self.shutdown.token();
            let interval = self.settings.reconnect_interval;
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    if token.is_requested() {
                        break;
                    }
                    if client.is_connected() {
                        continue;
                    }
                    if let Err(e) = client.reconnect().await {
                        warn!(error = %e, "Reconnect attempt failed");
                        continue;
                    }
                    if let Err(e) = discover_and_subscribe(&plane).await {
                        warn!(error = %e, "Post-reconnect discovery failed");
                    }
                }
            })
        };

        // Signal watcher.
        let signal_handle = {
            let coordinator = self.shutdown.clone();
            tokio::spawn(async move {
                coordinator.wait_for_signal().await;
            })
        };

        info!("OCONN bridge is ready");

        // Notification pump: cheap routing only; workflows run on their
        // own tasks inside the dispatcher.
        let mut shutdown_rx = self.shutdown.subscribe();
        loop {
            tokio::select! {
                maybe = notification_rx.recv() => {
                    match maybe {
                        Some(notification) => dispatcher.handle(notification),
                        None => {
                            warn!("Notification channel closed");
                            break;
                        }
                    }
                }
                _ = shutdown_rx.recv() => break,
            }
        }

        // Drain and tear down.
        info!("Shutting down");
        dispatcher.stop_accepting();
        tokio::time::sleep(DRAIN_GRACE).await;

        if let Some(handle) = scheduler_handle {
            handle.abort();
        }
        keepalive_handle.abort();
        signal_handle.abort();

        pool.shutdown().await;
        client.shutdown().await.ok();

        info!("OCONN bridge shutdown complete");
        Ok(())
    }

    fn opcua_config(&self) -> OpcUaConfig {
        OpcUaConfig::new(self.settings.opcua_server_url.clone())
            .with_credentials(
                self.settings.opcua_username.clone(),
                self.settings.opcua_password.clone(),
            )
            .with_publishing_interval(self.settings.publishing_interval)
            .with_sampling_interval(self.settings.sampling_interval)
    }

    /// Polls the control plane until connected, bounded by
    /// `OPCUA_MAX_RECONNECT_ATTEMPTS` (0 = forever).
    async fn connect_with_retries(
        &self,
        client: &ControlPlaneClient<RealOpcUaTransport>,
    ) -> BinResult<()> {
        let max_attempts = self.settings.max_reconnect_attempts;
        let mut attempts = 0u32;

        loop {
            match client.connect().await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempts += 1;
                    if max_attempts > 0 && attempts >= max_attempts {
                        return Err(BinError::Initialization(format!(
                            "control plane unreachable after {} attempts: {}",
                            attempts, e
                        )));
                    }
                    warn!(
                        attempt = attempts,
                        error = %e,
                        retry_in_secs = self.settings.reconnect_interval.as_secs(),
                        "Control plane unreachable, retrying"
                    );
                    tokio::time::sleep(self.settings.reconnect_interval).await;
                }
            }
        }
    }
}
