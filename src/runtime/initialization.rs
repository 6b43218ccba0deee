//! # Initialization
//!
//! Controller initialization logic including rustls setup, tracing, metrics,
//! server startup, and Kubernetes client setup.

use crate::config::ControllerConfig;
use crate::controller::reconciler::Reconciler;
use crate::controller::server::{start_server, ServerState};
use crate::crd::OperandBindInfo;
use crate::events::KubeEventSink;
use crate::observability;
use crate::runtime::watch_loop::WatchedApis;
use crate::runtime::Context;
use crate::store::KubeStore;
use anyhow::{Context as _, Result};
use kube::api::{Api, ListParams};
use kube::Client;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

/// Initialization result containing all necessary components for the controller
pub struct InitializationResult {
    /// APIs handed to the watch loop
    pub apis: WatchedApis,
    /// Reconciler context shared across reconciliations
    pub context: Arc<Context>,
    /// Server state for health checks
    pub server_state: Arc<ServerState>,
}

impl std::fmt::Debug for InitializationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InitializationResult")
            .field("server_ready", &self.server_state.ready())
            .finish_non_exhaustive()
    }
}

/// Initialize the controller runtime
///
/// Installs the rustls provider, sets up tracing and metrics, starts the
/// HTTP server, connects to the cluster and checks that the OperandBindInfo
/// CRD is served before the watch loop starts.
pub async fn initialize() -> Result<InitializationResult> {
    // Must happen before any client is built
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        warn!("rustls crypto provider already installed");
    }

    let config = ControllerConfig::from_env();
    observability::init_tracing(config.log_format).context("Failed to initialize tracing")?;

    info!("Starting OperandBindInfo controller");
    info!(
        "Build info: datetime={}, git_hash={}",
        env!("BUILD_DATETIME"),
        env!("BUILD_GIT_HASH")
    );
    info!(
        metrics_port = config.metrics_port,
        watch_namespace = config.watch_namespace.as_deref().unwrap_or("<all>"),
        max_concurrent_reconciliations = config.max_concurrent_reconciliations,
        "Controller configuration loaded"
    );

    observability::metrics::register_metrics()?;

    let server_state = Arc::new(ServerState::default());
    let server_port = config.metrics_port;
    let server_state_clone = Arc::clone(&server_state);
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_port, server_state_clone).await {
            error!("HTTP server error: {}", e);
        }
    });
    wait_for_server_ready(
        &server_state,
        &server_handle,
        Duration::from_secs(config.server_startup_timeout_secs),
        Duration::from_millis(config.server_poll_interval_ms),
    )
    .await?;

    let client = Client::try_default()
        .await
        .context("Failed to create Kubernetes client")?;

    let apis = match config.watch_namespace.as_deref() {
        Some(namespace) => WatchedApis {
            bind_infos: Api::namespaced(client.clone(), namespace),
            secrets: Api::namespaced(client.clone(), namespace),
            config_maps: Api::namespaced(client.clone(), namespace),
        },
        None => WatchedApis {
            bind_infos: Api::all(client.clone()),
            secrets: Api::all(client.clone()),
            config_maps: Api::all(client.clone()),
        },
    };

    check_crd_queryable(&apis.bind_infos).await?;

    let reconciler = Reconciler::new(
        KubeStore::new(client.clone()),
        KubeEventSink::new(client, &config.controller_name),
    );
    let context = Arc::new(Context::new(reconciler, config));

    info!("Controller initialized, starting watch loop...");

    Ok(InitializationResult {
        apis,
        context,
        server_state,
    })
}

/// Wait for the HTTP server to become ready
async fn wait_for_server_ready(
    server_state: &Arc<ServerState>,
    server_handle: &tokio::task::JoinHandle<()>,
    startup_timeout: Duration,
    poll_interval: Duration,
) -> Result<()> {
    let start_time = Instant::now();

    loop {
        if server_handle.is_finished() {
            return Err(anyhow::anyhow!("HTTP server failed to start"));
        }

        if server_state.ready() {
            info!("HTTP server is ready and accepting connections");
            return Ok(());
        }

        if start_time.elapsed() > startup_timeout {
            return Err(anyhow::anyhow!(
                "HTTP server failed to become ready within {} seconds",
                startup_timeout.as_secs()
            ));
        }

        tokio::time::sleep(poll_interval).await;
    }
}

/// Fail fast when the OperandBindInfo CRD is not installed, and log what is
/// already there.
async fn check_crd_queryable(bind_infos: &Api<OperandBindInfo>) -> Result<()> {
    let list = bind_infos
        .list(&ListParams::default())
        .await
        .context("OperandBindInfo CRD is not queryable; is it installed?")?;

    let mut by_namespace: BTreeMap<String, usize> = BTreeMap::new();
    for item in &list.items {
        let namespace = item.metadata.namespace.clone().unwrap_or_default();
        *by_namespace.entry(namespace).or_default() += 1;
    }

    info!(
        total = list.items.len(),
        namespaces = by_namespace.len(),
        "CRD is queryable, found existing OperandBindInfo resources"
    );
    for (namespace, count) in &by_namespace {
        info!(%namespace, count, "Existing OperandBindInfo resources");
    }
    Ok(())
}
