//! # Watch Loop
//!
//! Controller watch loop that monitors OperandBindInfo resources and triggers
//! reconciliation when changes are detected.
//!
//! Secrets and ConfigMaps are watched too. Each one is mapped to every
//! OperandBindInfo it carries an owner reference to, so a change to a source
//! object re-runs the BindInfos that share it.

use crate::controller::reconciler::ReconcilerError;
use crate::controller::server::ServerState;
use crate::crd::OperandBindInfo;
use crate::ownership::owner_edges;
use crate::runtime::error_policy::{handle_reconciliation_error, reset_backoff};
use crate::runtime::Context;
use futures::StreamExt;
use k8s_openapi::api::core::v1::{ConfigMap, Secret};
use kube::api::Api;
use kube::{Resource, ResourceExt};
use kube_runtime::controller::{self, Action};
use kube_runtime::reflector::ObjectRef;
use kube_runtime::{watcher, Controller};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// APIs the watch loop reads from
#[derive(Clone)]
pub struct WatchedApis {
    pub bind_infos: Api<OperandBindInfo>,
    pub secrets: Api<Secret>,
    pub config_maps: Api<ConfigMap>,
}

impl std::fmt::Debug for WatchedApis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchedApis").finish_non_exhaustive()
    }
}

/// Run the controller watch loop
///
/// Restarts the controller when its stream ends, until a shutdown signal
/// marks the server as not ready.
pub async fn run_watch_loop(
    apis: WatchedApis,
    ctx: Arc<Context>,
    server_state: Arc<ServerState>,
) -> Result<(), anyhow::Error> {
    let shutdown_state = Arc::clone(&server_state);
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for shutdown signal: {}", e);
            return;
        }
        info!("Received shutdown signal (SIGINT/SIGTERM), initiating graceful shutdown...");
        shutdown_state.set_ready(false);
        info!("Marked server as not ready, waiting for in-flight reconciliations to complete...");
    });

    let restart_delay = ctx.config.watch_restart_delay_duration();
    loop {
        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        info!("Starting controller watch loop...");
        Controller::new(
            apis.bind_infos.clone(),
            watcher::Config::default().any_semantic(),
        )
        .watches(
            apis.secrets.clone(),
            watcher::Config::default(),
            owning_bind_infos::<Secret>,
        )
        .watches(
            apis.config_maps.clone(),
            watcher::Config::default(),
            owning_bind_infos::<ConfigMap>,
        )
        .with_config(
            controller::Config::default().concurrency(ctx.config.max_concurrent_reconciliations),
        )
        .shutdown_on_signal()
        .run(reconcile_bind_info, handle_reconciliation_error, Arc::clone(&ctx))
        .for_each(|result| async move {
            match result {
                Ok((object, action)) => {
                    debug!(bindinfo = %object, ?action, "watch.event.reconciled");
                }
                // Already logged and requeued by the error policy
                Err(controller::Error::ReconcilerFailed(_, object)) => {
                    debug!(bindinfo = %object, "watch.event.reconciliation_failed");
                }
                Err(e) => warn!(error = %e, "Controller stream error"),
            }
        })
        .await;

        if !server_state.ready() {
            info!("Shutdown requested, exiting watch loop");
            break;
        }

        warn!(
            "Controller watch stream ended, restarting in {} seconds...",
            restart_delay.as_secs()
        );
        tokio::time::sleep(restart_delay).await;
    }

    info!("Controller stopped gracefully");
    Ok(())
}

async fn reconcile_bind_info(
    obj: Arc<OperandBindInfo>,
    ctx: Arc<Context>,
) -> Result<Action, ReconcilerError> {
    let name = obj.name_any();
    let namespace = obj.namespace().unwrap_or_default();
    ctx.reconciler.reconcile(&name, &namespace).await?;
    reset_backoff(&ctx, &namespace, &name);
    Ok(Action::await_change())
}

/// OperandBindInfos that `object` points back at
pub fn owning_bind_infos<K: Resource>(object: K) -> Vec<ObjectRef<OperandBindInfo>> {
    let namespace = object.meta().namespace.clone();
    let kind = OperandBindInfo::kind(&());
    let api_version = OperandBindInfo::api_version(&());
    owner_edges(object.meta())
        .into_iter()
        .filter(|edge| edge.owner_kind == kind && edge.owner_api_version == api_version)
        .map(|edge| {
            let reference = ObjectRef::new(&edge.owner_name);
            match namespace.as_deref() {
                Some(ns) => reference.within(ns),
                None => reference,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{OperandBindInfoSpec, OperandRequest, OperandRequestSpec};
    use crate::ownership::{set_controller_reference, set_owner_reference};
    use kube::api::ObjectMeta;

    fn owned(name: &str, uid: &str) -> OperandBindInfo {
        let mut bind_info = OperandBindInfo::new(name, OperandBindInfoSpec::default());
        bind_info.metadata.namespace = Some("operands".to_string());
        bind_info.metadata.uid = Some(uid.to_string());
        bind_info
    }

    #[test]
    fn test_source_maps_to_every_referencing_bind_info() {
        let mut secret = Secret {
            metadata: ObjectMeta {
                name: Some("admin".to_string()),
                namespace: Some("operands".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        set_owner_reference(&owned("first", "uid-1"), &mut secret.metadata).unwrap();
        set_owner_reference(&owned("second", "uid-2"), &mut secret.metadata).unwrap();

        let refs = owning_bind_infos(secret);
        assert_eq!(
            refs,
            vec![
                ObjectRef::new("first").within("operands"),
                ObjectRef::new("second").within("operands"),
            ]
        );
    }

    #[test]
    fn test_copies_owned_by_requests_are_not_mapped() {
        let mut request = OperandRequest::new("req", OperandRequestSpec::default());
        request.metadata.namespace = Some("team-a".to_string());
        request.metadata.uid = Some("uid-r".to_string());
        let mut config_map = ConfigMap {
            metadata: ObjectMeta {
                name: Some("endpoint".to_string()),
                namespace: Some("team-a".to_string()),
                ..Default::default()
            },
            ..Default::default()
        };
        set_controller_reference(&request, &mut config_map.metadata).unwrap();

        assert!(owning_bind_infos(config_map).is_empty());
    }
}
