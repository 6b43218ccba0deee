//! # Reconcile
//!
//! One reconcile pass for one OperandBindInfo.
//!
//! ## Flow
//!
//! 1. Load the BindInfo; a missing BindInfo is a no-op
//! 2. Default the registry namespace, stamp the registry label, persist
//! 3. Initialise the status on first sight
//! 4. Resolve the OperandRegistry
//! 5. Stop quietly when nobody requested the operand
//! 6. Fail when the registry does not place the operand
//! 7. For each consumer outside the operand namespace, copy every public
//!    binding (Secret first, then ConfigMap)
//! 8. Record `Completed` or `Failed`
//!
//! Failures inside step 7 are collected and never stop the loop.

use crate::controller::reconciler::registry;
use crate::controller::reconciler::request::binding_targets;
use crate::controller::reconciler::status::{unique_namespaces, update_phase, SyncError, SyncErrors};
use crate::controller::reconciler::sync::{sync_config_map, sync_secret, SyncOutcome, SyncTarget};
use crate::controller::reconciler::types::{
    ReconcileOutcome, Reconciler, ReconcilerError, SyncSummary,
};
use crate::crd::{BindInfoPhase, Binding, OperandBindInfo, OperandRequest, ReconcileRequest};
use crate::events::{reasons, EventSink, Severity};
use crate::observability::metrics;
use crate::store::ObjectStore;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::Resource;
use std::time::Instant;
use tracing::{debug, error, info, info_span, warn, Instrument};

impl SyncSummary {
    fn record(&mut self, outcome: SyncOutcome) {
        match outcome {
            SyncOutcome::Skipped => {}
            SyncOutcome::SourceMissing => self.missing += 1,
            SyncOutcome::Copied { created: true } => self.created += 1,
            SyncOutcome::Copied { created: false } => self.updated += 1,
        }
    }
}

impl<S: ObjectStore, E: EventSink> Reconciler<S, E> {
    /// Run one pass for the OperandBindInfo `namespace/name`
    pub async fn reconcile(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let span = info_span!("reconcile", bindinfo = name, namespace);
        async {
            let start = Instant::now();
            metrics::increment_reconciliations();
            let result = self.reconcile_pass(name, namespace).await;
            metrics::observe_reconciliation_duration(start.elapsed().as_secs_f64());

            match &result {
                Ok(outcome) => debug!(?outcome, "Reconciliation finished"),
                Err(e) => error!(error = %e, "Reconciliation failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn reconcile_pass(
        &self,
        name: &str,
        namespace: &str,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let mut bind_info = match self.store.get::<OperandBindInfo>(name, namespace).await {
            Ok(bind_info) => bind_info,
            Err(e) if e.is_not_found() => {
                debug!("OperandBindInfo no longer exists");
                return Ok(ReconcileOutcome::Deleted);
            }
            Err(e) => return Err(e.into()),
        };
        info!("Reconciling OperandBindInfo");

        let defaulted = bind_info.set_defaults();
        let labelled = bind_info.add_registry_label();
        if defaulted || labelled {
            bind_info = self.store.update(&bind_info).await?;
        }

        if bind_info.init_status() {
            debug!("Initializing OperandBindInfo status");
            bind_info = self
                .store
                .update_bind_info_status(&bind_info)
                .await
                .map_err(ReconcilerError::Status)?;
        }

        let subject = bind_info.object_ref(&());
        let registry_name = bind_info.spec.registry.clone();
        let registry_namespace = bind_info.registry_namespace().to_string();
        let operand = bind_info.spec.operand.clone();

        let resolved =
            match registry::resolve(&self.store, &registry_name, &registry_namespace, &operand)
                .await
            {
                Ok(resolved) => resolved,
                Err(e) if e.is_not_found() => {
                    self.events
                        .emit(
                            &subject,
                            Severity::Warning,
                            reasons::NOT_FOUND,
                            format!(
                                "NotFound OperandRegistry {registry_name} from the namespace {registry_namespace}"
                            ),
                        )
                        .await;
                    return Err(ReconcilerError::RegistryNotFound {
                        name: registry_name,
                        namespace: registry_namespace,
                    });
                }
                Err(e) => return Err(e.into()),
            };

        if resolved.consumers.is_empty() {
            info!(%operand, "No OperandRequest depends on the operand, nothing to do");
            return Ok(ReconcileOutcome::NoConsumers);
        }

        let Some(source_namespace) = resolved.source_namespace else {
            error!(%operand, registry = %registry_name, "Operand not found in the OperandRegistry");
            self.events
                .emit(
                    &subject,
                    Severity::Warning,
                    reasons::OPERAND_NOT_FOUND,
                    format!("Operand {operand} not found in the OperandRegistry {registry_name}"),
                )
                .await;
            return Err(ReconcilerError::OperandNotFound {
                operand,
                registry: registry_name,
            });
        };

        let mut errors = SyncErrors::default();
        let mut summary = SyncSummary::default();
        for consumer in &resolved.consumers {
            if consumer.namespace == source_namespace {
                debug!(
                    consumer_namespace = %consumer.namespace,
                    "Skipping copy into the operand namespace itself"
                );
                continue;
            }
            let Some(request) = self
                .load_request(consumer, &subject, &mut errors)
                .await
            else {
                continue;
            };

            let targets = binding_targets(&request, &registry_name, &registry_namespace, &operand);
            debug!(
                consumer_namespace = %consumer.namespace,
                secret = %targets.secret,
                configmap = %targets.configmap,
                "Copying public bindings"
            );
            for binding in bind_info.spec.bindings.iter().filter(|b| b.scope.is_public()) {
                self.sync_binding(
                    binding,
                    (targets.secret.as_str(), targets.configmap.as_str()),
                    &source_namespace,
                    &consumer.namespace,
                    &bind_info,
                    &request,
                    &subject,
                    &mut summary,
                    &mut errors,
                )
                .await;
            }
        }

        self.finish(bind_info, &subject, &resolved.consumers, errors, summary)
            .await
    }

    async fn load_request(
        &self,
        consumer: &ReconcileRequest,
        subject: &ObjectReference,
        errors: &mut SyncErrors,
    ) -> Option<OperandRequest> {
        match self
            .store
            .get::<OperandRequest>(&consumer.name, &consumer.namespace)
            .await
        {
            Ok(request) => Some(request),
            Err(e) if e.is_not_found() => {
                warn!(
                    request = %consumer.name,
                    request_namespace = %consumer.namespace,
                    "OperandRequest not found"
                );
                self.events
                    .emit(
                        subject,
                        Severity::Warning,
                        reasons::NOT_FOUND,
                        format!(
                            "NotFound OperandRequest {} in the namespace {}",
                            consumer.name, consumer.namespace
                        ),
                    )
                    .await;
                errors.push(SyncError::RequestNotFound {
                    name: consumer.name.clone(),
                    namespace: consumer.namespace.clone(),
                });
                None
            }
            Err(source) => {
                errors.push(SyncError::RequestUnreadable {
                    name: consumer.name.clone(),
                    namespace: consumer.namespace.clone(),
                    source,
                });
                None
            }
        }
    }

    /// Copy the Secret, then the ConfigMap, of one binding. A failed Secret
    /// leaves the ConfigMap alone.
    #[allow(clippy::too_many_arguments, reason = "one call site, arguments are the sync coordinates")]
    async fn sync_binding(
        &self,
        binding: &Binding,
        (secret_target, configmap_target): (&str, &str),
        source_namespace: &str,
        target_namespace: &str,
        bind_info: &OperandBindInfo,
        request: &OperandRequest,
        subject: &ObjectReference,
        summary: &mut SyncSummary,
        errors: &mut SyncErrors,
    ) {
        let secret = SyncTarget {
            source_name: binding.secret_name(),
            source_namespace,
            target_name: secret_target,
            target_namespace,
        };
        match sync_secret(&self.store, &self.events, &secret, bind_info, request).await {
            Ok(outcome) => summary.record(outcome),
            Err(e) => {
                self.report_failure(subject, &e).await;
                errors.push(e);
                return;
            }
        }

        let configmap = SyncTarget {
            source_name: binding.configmap_name(),
            source_namespace,
            target_name: configmap_target,
            target_namespace,
        };
        match sync_config_map(&self.store, &self.events, &configmap, bind_info, request).await {
            Ok(outcome) => summary.record(outcome),
            Err(e) => {
                self.report_failure(subject, &e).await;
                errors.push(e);
            }
        }
    }

    async fn report_failure(&self, subject: &ObjectReference, error: &SyncError) {
        error!(error = %error, "Failed to sync object");
        self.events
            .emit(subject, Severity::Warning, reasons::SYNC_FAILED, error.to_string())
            .await;
    }

    async fn finish(
        &self,
        mut bind_info: OperandBindInfo,
        subject: &ObjectReference,
        consumers: &[ReconcileRequest],
        errors: SyncErrors,
        summary: SyncSummary,
    ) -> Result<ReconcileOutcome, ReconcilerError> {
        let namespaces = unique_namespaces(consumers);
        if !errors.is_empty() {
            update_phase(&self.store, &mut bind_info, BindInfoPhase::Failed, namespaces)
                .await
                .map_err(ReconcilerError::Status)?;
            return Err(ReconcilerError::Sync(errors));
        }

        let changed =
            update_phase(&self.store, &mut bind_info, BindInfoPhase::Completed, namespaces)
                .await
                .map_err(ReconcilerError::Status)?;
        if changed {
            self.events
                .emit(
                    subject,
                    Severity::Normal,
                    reasons::SYNCED,
                    format!(
                        "Shared bindings with {} namespace(s)",
                        bind_info
                            .status
                            .as_ref()
                            .map_or(0, |s| s.request_namespaces.len())
                    ),
                )
                .await;
        }
        info!(
            created = summary.created,
            updated = summary.updated,
            missing = summary.missing,
            "OperandBindInfo synchronized"
        );
        Ok(ReconcileOutcome::Synced(summary))
    }
}
