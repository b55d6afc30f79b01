// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! The reconcile decision engine.
//!
//! [`reconcile`] drives one (job, pipeline) pair toward a consistent joint
//! state: compute whether a pipeline is *wanted* and whether one is *had*,
//! then create, delete or project status accordingly. All side effects go
//! through the [`Reconciler`] capability trait, so the engine itself is a
//! deterministic state machine that tests exercise with an in-memory fake.
//!
//! Invariants honoured here:
//!
//! - A job in a terminal state is never mutated again.
//! - PipelineRuns are deleted only when they carry the
//!   [`crate::labels::CREATED_BY_PROW`] marker.
//! - A PipelineRun creation failure is converted into a terminal `Error`
//!   job state instead of being retried forever against a broken template.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, error, info, warn};

use crate::crd::{PipelineResource, PipelineRun, ProwJob, ProwJobState};
use crate::errors::Error;
use crate::key::RunKey;
use crate::labels::{cluster_to_context, CREATED_BY_PROW, TEKTON_AGENT};
use crate::pipeline::{make_pipeline_git_resource, make_pipeline_run};
use crate::status::{final_state, prow_job_status};

/// Capability interface between the decision engine and the cluster.
///
/// The live implementation ([`crate::controller::Controller`]) reads from
/// reflector stores and writes through `kube::Api`; tests substitute an
/// in-memory fake keyed by [`RunKey`] strings.
#[async_trait]
pub trait Reconciler: Send + Sync {
    /// Fetch a ProwJob by name from the shared job namespace.
    async fn get_prow_job(&self, name: &str) -> Result<ProwJob, Error>;

    /// Persist a ProwJob's status.
    async fn update_prow_job(&self, pj: &ProwJob) -> Result<ProwJob, Error>;

    /// Fetch a PipelineRun from a build cluster.
    async fn get_pipeline_run(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<PipelineRun, Error>;

    /// Delete a PipelineRun on a build cluster.
    async fn delete_pipeline_run(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), Error>;

    /// Create a PipelineRun on a build cluster.
    async fn create_pipeline_run(
        &self,
        context: &str,
        namespace: &str,
        run: &PipelineRun,
    ) -> Result<PipelineRun, Error>;

    /// Create a PipelineResource on a build cluster.
    async fn create_pipeline_resource(
        &self,
        context: &str,
        namespace: &str,
        resource: &PipelineResource,
    ) -> Result<PipelineResource, Error>;

    /// Allocate a build ID and results URL for a job.
    async fn pipeline_id(&self, pj: &ProwJob) -> Result<(String, String), Error>;

    /// Current time, injectable for tests.
    fn now(&self) -> DateTime<Utc>;
}

fn rfc3339(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn owned_by_prow(run: &PipelineRun) -> bool {
    run.metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(CREATED_BY_PROW))
        .is_some_and(|v| v == "true")
}

/// Ensure a Tekton ProwJob has a corresponding PipelineRun, updating the
/// job's status as the pipeline progresses.
///
/// # Errors
///
/// Transient fetch/create/delete/update failures propagate so the work
/// queue retries the key with backoff. A malformed key is logged and
/// swallowed; a PipelineRun creation failure becomes a terminal job state
/// and returns `Ok`.
pub async fn reconcile<R: Reconciler + ?Sized>(c: &R, key: &str) -> Result<(), Error> {
    debug!(key, "reconcile");

    let run_key = match key.parse::<RunKey>() {
        Ok(k) => k,
        Err(e) => {
            // A key that does not decode can never succeed; do not requeue.
            error!(key, error = %e, "Dropping malformed key");
            return Ok(());
        }
    };
    let RunKey {
        context,
        namespace,
        name,
    } = run_key;

    let pj = match c.get_prow_job(&name).await {
        Ok(pj) => Some(pj),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };

    let mut want_pipeline_run = false;
    if let Some(pj) = pj.as_ref() {
        if pj.spec.agent != TEKTON_AGENT {
            // Some other agent runs this job.
        } else if cluster_to_context(&pj.spec.cluster) != context {
            warn!(
                key,
                context = %context,
                target = %cluster_to_context(&pj.spec.cluster),
                "ProwJob found in wrong context"
            );
        } else if pj.metadata.deletion_timestamp.is_none() {
            want_pipeline_run = true;
        }
    }

    let observed = match c.get_pipeline_run(&context, &namespace, &name).await {
        Ok(p) => Some(p),
        Err(e) if e.is_not_found() => None,
        Err(e) => return Err(e),
    };
    let have_pipeline_run = observed
        .as_ref()
        .is_some_and(|p| p.metadata.deletion_timestamp.is_none());

    if !want_pipeline_run {
        if !have_pipeline_run {
            if pj.as_ref().is_some_and(|pj| pj.spec.agent == TEKTON_AGENT) {
                info!(key, "Observed deleted");
            }
            return Ok(());
        }
        let Some(run) = observed.as_ref() else {
            return Ok(());
        };
        if !owned_by_prow(run) {
            // Leave externally created pipelines alone.
            return Ok(());
        }
        info!(key, "Delete PipelineRun");
        return c.delete_pipeline_run(&context, &namespace, &name).await;
    }

    // want implies the job exists.
    let Some(mut pj) = pj else {
        return Ok(());
    };

    let state = pj.status.as_ref().and_then(|s| s.state);
    if final_state(state) {
        info!(key, "Observed finished");
        return Ok(());
    }
    if pj.spec.pipeline_run_spec.is_none() {
        return Err(Error::MissingPipelineSpec {
            key: key.to_string(),
        });
    }

    let mut new_pipeline_run = false;
    let mut run = observed;
    if !have_pipeline_run {
        let (id, url) = c.pipeline_id(&pj).await?;
        {
            let status = pj.status.get_or_insert_with(Default::default);
            status.build_id = id;
            status.url = url;
        }
        new_pipeline_run = true;

        let resource = make_pipeline_git_resource(&pj);
        info!(key, "Create PipelineResource");
        let resource = c
            .create_pipeline_resource(&context, &namespace, &resource)
            .await?;

        let wanted = make_pipeline_run(&pj, &resource)?;
        info!(key, "Create PipelineRun");
        match c.create_pipeline_run(&context, &namespace, &wanted).await {
            Ok(created) => run = Some(created),
            Err(e) => {
                // A template that cannot execute would otherwise requeue
                // forever; park the job in a terminal error instead.
                let msg = format!("start pipeline: {e}");
                return update_prow_job_state(
                    c,
                    key,
                    new_pipeline_run,
                    &pj,
                    ProwJobState::Error,
                    &msg,
                )
                .await;
            }
        }
    }

    let Some(run) = run.as_ref() else {
        return Err(Error::Other(format!(
            "no pipelinerun found or created for {key:?}, want_pipeline_run was {want_pipeline_run}"
        )));
    };
    let run_status = run.status.clone().unwrap_or_default();
    let (want_state, want_msg) = prow_job_status(&run_status);
    update_prow_job_state(c, key, new_pipeline_run, &pj, want_state, &want_msg).await
}

/// Persist a job state transition, skipping the write when nothing changed.
///
/// A freshly created pipeline forces the write even when (state,
/// description) look unchanged: the cache may still serve the pre-creation
/// job, and the stamped build ID must land.
pub async fn update_prow_job_state<R: Reconciler + ?Sized>(
    c: &R,
    key: &str,
    new_pipeline_run: bool,
    pj: &ProwJob,
    state: ProwJobState,
    msg: &str,
) -> Result<(), Error> {
    let have_state = pj.status.as_ref().and_then(|s| s.state);
    let have_msg = pj
        .status
        .as_ref()
        .map(|s| s.description.clone())
        .unwrap_or_default();

    if new_pipeline_run || have_state != Some(state) || have_msg != msg {
        // Clone, mutate the clone, submit the clone: cached instances are
        // shared with other readers.
        let mut npj = pj.clone();
        let status = npj.status.get_or_insert_with(Default::default);
        if status.start_time.is_none() {
            status.start_time = Some(rfc3339(c.now()));
        }
        if status.completion_time.is_none() && final_state(Some(state)) {
            status.completion_time = Some(rfc3339(c.now()));
        }
        status.state = Some(state);
        status.description = msg.to_string();
        info!(
            key,
            from = %have_state.map(|s| s.to_string()).unwrap_or_default(),
            to = %state,
            "Update ProwJob"
        );
        c.update_prow_job(&npj).await?;
    }
    Ok(())
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
