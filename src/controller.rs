// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Controller harness: watchers, caches, queue and workers.
//!
//! One watcher feeds ProwJob events from the service cluster; one watcher
//! per configured build cluster feeds PipelineRun events. Both collapse
//! into [`RunKey`] strings on a single deduplicating [`WorkQueue`], drained
//! by a fixed pool of workers that call [`crate::reconciler::reconcile`].
//!
//! The cluster map is built once at startup and never mutated afterwards,
//! which is what makes lock-free concurrent reads from the workers safe.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use kube::api::{DeleteParams, Patch, PatchParams, PostParams};
use kube::runtime::reflector::{ObjectRef, Store};
use kube::runtime::{reflector, watcher};
use kube::{Api, Client};
use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info, warn};

use crate::build_id::BuildIdClient;
use crate::crd::{PipelineResource, PipelineRun, ProwJob};
use crate::errors::Error;
use crate::key::RunKey;
use crate::labels::{cluster_to_context, DEFAULT_CLUSTER_ALIAS};
use crate::queue::WorkQueue;
use crate::reconciler::{reconcile, Reconciler};

/// Everything the controller holds for one build cluster.
pub struct PipelineContext {
    /// Client scoped to the build cluster.
    pub client: Client,
    /// Reflector cache of the cluster's PipelineRuns.
    pub store: Store<PipelineRun>,
}

/// Event-handler payload: the two object kinds that can wake a key.
///
/// A closed sum type instead of a runtime type switch keeps both enqueue
/// paths exhaustive at compile time.
pub enum WatchTarget {
    ProwJob(ProwJob),
    PipelineRun(PipelineRun),
}

struct SyncFlag {
    ready: AtomicBool,
    logged: AtomicBool,
}

impl SyncFlag {
    fn new() -> Self {
        SyncFlag {
            ready: AtomicBool::new(false),
            logged: AtomicBool::new(false),
        }
    }
}

/// Cache-sync bookkeeping; logs each waiting/synced transition once.
struct SyncState {
    prow_jobs: SyncFlag,
    pipelines: HashMap<String, SyncFlag>,
    waiting_on: Mutex<String>,
}

struct Writers {
    prow_jobs: reflector::store::Writer<ProwJob>,
    pipelines: HashMap<String, reflector::store::Writer<PipelineRun>>,
}

/// The live controller: reflector caches over the clusters, a shared work
/// queue, and the [`Reconciler`] implementation the decision engine runs
/// against.
pub struct Controller {
    client: Client,
    prow_namespace: String,
    prow_jobs: Store<ProwJob>,
    pipelines: HashMap<String, PipelineContext>,
    queue: Arc<WorkQueue>,
    build_ids: BuildIdClient,
    sync: SyncState,
    writers: Mutex<Option<Writers>>,
}

impl Controller {
    /// Build the controller over a service-cluster client and one client
    /// per build cluster alias. The map is immutable from here on.
    #[must_use]
    pub fn new(
        client: Client,
        prow_namespace: String,
        build_clusters: HashMap<String, Client>,
        build_ids: BuildIdClient,
    ) -> Arc<Self> {
        let (prow_jobs, prow_jobs_writer) = reflector::store::<ProwJob>();

        let mut pipelines = HashMap::new();
        let mut pipeline_writers = HashMap::new();
        let mut sync_flags = HashMap::new();
        for (context, cluster_client) in build_clusters {
            let (store, writer) = reflector::store::<PipelineRun>();
            pipelines.insert(
                context.clone(),
                PipelineContext {
                    client: cluster_client,
                    store,
                },
            );
            pipeline_writers.insert(context.clone(), writer);
            sync_flags.insert(context, SyncFlag::new());
        }

        Arc::new(Controller {
            client,
            prow_namespace,
            prow_jobs,
            pipelines,
            queue: WorkQueue::new(),
            build_ids,
            sync: SyncState {
                prow_jobs: SyncFlag::new(),
                pipelines: sync_flags,
                waiting_on: Mutex::new(String::new()),
            },
            writers: Mutex::new(Some(Writers {
                prow_jobs: prow_jobs_writer,
                pipelines: pipeline_writers,
            })),
        })
    }

    /// Cluster configuration for `context`, falling back to the default
    /// alias when the requested context has none.
    fn pipeline_context(&self, context: &str) -> Result<&PipelineContext, Error> {
        if let Some(cfg) = self.pipelines.get(context) {
            return Ok(cfg);
        }
        self.pipelines
            .get(DEFAULT_CLUSTER_ALIAS)
            .ok_or_else(|| Error::NoClusterConfig {
                context: DEFAULT_CLUSTER_ALIAS.to_string(),
            })
    }

    /// Schedule a changed object for reconciliation.
    ///
    /// ProwJobs enqueue under their *target* namespace (`spec.namespace`,
    /// falling back to the object's own namespace) so job and pipeline
    /// events land on the same key.
    pub fn enqueue_key(&self, context: &str, target: &WatchTarget) {
        let key = match target {
            WatchTarget::ProwJob(pj) => {
                let namespace = if pj.spec.namespace.is_empty() {
                    pj.metadata.namespace.clone().unwrap_or_default()
                } else {
                    pj.spec.namespace.clone()
                };
                let name = pj.metadata.name.clone().unwrap_or_default();
                RunKey::new(context, &namespace, &name)
            }
            WatchTarget::PipelineRun(run) => {
                let namespace = run.metadata.namespace.clone().unwrap_or_default();
                let name = run.metadata.name.clone().unwrap_or_default();
                RunKey::new(context, &namespace, &name)
            }
        };
        self.queue.add(key.to_string());
    }

    /// True once the ProwJob cache and every build cluster's PipelineRun
    /// cache have completed their initial list.
    pub fn has_synced(&self) -> bool {
        if !self.sync.prow_jobs.ready.load(Ordering::Acquire) {
            self.log_waiting("prowjobs");
            return false;
        }
        if !self.sync.prow_jobs.logged.swap(true, Ordering::AcqRel) {
            info!("Synced prow jobs");
        }
        for (context, flag) in &self.sync.pipelines {
            if !flag.ready.load(Ordering::Acquire) {
                self.log_waiting(context);
                return false;
            }
            if !flag.logged.swap(true, Ordering::AcqRel) {
                info!(context = %context, "Synced pipelines");
            }
        }
        true
    }

    fn log_waiting(&self, what: &str) {
        if let Ok(mut waiting) = self.sync.waiting_on.lock() {
            if *waiting != what {
                what.clone_into(&mut waiting);
                if what == "prowjobs" {
                    info!(namespace = %self.prow_namespace, "Waiting on prowjobs...");
                } else {
                    info!(context = %what, "Waiting on pipelines...");
                }
            }
        }
    }

    /// Run watchers and `threads` workers until `stop` fires.
    ///
    /// # Errors
    ///
    /// Fails when the stop signal arrives before the caches sync, or when
    /// the watcher writers were already consumed by a previous run.
    pub async fn run(
        self: Arc<Self>,
        threads: usize,
        mut stop: watch::Receiver<bool>,
    ) -> Result<()> {
        info!("Starting pipeline controller");

        let writers = self
            .writers
            .lock()
            .map_err(|_| anyhow::anyhow!("writer lock poisoned"))?
            .take()
            .ok_or_else(|| anyhow::anyhow!("controller already running"))?;

        let mut watch_tasks = Vec::new();
        watch_tasks.push(self.spawn_prow_job_watcher(writers.prow_jobs));
        for (context, writer) in writers.pipelines {
            watch_tasks.push(self.spawn_pipeline_watcher(context, writer));
        }

        info!("Waiting for informer caches to sync");
        loop {
            if self.has_synced() {
                break;
            }
            tokio::select! {
                _ = stop.changed() => {
                    for task in &watch_tasks {
                        task.abort();
                    }
                    anyhow::bail!("failed to wait for caches to sync");
                }
                () = tokio::time::sleep(Duration::from_millis(200)) => {}
            }
        }

        info!(threads, "Starting workers");
        let mut workers = Vec::new();
        for _ in 0..threads {
            let controller = Arc::clone(&self);
            workers.push(tokio::spawn(async move {
                controller.run_worker().await;
            }));
        }
        info!("Started workers");

        let _ = stop.changed().await;
        info!("Shutting down workers");
        self.queue.shutdown();
        for worker in workers {
            let _ = worker.await;
        }
        for task in watch_tasks {
            task.abort();
        }
        Ok(())
    }

    /// Dequeue and reconcile until the queue closes.
    async fn run_worker(&self) {
        while let Some(key) = self.queue.get().await {
            match reconcile(self, &key).await {
                Ok(()) => self.queue.forget(&key),
                Err(e) => {
                    // Keep the key so the backoff retry can run it again.
                    error!(key = %key, error = %e, "Failed to reconcile");
                    self.queue.requeue(key.clone());
                }
            }
            self.queue.done(&key);
        }
    }

    fn spawn_prow_job_watcher(
        self: &Arc<Self>,
        writer: reflector::store::Writer<ProwJob>,
    ) -> tokio::task::JoinHandle<()> {
        let controller = Arc::clone(self);
        let api: Api<ProwJob> = Api::namespaced(self.client.clone(), &self.prow_namespace);

        tokio::spawn(async move {
            let store = writer.as_reader();
            {
                let controller = Arc::clone(&controller);
                let store = store.clone();
                tokio::spawn(async move {
                    if store.wait_until_ready().await.is_ok() {
                        controller.sync.prow_jobs.ready.store(true, Ordering::Release);
                    }
                });
            }

            let mut stream =
                Box::pin(reflector(writer, watcher(api, watcher::Config::default())));
            while let Some(event) = stream.next().await {
                match event {
                    Ok(watcher::Event::Apply(pj))
                    | Ok(watcher::Event::InitApply(pj))
                    | Ok(watcher::Event::Delete(pj)) => {
                        let context = cluster_to_context(&pj.spec.cluster).to_string();
                        controller.enqueue_key(&context, &WatchTarget::ProwJob(pj));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "ProwJob watch error");
                    }
                }
            }
        })
    }

    fn spawn_pipeline_watcher(
        self: &Arc<Self>,
        context: String,
        writer: reflector::store::Writer<PipelineRun>,
    ) -> tokio::task::JoinHandle<()> {
        let controller = Arc::clone(self);
        let client = self
            .pipelines
            .get(&context)
            .map(|cfg| cfg.client.clone())
            .unwrap_or_else(|| self.client.clone());
        let api: Api<PipelineRun> = Api::all(client);

        tokio::spawn(async move {
            let store = writer.as_reader();
            {
                let controller = Arc::clone(&controller);
                let sync_context = context.clone();
                let store = store.clone();
                tokio::spawn(async move {
                    if store.wait_until_ready().await.is_ok() {
                        if let Some(flag) = controller.sync.pipelines.get(&sync_context) {
                            flag.ready.store(true, Ordering::Release);
                        }
                    }
                });
            }

            let mut stream =
                Box::pin(reflector(writer, watcher(api, watcher::Config::default())));
            while let Some(event) = stream.next().await {
                match event {
                    Ok(watcher::Event::Apply(run))
                    | Ok(watcher::Event::InitApply(run))
                    | Ok(watcher::Event::Delete(run)) => {
                        controller.enqueue_key(&context, &WatchTarget::PipelineRun(run));
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(context = %context, error = %e, "PipelineRun watch error");
                    }
                }
            }
        })
    }
}

#[async_trait]
impl Reconciler for Controller {
    async fn get_prow_job(&self, name: &str) -> Result<ProwJob, Error> {
        let key = ObjectRef::<ProwJob>::new(name).within(&self.prow_namespace);
        self.prow_jobs
            .get(&key)
            .map(|pj| (*pj).clone())
            .ok_or(Error::NotFound {
                kind: "ProwJob",
                name: name.to_string(),
            })
    }

    async fn update_prow_job(&self, pj: &ProwJob) -> Result<ProwJob, Error> {
        let name = pj.metadata.name.as_deref().ok_or(Error::NotFound {
            kind: "ProwJob",
            name: String::new(),
        })?;
        let api: Api<ProwJob> = Api::namespaced(self.client.clone(), &self.prow_namespace);
        let patch = json!({ "status": pj.status });
        let updated = api
            .patch_status(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(updated)
    }

    async fn get_pipeline_run(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<PipelineRun, Error> {
        let cfg = self.pipeline_context(context)?;
        let key = ObjectRef::<PipelineRun>::new(name).within(namespace);
        cfg.store
            .get(&key)
            .map(|run| (*run).clone())
            .ok_or(Error::NotFound {
                kind: "PipelineRun",
                name: name.to_string(),
            })
    }

    async fn delete_pipeline_run(
        &self,
        context: &str,
        namespace: &str,
        name: &str,
    ) -> Result<(), Error> {
        let cfg = self.pipeline_context(context)?;
        let api: Api<PipelineRun> = Api::namespaced(cfg.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn create_pipeline_run(
        &self,
        context: &str,
        namespace: &str,
        run: &PipelineRun,
    ) -> Result<PipelineRun, Error> {
        let cfg = self.pipeline_context(context)?;
        let api: Api<PipelineRun> = Api::namespaced(cfg.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), run).await?)
    }

    async fn create_pipeline_resource(
        &self,
        context: &str,
        namespace: &str,
        resource: &PipelineResource,
    ) -> Result<PipelineResource, Error> {
        let cfg = self.pipeline_context(context)?;
        let api: Api<PipelineResource> = Api::namespaced(cfg.client.clone(), namespace);
        Ok(api.create(&PostParams::default(), resource).await?)
    }

    async fn pipeline_id(&self, pj: &ProwJob) -> Result<(String, String), Error> {
        let id = self.build_ids.vend(&pj.spec.job).await?;
        let url = self.build_ids.job_url(pj, &id);
        Ok((id, url))
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod controller_tests;
