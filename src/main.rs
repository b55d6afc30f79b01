// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

use std::collections::HashMap;

use anyhow::{Context as _, Result};
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use prowpipe::build_id::BuildIdClient;
use prowpipe::controller::Controller;
use prowpipe::labels::DEFAULT_CLUSTER_ALIAS;
use tokio::sync::watch;
use tracing::{debug, info};

/// ProwJob to Tekton PipelineRun bridge controller.
#[derive(Debug, Parser)]
#[command(name = "prowpipe", version, about)]
struct Args {
    /// Base URL of the tot build-number vending service.
    #[arg(long)]
    tot_url: String,

    /// Prefix prepended to `<job>/<build id>` to form job result URLs.
    #[arg(long, default_value = "")]
    job_url_prefix: String,

    /// Namespace watched for ProwJob objects on the service cluster.
    #[arg(long, default_value = "default")]
    prow_namespace: String,

    /// Build cluster in `alias=kubeconfig-path` form. Repeatable. When
    /// absent, the in-cluster config doubles as the default build cluster.
    #[arg(long = "build-cluster", value_name = "ALIAS=KUBECONFIG")]
    build_clusters: Vec<String>,

    /// Number of concurrent reconcile workers.
    #[arg(long, default_value_t = 2)]
    threads: usize,
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("prowpipe-controller")
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    // Respects RUST_LOG for the filter and RUST_LOG_FORMAT (json|text)
    // for the output format.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let log_format = std::env::var("RUST_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    match log_format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .json()
                .init();
        }
        _ => {
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_file(true)
                .with_line_number(true)
                .with_thread_names(true)
                .with_target(false)
                .with_ansi(true)
                .compact()
                .init();
        }
    }

    let args = Args::parse();
    info!("Starting Prow pipeline controller");

    debug!("Initializing Kubernetes client");
    let client = Client::try_default().await?;
    debug!("Kubernetes client initialized successfully");

    let mut build_clusters = HashMap::new();
    for entry in &args.build_clusters {
        let (alias, path) = entry
            .split_once('=')
            .with_context(|| format!("invalid --build-cluster entry: {entry}"))?;
        let kubeconfig = Kubeconfig::read_from(path)
            .with_context(|| format!("reading kubeconfig for cluster {alias}"))?;
        let config =
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?;
        build_clusters.insert(alias.to_string(), Client::try_from(config)?);
        info!(alias, path, "Configured build cluster");
    }
    if build_clusters.is_empty() {
        // Single-cluster deployments run pipelines next to the prow jobs.
        build_clusters.insert(DEFAULT_CLUSTER_ALIAS.to_string(), client.clone());
        info!("No build clusters given, using the service cluster as default");
    }

    let build_ids = BuildIdClient::new(args.tot_url.clone(), args.job_url_prefix.clone());
    let controller = Controller::new(
        client,
        args.prow_namespace.clone(),
        build_clusters,
        build_ids,
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received interrupt, shutting down");
            let _ = stop_tx.send(true);
        }
    });

    controller.run(args.threads, stop_rx).await
}
