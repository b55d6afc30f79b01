// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! # Prowpipe - Prow to Tekton Pipeline Controller
//!
//! Prowpipe is a Kubernetes controller that runs Prow jobs as Tekton
//! pipelines. It watches ProwJob objects on a service cluster and drives
//! PipelineRun objects on one or more build clusters until the two agree,
//! then reports pipeline progress back into the ProwJob status.
//!
//! ## Modules
//!
//! - [`crd`] - ProwJob and Tekton custom resource types
//! - [`labels`] - Ownership labels and cluster alias handling
//! - [`key`] - The `context/namespace/name` work queue key
//! - [`status`] - PipelineRun status to ProwJob status projection
//! - [`pipeline`] - PipelineRun and PipelineResource construction
//! - [`build_id`] - Build number vending against a tot service
//! - [`reconciler`] - The want/have decision engine
//! - [`queue`] - Deduplicating work queue with per-key backoff
//! - [`controller`] - Watchers, caches and the worker pool

pub mod build_id;
pub mod controller;
pub mod crd;
pub mod errors;
pub mod key;
pub mod labels;
pub mod pipeline;
pub mod queue;
pub mod reconciler;
pub mod status;
