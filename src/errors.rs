// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Error taxonomy for the reconcile engine.
//!
//! The important distinction is between *expected absence* and real
//! failures: a missing ProwJob or PipelineRun drives the want/have
//! computation and is never propagated, while transient API failures bubble
//! up so the work queue can retry the key with backoff. Use
//! [`Error::is_not_found`] to tell the two apart regardless of whether the
//! error came from a fake or a live [`kube`] client.

use thiserror::Error;

/// Errors surfaced by [`crate::reconciler::Reconciler`] implementations and
/// the reconcile engine itself.
#[derive(Error, Debug)]
pub enum Error {
    /// A work-queue key that does not decompose into context/namespace/name.
    ///
    /// Malformed keys can never succeed, so the engine logs and swallows
    /// them instead of requeueing.
    #[error("bad key {key:?}: want context/namespace/name")]
    MalformedKey {
        /// The offending key.
        key: String,
    },

    /// The named object does not exist. Expected during normal operation.
    #[error("{kind} {name:?} not found")]
    NotFound {
        /// Resource kind, e.g. `ProwJob`.
        kind: &'static str,
        /// Object name.
        name: String,
    },

    /// Creation raced with another writer.
    #[error("{kind} {name:?} already exists")]
    AlreadyExists {
        /// Resource kind.
        kind: &'static str,
        /// Object name.
        name: String,
    },

    /// A job wants a pipeline but carries no template. The job is malformed
    /// and needs fixing externally.
    #[error("no pipeline_run_spec defined in ProwJob/{key}")]
    MissingPipelineSpec {
        /// Composite key of the offending job.
        key: String,
    },

    /// A PipelineRun was built from a job whose build ID was never vended.
    #[error("empty build_id in ProwJob status")]
    EmptyBuildId,

    /// The requested build cluster has no configuration and neither does the
    /// default alias.
    #[error("no cluster configuration found for context {context:?}")]
    NoClusterConfig {
        /// Requested execution context.
        context: String,
    },

    /// The build-ID vending service failed after retries.
    #[error("vend build id for {job:?}: {reason}")]
    BuildIdVend {
        /// Job configuration name.
        job: String,
        /// Underlying cause.
        reason: String,
    },

    /// Kubernetes API failure.
    #[error(transparent)]
    Api(#[from] kube::Error),

    /// Catch-all used by test fakes to inject opaque failures.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True when the error means "the object does not exist", either from
    /// our own [`Error::NotFound`] variant or a 404 from the API server.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::NotFound { .. } => true,
            Error::Api(kube::Error::Api(resp)) => resp.code == 404,
            _ => false,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod errors_tests;
