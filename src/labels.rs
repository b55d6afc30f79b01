// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Label and annotation constants shared across the controller, plus the
//! metadata derivation applied to every object the controller creates.
//!
//! The ownership label [`CREATED_BY_PROW`] is the key safety marker: the
//! deletion path only ever removes PipelineRuns that carry it, so manually
//! created pipelines are never destroyed by this controller.

use std::collections::BTreeMap;

use crate::crd::ProwJob;

// ============================================================================
// Agent sentinel
// ============================================================================

/// `spec.agent` value selecting this controller. Jobs with any other agent
/// are ignored.
pub const TEKTON_AGENT: &str = "tekton-pipeline";

/// Build cluster alias used when a job does not name a cluster, and as the
/// fallback lookup key when a named cluster has no configuration.
pub const DEFAULT_CLUSTER_ALIAS: &str = "default";

/// Execution context for a job's `spec.cluster` value; an unset cluster
/// selects the default alias.
#[must_use]
pub fn cluster_to_context(cluster: &str) -> &str {
    if cluster.is_empty() {
        DEFAULT_CLUSTER_ALIAS
    } else {
        cluster
    }
}

// ============================================================================
// Prow labels
// ============================================================================

/// Ownership marker set on every object this controller creates. Checked
/// before any deletion.
pub const CREATED_BY_PROW: &str = "created-by-prow";

/// Label carrying the job type (presubmit, postsubmit, periodic, batch).
pub const PROW_JOB_TYPE_LABEL: &str = "prow.k8s.io/type";

/// Label carrying the owning ProwJob's name.
pub const PROW_JOB_ID_LABEL: &str = "prow.k8s.io/id";

// ============================================================================
// Prow annotations
// ============================================================================

/// Annotation carrying the job configuration name.
pub const PROW_JOB_ANNOTATION: &str = "prow.k8s.io/job";

/// Derive the labels and annotations stamped onto objects created for a job.
///
/// Every created object carries the ownership marker, the job type, the
/// owning job's name as an id label, and the job configuration name as an
/// annotation.
#[must_use]
pub fn labels_and_annotations_for_job(
    pj: &ProwJob,
) -> (BTreeMap<String, String>, BTreeMap<String, String>) {
    let name = pj.metadata.name.clone().unwrap_or_default();

    let mut labels = BTreeMap::new();
    labels.insert(CREATED_BY_PROW.to_string(), "true".to_string());
    labels.insert(PROW_JOB_TYPE_LABEL.to_string(), pj.spec.job_type.to_string());
    labels.insert(PROW_JOB_ID_LABEL.to_string(), name);

    let mut annotations = BTreeMap::new();
    annotations.insert(PROW_JOB_ANNOTATION.to_string(), pj.spec.job.clone());

    (labels, annotations)
}

#[cfg(test)]
#[path = "labels_tests.rs"]
mod labels_tests;
