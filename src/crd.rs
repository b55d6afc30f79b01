// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Custom Resource Definitions bridged by prowpipe.
//!
//! Two resource families meet in this controller:
//!
//! - [`ProwJob`] (`prow.k8s.io/v1`) - the job description produced by Prow's
//!   trigger machinery. Only the fields this controller reads or writes are
//!   modelled; the full Prow schema is owned by Prow itself.
//! - [`PipelineRun`] / [`PipelineResource`] (`tekton.dev/v1alpha1`) - the
//!   Tekton execution-side objects this controller creates and observes on
//!   build clusters.
//!
//! Timestamps are RFC 3339 strings (`Option<String>`), matching how the
//! Kubernetes API serializes `metav1.Time`.
//!
//! # Example: a minimal Tekton ProwJob
//!
//! ```rust
//! use prowpipe::crd::{ProwJobSpec, PipelineRunSpec};
//!
//! let spec = ProwJobSpec {
//!     agent: "tekton-pipeline".to_string(),
//!     job: "pull-prowpipe-unit".to_string(),
//!     pipeline_run_spec: Some(PipelineRunSpec::default()),
//!     ..Default::default()
//! };
//! ```

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`ProwJob`].
///
/// `Success`, `Failure`, `Aborted` and `Error` are terminal: once a job
/// reaches one of them the controller never mutates it again. `Aborted` is
/// only ever set externally but must still be respected as terminal here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProwJobState {
    /// Job accepted, pipeline not yet running.
    Triggered,
    /// Pipeline is scheduled and running.
    Pending,
    /// Pipeline finished and reported success.
    Success,
    /// Pipeline finished and reported failure.
    Failure,
    /// Job was aborted externally (e.g. superseded by a newer run).
    Aborted,
    /// The controller could not run or track the pipeline.
    Error,
}

impl std::fmt::Display for ProwJobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProwJobState::Triggered => "triggered",
            ProwJobState::Pending => "pending",
            ProwJobState::Success => "success",
            ProwJobState::Failure => "failure",
            ProwJobState::Aborted => "aborted",
            ProwJobState::Error => "error",
        };
        f.write_str(s)
    }
}

/// Type of Prow job, used only for object labelling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ProwJobType {
    /// Triggered by a pull request.
    Presubmit,
    /// Triggered by a merge.
    Postsubmit,
    /// Triggered on a schedule.
    #[default]
    Periodic,
    /// Triggered by a batch of pull requests.
    Batch,
}

impl std::fmt::Display for ProwJobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ProwJobType::Presubmit => "presubmit",
            ProwJobType::Postsubmit => "postsubmit",
            ProwJobType::Periodic => "periodic",
            ProwJobType::Batch => "batch",
        };
        f.write_str(s)
    }
}

/// A pull request referenced by a [`Refs`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Pull {
    /// Pull request number.
    #[serde(default)]
    pub number: i64,

    /// Author of the pull request.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub author: String,

    /// Head SHA of the pull request.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub sha: String,
}

/// Source repository pointers for a job.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Refs {
    /// Organization or user owning the repository.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub org: String,

    /// Repository name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo: String,

    /// Browsable link to the repository, e.g. `https://github.com/org/repo`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub repo_link: String,

    /// Base branch name, e.g. `main`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_ref: String,

    /// SHA of the base branch head.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub base_sha: String,

    /// Exact clone URI. When set, it takes precedence over `repo_link`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub clone_uri: String,

    /// Pull requests being tested, if any.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pulls: Vec<Pull>,
}

/// ProwJob custom resource: one unit of CI work.
///
/// Created and updated by Prow's trigger/admission components; this
/// controller only ever touches the status subresource and never deletes a
/// job.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "prow.k8s.io",
    version = "v1",
    kind = "ProwJob",
    plural = "prowjobs",
    namespaced,
    status = "ProwJobStatus"
)]
pub struct ProwJobSpec {
    /// Agent responsible for running this job. This controller only acts on
    /// jobs whose agent is [`crate::labels::TEKTON_AGENT`].
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub agent: String,

    /// Build cluster alias the pipeline should run in. Empty selects the
    /// default cluster.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub cluster: String,

    /// Namespace the pipeline objects are created in. May differ from the
    /// namespace the ProwJob itself lives in.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub namespace: String,

    /// Name of the job configuration this run was created from.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub job: String,

    /// Job type, used for labelling the created objects.
    #[serde(default, rename = "type")]
    pub job_type: ProwJobType,

    /// Primary source refs for the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refs: Option<Refs>,

    /// Additional repositories to make available.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_refs: Vec<Refs>,

    /// Tekton PipelineRun template to instantiate. Required for any job this
    /// controller is expected to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_run_spec: Option<PipelineRunSpec>,
}

/// Status of a [`ProwJob`], mirrored from the pipeline's progress.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ProwJobStatus {
    /// Current lifecycle state. Unset until the controller first observes
    /// the job.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<ProwJobState>,

    /// Human readable description of the state, taken from the pipeline's
    /// conditions where available.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,

    /// Build identity vended for this run.
    #[serde(default, rename = "build_id", skip_serializing_if = "String::is_empty")]
    pub build_id: String,

    /// Link to the job's results.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,

    /// RFC 3339 time the job left the unset state.
    #[serde(default, rename = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// RFC 3339 time the job reached a terminal state.
    #[serde(
        default,
        rename = "completionTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub completion_time: Option<String>,
}

/// A name/value parameter passed to a pipeline or resource.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

/// Reference to the Pipeline a run instantiates.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

/// Reference to a [`PipelineResource`] by name and API version.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResourceRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub api_version: String,
}

/// Binding of a named resource slot to a concrete [`PipelineResource`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResourceBinding {
    pub name: String,
    #[serde(default)]
    pub resource_ref: PipelineResourceRef,
}

/// Tekton PipelineRun custom resource.
///
/// Named after its owning ProwJob for 1:1 correlation. Created exactly once
/// per eligible job; deleted only when it carries the controller's ownership
/// label.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "tekton.dev",
    version = "v1alpha1",
    kind = "PipelineRun",
    plural = "pipelineruns",
    namespaced,
    status = "PipelineRunStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSpec {
    /// Pipeline to instantiate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pipeline_ref: Option<PipelineRef>,

    /// Service account the pipeline pods run as.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub service_account: String,

    /// Ordered parameters. The controller appends a `build_id` entry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,

    /// Resource bindings. The controller appends the git source binding.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<PipelineResourceBinding>,
}

/// A typed, timestamped status signal reported by Tekton.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Condition {
    /// Condition type, e.g. `Succeeded`.
    pub r#type: String,

    /// Tri-state value: `True`, `False` or `Unknown`.
    #[serde(default)]
    pub status: String,

    /// Machine readable reason for the last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,

    /// Human readable message for the last transition.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// RFC 3339 time of the last transition.
    #[serde(
        default,
        rename = "lastTransitionTime",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_transition_time: Option<String>,
}

/// Observed status of a [`PipelineRun`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunStatus {
    /// RFC 3339 time the pipeline actually started executing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,

    /// RFC 3339 time the pipeline finished.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<String>,

    /// Condition set keyed by condition type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl PipelineRunStatus {
    /// Look up a condition by type.
    #[must_use]
    pub fn get_condition(&self, condition_type: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.r#type == condition_type)
    }
}

/// Spec of a [`PipelineResource`]: the git source binding for a run.
#[derive(CustomResource, Clone, Debug, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "tekton.dev",
    version = "v1alpha1",
    kind = "PipelineResource",
    plural = "pipelineresources",
    namespaced
)]
pub struct PipelineResourceSpec {
    /// Resource type; this controller only produces `git` resources.
    pub r#type: String,

    /// Ordered parameters (`url`, `revision`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Param>,
}

#[cfg(test)]
#[path = "crd_tests.rs"]
mod crd_tests;
