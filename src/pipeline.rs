// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Translation from a ProwJob to the Tekton objects that execute it.
//!
//! Everything here is a pure function of the job: no API calls and no
//! clocks, so the construction rules can be tested exhaustively. The
//! reconcile engine decides *when* to build these objects; this module only
//! decides *what* they look like.

use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, EnvVar};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::crd::{
    Param, PipelineResource, PipelineResourceBinding, PipelineResourceRef, PipelineResourceSpec,
    PipelineRun, ProwJob,
};
use crate::errors::Error;
use crate::key::RunKey;
use crate::labels::labels_and_annotations_for_job;

/// API version stamped on resource references to created `PipelineResource`
/// objects.
pub const TEKTON_API_VERSION: &str = "tekton.dev/v1alpha1";

/// Resource type of the git source binding.
pub const PIPELINE_RESOURCE_TYPE_GIT: &str = "git";

/// Parameter name carrying the vended build ID into the pipeline.
pub const BUILD_ID_PARAM: &str = "build_id";

/// Clone URL for the job's primary refs.
///
/// Prefers an explicit `clone_uri`, falls back to `{repo_link}.git`, and is
/// empty when the job has no refs at all (e.g. periodics).
#[must_use]
pub fn source_url(pj: &ProwJob) -> String {
    let Some(refs) = pj.spec.refs.as_ref() else {
        return String::new();
    };
    if !refs.clone_uri.is_empty() {
        return refs.clone_uri.clone();
    }
    format!("{}.git", refs.repo_link)
}

/// Revision the git resource should check out: the first pull's head SHA if
/// the job tests pull requests, else the base SHA.
fn revision(pj: &ProwJob) -> String {
    let Some(refs) = pj.spec.refs.as_ref() else {
        return String::new();
    };
    match refs.pulls.first() {
        Some(pull) => pull.sha.clone(),
        None => refs.base_sha.clone(),
    }
}

/// Metadata for every object created on behalf of a job.
///
/// The namespace is the job's *target* namespace (`spec.namespace`), not the
/// namespace the ProwJob object lives in: pipeline objects run where the job
/// says they should, while all ProwJobs share one namespace.
#[must_use]
pub fn pipeline_meta(pj: &ProwJob) -> ObjectMeta {
    let (labels, annotations) = labels_and_annotations_for_job(pj);
    ObjectMeta {
        name: pj.metadata.name.clone(),
        namespace: Some(pj.spec.namespace.clone()),
        labels: Some(labels),
        annotations: Some(annotations),
        ..Default::default()
    }
}

/// Build the git `PipelineResource` binding the job's source into its
/// pipeline. Parameter order (`url`, then `revision`) is part of the wire
/// contract.
#[must_use]
pub fn make_pipeline_git_resource(pj: &ProwJob) -> PipelineResource {
    PipelineResource {
        metadata: pipeline_meta(pj),
        spec: PipelineResourceSpec {
            r#type: PIPELINE_RESOURCE_TYPE_GIT.to_string(),
            params: vec![
                Param {
                    name: "url".to_string(),
                    value: source_url(pj),
                },
                Param {
                    name: "revision".to_string(),
                    value: revision(pj),
                },
            ],
        },
    }
}

/// Instantiate the job's PipelineRun template.
///
/// Deep-copies the template, appends the `build_id` parameter and a binding
/// referencing `resource` by name and API version.
///
/// # Errors
///
/// * [`Error::MissingPipelineSpec`] when the job carries no template.
/// * [`Error::EmptyBuildId`] when no build ID was vended yet.
pub fn make_pipeline_run(pj: &ProwJob, resource: &PipelineResource) -> Result<PipelineRun, Error> {
    let Some(template) = pj.spec.pipeline_run_spec.as_ref() else {
        let key = RunKey::new(
            &pj.spec.cluster,
            &pj.spec.namespace,
            pj.metadata.name.as_deref().unwrap_or_default(),
        );
        return Err(Error::MissingPipelineSpec {
            key: key.to_string(),
        });
    };
    let build_id = pj
        .status
        .as_ref()
        .map(|s| s.build_id.clone())
        .unwrap_or_default();
    if build_id.is_empty() {
        return Err(Error::EmptyBuildId);
    }

    let mut spec = template.clone();
    spec.params.push(Param {
        name: BUILD_ID_PARAM.to_string(),
        value: build_id,
    });

    let resource_name = resource.metadata.name.clone().unwrap_or_default();
    spec.resources.push(PipelineResourceBinding {
        name: resource_name.clone(),
        resource_ref: PipelineResourceRef {
            name: resource_name,
            api_version: TEKTON_API_VERSION.to_string(),
        },
    });

    Ok(PipelineRun {
        metadata: pipeline_meta(pj),
        spec,
        status: None,
    })
}

/// Add each entry of `env` to the container's environment unless a variable
/// of that name is already defined. `BTreeMap` iteration gives the
/// lexicographic ordering that keeps output reproducible.
pub fn default_env(container: &mut Container, env: &BTreeMap<String, String>) {
    let existing: Vec<String> = container
        .env
        .iter()
        .flatten()
        .map(|var| var.name.clone())
        .collect();

    for (name, value) in env {
        if existing.iter().any(|have| have == name) {
            continue;
        }
        container.env.get_or_insert_with(Vec::new).push(EnvVar {
            name: name.clone(),
            value: Some(value.clone()),
            value_from: None,
        });
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod pipeline_tests;
