// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `crd`

#[cfg(test)]
mod tests {
    use crate::crd::{
        Condition, PipelineRunSpec, PipelineRunStatus, ProwJob, ProwJobSpec, ProwJobState,
        ProwJobStatus, ProwJobType, Pull, Refs,
    };
    use kube::CustomResourceExt;

    #[test]
    fn test_prow_job_state_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ProwJobState::Triggered).unwrap(),
            "\"triggered\""
        );
        assert_eq!(
            serde_json::to_string(&ProwJobState::Success).unwrap(),
            "\"success\""
        );
        let state: ProwJobState = serde_json::from_str("\"aborted\"").unwrap();
        assert_eq!(state, ProwJobState::Aborted);
    }

    #[test]
    fn test_prow_job_state_display() {
        assert_eq!(ProwJobState::Pending.to_string(), "pending");
        assert_eq!(ProwJobState::Error.to_string(), "error");
    }

    #[test]
    fn test_prow_job_type_defaults_to_periodic() {
        assert_eq!(ProwJobType::default(), ProwJobType::Periodic);
        assert_eq!(ProwJobType::Presubmit.to_string(), "presubmit");
    }

    #[test]
    fn test_prow_job_spec_type_field_rename() {
        let spec = ProwJobSpec {
            agent: "tekton-pipeline".to_string(),
            job: "unit".to_string(),
            job_type: ProwJobType::Presubmit,
            ..Default::default()
        };
        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(json["type"], "presubmit");
        assert!(json.get("job_type").is_none());

        let parsed: ProwJobSpec = serde_json::from_value(serde_json::json!({
            "agent": "tekton-pipeline",
            "job": "unit",
            "type": "batch"
        }))
        .unwrap();
        assert_eq!(parsed.job_type, ProwJobType::Batch);
    }

    #[test]
    fn test_prow_job_status_wire_names() {
        let status = ProwJobStatus {
            state: Some(ProwJobState::Pending),
            description: "running".to_string(),
            build_id: "42".to_string(),
            url: "https://results/unit/42".to_string(),
            start_time: Some("2026-01-02T03:04:05Z".to_string()),
            completion_time: None,
        };
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["state"], "pending");
        assert_eq!(json["build_id"], "42");
        assert_eq!(json["startTime"], "2026-01-02T03:04:05Z");
        assert!(json.get("completionTime").is_none());
    }

    #[test]
    fn test_empty_status_serializes_empty() {
        let json = serde_json::to_value(ProwJobStatus::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
    }

    #[test]
    fn test_refs_deserialize() {
        let refs: Refs = serde_json::from_value(serde_json::json!({
            "org": "kubernetes",
            "repo": "test-infra",
            "repo_link": "https://github.com/kubernetes/test-infra",
            "base_ref": "master",
            "base_sha": "deadbeef",
            "pulls": [{"number": 7, "author": "octocat", "sha": "feedface"}]
        }))
        .unwrap();
        assert_eq!(refs.org, "kubernetes");
        assert_eq!(
            refs.pulls,
            vec![Pull {
                number: 7,
                author: "octocat".to_string(),
                sha: "feedface".to_string(),
            }]
        );
    }

    #[test]
    fn test_pipeline_run_spec_camel_case() {
        let parsed: PipelineRunSpec = serde_json::from_value(serde_json::json!({
            "pipelineRef": {"name": "build"},
            "serviceAccount": "builder",
            "params": [{"name": "flag", "value": "on"}]
        }))
        .unwrap();
        assert_eq!(parsed.pipeline_ref.as_ref().unwrap().name, "build");
        assert_eq!(parsed.service_account, "builder");

        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["pipelineRef"]["name"], "build");
        assert_eq!(json["serviceAccount"], "builder");
    }

    #[test]
    fn test_get_condition() {
        let status = PipelineRunStatus {
            conditions: vec![
                Condition {
                    r#type: "Ready".to_string(),
                    status: "True".to_string(),
                    ..Default::default()
                },
                Condition {
                    r#type: "Succeeded".to_string(),
                    status: "Unknown".to_string(),
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        assert_eq!(
            status.get_condition("Succeeded").unwrap().status,
            "Unknown"
        );
        assert!(status.get_condition("Missing").is_none());
    }

    #[test]
    fn test_prow_job_crd_identity() {
        let crd = ProwJob::crd();
        assert_eq!(crd.metadata.name.as_deref(), Some("prowjobs.prow.k8s.io"));
        assert_eq!(crd.spec.group, "prow.k8s.io");
        assert!(crd.spec.versions.iter().any(|v| v.name == "v1"));
    }
}
