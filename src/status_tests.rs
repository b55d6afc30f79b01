// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Unit tests for `status`

#[cfg(test)]
mod tests {
    use crate::crd::{Condition, PipelineRunStatus, ProwJobState};
    use crate::status::{
        description, final_state, prow_job_status, CONDITION_FALSE, CONDITION_SUCCEEDED,
        CONDITION_TRUE, CONDITION_UNKNOWN, DESC_FAILED, DESC_INITIALIZING,
        DESC_MISSING_CONDITION, DESC_RUNNING, DESC_SCHEDULING, DESC_SUCCEEDED, DESC_UNKNOWN,
    };

    fn succeeded(status: &str) -> Condition {
        Condition {
            r#type: CONDITION_SUCCEEDED.to_string(),
            status: status.to_string(),
            ..Default::default()
        }
    }

    fn run_status(
        started: bool,
        finished: bool,
        conditions: Vec<Condition>,
    ) -> PipelineRunStatus {
        PipelineRunStatus {
            start_time: started.then(|| "2026-01-02T03:04:05Z".to_string()),
            completion_time: finished.then(|| "2026-01-02T03:09:05Z".to_string()),
            conditions,
        }
    }

    #[test]
    fn test_final_state() {
        assert!(!final_state(None));
        assert!(!final_state(Some(ProwJobState::Triggered)));
        assert!(!final_state(Some(ProwJobState::Pending)));
        assert!(final_state(Some(ProwJobState::Success)));
        assert!(final_state(Some(ProwJobState::Failure)));
        assert!(final_state(Some(ProwJobState::Aborted)));
        assert!(final_state(Some(ProwJobState::Error)));
    }

    #[test]
    fn test_description_prefers_message_then_reason() {
        let cond = Condition {
            message: Some("the message".to_string()),
            reason: Some("TheReason".to_string()),
            ..Default::default()
        };
        assert_eq!(description(&cond, "fallback"), "the message");

        let cond = Condition {
            message: None,
            reason: Some("TheReason".to_string()),
            ..Default::default()
        };
        assert_eq!(description(&cond, "fallback"), "TheReason");

        // Empty strings count as absent.
        let cond = Condition {
            message: Some(String::new()),
            reason: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(description(&cond, "fallback"), "fallback");
    }

    #[test]
    fn test_no_condition_means_scheduling() {
        let (state, desc) = prow_job_status(&run_status(false, false, vec![]));
        assert_eq!(state, ProwJobState::Triggered);
        assert_eq!(desc, DESC_SCHEDULING);
    }

    #[test]
    fn test_no_condition_after_completion_is_error() {
        let (state, desc) = prow_job_status(&run_status(true, true, vec![]));
        assert_eq!(state, ProwJobState::Error);
        assert_eq!(desc, DESC_MISSING_CONDITION);
    }

    #[test]
    fn test_other_condition_types_are_ignored() {
        let other = Condition {
            r#type: "Ready".to_string(),
            status: CONDITION_TRUE.to_string(),
            ..Default::default()
        };
        let (state, desc) = prow_job_status(&run_status(false, false, vec![other]));
        assert_eq!(state, ProwJobState::Triggered);
        assert_eq!(desc, DESC_SCHEDULING);
    }

    #[test]
    fn test_true_condition_is_success() {
        let (state, desc) =
            prow_job_status(&run_status(true, true, vec![succeeded(CONDITION_TRUE)]));
        assert_eq!(state, ProwJobState::Success);
        assert_eq!(desc, DESC_SUCCEEDED);

        let mut cond = succeeded(CONDITION_TRUE);
        cond.message = Some("all tasks passed".to_string());
        let (state, desc) = prow_job_status(&run_status(true, true, vec![cond]));
        assert_eq!(state, ProwJobState::Success);
        assert_eq!(desc, "all tasks passed");
    }

    #[test]
    fn test_false_condition_is_failure() {
        let mut cond = succeeded(CONDITION_FALSE);
        cond.reason = Some("TaskFailed".to_string());
        let (state, desc) = prow_job_status(&run_status(true, true, vec![cond]));
        assert_eq!(state, ProwJobState::Failure);
        assert_eq!(desc, "TaskFailed");

        let (state, desc) =
            prow_job_status(&run_status(true, true, vec![succeeded(CONDITION_FALSE)]));
        assert_eq!(state, ProwJobState::Failure);
        assert_eq!(desc, DESC_FAILED);
    }

    #[test]
    fn test_unknown_before_start_is_initializing() {
        let (state, desc) =
            prow_job_status(&run_status(false, false, vec![succeeded(CONDITION_UNKNOWN)]));
        assert_eq!(state, ProwJobState::Triggered);
        assert_eq!(desc, DESC_INITIALIZING);
    }

    #[test]
    fn test_unknown_while_started_is_running() {
        let (state, desc) =
            prow_job_status(&run_status(true, false, vec![succeeded(CONDITION_UNKNOWN)]));
        assert_eq!(state, ProwJobState::Pending);
        assert_eq!(desc, DESC_RUNNING);
    }

    #[test]
    fn test_unfinished_with_odd_status_is_still_running() {
        let (state, desc) =
            prow_job_status(&run_status(true, false, vec![succeeded("Borked")]));
        assert_eq!(state, ProwJobState::Pending);
        assert_eq!(desc, DESC_RUNNING);
    }

    #[test]
    fn test_finished_with_odd_status_is_error() {
        let (state, desc) = prow_job_status(&run_status(true, true, vec![succeeded("Borked")]));
        assert_eq!(state, ProwJobState::Error);
        assert_eq!(desc, DESC_UNKNOWN);
    }
}
