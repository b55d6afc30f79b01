// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Projection of a pipeline's condition history onto a ProwJob state.
//!
//! [`prow_job_status`] is a pure function so the precedence rules stay
//! testable without a cluster: terminal signals beat temporal signals, and
//! a condition's message beats its reason beats the fallback text.

use tracing::warn;

use crate::crd::{Condition, PipelineRunStatus, ProwJobState};

/// Condition type Tekton uses to report overall pipeline outcome.
pub const CONDITION_SUCCEEDED: &str = "Succeeded";

/// Condition status values.
pub const CONDITION_TRUE: &str = "True";
pub const CONDITION_FALSE: &str = "False";
pub const CONDITION_UNKNOWN: &str = "Unknown";

// Fallback descriptions when the pipeline reports neither message nor reason.
pub const DESC_SCHEDULING: &str = "scheduling";
pub const DESC_INITIALIZING: &str = "initializing";
pub const DESC_RUNNING: &str = "running";
pub const DESC_SUCCEEDED: &str = "succeeded";
pub const DESC_FAILED: &str = "failed";
pub const DESC_UNKNOWN: &str = "unknown status";
pub const DESC_MISSING_CONDITION: &str = "missing end condition";

/// True when the job has already finished and must never be mutated again.
///
/// Everything except unset, `Triggered` and `Pending` is terminal; that
/// includes `Aborted`, which only external actors set.
#[must_use]
pub fn final_state(state: Option<ProwJobState>) -> bool {
    !matches!(
        state,
        None | Some(ProwJobState::Triggered) | Some(ProwJobState::Pending)
    )
}

/// Description for a condition: message, else reason, else the fallback.
#[must_use]
pub fn description(cond: &Condition, fallback: &str) -> String {
    if let Some(message) = cond.message.as_deref() {
        if !message.is_empty() {
            return message.to_string();
        }
    }
    if let Some(reason) = cond.reason.as_deref() {
        if !reason.is_empty() {
            return reason.to_string();
        }
    }
    fallback.to_string()
}

/// Map a pipeline's observed status to the job state and description the
/// owning ProwJob should carry.
///
/// Ordering is deliberate:
///
/// 1. No `Succeeded` condition yet: `Error` if the pipeline claims to have
///    finished anyway, otherwise `Triggered` ("scheduling").
/// 2. `True` -> `Success`, `False` -> `Failure`.
/// 3. `Unknown` before the pipeline started -> `Triggered`
///    ("initializing").
/// 4. `Unknown` while started, or not yet finished -> `Pending`
///    ("running").
/// 5. Anything else should not occur and is projected to `Error`.
#[must_use]
pub fn prow_job_status(ps: &PipelineRunStatus) -> (ProwJobState, String) {
    let started = ps.start_time.is_some();
    let finished = ps.completion_time.is_some();

    let Some(cond) = ps.get_condition(CONDITION_SUCCEEDED) else {
        if finished {
            return (ProwJobState::Error, DESC_MISSING_CONDITION.to_string());
        }
        return (ProwJobState::Triggered, DESC_SCHEDULING.to_string());
    };

    if cond.status == CONDITION_TRUE {
        return (ProwJobState::Success, description(cond, DESC_SUCCEEDED));
    }
    if cond.status == CONDITION_FALSE {
        return (ProwJobState::Failure, description(cond, DESC_FAILED));
    }
    if !started {
        return (ProwJobState::Triggered, description(cond, DESC_INITIALIZING));
    }
    if cond.status == CONDITION_UNKNOWN || !finished {
        return (ProwJobState::Pending, description(cond, DESC_RUNNING));
    }

    warn!(condition = ?cond, "Unknown pipeline condition");
    (ProwJobState::Error, description(cond, DESC_UNKNOWN))
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod status_tests;
