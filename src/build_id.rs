// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Build-ID vending.
//!
//! Build IDs come from a "tot" style vending service: `GET
//! {tot_url}/vend/{job}` returns the next monotonically increasing ID for
//! that job as the response body. Vending is retried a bounded number of
//! times since tot restarts are routine during deploys.

use std::time::Duration;

use tracing::{debug, warn};

use crate::crd::ProwJob;
use crate::errors::Error;

/// Attempts before giving up on the vending service.
const VEND_ATTEMPTS: u32 = 5;

/// Delay between vending attempts.
const VEND_BACKOFF: Duration = Duration::from_secs(2);

/// Client for the build-ID vending service plus job-URL derivation.
#[derive(Clone, Debug)]
pub struct BuildIdClient {
    http: reqwest::Client,
    tot_url: String,
    job_url_prefix: String,
}

impl BuildIdClient {
    /// Create a client against `tot_url`. `job_url_prefix` is the base of
    /// the public results viewer; empty disables URL derivation.
    #[must_use]
    pub fn new(tot_url: String, job_url_prefix: String) -> Self {
        BuildIdClient {
            http: reqwest::Client::new(),
            tot_url,
            job_url_prefix,
        }
    }

    /// Vend the next build ID for `job`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BuildIdVend`] when every attempt fails or the
    /// service answers with a non-success status.
    pub async fn vend(&self, job: &str) -> Result<String, Error> {
        let url = format!("{}/vend/{}", self.tot_url.trim_end_matches('/'), job);
        let mut last_err = String::new();

        for attempt in 1..=VEND_ATTEMPTS {
            debug!(job = %job, attempt, "Vending build id");
            match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => {
                    let id = resp.text().await.map_err(|e| Error::BuildIdVend {
                        job: job.to_string(),
                        reason: e.to_string(),
                    })?;
                    return Ok(id.trim().to_string());
                }
                Ok(resp) => {
                    last_err = format!("unexpected status {}", resp.status());
                }
                Err(e) => {
                    last_err = e.to_string();
                }
            }
            warn!(job = %job, attempt, error = %last_err, "Build id vend attempt failed");
            if attempt < VEND_ATTEMPTS {
                tokio::time::sleep(VEND_BACKOFF).await;
            }
        }

        Err(Error::BuildIdVend {
            job: job.to_string(),
            reason: last_err,
        })
    }

    /// Public results URL for a job run, or empty when no viewer prefix is
    /// configured.
    #[must_use]
    pub fn job_url(&self, pj: &ProwJob, build_id: &str) -> String {
        if self.job_url_prefix.is_empty() {
            return String::new();
        }
        format!(
            "{}/{}/{}",
            self.job_url_prefix.trim_end_matches('/'),
            pj.spec.job,
            build_id
        )
    }
}

#[cfg(test)]
#[path = "build_id_tests.rs"]
mod build_id_tests;
