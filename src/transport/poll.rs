// MIT License - Copyright (c) 2021 TJForc
// Submit-then-poll protocol of the long-running report jobs

use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::validate_poll_attempts;
use crate::constants::JOB_STATUS_DONE;
use crate::error::{EOneError, Result};
use crate::transport::{Method, Transport};

/// Envelope returned by every poll GET.
#[derive(Debug, Deserialize)]
struct JobEnvelope {
    #[serde(default)]
    status: Option<String>,
    /// JSON-encoded payload, present once the job is done
    #[serde(default)]
    response: Option<Value>,
}

/// Drives one kind of server-side job: submit with a fresh correlation id,
/// then GET `{endpoint}/{id}` until the server reports it done.
///
/// The same id is used for the submit and every poll of that job. Any
/// non-2xx reply or unreadable envelope costs one attempt; an unreachable
/// service ends the job at once.
#[derive(Debug, Clone)]
pub struct JobPoller {
    job: &'static str,
    endpoint: String,
    max_attempts: u32,
    interval: Duration,
}

impl JobPoller {
    pub fn new(job: &'static str, endpoint: impl Into<String>, max_attempts: u32) -> Result<Self> {
        validate_poll_attempts(max_attempts)?;
        Ok(Self {
            job,
            endpoint: endpoint.into(),
            max_attempts,
            interval: Duration::ZERO,
        })
    }

    /// Pause between polls. Zero (the default) polls back to back.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Run a job under a freshly generated correlation id and return its
    /// decoded payload text.
    pub async fn run<T: Transport>(&self, transport: &T, body: &str) -> Result<String> {
        self.run_with_id(transport, body, Uuid::new_v4()).await
    }

    /// Run a job under the given correlation id.
    pub async fn run_with_id<T: Transport>(
        &self,
        transport: &T,
        body: &str,
        job_id: Uuid,
    ) -> Result<String> {
        let path = format!("{}/{}", self.endpoint, job_id);
        info!("Submitting {} job {}", self.job, job_id);

        let submitted = transport.send(Method::Post, &path, Some(body)).await?;
        if submitted.is_unreachable() {
            return Err(unreachable(self.job));
        }
        if !submitted.is_success() {
            warn!("{} job submit returned HTTP {}", self.job, submitted.status);
        }

        for attempt in 1..=self.max_attempts {
            if attempt > 1 && !self.interval.is_zero() {
                tokio::time::sleep(self.interval).await;
            }

            let resp = transport.send(Method::Get, &path, None).await?;
            if resp.is_unreachable() {
                return Err(unreachable(self.job));
            }
            if !resp.is_success() {
                warn!(
                    "{} poll {}/{} returned HTTP {}",
                    self.job, attempt, self.max_attempts, resp.status
                );
                continue;
            }

            let envelope: JobEnvelope = match serde_json::from_str(&resp.body) {
                Ok(env) => env,
                Err(e) => {
                    warn!("{} poll {}/{}: unreadable reply: {}", self.job, attempt, self.max_attempts, e);
                    continue;
                }
            };

            if envelope.status.as_deref() != Some(JOB_STATUS_DONE) {
                debug!(
                    "{} job pending ({}/{}): {:?}",
                    self.job, attempt, self.max_attempts, envelope.status
                );
                continue;
            }

            let payload = match envelope.response {
                Some(Value::String(text)) => text,
                Some(other) => other.to_string(),
                None => {
                    return Err(EOneError::Protocol {
                        reason: format!("{} job done without a response payload", self.job),
                        status: resp.status,
                        message: None,
                    })
                }
            };
            info!("{} job {} done after {} poll(s)", self.job, job_id, attempt);
            return Ok(payload);
        }

        Err(EOneError::PollTimeout {
            job: self.job,
            attempts: self.max_attempts,
        })
    }
}

fn unreachable(job: &str) -> EOneError {
    EOneError::Transport {
        reason: format!("Service unreachable while running {job} job"),
        status: 0,
        message: None,
    }
}
