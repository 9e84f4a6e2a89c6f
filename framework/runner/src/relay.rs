use std::time::{Duration, Instant};

use crate::progress::{ProgressListener, ProgressSnapshot};

/// Minimum time between two delivered updates.
const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Minimum progress increase, in percentage points, that is sent without waiting for [`MIN_INTERVAL`].
const MIN_STEP: f64 = 2.0;

/// Posts progress snapshots as JSON to an HTTP endpoint.
///
/// Delivery is best effort. A failed or slow request is logged and dropped, the next update is
/// tried as normal and the benchmark is never affected.
pub struct ProgressRelay {
    url: String,
    auth: Option<String>,
    agent: ureq::Agent,
    last_sent: Option<(Instant, Option<f64>)>,
}

impl ProgressRelay {
    pub fn new(url: impl Into<String>, auth: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::config::Config::builder()
            .timeout_global(Some(timeout))
            .build()
            .new_agent();

        Self {
            url: url.into(),
            auth,
            agent,
            last_sent: None,
        }
    }

    fn should_send(&self, progress: Option<f64>, now: Instant) -> bool {
        let Some((at, last_progress)) = self.last_sent else {
            return true;
        };
        if now.duration_since(at) >= MIN_INTERVAL {
            return true;
        }
        match (progress, last_progress) {
            (Some(progress), _) if progress >= 100.0 => true,
            (Some(progress), Some(last)) => progress - last >= MIN_STEP,
            (Some(_), None) => true,
            (None, _) => false,
        }
    }

    fn send(&mut self, snapshot: &ProgressSnapshot) {
        let now = Instant::now();
        if !self.should_send(snapshot.progress, now) {
            log::trace!(
                "Skipping progress update after {:.1}s",
                snapshot.elapsed_secs
            );
            return;
        }

        let mut request = self.agent.post(&self.url);
        if let Some(token) = &self.auth {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        match request.send_json(snapshot) {
            Ok(_) => {
                log::debug!(
                    "Sent progress update after {:.1}s",
                    snapshot.elapsed_secs
                );
                self.last_sent = Some((now, snapshot.progress));
            }
            Err(e) => {
                log::warn!("Failed to send progress update to {}: {}", self.url, e);
            }
        }
    }
}

impl ProgressListener for ProgressRelay {
    fn on_start(&mut self, snapshot: &ProgressSnapshot) {
        self.send(snapshot);
    }

    fn on_update(&mut self, snapshot: &ProgressSnapshot) {
        self.send(snapshot);
    }
}
