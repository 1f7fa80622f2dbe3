use std::time::{Duration, Instant};

use sysinfo::System;
use tracing::{debug, info, warn};

use crate::error::FailureClass;

/// Tunable gatekeeper parameters. The defaults implement the production
/// policy; tests shrink the cooldown to keep runs fast.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Score subtracted per critical failure
    pub degrade_step: f32,
    /// Score restored per success
    pub recover_step: f32,
    /// Availability hard floor: at or below this score the backend is
    /// considered down regardless of cooldown
    pub score_floor: f32,
    /// Base cooldown after the first critical failure
    pub base_cooldown: Duration,
    /// Cap on cooldown doublings (2^max_doublings multiplier)
    pub max_doublings: u32,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            degrade_step: 0.3,
            recover_step: 0.2,
            score_floor: 0.3,
            base_cooldown: Duration::from_secs(30),
            max_doublings: 5,
        }
    }
}

/// Health Gatekeeper for the vision subsystem.
///
/// Tracks a continuous reliability score in [0, 1] plus a consecutive-failure
/// counter, and gates backend access behind an exponentially growing cooldown
/// after critical failures. Score and counter only change through
/// [`record_success`](Self::record_success) and
/// [`record_failure`](Self::record_failure).
pub struct VisionHealth {
    score: f32,
    consecutive_failures: u32,
    last_failure: Option<Instant>,
    settings: HealthSettings,
    cleanup_hook: Option<Box<dyn Fn() + Send + Sync>>,
}

impl std::fmt::Debug for VisionHealth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VisionHealth")
            .field("score", &self.score)
            .field("consecutive_failures", &self.consecutive_failures)
            .field("last_failure", &self.last_failure)
            .finish()
    }
}

impl Default for VisionHealth {
    fn default() -> Self {
        Self::new()
    }
}

impl VisionHealth {
    pub fn new() -> Self {
        Self::with_settings(HealthSettings::default())
    }

    pub fn with_settings(settings: HealthSettings) -> Self {
        Self {
            score: 1.0,
            consecutive_failures: 0,
            last_failure: None,
            settings,
            cleanup_hook: None,
        }
    }

    /// Install a best-effort cleanup action run after each critical failure
    /// (cache or temporary-resource purge). The hook must not block or panic.
    pub fn with_cleanup_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.cleanup_hook = Some(Box::new(hook));
        self
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn last_failure_at(&self) -> Option<Instant> {
        self.last_failure
    }

    /// Current mandatory wait after the last critical failure:
    /// `base_cooldown * 2^min(consecutive_failures - 1, max_doublings)`.
    /// The first failure waits the base cooldown; each further consecutive
    /// failure doubles it, up to the cap.
    pub fn cooldown(&self) -> Duration {
        let doublings = self
            .consecutive_failures
            .saturating_sub(1)
            .min(self.settings.max_doublings);
        self.settings.base_cooldown * 2u32.pow(doublings)
    }

    /// Whether the backend should be attempted right now.
    pub fn is_available(&self) -> bool {
        self.is_available_at(Instant::now())
    }

    /// Availability decision at an explicit instant. Exposed for tests and
    /// introspection; `is_available` is the production entry point.
    pub fn is_available_at(&self, now: Instant) -> bool {
        if self.score <= self.settings.score_floor {
            return false;
        }
        match self.last_failure {
            None => true,
            Some(at) => now.saturating_duration_since(at) > self.cooldown(),
        }
    }

    /// Record a successful backend round trip: recover the score, clear the
    /// failure timestamp, reset the consecutive-failure counter.
    pub fn record_success(&mut self) {
        self.score = (self.score + self.settings.recover_step).min(1.0);
        self.consecutive_failures = 0;
        self.last_failure = None;
        debug!("Vision success recorded, health score now {:.2}", self.score);
    }

    /// Record a classified backend failure. Transient failures are absorbed
    /// without touching the score; critical failures degrade it, start the
    /// cooldown clock, and trigger the defensive cleanup side effects.
    pub fn record_failure(&mut self, class: FailureClass) {
        if !class.is_critical() {
            debug!("Transient vision failure absorbed, health score unchanged");
            return;
        }

        self.score = (self.score - self.settings.degrade_step).max(0.0);
        self.consecutive_failures += 1;
        self.last_failure = Some(Instant::now());

        warn!(
            "Critical vision failure #{}, health score {:.2}, cooldown {:?}",
            self.consecutive_failures,
            self.score,
            self.cooldown()
        );

        if let Some(ref hook) = self.cleanup_hook {
            hook();
        }
        log_resource_pressure();
    }
}

/// Best-effort observability snapshot after a critical failure. Never fails;
/// the numbers are advisory only.
fn log_resource_pressure() {
    let mut system = System::new();
    system.refresh_memory();
    info!(
        "Resource pressure after critical vision failure: {} MB available of {} MB total",
        system.available_memory() / (1024 * 1024),
        system.total_memory() / (1024 * 1024),
    );
}
