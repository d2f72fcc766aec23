use std::time::Duration;

/// Tunable knobs for the preemption core.
///
/// This is a plain struct with programmatic defaults, not a config-file or
/// CLI layer (that's an external collaborator per the crate's scope). The
/// `from_env` constructor exists for binaries that want environment-driven
/// overrides without pulling in a config-file parser.
#[derive(Clone, Debug)]
pub struct PreemptionConfig {
    /// Grace period, in whole seconds, between a container's first mark
    /// and its promotion into the kill set.
    ///
    /// Purpose:
    /// - give the node agent / application time to react to the mark
    ///   before the container is actually torn down
    /// - bound how long a debtor queue can keep resources past the point
    ///   a creditor started demanding them back
    pub wait_before_kill_sec: u64,

    /// Capacity hint for the measure store's queue-partition map.
    ///
    /// Purely a sizing hint for the initial allocation; the map grows
    /// past this without error.
    pub initial_measure_capacity: usize,

    /// Capacity hint for the relationship store's demanding-app map.
    pub initial_demander_capacity: usize,

    /// Threshold above which a single `select` scan logs a `warn!`
    /// instead of completing silently. Purely observability; does not
    /// affect the selection outcome.
    pub selection_scan_warn_threshold: Duration,
}

impl Default for PreemptionConfig {
    fn default() -> Self {
        Self {
            wait_before_kill_sec: 30,
            initial_measure_capacity: 256,
            initial_demander_capacity: 128,
            selection_scan_warn_threshold: Duration::from_millis(5),
        }
    }
}

impl PreemptionConfig {
    /// Load configuration from the process environment, falling back to
    /// [`PreemptionConfig::default`] for anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let wait_before_kill_sec = std::env::var("PREEMPTION_WAIT_BEFORE_KILL_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.wait_before_kill_sec);

        let initial_measure_capacity = std::env::var("PREEMPTION_INITIAL_MEASURE_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.initial_measure_capacity);

        let initial_demander_capacity = std::env::var("PREEMPTION_INITIAL_DEMANDER_CAPACITY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.initial_demander_capacity);

        Self {
            wait_before_kill_sec,
            initial_measure_capacity,
            initial_demander_capacity,
            ..defaults
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_spec_constant() {
        assert_eq!(PreemptionConfig::default().wait_before_kill_sec, 30);
    }

    #[test]
    fn from_env_falls_back_to_default_when_unset() {
        // SAFETY-adjacent note: tests run single-threaded for env vars we
        // touch here only within this test body; no other test reads
        // these keys.
        unsafe {
            std::env::remove_var("PREEMPTION_WAIT_BEFORE_KILL_SEC");
        }
        let cfg = PreemptionConfig::from_env();
        assert_eq!(cfg.wait_before_kill_sec, 30);
    }

    #[test]
    fn from_env_honors_override() {
        unsafe {
            std::env::set_var("PREEMPTION_WAIT_BEFORE_KILL_SEC", "45");
        }
        let cfg = PreemptionConfig::from_env();
        assert_eq!(cfg.wait_before_kill_sec, 45);
        unsafe {
            std::env::remove_var("PREEMPTION_WAIT_BEFORE_KILL_SEC");
        }
    }
}
