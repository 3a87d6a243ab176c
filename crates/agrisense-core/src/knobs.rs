//! Runtime configuration knobs read from the process environment.
//!
//! The core consumes exactly four knobs; everything else is carried in the
//! farm configuration or entry-point arguments. Values are read once per
//! process and cached.

use std::sync::OnceLock;

use tracing::warn;

/// Default ring-buffer depth: 24 h of history at 15-minute cadence.
pub const DEFAULT_HISTORY_SIZE: usize = 96;

/// Default sampling cadence in minutes.
pub const DEFAULT_CADENCE_MINUTES: u32 = 15;

/// Default per-channel dropout rate for synthetic missingness.
pub const DEFAULT_DROPOUT_RATE: f32 = 0.03;

/// Environment-derived runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeKnobs {
    /// `FORCE_HOST_BACKEND`: disable the parallel lane regardless of probe.
    pub force_host_backend: bool,
    /// `HISTORY_SIZE`: ring-buffer depth `H` for newly built layers.
    pub history_size: usize,
    /// Sampling cadence in minutes (fixed default; no env override).
    pub cadence_minutes: u32,
    /// Synthetic dropout rate (fixed default; no env override).
    pub dropout_rate: f32,
}

impl Default for RuntimeKnobs {
    fn default() -> Self {
        Self {
            force_host_backend: false,
            history_size: DEFAULT_HISTORY_SIZE,
            cadence_minutes: DEFAULT_CADENCE_MINUTES,
            dropout_rate: DEFAULT_DROPOUT_RATE,
        }
    }
}

impl RuntimeKnobs {
    /// Reads the knobs from the process environment.
    ///
    /// Unparseable values fall back to the defaults with a warning rather
    /// than failing startup.
    pub fn from_env() -> Self {
        let force_host_backend = std::env::var("FORCE_HOST_BACKEND")
            .map(|v| is_truthy(&v))
            .unwrap_or(false);

        let history_size = match std::env::var("HISTORY_SIZE") {
            Ok(raw) => match raw.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(value = %raw, "Ignoring invalid HISTORY_SIZE, using default");
                    DEFAULT_HISTORY_SIZE
                }
            },
            Err(_) => DEFAULT_HISTORY_SIZE,
        };

        Self {
            force_host_backend,
            history_size,
            cadence_minutes: DEFAULT_CADENCE_MINUTES,
            dropout_rate: DEFAULT_DROPOUT_RATE,
        }
    }

    /// Process-wide knobs, read once on first access.
    pub fn global() -> &'static RuntimeKnobs {
        static KNOBS: OnceLock<RuntimeKnobs> = OnceLock::new();
        KNOBS.get_or_init(RuntimeKnobs::from_env)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let knobs = RuntimeKnobs::default();
        assert_eq!(knobs.history_size, 96);
        assert_eq!(knobs.cadence_minutes, 15);
        assert!((knobs.dropout_rate - 0.03).abs() < f32::EPSILON);
        assert!(!knobs.force_host_backend);
    }

    #[test]
    fn test_truthy_parsing() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy(" yes "));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("false"));
        assert!(!is_truthy(""));
    }
}
