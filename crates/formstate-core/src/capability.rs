#![forbid(unsafe_code)]

//! Drafting capability probe.
//!
//! Whether copy-on-write drafting is available is decided once per process
//! (or injected per model) and never re-consulted per mutation. Detection
//! reads `FORMSTATE_DRAFTING`; `0`, `off`, `false` and `no` disable drafting,
//! anything else (including unset) leaves it enabled.

use std::env;
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

/// Environment variable consulted by [`DraftSupport::detect`].
pub const DRAFTING_ENV: &str = "FORMSTATE_DRAFTING";

static DETECTED: OnceLock<DraftSupport> = OnceLock::new();

/// Whether patch-recording drafts can be used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftSupport {
    /// Mutations run against a structurally shared draft that records patches.
    #[default]
    Intercepted,
    /// Only plain copies are available; changes are found by diffing.
    Unavailable,
}

impl DraftSupport {
    /// Process-wide capability, resolved on first call.
    #[must_use]
    pub fn detect() -> Self {
        *DETECTED.get_or_init(|| {
            let raw = env::var(DRAFTING_ENV).ok();
            let support = Self::detect_from(raw.as_deref());
            tracing::debug!(?support, "resolved drafting capability");
            support
        })
    }

    /// Interpret a raw `FORMSTATE_DRAFTING` value.
    #[must_use]
    pub fn detect_from(raw: Option<&str>) -> Self {
        match raw.map(|v| v.trim().to_ascii_lowercase()) {
            Some(v) if matches!(v.as_str(), "0" | "off" | "false" | "no") => Self::Unavailable,
            _ => Self::Intercepted,
        }
    }

    #[must_use]
    pub fn is_available(self) -> bool {
        self == Self::Intercepted
    }
}

impl From<bool> for DraftSupport {
    fn from(available: bool) -> Self {
        if available {
            Self::Intercepted
        } else {
            Self::Unavailable
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_means_available() {
        assert_eq!(DraftSupport::detect_from(None), DraftSupport::Intercepted);
        assert_eq!(DraftSupport::detect_from(Some("")), DraftSupport::Intercepted);
        assert_eq!(DraftSupport::detect_from(Some("1")), DraftSupport::Intercepted);
    }

    #[test]
    fn falsy_values_disable() {
        for raw in ["0", "off", "FALSE", " no "] {
            assert_eq!(
                DraftSupport::detect_from(Some(raw)),
                DraftSupport::Unavailable,
                "{raw:?}"
            );
        }
    }

    #[test]
    fn detect_is_stable() {
        assert_eq!(DraftSupport::detect(), DraftSupport::detect());
    }

    #[test]
    fn from_bool() {
        assert!(DraftSupport::from(true).is_available());
        assert!(!DraftSupport::from(false).is_available());
    }
}
