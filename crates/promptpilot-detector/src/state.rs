//! UI state machine values.

use serde::Serialize;

/// Observed state of the host page's input surface.
///
/// Transitions: `Unknown → Idle`, `Idle ⇄ Busy`, and any state back to
/// `Unknown` on teardown. Only the detector writes this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UiState {
    /// No observation has been committed yet (initial, and after teardown).
    Unknown,
    /// The page accepts a new prompt.
    Idle,
    /// The page is generating, or its state is ambiguous. Ambiguity is
    /// deliberately busy, never idle, to rule out double submission.
    Busy,
}

impl std::fmt::Display for UiState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Idle => write!(f, "idle"),
            Self::Busy => write!(f, "busy"),
        }
    }
}

/// Combine the adapter's raw signals into a state.
///
/// Busy indicator wins; otherwise both the input surface and the submit
/// control must be enabled for idle; anything else is busy.
pub fn combine_signals(input_enabled: bool, submit_enabled: bool, busy_indicator: bool) -> UiState {
    if busy_indicator {
        UiState::Busy
    } else if input_enabled && submit_enabled {
        UiState::Idle
    } else {
        UiState::Busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_indicator_wins_over_enabled_controls() {
        assert_eq!(combine_signals(true, true, true), UiState::Busy);
    }

    #[test]
    fn test_both_controls_enabled_is_idle() {
        assert_eq!(combine_signals(true, true, false), UiState::Idle);
    }

    #[test]
    fn test_ambiguity_defaults_to_busy() {
        assert_eq!(combine_signals(true, false, false), UiState::Busy);
        assert_eq!(combine_signals(false, true, false), UiState::Busy);
        assert_eq!(combine_signals(false, false, false), UiState::Busy);
    }
}
