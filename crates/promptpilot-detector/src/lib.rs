//! # PromptPilot Detector
//!
//! Maintains the busy/idle/unknown state of the host page's UI from the
//! boolean signals a [`UiAdapter`](promptpilot_protocols::UiAdapter)
//! exposes. Push-based: recomputes on every mutation notification plus a
//! periodic fallback tick, with debounced transitions so rapid transient
//! DOM churn does not flap the state.
//!
//! Single writer (the detector task), any number of readers via `watch`.

pub mod config;
pub mod detector;
pub mod state;

pub use config::DetectorConfig;
pub use detector::UiStateDetector;
pub use state::UiState;
