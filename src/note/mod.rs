//! Note schema for experiment tracking
//!
//! A [`Note`] is one experiment: what was tried (`parameters`, `features`,
//! `model`, `target`), how it went (`metrics`), free-form `info`, and where it
//! ran (`python_path`, `git`).
//!
//! ## Lifecycle
//!
//! ```text
//! Note::new ──> open ──end()──> closed ──Store::add──> persisted
//!                 ^                                        │
//!                 └──────── Note::derive_from ─────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use hypernotes::note::Note;
//!
//! let mut note = Note::new("gradient boosting, no imputation");
//! note.parameters_mut().insert("learning_rate".into(), 0.1.into());
//! note.features_mut().numerical_mut().push("amount".into());
//! note.metrics_mut().insert("accuracy".into(), 0.87.into());
//! note.end();
//!
//! // Sweep variant sharing the same base configuration
//! let mut variant = Note::derive_from(&note);
//! variant.parameters_mut().insert("learning_rate".into(), 0.05.into());
//! assert_ne!(variant.identifier(), note.identifier());
//! ```

mod features;
mod finite;
mod provenance;
mod record;
pub mod timestamp;

pub use features::{Features, DEFAULT_CATEGORIES};
pub use provenance::{GitInfo, Provenance};
pub use record::{Note, NoteBuilder};
