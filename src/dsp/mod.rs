//! Rendering: tables, envelopes, LFOs, filter, voices, engine.

pub mod engine;
pub mod envelope;
pub mod filter;
pub mod lfo;
pub mod pitch;
pub mod sample_gen;
pub mod state;
pub mod tables;
pub mod voice;

pub use engine::{Engine, MAX_VOICES};
pub use envelope::{Envelope, EnvelopeConfig, Stage};
pub use filter::Filter;
pub use lfo::Lfo;
pub use sample_gen::{Bounds, Interpolation, SampleGenerator};
pub use state::{ModContext, VoiceState};
pub use voice::Voice;
