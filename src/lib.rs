//! A SoundFont 2 sampler synthesizer core.
//!
//! Load an SF2 file, pick a preset, feed MIDI events, render stereo
//! float blocks:
//!
//! ```no_run
//! use sf2synth::{Engine, MidiEvent, MidiEventKind};
//!
//! # fn main() -> Result<(), sf2synth::Error> {
//! let mut engine = Engine::new();
//! engine.set_sample_rate(48000.0);
//! engine.load_file("font.sf2")?;
//! engine.set_preset_index(0)?;
//!
//! let mut left = [0.0f32; 256];
//! let mut right = [0.0f32; 256];
//! let events = [MidiEvent::new(0, MidiEventKind::NoteOn { key: 60, velocity: 100 })];
//! engine.render(&mut left, &mut right, &events)?;
//! # Ok(())
//! # }
//! ```
//!
//! The crate splits into two halves: [`sf2`] parses the RIFF container
//! into presets, instruments, zones, and lazily decoded samples;
//! [`dsp`] turns resolved zones into sound through a fixed pool of
//! voices, each with two envelopes, two LFOs, an interpolated read
//! head, and a resonant low-pass filter.

pub mod dsp;
pub mod error;
pub mod midi;
pub mod sf2;

pub use dsp::{Engine, Interpolation, MAX_VOICES};
pub use error::Error;
pub use midi::{Channel, MidiEvent, MidiEventKind};
pub use sf2::{FileInfo, PresetInfo, SoundFont};
