//! SF2 file parsing and the navigable entity model.

pub mod generator;
pub mod loader;
pub mod modulator;
pub mod records;
pub mod riff;
pub mod sample;
pub mod zone;

#[cfg(test)]
pub mod test_font;

pub use generator::{Amount, Generator, GENERATOR_COUNT};
pub use loader::{FileInfo, SoundFont};
pub use sample::{LoadedSample, SampleSource};
pub use zone::{Instrument, Preset, PresetInfo, Zone, ZonePair};
