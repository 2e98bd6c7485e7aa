//! The polyphonic rendering engine.
//!
//! Owns the loaded file, a fixed pool of voices, a free-index stack,
//! and the active list in least-recently-started order. Rendering
//! interleaves sample generation with the block's timestamped MIDI
//! events; the render path never fails and never allocates once the
//! samples a preset needs are decoded.

use std::path::Path;

use tracing::{debug, trace};

use crate::dsp::sample_gen::Interpolation;
use crate::dsp::voice::Voice;
use crate::error::Error;
use crate::midi::{Channel, MidiEvent, MidiEventKind};
use crate::sf2::loader::SoundFont;
use crate::sf2::zone::PresetInfo;

/// Size of the voice pool.
pub const MAX_VOICES: usize = 64;

const DEFAULT_SAMPLE_RATE: f64 = 44100.0;
const DEFAULT_MAX_FRAMES: usize = 512;

pub struct Engine {
    font: Option<SoundFont>,
    preset_index: usize,
    channel: Channel,
    voices: Vec<Voice>,
    free: Vec<usize>,
    /// Oldest voice first; stealing pops the front.
    active: Vec<usize>,
    sample_rate: f64,
    max_frames: usize,
    interpolation: Interpolation,
}

impl Default for Engine {
    fn default() -> Self {
        Engine::new()
    }
}

impl Engine {
    pub fn new() -> Self {
        Engine {
            font: None,
            preset_index: 0,
            channel: Channel::default(),
            voices: (0..MAX_VOICES).map(|_| Voice::default()).collect(),
            free: (0..MAX_VOICES).rev().collect(),
            active: Vec::with_capacity(MAX_VOICES),
            sample_rate: DEFAULT_SAMPLE_RATE,
            max_frames: DEFAULT_MAX_FRAMES,
            interpolation: Interpolation::default(),
        }
    }

    /// Load an SF2 file and select preset 0. A failed load leaves the
    /// engine unchanged.
    pub fn load_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        let font = SoundFont::open(path)?;
        self.install(font);
        Ok(())
    }

    /// Install an already-loaded file.
    pub fn install(&mut self, font: SoundFont) {
        debug!(presets = font.preset_count(), "installing soundfont");
        self.font = Some(font);
        self.preset_index = 0;
        self.all_off();
    }

    pub fn font(&self) -> Option<&SoundFont> {
        self.font.as_ref()
    }

    pub fn preset_infos(&self) -> Vec<PresetInfo> {
        self.font.as_ref().map_or_else(Vec::new, |f| f.preset_infos())
    }

    /// Select the active preset by (bank, program) sort position.
    pub fn set_preset_index(&mut self, index: usize) -> Result<(), Error> {
        let count = self.font.as_ref().map_or(0, |f| f.preset_count());
        if index >= count {
            return Err(Error::InvalidIndex { index, count });
        }
        self.preset_index = index;
        Ok(())
    }

    pub fn preset_index(&self) -> usize {
        self.preset_index
    }

    /// Pre-render configuration only; voices configured before the
    /// change keep their old rate until retriggered.
    pub fn set_sample_rate(&mut self, sample_rate: f64) {
        self.sample_rate = sample_rate;
    }

    /// Largest frame count a single render call may ask for.
    pub fn set_max_frames_to_render(&mut self, frames: usize) {
        self.max_frames = frames;
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    pub fn active_voice_count(&self) -> usize {
        self.active.len()
    }

    /// Start voices for every zone pair the active preset matches.
    /// Velocity 0 is a note-off by MIDI convention.
    pub fn note_on(&mut self, key: u8, velocity: u8) {
        if velocity == 0 {
            self.note_off(key, velocity);
            return;
        }
        let Some(font) = self.font.as_ref() else {
            return;
        };
        let Ok(preset) = font.preset(self.preset_index) else {
            return;
        };
        for pair in preset.find(key & 0x7F, velocity & 0x7F) {
            let Ok(source) = font.sample(pair.sample_index as usize) else {
                continue;
            };
            let sample = source.load();
            let slot = match self.free.pop() {
                Some(slot) => slot,
                // Steal the longest-running voice.
                None if !self.active.is_empty() => self.active.remove(0),
                None => continue,
            };
            self.voices[slot].configure(
                &pair,
                key & 0x7F,
                velocity & 0x7F,
                source.header(),
                sample,
                &self.channel,
                self.sample_rate,
                self.max_frames,
                self.interpolation,
            );
            let class = self.voices[slot].exclusive_class();
            if class != 0 {
                for idx in (0..self.active.len()).rev() {
                    let other = self.active[idx];
                    if self.voices[other].exclusive_class() == class {
                        self.active.remove(idx);
                        self.free.push(other);
                    }
                }
            }
            trace!(key, velocity, slot, "voice on");
            self.active.push(slot);
        }
    }

    /// Gate every voice started by `key` into release.
    pub fn note_off(&mut self, key: u8, _velocity: u8) {
        for &slot in &self.active {
            if self.voices[slot].event_key() == key & 0x7F {
                self.voices[slot].release_key();
            }
        }
    }

    pub fn control_change(&mut self, controller: u8, value: u8) {
        self.channel.set_continuous_control(controller, value);
    }

    pub fn channel_pressure(&mut self, value: u8) {
        self.channel.set_channel_pressure(value);
    }

    pub fn key_pressure(&mut self, key: u8, value: u8) {
        self.channel.set_key_pressure(key, value);
    }

    pub fn pitch_wheel(&mut self, value: u16) {
        self.channel.set_pitch_wheel(value);
    }

    pub fn pitch_wheel_sensitivity(&mut self, semitones: u8) {
        self.channel.set_pitch_wheel_sensitivity(semitones);
    }

    /// Reclaim every active voice immediately.
    pub fn all_off(&mut self) {
        while let Some(slot) = self.active.pop() {
            self.free.push(slot);
        }
    }

    /// Render a block, applying `events` at their sample offsets.
    /// Offsets past the block end clamp to it; an offset earlier than a
    /// preceding event's applies at that event's position. The buffers
    /// are fully overwritten.
    pub fn render(
        &mut self,
        left: &mut [f32],
        right: &mut [f32],
        events: &[MidiEvent],
    ) -> Result<(), Error> {
        let frames = left.len().min(right.len());
        if frames > self.max_frames {
            return Err(Error::CapacityExceeded {
                requested: frames,
                max: self.max_frames,
            });
        }
        left.fill(0.0);
        right.fill(0.0);

        let mut cursor = 0;
        for event in events {
            // Out-of-range or out-of-order offsets clamp to the cursor.
            let offset = event.offset.min(frames).max(cursor);
            self.render_segment(&mut left[cursor..offset], &mut right[cursor..offset]);
            cursor = offset;
            self.apply_event(event.kind);
        }
        self.render_segment(&mut left[cursor..frames], &mut right[cursor..frames]);

        // Reap voices that went silent this block.
        let mut idx = 0;
        while idx < self.active.len() {
            let slot = self.active[idx];
            if self.voices[slot].is_active() {
                idx += 1;
            } else {
                self.active.remove(idx);
                self.free.push(slot);
                trace!(slot, "voice reaped");
            }
        }
        Ok(())
    }

    fn render_segment(&mut self, left: &mut [f32], right: &mut [f32]) {
        let channel = &self.channel;
        for &slot in &self.active {
            let voice = &mut self.voices[slot];
            for (l, r) in left.iter_mut().zip(right.iter_mut()) {
                let (vl, vr) = voice.next_sample(channel);
                *l += vl as f32;
                *r += vr as f32;
            }
        }
    }

    fn apply_event(&mut self, kind: MidiEventKind) {
        match kind {
            MidiEventKind::NoteOn { key, velocity } => self.note_on(key, velocity),
            MidiEventKind::NoteOff { key, velocity } => self.note_off(key, velocity),
            MidiEventKind::ControlChange { controller, value } => {
                self.control_change(controller, value)
            }
            MidiEventKind::ChannelPressure { value } => self.channel_pressure(value),
            MidiEventKind::KeyPressure { key, value } => self.key_pressure(key, value),
            MidiEventKind::PitchWheel { value } => self.pitch_wheel(value),
            MidiEventKind::PitchWheelSensitivity { value } => {
                self.pitch_wheel_sensitivity(value)
            }
            MidiEventKind::AllOff => self.all_off(),
        }
    }
}
