//! Lazily normalized sample data.
//!
//! Every sample header gets one [`SampleSource`] sharing the raw 16-bit
//! PCM blob. Nothing is decoded until a voice first plays the sample;
//! the decoded buffer is then cached until an explicit [`unload`].
//!
//! [`unload`]: SampleSource::unload

use std::sync::{Arc, Mutex};

use tracing::trace;

use crate::sf2::records::SampleHeader;

/// Zero-valued points appended after each sample so interpolators can
/// read past the end without bounds checks.
pub const GUARD_POINTS: usize = 46;

/// A decoded, normalized sample buffer.
#[derive(Debug)]
pub struct LoadedSample {
    /// Samples in [-1, 1], `header.len() + GUARD_POINTS` entries.
    pub data: Vec<f64>,
    /// Largest magnitude over the whole sample.
    pub max_magnitude: f64,
    /// Largest magnitude over the loop region.
    pub loop_max_magnitude: f64,
}

/// One sample header's window into the shared PCM blob, decoded on
/// first use.
pub struct SampleSource {
    header: SampleHeader,
    raw: Arc<Vec<i16>>,
    cache: Mutex<Option<Arc<LoadedSample>>>,
}

impl SampleSource {
    pub fn new(header: SampleHeader, raw: Arc<Vec<i16>>) -> Self {
        SampleSource {
            header,
            raw,
            cache: Mutex::new(None),
        }
    }

    pub fn header(&self) -> &SampleHeader {
        &self.header
    }

    pub fn is_loaded(&self) -> bool {
        match self.cache.lock() {
            Ok(guard) => guard.is_some(),
            Err(poisoned) => poisoned.into_inner().is_some(),
        }
    }

    /// Decode and cache the normalized buffer. Idempotent; callers get
    /// a shared handle they can hold across an [`unload`] of the cache.
    ///
    /// [`unload`]: SampleSource::unload
    pub fn load(&self) -> Arc<LoadedSample> {
        let mut guard = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(loaded) = guard.as_ref() {
            return Arc::clone(loaded);
        }
        let loaded = Arc::new(self.decode());
        trace!(
            sample = %self.header.name,
            points = loaded.data.len() - GUARD_POINTS,
            "decoded sample"
        );
        *guard = Some(Arc::clone(&loaded));
        loaded
    }

    /// Drop the cached buffer. Voices holding a handle keep playing
    /// from their copy; the next `load` decodes again.
    pub fn unload(&self) {
        let mut guard = match self.cache.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = None;
    }

    fn decode(&self) -> LoadedSample {
        let total = self.raw.len() as u32;
        let start = self.header.start.min(total) as usize;
        let end = self.header.end.clamp(self.header.start, total) as usize;

        let mut data = Vec::with_capacity(end - start + GUARD_POINTS);
        data.extend(self.raw[start..end].iter().map(|&s| s as f64 / 32768.0));
        data.resize(end - start + GUARD_POINTS, 0.0);

        let max_magnitude = peak(&data[..end - start]);

        // Loop offsets are absolute blob positions; make them relative
        // and clamp to the decoded window.
        let len = end - start;
        let loop_start = (self.header.loop_start.saturating_sub(start as u32) as usize).min(len);
        let loop_end = (self.header.loop_end.saturating_sub(start as u32) as usize)
            .clamp(loop_start, len);
        let loop_max_magnitude = peak(&data[loop_start..loop_end]);

        LoadedSample {
            data,
            max_magnitude,
            loop_max_magnitude,
        }
    }
}

fn peak(samples: &[f64]) -> f64 {
    samples.iter().fold(0.0, |acc, &s| acc.max(s.abs()))
}

impl std::fmt::Debug for SampleSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SampleSource")
            .field("header", &self.header.name)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}
