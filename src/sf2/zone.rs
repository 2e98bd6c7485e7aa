//! Zones, instruments, and presets.
//!
//! A zone is a bundle of generators and modulators guarded by key and
//! velocity ranges. The last generator of a non-global zone links it
//! onward: preset zones link to an instrument, instrument zones to a
//! sample header. A first zone without that terminal generator is the
//! global zone and supplies defaults for its siblings.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::sf2::generator::Generator;
use crate::sf2::records::{GeneratorRecord, ModulatorRecord};

/// Full MIDI range used when a zone has no range generator.
const FULL_RANGE: (u8, u8) = (0, 127);

/// One zone: ranges, generator list, modulator list, and the terminal
/// link (`None` for a global zone).
#[derive(Debug, Clone)]
pub struct Zone {
    key_range: (u8, u8),
    velocity_range: (u8, u8),
    generators: Vec<GeneratorRecord>,
    modulators: Vec<ModulatorRecord>,
    link: Option<u16>,
}

impl Zone {
    /// Classify a zone from its record slices. `terminal` is
    /// [`Generator::Instrument`] for preset zones and
    /// [`Generator::SampleId`] for instrument zones.
    pub fn new(
        generators: Vec<GeneratorRecord>,
        modulators: Vec<ModulatorRecord>,
        terminal: Generator,
    ) -> Self {
        let link = generators
            .last()
            .filter(|record| record.generator() == Some(terminal))
            .map(|record| record.amount.unsigned());
        let mut key_range = FULL_RANGE;
        let mut velocity_range = FULL_RANGE;
        for record in &generators {
            match record.generator() {
                Some(Generator::KeyRange) => key_range = record.amount.range(),
                Some(Generator::VelocityRange) => velocity_range = record.amount.range(),
                _ => {}
            }
        }
        Zone {
            key_range,
            velocity_range,
            generators,
            modulators,
            link,
        }
    }

    pub fn is_global(&self) -> bool {
        self.link.is_none()
    }

    /// Index of the linked instrument or sample header.
    pub fn link(&self) -> Option<u16> {
        self.link
    }

    pub fn key_range(&self) -> (u8, u8) {
        self.key_range
    }

    pub fn velocity_range(&self) -> (u8, u8) {
        self.velocity_range
    }

    pub fn contains(&self, key: u8, velocity: u8) -> bool {
        let (key_low, key_high) = self.key_range;
        let (vel_low, vel_high) = self.velocity_range;
        (key_low..=key_high).contains(&key) && (vel_low..=vel_high).contains(&velocity)
    }

    pub fn generators(&self) -> &[GeneratorRecord] {
        &self.generators
    }

    pub fn modulators(&self) -> &[ModulatorRecord] {
        &self.modulators
    }
}

/// An ordered zone list with its optional global zone split out.
///
/// Only the first zone may be global; later zones without a terminal
/// generator are malformed and dropped.
#[derive(Debug, Clone, Default)]
pub struct ZoneList {
    global: Option<Zone>,
    zones: Vec<Zone>,
}

impl ZoneList {
    pub fn new(zones: Vec<Zone>) -> Self {
        let mut list = ZoneList::default();
        for (i, zone) in zones.into_iter().enumerate() {
            if zone.is_global() {
                if i == 0 {
                    list.global = Some(zone);
                }
                continue;
            }
            list.zones.push(zone);
        }
        list
    }

    pub fn global(&self) -> Option<&Zone> {
        self.global.as_ref()
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    /// Non-global zones whose ranges contain the query.
    pub fn matching(&self, key: u8, velocity: u8) -> impl Iterator<Item = &Zone> {
        self.zones
            .iter()
            .filter(move |zone| zone.contains(key, velocity))
    }
}

/// An instrument: a named instrument-zone list. Shared by every preset
/// zone that links to it.
#[derive(Debug)]
pub struct Instrument {
    pub name: String,
    pub zones: ZoneList,
}

/// A preset zone with its instrument link resolved.
#[derive(Debug, Clone)]
pub struct PresetZone {
    pub zone: Zone,
    pub instrument: Arc<Instrument>,
}

/// A preset: bank/program address plus resolved zones.
#[derive(Debug)]
pub struct Preset {
    pub name: String,
    pub bank: u16,
    pub program: u16,
    global: Option<Zone>,
    zones: Vec<PresetZone>,
}

/// The zone pair a note-on resolves to; one voice is started per pair.
#[derive(Debug, Clone, Copy)]
pub struct ZonePair<'a> {
    pub preset_global: Option<&'a Zone>,
    pub preset_zone: &'a Zone,
    pub instrument_global: Option<&'a Zone>,
    pub instrument_zone: &'a Zone,
    /// Sample header index from the instrument zone's terminal link.
    pub sample_index: u16,
}

impl Preset {
    pub fn new(
        name: String,
        bank: u16,
        program: u16,
        global: Option<Zone>,
        zones: Vec<PresetZone>,
    ) -> Self {
        Preset {
            name,
            bank,
            program,
            global,
            zones,
        }
    }

    pub fn global(&self) -> Option<&Zone> {
        self.global.as_ref()
    }

    pub fn zones(&self) -> &[PresetZone] {
        &self.zones
    }

    /// All (preset-zone, instrument-zone) pairs matching a note-on,
    /// lazily.
    pub fn find(&self, key: u8, velocity: u8) -> impl Iterator<Item = ZonePair<'_>> {
        self.zones
            .iter()
            .filter(move |pz| pz.zone.contains(key, velocity))
            .flat_map(move |pz| {
                pz.instrument
                    .zones
                    .matching(key, velocity)
                    .filter_map(move |iz| {
                        iz.link().map(|sample_index| ZonePair {
                            preset_global: self.global.as_ref(),
                            preset_zone: &pz.zone,
                            instrument_global: pz.instrument.zones.global(),
                            instrument_zone: iz,
                            sample_index,
                        })
                    })
            })
    }

    pub fn info(&self, index: usize) -> PresetInfo {
        PresetInfo {
            index,
            name: self.name.clone(),
            bank: self.bank,
            program: self.program,
        }
    }
}

/// A preset's address, in the shape hosts list and persist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetInfo {
    pub index: usize,
    pub name: String,
    pub bank: u16,
    pub program: u16,
}
