//! SF2 file loading.
//!
//! Walks the RIFF tree (`RIFF sfbk` → `LIST INFO` / `LIST sdta` /
//! `LIST pdta`), reads the nine pdta record arrays, and assembles the
//! navigable model: presets sorted by (bank, program), shared
//! instruments, and one lazy [`SampleSource`] per sample header. Any
//! container-level inconsistency fails the whole load; entity-level
//! sanity (sample offsets and the like) is left to downstream clamping.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::Error;
use crate::sf2::generator::Generator;
use crate::sf2::records::{
    trim_name, Bag, GeneratorRecord, InstrumentHeader, ModulatorRecord, PresetHeader,
    SampleHeader,
};
use crate::sf2::riff::{tags, Cursor, Tag};
use crate::sf2::sample::SampleSource;
use crate::sf2::zone::{Instrument, Preset, PresetInfo, PresetZone, Zone, ZoneList};

/// INFO-list metadata of a loaded file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// `ifil` version as (major, minor).
    pub version: (u16, u16),
    pub sound_engine: Option<String>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub engineer: Option<String>,
    pub product: Option<String>,
    pub copyright: Option<String>,
    pub comment: Option<String>,
    pub software: Option<String>,
}

/// A fully loaded SF2 file.
pub struct SoundFont {
    info: FileInfo,
    presets: Vec<Preset>,
    instruments: Vec<Arc<Instrument>>,
    samples: Vec<Arc<SampleSource>>,
}

impl SoundFont {
    /// Load from a file path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<SoundFont, Error> {
        let mut file = File::open(path.as_ref())?;
        let font = SoundFont::load(&mut file)?;
        info!(
            path = %path.as_ref().display(),
            presets = font.presets.len(),
            instruments = font.instruments.len(),
            samples = font.samples.len(),
            "loaded soundfont"
        );
        Ok(font)
    }

    /// Load from any seekable source.
    pub fn load<R: Read + Seek>(source: &mut R) -> Result<SoundFont, Error> {
        let len = source.seek(SeekFrom::End(0))?;
        let mut cursor = Cursor::new(0, len);

        let root = cursor.chunk_list(source)?;
        Cursor::expect_tag(tags::RIFF, root.tag)?;
        Cursor::expect_tag(tags::SFBK, root.kind)?;

        let mut info = FileInfo::default();
        let mut raw_samples: Arc<Vec<i16>> = Arc::new(Vec::new());
        let mut records = RecordArrays::default();

        let mut lists = root.data;
        while lists.remaining() > 0 {
            let list = lists.chunk_list(source)?;
            Cursor::expect_tag(tags::LIST, list.tag)?;
            if list.kind == tags::INFO {
                info = read_info(source, list.data)?;
            } else if list.kind == tags::SDTA {
                raw_samples = Arc::new(read_sample_data(source, list.data)?);
            } else if list.kind == tags::PDTA {
                records = RecordArrays::read(source, list.data)?;
            } else {
                debug!(kind = %list.kind, "skipping unknown list");
            }
        }

        let font = records.assemble(info, raw_samples)?;
        Ok(font)
    }

    pub fn info(&self) -> &FileInfo {
        &self.info
    }

    pub fn preset_count(&self) -> usize {
        self.presets.len()
    }

    pub fn preset(&self, index: usize) -> Result<&Preset, Error> {
        self.presets.get(index).ok_or(Error::InvalidIndex {
            index,
            count: self.presets.len(),
        })
    }

    /// Preset addresses in (bank, program) order.
    pub fn preset_infos(&self) -> Vec<PresetInfo> {
        self.presets
            .iter()
            .enumerate()
            .map(|(i, p)| p.info(i))
            .collect()
    }

    pub fn sample(&self, index: usize) -> Result<&Arc<SampleSource>, Error> {
        self.samples.get(index).ok_or(Error::InvalidIndex {
            index,
            count: self.samples.len(),
        })
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Decode every sample buffer now. Meant for a control-thread pass
    /// before real-time rendering starts.
    pub fn preload(&self) {
        for sample in &self.samples {
            sample.load();
        }
    }

    /// Decode only the samples one preset's zones can reach.
    pub fn preload_preset(&self, index: usize) -> Result<(), Error> {
        let preset = self.preset(index)?;
        for preset_zone in preset.zones() {
            for zone in preset_zone.instrument.zones.zones() {
                if let Some(sample_index) = zone.link() {
                    if let Some(sample) = self.samples.get(sample_index as usize) {
                        sample.load();
                    }
                }
            }
        }
        Ok(())
    }

    /// Drop all cached sample buffers.
    pub fn unload_samples(&self) {
        for sample in &self.samples {
            sample.unload();
        }
    }
}

impl std::fmt::Debug for SoundFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SoundFont")
            .field("name", &self.info.name)
            .field("presets", &self.presets.len())
            .field("instruments", &self.instruments.len())
            .field("samples", &self.samples.len())
            .finish()
    }
}

fn read_info<R: Read + Seek>(source: &mut R, mut cursor: Cursor) -> Result<FileInfo, Error> {
    let mut out = FileInfo::default();
    while cursor.remaining() > 0 {
        let chunk = cursor.chunk(source)?;
        let mut data = chunk.data;
        if chunk.tag == tags::IFIL {
            if chunk.size != 4 {
                return Err(Error::format(format!(
                    "ifil chunk is {} bytes, expected 4",
                    chunk.size
                )));
            }
            out.version = (data.read_u16(source)?, data.read_u16(source)?);
            continue;
        }
        let slot = match chunk.tag {
            t if t == tags::ISNG => &mut out.sound_engine,
            t if t == tags::INAM => &mut out.name,
            t if t == tags::ICRD => &mut out.date,
            t if t == tags::IENG => &mut out.engineer,
            t if t == tags::IPRD => &mut out.product,
            t if t == tags::ICOP => &mut out.copyright,
            t if t == tags::ICMT => &mut out.comment,
            t if t == tags::ISFT => &mut out.software,
            _ => continue,
        };
        let mut bytes = vec![0u8; chunk.size as usize];
        data.read_exact(source, &mut bytes)?;
        *slot = Some(trim_name(&bytes));
    }
    Ok(out)
}

fn read_sample_data<R: Read + Seek>(
    source: &mut R,
    mut cursor: Cursor,
) -> Result<Vec<i16>, Error> {
    let mut samples = Vec::new();
    while cursor.remaining() > 0 {
        let chunk = cursor.chunk(source)?;
        if chunk.tag == tags::SMPL {
            let mut bytes = vec![0u8; chunk.size as usize & !1];
            let mut data = chunk.data;
            data.read_exact(source, &mut bytes)?;
            samples = bytes
                .chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
                .collect();
        }
        // sm24 extension data is not supported; skipped.
    }
    Ok(samples)
}

/// The nine pdta arrays, sentinels included.
#[derive(Default)]
struct RecordArrays {
    preset_headers: Vec<PresetHeader>,
    preset_bags: Vec<Bag>,
    preset_modulators: Vec<ModulatorRecord>,
    preset_generators: Vec<GeneratorRecord>,
    instrument_headers: Vec<InstrumentHeader>,
    instrument_bags: Vec<Bag>,
    instrument_modulators: Vec<ModulatorRecord>,
    instrument_generators: Vec<GeneratorRecord>,
    sample_headers: Vec<SampleHeader>,
}

impl RecordArrays {
    fn read<R: Read + Seek>(source: &mut R, mut cursor: Cursor) -> Result<Self, Error> {
        let mut arrays = RecordArrays::default();
        while cursor.remaining() > 0 {
            let chunk = cursor.chunk(source)?;
            match chunk.tag {
                t if t == tags::PHDR => {
                    arrays.preset_headers =
                        read_array(source, chunk.data, chunk.size, PresetHeader::SIZE, t, PresetHeader::read)?;
                }
                t if t == tags::PBAG => {
                    arrays.preset_bags =
                        read_array(source, chunk.data, chunk.size, Bag::SIZE, t, Bag::read)?;
                }
                t if t == tags::PMOD => {
                    arrays.preset_modulators = read_array(
                        source,
                        chunk.data,
                        chunk.size,
                        ModulatorRecord::SIZE,
                        t,
                        ModulatorRecord::read,
                    )?;
                }
                t if t == tags::PGEN => {
                    arrays.preset_generators = read_array(
                        source,
                        chunk.data,
                        chunk.size,
                        GeneratorRecord::SIZE,
                        t,
                        GeneratorRecord::read,
                    )?;
                }
                t if t == tags::INST => {
                    arrays.instrument_headers = read_array(
                        source,
                        chunk.data,
                        chunk.size,
                        InstrumentHeader::SIZE,
                        t,
                        InstrumentHeader::read,
                    )?;
                }
                t if t == tags::IBAG => {
                    arrays.instrument_bags =
                        read_array(source, chunk.data, chunk.size, Bag::SIZE, t, Bag::read)?;
                }
                t if t == tags::IMOD => {
                    arrays.instrument_modulators = read_array(
                        source,
                        chunk.data,
                        chunk.size,
                        ModulatorRecord::SIZE,
                        t,
                        ModulatorRecord::read,
                    )?;
                }
                t if t == tags::IGEN => {
                    arrays.instrument_generators = read_array(
                        source,
                        chunk.data,
                        chunk.size,
                        GeneratorRecord::SIZE,
                        t,
                        GeneratorRecord::read,
                    )?;
                }
                t if t == tags::SHDR => {
                    arrays.sample_headers = read_array(
                        source,
                        chunk.data,
                        chunk.size,
                        SampleHeader::SIZE,
                        t,
                        SampleHeader::read,
                    )?;
                }
                t => {
                    debug!(tag = %t, "skipping unknown pdta chunk");
                }
            }
        }
        Ok(arrays)
    }

    fn assemble(self, info: FileInfo, raw_samples: Arc<Vec<i16>>) -> Result<SoundFont, Error> {
        let sample_count = sentinel_count(&self.sample_headers, "shdr")?;
        let samples: Vec<Arc<SampleSource>> = self.sample_headers[..sample_count]
            .iter()
            .map(|header| Arc::new(SampleSource::new(header.clone(), Arc::clone(&raw_samples))))
            .collect();

        let instrument_count = sentinel_count(&self.instrument_headers, "inst")?;
        sentinel_count(&self.instrument_bags, "ibag")?;
        let mut instruments = Vec::with_capacity(instrument_count);
        for i in 0..instrument_count {
            let zones = build_zones(
                self.instrument_headers[i].first_zone_index,
                self.instrument_headers[i + 1].first_zone_index,
                &self.instrument_bags,
                &self.instrument_generators,
                &self.instrument_modulators,
                Generator::SampleId,
            )?;
            for zone in zones.zones() {
                if let Some(link) = zone.link() {
                    if link as usize >= samples.len() {
                        return Err(Error::format(format!(
                            "instrument {:?} links to sample {link} of {}",
                            self.instrument_headers[i].name,
                            samples.len()
                        )));
                    }
                }
            }
            instruments.push(Arc::new(Instrument {
                name: self.instrument_headers[i].name.clone(),
                zones,
            }));
        }

        let preset_count = sentinel_count(&self.preset_headers, "phdr")?;
        sentinel_count(&self.preset_bags, "pbag")?;
        let mut presets = Vec::with_capacity(preset_count);
        for i in 0..preset_count {
            let header = &self.preset_headers[i];
            let zones = build_zones(
                header.first_zone_index,
                self.preset_headers[i + 1].first_zone_index,
                &self.preset_bags,
                &self.preset_generators,
                &self.preset_modulators,
                Generator::Instrument,
            )?;
            let mut preset_zones = Vec::with_capacity(zones.zones().len());
            for zone in zones.zones() {
                let link = zone.link().unwrap_or(0) as usize;
                let instrument = instruments.get(link).ok_or_else(|| {
                    Error::format(format!(
                        "preset {:?} links to instrument {link} of {}",
                        header.name,
                        instruments.len()
                    ))
                })?;
                preset_zones.push(PresetZone {
                    zone: zone.clone(),
                    instrument: Arc::clone(instrument),
                });
            }
            presets.push(Preset::new(
                header.name.clone(),
                header.bank,
                header.program,
                zones.global().cloned(),
                preset_zones,
            ));
        }
        presets.sort_by_key(|p| (p.bank, p.program));

        Ok(SoundFont {
            info,
            presets,
            instruments,
            samples,
        })
    }
}

fn read_array<R, T>(
    source: &mut R,
    mut cursor: Cursor,
    chunk_size: u32,
    record_size: u32,
    tag: Tag,
    read: impl Fn(&mut Cursor, &mut R) -> Result<T, Error>,
) -> Result<Vec<T>, Error>
where
    R: Read + Seek,
{
    if chunk_size % record_size != 0 {
        return Err(Error::format(format!(
            "{tag} chunk size {chunk_size} is not a multiple of {record_size}"
        )));
    }
    let count = (chunk_size / record_size) as usize;
    let mut out = Vec::with_capacity(count);
    for _ in 0..count {
        out.push(read(&mut cursor, source)?);
    }
    Ok(out)
}

/// Usable records in a sentinel-terminated array.
fn sentinel_count<T>(records: &[T], what: &str) -> Result<usize, Error> {
    records
        .len()
        .checked_sub(1)
        .ok_or_else(|| Error::format(format!("{what} array is missing its sentinel")))
}

fn build_zones(
    first_bag: u16,
    next_bag: u16,
    bags: &[Bag],
    generators: &[GeneratorRecord],
    modulators: &[ModulatorRecord],
    terminal: Generator,
) -> Result<ZoneList, Error> {
    let bag_range = record_range(first_bag, next_bag, bags.len().saturating_sub(1), "bag")?;
    let mut zones = Vec::with_capacity(bag_range.len());
    for b in bag_range {
        let gens = record_range(
            bags[b].first_generator_index,
            bags[b + 1].first_generator_index,
            generators.len(),
            "generator",
        )?;
        let mods = record_range(
            bags[b].first_modulator_index,
            bags[b + 1].first_modulator_index,
            modulators.len(),
            "modulator",
        )?;
        zones.push(Zone::new(
            generators[gens].to_vec(),
            modulators[mods].to_vec(),
            terminal,
        ));
    }
    Ok(ZoneList::new(zones))
}

fn record_range(
    first: u16,
    next: u16,
    len: usize,
    what: &str,
) -> Result<std::ops::Range<usize>, Error> {
    let (first, next) = (first as usize, next as usize);
    if first > next || next > len {
        return Err(Error::format(format!(
            "{what} indices {first}..{next} exceed array of {len}"
        )));
    }
    Ok(first..next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sf2::test_font::TestFontBuilder;
    use std::io::Cursor as IoCursor;

    #[test]
    fn loads_minimal_font() {
        let bytes = TestFontBuilder::new().build();
        let mut source = IoCursor::new(bytes);
        let font = SoundFont::load(&mut source).unwrap();

        assert_eq!(font.preset_count(), 1);
        assert_eq!(font.sample_count(), 1);
        assert_eq!(font.info().version, (2, 1));
        assert_eq!(font.info().name.as_deref(), Some("Test Font"));

        let preset = font.preset(0).unwrap();
        assert_eq!(preset.name, "Test Preset");
        let pairs: Vec<_> = preset.find(60, 100).collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].sample_index, 0);
    }

    #[test]
    fn presets_sort_by_bank_then_program() {
        let bytes = TestFontBuilder::new()
            .with_extra_preset("Second", 0, 0)
            .build();
        let mut source = IoCursor::new(bytes);
        let font = SoundFont::load(&mut source).unwrap();
        assert_eq!(font.preset_count(), 2);
        // Builder's base preset is bank 0 program 5; the extra sorts first.
        assert_eq!(font.preset(0).unwrap().name, "Second");
        assert_eq!(font.preset(1).unwrap().name, "Test Preset");

        let infos = font.preset_infos();
        assert_eq!(infos[0].index, 0);
        assert_eq!(infos[1].bank, 0);
        assert_eq!(infos[1].program, 5);
    }

    #[test]
    fn oversized_riff_header_is_rejected() {
        let mut bytes = TestFontBuilder::new().build();
        let oversize = (bytes.len() as u32 + 100).to_le_bytes();
        bytes[4..8].copy_from_slice(&oversize);
        let mut source = IoCursor::new(bytes);
        assert!(matches!(
            SoundFont::load(&mut source),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn wrong_form_kind_is_rejected() {
        let mut bytes = TestFontBuilder::new().build();
        bytes[8..12].copy_from_slice(b"wave");
        let mut source = IoCursor::new(bytes);
        assert!(matches!(
            SoundFont::load(&mut source),
            Err(Error::Format(_))
        ));
    }

    #[test]
    fn out_of_range_preset_index() {
        let bytes = TestFontBuilder::new().build();
        let mut source = IoCursor::new(bytes);
        let font = SoundFont::load(&mut source).unwrap();
        assert!(matches!(
            font.preset(5),
            Err(Error::InvalidIndex { index: 5, count: 1 })
        ));
    }

    #[test]
    fn preload_decodes_all_samples() {
        let bytes = TestFontBuilder::new().build();
        let mut source = IoCursor::new(bytes);
        let font = SoundFont::load(&mut source).unwrap();
        assert!(!font.sample(0).unwrap().is_loaded());
        font.preload();
        assert!(font.sample(0).unwrap().is_loaded());
        font.unload_samples();
        assert!(!font.sample(0).unwrap().is_loaded());
    }

    #[test]
    fn preload_preset_decodes_reachable_samples() {
        let bytes = TestFontBuilder::new().build();
        let mut source = IoCursor::new(bytes);
        let font = SoundFont::load(&mut source).unwrap();
        font.preload_preset(0).unwrap();
        assert!(font.sample(0).unwrap().is_loaded());
        assert!(matches!(
            font.preload_preset(3),
            Err(Error::InvalidIndex { index: 3, count: 1 })
        ));
    }
}
