//! Fixed-layout SF2 records as read from the pdta sub-chunks.
//!
//! Each record type knows its on-disk size and reads itself field by
//! field from a [`Cursor`]. Collections of these records are terminated
//! by a sentinel element (EOP/EOI/EOS or a terminal bag); the loader
//! keeps the sentinel in storage because zone counts are derived from
//! the next-entry-minus-self pattern.

use std::io::{Read, Seek};

use crate::error::Error;
use crate::sf2::generator::{Amount, Generator};
use crate::sf2::riff::Cursor;

/// Trim a fixed-length name field: leading whitespace stripped, first
/// NUL terminates, non-printable bytes replaced with `_`.
pub fn trim_name(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut at_start = true;
    for &b in bytes {
        if b == 0 {
            break;
        }
        if at_start && (b as char).is_whitespace() {
            continue;
        }
        at_start = false;
        if (0x20..0x7F).contains(&b) {
            out.push(b as char);
        } else {
            out.push('_');
        }
    }
    out
}

/// 38-byte preset header (phdr). The trailing library/genre/morphology
/// dwords are read and ignored.
#[derive(Debug, Clone)]
pub struct PresetHeader {
    pub name: String,
    pub program: u16,
    pub bank: u16,
    pub first_zone_index: u16,
}

impl PresetHeader {
    pub const SIZE: u32 = 38;

    pub fn read<R: Read + Seek>(cursor: &mut Cursor, source: &mut R) -> Result<Self, Error> {
        let mut name = [0u8; 20];
        cursor.read_exact(source, &mut name)?;
        let program = cursor.read_u16(source)?;
        let bank = cursor.read_u16(source)?;
        let first_zone_index = cursor.read_u16(source)?;
        let mut trailing = [0u8; 12];
        cursor.read_exact(source, &mut trailing)?;
        Ok(PresetHeader {
            name: trim_name(&name),
            program,
            bank,
            first_zone_index,
        })
    }
}

/// 22-byte instrument header (inst).
#[derive(Debug, Clone)]
pub struct InstrumentHeader {
    pub name: String,
    pub first_zone_index: u16,
}

impl InstrumentHeader {
    pub const SIZE: u32 = 22;

    pub fn read<R: Read + Seek>(cursor: &mut Cursor, source: &mut R) -> Result<Self, Error> {
        let mut name = [0u8; 20];
        cursor.read_exact(source, &mut name)?;
        let first_zone_index = cursor.read_u16(source)?;
        Ok(InstrumentHeader {
            name: trim_name(&name),
            first_zone_index,
        })
    }
}

/// 4-byte bag record (pbag/ibag): the first generator and first
/// modulator of one zone. The count for a zone is
/// `next.first - self.first`.
#[derive(Debug, Clone, Copy)]
pub struct Bag {
    pub first_generator_index: u16,
    pub first_modulator_index: u16,
}

impl Bag {
    pub const SIZE: u32 = 4;

    pub fn read<R: Read + Seek>(cursor: &mut Cursor, source: &mut R) -> Result<Self, Error> {
        Ok(Bag {
            first_generator_index: cursor.read_u16(source)?,
            first_modulator_index: cursor.read_u16(source)?,
        })
    }
}

/// 4-byte generator record (pgen/igen). Unknown generator indices are
/// kept raw so the zone layer can skip them without failing the load.
#[derive(Debug, Clone, Copy)]
pub struct GeneratorRecord {
    pub raw_index: u16,
    pub amount: Amount,
}

impl GeneratorRecord {
    pub const SIZE: u32 = 4;

    pub fn read<R: Read + Seek>(cursor: &mut Cursor, source: &mut R) -> Result<Self, Error> {
        Ok(GeneratorRecord {
            raw_index: cursor.read_u16(source)?,
            amount: Amount(cursor.read_u16(source)?),
        })
    }

    pub fn generator(&self) -> Option<Generator> {
        Generator::from_index(self.raw_index)
    }
}

/// 10-byte modulator record (pmod/imod), kept raw; decoding the source
/// and destination specs happens in [`crate::sf2::modulator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModulatorRecord {
    pub source: u16,
    pub destination: u16,
    pub amount: i16,
    pub amount_source: u16,
    pub transform: u16,
}

impl ModulatorRecord {
    pub const SIZE: u32 = 10;

    pub fn read<R: Read + Seek>(cursor: &mut Cursor, source: &mut R) -> Result<Self, Error> {
        Ok(ModulatorRecord {
            source: cursor.read_u16(source)?,
            destination: cursor.read_u16(source)?,
            amount: cursor.read_i16(source)?,
            amount_source: cursor.read_u16(source)?,
            transform: cursor.read_u16(source)?,
        })
    }
}

/// Sample type flags from the sample header.
pub mod sample_type {
    pub const MONO: u16 = 1;
    pub const RIGHT: u16 = 2;
    pub const LEFT: u16 = 4;
    pub const LINKED: u16 = 8;
    pub const ROM: u16 = 0x8000;
}

/// 46-byte sample header (shdr). Offsets index into the raw smpl blob
/// in sample points, not bytes.
#[derive(Debug, Clone)]
pub struct SampleHeader {
    pub name: String,
    pub start: u32,
    pub end: u32,
    pub loop_start: u32,
    pub loop_end: u32,
    pub sample_rate: u32,
    pub original_key: u8,
    pub pitch_correction: i8,
    pub link: u16,
    pub kind: u16,
}

impl SampleHeader {
    pub const SIZE: u32 = 46;

    pub fn read<R: Read + Seek>(cursor: &mut Cursor, source: &mut R) -> Result<Self, Error> {
        let mut name = [0u8; 20];
        cursor.read_exact(source, &mut name)?;
        let start = cursor.read_u32(source)?;
        let end = cursor.read_u32(source)?;
        let loop_start = cursor.read_u32(source)?;
        let loop_end = cursor.read_u32(source)?;
        let sample_rate = cursor.read_u32(source)?;
        let original_key = cursor.read_u8(source)?;
        let pitch_correction = cursor.read_i8(source)?;
        let link = cursor.read_u16(source)?;
        let kind = cursor.read_u16(source)?;
        Ok(SampleHeader {
            name: trim_name(&name),
            start,
            end,
            loop_start,
            loop_end,
            sample_rate,
            original_key,
            pitch_correction,
            link,
            kind,
        })
    }

    /// Sample length in points.
    pub fn len(&self) -> u32 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_rom(&self) -> bool {
        self.kind & sample_type::ROM != 0
    }
}
