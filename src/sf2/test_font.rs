//! A byte-level SF2 image builder for tests.
//!
//! Builds a minimal but structurally complete file: one ramp sample,
//! one instrument, one preset, with hooks to add generators and extra
//! presets. The default instrument zone collapses the volume envelope's
//! delay/attack/hold to zero duration so renders produce signal from
//! the very first sample.

/// Default ramp sample: `1000 + 100·i`, so the value read back tells
/// the test exactly where the read head is.
pub const RAMP_BASE: i16 = 1000;
pub const RAMP_STEP: i16 = 100;
pub const RAMP_LEN: usize = 300;

struct PresetDef {
    name: String,
    bank: u16,
    program: u16,
    generators: Vec<(u16, u16)>,
}

pub struct TestFontBuilder {
    sample_data: Vec<i16>,
    sample_rate: u32,
    root_key: u8,
    pitch_correction: i8,
    loop_start: u32,
    loop_end: u32,
    instrument_generators: Vec<(u16, u16)>,
    presets: Vec<PresetDef>,
}

impl Default for TestFontBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFontBuilder {
    pub fn new() -> Self {
        let sample_data: Vec<i16> = (0..RAMP_LEN)
            .map(|i| RAMP_BASE + RAMP_STEP * i as i16)
            .collect();
        TestFontBuilder {
            sample_data,
            sample_rate: 44100,
            root_key: 60,
            pitch_correction: 0,
            loop_start: 8,
            loop_end: 250,
            // delay/attack/hold collapsed to zero duration
            instrument_generators: vec![(33, neg(-32768)), (34, neg(-32768)), (35, neg(-32768))],
            presets: vec![PresetDef {
                name: "Test Preset".into(),
                bank: 0,
                program: 5,
                generators: Vec::new(),
            }],
        }
    }

    pub fn with_sample_data(mut self, data: Vec<i16>, sample_rate: u32, root_key: u8) -> Self {
        self.sample_data = data;
        self.sample_rate = sample_rate;
        self.root_key = root_key;
        self
    }

    pub fn with_loop(mut self, start: u32, end: u32) -> Self {
        self.loop_start = start;
        self.loop_end = end;
        self
    }

    pub fn with_pitch_correction(mut self, cents: i8) -> Self {
        self.pitch_correction = cents;
        self
    }

    /// Append a generator to the instrument zone (before the terminal).
    pub fn with_instrument_generator(mut self, index: u16, amount: i16) -> Self {
        self.instrument_generators.push((index, amount as u16));
        self
    }

    /// Append a generator to the first preset's zone.
    pub fn with_preset_generator(mut self, index: u16, amount: i16) -> Self {
        self.presets[0].generators.push((index, amount as u16));
        self
    }

    /// Add another preset linking to the same instrument.
    pub fn with_extra_preset(mut self, name: &str, bank: u16, program: u16) -> Self {
        self.presets.push(PresetDef {
            name: name.into(),
            bank,
            program,
            generators: Vec::new(),
        });
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let info = list(
            b"INFO",
            &[
                chunk(b"ifil", &[2, 0, 1, 0]),
                chunk(b"isng", b"EMU8000\0"),
                chunk(b"INAM", b"Test Font\0"),
            ],
        );

        let mut smpl = Vec::new();
        for &s in &self.sample_data {
            smpl.extend_from_slice(&s.to_le_bytes());
        }
        // 46-point zero pad after the sample, per format.
        smpl.extend_from_slice(&[0u8; 92]);
        let sdta = list(b"sdta", &[chunk(b"smpl", &smpl)]);

        let pdta = list(
            b"pdta",
            &[
                chunk(b"phdr", &self.phdr()),
                chunk(b"pbag", &self.pbag()),
                chunk(b"pmod", &[0u8; 10]),
                chunk(b"pgen", &self.pgen()),
                chunk(b"inst", &self.inst()),
                chunk(b"ibag", &self.ibag()),
                chunk(b"imod", &[0u8; 10]),
                chunk(b"igen", &self.igen()),
                chunk(b"shdr", &self.shdr()),
            ],
        );

        let mut body = Vec::new();
        body.extend_from_slice(b"sfbk");
        body.extend_from_slice(&info);
        body.extend_from_slice(&sdta);
        body.extend_from_slice(&pdta);

        let mut out = Vec::new();
        out.extend_from_slice(b"RIFF");
        out.extend_from_slice(&(body.len() as u32).to_le_bytes());
        out.extend_from_slice(&body);
        out
    }

    fn phdr(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (i, preset) in self.presets.iter().enumerate() {
            out.extend_from_slice(&name20(&preset.name));
            out.extend_from_slice(&preset.program.to_le_bytes());
            out.extend_from_slice(&preset.bank.to_le_bytes());
            out.extend_from_slice(&(i as u16).to_le_bytes());
            out.extend_from_slice(&[0u8; 12]);
        }
        // Sentinel.
        out.extend_from_slice(&name20("EOP"));
        out.extend_from_slice(&[0u8; 4]);
        out.extend_from_slice(&(self.presets.len() as u16).to_le_bytes());
        out.extend_from_slice(&[0u8; 12]);
        out
    }

    fn pbag(&self) -> Vec<u8> {
        let mut out = Vec::new();
        let mut gen_index = 0u16;
        for preset in &self.presets {
            out.extend_from_slice(&gen_index.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
            gen_index += preset.generators.len() as u16 + 1;
        }
        out.extend_from_slice(&gen_index.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    fn pgen(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for preset in &self.presets {
            for &(index, amount) in &preset.generators {
                out.extend_from_slice(&index.to_le_bytes());
                out.extend_from_slice(&amount.to_le_bytes());
            }
            // Terminal: instrument 0.
            out.extend_from_slice(&41u16.to_le_bytes());
            out.extend_from_slice(&0u16.to_le_bytes());
        }
        out
    }

    fn inst(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&name20("Test Inst"));
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&name20("EOI"));
        out.extend_from_slice(&1u16.to_le_bytes());
        out
    }

    fn ibag(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        let gen_count = self.instrument_generators.len() as u16 + 1;
        out.extend_from_slice(&gen_count.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    fn igen(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for &(index, amount) in &self.instrument_generators {
            out.extend_from_slice(&index.to_le_bytes());
            out.extend_from_slice(&amount.to_le_bytes());
        }
        // Terminal: sampleID 0.
        out.extend_from_slice(&53u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    fn shdr(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&name20("Ramp"));
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(self.sample_data.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.loop_start.to_le_bytes());
        out.extend_from_slice(&self.loop_end.to_le_bytes());
        out.extend_from_slice(&self.sample_rate.to_le_bytes());
        out.push(self.root_key);
        out.push(self.pitch_correction as u8);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&1u16.to_le_bytes()); // mono
        out.extend_from_slice(&name20("EOS"));
        out.extend_from_slice(&[0u8; 26]);
        out
    }
}

fn neg(amount: i16) -> u16 {
    amount as u16
}

fn name20(name: &str) -> [u8; 20] {
    let mut out = [0u8; 20];
    let bytes = name.as_bytes();
    out[..bytes.len().min(20)].copy_from_slice(&bytes[..bytes.len().min(20)]);
    out
}

fn chunk(tag: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(payload);
    if payload.len() % 2 == 1 {
        out.push(0);
    }
    out
}

fn list(kind: &[u8; 4], chunks: &[Vec<u8>]) -> Vec<u8> {
    let mut payload = Vec::new();
    payload.extend_from_slice(kind);
    for c in chunks {
        payload.extend_from_slice(c);
    }
    let mut out = Vec::new();
    out.extend_from_slice(b"LIST");
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&payload);
    out
}
