//! Siglent SDS captures
//!
//! `:WAVeform:PREamble?` answers with a fixed 358 byte block: an 11 byte
//! `#9...` block header, the 346 byte `WAVEDESC` structure and a line feed.
//! `:WAVeform:DATA?` answers with an 11 byte block header, 8 or 16 bit
//! little-endian sample codes and a two byte `\n\n` trailer. Codes are
//! offset binary around the midpoint of their domain.

use tracing::{debug, trace};

use crate::chunk::Framing;
use crate::error::{Error, Result};
use crate::lookup::{self, ByteOrder, CommType, ProbeAttenuation, HORIZONTAL_DIVISIONS};
use crate::{decode_words, Calibrate, RawSamples, SampleFormat};

/// Size of a complete preamble, including the block header and terminator
pub const PREAMBLE_LEN: usize = 358;

/// Framing of a single `:WAVeform:DATA?` answer
pub const DATA_FRAMING: Framing = Framing::new(11, 2);

/// Location of one preamble field
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Field {
    pub name: &'static str,
    pub offset: usize,
    pub width: usize,
}

impl Field {
    const fn new(name: &'static str, offset: usize, width: usize) -> Self {
        Field {
            name,
            offset,
            width,
        }
    }

    const fn reserved(offset: usize, width: usize) -> Self {
        Field::new("reserved", offset, width)
    }
}

const HEADER: Field = Field::new("header", 0, 11);
const DESCRIPTOR_NAME: Field = Field::new("descriptor_name", 11, 16);
const TEMPLATE_NAME: Field = Field::new("template_name", 27, 16);
const COMM_TYPE: Field = Field::new("comm_type", 43, 2);
const COMM_ORDER: Field = Field::new("comm_order", 45, 2);
const WAVE_DESC_LENGTH: Field = Field::new("wave_desc_length", 47, 4);
const WAVE_ARRAY: Field = Field::new("wave_array", 71, 4);
const INSTRUMENT_NAME: Field = Field::new("instrument_name", 87, 16);
const WAVE_ARRAY_COUNT: Field = Field::new("wave_array_count", 127, 4);
const FIRST_POINT: Field = Field::new("first_point", 143, 4);
const DATA_INTERVAL: Field = Field::new("data_interval", 147, 4);
const READ_FRAMES: Field = Field::new("read_frames", 155, 4);
const SUM_FRAMES: Field = Field::new("sum_frames", 159, 4);
const VERT_GAIN: Field = Field::new("vert_gain", 167, 4);
const VERT_OFFSET: Field = Field::new("vert_offset", 171, 4);
const CODE_PER_DIV: Field = Field::new("code_per_div", 175, 4);
const ADC_BIT: Field = Field::new("adc_bit", 183, 2);
const FRAME_INDEX: Field = Field::new("frame_index", 185, 2);
const HORZ_INTERVAL: Field = Field::new("horz_interval", 187, 4);
const HORZ_OFFSET: Field = Field::new("horz_offset", 191, 8);
const TIME_BASE: Field = Field::new("time_base", 335, 2);
const VERT_COUPLING: Field = Field::new("vert_coupling", 337, 2);
const PROBE_ATTENUATION: Field = Field::new("probe_attenuation", 339, 4);
const FIXED_VERT_GAIN: Field = Field::new("fixed_vert_gain", 343, 2);
const BANDWIDTH_LIMIT: Field = Field::new("bandwidth_limit", 345, 2);
const WAVE_SOURCE: Field = Field::new("wave_source", 355, 2);
const TERMINATOR: Field = Field::new("terminator", 357, 1);

/// Every interpreted field, in block order
pub const NAMED: [Field; 27] = [
    HEADER,
    DESCRIPTOR_NAME,
    TEMPLATE_NAME,
    COMM_TYPE,
    COMM_ORDER,
    WAVE_DESC_LENGTH,
    WAVE_ARRAY,
    INSTRUMENT_NAME,
    WAVE_ARRAY_COUNT,
    FIRST_POINT,
    DATA_INTERVAL,
    READ_FRAMES,
    SUM_FRAMES,
    VERT_GAIN,
    VERT_OFFSET,
    CODE_PER_DIV,
    ADC_BIT,
    FRAME_INDEX,
    HORZ_INTERVAL,
    HORZ_OFFSET,
    TIME_BASE,
    VERT_COUPLING,
    PROBE_ATTENUATION,
    FIXED_VERT_GAIN,
    BANDWIDTH_LIMIT,
    WAVE_SOURCE,
    TERMINATOR,
];

/// Undocumented byte ranges between the [NAMED] fields
pub const RESERVED: [Field; 30] = [
    Field::reserved(51, 4),
    Field::reserved(55, 4),
    Field::reserved(59, 4),
    Field::reserved(63, 4),
    Field::reserved(67, 4),
    Field::reserved(75, 4),
    Field::reserved(79, 4),
    Field::reserved(83, 4),
    Field::reserved(103, 4),
    Field::reserved(107, 16),
    Field::reserved(123, 4),
    Field::reserved(131, 4),
    Field::reserved(135, 4),
    Field::reserved(139, 4),
    Field::reserved(151, 4),
    Field::reserved(163, 2),
    Field::reserved(165, 2),
    Field::reserved(179, 4),
    Field::reserved(199, 8),
    Field::reserved(207, 48),
    Field::reserved(255, 48),
    Field::reserved(303, 4),
    Field::reserved(307, 16),
    Field::reserved(323, 4),
    Field::reserved(327, 2),
    Field::reserved(329, 2),
    Field::reserved(331, 2),
    Field::reserved(333, 2),
    Field::reserved(347, 4),
    Field::reserved(351, 4),
];

/// Bounds-checked little-endian field access
struct Fields<'a>(&'a [u8]);

impl<'a> Fields<'a> {
    fn bytes(&self, field: Field) -> Result<&'a [u8]> {
        self.0
            .get(field.offset..field.offset + field.width)
            .ok_or(Error::FieldOutOfBounds {
                name: field.name,
                offset: field.offset,
                width: field.width,
                len: self.0.len(),
            })
    }

    fn array<const N: usize>(&self, field: Field) -> Result<[u8; N]> {
        self.bytes(field)?
            .try_into()
            .map_err(|_| Error::FieldOutOfBounds {
                name: field.name,
                offset: field.offset,
                width: N,
                len: self.0.len(),
            })
    }

    fn ascii(&self, field: Field) -> Result<String> {
        let text = String::from_utf8_lossy(self.bytes(field)?);
        Ok(text.trim_end_matches('\0').trim().to_owned())
    }

    fn u16(&self, field: Field) -> Result<u16> {
        self.array(field).map(u16::from_le_bytes)
    }

    fn u32(&self, field: Field) -> Result<u32> {
        self.array(field).map(u32::from_le_bytes)
    }

    fn f32(&self, field: Field) -> Result<f32> {
        self.array(field).map(f32::from_le_bytes)
    }

    fn f64(&self, field: Field) -> Result<f64> {
        self.array(field).map(f64::from_le_bytes)
    }
}

/// Raw bytes of an uninterpreted preamble range
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reserved {
    pub offset: usize,
    pub bytes: Vec<u8>,
}

/// Decoded `WAVEDESC` preamble
#[derive(Clone, Debug, PartialEq)]
pub struct Preamble {
    pub descriptor_name: String,
    pub template_name: String,
    pub comm_type: CommType,
    pub comm_order: u16,
    pub wave_desc_length: u32,
    pub wave_array_length: u32,
    pub instrument_name: String,
    /// Number of points in the acquisition
    pub wave_array_count: u32,
    pub first_point: u32,
    pub data_interval: u32,
    pub read_frames: u32,
    pub sum_frames: u32,
    /// Volts per division
    pub vertical_gain: f32,
    pub vertical_offset: f32,
    pub codes_per_division: f32,
    pub adc_bits: u16,
    pub frame_index: u16,
    /// Seconds between samples
    pub horizontal_interval: f32,
    pub horizontal_offset: f64,
    /// Index into [lookup::TIME_BASE]
    pub time_base: u16,
    pub vertical_coupling: u16,
    pub probe_attenuation: f32,
    pub fixed_vertical_gain: u16,
    pub bandwidth_limit: u16,
    pub wave_source: u16,
    /// Only kept for diagnostics
    pub reserved: Vec<Reserved>,
}

impl Preamble {
    /// Decode a preamble block
    ///
    /// Bytes beyond [PREAMBLE_LEN] are ignored.
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < PREAMBLE_LEN {
            return Err(Error::PreambleLength {
                expected: PREAMBLE_LEN,
                actual: data.len(),
            });
        }
        let fields = Fields(data);
        let reserved = RESERVED
            .iter()
            .map(|&f| -> Result<Reserved> {
                Ok(Reserved {
                    offset: f.offset,
                    bytes: fields.bytes(f)?.to_vec(),
                })
            })
            .collect::<Result<_>>()?;
        let preamble = Preamble {
            descriptor_name: fields.ascii(DESCRIPTOR_NAME)?,
            template_name: fields.ascii(TEMPLATE_NAME)?,
            comm_type: lookup::comm_type(fields.u16(COMM_TYPE)?)?,
            comm_order: fields.u16(COMM_ORDER)?,
            wave_desc_length: fields.u32(WAVE_DESC_LENGTH)?,
            wave_array_length: fields.u32(WAVE_ARRAY)?,
            instrument_name: fields.ascii(INSTRUMENT_NAME)?,
            wave_array_count: fields.u32(WAVE_ARRAY_COUNT)?,
            first_point: fields.u32(FIRST_POINT)?,
            data_interval: fields.u32(DATA_INTERVAL)?,
            read_frames: fields.u32(READ_FRAMES)?,
            sum_frames: fields.u32(SUM_FRAMES)?,
            vertical_gain: fields.f32(VERT_GAIN)?,
            vertical_offset: fields.f32(VERT_OFFSET)?,
            codes_per_division: fields.f32(CODE_PER_DIV)?,
            adc_bits: fields.u16(ADC_BIT)?,
            frame_index: fields.u16(FRAME_INDEX)?,
            horizontal_interval: fields.f32(HORZ_INTERVAL)?,
            horizontal_offset: fields.f64(HORZ_OFFSET)?,
            time_base: fields.u16(TIME_BASE)?,
            vertical_coupling: fields.u16(VERT_COUPLING)?,
            probe_attenuation: fields.f32(PROBE_ATTENUATION)?,
            fixed_vertical_gain: fields.u16(FIXED_VERT_GAIN)?,
            bandwidth_limit: fields.u16(BANDWIDTH_LIMIT)?,
            wave_source: fields.u16(WAVE_SOURCE)?,
            reserved,
        };
        lookup::time_base(preamble.time_base)?;
        preamble.report();
        Ok(preamble)
    }

    pub fn time_per_division(&self) -> Result<f64> {
        lookup::time_base(self.time_base)
    }

    pub fn source(&self) -> Result<&'static str> {
        lookup::wave_source(self.wave_source)
    }

    pub fn coupling(&self) -> Result<&'static str> {
        lookup::vertical_coupling(self.vertical_coupling)
    }

    pub fn bandwidth(&self) -> Result<&'static str> {
        lookup::bandwidth_limit(self.bandwidth_limit)
    }

    /// Decode the codes of a single (or reassembled) data transfer
    pub fn decode_samples(&self, transfer: &[u8]) -> Result<RawSamples> {
        decode_payload(self.comm_type, DATA_FRAMING.strip(transfer)?)
    }

    fn report(&self) {
        debug!("{:>20} : {:?}", "instrument_name", self.instrument_name);
        debug!("{:>20} : {:?}", "comm_type", self.comm_type);
        trace!("{:>20} : {:?}", "comm_order", lookup::comm_order(self.comm_order));
        debug!("{:>20} : {}", "wave_array_count", self.wave_array_count);
        debug!("{:>20} : {}", "vert_gain", self.vertical_gain);
        debug!("{:>20} : {}", "vert_offset", self.vertical_offset);
        debug!("{:>20} : {}", "code_per_div", self.codes_per_division);
        debug!("{:>20} : {}", "probe_attenuation", self.probe_attenuation);
        debug!("{:>20} : {}", "horz_interval", self.horizontal_interval);
        debug!("{:>20} : {}", "horz_offset", self.horizontal_offset);
        debug!("{:>20} : {}", "time_base", self.time_base);
        trace!("{:>20} : {:?}", "source", self.source());
        trace!("{:>20} : {:?}", "coupling", self.coupling());
        trace!("{:>20} : {:?}", "bandwidth", self.bandwidth());
        trace!(
            "{:>20} : {:?}",
            "probe_index",
            ProbeAttenuation::index_of(self.probe_attenuation.into())
        );
        for r in &self.reserved {
            trace!("{:>20} : {:02x?}", format!("reserved@{}", r.offset), r.bytes);
        }
    }
}

/// Undo the offset binary encoding of a `bits` wide code
///
/// Codes above the midpoint `2^bits / 2 - 1` represent negative values.
pub fn recenter(code: i32, bits: u32) -> i32 {
    let span = 1i64 << bits;
    let code = i64::from(code);
    let value = if code > span / 2 - 1 { code - span } else { code };
    value as i32
}

/// Decode an unframed payload of `width` codes
pub fn decode_payload(width: CommType, payload: &[u8]) -> Result<RawSamples> {
    let codes = match width {
        CommType::Byte => decode_words::<u8>(payload, ByteOrder::Lsb)?,
        CommType::Word => decode_words::<u16>(payload, ByteOrder::Lsb)?,
    };
    let bits = width.bits();
    let format = SampleFormat {
        bits,
        signed: false,
    };
    Ok(RawSamples::new(
        codes.into_iter().map(|c| recenter(c, bits)).collect(),
        format,
    ))
}

/// Linear calibration derived from a [Preamble]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub codes_per_division: f64,
    /// Vertical gain scaled by the probe attenuation
    pub volts_per_division: f64,
    /// Vertical offset scaled by the probe attenuation
    pub volt_offset: f64,
    /// Time of the first sample
    pub start: f64,
    pub interval: f64,
}

impl Calibration {
    pub fn from_preamble(preamble: &Preamble) -> Result<Self> {
        let codes_per_division = f64::from(preamble.codes_per_division);
        if !codes_per_division.is_finite() || codes_per_division <= 0.0 {
            return Err(Error::InvalidField {
                key: CODE_PER_DIV.name,
                value: codes_per_division.to_string(),
            });
        }
        let attenuation = f64::from(preamble.probe_attenuation);
        let full_scale = preamble.time_per_division()? * HORIZONTAL_DIVISIONS;
        Ok(Calibration {
            codes_per_division,
            volts_per_division: f64::from(preamble.vertical_gain) * attenuation,
            volt_offset: f64::from(preamble.vertical_offset) * attenuation,
            start: -preamble.horizontal_offset - full_scale / 2.0,
            interval: preamble.horizontal_interval.into(),
        })
    }
}

impl Calibrate for Calibration {
    fn time(&self, index: usize) -> f64 {
        self.start + index as f64 * self.interval
    }

    fn voltage(&self, code: i32) -> f64 {
        f64::from(code) / self.codes_per_division * self.volts_per_division - self.volt_offset
    }
}
