//! Tektronix TDS captures
//!
//! The preamble is the answer to `WFMPRe?`: sixteen `;` separated values in a
//! fixed order, each optionally preceded by its (possibly long form) key. The
//! curve is the answer to `CURVe?`, either an IEEE 488.2 definite length block
//! or a comma separated list of integers.

use tracing::debug;

use crate::error::{Error, Result};
use crate::lookup::ByteOrder;
use crate::{decode_words, Calibrate, RawSamples, SampleFormat};

/// Preamble keys, in the order the instrument reports them
pub const KEYS: [&str; 16] = [
    "BYT_Nr", "BIT_Nr", "ENCdg", "BN_Fmt", "BYT_Or", "NR_Pt", "WFID", "PT_FMT", "XINcr", "PT_Off",
    "XZERo", "XUNit", "YMUlt", "YZEro", "YOFf", "YUNit",
];

/// Echo in front of an ASCII curve
const CURVE_PREFIX: &str = ":CURVE";

/// Decoded `WFMPRe?` record
///
/// Values are kept as text; numbers are parsed when a [Calibration] or the
/// curve encoding is derived from them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Preamble {
    pub byte_nr: String,
    pub bit_nr: String,
    pub encoding: String,
    pub binary_format: String,
    pub byte_order: String,
    pub points: String,
    pub waveform_id: String,
    pub point_format: String,
    pub x_increment: String,
    pub point_offset: String,
    pub x_zero: String,
    pub x_unit: String,
    pub y_multiplier: String,
    pub y_zero: String,
    pub y_offset: String,
    pub y_unit: String,
}

/// Drop a leading key (everything up to the last space) and surrounding quotes
fn strip_value(field: &str) -> &str {
    let field = field.trim();
    let value = field.rsplit_once(' ').map_or(field, |(_, v)| v);
    value.trim_matches('"')
}

fn required(key: &'static str, value: &str) -> Result<String> {
    if value.is_empty() {
        Err(Error::EmptyField(key))
    } else {
        Ok(value.to_owned())
    }
}

fn number(key: &'static str, value: &str) -> Result<f64> {
    value.parse().map_err(|_| Error::InvalidField {
        key,
        value: value.to_owned(),
    })
}

/// How the curve codes are transferred
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Binary {
        format: SampleFormat,
        order: ByteOrder,
    },
    Ascii(SampleFormat),
}

/// How many codes make up one point
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointFormat {
    /// One code per point
    Y,
    /// Alternating primary and secondary codes (envelope)
    Pairs,
}

impl PointFormat {
    pub fn codes_per_point(self) -> usize {
        match self {
            PointFormat::Y => 1,
            PointFormat::Pairs => 2,
        }
    }
}

impl Preamble {
    pub fn decode(record: &str) -> Result<Self> {
        let values: Vec<&str> = record.trim().split(';').map(strip_value).collect();
        let [
            byte_nr,
            bit_nr,
            encoding,
            binary_format,
            byte_order,
            points,
            waveform_id,
            point_format,
            x_increment,
            point_offset,
            x_zero,
            x_unit,
            y_multiplier,
            y_zero,
            y_offset,
            y_unit,
        ]: [&str; 16] = values.as_slice().try_into().map_err(|_| Error::FieldCount {
            expected: KEYS.len(),
            actual: values.len(),
        })?;
        let preamble = Preamble {
            byte_nr: required("BYT_Nr", byte_nr)?,
            bit_nr: bit_nr.to_owned(),
            encoding: required("ENCdg", encoding)?,
            binary_format: required("BN_Fmt", binary_format)?,
            byte_order: required("BYT_Or", byte_order)?,
            points: points.to_owned(),
            waveform_id: waveform_id.to_owned(),
            point_format: required("PT_FMT", point_format)?,
            x_increment: required("XINcr", x_increment)?,
            point_offset: required("PT_Off", point_offset)?,
            x_zero: required("XZERo", x_zero)?,
            x_unit: x_unit.to_owned(),
            y_multiplier: required("YMUlt", y_multiplier)?,
            y_zero: required("YZEro", y_zero)?,
            y_offset: required("YOFf", y_offset)?,
            y_unit: y_unit.to_owned(),
        };
        preamble.report();
        Ok(preamble)
    }

    /// Decode a preamble file's contents
    pub fn decode_bytes(data: &[u8]) -> Result<Self> {
        Self::decode(&String::from_utf8_lossy(data))
    }

    pub fn sample_format(&self) -> Result<SampleFormat> {
        let bits = match self.byte_nr.as_str() {
            "1" => 8,
            "2" => 16,
            _ => return Err(self.invalid("BYT_Nr", &self.byte_nr)),
        };
        let signed = match self.binary_format.as_str() {
            "RP" => false,
            "RI" => true,
            _ => return Err(self.invalid("BN_Fmt", &self.binary_format)),
        };
        Ok(SampleFormat { bits, signed })
    }

    pub fn encoding(&self) -> Result<Encoding> {
        let format = self.sample_format()?;
        if self.encoding != "BIN" {
            return Ok(Encoding::Ascii(format));
        }
        let order = match self.byte_order.as_str() {
            "LSB" => ByteOrder::Lsb,
            "MSB" => ByteOrder::Msb,
            _ => return Err(self.invalid("BYT_Or", &self.byte_order)),
        };
        Ok(Encoding::Binary { format, order })
    }

    pub fn point_format(&self) -> PointFormat {
        if self.point_format == "Y" {
            PointFormat::Y
        } else {
            PointFormat::Pairs
        }
    }

    /// Decode a curve into one channel, or two in envelope mode
    pub fn decode_curve(&self, data: &[u8]) -> Result<Vec<RawSamples>> {
        let (codes, format) = match self.encoding()? {
            Encoding::Binary { format, order } => {
                let payload = block_payload(data)?;
                let codes = match (format.bytes(), format.signed) {
                    (1, false) => decode_words::<u8>(payload, order)?,
                    (1, true) => decode_words::<i8>(payload, order)?,
                    (_, false) => decode_words::<u16>(payload, order)?,
                    (_, true) => decode_words::<i16>(payload, order)?,
                };
                (codes, format)
            }
            Encoding::Ascii(format) => (ascii_codes(data)?, format),
        };
        debug!("Found {} codes", codes.len());
        split_points(codes, format, self.point_format())
    }

    fn invalid(&self, key: &'static str, value: &str) -> Error {
        Error::InvalidField {
            key,
            value: value.to_owned(),
        }
    }

    fn report(&self) {
        for (key, value) in KEYS.iter().zip([
            &self.byte_nr,
            &self.bit_nr,
            &self.encoding,
            &self.binary_format,
            &self.byte_order,
            &self.points,
            &self.waveform_id,
            &self.point_format,
            &self.x_increment,
            &self.point_offset,
            &self.x_zero,
            &self.x_unit,
            &self.y_multiplier,
            &self.y_zero,
            &self.y_offset,
            &self.y_unit,
        ]) {
            debug!("{:>9} : {}", key, value);
        }
    }
}

/// The payload of an IEEE 488.2 definite length block (`#<n><n digits><data>`)
///
/// Anything after the declared length, such as a line terminator, is ignored.
pub fn block_payload(data: &[u8]) -> Result<&[u8]> {
    let (&marker, rest) = data.split_first().ok_or(Error::BlockHeader)?;
    let (&digits, rest) = rest.split_first().ok_or(Error::BlockHeader)?;
    if marker != b'#' || !(b'1'..=b'9').contains(&digits) {
        return Err(Error::BlockHeader);
    }
    let digits = usize::from(digits - b'0');
    if rest.len() < digits {
        return Err(Error::BlockHeader);
    }
    let (length, payload) = rest.split_at(digits);
    let declared: usize = std::str::from_utf8(length)
        .ok()
        .filter(|s| s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .ok_or(Error::BlockHeader)?;
    payload.get(..declared).ok_or(Error::TruncatedBlock {
        declared,
        available: payload.len(),
    })
}

/// Parse an ASCII curve such as `:CURVE 1,-2,3`
pub fn ascii_codes(data: &[u8]) -> Result<Vec<i32>> {
    let text = String::from_utf8_lossy(data);
    let text = text.trim_end();
    let list = text
        .rfind(CURVE_PREFIX)
        .map_or(text, |at| &text[at + CURVE_PREFIX.len()..])
        .trim();
    if list.is_empty() {
        return Ok(Vec::new());
    }
    list.split(',')
        .map(|code| {
            let code = code.trim();
            code.parse().map_err(|_| Error::InvalidCode(code.to_owned()))
        })
        .collect()
}

fn split_points(
    codes: Vec<i32>,
    format: SampleFormat,
    point_format: PointFormat,
) -> Result<Vec<RawSamples>> {
    match point_format {
        PointFormat::Y => Ok(vec![RawSamples::new(codes, format)]),
        PointFormat::Pairs => {
            if codes.len() % 2 != 0 {
                return Err(Error::UnpairedCodes(codes.len()));
            }
            let (primary, secondary) = codes.chunks_exact(2).map(|p| (p[0], p[1])).unzip();
            Ok(vec![
                RawSamples::new(primary, format),
                RawSamples::new(secondary, format),
            ])
        }
    }
}

/// `x = XZERo + (i - PT_Off) * XINcr`, `y = YZEro + (code - YOFf) * YMUlt`
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Calibration {
    pub x_zero: f64,
    pub x_increment: f64,
    pub point_offset: f64,
    pub y_zero: f64,
    pub y_multiplier: f64,
    pub y_offset: f64,
    /// Codes per row; the time of a row is that of its first code
    pub stride: usize,
}

impl Calibration {
    pub fn from_preamble(preamble: &Preamble) -> Result<Self> {
        Ok(Calibration {
            x_zero: number("XZERo", &preamble.x_zero)?,
            x_increment: number("XINcr", &preamble.x_increment)?,
            point_offset: number("PT_Off", &preamble.point_offset)?,
            y_zero: number("YZEro", &preamble.y_zero)?,
            y_multiplier: number("YMUlt", &preamble.y_multiplier)?,
            y_offset: number("YOFf", &preamble.y_offset)?,
            stride: preamble.point_format().codes_per_point(),
        })
    }
}

impl Calibrate for Calibration {
    fn time(&self, index: usize) -> f64 {
        self.x_zero + ((index * self.stride) as f64 - self.point_offset) * self.x_increment
    }

    fn voltage(&self, code: i32) -> f64 {
        self.y_zero + (f64::from(code) - self.y_offset) * self.y_multiplier
    }
}
