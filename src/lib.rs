//! Decode oscilloscope capture files into calibrated time/voltage tables.
//!
//! Two instrument families are supported: [sds] (fixed binary preamble,
//! framed 8/16-bit transfers) and [tds] (key/value text preamble, length
//! prefixed or ASCII curve data). Large acquisitions fetched in several
//! transfers are stitched back together by [chunk].
use num_traits::AsPrimitive;

pub mod chunk;
pub mod convert;
pub mod error;
pub mod lookup;
pub mod output;
pub mod sds;
pub mod tds;

pub use error::{Error, Result};
use lookup::ByteOrder;

/// How the codes of a [RawSamples] buffer were encoded on the wire
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SampleFormat {
    pub bits: u32,
    pub signed: bool,
}

impl SampleFormat {
    pub fn bytes(&self) -> usize {
        (self.bits / 8) as usize
    }
}

/// Integer codes for one acquired channel, in acquisition order
#[derive(Clone, Debug, PartialEq)]
pub struct RawSamples {
    codes: Vec<i32>,
    format: SampleFormat,
}

impl RawSamples {
    pub fn new(codes: Vec<i32>, format: SampleFormat) -> Self {
        Self { codes, format }
    }

    pub fn codes(&self) -> &[i32] {
        &self.codes
    }

    pub fn format(&self) -> SampleFormat {
        self.format
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// A fixed-width integer as it appears in a transfer buffer
pub trait SampleWord: Copy + AsPrimitive<i32> {
    const WIDTH: usize;
    /// `bytes` is exactly [Self::WIDTH] long
    fn read(bytes: &[u8], order: ByteOrder) -> Self;
}

impl SampleWord for u8 {
    const WIDTH: usize = 1;
    fn read(bytes: &[u8], _: ByteOrder) -> Self {
        bytes[0]
    }
}

impl SampleWord for i8 {
    const WIDTH: usize = 1;
    fn read(bytes: &[u8], _: ByteOrder) -> Self {
        bytes[0] as i8
    }
}

impl SampleWord for u16 {
    const WIDTH: usize = 2;
    fn read(bytes: &[u8], order: ByteOrder) -> Self {
        let word = [bytes[0], bytes[1]];
        match order {
            ByteOrder::Lsb => u16::from_le_bytes(word),
            ByteOrder::Msb => u16::from_be_bytes(word),
        }
    }
}

impl SampleWord for i16 {
    const WIDTH: usize = 2;
    fn read(bytes: &[u8], order: ByteOrder) -> Self {
        u16::read(bytes, order) as i16
    }
}

/// Split a payload into words of type `T`
///
/// Fails if the payload does not hold a whole number of words.
pub fn decode_words<T: SampleWord>(payload: &[u8], order: ByteOrder) -> Result<Vec<i32>> {
    if payload.len() % T::WIDTH != 0 {
        return Err(Error::PayloadWidth {
            len: payload.len(),
            width: T::WIDTH,
        });
    }
    Ok(payload
        .chunks_exact(T::WIDTH)
        .map(|word| T::read(word, order).as_())
        .collect())
}

/// Maps sample indices and raw codes to physical units
pub trait Calibrate {
    /// Time in seconds of the row at `index`
    fn time(&self, index: usize) -> f64;
    /// Voltage represented by `code`
    fn voltage(&self, code: i32) -> f64;
}

/// A raw sample buffer together with the calibration of its preamble
#[derive(Clone, Debug)]
pub struct Channel<C> {
    pub samples: RawSamples,
    pub calibration: C,
}

impl<C: Calibrate> Channel<C> {
    pub fn new(samples: RawSamples, calibration: C) -> Self {
        Self {
            samples,
            calibration,
        }
    }

    pub fn voltages(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples
            .codes()
            .iter()
            .map(|&code| self.calibration.voltage(code))
    }
}

/// One output row: a time and a voltage per channel
#[derive(Clone, Debug, PartialEq)]
pub struct Row {
    pub time: f64,
    pub voltages: Vec<f64>,
}

/// Channels that share one time axis
///
/// The time axis is taken from the first channel's calibration.
#[derive(Clone, Debug)]
pub struct Capture<C> {
    channels: Vec<Channel<C>>,
    len: usize,
}

impl<C: Calibrate> Capture<C> {
    /// Join channels, checking that all of them hold the same number of samples
    pub fn join(channels: Vec<Channel<C>>) -> Result<Self> {
        let len = channels.first().ok_or(Error::NoChannels)?.samples.len();
        if let Some((channel, mismatch)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.samples.len() != len)
        {
            return Err(Error::SampleCountMismatch {
                channel: channel + 1,
                expected: len,
                actual: mismatch.samples.len(),
            });
        }
        Ok(Self { channels, len })
    }

    pub fn channels(&self) -> &[Channel<C>] {
        &self.channels
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn time(&self, index: usize) -> f64 {
        self.channels[0].calibration.time(index)
    }

    /// Calibrated rows, computed on demand
    pub fn rows(&self) -> impl Iterator<Item = Row> + '_ {
        (0..self.len).map(move |i| Row {
            time: self.time(i),
            voltages: self
                .channels
                .iter()
                .map(|c| c.calibration.voltage(c.samples.codes()[i]))
                .collect(),
        })
    }
}
