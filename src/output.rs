//! Delimited text output

use std::io::Write;

use tracing::info;

use crate::error::Result;
use crate::{Calibrate, Capture};

/// Formatting of calibrated values
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Precision {
    /// Shortest representation that reads back to the same value
    Full,
    /// Fixed number of digits after the decimal point
    Fixed(usize),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputConfig {
    pub separator: String,
    pub emit_header: bool,
    /// Write voltages instead of the raw codes
    pub emit_calibrated_voltage: bool,
    pub emit_time_column: bool,
    pub precision: Precision,
}

impl Default for OutputConfig {
    fn default() -> Self {
        OutputConfig {
            separator: ",".to_owned(),
            emit_header: true,
            emit_calibrated_voltage: true,
            emit_time_column: true,
            precision: Precision::Full,
        }
    }
}

/// Column titles: `t` then `v` for one channel or `v1`, `v2`, ... for several
pub fn column_names(channels: usize, time: bool) -> Vec<String> {
    let time = time.then(|| "t".to_owned());
    let voltages = if channels == 1 {
        vec!["v".to_owned()]
    } else {
        (1..=channels).map(|i| format!("v{i}")).collect()
    };
    time.into_iter().chain(voltages).collect()
}

pub struct TableWriter<W> {
    out: W,
    config: OutputConfig,
}

impl<W: Write> TableWriter<W> {
    pub fn new(out: W, config: OutputConfig) -> Self {
        TableWriter { out, config }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn value(&mut self, value: f64) -> std::io::Result<()> {
        match self.config.precision {
            Precision::Full => write!(self.out, "{value}"),
            Precision::Fixed(digits) => write!(self.out, "{value:.digits$}"),
        }
    }

    /// Write the header (if enabled) and one row per sample, returning the number of rows
    pub fn write_capture<C: Calibrate>(&mut self, capture: &Capture<C>) -> Result<usize> {
        let separator = self.config.separator.clone();
        if self.config.emit_header {
            let names = column_names(capture.channels().len(), self.config.emit_time_column);
            writeln!(self.out, "{}", names.join(&separator))?;
        }
        for index in 0..capture.len() {
            let mut first = true;
            if self.config.emit_time_column {
                self.value(capture.time(index))?;
                first = false;
            }
            for channel in capture.channels() {
                if !first {
                    self.out.write_all(separator.as_bytes())?;
                }
                first = false;
                let code = channel.samples.codes()[index];
                if self.config.emit_calibrated_voltage {
                    self.value(channel.calibration.voltage(code))?;
                } else {
                    write!(self.out, "{code}")?;
                }
            }
            writeln!(self.out)?;
        }
        self.out.flush()?;
        info!("Wrote {} rows", capture.len());
        Ok(capture.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Channel, RawSamples, SampleFormat};

    #[derive(Clone, Copy)]
    struct Halves;

    impl Calibrate for Halves {
        fn time(&self, index: usize) -> f64 {
            index as f64 * 0.5
        }
        fn voltage(&self, code: i32) -> f64 {
            f64::from(code) / 4.0
        }
    }

    fn capture(columns: &[&[i32]]) -> Capture<Halves> {
        let format = SampleFormat {
            bits: 8,
            signed: true,
        };
        Capture::join(
            columns
                .iter()
                .map(|c| Channel::new(RawSamples::new(c.to_vec(), format), Halves))
                .collect(),
        )
        .unwrap()
    }

    fn render(config: OutputConfig, capture: &Capture<Halves>) -> String {
        let mut writer = TableWriter::new(Vec::new(), config);
        writer.write_capture(capture).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn names() {
        assert_eq!(column_names(1, true), ["t", "v"]);
        assert_eq!(column_names(3, true), ["t", "v1", "v2", "v3"]);
        assert_eq!(column_names(2, false), ["v1", "v2"]);
    }

    #[test]
    fn two_channels_with_header() {
        let text = render(OutputConfig::default(), &capture(&[&[1, 2, 3], &[-4, 5, 6]]));
        assert_eq!(text, "t,v1,v2\n0,0.25,-1\n0.5,0.5,1.25\n1,0.75,1.5\n");
    }

    #[test]
    fn raw_codes_without_time_or_header() {
        let config = OutputConfig {
            separator: "\t".to_owned(),
            emit_header: false,
            emit_calibrated_voltage: false,
            emit_time_column: false,
            precision: Precision::Full,
        };
        let text = render(config, &capture(&[&[1, -2], &[3, 4]]));
        assert_eq!(text, "1\t3\n-2\t4\n");
    }

    #[test]
    fn fixed_precision() {
        let config = OutputConfig {
            separator: ";".to_owned(),
            precision: Precision::Fixed(3),
            ..Default::default()
        };
        let text = render(config, &capture(&[&[1, 3]]));
        assert_eq!(text, "t;v\n0.000;0.250\n0.500;0.750\n");
    }
}
