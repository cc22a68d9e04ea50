//! Whole-file conversions: read the inputs, decode, join and write a table

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use tracing::info;

use crate::chunk::{ChunkPlan, Framing, Reassembler};
use crate::error::{Error, Result};
use crate::output::{OutputConfig, TableWriter};
use crate::{sds, tds, Capture, Channel};

/// Read a whole input file. The handle is closed before returning.
pub fn read_input(path: &Path) -> Result<Vec<u8>> {
    let io_err = |source| Error::Io {
        path: path.to_owned(),
        source,
    };
    let mut file = File::open(path).map_err(io_err)?;
    let mut data = Vec::new();
    file.read_to_end(&mut data).map_err(io_err)?;
    Ok(data)
}

/// Decode a Siglent preamble and one data transfer per channel
pub fn sds_capture<D: AsRef<[u8]>>(
    preamble: &[u8],
    transfers: &[D],
) -> Result<Capture<sds::Calibration>> {
    let preamble = sds::Preamble::decode(preamble)?;
    let calibration = sds::Calibration::from_preamble(&preamble)?;
    let channels = transfers
        .iter()
        .map(|t| -> Result<_> {
            Ok(Channel::new(preamble.decode_samples(t.as_ref())?, calibration))
        })
        .collect::<Result<Vec<_>>>()?;
    Capture::join(channels)
}

/// Decode a Tektronix preamble and curve
pub fn tds_capture(preamble: &[u8], curve: &[u8]) -> Result<Capture<tds::Calibration>> {
    let preamble = tds::Preamble::decode_bytes(preamble)?;
    let calibration = tds::Calibration::from_preamble(&preamble)?;
    let channels = preamble
        .decode_curve(curve)?
        .into_iter()
        .map(|samples| Channel::new(samples, calibration))
        .collect();
    Capture::join(channels)
}

/// Convert Siglent files, one voltage column per data file
pub fn convert_sds<W: Write>(
    preamble: &Path,
    data: &[PathBuf],
    out: W,
    config: OutputConfig,
) -> Result<usize> {
    info!("Reading preamble {}", preamble.display());
    let preamble = read_input(preamble)?;
    let transfers = data
        .iter()
        .map(|path| {
            info!("Reading waveform data {}", path.display());
            read_input(path)
        })
        .collect::<Result<Vec<_>>>()?;
    let capture = sds_capture(&preamble, &transfers)?;
    TableWriter::new(out, config).write_capture(&capture)
}

/// Convert a Tektronix preamble and curve file
pub fn convert_tds<W: Write>(
    preamble: &Path,
    curve: &Path,
    out: W,
    config: OutputConfig,
) -> Result<usize> {
    info!("Reading preamble {}", preamble.display());
    let preamble = read_input(preamble)?;
    info!("Reading curve {}", curve.display());
    let curve = read_input(curve)?;
    let capture = tds_capture(&preamble, &curve)?;
    TableWriter::new(out, config).write_capture(&capture)
}

/// Reassemble transfer files into one framed data file
pub fn join_transfers(
    transfers: &[PathBuf],
    plan: ChunkPlan,
    framing: Framing,
    sample_width: usize,
) -> Result<Vec<u8>> {
    let mut reassembler = Reassembler::new(plan, framing, sample_width)?;
    for path in transfers {
        let chunk = reassembler.push(&read_input(path)?)?;
        info!(
            "Chunk {:02} of {:02} from {}",
            chunk.index + 1,
            plan.len(),
            path.display()
        );
    }
    reassembler.finish_framed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::reassemble;
    use crate::output::Precision;
    use crate::sds::tests::{transfer, PreambleBuilder};

    fn render<C: crate::Calibrate>(capture: &Capture<C>, config: OutputConfig) -> String {
        let mut writer = TableWriter::new(Vec::new(), config);
        writer.write_capture(capture).unwrap();
        String::from_utf8(writer.into_inner()).unwrap()
    }

    #[test]
    fn siglent_two_channels() {
        let preamble = PreambleBuilder::new()
            .vertical(0.5, 0.0, 25.0)
            .horizontal(0.5, 0.0, 29)
            .build();
        let capture = sds_capture(&preamble, &[transfer(&[25, 0]), transfer(&[231, 50])]).unwrap();
        let text = render(&capture, OutputConfig::default());
        assert_eq!(text, "t,v1,v2\n-5,0.5,-0.5\n-4.5,0,1\n");
    }

    #[test]
    fn siglent_mismatched_channels() {
        let preamble = PreambleBuilder::new().build();
        assert!(matches!(
            sds_capture(&preamble, &[transfer(&[1, 2, 3]), transfer(&[1, 2])]),
            Err(Error::SampleCountMismatch {
                channel: 2,
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn reassembled_transfer_converts_like_a_single_one() {
        let preamble = PreambleBuilder::new().comm_type(1).build();
        let payload: Vec<u8> = (0u16..100).flat_map(|c| (c * 601).to_le_bytes()).collect();
        let single = sds_capture(&preamble, &[transfer(&payload)]).unwrap();

        let plan = ChunkPlan::new(100, 30).unwrap();
        let transfers: Vec<_> = plan
            .chunks()
            .map(|c| transfer(&payload[c.start * 2..(c.start + c.points) * 2]))
            .collect();
        let joined = Framing::default().wrap(
            &reassemble(
                plan,
                Framing::default(),
                2,
                transfers.iter().map(Vec::as_slice),
            )
            .unwrap(),
        );
        let rebuilt = sds_capture(&preamble, &[joined]).unwrap();
        assert_eq!(
            single.channels()[0].samples,
            rebuilt.channels()[0].samples
        );
    }

    #[test]
    fn tektronix_curve() {
        let preamble = "1;8;ASC;RP;MSB;2;x;Y;1;0;0;s;0.04;0;0;V";
        let capture = tds_capture(preamble.as_bytes(), b":CURVE 10,20\n").unwrap();
        let config = OutputConfig {
            precision: Precision::Fixed(1),
            ..Default::default()
        };
        assert_eq!(render(&capture, config), "t,v\n0.0,0.4\n1.0,0.8\n");
    }

    #[test]
    fn tektronix_envelope() {
        let preamble = "1;8;BIN;RI;MSB;4;x;ENV;0.5;0;0;s;1;0;0;V";
        let capture = tds_capture(preamble.as_bytes(), b"#14\x01\xff\x02\xfe\n").unwrap();
        assert_eq!(
            render(&capture, OutputConfig::default()),
            "t,v1,v2\n0,1,-1\n1,2,-2\n"
        );
    }

    #[test]
    fn joined_files_convert_like_a_single_download() {
        let preamble = PreambleBuilder::new()
            .vertical(0.5, 0.0, 25.0)
            .horizontal(0.5, 0.0, 29)
            .build();
        let payload = [25u8, 0, 231, 50, 128, 127, 3];
        let plan = ChunkPlan::new(payload.len(), 3).unwrap();

        let dir = std::env::temp_dir().join(format!("wave_slurper-join-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let paths: Vec<PathBuf> = plan
            .chunks()
            .map(|c| {
                let path = dir.join(format!("chunk{}.dat", c.index));
                std::fs::write(&path, transfer(&payload[c.start..c.start + c.points])).unwrap();
                path
            })
            .collect();
        assert_eq!(paths.len(), 3);

        let joined = join_transfers(&paths, plan, Framing::default(), 1).unwrap();
        let joined_path = dir.join("joined.dat");
        std::fs::write(&joined_path, &joined).unwrap();
        let preamble_path = dir.join("capture.pre");
        std::fs::write(&preamble_path, &preamble).unwrap();

        let mut from_files = Vec::new();
        let rows = convert_sds(
            &preamble_path,
            &[joined_path],
            &mut from_files,
            OutputConfig::default(),
        )
        .unwrap();
        let missing = join_transfers(&paths[..2], plan, Framing::default(), 1);
        std::fs::remove_dir_all(&dir).unwrap();
        assert!(matches!(
            missing,
            Err(Error::MissingChunks {
                received: 2,
                planned: 3
            })
        ));

        let single = sds_capture(&preamble, &[transfer(&payload)]).unwrap();
        assert_eq!(rows, payload.len());
        assert_eq!(
            String::from_utf8(from_files).unwrap(),
            render(&single, OutputConfig::default())
        );
    }

    #[test]
    fn missing_input() {
        let path = std::env::temp_dir().join("wave_slurper-does-not-exist.pre");
        let err = convert_tds(&path, &path, Vec::new(), OutputConfig::default()).unwrap_err();
        assert!(matches!(err, Error::Io { path: p, .. } if p == path));
    }
}
