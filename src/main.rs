use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use args::{Command, JoinArgs, OutputArgs};
use clap::Parser;
use tracing::info;
use wave_slurper::chunk::{ChunkPlan, Framing};
use wave_slurper::convert::{convert_sds, convert_tds, join_transfers};

mod args;

/// Open the output destination, a single dash meaning stdout
fn open_output(path: &Path) -> anyhow::Result<Box<dyn Write>> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufWriter::new(std::io::stdout().lock())));
    }
    let file = File::create(path)
        .with_context(|| format!("Couldn't create output file {}", path.display()))?;
    Ok(Box::new(BufWriter::new(file)))
}

fn table(output: &OutputArgs) -> anyhow::Result<Box<dyn Write>> {
    open_output(&output.output)
}

fn join(args: &JoinArgs) -> anyhow::Result<()> {
    let plan = ChunkPlan::new(args.points, args.chunk_size)?;
    info!(
        "Joining {} transfers of up to {} points into {} points",
        plan.len(),
        plan.chunk_size(),
        plan.total_points()
    );
    let data = join_transfers(
        &args.transfers,
        plan,
        Framing::default(),
        usize::from(args.width),
    )
    .context("Couldn't reassemble the transfers")?;
    let mut out = open_output(&args.output)?;
    out.write_all(&data)?;
    out.flush()?;
    info!("Wrote {} bytes to {}", data.len(), args.output.display());
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = args::Args::parse();

    // Logs go to stderr so tables can go to stdout
    tracing_subscriber::fmt()
        .with_max_level(args::convert_filter(args.verbose.log_level_filter()))
        .with_writer(std::io::stderr)
        .init();

    match &args.command {
        Command::Sds(sds) => {
            let rows = convert_sds(
                &sds.preamble,
                &sds.data,
                table(&sds.output)?,
                sds.output.config(),
            )
            .context("Couldn't convert the Siglent waveform")?;
            info!("Converted {rows} samples");
        }
        Command::Tds(tds) => {
            let rows = convert_tds(
                &tds.preamble,
                &tds.data,
                table(&tds.output)?,
                tds.output.config(),
            )
            .context("Couldn't convert the Tektronix curve")?;
            info!("Converted {rows} samples");
        }
        Command::Join(join_args) => join(join_args)?,
    }
    Ok(())
}
