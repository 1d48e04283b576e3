use anyhow::{anyhow, bail, Result};
use clap::{builder::PossibleValue, Parser, ValueEnum};
use format_num::NumberFormat;
use libblocksa::{
    util::read_sequence_file, KarkkainenArgs, KarkkainenSa, NaiveSa, SuffixBlockSource,
    SuffixStream,
};
use log::{debug, info};
use std::{
    ffi::OsStr,
    fs::{self, File},
    io::{BufWriter, Write},
    path::PathBuf,
    time::Instant,
};

/// Version byte leading every offsets file
pub const OUTFILE_VERSION: u8 = 1;

// --------------------------------------------------
#[derive(Debug, Parser)]
#[command(author, version, about, arg_required_else_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log level
    #[arg(short, long, global = true)]
    pub log: Option<LogLevel>,

    /// Log file (default STDOUT)
    #[arg(long, global = true)]
    pub log_file: Option<String>,
}

#[derive(Debug, Parser)]
pub enum Command {
    /// Build the suffix array of a FASTA/Q file one block at a time
    Create(CreateArgs),

    /// Verify the order and completeness of an offsets file
    Check(CheckArgs),
}

// --------------------------------------------------
#[derive(Debug, Parser)]
pub struct CreateArgs {
    /// Input FASTA/Q file
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Output file
    #[arg(short, long, value_name = "OUTPUT")]
    pub output: Option<String>,

    /// Maximum number of suffixes per emitted block
    #[arg(short, long, value_name = "SIZE", default_value = "4096")]
    pub bucket_size: u32,

    /// Difference-cover periodicity, 0 to disable
    #[arg(
        short('c'),
        long("difference-cover"),
        value_name = "V",
        default_value = "1024"
    )]
    pub dc_v: u32,

    /// Seed for sample selection
    #[arg(short, long, value_name = "SEED", default_value = "0")]
    pub seed: u64,

    /// Cross-validate every comparator shortcut (slow)
    #[arg(long("sanity-check"))]
    pub sanity_check: bool,

    /// Build the whole suffix array at once instead of blockwise
    #[arg(long)]
    pub naive: bool,

    /// Character placed between records of a multi-sequence input
    #[arg(short('d'), long, value_name = "DELIM", default_value = "N")]
    pub sequence_delimiter: char,
}

// --------------------------------------------------
#[derive(Debug, Parser)]
pub struct CheckArgs {
    /// Offsets file produced by "create"
    #[arg(value_name = "OFFSETS")]
    pub filename: String,

    /// List every error
    #[arg(short, long)]
    pub verbose: bool,
}

// --------------------------------------------------
#[derive(Debug, Clone)]
pub enum LogLevel {
    Info,
    Debug,
}

impl ValueEnum for LogLevel {
    fn value_variants<'a>() -> &'a [Self] {
        &[LogLevel::Info, LogLevel::Debug]
    }

    fn to_possible_value(&self) -> Option<PossibleValue> {
        Some(match self {
            LogLevel::Info => PossibleValue::new("info"),
            LogLevel::Debug => PossibleValue::new("debug"),
        })
    }
}

// --------------------------------------------------
pub fn create(args: &CreateArgs) -> Result<()> {
    let now = Instant::now();
    let seq_data = read_sequence_file(&args.input, args.sequence_delimiter as u8)?;
    let num_fmt = NumberFormat::new();
    info!(
        "Read {} byte{} from '{}' in {:?}",
        num_fmt.format(",.0", seq_data.seq.len() as f64),
        if seq_data.seq.len() == 1 { "" } else { "s" },
        args.input,
        now.elapsed()
    );
    debug!("Sequence names: {}", seq_data.sequence_names.join(", "));

    let outfile = args.output.clone().unwrap_or(format!(
        "{}.bsa",
        PathBuf::from(&args.input)
            .file_stem()
            .unwrap_or(OsStr::new("out"))
            .to_string_lossy()
    ));

    let now = Instant::now();
    let num_suffixes = if args.naive {
        let source = NaiveSa::new(&seq_data.seq, args.bucket_size)?;
        write_stream(source, &seq_data.seq, &seq_data.sequence_names, &outfile)?
    } else {
        let source = KarkkainenSa::new(KarkkainenArgs {
            text: &seq_data.seq,
            bucket_size: args.bucket_size,
            dc_v: args.dc_v,
            random_seed: args.seed,
            sanity_check: args.sanity_check,
        })?;
        write_stream(source, &seq_data.seq, &seq_data.sequence_names, &outfile)?
    };

    info!(
        "Wrote {} suffix{} to '{outfile}' in {:?}",
        num_fmt.format(",.0", num_suffixes as f64),
        if num_suffixes == 1 { "" } else { "es" },
        now.elapsed()
    );
    Ok(())
}

// --------------------------------------------------
// Stream every suffix into the offsets file:
// version, text length, text, suffix count, LE u32 offsets, and the
// bincoded sequence names at the end where variable-width data can
// live.
fn write_stream<B: SuffixBlockSource>(
    source: B,
    text: &[u8],
    sequence_names: &[String],
    outfile: &str,
) -> Result<usize> {
    let mut out = BufWriter::new(
        File::create(outfile).map_err(|e| anyhow!("{outfile}: {e}"))?,
    );
    out.write_all(&[OUTFILE_VERSION])?;
    out.write_all(&(text.len() as u64).to_le_bytes())?;
    out.write_all(text)?;
    out.write_all(&(text.len() as u64 + 1).to_le_bytes())?;

    let mut stream = SuffixStream::new(source);
    let mut num_suffixes = 0;
    while stream.has_more_suffixes()? {
        out.write_all(&stream.next_suffix()?.to_le_bytes())?;
        num_suffixes += 1;
    }

    out.write_all(&bincode::serialize(sequence_names)?)?;
    Ok(num_suffixes)
}

// --------------------------------------------------
pub fn check(args: &CheckArgs) -> Result<()> {
    let now = Instant::now();
    let (text, offsets) = read_offsets_file(&args.filename)?;

    if offsets.len() != text.len() + 1 {
        bail!(
            "'{}' holds {} offsets for a text of length {}",
            args.filename,
            offsets.len(),
            text.len()
        );
    }
    if let Some(&bad) = offsets.iter().find(|&&o| o as usize > text.len()) {
        bail!("'{}' holds out-of-range offset {bad}", args.filename);
    }

    // Ranks where an adjacent pair is out of order
    let mut order_errors: Vec<usize> = vec![];
    for (rank, pair) in offsets.windows(2).enumerate() {
        if text[pair[0] as usize..] >= text[pair[1] as usize..] {
            order_errors.push(rank);
        }
    }

    // Offsets that appear more than once
    let mut duplicate_errors: Vec<u32> = vec![];
    let mut seen = vec![false; text.len() + 1];
    for &offset in &offsets {
        if std::mem::replace(&mut seen[offset as usize], true) {
            duplicate_errors.push(offset);
        }
    }

    if args.verbose {
        let mut num = 0;
        for rank in &order_errors {
            num += 1;
            println!("{num:3}: order at rank {rank}");
        }
        for offset in &duplicate_errors {
            num += 1;
            println!("{num:3}: duplicate offset {offset}");
        }
    }
    let num_errors = order_errors.len() + duplicate_errors.len();
    println!(
        "Checked {} suffixes, found {} error{} in {:?}.",
        offsets.len(),
        num_errors,
        if num_errors == 1 { "" } else { "s" },
        now.elapsed()
    );
    Ok(())
}

// --------------------------------------------------
pub fn read_offsets_file(filename: &str) -> Result<(Vec<u8>, Vec<u32>)> {
    let buffer = fs::read(filename).map_err(|e| anyhow!("{filename}: {e}"))?;
    let mut pos = 0;

    let version = *buffer
        .first()
        .ok_or_else(|| anyhow!("{filename}: empty file"))?;
    if version != OUTFILE_VERSION {
        bail!("{filename}: unknown version {version}");
    }
    pos += 1;

    let text_len = read_u64(&buffer, &mut pos, filename)? as usize;
    let text = read_bytes(&buffer, &mut pos, text_len, filename)?.to_vec();
    let num_suffixes = read_u64(&buffer, &mut pos, filename)? as usize;
    let raw = read_bytes(&buffer, &mut pos, num_suffixes * 4, filename)?;
    let offsets: Vec<u32> = raw
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();

    Ok((text, offsets))
}

// --------------------------------------------------
fn read_u64(buffer: &[u8], pos: &mut usize, filename: &str) -> Result<u64> {
    let raw = read_bytes(buffer, pos, 8, filename)?;
    Ok(u64::from_le_bytes(raw.try_into()?))
}

fn read_bytes<'a>(
    buffer: &'a [u8],
    pos: &mut usize,
    len: usize,
    filename: &str,
) -> Result<&'a [u8]> {
    let end = *pos + len;
    let slice = buffer
        .get(*pos..end)
        .ok_or_else(|| anyhow!("{filename}: truncated file"))?;
    *pos = end;
    Ok(slice)
}

// --------------------------------------------------
#[cfg(test)]
mod tests {
    use super::{read_offsets_file, write_stream};
    use anyhow::Result;
    use libblocksa::NaiveSa;
    use pretty_assertions::assert_eq;
    use tempfile::NamedTempFile;

    #[test]
    fn test_offsets_file_round_trip() -> Result<()> {
        let text = b"banana";
        let names = vec!["1".to_string()];
        let outfile = NamedTempFile::new()?;
        let outpath = outfile.path().to_string_lossy().to_string();

        let source = NaiveSa::new(text, 3)?;
        let written = write_stream(source, text, &names, &outpath)?;
        assert_eq!(written, 7);

        let (read_text, offsets) = read_offsets_file(&outpath)?;
        assert_eq!(read_text, text);
        assert_eq!(offsets, [6, 5, 3, 1, 0, 4, 2]);
        Ok(())
    }
}
