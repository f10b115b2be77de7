use clap::{Parser, Subcommand};
use riegeli_rs::chunk::ChunkType;
use riegeli_rs::chunk_reader::ChunkReader;
use riegeli_rs::{FileSource, ReaderOptions, RecordReader, RecordsMetadata};
use std::collections::BTreeMap;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "riegeli", version = "0.1.0", about = "Riegeli record-file reader CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print signature validity, metadata, chunk counts by type, total record count
    Inspect { input: PathBuf },
    /// Stream records to stdout, length-prefixed (u32 LE) to stay binary-safe
    Cat { input: PathBuf },
    /// Scan with recovery enabled, reporting skipped regions, writing survivors
    Recover {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    match Cli::parse().command {
        Commands::Inspect { input } => inspect(&input)?,
        Commands::Cat { input } => cat(&input)?,
        Commands::Recover { input, output } => recover(&input, &output)?,
    }
    Ok(())
}

fn inspect(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let source = FileSource::open(path)?;
    let mut reader = RecordReader::new(source, ReaderOptions::default());

    println!("── riegeli inspect ──────────────────────────────────────");
    println!("  Path              {}", path.display());

    let mut metadata = RecordsMetadata::default();
    let has_metadata = reader.read_metadata(&mut metadata)?;
    println!("  Signature valid   {}", has_metadata);
    println!("  Record type name  {}", metadata.record_type_name.as_deref().unwrap_or("(none)"));
    println!("  File descriptors  {}", metadata.file_descriptors.len());

    let mut chunk_counts: BTreeMap<&str, u64> = BTreeMap::new();
    let mut total_records = 0u64;
    let mut counter = ChunkReader::new(FileSource::open(path)?);
    while let Some(chunk) = counter.read_chunk()? {
        let name = match chunk.header.chunk_type {
            ChunkType::FileSignature => "FileSignature",
            ChunkType::FileMetadata => "FileMetadata",
            ChunkType::Padding => "Padding",
            ChunkType::Simple => "Simple",
            ChunkType::Transposed => "Transposed",
        };
        *chunk_counts.entry(name).or_default() += 1;
        total_records += chunk.header.num_records;
    }
    println!("  Chunks:");
    for (name, count) in &chunk_counts {
        println!("    {:<14} {}", name, count);
    }
    println!("  Total records     {}", total_records);
    println!("  File size         {} B", std::fs::metadata(path)?.len());

    Ok(())
}

fn cat(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    use std::io::Write;
    let source = FileSource::open(path)?;
    let mut reader = RecordReader::new(source, ReaderOptions::default());
    if !reader.check_file_format() {
        return Err("not a valid riegeli file: missing FileSignature chunk".into());
    }
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    while let Some((record, _pos)) = reader.read_record() {
        out.write_all(&(record.len() as u32).to_le_bytes())?;
        out.write_all(&record)?;
    }
    if !reader.is_healthy() {
        eprintln!("cat: stopped after error: {}", reader.last_error().unwrap_or("unknown"));
    }
    Ok(())
}

fn recover(input: &PathBuf, output: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    use riegeli_rs::testutil::FixtureWriter;

    let source = FileSource::open(input)?;
    let mut reader = RecordReader::new(source, ReaderOptions::default());
    if !reader.check_file_format() {
        return Err("not a valid riegeli file: missing FileSignature chunk".into());
    }

    println!("── riegeli recover ──────────────────────────────────────");
    println!("  Source: {}", input.display());
    println!("  Output: {}", output.display());

    let mut writer = FixtureWriter::new();
    writer.add_signature();
    let mut recovered_records: Vec<Vec<u8>> = Vec::new();
    let mut skipped_count = 0u64;

    loop {
        while let Some((record, _pos)) = reader.read_record() {
            recovered_records.push(record);
        }
        if reader.is_healthy() {
            break;
        }
        match reader.recover() {
            Some(region) => {
                println!(
                    "  skipped [{}, {}): {}",
                    region.begin, region.end, region.reason
                );
                skipped_count += 1;
            }
            None => {
                eprintln!("  recovery exhausted: {}", reader.last_error().unwrap_or("unknown"));
                break;
            }
        }
    }

    let refs: Vec<&[u8]> = recovered_records.iter().map(|r| r.as_slice()).collect();
    if !refs.is_empty() {
        writer.add_simple_chunk(&refs);
    }
    std::fs::write(output, writer.finish())?;

    println!();
    println!("  Records recovered: {}", recovered_records.len());
    println!("  Regions skipped:   {}", skipped_count);
    println!("Recovery complete → {}", output.display());
    Ok(())
}
