//! protoprobe - Match binary protobuf samples against candidate schemas
//!
//! This tool loads every `.proto` file in a schema directory, then decodes
//! every file in a sample directory against each of them and reports the
//! pairs that decode cleanly.

mod printer;

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use protoprobe_core::{
    Decoder, DecoderConfig, LengthPrefix, MessageDefinition, SchemaLoader, SchemaRegistry,
};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn, Level};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

/// Match binary protobuf samples against candidate schemas
#[derive(Parser, Debug)]
#[command(name = "protoprobe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Directory of .proto schema files to try
    #[arg(short, long)]
    schemas: PathBuf,

    /// Directory of binary samples to decode
    #[arg(short, long)]
    binaries: PathBuf,

    /// Directory imports are resolved against (defaults to the schema directory)
    #[arg(long)]
    import_root: Option<PathBuf>,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(long, value_enum, default_value = "values")]
    format: OutputFormat,

    /// Read length prefixes as varints instead of single bytes
    #[arg(long)]
    varint_lengths: bool,

    /// Maximum nesting depth of embedded messages
    #[arg(long, default_value = "64")]
    max_depth: usize,

    /// Stop trying schemas for a sample after its first match
    #[arg(long)]
    first_match: bool,

    /// Decode samples whose content duplicates an earlier sample
    #[arg(long)]
    keep_duplicates: bool,
}

/// Output format for matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// Matching pair followed by the decoded values
    Values,
    /// Just the matching `<schema> <sample>` pair (for scripting)
    Pairs,
}

/// A schema file loaded into its own registry
struct LoadedSchema {
    path: PathBuf,
    registry: SchemaRegistry,
    message: MessageDefinition,
}

/// Tracks sample contents already seen
#[derive(Default)]
struct SampleRegistry {
    /// Maps content hash -> first sample with that content
    seen: HashMap<blake3::Hash, PathBuf>,
    /// Statistics
    stats: RunStats,
}

#[derive(Default)]
struct RunStats {
    samples: usize,
    duplicates_skipped: usize,
    pairs_tried: usize,
    matches: usize,
    unmatched: usize,
}

impl SampleRegistry {
    fn new() -> Self {
        Self::default()
    }

    /// Records a sample, returning the earlier sample it duplicates, if any
    fn register(&mut self, path: &Path, data: &[u8]) -> Option<&Path> {
        let hash = blake3::hash(data);

        if self.seen.contains_key(&hash) {
            self.stats.duplicates_skipped += 1;
            return self.seen.get(&hash).map(PathBuf::as_path);
        }
        self.seen.insert(hash, path.to_path_buf());
        None
    }

    fn print_summary(&self) {
        info!(
            "Summary: {} samples, {} duplicates skipped, {} pairs tried, {} matches, {} samples unmatched",
            self.stats.samples,
            self.stats.duplicates_skipped,
            self.stats.pairs_tried,
            self.stats.matches,
            self.stats.unmatched
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(false)
        .init();

    let schemas = load_schemas(&cli)?;
    if schemas.is_empty() {
        bail!("No .proto files found in {}", cli.schemas.display());
    }

    let mut samples = SampleRegistry::new();
    for sample in collect_samples(&cli.binaries)? {
        if let Err(e) = process_sample(&cli, &sample, &schemas, &mut samples) {
            // Log error but continue with other samples
            warn!("Error processing {}: {}", sample.display(), e);
        }
    }

    samples.print_summary();
    Ok(())
}

/// Build the decoder configuration from the command line
fn decoder_config(cli: &Cli) -> DecoderConfig {
    let prefix = if cli.varint_lengths {
        LengthPrefix::Varint
    } else {
        LengthPrefix::SingleByte
    };
    DecoderConfig::new()
        .length_prefix(prefix)
        .max_depth(cli.max_depth)
}

/// Load every schema file, each into a fresh registry
///
/// Any malformed schema aborts the run.
fn load_schemas(cli: &Cli) -> Result<Vec<LoadedSchema>> {
    if !cli.schemas.is_dir() {
        bail!("Schema directory does not exist: {}", cli.schemas.display());
    }

    let import_root = cli.import_root.as_deref().unwrap_or(cli.schemas.as_path());
    let loader = SchemaLoader::from_dir(import_root);

    let mut loaded = Vec::new();
    for path in walk_files(&cli.schemas).filter(|p| is_schema_file(p)) {
        let mut registry = SchemaRegistry::new();
        let message = loader
            .load_file(&path, &mut registry)
            .with_context(|| format!("Failed to load schema: {}", path.display()))?;

        debug!(
            "Loaded {} (top message {}, {} messages)",
            path.display(),
            message.name(),
            registry.len()
        );
        loaded.push(LoadedSchema {
            path,
            registry,
            message,
        });
    }

    info!("Loaded {} schema files", loaded.len());
    Ok(loaded)
}

/// List the sample files to decode
fn collect_samples(directory: &Path) -> Result<Vec<PathBuf>> {
    if !directory.is_dir() {
        bail!("Sample directory does not exist: {}", directory.display());
    }
    Ok(walk_files(directory).collect())
}

/// Non-hidden regular files under `root`, in file name order
fn walk_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| !is_hidden(e.path()))
        .map(walkdir::DirEntry::into_path)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

fn is_schema_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some("proto")
}

/// Decode one sample against every schema
fn process_sample(
    cli: &Cli,
    sample: &Path,
    schemas: &[LoadedSchema],
    samples: &mut SampleRegistry,
) -> Result<()> {
    trace!("Reading {}", sample.display());
    let data = fs::read(sample)
        .with_context(|| format!("Failed to read sample: {}", sample.display()))?;

    samples.stats.samples += 1;
    if !cli.keep_duplicates {
        if let Some(original) = samples.register(sample, &data) {
            debug!(
                "Skipping {}: same content as {}",
                sample.display(),
                original.display()
            );
            return Ok(());
        }
    }

    let config = decoder_config(cli);
    let mut matched = false;

    for schema in schemas {
        samples.stats.pairs_tried += 1;
        let decoder = Decoder::with_config(&schema.registry, config.clone());

        let Some(decoded) = decoder.decode_bytes(&schema.message, &data) else {
            continue;
        };

        matched = true;
        samples.stats.matches += 1;
        println!("{} {}", schema.path.display(), sample.display());
        if cli.format == OutputFormat::Values {
            print!("{}", printer::render(&decoded));
        }

        if cli.first_match {
            break;
        }
    }

    if !matched {
        debug!("No schema matches {}", sample.display());
        samples.stats.unmatched += 1;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const POINT: &str = "syntax = \"proto2\";\nmessage Point {\n  required int32 x = 1;\n  required int32 y = 2;\n}\n";

    fn cli(schemas: &Path, binaries: &Path) -> Cli {
        Cli::parse_from([
            "protoprobe",
            "--schemas",
            schemas.to_str().unwrap(),
            "--binaries",
            binaries.to_str().unwrap(),
        ])
    }

    #[test]
    fn test_sample_registry_deduplication() {
        let mut registry = SampleRegistry::new();

        assert!(registry.register(Path::new("a.bin"), b"\x08\x02").is_none());
        assert!(registry.register(Path::new("b.bin"), b"\x08\x03").is_none());
        assert_eq!(
            registry.register(Path::new("c.bin"), b"\x08\x02"),
            Some(Path::new("a.bin"))
        );

        assert_eq!(registry.stats.duplicates_skipped, 1);
    }

    #[test]
    fn test_is_schema_file() {
        assert!(is_schema_file(Path::new("/tmp/point.proto")));
        assert!(!is_schema_file(Path::new("/tmp/point.bin")));
        assert!(!is_schema_file(Path::new("/tmp/proto")));
    }

    #[test]
    fn test_walk_files_skips_hidden_and_sorts() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("b.bin"), b"").unwrap();
        fs::write(dir.path().join("a.bin"), b"").unwrap();
        fs::write(dir.path().join(".hidden"), b"").unwrap();
        fs::create_dir(dir.path().join("nested")).unwrap();
        fs::write(dir.path().join("nested/c.bin"), b"").unwrap();

        let names: Vec<_> = walk_files(dir.path())
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.bin"),
                PathBuf::from("b.bin"),
                PathBuf::from("nested/c.bin")
            ]
        );
    }

    #[test]
    fn test_load_schemas_aborts_on_bad_schema() {
        let schemas = TempDir::new().unwrap();
        let binaries = TempDir::new().unwrap();
        fs::write(schemas.path().join("point.proto"), POINT).unwrap();
        fs::write(
            schemas.path().join("broken.proto"),
            "syntax = \"proto2\";\npackage x;\n",
        )
        .unwrap();

        let err = load_schemas(&cli(schemas.path(), binaries.path())).err().unwrap();
        assert!(format!("{:#}", err).contains("broken.proto"));
    }

    #[test]
    fn test_process_sample_counts_matches() {
        let schemas = TempDir::new().unwrap();
        let binaries = TempDir::new().unwrap();
        fs::write(schemas.path().join("point.proto"), POINT).unwrap();
        fs::write(
            schemas.path().join("label.proto"),
            "syntax = \"proto2\";\nmessage Label {\n  required string text = 1;\n}\n",
        )
        .unwrap();
        fs::write(binaries.path().join("point.bin"), [0x08, 0x02, 0x10, 0x04]).unwrap();
        fs::write(binaries.path().join("copy.bin"), [0x08, 0x02, 0x10, 0x04]).unwrap();
        fs::write(binaries.path().join("label.bin"), [0x0A, 0x02, b'o', b'k']).unwrap();
        fs::write(binaries.path().join("junk.bin"), [0xFF, 0xFF]).unwrap();

        let cli = cli(schemas.path(), binaries.path());
        let loaded = load_schemas(&cli).unwrap();
        assert_eq!(loaded.len(), 2);

        let mut samples = SampleRegistry::new();
        for sample in collect_samples(binaries.path()).unwrap() {
            process_sample(&cli, &sample, &loaded, &mut samples).unwrap();
        }

        assert_eq!(samples.stats.samples, 4);
        assert_eq!(samples.stats.duplicates_skipped, 1);
        assert_eq!(samples.stats.pairs_tried, 6);
        assert_eq!(samples.stats.matches, 2);
        assert_eq!(samples.stats.unmatched, 1);
    }

    /// Two schemas that both accept `08 02 10 04`
    fn overlapping_schemas(dir: &Path) {
        fs::write(dir.join("point.proto"), POINT).unwrap();
        fs::write(
            dir.join("pair.proto"),
            "syntax = \"proto2\";\nmessage Pair {\n  optional int32 a = 1;\n  optional int32 b = 2;\n}\n",
        )
        .unwrap();
    }

    #[test]
    fn test_first_match_stops_after_one_schema() {
        let schemas = TempDir::new().unwrap();
        let binaries = TempDir::new().unwrap();
        overlapping_schemas(schemas.path());
        let sample = binaries.path().join("point.bin");
        fs::write(&sample, [0x08, 0x02, 0x10, 0x04]).unwrap();

        let mut cli = cli(schemas.path(), binaries.path());
        let loaded = load_schemas(&cli).unwrap();

        let mut samples = SampleRegistry::new();
        process_sample(&cli, &sample, &loaded, &mut samples).unwrap();
        assert_eq!(samples.stats.matches, 2);
        assert_eq!(samples.stats.pairs_tried, 2);

        cli.first_match = true;
        let mut samples = SampleRegistry::new();
        process_sample(&cli, &sample, &loaded, &mut samples).unwrap();
        assert_eq!(samples.stats.matches, 1);
        assert_eq!(samples.stats.pairs_tried, 1);
        assert_eq!(samples.stats.unmatched, 0);
    }

    #[test]
    fn test_keep_duplicates_decodes_every_sample() {
        let schemas = TempDir::new().unwrap();
        let binaries = TempDir::new().unwrap();
        fs::write(schemas.path().join("point.proto"), POINT).unwrap();
        fs::write(binaries.path().join("a.bin"), [0x08, 0x02, 0x10, 0x04]).unwrap();
        fs::write(binaries.path().join("b.bin"), [0x08, 0x02, 0x10, 0x04]).unwrap();
        fs::write(binaries.path().join("c.bin"), [0x08, 0x05, 0x10, 0x06]).unwrap();

        let mut cli = cli(schemas.path(), binaries.path());
        cli.keep_duplicates = true;
        let loaded = load_schemas(&cli).unwrap();

        let mut samples = SampleRegistry::new();
        for sample in collect_samples(binaries.path()).unwrap() {
            process_sample(&cli, &sample, &loaded, &mut samples).unwrap();
        }

        assert_eq!(samples.stats.samples, 3);
        assert_eq!(samples.stats.duplicates_skipped, 0);
        assert_eq!(samples.stats.pairs_tried, 3);
        assert_eq!(samples.stats.matches, 3);
    }

    #[test]
    fn test_keep_duplicates_flag_parses() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_str().unwrap();
        let cli = Cli::parse_from([
            "protoprobe",
            "-s",
            path,
            "-b",
            path,
            "--keep-duplicates",
            "--first-match",
        ]);
        assert!(cli.keep_duplicates);
        assert!(cli.first_match);
    }

    #[test]
    fn test_decoder_config_from_flags() {
        let dir = TempDir::new().unwrap();
        let cli = Cli::parse_from([
            "protoprobe",
            "-s",
            dir.path().to_str().unwrap(),
            "-b",
            dir.path().to_str().unwrap(),
            "--varint-lengths",
            "--max-depth",
            "8",
        ]);
        let config = decoder_config(&cli);
        assert_eq!(config.length_prefix, LengthPrefix::Varint);
        assert_eq!(config.max_depth, 8);
    }

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
