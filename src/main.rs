//! Quick commandline utility to inspect and prepare MRNet cases.
//!
//! Lists the cases of a dataset root, shows where a case's plane files live,
//! and writes the depth-normalized stacks of a case to disk so they can be
//! checked in a viewer.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use mrnetcase::labels::{read_labels, LabeledCases};
use mrnetcase::volume::{write_volume, VolumeFormat};
use mrnetcase::{CaseLoader, LoaderConfig, MrnetLoader, OversizePolicy, Partition, Plane};

// use clap to create commandline interface
#[derive(Parser, Debug)]
#[command(author, about, version, long_about)]
struct Args {
    /// the dataset root holding the train and valid directories
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// a YAML file with loader settings; flags given here take precedence
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// number of slices every stack is padded to
    #[arg(short, long)]
    target_depth: Option<usize>,

    /// check that all three planes of a case are in the same partition
    #[arg(long)]
    strict: bool,

    /// what to do with stacks deeper than the target depth
    #[arg(long, value_enum)]
    oversize: Option<OversizePolicy>,

    /// log progress
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print every case id found under the root.
    List {
        /// only list the cases of this partition (train or valid)
        #[arg(short, long)]
        partition: Option<Partition>,
    },
    /// Print the partition and plane files of a case.
    Resolve { case: String },
    /// Write the normalized stacks and center slices of a case.
    Prepare {
        case: String,

        /// an output path where a NEW directory will be created for the case
        #[arg(short, long, default_value = "./")]
        output: PathBuf,

        #[arg(short, long, value_enum, default_value_t = OutputFormat::Npy)]
        format: OutputFormat,
    },
    /// Check the layout and load every case, reporting the ones that fail.
    Check {
        /// a `case,label` file to compare the found cases against
        #[arg(short, long)]
        labels: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Npy,
    Nii,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Npy => VolumeFormat::Npy.extension(),
            OutputFormat::Nii => VolumeFormat::Nifti.extension(),
        }
    }
}

fn load_config(cli: &Args) -> Result<LoaderConfig> {
    let mut config = match &cli.config {
        Some(path) => LoaderConfig::from_yaml_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => LoaderConfig::default(),
    };
    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(depth) = cli.target_depth {
        config.target_depth = depth;
    }
    if cli.strict {
        config.strict_partitions = true;
    }
    if let Some(policy) = cli.oversize {
        config.oversize = policy;
    }
    Ok(config)
}

fn prepare(loader: &MrnetLoader, case: &str, output: &Path, format: OutputFormat) -> Result<()> {
    let bundle = loader.load_case(case)?;
    let save_dir = output.join(format!("{case}_prepared"));
    fs::create_dir_all(&save_dir)
        .with_context(|| format!("creating {}", save_dir.display()))?;

    let ext = format.extension();
    for plane in Plane::ALL {
        let output_path = save_dir.join(format!("{case}_{plane}.{ext}"));
        println!("Output: {}", output_path.display());
        write_volume(&output_path, bundle.plane(plane))?;
    }
    let center_path = save_dir.join(format!("{case}_center.{ext}"));
    println!("Output: {}", center_path.display());
    write_volume(&center_path, &bundle.center)?;
    Ok(())
}

fn check(loader: &MrnetLoader, labels: Option<&Path>) -> Result<()> {
    loader.locator().validate_layout()?;
    let ids: Vec<String> = loader.locator().list_case_ids()?.into_iter().collect();
    info!(cases = ids.len(), "loading every case");

    let mut failed = 0;
    for (id, result) in ids.iter().zip(loader.load_cases(&ids)) {
        if let Err(e) = result {
            error!(case_id = %id, "{e}");
            failed += 1;
        }
    }
    println!("{} cases, {} failed", ids.len(), failed);

    if let Some(path) = labels {
        let table = read_labels(path)?;
        let cases = LabeledCases::new(&table, &ids.iter().cloned().collect());
        println!(
            "{} labeled, {} without a label in {}",
            cases.labeled().len(),
            cases.unlabeled().len(),
            path.display()
        );
    }
    if failed > 0 {
        bail!("{failed} cases could not be loaded");
    }
    Ok(())
}

fn run(cli: Args) -> Result<()> {
    let config = load_config(&cli)?;
    let loader = MrnetLoader::new(&config)?;
    match cli.command {
        Command::List { partition } => {
            let ids = match partition {
                Some(p) => loader.locator().list_partition(p)?,
                None => loader.locator().list_case_ids()?,
            };
            for id in ids {
                println!("{id}");
            }
        }
        Command::Resolve { case } => {
            let paths = loader.resolve(&case)?;
            println!("partition: {}", paths.partition);
            for (plane, path) in paths.iter() {
                println!("{plane}: {}", path.display());
            }
        }
        Command::Prepare {
            case,
            output,
            format,
        } => prepare(&loader, &case, &output, format)?,
        Command::Check { labels } => check(&loader, labels.as_deref())?,
    }
    Ok(())
}

// main function parses commandline arguments and runs the program
fn main() {
    let cli = Args::parse();

    let level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(format!("mrnetcase={level}"))),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        eprintln!("Error! {:#}", e);
        std::process::exit(-2);
    }
}
