use std::error::Error;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use perceptag::extractor;
use perceptag::get_version;
use perceptag::perceptron::{Averaging, PerceptronParams};
use perceptag::tagset::Tagset;
use perceptag::trainer::Trainer;

#[derive(Debug, Args)]
#[clap(
    author,
    about = "Extract features from a CoNLL-U corpus",
    version = get_version(),
)]
struct ExtractArgs {
    corpus_file: PathBuf,
    features_file: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum AveragingArg {
    Eager,
    Lazy,
}

impl From<AveragingArg> for Averaging {
    fn from(arg: AveragingArg) -> Self {
        match arg {
            AveragingArg::Eager => Averaging::Eager,
            AveragingArg::Lazy => Averaging::Lazy,
        }
    }
}

#[derive(Debug, Args)]
#[clap(author,
    about = "Train an averaged perceptron tagger",
    version = get_version(),
)]
struct TrainArgs {
    #[arg(short, long, default_value = "1")]
    epochs: usize,

    #[arg(short, long)]
    seed: Option<u64>,

    #[arg(long, value_enum, default_value = "eager")]
    averaging: AveragingArg,

    /// Comma-separated tags. Defaults to the Universal Dependencies tagset.
    #[arg(short, long, value_delimiter = ',')]
    tagset: Option<Vec<String>>,

    /// Read a CoNLL-U corpus instead of a features file.
    #[arg(short, long)]
    corpus: bool,

    input_file: PathBuf,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Extract(ExtractArgs),
    Train(TrainArgs),
}

#[derive(Debug, Parser)]
#[clap(
    name = "perceptag",
    author,
    about = "A part-of-speech tagger training command line interface",
    version = get_version(),
)]
struct CommandArgs {
    #[clap(subcommand)]
    command: Commands,
}

fn extract(args: ExtractArgs) -> Result<(), Box<dyn Error>> {
    let count = extractor::extract(args.corpus_file.as_path(), args.features_file.as_path())?;

    info!("Feature extraction completed successfully: {} examples.", count);
    Ok(())
}

fn train(args: TrainArgs) -> Result<(), Box<dyn Error>> {
    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();

    ctrlc::set_handler(move || {
        if r.load(Ordering::SeqCst) {
            r.store(false, Ordering::SeqCst);
        } else {
            std::process::exit(0);
        }
    })?;

    let tagset = match args.tagset {
        Some(tags) => Tagset::new(tags.iter().map(|t| t.trim()).filter(|t| !t.is_empty()))?,
        None => Tagset::universal(),
    };
    let params = PerceptronParams {
        max_epochs: args.epochs,
        seed: args.seed,
        averaging: args.averaging.into(),
    };

    let mut trainer = Trainer::new(params, tagset);
    if args.corpus {
        trainer.load_corpus(args.input_file.as_path())?;
    } else {
        trainer.load_examples(args.input_file.as_path())?;
    }

    let output = trainer.train(running)?;
    println!("{}", serde_json::to_string_pretty(&output.summary)?);

    info!("Training completed successfully.");
    Ok(())
}

fn run() -> Result<(), Box<dyn Error>> {
    let args = CommandArgs::parse();

    match args.command {
        Commands::Extract(args) => extract(args),
        Commands::Train(args) => train(args),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
