use perceptron_network::config::{load_config, TrainingConfig};
use perceptron_network::mnist::load_dataset;
use perceptron_network::network::{Network, TrainingReport};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::process;
use std::time::Instant;

// Perceptron-per-unit network for MNIST, trained with random mini-batches.

/// Loads the config named by the first argument, or returns the defaults when
/// no argument is given. Exits the process if the file cannot be loaded.
fn config_from_args(args: &[String]) -> TrainingConfig {
    match args.get(1) {
        Some(path) => load_config(path).unwrap_or_else(|err| {
            eprintln!("Could not load config {}: {}", path, err);
            process::exit(1);
        }),
        None => TrainingConfig::default(),
    }
}

/// Writes one `epoch,loss,seconds` line per epoch to `path`, creating parent
/// directories as needed.
fn write_loss_log(path: &str, report: &TrainingReport) -> std::io::Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut writer = BufWriter::new(File::create(path)?);
    for stats in &report.epochs {
        writeln!(writer, "{},{},{}", stats.epoch, stats.loss, stats.seconds)?;
    }
    writer.flush()
}

fn main() {
    env_logger::init();
    let program_start = Instant::now();

    let args: Vec<String> = std::env::args().collect();
    let config = config_from_args(&args);

    println!("Loading training data...");
    let load_start = Instant::now();
    let train_images = load_dataset(
        &config.data.train_images,
        &config.data.train_labels,
        config.train_limit,
    )
    .unwrap_or_else(|err| {
        eprintln!("Could not load training data: {}", err);
        process::exit(1);
    });

    println!("Loading test data...");
    let test_images = load_dataset(
        &config.data.test_images,
        &config.data.test_labels,
        config.test_limit,
    )
    .unwrap_or_else(|err| {
        eprintln!("Could not load test data: {}", err);
        process::exit(1);
    });
    let load_time = load_start.elapsed().as_secs_f64();
    println!("Data loading time: {:.2} seconds", load_time);

    println!("Initializing neural network...");
    let mut network = Network::new(&config, &train_images, &test_images).unwrap_or_else(|err| {
        eprintln!("Could not build network: {}", err);
        process::exit(1);
    });
    println!("\n{}\n", network.describe());

    println!("Training neural network...");
    let train_start = Instant::now();
    let report = network.train().unwrap_or_else(|err| {
        eprintln!("Training failed: {}", err);
        process::exit(1);
    });
    let train_time = train_start.elapsed().as_secs_f64();

    if let Some(path) = &config.loss_log {
        if let Err(err) = write_loss_log(path, &report) {
            eprintln!("Failed writing training loss data to {}: {}", path, err);
        }
    }

    println!("Test {}", report.final_evaluation);

    let total_time = program_start.elapsed().as_secs_f64();
    println!("\n=== Performance Summary ===");
    println!("Data loading time: {:.2} seconds", load_time);
    println!("Total training time: {:.2} seconds", train_time);
    println!("Total program time: {:.2} seconds", total_time);
    println!("========================");
}
