use colored::Colorize;

use eyeblink::local::process_file::{process_dataset, process_file, simulate};
use eyeblink::{load_config, save_config, Config, Result, SessionReport};

fn print_report(name: &str, report: &SessionReport) {
    let metrics = &report.metrics;
    let title = format!("Detection Performance Metrics: {}", name);
    println!("\n{}", title.as_str().bold());
    println!("  {:<10} {:>8.2}", "Accuracy", metrics.accuracy);
    println!("  {:<10} {:>8.2}", "Precision", metrics.precision);
    println!("  {:<10} {:>8.2}", "Recall", metrics.recall);
    let f1 = format!("{:>8.2}", metrics.f1_score);
    let f1 = if metrics.f1_score >= 80.0 {
        f1.as_str().green()
    } else if metrics.f1_score >= 50.0 {
        f1.as_str().yellow()
    } else {
        f1.as_str().red()
    };
    println!("  {:<10} {}", "F1 Score", f1);
    println!(
        "  {:<10} TP={} FN={} FP={}",
        "Confusion",
        metrics.confusion.true_positives,
        metrics.confusion.false_negatives,
        metrics.confusion.false_positives
    );
    println!(
        "  Total detected blinks: {} ({} samples, {} skipped, delta {:.1})",
        report.events.len(),
        report.samples_processed,
        report.samples_skipped,
        report.final_prominence
    );
}

fn config_arg(args: &[String], index: usize) -> Result<Config> {
    match args.get(index) {
        Some(path) => load_config(path),
        None => Ok(Config::default()),
    }
}

fn run(args: &[String]) -> Result<()> {
    match args[1].as_str() {
        "file" if args.len() > 2 => {
            let config = config_arg(args, 3)?;
            let report = process_file(&args[2], &config)?;
            print_report(&args[2], &report);
        }
        "dataset" if args.len() > 2 => {
            let config = config_arg(args, 3)?;
            for file in process_dataset(&args[2], &config)? {
                print_report(&file.path.display().to_string(), &file.report);
            }
        }
        "simulate" => {
            let seed = match args.get(2) {
                Some(seed) => seed.parse::<u64>().map_err(|e| {
                    eyeblink::BlinkError::InvalidConfig(format!("bad seed {:?}: {}", seed, e))
                })?,
                None => 0,
            };
            let report = simulate(seed, &Config::default())?;
            print_report(&format!("synthetic (seed {})", seed), &report);
        }
        "config" if args.len() > 2 => {
            save_config(&Config::default(), &args[2])?;
            println!("Wrote default configuration to {}", args[2]);
        }
        _ => println!(
            "Invalid argument, please use 'file <data.csv> [config.yaml]', \
             'dataset <folder> [config.yaml]', 'simulate [seed]' or 'config <out.yaml>'"
        ),
    }
    Ok(())
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 {
        if let Err(e) = run(&args) {
            eprintln!("{} {}", "Error:".red().bold(), e);
            eprintln!("Please check that the dataset path and structure are correct.");
            std::process::exit(1);
        }
    } else {
        println!("Please specify 'file', 'dataset', 'simulate' or 'config' as argument");
    }
}
