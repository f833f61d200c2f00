//! The `dux` command-line front end: `dux scan <path>` walks a directory and
//! prints its largest entries; `dux insights <path>` runs the same walk and
//! ranks temp/cache/build-artifact matches instead.
//!
//! This binary owns no business logic: it resolves config, calls into
//! [`dux::scan`] and [`dux::insight`], and formats the result. Everything
//! worth unit testing lives in the library.

use clap::{Parser, Subcommand};
use dux::config::AppConfig;
use dux::fs::RealFileSystem;
use dux::insight::InsightBundle;
use dux::scan::ScanOptions;
use dux::tree::{top_nodes, NodeKind};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "dux", version = env!("CARGO_PKG_VERSION"), about = "Find out where your disk went")]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Path to a JSON config file (defaults to ~/.config/dux/config.json)
    #[arg(long, global = true)]
    config: Option<String>,

    /// Number of worker threads
    #[arg(short = 'j', long, global = true)]
    workers: Option<u32>,

    /// Maximum directory depth to descend
    #[arg(short = 'd', long, global = true)]
    depth: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a directory tree and print its largest entries
    Scan {
        path: String,
        /// Number of entries to print
        #[arg(short = 'n', long)]
        top: Option<u32>,
    },
    /// Scan a directory tree and print ranked temp/cache/build-artifact insights
    Insights {
        path: String,
        /// Number of insights to print per category
        #[arg(short = 'n', long)]
        top: Option<u32>,
    },
    /// Print the default configuration as JSON and exit
    PrintDefaultConfig,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    if matches!(args.command, Command::PrintDefaultConfig) {
        println!("{}", dux::config::sample_config_json());
        return;
    }

    let fs = Arc::new(RealFileSystem);

    let config = match AppConfig::load(args.config.as_deref(), fs.as_ref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("dux: failed to load config: {err}");
            std::process::exit(1);
        }
    };

    let workers = args.workers.unwrap_or(config.scan_workers).max(1) as usize;
    let options = ScanOptions {
        max_depth: args.depth.or(config.max_depth),
    };

    match args.command {
        Command::Scan { path, top } => run_scan(&path, options, workers, &fs, top.unwrap_or(config.top_count)),
        Command::Insights { path, top } => run_insights(&path, options, workers, fs, &config, top.unwrap_or(config.max_insights_per_category)),
        Command::PrintDefaultConfig => unreachable!("handled above before config resolution"),
    }
}

fn run_scan(path: &str, options: ScanOptions, workers: usize, fs: &Arc<RealFileSystem>, top: u32) {
    let fs_dyn: Arc<dyn dux::fs::FileSystem> = fs.clone();
    let snapshot = match scan_with_progress(path, options, workers, fs_dyn) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            eprintln!("dux: {err}");
            std::process::exit(1);
        }
    };

    println!(
        "{} files, {} directories, {} access errors",
        snapshot.stats.files, snapshot.stats.directories, snapshot.stats.access_errors
    );
    println!("total: {}", format_bytes(snapshot.root.disk_usage));
    println!();
    println!("largest entries:");
    for node in top_nodes(&snapshot.root, top as usize, None) {
        let marker = if node.kind == NodeKind::Directory { "/" } else { "" };
        println!("  {:>10}  {}{}", format_bytes(node.disk_usage), node.path, marker);
    }
}

fn run_insights(path: &str, options: ScanOptions, workers: usize, fs: Arc<RealFileSystem>, config: &AppConfig, top: u32) {
    let fs_dyn: Arc<dyn dux::fs::FileSystem> = fs;
    let snapshot = match scan_with_progress(path, options, workers, fs_dyn) {
        Ok(snapshot) => snapshot,
        Err(err) => {
            eprintln!("dux: {err}");
            std::process::exit(1);
        }
    };

    let mut insight_config = config.clone();
    insight_config.max_insights_per_category = top;
    let bundle = dux::insight::generate_insights(&snapshot.root, &insight_config);
    print_insights(&bundle);
}

fn scan_with_progress(path: &str, options: ScanOptions, workers: usize, fs: Arc<dyn dux::fs::FileSystem>) -> dux::scan::ScanResult {
    let scanned = AtomicU64::new(0);
    let progress = |_current_path: &str, files: u64, dirs: u64| {
        let total = files + dirs;
        if total.saturating_sub(scanned.swap(total, Ordering::Relaxed)) > 0 {
            eprint!("\rscanning... {files} files, {dirs} dirs");
            let _ = io::stderr().flush();
        }
    };
    let result = dux::scan::scan(path, options, workers, fs, Some(&progress), None);
    eprintln!();
    result
}

fn print_insights(bundle: &InsightBundle) {
    use dux::config::InsightCategory;
    for category in InsightCategory::all() {
        let stats = &bundle.by_category[&category];
        if stats.count == 0 {
            continue;
        }
        println!("{} ({} matches, {} total)", category.label(), stats.count, format_bytes(stats.disk_usage));
        for insight in bundle.insights.iter().filter(|i| i.category == category) {
            println!("  {:>10}  {}  [{}]", format_bytes(insight.disk_usage), insight.path, insight.summary);
        }
        println!();
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes}B")
    } else {
        format!("{value:.1}{}", UNITS[unit])
    }
}
