use std::io::Stderr;
use std::path::{Path, PathBuf};

use clap::Parser;
use logohunt::config::{load_hunter_config, HunterConfig};
use logohunt::http::HttpFetcher;
use logohunt::hunter::normalize_domain;
use logohunt::log::{JsonLineLogger, LogLevel};
use logohunt::output::{parse_resize, process_image};
use logohunt::{Candidate, LogoHunter, OutputFormat};
use serde::Serialize;

const DEFAULT_SHOWN: usize = 10;
const BREAKDOWN_SHOWN: usize = 3;

#[derive(Parser)]
#[command(name = "logohunt")]
#[command(version)]
#[command(about = "Find, rank, and download the logo of a website", long_about = None)]
struct Cli {
    /// Domain or URL, e.g. `example.com` or `https://example.com/about`
    domain: String,

    /// Save the winning logo as `logo.<ext>` in DIR (current directory when omitted)
    #[arg(long, value_name = "DIR", num_args = 0..=1, default_missing_value = ".")]
    save: Option<PathBuf>,

    /// Output format for raster logos: png, jpeg, gif, webp, ico, bmp
    #[arg(long, default_value = "png")]
    format: String,

    /// Resize raster logos to WxH, e.g. 128x128
    #[arg(long, value_name = "WxH")]
    resize: Option<String>,

    /// Stream JSON log lines to stderr
    #[arg(short, long)]
    verbose: bool,

    /// List and explain every candidate instead of the top few
    #[arg(long)]
    all_scores: bool,

    /// JSON config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Rule weight table replacing the bundled one
    #[arg(long, value_name = "PATH")]
    weights: Option<PathBuf>,

    /// Write the full ranking as CSV
    #[arg(long, value_name = "CSV")]
    report: Option<PathBuf>,
}

#[derive(Serialize)]
struct ReportRow<'a> {
    rank: usize,
    score: i64,
    url: &'a str,
    width: u32,
    height: u32,
    format: &'a str,
    alt: &'a str,
    classes: &'a str,
    rules: String,
}

fn main() -> Result<(), String> {
    let cli = Cli::parse();

    let output_format = OutputFormat::parse(&cli.format).map_err(|e| e.to_string())?;
    let resize = cli
        .resize
        .as_deref()
        .map(parse_resize)
        .transpose()
        .map_err(|e| e.to_string())?;
    let domain = normalize_domain(&cli.domain).map_err(|e| e.to_string())?;

    let mut config = match cli.config.as_deref() {
        Some(path) => load_hunter_config(path).map_err(|e| e.to_string())?,
        None => HunterConfig::default(),
    };
    if let Some(weights) = cli.weights.as_deref() {
        config.weights_path = Some(weights.to_string_lossy().to_string());
    }
    let hunter = LogoHunter::from_config(config).map_err(|e| e.to_string())?;

    let min_level = if cli.verbose {
        LogLevel::Debug
    } else {
        LogLevel::Warn
    };
    let mut logger: JsonLineLogger<Stderr> = JsonLineLogger::new(std::io::stderr(), min_level);
    let mut log_line = |level: &str, event: &str, data: serde_json::Value| {
        logger.log_line(level, event, data)
    };

    if cli.verbose {
        print_setup(&hunter);
    }

    println!("Hunting logos for {domain}");
    let candidates = hunter.find_logo_candidates(&domain, &mut log_line);
    if candidates.is_empty() {
        println!("No logo candidates found.");
        return Ok(());
    }

    print_ranking(&candidates, cli.all_scores);
    print_breakdown(&candidates, cli.all_scores);

    if let Some(report) = cli.report.as_deref() {
        write_report(report, &candidates).map_err(|e| e.to_string())?;
        println!("Report: {}", report.to_string_lossy());
    }

    let urls: Vec<String> = candidates.iter().map(|c| c.url.clone()).collect();
    let Some(logo) = hunter.fetch_best_logo(&urls, &mut log_line) else {
        println!("None of the {} candidates could be fetched.", urls.len());
        return Ok(());
    };

    println!();
    println!("Selected: {}", logo.url);
    match logo.image.dimensions() {
        Some((w, h)) => println!("Type:     raster {w}x{h} ({})", logo.content_type),
        None => println!("Type:     svg ({})", logo.content_type),
    }
    println!("Size:     {} bytes", logo.byte_len);
    println!("SHA-256:  {}", logo.sha256);

    if let Some(dir) = cli.save.as_deref() {
        let bytes = process_image(&logo.image, output_format, resize).map_err(|e| e.to_string())?;
        let ext = if logo.image.is_svg() {
            "svg"
        } else {
            output_format.extension()
        };
        std::fs::create_dir_all(dir).map_err(|e| e.to_string())?;
        let path = dir.join(format!("logo.{ext}"));
        std::fs::write(&path, &bytes).map_err(|e| e.to_string())?;
        println!("Saved:    {} ({} bytes)", path.to_string_lossy(), bytes.len());
    }

    Ok(())
}

fn print_setup(hunter: &LogoHunter<HttpFetcher>) {
    let config = hunter.config();
    println!(
        "Config:   dedup={:?} selection={:?} concurrency={} timeout={}s",
        config.dedup_policy,
        config.selection_policy,
        config.effective_concurrency(),
        config.timeout_secs,
    );
    let engine = hunter.engine();
    println!("Rules:    {} loaded", engine.rule_count());
    for (id, label, weight) in engine.rules() {
        println!("      {weight:>+5}  {id}  {label}");
    }
    println!();
}

fn print_ranking(candidates: &[Candidate], all: bool) {
    let shown = if all {
        candidates.len()
    } else {
        candidates.len().min(DEFAULT_SHOWN)
    };
    println!();
    println!("Top {shown} of {} candidates:", candidates.len());
    for (i, c) in candidates.iter().take(shown).enumerate() {
        let size = if c.width > 0 && c.height > 0 {
            format!("{}x{}", c.width, c.height)
        } else {
            "?x?".to_string()
        };
        let format = if c.format.is_empty() { "?" } else { &c.format };
        println!("{:>3}. [{:>5}] {} ({size}, {format})", i + 1, c.score, c.url);
    }
}

fn print_breakdown(candidates: &[Candidate], all: bool) {
    let shown = if all { candidates.len() } else { BREAKDOWN_SHOWN };
    for (i, c) in candidates.iter().take(shown).enumerate() {
        println!();
        println!("#{} {} = {}", i + 1, c.url, c.score);
        if c.rule_details.is_empty() {
            println!("      (no rules applied)");
        }
        for detail in &c.rule_details {
            println!("      {:>+5}  {}", detail.points, detail.label);
        }
    }
}

fn write_report(path: &Path, candidates: &[Candidate]) -> logohunt::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for (i, c) in candidates.iter().enumerate() {
        let rules = c
            .rule_details
            .iter()
            .map(|d| format!("{}={}", d.label, d.points))
            .collect::<Vec<_>>()
            .join("; ");
        writer.serialize(ReportRow {
            rank: i + 1,
            score: c.score,
            url: &c.url,
            width: c.width,
            height: c.height,
            format: &c.format,
            alt: &c.alt_text,
            classes: &c.css_classes,
            rules,
        })?;
    }
    writer.flush()?;
    Ok(())
}
