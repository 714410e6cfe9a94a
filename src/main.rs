use anyhow::Result;
use clap::Parser;
use futures::stream::{FuturesUnordered, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rapidharvest::cli::{Args, Command, ExportAction};
use rapidharvest::config;
use rapidharvest::output::OutputManager;
use rapidharvest::types::{HarvestReport, HarvestStats, OutputFormat};
use rapidharvest::utils;
use rapidharvest::{Config, ExportJobClient, FindingStore, HarvestEngine, HarvestOptions, QueryMode, RapidDnsClient, Session};
use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const BANNER: &str = r#"
                    _     _ _                           _
 _ __ __ _ _ __ (_) __| | |__   __ _ _ ____   _____  ___| |_
| '__/ _` | '_ \| |/ _` | '_ \ / _` | '__\ \ / / _ \/ __| __|
| | | (_| | |_) | | (_| | | | | (_| | |   \ V /  __/\__ \ |_
|_|  \__,_| .__/|_|\__,_|_| |_|\__,_|_|    \_/ \___||___/\__|
          |_|
        RapidDNS subdomain and IP harvester
"#;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let args = Args::parse();

    let level = if args.silent {
        log::LevelFilter::Warn
    } else if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env().filter_level(level).init();

    if !args.silent {
        eprintln!("{}", BANNER);
    }

    let mut config = config::load_config(args.config_path.as_deref())?;
    apply_args(&mut config, &args);

    let session = Session::new(&config)?;
    let client = Arc::new(RapidDnsClient::new(session, &config.base_url).with_api_keys(config.api_keys.clone()));
    let output = OutputManager::new(config.output.clone());

    match &args.command {
        Command::Search { keyword, list, search_type, max } => {
            let keywords = collect_keywords(keyword, list);
            if keywords.is_empty() {
                error!("No input provided. Give a keyword, -l <file>, or pipe keywords to stdin");
                process::exit(1);
            }
            let max = max.unwrap_or(config.harvest.max_records);
            harvest_all(&client, &config, &output, &args, keywords, search_type.as_deref(), max, QueryMode::Search).await?;
        }
        Command::Query { query, max } => {
            let max = max.unwrap_or(config.harvest.max_records);
            harvest_all(&client, &config, &output, &args, vec![query.clone()], None, max, QueryMode::Advanced).await?;
        }
        Command::Export { action } => {
            let exports = ExportJobClient::new(client.as_ref());
            match action {
                ExportAction::Submit { query_type, input } => {
                    let id = exports.submit(query_type, input).await?;
                    println!("{}", id);
                    if !args.silent {
                        info!("Check progress with: rapidharvest export status {}", id);
                    }
                }
                ExportAction::Status { id } => {
                    let job = exports.poll(id).await?;
                    output.write_export_job(&job)?;
                }
            }
        }
    }

    Ok(())
}

fn apply_args(config: &mut Config, args: &Args) {
    if let Some(file) = args.output_file.clone() {
        config.output.file = Some(file);
    }
    if let Some(file) = args.subdomains_file.clone() {
        config.output.subdomains_file = Some(file);
    }
    if let Some(file) = args.ips_file.clone() {
        config.output.ips_file = Some(file);
    }
    if args.json {
        config.output.format = OutputFormat::Json;
    }
    if args.csv {
        config.output.format = OutputFormat::Csv;
    }
    if args.verbose {
        config.output.verbose = true;
    }
    if args.no_subdomains {
        config.harvest.extract_subdomains = false;
    }
    if args.no_ips {
        config.harvest.extract_ips = false;
    }
    if args.url_proxy {
        config.use_url_proxy = true;
    }
}

fn collect_keywords(keywords: &[String], list: &Option<PathBuf>) -> Vec<String> {
    let mut collected = keywords.to_vec();

    if let Some(file_path) = list {
        match utils::read_lines(file_path) {
            Ok(lines) => collected.extend(lines),
            Err(e) => error!("Failed to read keywords from file {:?}: {}", file_path, e),
        }
    }

    if Args::use_stdin(keywords, list) {
        let stdin = io::stdin();
        collected.extend(stdin.lock().lines().map_while(|line| line.ok()));
    }

    utils::clean_inputs(collected)
}

#[allow(clippy::too_many_arguments)]
async fn harvest_all(
    client: &Arc<RapidDnsClient<Session>>,
    config: &Config,
    output: &OutputManager,
    args: &Args,
    queries: Vec<String>,
    type_filter: Option<&str>,
    max_records: usize,
    mode: QueryMode,
) -> Result<()> {
    let cancelled = Arc::new(AtomicBool::new(false));
    {
        let cancelled = cancelled.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, finishing current pages");
                cancelled.store(true, Ordering::SeqCst);
            }
        });
    }

    let spinner = if args.silent {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
        spinner.enable_steady_tick(Duration::from_millis(120));
        spinner
    };
    spinner.set_message(format!("Harvesting {} {} quer{}", queries.len(), mode, if queries.len() == 1 { "y" } else { "ies" }));

    let multiple = queries.len() > 1;
    let options = HarvestOptions::from(&config.harvest);
    let mut futures = FuturesUnordered::new();

    for query in queries {
        let engine = HarvestEngine::new(client.clone(), options.clone()).with_cancel_flag(cancelled.clone());
        futures.push(async move {
            let started = Instant::now();
            let mut store = FindingStore::new();
            let result = engine.run(&query, type_filter, max_records, mode, &mut store).await;
            (query, store, result, started.elapsed())
        });
    }

    let mut failures = 0;
    while let Some((query, store, result, duration)) = futures.next().await {
        let (stop_reason, pages_fetched) = match result {
            Ok(outcome) => (outcome.stop_reason.to_string(), outcome.pages_fetched),
            Err(e) => {
                failures += 1;
                spinner.suspend(|| error!("{}: harvest failed: {}", query, e));
                if store.record_count() == 0 {
                    continue;
                }
                warn!("{}: keeping {} records collected before the failure", query, store.record_count());
                (format!("error: {}", e), 0)
            }
        };

        let report = build_report(&query, mode, &store, stop_reason, pages_fetched, duration);
        spinner.suspend(|| output.write_report(&report, multiple))?;
        info!(
            "{}: {} records, {} subdomains, {} IPs ({})",
            query, report.stats.total_records, report.stats.unique_subdomains, report.stats.unique_ips, report.stats.stop_reason
        );
    }
    spinner.finish_and_clear();

    if failures > 0 && !multiple {
        process::exit(1);
    }
    Ok(())
}

fn build_report(
    query: &str,
    mode: QueryMode,
    store: &FindingStore,
    stop_reason: String,
    pages_fetched: u32,
    duration: Duration,
) -> HarvestReport {
    HarvestReport {
        query: query.to_string(),
        mode,
        records: store.records().to_vec(),
        subdomains: store.snapshot_subdomains(),
        ips: store.snapshot_ips(),
        subnet_stats: store.snapshot_stats(),
        stats: HarvestStats {
            total_records: store.record_count(),
            unique_subdomains: store.subdomain_count(),
            unique_ips: store.ip_count(),
            pages_fetched,
            stop_reason,
            duration,
        },
        timestamp: chrono::Utc::now().to_rfc3339(),
    }
}
