use std::env;
use std::sync::Arc;

use carelink_core::config::{Config, EmbeddingSettings};
use carelink_core::types::{Category, Coordinates};
use carelink_embed::get_default_embedder;
use carelink_hybrid::{MemorySink, SearchOptions, SearchOrchestrator, SearchOutcome, SearchStatus};
use carelink_text::{detect_query_pattern, tokenize};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: carelink <search|suggest|pattern> <query> [--category NAME] [--lat LAT --lng LNG] \
[--local KM] [--open-now] [--limit N] [--semantic] [--json] [--stats]";

#[derive(Default)]
struct Flags {
    category: Option<Category>,
    lat: Option<f64>,
    lng: Option<f64>,
    local_km: Option<f64>,
    open_now: bool,
    limit: Option<usize>,
    semantic: bool,
    json: bool,
    stats: bool,
}

fn usage_exit(msg: &str) -> ! {
    eprintln!("{msg}\n{USAGE}");
    std::process::exit(1)
}

fn value<T: std::str::FromStr>(args: &[String], i: &mut usize, flag: &str) -> T {
    *i += 1;
    match args.get(*i).map(|v| v.parse::<T>()) {
        Some(Ok(v)) => v,
        _ => usage_exit(&format!("Error: {flag} requires a value")),
    }
}

fn parse_args() -> (String, String, Flags) {
    let args: Vec<String> = env::args().skip(1).collect();
    let Some(cmd) = args.first().cloned() else { usage_exit("Error: missing command") };
    let mut flags = Flags::default();
    let mut words = Vec::new();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--category" | "-c" => {
                let name: String = value(&args, &mut i, "--category");
                flags.category = Some(name.parse().unwrap_or_else(|e| usage_exit(&format!("Error: {e}"))));
            }
            "--lat" => flags.lat = Some(value(&args, &mut i, "--lat")),
            "--lng" => flags.lng = Some(value(&args, &mut i, "--lng")),
            "--local" => flags.local_km = Some(value(&args, &mut i, "--local")),
            "--limit" | "-n" => flags.limit = Some(value(&args, &mut i, "--limit")),
            "--open-now" => flags.open_now = true,
            "--semantic" | "-s" => flags.semantic = true,
            "--json" => flags.json = true,
            "--stats" => flags.stats = true,
            other if other.starts_with('-') => usage_exit(&format!("Error: unknown flag {other}")),
            other => words.push(other.to_string()),
        }
        i += 1;
    }
    (cmd, words.join(" "), flags)
}

fn options_from(flags: &Flags) -> SearchOptions {
    let mut options = SearchOptions { open_now: flags.open_now, limit: flags.limit, ..SearchOptions::default() };
    if let Some(category) = flags.category {
        options = options.with_category(category);
    }
    match (flags.lat, flags.lng) {
        (Some(lat), Some(lng)) => options = options.with_location(Coordinates::new(lat, lng)),
        (None, None) => {}
        _ => usage_exit("Error: --lat and --lng go together"),
    }
    if let Some(km) = flags.local_km {
        options = options.local_only(km);
    }
    options
}

fn print_outcome(outcome: &SearchOutcome, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(outcome)?);
        return Ok(());
    }
    match outcome.status {
        SearchStatus::CatalogUnavailable => {
            println!("Service catalog is unavailable.");
            return Ok(());
        }
        SearchStatus::NoMatch => {
            println!("No services matched.");
            return Ok(());
        }
        SearchStatus::Ok => {}
    }
    println!("{} result(s), {:?} phase", outcome.results.len(), outcome.phase);
    for (rank, r) in outcome.results.iter().enumerate() {
        let marker = if r.crisis { "!" } else { " " };
        let distance = r.distance_km.map(|d| format!(" {d:.1} km")).unwrap_or_default();
        println!("{marker}{:>3}. {} [{}] score={:.3}{distance}", rank + 1, r.service.name, r.service.category, r.score);
        println!("      {}", r.reason_labels().join(", "));
        if let Some(phone) = &r.service.phone {
            println!("      phone: {phone}");
        }
    }
    Ok(())
}

async fn run(config: Config, cmd: String, query: String, flags: Flags) -> anyhow::Result<()> {
    let sink = Arc::new(MemorySink::default());
    let orch = SearchOrchestrator::from_config(&config, &env::current_dir()?)?.with_analytics(sink.clone());

    match cmd.as_str() {
        "search" => {
            if flags.semantic {
                let settings: EmbeddingSettings = config.get_or_default("embedding")?;
                if let Some(loading) = orch.model().start_loading(move || get_default_embedder(&settings)) {
                    loading.await?;
                }
            }
            let outcome = orch.search_services(&query, &options_from(&flags)).await;
            if let Some(hint) = orch.get_suggestion(&query).await.filter(|_| !flags.json) {
                println!("Did you mean: {hint}?");
            }
            print_outcome(&outcome, flags.json)?;
            if flags.stats {
                for event in sink.events() {
                    println!("{}", serde_json::to_string(&event)?);
                }
            }
        }
        "suggest" => match orch.get_suggestion(&query).await {
            Some(hint) => println!("{hint}"),
            None => println!("(no suggestion)"),
        },
        "pattern" => {
            let tokens: Vec<String> = tokenize(&query).collect();
            println!("{}", detect_query_pattern(&tokens));
        }
        _ => usage_exit(&format!("Unknown command: {cmd}")),
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let config = Config::load().map_err(|e| {
        eprintln!("Error loading config: {e}");
        e
    })?;
    let (cmd, query, flags) = parse_args();
    tokio::runtime::Runtime::new()?.block_on(run(config, cmd, query, flags))
}
