use std::env;

use carelink_core::config::{Config, EmbeddingSettings};
use carelink_embed::get_default_embedder;
use carelink_hybrid::SearchOrchestrator;
use carelink_vector::warm_services;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

async fn run(config: Config, clear: bool, use_fake: bool, batch_size: Option<usize>) -> anyhow::Result<()> {
    let orch = SearchOrchestrator::from_config(&config, &env::current_dir()?)?;
    let cache = orch.cache().clone();
    if !cache.is_enabled() {
        anyhow::bail!("vector cache is unavailable; check data.vector_cache_path");
    }
    if clear {
        let before = cache.len().await;
        cache.clear().await;
        println!("Cleared {before} cached vectors");
        return Ok(());
    }

    let mut settings: EmbeddingSettings = config.get_or_default("embedding")?;
    settings.use_fake |= use_fake;
    let batch_size = batch_size.unwrap_or(settings.warm_batch_size);
    let services = orch.services().await?;
    println!("CareLink vector warm-up\n=======================");
    println!("Services in catalog: {}", services.len());

    let embedder = tokio::task::spawn_blocking(move || get_default_embedder(&settings)).await??;
    println!("Embedding model: {} ({} dims)", embedder.id(), embedder.dim());

    let pb = ProgressBar::new(services.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} services ({percent}%)")?
            .progress_chars("#>-"),
    );
    let report = warm_services(&cache, embedder, &services, batch_size, |done| pb.set_position(done as u64)).await?;
    pb.finish_and_clear();

    println!("Embedded: {}  unchanged: {}  failed: {}", report.embedded, report.skipped, report.failed);
    println!("Cached vectors: {}", cache.len().await);
    if report.failed > 0 {
        tracing::warn!(failed = report.failed, "some services could not be embedded; search falls back to keywords for them");
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
    let args: Vec<String> = env::args().skip(1).collect();
    let (mut clear, mut use_fake, mut batch_size) = (false, false, None);
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--clear" => clear = true,
            "--fake" => use_fake = true,
            "--batch" | "-b" => match args.get(i + 1).and_then(|v| v.parse::<usize>().ok()) {
                Some(n) => {
                    batch_size = Some(n);
                    i += 1;
                }
                None => {
                    eprintln!("Error: --batch requires a number");
                    std::process::exit(1);
                }
            },
            other => {
                eprintln!("Unknown argument: {other}\nUsage: carelink-warm [--clear] [--fake] [--batch N]");
                std::process::exit(1);
            }
        }
        i += 1;
    }
    tokio::runtime::Runtime::new()?.block_on(run(config, clear, use_fake, batch_size))
}
