use std::sync::Arc;

use game_core::{ConundrumCorpus, LetterPool, WordList};
use game_server::{
    auth::{DevAuthorizer, FreshIdentityAuthorizer, PlayerAuthorizer},
    config::Config,
    create_routes,
    history::TracingHistorySink,
    orchestrator::{Collaborators, MatchOrchestrator},
    scheduler::TokioScheduler,
    websocket::ConnectionManager,
};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Starting Nine Letters server...");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    info!("Loading dictionary from: {}", config.words_file);
    let dictionary = match WordList::from_file(&config.words_file) {
        Ok(words) if !words.is_empty() => words,
        Ok(_) => {
            error!("Dictionary '{}' contains no words", config.words_file);
            std::process::exit(1);
        }
        Err(e) => {
            error!("Failed to load dictionary '{}': {:#}", config.words_file, e);
            error!("Set WORDS_FILE to a newline-separated word list.");
            std::process::exit(1);
        }
    };

    info!("Loading conundrums from: {}", config.conundrums_file);
    let corpus = match ConundrumCorpus::from_file(&config.conundrums_file) {
        Ok(corpus) => corpus,
        Err(e) => {
            error!("Failed to load conundrums '{}': {:#}", config.conundrums_file, e);
            error!("Set CONUNDRUMS_FILE to a file of 'SCRAMBLED answer' lines.");
            std::process::exit(1);
        }
    };

    let authorizer: Arc<dyn PlayerAuthorizer> = if config.auth_dev_mode {
        info!("Starting in development authentication mode - any client may resume any player");
        Arc::new(DevAuthorizer)
    } else {
        warn!("Development authentication disabled - player ids cannot be resumed");
        Arc::new(FreshIdentityAuthorizer)
    };

    let rng = match config.rng_seed {
        Some(seed) => {
            info!("Using fixed RNG seed {}", seed);
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let connections = Arc::new(ConnectionManager::new());
    let orchestrator = MatchOrchestrator::new(
        config.phase_timings(),
        Collaborators {
            dictionary: Arc::new(dictionary),
            corpus: Arc::new(corpus),
            letter_pool: LetterPool::new(),
            scheduler: Arc::new(TokioScheduler::new(tokio::runtime::Handle::current())),
            connections,
            history: Arc::new(TracingHistorySink),
            authorizer,
        },
        rng,
    );

    let routes = create_routes(orchestrator.clone());

    // Start cleanup task
    let cleanup_orchestrator = orchestrator.clone();
    let retention_ms = config.match_retention().as_millis() as i64;
    let cleanup_interval = config.cleanup_interval();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(cleanup_interval);
        loop {
            interval.tick().await;
            cleanup_orchestrator.cleanup_finished_matches(retention_ms);
        }
    });

    let ip = match config.host.parse::<std::net::IpAddr>() {
        Ok(ip) => ip,
        Err(e) => {
            error!("Invalid HOST '{}': {}", config.host, e);
            std::process::exit(1);
        }
    };
    info!("Server starting on {}:{}", config.host, config.port);

    let (addr, server) = warp::serve(routes).bind_with_graceful_shutdown((ip, config.port), async {
        shutdown_signal().await;
    });

    info!(
        "Server started successfully on {}. Press Ctrl+C to stop.",
        addr
    );
    server.await;
    info!("Server shutdown complete.");
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let (Ok(mut sigint), Ok(mut sigterm)) = (
            signal::unix::signal(signal::unix::SignalKind::interrupt()),
            signal::unix::signal(signal::unix::SignalKind::terminate()),
        ) else {
            error!("Failed to install signal handlers");
            return std::future::pending().await;
        };

        tokio::select! {
            _ = sigint.recv() => {
                info!("Received SIGINT, shutting down gracefully...");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down gracefully...");
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for ctrl+c: {}", e);
            return std::future::pending().await;
        }
        info!("Received Ctrl+C, shutting down gracefully...");
    }
}
