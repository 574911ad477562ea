//! Dedicated server executable.
//!
//! Configuration comes from the environment: `PORT`, `SEED`, `WORKERS`,
//! `CACHE_MAX_BYTES`. Everything else uses the engine defaults.

use anyhow::Context;

use aether_engine::server::{Server, ServerConfig};

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig {
        port: env_parse("PORT", ServerConfig::default().port),
        seed: env_parse("SEED", 0),
        worker_threads: env_parse("WORKERS", 0),
        cache_max_bytes: env_parse("CACHE_MAX_BYTES", 0),
        ..Default::default()
    };

    log::info!("starting server (seed {})", config.seed);
    let server = Server::bind(config).context("failed to start server")?;
    server.run().context("server loop failed")?;
    Ok(())
}
