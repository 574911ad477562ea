//! Headless client executable.
//!
//! Connects, streams the world and runs the simulation with no window or
//! GPU attached; the render path binds through `MeshSink` in the full
//! game. Useful for soaking the server and for protocol debugging.
//!
//! Environment: `SERVER_ADDR` (host:port), `NAME`.

use std::time::Duration;

use anyhow::Context;

use aether_engine::client::{Client, ClientConfig, InputState, NullSink};
use aether_engine::time::FrameClock;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ClientConfig {
        server_addr: std::env::var("SERVER_ADDR")
            .unwrap_or_else(|_| ClientConfig::default().server_addr),
        name: std::env::var("NAME").unwrap_or_else(|_| "headless".to_string()),
        ..Default::default()
    };

    let mut client = Client::connect(config).context("connection failed")?;
    let mut sink = NullSink;
    let mut clock = FrameClock::new();
    let input = InputState::default();

    let mut announced = false;
    loop {
        let dt = clock.tick();
        client
            .tick(dt, &input, &mut sink)
            .context("session ended")?;

        if !announced {
            if client.is_spawned() {
                let spawn = client.position();
                log::info!("spawned at {spawn}");
                announced = true;

                // A few practice targets around the spawn point.
                for i in 0..3 {
                    let angle = i as f32 * std::f32::consts::TAU / 3.0;
                    let pos = spawn + glam::Vec3::new(angle.cos(), 0.0, angle.sin()) * 8.0;
                    let enemy = client.spawn_enemy(pos);
                    log::debug!("spawned practice enemy {enemy:?} at {pos}");
                }
            } else {
                log::debug!(
                    "loading {:.0}% ({} chunks, {} decoding)",
                    client.spawn_progress() * 100.0,
                    client.chunks_loaded(),
                    client.pending_chunks()
                );
            }
        }

        std::thread::sleep(Duration::from_millis(16));
    }
}
