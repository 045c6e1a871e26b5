//! Process entry point: loads configuration from the environment, boots a
//! single [`embervale_core::tick::World`], and serves its WebSocket
//! endpoint over axum.
//!
//! One process runs exactly one world. Running several worlds side by
//! side (as `WORLD_NAME` suggests is possible) means running several
//! instances of this binary against the same database, each bound to its
//! own port.

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use embervale_core::config::WorldConfig;
use embervale_core::tick::World;
use embervale_net::dispatch::{EgressRegistry, ServerState};
use embervale_net::{relay_tick, websocket_handler};
use sqlx::postgres::PgPoolOptions;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();

    let config = Arc::new(load_config()?);
    tracing::info!(world = %config.world_name, max_players = config.max_players, "starting world");

    let database_url = env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = PgPoolOptions::new().max_connections(10).connect(&database_url).await?;

    let content_dir = env::var("CONTENT_DIR").map(PathBuf::from).unwrap_or_else(|_| PathBuf::from("content"));
    let (items, npc_types, drop_tables) = embervale_content::load_registries(&content_dir)?;
    let rng_seed = env::var("WORLD_RNG_SEED").ok().and_then(|s| s.parse().ok()).unwrap_or_else(rand::random);

    let (world, control_tx) = World::new(config.clone(), Arc::new(npc_types), Arc::new(items), Arc::new(drop_tables), rng_seed);

    let egress = EgressRegistry::new();
    let state = Arc::new(ServerState {
        control_tx,
        config: config.clone(),
        accounts: embervale_db::AccountStore::new(pool.clone()),
        characters: embervale_db::CharacterStore::new(pool),
        egress: egress.clone(),
    });

    let cancel_token = CancellationToken::new();
    let tick_task = {
        let cancel_token = cancel_token.clone();
        let tick_egress = egress.clone();
        tokio::spawn(async move {
            world
                .run(cancel_token, move |report| {
                    relay_tick(&tick_egress, &report);
                })
                .await;
        })
    };

    let app = Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(websocket_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let port: u16 = env::var("PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(8080);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    tracing::info!(%port, "listening");

    let serve_cancel = cancel_token.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
            serve_cancel.cancel();
        })
        .await?;

    tick_task.await?;
    Ok(())
}

async fn healthz() -> &'static str {
    "ok"
}

fn load_config() -> anyhow::Result<WorldConfig> {
    let terrain_dir = env::var("TERRAIN_DIR").unwrap_or_else(|_| "terrain".to_string());
    let mut config = WorldConfig::with_terrain_dir(terrain_dir);

    if let Ok(name) = env::var("WORLD_NAME") {
        config.world_name = name;
    }
    if let Ok(secret) = env::var("JWT_SECRET") {
        config.jwt_secret = Some(secret);
    }
    if let Ok(max_players) = env::var("MAX_PLAYERS") {
        config.max_players = max_players.parse()?;
    }
    if let Ok(radius) = env::var("DEFAULT_VISIBILITY_RADIUS") {
        config.default_visibility_radius = radius.parse()?;
    }
    if let Ok(seconds) = env::var("RECONNECT_WINDOW_SECONDS") {
        config.reconnect_window_seconds = seconds.parse()?;
    }
    if let Ok(operators) = env::var("OPERATOR_ACCOUNT_IDS") {
        config.operator_account_ids = operators.split(',').filter_map(|s| s.trim().parse().ok()).collect();
    }

    Ok(config)
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
