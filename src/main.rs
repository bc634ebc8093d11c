use anyhow::Result;
use tokio::{net::TcpListener, signal, sync::mpsc};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pump_telemetry_service::{
    api::{self, AppState},
    bus::{self, Dispatcher, LiveFeed},
    config::Config,
    db,
    motor::MotorTracker,
    predictions::PredictionClient,
    sensors::TelemetryStore,
};

/// Capacity of the queue between the MQTT event loop and the dispatcher.
const INBOUND_QUEUE: usize = 256;

#[tokio::main]
async fn main() -> Result<()> {
    // Env vars may be set externally
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let store = match &config.database_url {
        Some(url) => {
            let pool = db::create_pool(url).await?;
            db::run_migrations(&pool).await?;
            TelemetryStore::Postgres(pool)
        }
        None => {
            warn!("DATABASE_URL not set; readings are kept in memory and lost on restart");
            TelemetryStore::memory()
        }
    };
    info!(backend = store.backend_name(), "Telemetry store ready");

    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let motor = MotorTracker::new(command_tx);
    let live = LiveFeed::new(config.live_buffer);

    // Bus: MQTT event loop -> dispatcher -> live feed / store / motor tracker
    {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_QUEUE);
        let dispatcher = Dispatcher::new(
            store.clone(),
            motor.clone(),
            live.clone(),
            config.persist_sensor_messages,
        );
        tokio::spawn(dispatcher.run(inbound_rx));
        bus::mqtt::spawn(&config, inbound_tx, command_rx);
    }

    let predictions = PredictionClient::new(&config)?;

    let state = AppState {
        store,
        motor,
        predictions,
        live,
    };

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP server listening");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
