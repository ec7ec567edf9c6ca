use std::process;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::{fmt::{writer::BoxMakeWriter, Layer}, layer::SubscriberExt, EnvFilter, Registry};

use ghostpay_lite::routes::{self, auth::AuthService};
use ghostpay_lite::simulator::{BroadcastNotifier, SimulatorService};
use ghostpay_lite::config::ConfigError;
use ghostpay_lite::AppConfig;

// how many notifications a slow SSE subscriber may fall behind
const NOTIFICATION_BUFFER: usize = 256;

#[tokio::main]
async fn main() {
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Invalid configuration: {err}");
            process::exit(1);
        }
    };

    // add tracing layer
    let file_appender = tracing_appender::rolling::never(".", &config.log_file);
    let (file_writer, _file_guard) = tracing_appender::non_blocking(file_appender);
    let (stdout_writer, _stdout_guard) = tracing_appender::non_blocking(std::io::stdout());

    // json into the log file, plain text on stdout
    let file_layer = Layer::new().json().with_writer(BoxMakeWriter::new(move || file_writer.clone()));
    let stdout_layer = Layer::new().with_writer(BoxMakeWriter::new(move || stdout_writer.clone()));

    let subscriber = Registry::default()
        .with(EnvFilter::from_default_env())
        .with(file_layer)
        .with(stdout_layer);

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Unable to set global subscriber: {err}");
        process::exit(1);
    }

    tracing::info!(
        success_rate = config.simulator.success_rate,
        exclusive_charges = config.simulator.exclusive_charges,
        require_api_key = config.require_api_key,
        "Simulator configured"
    );

    let listener = match TcpListener::bind(("0.0.0.0", config.port)).await {
        Ok(listener) => {
            tracing::info!("Listening on port: {}", config.port);
            listener
        }
        Err(err) => {
            tracing::error!("Failed to bind to port: {}", err);
            process::exit(1);
        }
    };

    let router = match process_begin(&config) {
        Ok(router) => {
            tracing::info!("Routes constructed successfully");
            router
        }
        Err(err) => {
            tracing::error!("Failed to build the simulator: {}", err);
            process::exit(1);
        }
    };

    //start the http service
    let http_service = axum::serve(listener, router);
    if let Err(err) = http_service.await {
        tracing::error!("Failed to start server: {}", err);
        process::exit(1);
    }
}

fn process_begin(config: &AppConfig) -> Result<axum::Router, ConfigError> {
    let notifier = Arc::new(BroadcastNotifier::new(NOTIFICATION_BUFFER));
    let simulator = SimulatorService::new(config.simulator.clone(), notifier.clone())?;
    let service = Arc::new(AuthService::new(config.require_api_key));

    Ok(routes::build_router(simulator, service, notifier))
}
