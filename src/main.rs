//! Skeletar - Skeleton to Avatar Joint Conversion Service
//!
//! Main entry point for the CLI application.

use clap::Parser;
use glam::{Quat, Vec3};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use skeletar::{
    config::Config,
    convert::JointConverter,
    error::OutputError,
    output::PoseServer,
    skeleton::topology::IntJoint,
    tracking::FrameReceiver,
    AppState,
};

/// Skeletar - Skeleton to Avatar Joint Conversion Service
#[derive(Parser, Debug)]
#[command(name = "skeletar", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Disable HTTP server
    #[arg(long)]
    no_http: bool,

    /// Disable orientation filtering
    #[arg(long)]
    no_filter: bool,

    /// HTTP server port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Skeleton receiver UDP port (overrides config)
    #[arg(short, long)]
    tracking_port: Option<u16>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    info!("Starting {} v{}", skeletar::NAME, skeletar::VERSION);

    let runtime = tokio::runtime::Runtime::new()?;

    let state = runtime.block_on(async { setup_and_spawn_services(&args).await })?;

    // Wait for Ctrl+C / SIGTERM
    runtime.block_on(async {
        shutdown_signal().await;
        info!("Shutdown signal received");
        state.shutdown();

        // Give tasks a moment to clean up
        tokio::time::sleep(tokio::time::Duration::from_millis(500)).await;
    });

    info!("Skeletar stopped");
    Ok(())
}

/// Setup config, create AppState, and spawn all background services.
async fn setup_and_spawn_services(args: &Args) -> anyhow::Result<Arc<AppState>> {
    // Load configuration
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if args.no_http {
        config.http.enabled = false;
    }
    if args.no_filter {
        config.converter.filtering = false;
    }
    if let Some(port) = args.port {
        config.http.port = port;
    }
    if let Some(port) = args.tracking_port {
        config.tracking.port = port;
    }

    // Validate configuration
    config.validate()?;

    info!("Skeleton receiver port: {}", config.tracking.port);
    info!("Orientation filtering: {}", config.converter.filtering);
    info!("HTTP server: {}", config.http.enabled);

    // Create shared application state
    let state = AppState::new(config.clone());

    // Start the conversion pipeline
    let convert_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(e) = run_conversion(convert_state).await {
            error!("Conversion pipeline error: {}", e);
        }
    });

    // Start HTTP server if enabled
    if config.http.enabled {
        let http_state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = run_http_server(http_state).await {
                error!("HTTP server error: {}", e);
            }
        });
    }

    Ok(state)
}

/// Build a converter from the configuration.
fn build_converter(config: &Config) -> anyhow::Result<JointConverter> {
    let mut converter = JointConverter::standard();

    let [x, y, z] = config.converter.joint_scale;
    converter.set_joint_scale(Vec3::new(x, y, z));

    if config.converter.default_constraints {
        converter.add_default_constraints()?;
    }
    for c in &config.converter.constraints {
        // Validation already resolved every configured name
        let joint = IntJoint::from_name(&c.joint)
            .ok_or_else(|| anyhow::anyhow!("unknown joint: {}", c.joint))?;
        let [ax, ay, az] = c.axis;
        converter.add_constraint(joint, Vec3::new(ax, ay, az), c.half_angle_deg)?;
    }
    for b in &config.converter.bind_pose {
        let joint = IntJoint::from_name(&b.joint)
            .ok_or_else(|| anyhow::anyhow!("unknown joint: {}", b.joint))?;
        converter.set_bind_pose(joint, Quat::from_array(b.rotation));
    }

    info!(
        "Converter ready ({} constraints)",
        converter.constraints().len()
    );
    Ok(converter)
}

/// Receive skeleton frames and run them through the converter.
async fn run_conversion(state: Arc<AppState>) -> anyhow::Result<()> {
    let config = state.config.read().await.clone();
    let filtering = config.converter.filtering;

    let mut converter = build_converter(&config)?;

    let mut receiver = FrameReceiver::new(&config.tracking);
    receiver.start()?;

    let mut shutdown_rx = state.subscribe_shutdown();

    loop {
        tokio::select! {
            result = receiver.process() => {
                match result {
                    Ok(Some(frame)) => {
                        let pose = converter.convert(&frame, filtering).clone();
                        state.publish_pose(pose).await;
                        state.publish_skeleton(converter.corrected_skeleton()).await;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!("Skeleton receive error: {}", e);
                        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Conversion pipeline shutting down");
                break;
            }
        }

        // Small yield to avoid busy-spinning when no data arrives
        tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
    }

    receiver.stop();
    Ok(())
}

async fn run_http_server(state: Arc<AppState>) -> anyhow::Result<()> {
    let http_config = state.config.read().await.http.clone();

    let server = PoseServer::new(state.clone(), &http_config);

    let addr = format!("{}:{}", http_config.host, http_config.port);
    info!("HTTP server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| OutputError::Bind(format!("{}: {}", addr, e)))?;

    let mut shutdown_rx = state.subscribe_shutdown();

    axum::serve(listener, server.router())
        .with_graceful_shutdown(async move {
            let _ = shutdown_rx.recv().await;
        })
        .await
        .map_err(|e| OutputError::Startup(e.to_string()))?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
