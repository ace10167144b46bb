//! picam_status - Raspberry Pi camera status binary
//!
//! Serves the status dashboard, or prints one composed status and exits.

use anyhow::{bail, Context};
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use picam_status::{
    camera::{DEFAULT_CONFIG_PATH, DEFAULT_PATH_NAME},
    compose,
    metrics::{
        collector::DEFAULT_REQUEST_DEADLINE,
        compute::DEFAULT_CPU_SAMPLE,
        network::DEFAULT_NET_SAMPLE,
        service::{DEFAULT_API_URL, DEFAULT_SERVICE_UNIT},
    },
    start_web_server, ServiceConfig, StatusView, DEFAULT_WEB_PORT,
};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{filter::LevelFilter, EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "picam_status")]
#[command(about = "Raspberry Pi camera and MediaMTX status service")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Shows device, streaming and network status and edits the camera settings in the MediaMTX configuration")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// MediaMTX API base URL
    #[arg(long, env = "MEDIAMTX_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// MediaMTX path entry holding the camera
    #[arg(long, env = "MEDIAMTX_PATH_NAME", default_value = DEFAULT_PATH_NAME)]
    path_name: String,

    /// MediaMTX configuration document
    #[arg(long, env = "MEDIAMTX_CONFIG_PATH", default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    /// systemd unit of the streaming service
    #[arg(long, default_value = DEFAULT_SERVICE_UNIT)]
    service_unit: String,

    /// Deadline for all probes of one request, in milliseconds
    #[arg(long, default_value_t = DEFAULT_REQUEST_DEADLINE.as_millis() as u64)]
    deadline_ms: u64,

    /// CPU sampling interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_CPU_SAMPLE.as_millis() as u64)]
    cpu_sample_ms: u64,

    /// Network sampling interval in milliseconds
    #[arg(long, default_value_t = DEFAULT_NET_SAMPLE.as_millis() as u64)]
    net_sample_ms: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the web server (default)
    Serve(ServeArgs),

    /// Collect the status once and print it
    Status(StatusArgs),

    /// Show device information
    Info,
}

#[derive(Args, Default)]
struct ServeArgs {
    /// Enable CORS headers
    #[arg(long)]
    cors: bool,
}

#[derive(Args)]
struct StatusArgs {
    /// Output format: json or pretty
    #[arg(short, long, default_value = "pretty")]
    format: String,
}

impl Cli {
    fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(&self.host, self.port)
            .with_api_url(&self.api_url)
            .with_path_name(&self.path_name)
            .with_service_unit(&self.service_unit)
            .with_config_path(&self.config_path)
            .with_request_deadline_ms(self.deadline_ms)
            .with_sample_intervals_ms(self.cpu_sample_ms, self.net_sample_ms)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_logging(&cli)?;

    match &cli.command {
        Some(Commands::Serve(args)) => serve_command(&cli, args).await,
        Some(Commands::Status(args)) => status_command(&cli, args).await,
        Some(Commands::Info) => info_command(&cli).await,
        None => serve_command(&cli, &ServeArgs::default()).await,
    }
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// The flag level is the default; `RUST_LOG` directives refine it.
fn log_subscriber(cli: &Cli) -> impl tracing::Subscriber + Send + Sync {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::from(log_level(cli)).into())
        .from_env_lossy();

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .finish()
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(log_subscriber(cli)).context("install log subscriber")?;

    Ok(())
}

async fn serve_command(cli: &Cli, args: &ServeArgs) -> anyhow::Result<()> {
    let config = cli.service_config().with_cors(args.cors);

    info!("Service configuration:");
    info!("  - Bind address: {}", config.bind_address());
    info!("  - CORS enabled: {}", config.enable_cors);
    info!("  - MediaMTX API: {}", config.api_url);
    info!("  - Request deadline: {}ms", config.request_deadline_ms);

    start_web_server(config).await?;
    Ok(())
}

async fn collect_view(config: &ServiceConfig) -> anyhow::Result<StatusView> {
    config.validate()?;
    let collector = config.build_collector()?;
    let store = config.camera_store();

    let report = collector.collect().await;
    let camera = tokio::task::spawn_blocking(move || store.read_state())
        .await
        .context("read camera configuration")?;
    Ok(compose(&report, &camera, None, Local::now()))
}

async fn status_command(cli: &Cli, args: &StatusArgs) -> anyhow::Result<()> {
    let view = collect_view(&cli.service_config()).await?;

    match args.format.as_str() {
        "json" => println!("{}", serde_json::to_string_pretty(&view)?),
        "pretty" => print_pretty_status(&view),
        other => bail!("Unsupported format: {}. Use 'json' or 'pretty'", other),
    }

    Ok(())
}

async fn info_command(cli: &Cli) -> anyhow::Result<()> {
    let view = collect_view(&cli.service_config()).await?;
    let device = &view.device;

    println!("Device Information");
    println!("==================");
    println!("  Hostname: {}", device.hostname);
    println!("  Model: {}", device.model);
    println!("  Camera: {}", device.camera);
    println!("  OS: {}", device.os_label);
    println!("  OS name: {}", device.os_name);
    println!("  OS version: {}", device.os_version);

    Ok(())
}

fn print_pretty_status(view: &StatusView) {
    println!("Camera Status ({})", view.generated_at);
    println!("==========================================");
    println!();

    println!("System:");
    println!("  Host: {} ({})", view.device.hostname, view.device.model);
    println!("  OS: {}", view.device.os_label);
    println!("  Camera: {}", view.device.camera);
    println!("  CPU: {}", view.metrics.cpu_usage);
    println!("  Temperature: {}", view.metrics.temperature);
    println!("  Voltage: {}", view.metrics.voltage);
    println!("  Throttled: {}", view.metrics.throttled.label);
    println!();

    println!("Streaming:");
    println!("  Service: {}", view.service.service.label);
    println!("  API: {}", view.service.api.label);
    println!("  Path {}: ready {}", view.service.path_name, view.service.path_ready.label);
    println!("  Source: {}", view.service.source_type);
    println!("  Readers: {}, tracks: {}", view.service.readers, view.service.tracks);
    println!();

    println!("Network:");
    println!("  Interface: {} ({})", view.network.interface, view.network.ipv4);
    println!("  RX: {}, TX: {}", view.network.rx_rate, view.network.tx_rate);
    if view.network.is_wireless {
        println!("  SSID: {}", view.network.ssid);
        println!("  Link quality: {}", view.network.link_quality);
        println!("  Bitrate: {}", view.network.wifi_rate);
    }
    println!();

    let camera = &view.camera;
    println!("Camera settings (updated {}):", camera.last_updated);
    println!("  Flip: vertical {}, horizontal {}", camera.vflip, camera.hflip);
    println!("  Resolution: {}", camera.resolution);
    println!("  AWB: {}", camera.awb);
    println!("  Mode: {}", camera.mode);
    println!("  Autofocus: {}", camera.af_mode);
    println!("  Lens position: {}", camera.lens_position);

    if !view.warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in &view.warnings {
            println!("  - {}", warning);
        }
    }
}
