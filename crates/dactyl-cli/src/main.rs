use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use dactyl_core::ImageGeometry;
use dactyl_core::constants::MAX_QUALITY_SCORE;
use dactyl_facade::{CommandError, CommandFacade, FacadeConfig};
use dactyl_hardware::mock::{MockSensor, MockUsbHost};
use dactyl_hardware::{AnySensor, AnyUsbHost, DeviceInfo};
use serde::Serialize;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "dactyl")]
#[command(about = "Fingerprint sensor session tooling")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand, Debug)]
enum CliCommand {
    /// Run initialize, capture, verify and score against a simulated sensor
    Demo(DemoArgs),

    /// List attached fingerprint sensors
    Devices,
}

#[derive(Args, Debug)]
struct DemoArgs {
    /// Acquisition timeout in milliseconds
    #[arg(long, default_value_t = 10_000)]
    timeout_ms: u32,

    /// Minimum accepted quality; 0 disables gating
    #[arg(long, default_value_t = 0)]
    min_quality: u32,

    /// Use smart capture mode
    #[arg(long)]
    auto: bool,

    /// Quality reported by the simulated sensor
    #[arg(
        long,
        default_value_t = 80,
        value_parser = clap::value_parser!(u32).range(0..=i64::from(MAX_QUALITY_SCORE))
    )]
    quality: u32,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

type Facade = CommandFacade<AnySensor, AnyUsbHost>;

/// Geometry of the simulated sensor, matching an FDU05 imager.
const DEMO_GEOMETRY: ImageGeometry = ImageGeometry {
    width: 300,
    height: 400,
};

#[derive(Serialize, Debug)]
struct DemoSummary {
    geometry: ImageGeometry,
    quality: u32,
    template_len: usize,
    preview_len: usize,
    self_match: bool,
    self_score: i32,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum DemoOutput {
    Success(DemoSummary),
    Failure { error: CommandError },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        CliCommand::Demo(args) => run_demo(args).await,
        CliCommand::Devices => list_devices(),
    }
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Synthetic ridge pattern so previews and templates are not blank.
fn ridge_pattern(geometry: ImageGeometry) -> Vec<u8> {
    let (cx, cy) = (geometry.width as f32 / 2.0, geometry.height as f32 / 2.0);
    (0..geometry.height)
        .flat_map(|y| (0..geometry.width).map(move |x| (x, y)))
        .map(|(x, y)| {
            let distance = ((x as f32 - cx).powi(2) + (y as f32 - cy).powi(2)).sqrt();
            if (distance / 6.0) as u32 % 2 == 0 { 0x30 } else { 0xD0 }
        })
        .collect()
}

async fn run_demo(args: DemoArgs) -> Result<()> {
    let config = match &args.config {
        Some(path) => FacadeConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => FacadeConfig::default(),
    };

    let (sensor, handle) = MockSensor::new();
    handle.set_device_info(
        DeviceInfo::new(DEMO_GEOMETRY.width, DEMO_GEOMETRY.height)
            .with_dpi(500)
            .with_firmware_version("demo"),
    );
    handle.set_image(ridge_pattern(DEMO_GEOMETRY));
    handle.set_quality(args.quality);
    let (usb, _usb_handle) = MockUsbHost::with_permission();

    let facade = Facade::new(
        AnySensor::Mock(sensor),
        Some(AnyUsbHost::Mock(usb)),
        config,
    );
    info!(
        timeout_ms = args.timeout_ms,
        min_quality = args.min_quality,
        auto = args.auto,
        "Running demo"
    );

    let outcome = demo_sequence(&facade, &args).await;
    facade.shutdown().await;

    let output = match outcome {
        Ok(summary) => DemoOutput::Success(summary),
        Err(e) => {
            error!("Demo failed: {}", e);
            DemoOutput::Failure { error: e }
        }
    };
    println!("{}", serde_json::to_string_pretty(&output)?);

    if matches!(output, DemoOutput::Failure { .. }) {
        std::process::exit(1);
    }
    Ok(())
}

async fn demo_sequence(
    facade: &Facade,
    args: &DemoArgs,
) -> Result<DemoSummary, CommandError> {
    facade.initialize_device().await?;
    facade.toggle_led(true).await?;

    let captured = facade
        .capture_fingerprint_with_quality(args.timeout_ms, args.min_quality, args.auto)
        .await?;

    let self_match = facade
        .verify_fingerprint(&captured.template, &captured.template)
        .await?;
    let self_score = facade
        .get_matching_score(&captured.template, &captured.template)
        .await?;

    Ok(DemoSummary {
        geometry: facade.geometry().await,
        quality: captured.quality_value(),
        template_len: captured.template.len(),
        preview_len: captured.preview.len(),
        self_match,
        self_score,
    })
}

#[cfg(feature = "hardware-usb")]
fn list_devices() -> Result<()> {
    use dactyl_hardware::{RusbHost, UsbHost};

    let host = RusbHost::default();
    let devices = host
        .list_devices()
        .context("enumerating USB devices")?;

    if devices.is_empty() {
        println!("No fingerprint sensors attached");
    }
    for device in devices {
        let access = if host.has_permission(&device) {
            "accessible"
        } else {
            "no permission"
        };
        println!("{} ({})", device, access);
    }
    Ok(())
}

#[cfg(not(feature = "hardware-usb"))]
fn list_devices() -> Result<()> {
    anyhow::bail!("USB enumeration requires building with --features hardware-usb")
}
