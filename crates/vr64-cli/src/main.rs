#![forbid(unsafe_code)]

use std::path::{Path, PathBuf};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{ArgGroup, Parser};
use tracing_subscriber::EnvFilter;
use vr64_machine::{EngineState, Machine, MachineConfig, Runtime};

const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Parser)]
#[command(
    name = "vr64",
    about = "Headless runner for the vr64 machine",
    group(ArgGroup::new("program").required(true).args(["image", "disk"])),
    group(ArgGroup::new("stop").required(true).args(["iterations", "max_ms"]))
)]
pub struct Args {
    /// Cartridge image (.z64, .v64 or .n64 byte order, detected from the header).
    #[arg(long)]
    image: Option<PathBuf>,

    /// Expansion disk image, loaded raw.
    #[arg(long)]
    disk: Option<PathBuf>,

    /// Run exactly N outer iterations on the calling thread (fewer if the program ends).
    #[arg(long)]
    iterations: Option<u64>,

    /// Run on the worker thread for at most N milliseconds of host time.
    #[arg(long)]
    max_ms: Option<u64>,

    /// JSON machine config. `VR64_*` environment variables and flags override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Throttle multiplier for the worker thread (0.5..=20.0).
    #[arg(long)]
    speed: Option<f64>,

    /// Seed for boot register seeding and cheat rolls.
    #[arg(long)]
    seed: Option<u64>,

    /// Hexadecimal cheat code. May be repeated.
    #[arg(long = "cheat", value_name = "HEX")]
    cheats: Vec<String>,

    /// Present blank frames as-is instead of the coordinate test pattern.
    #[arg(long)]
    no_test_pattern: bool,

    /// Accept netplay input on the configured port.
    #[arg(long, conflicts_with = "netplay_host")]
    netplay_listen: bool,

    /// Send and receive netplay input with HOST on the configured port.
    #[arg(long, value_name = "HOST")]
    netplay_host: Option<String>,

    /// Netplay UDP port.
    #[arg(long)]
    netplay_port: Option<u16>,

    /// Restore a snapshot file after loading the program.
    #[arg(long)]
    snapshot_load: Option<PathBuf>,

    /// Write a snapshot file on exit.
    #[arg(long)]
    snapshot_save: Option<PathBuf>,

    /// Dump the final frame to a PNG file on exit.
    #[arg(long)]
    png: Option<PathBuf>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let mut runtime = Runtime::new(config).context("failed to create machine")?;

    runtime.with_machine(|machine| prepare(machine, &args))?;
    if args.netplay_listen {
        runtime
            .enable_netplay(None)
            .context("failed to open netplay socket")?;
    } else if let Some(host) = &args.netplay_host {
        runtime
            .enable_netplay(Some(host.as_str()))
            .with_context(|| format!("failed to connect netplay to {host}"))?;
    }

    if let Some(iterations) = args.iterations {
        runtime.with_machine(|machine| run_iterations(machine, iterations))?;
    } else {
        let max_ms = args
            .max_ms
            .context("one of --iterations/--max-ms is required")?;
        run_for(&mut runtime, Duration::from_millis(max_ms))?;
    }

    runtime.with_machine(|machine| finish(machine, &args))
}

fn build_config(args: &Args) -> Result<MachineConfig> {
    let base = match &args.config {
        Some(path) => MachineConfig::from_json_file(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?,
        None => MachineConfig::default(),
    };
    let mut config = base
        .with_env_overrides(|key| std::env::var(key).ok())
        .context("invalid VR64_* environment override")?;

    if let Some(speed) = args.speed {
        config.speed = speed;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(port) = args.netplay_port {
        config.netplay_port = port;
    }
    if args.no_test_pattern {
        config.use_test_pattern = false;
    }
    config.validate().context("invalid machine config")?;
    Ok(config)
}

fn prepare(machine: &mut Machine, args: &Args) -> Result<()> {
    if let Some(path) = &args.image {
        machine
            .load_image_file(path)
            .with_context(|| format!("failed to load image: {}", path.display()))?;
    } else if let Some(path) = &args.disk {
        machine
            .load_disk_file(path)
            .with_context(|| format!("failed to load disk: {}", path.display()))?;
    }

    for code in &args.cheats {
        machine.add_cheat(code)?;
    }

    if let Some(path) = &args.snapshot_load {
        let fingerprint = machine
            .restore_snapshot_file(path)
            .with_context(|| format!("failed to restore snapshot: {}", path.display()))?;
        tracing::info!(%fingerprint, "resumed from snapshot");
    }
    Ok(())
}

fn run_iterations(machine: &mut Machine, iterations: u64) -> Result<()> {
    for _ in 0..iterations {
        if !machine.can_continue() {
            tracing::info!(pc = format_args!("{:#x}", machine.pc()), "end of image");
            break;
        }
        let iteration = machine.run_iteration()?;
        tracing::trace!(frame = iteration.frame, render = ?iteration.render, "iteration");
    }
    Ok(())
}

fn run_for(runtime: &mut Runtime, budget: Duration) -> Result<()> {
    let start = Instant::now();
    runtime.start().context("failed to start worker")?;
    while start.elapsed() < budget && runtime.state() == EngineState::Running {
        thread::sleep(POLL_INTERVAL.min(budget.saturating_sub(start.elapsed())));
    }
    runtime.pause();
    Ok(())
}

fn finish(machine: &mut Machine, args: &Args) -> Result<()> {
    if let Some(path) = &args.snapshot_save {
        let fingerprint = machine
            .save_snapshot_file(path)
            .with_context(|| format!("failed to save snapshot: {}", path.display()))?;
        eprintln!("snapshot {fingerprint} written to {}", path.display());
    }

    if let Some(path) = &args.png {
        dump_png(machine, path)?;
    }

    let title = machine.title().unwrap_or_default();
    let md5 = machine.image().map(|image| image.md5_hex()).unwrap_or_default();
    println!(
        "frames={} pc={:#010x} title={title} md5={md5}",
        machine.frame_count(),
        machine.pc()
    );
    Ok(())
}

fn dump_png(machine: &Machine, path: &Path) -> Result<()> {
    let fb = machine.framebuffer();
    let (w, h) = (fb.width() as u32, fb.height() as u32);
    if w == 0 || h == 0 {
        bail!("framebuffer has no pixels ({w}x{h})");
    }
    let img = image::RgbImage::from_raw(w, h, fb.to_rgb8())
        .ok_or_else(|| anyhow!("framebuffer size does not match {w}x{h}"))?;
    img.save(path)
        .with_context(|| format!("failed to write PNG: {}", path.display()))?;
    Ok(())
}
