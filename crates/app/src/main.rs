//! Face Overlay - Main Entry Point

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use app::monitor::check_backend;
use app::{
    init_logging, init_metrics, run_server, spawn_health_monitor, AppConfig, AppState,
    FrameDumpSurface,
};
use camera_capture::{ImageSequence, StillImage, VideoFrame};
use clap::{Parser, Subcommand};
use overlay_engine::{
    DetectionLoop, DetectionRegion, LoopHandle, OverlaySession, OverlaySnapshot, RasterSurface,
};
use tracing::info;
use vision_client::VisionClient;

#[derive(Parser)]
#[command(
    name = "face-overlay",
    version,
    about = "Real-time face detection overlay driven by a remote vision service",
    long_about = None
)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long, default_value = "face-overlay.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check the vision service
    Health,

    /// List registered people
    People,

    /// Register a person from a photo with exactly one face
    Register {
        #[arg(long)]
        name: String,

        /// Photo path
        #[arg(long)]
        image: PathBuf,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        employee_id: Option<String>,
    },

    /// Delete a registered person
    Delete { id: String },

    /// Print the URL of a person's stored photo
    ImageUrl { id: String },

    /// Detect faces in one image and render the overlay
    Detect {
        #[arg(long)]
        image: PathBuf,

        /// Detection region in display space: x,y,width,height
        #[arg(long, value_parser = parse_region)]
        region: Option<DetectionRegion>,

        /// Displayed size as WIDTHxHEIGHT (defaults to the image size)
        #[arg(long, value_parser = parse_size)]
        display: Option<(f32, f32)>,

        /// Overlay PNG output path
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Play an image sequence through the detection loop
    Play {
        /// Directory of frames, played in file name order
        #[arg(long)]
        frames: PathBuf,

        #[arg(long, value_parser = parse_region)]
        region: Option<DetectionRegion>,

        #[arg(long, value_parser = parse_size)]
        display: Option<(f32, f32)>,

        /// Directory receiving one overlay PNG per rendered frame
        #[arg(long)]
        out_dir: Option<PathBuf>,

        /// Serve overlay status on this address while playing
        #[arg(long)]
        serve: Option<String>,
    },
}

fn parse_region(value: &str) -> Result<DetectionRegion, String> {
    let parts: Vec<f32> = value
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<Result<_, _>>()
        .map_err(|e| format!("invalid region {:?}: {}", value, e))?;
    match parts[..] {
        [x, y, width, height] if width > 0.0 && height > 0.0 => {
            Ok(DetectionRegion::new(x, y, width, height))
        }
        _ => Err(format!("expected x,y,width,height, got {:?}", value)),
    }
}

fn parse_size(value: &str) -> Result<(f32, f32), String> {
    let (w, h) = value
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got {:?}", value))?;
    let w: f32 = w.trim().parse().map_err(|e| format!("invalid width: {}", e))?;
    let h: f32 = h.trim().parse().map_err(|e| format!("invalid height: {}", e))?;
    if w > 0.0 && h > 0.0 {
        Ok((w, h))
    } else {
        Err(format!("display size must be positive, got {:?}", value))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load(&cli.config)?;
    init_logging(&config.logging)?;

    info!("=== Face Overlay v{} ===", env!("CARGO_PKG_VERSION"));
    if let Some(addr) = &config.metrics_addr {
        init_metrics(addr)?;
    }

    let client = VisionClient::new(&config.backend).context("invalid backend configuration")?;

    match cli.command {
        Commands::Health => cmd_health(&client).await,
        Commands::People => cmd_people(&client).await,
        Commands::Register {
            name,
            image,
            email,
            employee_id,
        } => cmd_register(&client, &name, &image, email.as_deref(), employee_id.as_deref()).await,
        Commands::Delete { id } => {
            client
                .delete_person(&id)
                .await
                .with_context(|| format!("failed to delete {}", id))?;
            println!("Deleted {}", id);
            Ok(())
        }
        Commands::ImageUrl { id } => {
            println!("{}", client.person_image_url(&id));
            Ok(())
        }
        Commands::Detect {
            image,
            region,
            display,
            out,
        } => cmd_detect(&client, &config, &image, region, display, out.as_deref()).await,
        Commands::Play {
            frames,
            region,
            display,
            out_dir,
            serve,
        } => {
            let serve = serve.or_else(|| config.server_addr.clone());
            cmd_play(client, &config, &frames, region, display, out_dir.as_deref(), serve).await
        }
    }
}

async fn cmd_health(client: &VisionClient) -> Result<()> {
    let health = client
        .health_check()
        .await
        .with_context(|| format!("vision service at {} is offline", client.base_url()))?;
    println!("{}", serde_json::to_string_pretty(&health)?);
    Ok(())
}

async fn cmd_people(client: &VisionClient) -> Result<()> {
    let people = client.list_people().await.context("failed to list people")?;
    if people.is_empty() {
        println!("No people registered");
    }
    for person in people {
        println!(
            "{}\t{}\t{}\t{} image(s)\t{}",
            person.id,
            person.name,
            person.employee_id.as_deref().unwrap_or("-"),
            person.image_count,
            person.added_date
        );
    }
    Ok(())
}

async fn cmd_register(
    client: &VisionClient,
    name: &str,
    image: &Path,
    email: Option<&str>,
    employee_id: Option<&str>,
) -> Result<()> {
    let still = StillImage::from_file(image)
        .with_context(|| format!("failed to read {}", image.display()))?;
    let person = client
        .register_face(name, &still, email, employee_id)
        .await
        .context("registration failed")?;
    println!("Registered {} as {}", person.name, person.id);
    Ok(())
}

async fn cmd_detect(
    client: &VisionClient,
    config: &AppConfig,
    image: &Path,
    region: Option<DetectionRegion>,
    display: Option<(f32, f32)>,
    out: Option<&Path>,
) -> Result<()> {
    let frame = VideoFrame::open(image, 0)
        .with_context(|| format!("failed to read {}", image.display()))?;
    let still = config.capture.screenshot(&frame)?;
    let display = display.unwrap_or((frame.width as f32, frame.height as f32));

    let mut session = OverlaySession::new(Some(RasterSurface::default()), &config.overlay);
    if let Some(region) = region {
        session.place_region(region, Some(display));
    }

    let hint = if config.overlay.forward_region {
        session.region_hint((still.width, still.height), Some(display))
    } else {
        None
    };
    let response = client
        .detect_and_recognize(&still, hint)
        .await
        .context("detection failed")?;
    if let Some(message) = &response.message {
        info!("Backend: {}", message);
    }
    session.apply(response, (still.width, still.height), Some(display));

    let stats = session.stats();
    info!(
        "{} faces ({} recognized, {} unknown)",
        stats.total, stats.recognized, stats.unknown
    );
    println!("{}", serde_json::to_string_pretty(&session.entries())?);

    if let Some(out) = out {
        let surface = session.into_surface().context("no overlay surface")?;
        surface
            .save(out)
            .with_context(|| format!("failed to write {}", out.display()))?;
        info!("Overlay written to {}", out.display());
    }
    Ok(())
}

async fn cmd_play(
    client: VisionClient,
    config: &AppConfig,
    frames: &Path,
    region: Option<DetectionRegion>,
    display: Option<(f32, f32)>,
    out_dir: Option<&Path>,
    serve: Option<String>,
) -> Result<()> {
    let mut source = ImageSequence::open_dir(frames)
        .with_context(|| format!("failed to open frames in {}", frames.display()))?;
    if let Some((w, h)) = display {
        source = source.with_display_size(w, h);
    }
    let surface = out_dir
        .map(FrameDumpSurface::new)
        .transpose()
        .context("failed to create output directory")?;

    let (handle, detection_loop) = DetectionLoop::new(
        Arc::new(client.clone()),
        source,
        surface,
        config.capture.clone(),
        config.overlay.clone(),
    );
    let task = detection_loop.spawn();

    let status = check_backend(&client).await;
    handle.set_backend_status(status).await?;
    let monitor = spawn_health_monitor(
        client.clone(),
        handle.clone(),
        Duration::from_secs(config.health_interval_secs),
    );

    if let Some(addr) = serve.clone() {
        let state = Arc::new(AppState::new(handle.subscribe(), client.base_url()));
        tokio::spawn(async move {
            if let Err(e) = run_server(&addr, state).await {
                tracing::error!("Status server failed: {}", e);
            }
        });
    }

    if let Some(region) = region {
        handle.place_region(region).await?;
    }
    handle.start_playback().await?;

    let snapshot = wait_for_playback(&handle).await?;
    println!(
        "Processed {} frames: {} faces on the last frame, {} recognized",
        snapshot.cycles_completed, snapshot.stats.total, snapshot.stats.recognized
    );
    if let Some(error) = &snapshot.error {
        println!("Last error: {}", error);
    }

    if serve.is_some() {
        info!("Playback finished, serving status until interrupted");
        tokio::signal::ctrl_c().await?;
    }

    handle.shutdown().await?;
    monitor.abort();
    let session = task.await?;
    if let Some(surface) = session.into_surface() {
        info!("Wrote {} overlay frames", surface.written());
    }
    Ok(())
}

/// Wait until playback has started and then stopped
async fn wait_for_playback(handle: &LoopHandle) -> Result<OverlaySnapshot> {
    let mut rx = handle.subscribe();
    loop {
        {
            let snapshot = rx.borrow_and_update();
            if !snapshot.playing && !snapshot.processing {
                if snapshot.cycles_completed > 0 {
                    return Ok(snapshot.clone());
                }
                if let Some(error) = &snapshot.error {
                    bail!("playback did not start: {}", error);
                }
            }
        }
        rx.changed().await.context("detection loop stopped")?;
    }
}
