//! Webcam overlay demos: eyewear, garments and body part masks placed from
//! detected keypoints.

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use pose_overlay::{
    app::{welcome_text, AppConfig, OverlayApp},
    camera::VideoSource,
    config::{Config, EXAMPLE_CONFIG},
    routes::Route,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// View to open (/, /load, /posenet, /pose-detection, /body-detection, /dress, /eyewear)
    #[arg(default_value = "/")]
    route: String,

    /// Camera index to use
    #[arg(long)]
    cam: Option<i32>,

    /// Video file to process
    #[arg(short, long)]
    video: Option<String>,

    /// Path to configuration file (YAML format)
    #[arg(short = 'C', long)]
    config: Option<String>,

    /// Run without a window
    #[arg(long)]
    headless: bool,

    /// Stop after this many rendered frames
    #[arg(long)]
    max_frames: Option<u64>,

    /// Mirror the camera image horizontally
    #[arg(long)]
    mirror: bool,

    /// Print an example configuration file and exit
    #[arg(long)]
    print_config: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    if args.debug {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("debug"));
    } else {
        env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));
    }

    if args.print_config {
        print!("{EXAMPLE_CONFIG}");
        return Ok(());
    }

    let route: Route = args.route.parse()?;

    let mut config = match &args.config {
        Some(path) => {
            info!("Loading configuration from: {path}");
            Config::from_file(path).with_context(|| format!("Failed to load config file {path}"))?
        }
        None => Config::default(),
    };

    if let Some(cam) = args.cam {
        config.camera.index = cam;
    }
    if args.headless {
        config.display.gui = false;
    }
    if args.mirror {
        config.display.mirror = true;
    }
    config.validate().context("Invalid configuration")?;

    if route == Route::Welcome {
        print!("{}", welcome_text());
        return Ok(());
    }

    let video_source = match args.video {
        Some(path) => VideoSource::File(path),
        None => VideoSource::Camera(config.camera.index),
    };

    let mut app = OverlayApp::new(AppConfig {
        route,
        video_source,
        gui: config.display.gui,
        max_frames: args.max_frames,
        config,
    })?;
    let summary = app.run()?;

    info!(
        "Processed {} frames in {} cycles ({} failed)",
        summary.frames, summary.loop_summary.cycles, summary.loop_summary.failures
    );
    Ok(())
}
