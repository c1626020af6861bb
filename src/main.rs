use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use log::LevelFilter;
use tokio::signal;

use mineral_id::artifacts::{ArtifactContext, ArtifactPaths};
use mineral_id::orchestrator::{PropertyBounds, Predictor};
use mineral_id::preprocess::image::DEFAULT_IMAGE_SIZE;
use mineral_id::preprocess::{ChannelOrder, ImageNormalizer, ImageNormalizerConfig};
use mineral_id::server::{self, AppState};
use mineral_id::ServerConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ChannelOrderArg {
    Bgr,
    Rgb,
}

impl From<ChannelOrderArg> for ChannelOrder {
    fn from(arg: ChannelOrderArg) -> Self {
        match arg {
            ChannelOrderArg::Bgr => ChannelOrder::Bgr,
            ChannelOrderArg::Rgb => ChannelOrder::Rgb,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Mineral identification service", long_about = None)]
struct Args {
    #[arg(long, default_value = "0.0.0.0", help = "Host address to bind the server to")]
    host: String,

    #[arg(long, default_value_t = 8000, help = "Port number to listen on")]
    port: u16,

    #[arg(long, help = "Number of HTTP worker threads (defaults to the CPU count)")]
    workers: Option<usize>,

    #[arg(
        long,
        help = "Number of ONNX sessions for concurrent inference (defaults to the worker count)"
    )]
    session_pool_size: Option<usize>,

    #[arg(
        long,
        default_value = "scaler.json",
        help = "Path to the fitted scaler (required)"
    )]
    scaler_path: PathBuf,

    #[arg(
        long,
        default_value = "label_encoder.json",
        help = "Path to the fitted label encoder (required)"
    )]
    label_encoder_path: PathBuf,

    #[arg(
        long,
        default_value = "model.onnx",
        help = "Path to the ONNX classifier; if it cannot be loaded only the rule-based classifier is used"
    )]
    model_path: PathBuf,

    #[arg(long, help = "Start without the learned classifier")]
    no_model: bool,

    #[arg(
        long,
        default_value_t = DEFAULT_IMAGE_SIZE,
        help = "Side length images are resized to before inference"
    )]
    image_size: u32,

    #[arg(
        long,
        default_value_t = ChannelOrderArg::Bgr,
        value_enum,
        help = "Channel order the classifier was trained with"
    )]
    channel_order: ChannelOrderArg,

    #[arg(long, default_value_t = 10.0, help = "Upper bound of accepted hardness values")]
    max_hardness: f64,

    #[arg(long, default_value_t = 20.0, help = "Upper bound of accepted density values")]
    max_density: f64,

    #[arg(
        long,
        default_value_t = 16 * 1024 * 1024,
        help = "Largest accepted image upload in bytes"
    )]
    max_image_bytes: usize,

    #[arg(long, default_value = "info", help = "Log level: error, warn, info, debug or trace")]
    log_level: LevelFilter,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            workers: self.workers,
            session_pool_size: self.session_pool_size,
            artifacts: ArtifactPaths {
                scaler: self.scaler_path,
                label_encoder: self.label_encoder_path,
                model: (!self.no_model).then_some(self.model_path),
            },
            image: ImageNormalizerConfig {
                width: self.image_size,
                height: self.image_size,
                channel_order: self.channel_order.into(),
            },
            bounds: PropertyBounds {
                max_hardness: self.max_hardness,
                max_density: self.max_density,
            },
            max_image_bytes: self.max_image_bytes,
            log_level: self.log_level,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let config = Args::parse().into_config();
    config.validate()?;
    server::init_logging(config.log_level);

    let artifacts = ArtifactContext::load(&config.artifacts, config.inference_sessions())
        .context("refusing to start without preprocessing artifacts")?;
    let predictor = Predictor::new(artifacts, ImageNormalizer::new(config.image), config.bounds);
    let app_state = AppState::new(predictor, config.max_image_bytes);

    actix_web::rt::System::new().block_on(async move {
        tokio::select! {
            res = server::startup(config, app_state) => {
                res.context("server terminated")?;
            }
            _ = signal::ctrl_c() => {
                log::info!("Received Ctrl+C, shutting down");
            }
        }
        Ok::<(), anyhow::Error>(())
    })
}
