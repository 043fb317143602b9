use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use imgopt_renderer::{FetchConfig, RenderLimits, Renderer, TransformParams, build_response};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Render one image request from a query string.
#[derive(Parser)]
#[command(name = "imgopt", version)]
#[command(about = "Fetch, transform and encode an image described by query parameters")]
struct Cli {
    /// Query string, e.g. "url=https://example.com/a.jpg&w=200&output=webp"
    query: String,

    /// Write the response body here instead of stdout
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Print response headers to stderr
    #[arg(long)]
    headers: bool,

    /// Print the resolved parameters as JSON and exit
    #[arg(long)]
    dump_params: bool,

    /// Whole-request timeout for source downloads, in seconds
    #[arg(long, env = "IMGOPT_FETCH_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,

    /// Largest accepted source body, in bytes
    #[arg(long, env = "IMGOPT_MAX_BODY_BYTES")]
    max_body_bytes: Option<u64>,

    /// User-Agent sent with source downloads
    #[arg(long, env = "IMGOPT_USER_AGENT")]
    user_agent: Option<String>,

    /// Longest accepted output side, in pixels
    #[arg(long, env = "IMGOPT_MAX_DIMENSION")]
    max_dimension: Option<u32>,

    /// Largest accepted output area, in pixels
    #[arg(long, env = "IMGOPT_MAX_PIXELS")]
    max_pixels: Option<u64>,
}

impl Cli {
    fn fetch_config(&self) -> FetchConfig {
        let mut config = FetchConfig::default();
        if let Some(secs) = self.timeout_secs.filter(|s| *s > 0) {
            config.timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = self.max_body_bytes.filter(|b| *b > 0) {
            config.max_body_bytes = bytes;
        }
        if let Some(agent) = self.user_agent.clone().filter(|a| !a.trim().is_empty()) {
            config.user_agent = agent;
        }
        config
    }

    fn render_limits(&self) -> RenderLimits {
        let mut limits = RenderLimits::default();
        if let Some(side) = self.max_dimension.filter(|s| *s > 0) {
            limits.max_dimension = side;
        }
        if let Some(pixels) = self.max_pixels.filter(|p| *p > 0) {
            limits.max_pixels = pixels;
        }
        limits
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let params = TransformParams::from_query(&cli.query);
    if cli.dump_params {
        println!("{}", params.to_json_pretty()?);
        return Ok(());
    }

    let renderer = Renderer::http(&cli.fetch_config())?.with_limits(cli.render_limits());
    let rendered = renderer.process(&params)?;
    let response = build_response(&rendered, &params)?;

    if cli.headers {
        eprintln!("Content-Type: {}", response.content_type);
        for (name, value) in &response.headers {
            eprintln!("{name}: {value}");
        }
    }

    match &cli.out {
        Some(path) => {
            std::fs::write(path, &response.body)?;
            info!(path = %path.display(), bytes = response.body.len(), "wrote response body");
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&response.body)?;
            stdout.flush()?;
        }
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
