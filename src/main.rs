use accent_gradient::data::config::Config;
use accent_gradient::{GradientEngine, GradientOverrides, RemoteDecoder};
use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// Print the accent gradient for each logo URL.
#[derive(Debug, Parser)]
#[command(version)]
struct Cli {
    /// Config file (default: $ACCENT_GRADIENT_CONFIG or the OS config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    angle: Option<f64>,

    #[arg(long)]
    sample_rate: Option<u32>,

    #[arg(long)]
    luminance_threshold: Option<f64>,

    #[arg(long)]
    min_contrast: Option<f64>,

    /// One JSON object per line instead of `url<TAB>gradient`
    #[arg(long)]
    json: bool,

    /// http(s)://, data: or file:// URLs, or local paths. An empty string
    /// prints the fallback gradient.
    #[arg(required = true)]
    urls: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Line<'a> {
    url: &'a str,
    gradient: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    colors: Option<(String, String)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::load_or_default(cli.config.as_deref()).context("loading config")?;

    let overrides = config.gradient.layered(&GradientOverrides {
        luminance_threshold: cli.luminance_threshold,
        sample_rate: cli.sample_rate,
        angle: cli.angle,
        min_contrast: cli.min_contrast,
    });

    let decoder = Arc::new(RemoteDecoder::new(config.fetch.clone()));
    let engine = GradientEngine::new(decoder, config.cache.to_cache_config());

    for url in &cli.urls {
        let line = if url.trim().is_empty() {
            Line {
                url,
                gradient: &config.fallback_gradient,
                colors: None,
                error: None,
            }
        } else {
            match engine.extract_gradient(url, &overrides).await {
                Ok(result) => {
                    print_line(
                        &Line {
                            url,
                            gradient: &result.gradient,
                            colors: Some((result.primary().to_string(), result.secondary().to_string())),
                            error: None,
                        },
                        cli.json,
                    )?;
                    continue;
                }
                Err(e) => {
                    log::warn!("gradient extraction failed for {url}: {e}");
                    Line {
                        url,
                        gradient: &config.fallback_gradient,
                        colors: None,
                        error: Some(e.to_string()),
                    }
                }
            }
        };
        print_line(&line, cli.json)?;
    }

    Ok(())
}

fn print_line(line: &Line<'_>, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(line)?);
    } else {
        println!("{}\t{}", line.url, line.gradient);
    }
    Ok(())
}
