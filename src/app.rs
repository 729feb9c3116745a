use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::blocking::Client;

use crate::config;
use crate::data::{self, ListingService};
use crate::download::Downloader;
use crate::github;
use crate::kitty;
use crate::logging;
use crate::media;
use crate::ui;

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config_file: Option<PathBuf>,
}

pub fn run(options: RunOptions) -> Result<()> {
    let config_path = options.config_file.clone().or_else(config::default_path);
    let cfg = config::load(config::LoadOptions {
        config_file: options.config_file,
        env_prefix: None,
    })
    .context("load config")?;

    if let Err(err) = logging::init(&cfg.log) {
        eprintln!("warning: logging disabled: {err:?}");
    }
    tracing::info!(
        repo = %cfg.source.slug(),
        folder = %cfg.source.folder,
        branch = %cfg.source.branch,
        "configuration loaded"
    );

    let http = Client::builder()
        .timeout(cfg.media.timeout)
        .user_agent(cfg.source.user_agent.clone())
        .build()
        .context("build http client")?;

    let client = github::Client::new(github::ClientConfig {
        user_agent: cfg.source.user_agent.clone(),
        http_client: Some(http.clone()),
    })
    .context("create github client")?;
    let listing_service: Arc<dyn ListingService> =
        Arc::new(data::GitHubListingService::new(Arc::new(client)));

    let media_cfg = media::Config {
        workers: cfg.media.workers,
        max_cache_bytes: cfg.media.max_cache_bytes,
        timeout: cfg.media.timeout,
        user_agent: cfg.source.user_agent.clone(),
        http_client: Some(http.clone()),
    };
    let media_manager = match media::Manager::new(media_cfg) {
        Ok(manager) => Some(manager),
        Err(err) => {
            tracing::warn!(error = ?err, "image previews disabled");
            None
        }
    };
    let media_handle = media_manager.as_ref().map(|manager| manager.handle());

    let download_dir = cfg.download.resolved_dir();
    tracing::debug!(dir = %download_dir.display(), "downloads directory");

    let options = ui::Options {
        source: cfg.source.clone(),
        search_debounce: cfg.ui.search_debounce,
        reveal_delay: cfg.ui.reveal_delay,
        listing_service,
        media_handle,
        downloader: Some(Downloader::new(http, download_dir)),
        config_path: friendly_path(config_path.as_ref()),
        inline_images: kitty::is_kitty_terminal(),
    };

    let mut model = ui::Model::new(options);
    model.run()?;

    drop(model);
    drop(media_manager);
    tracing::info!("repo-gallery exiting");

    Ok(())
}

fn friendly_path(path: Option<&PathBuf>) -> String {
    if let Some(path) = path {
        if let Some(home) = dirs::home_dir() {
            if let Ok(stripped) = path.strip_prefix(&home) {
                let mut display = String::from("~");
                if !stripped.as_os_str().is_empty() {
                    display.push_str(&format!("/{}", stripped.display()));
                }
                return display;
            }
        }
        path.display().to_string()
    } else {
        "(defaults)".to_string()
    }
}
