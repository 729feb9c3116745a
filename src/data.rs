use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::SourceConfig;
use crate::github::{self, ContentItem};
use crate::state::FileEntry;

static IMAGE_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(jpg|jpeg|png|webp|gif)$").expect("valid image name pattern"));

pub trait ListingService: Send + Sync {
    fn list_contents(&self, source: &SourceConfig) -> Result<Vec<ContentItem>>;
}

pub struct GitHubListingService {
    client: Arc<github::Client>,
}

impl GitHubListingService {
    pub fn new(client: Arc<github::Client>) -> Self {
        Self { client }
    }
}

impl ListingService for GitHubListingService {
    fn list_contents(&self, source: &SourceConfig) -> Result<Vec<ContentItem>> {
        self.client
            .list_contents(source)
            .with_context(|| format!("fetch contents of {}", source.slug()))
    }
}

#[derive(Default)]
pub struct MockListingService {
    items: Vec<ContentItem>,
    fail: bool,
}

impl MockListingService {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items, fail: false }
    }

    pub fn failing() -> Self {
        Self {
            items: Vec::new(),
            fail: true,
        }
    }
}

impl ListingService for MockListingService {
    fn list_contents(&self, _source: &SourceConfig) -> Result<Vec<ContentItem>> {
        if self.fail {
            return Err(anyhow!("mock listing unavailable"));
        }
        Ok(self.items.clone())
    }
}

pub fn is_image_name(name: &str) -> bool {
    IMAGE_NAME.is_match(name)
}

/// Fetches the folder once and keeps the images. Failures are logged and
/// degrade to an empty gallery.
pub fn load_gallery_files(service: &dyn ListingService, source: &SourceConfig) -> Vec<FileEntry> {
    match service.list_contents(source) {
        Ok(items) => {
            let files = image_entries(items, source);
            tracing::info!(count = files.len(), repo = %source.slug(), "listing loaded");
            files
        }
        Err(err) => {
            tracing::warn!(error = ?err, repo = %source.slug(), "repository listing failed");
            Vec::new()
        }
    }
}

pub fn image_entries(items: Vec<ContentItem>, source: &SourceConfig) -> Vec<FileEntry> {
    items
        .into_iter()
        .filter(|item| item.kind == "file" && is_image_name(&item.name))
        .map(|item| {
            let download_url = match item.download_url {
                Some(url) if !url.trim().is_empty() => url,
                _ => github::raw_url(source, &item.path),
            };
            FileEntry {
                name: item.name,
                path: item.path,
                size: item.size,
                download_url,
                kind: item.kind,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(name: &str, kind: &str, download_url: Option<&str>) -> ContentItem {
        ContentItem {
            name: name.into(),
            path: format!("shots/{name}"),
            kind: kind.into(),
            size: Some(2048),
            download_url: download_url.map(str::to_string),
        }
    }

    #[test]
    fn image_names_are_matched_case_insensitively() {
        assert!(is_image_name("a.PNG"));
        assert!(is_image_name("photo.JpEg"));
        assert!(is_image_name("anim.gif"));
        assert!(!is_image_name("notes.txt"));
        assert!(!is_image_name("png"));
        assert!(!is_image_name("a.png.bak"));
    }

    #[test]
    fn keeps_only_image_files() {
        let source = SourceConfig::default();
        let files = image_entries(
            vec![
                item("a.png", "file", Some("u1")),
                item("b.txt", "file", None),
                item("dir.png", "dir", None),
            ],
            &source,
        );
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "a.png");
        assert_eq!(files[0].download_url, "u1");
    }

    #[test]
    fn synthesizes_missing_download_url() {
        let source = SourceConfig::default();
        let files = image_entries(vec![item("c d.jpg", "file", None)], &source);
        assert_eq!(
            files[0].download_url,
            "https://raw.githubusercontent.com/mayank19o7/wallpapers/main/shots%2Fc%20d.jpg"
        );
    }

    #[test]
    fn empty_download_url_is_replaced() {
        let source = SourceConfig::default();
        let files = image_entries(vec![item("e.webp", "file", Some(""))], &source);
        assert!(files[0].download_url.ends_with("/shots%2Fe.webp"));
    }

    #[test]
    fn failing_service_yields_empty_gallery() {
        let files = load_gallery_files(&MockListingService::failing(), &SourceConfig::default());
        assert!(files.is_empty());
    }

    #[test]
    fn preserves_listing_order() {
        let service = MockListingService::new(vec![
            item("z.png", "file", Some("z")),
            item("a.png", "file", Some("a")),
        ]);
        let names: Vec<_> = load_gallery_files(&service, &SourceConfig::default())
            .into_iter()
            .map(|file| file.name)
            .collect();
        assert_eq!(names, vec!["z.png", "a.png"]);
    }
}
