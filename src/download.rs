use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use reqwest::blocking::Client;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("download: request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("download: server answered {0}")]
    Status(StatusCode),
    #[error("download: reading response body: {0}")]
    Body(#[source] io::Error),
    #[error("download: {0:?} is not a usable file name")]
    FileName(String),
    #[error("download: write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    OpenedInBrowser,
    Failed(String),
}

impl DownloadOutcome {
    pub fn status_message(&self, filename: &str) -> String {
        match self {
            DownloadOutcome::Saved(path) => format!("Saved {}", path.display()),
            DownloadOutcome::OpenedInBrowser => {
                format!("Could not save {filename}; opened it in your browser.")
            }
            DownloadOutcome::Failed(reason) => format!("Download of {filename} failed: {reason}"),
        }
    }
}

#[derive(Clone)]
pub struct Downloader {
    http: Client,
    dir: PathBuf,
}

impl Downloader {
    pub fn new(http: Client, dir: impl Into<PathBuf>) -> Self {
        Self {
            http,
            dir: dir.into(),
        }
    }

    pub fn save(&self, url: &str, filename: &str) -> Result<PathBuf, DownloadError> {
        let name = sanitize_file_name(filename)?;

        let mut response = self.http.get(url).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status));
        }
        let mut bytes = Vec::new();
        response.read_to_end(&mut bytes).map_err(DownloadError::Body)?;

        fs::create_dir_all(&self.dir).map_err(|source| DownloadError::Write {
            path: self.dir.clone(),
            source,
        })?;
        write_unique(&self.dir, &name, |file| file.write_all(&bytes))
    }

    /// Saves the file, falling back to `open(url)` when saving fails for
    /// any reason.
    pub fn download_with_fallback<F>(&self, url: &str, filename: &str, open: F) -> DownloadOutcome
    where
        F: FnOnce(&str) -> io::Result<()>,
    {
        match self.save(url, filename) {
            Ok(path) => {
                tracing::info!(url, path = %path.display(), "download saved");
                DownloadOutcome::Saved(path)
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "download failed, opening in browser");
                match open(url) {
                    Ok(()) => DownloadOutcome::OpenedInBrowser,
                    Err(open_err) => {
                        tracing::error!(url, error = %open_err, "browser fallback failed");
                        DownloadOutcome::Failed(format!("{err}; browser: {open_err}"))
                    }
                }
            }
        }
    }
}

pub fn open_in_browser(url: &str) -> io::Result<()> {
    webbrowser::open(url)
}

fn sanitize_file_name(filename: &str) -> Result<String, DownloadError> {
    Path::new(filename)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.trim().is_empty())
        .map(str::to_string)
        .ok_or_else(|| DownloadError::FileName(filename.to_string()))
}

fn candidate_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{stem} ({attempt}).{ext}"),
        _ => format!("{name} ({attempt})"),
    }
}

/// Creates the first free candidate name and fills it. A file that could
/// not be filled completely is removed again.
fn write_unique<F>(dir: &Path, name: &str, fill: F) -> Result<PathBuf, DownloadError>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let mut attempt = 0;
    loop {
        let path = dir.join(candidate_name(name, attempt));
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                if let Err(source) = fill(&mut file) {
                    drop(file);
                    if let Err(err) = fs::remove_file(&path) {
                        tracing::warn!(path = %path.display(), error = %err, "could not remove partial download");
                    }
                    return Err(DownloadError::Write { path, source });
                }
                return Ok(path);
            }
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => attempt += 1,
            Err(source) => return Err(DownloadError::Write { path, source }),
        }
    }
}
