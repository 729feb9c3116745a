use std::collections::{HashMap, VecDeque};
use std::io::{Cursor, Read};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use image::ImageReader;
use parking_lot::Mutex;
use reqwest::blocking::Client;

#[derive(Debug, Clone)]
pub struct Config {
    pub workers: usize,
    pub max_cache_bytes: usize,
    pub timeout: Duration,
    pub user_agent: String,
    pub http_client: Option<Client>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: 2,
            max_cache_bytes: 64 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            user_agent: format!("repo-gallery/{}", crate::VERSION),
            http_client: None,
        }
    }
}

#[derive(Debug)]
pub struct Image {
    pub url: String,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct ResultEntry {
    pub url: String,
    pub image: Result<Arc<Image>>,
}

struct Job {
    url: String,
    tx: Sender<ResultEntry>,
}

#[derive(Default)]
struct BodyCache {
    entries: HashMap<String, Arc<Image>>,
    order: VecDeque<String>,
    total: usize,
}

impl BodyCache {
    fn get(&self, url: &str) -> Option<Arc<Image>> {
        self.entries.get(url).cloned()
    }

    fn insert(&mut self, image: Arc<Image>, limit: usize) {
        if image.bytes.len() > limit || self.entries.contains_key(&image.url) {
            return;
        }
        while self.total + image.bytes.len() > limit {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            if let Some(evicted) = self.entries.remove(&oldest) {
                self.total -= evicted.bytes.len();
            }
        }
        self.total += image.bytes.len();
        self.order.push_back(image.url.clone());
        self.entries.insert(image.url.clone(), image);
    }
}

struct Inner {
    cfg: Config,
    client: Client,
    cache: Mutex<BodyCache>,
}

#[derive(Clone)]
pub struct Handle {
    jobs: Sender<Job>,
    inner: Arc<Inner>,
}

impl Handle {
    pub fn enqueue(&self, url: &str) -> Receiver<ResultEntry> {
        let (tx, rx) = unbounded();
        if let Some(image) = self.inner.cache.lock().get(url) {
            let _ = tx.send(ResultEntry {
                url: url.to_string(),
                image: Ok(image),
            });
            return rx;
        }
        let job = Job {
            url: url.to_string(),
            tx,
        };
        if let Err(err) = self.jobs.send(job) {
            let job = err.into_inner();
            let _ = job.tx.send(ResultEntry {
                url: job.url,
                image: Err(anyhow!("media: worker pool stopped")),
            });
        }
        rx
    }
}

pub struct Manager {
    handle: Handle,
    stop: Sender<()>,
    handles: Vec<thread::JoinHandle<()>>,
}

impl Manager {
    pub fn new(cfg: Config) -> Result<Self> {
        let mut cfg = cfg;
        if cfg.workers == 0 {
            cfg.workers = 2;
        }

        let client = if let Some(client) = cfg.http_client.clone() {
            client
        } else {
            Client::builder()
                .timeout(cfg.timeout)
                .user_agent(cfg.user_agent.clone())
                .build()
                .context("media: build http client")?
        };

        let (job_tx, job_rx) = unbounded::<Job>();
        let (stop_tx, stop_rx) = unbounded();

        let inner = Arc::new(Inner {
            cfg,
            client,
            cache: Mutex::new(BodyCache::default()),
        });

        let mut handles = Vec::new();
        for _ in 0..inner.cfg.workers {
            let rx_jobs = job_rx.clone();
            let rx_stop = stop_rx.clone();
            let worker_inner = inner.clone();
            handles.push(thread::spawn(move || worker_inner.worker(rx_jobs, rx_stop)));
        }

        Ok(Self {
            handle: Handle {
                jobs: job_tx,
                inner,
            },
            stop: stop_tx,
            handles,
        })
    }

    pub fn handle(&self) -> Handle {
        self.handle.clone()
    }

    fn shutdown(&mut self) {
        for _ in &self.handles {
            let _ = self.stop.send(());
        }
        while let Some(handle) = self.handles.pop() {
            let _ = handle.join();
        }
    }
}

impl Drop for Manager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn worker(&self, jobs: Receiver<Job>, stop: Receiver<()>) {
        loop {
            crossbeam_channel::select! {
                recv(stop) -> _ => break,
                recv(jobs) -> msg => {
                    match msg {
                        Ok(job) => self.process(job),
                        Err(_) => break,
                    }
                }
            }
        }
    }

    fn process(&self, job: Job) {
        let hit = self.cache.lock().get(&job.url);
        let image = match hit {
            Some(image) => Ok(image),
            None => self.fetch(&job.url).map(|image| {
                let image = Arc::new(image);
                self.cache
                    .lock()
                    .insert(image.clone(), self.cfg.max_cache_bytes);
                image
            }),
        };
        if let Err(err) = &image {
            tracing::warn!(url = %job.url, error = ?err, "image fetch failed");
        }
        let _ = job.tx.send(ResultEntry {
            url: job.url,
            image,
        });
    }

    fn fetch(&self, url: &str) -> Result<Image> {
        let bytes = fetch_bytes(&self.client, url)?;
        let (width, height) = image_dimensions(&bytes)?;
        Ok(Image {
            url: url.to_string(),
            bytes,
            width,
            height,
        })
    }
}

pub fn fetch_bytes(client: &Client, url: &str) -> Result<Vec<u8>> {
    if url.is_empty() {
        bail!("media: url required");
    }
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("media: request {url}"))?;
    if !response.status().is_success() {
        bail!("media: {url} returned status {}", response.status());
    }
    let mut reader = response;
    let mut bytes = Vec::with_capacity(128 * 1024);
    reader
        .read_to_end(&mut bytes)
        .with_context(|| format!("media: read body of {url}"))?;
    Ok(bytes)
}

pub fn image_dimensions(bytes: &[u8]) -> Result<(u32, u32)> {
    if bytes.is_empty() {
        bail!("media: image had no bytes");
    }
    ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .context("media: sniff image format")?
        .into_dimensions()
        .context("media: decode image header")
}
