use std::collections::HashMap;
use std::io::{self, Stdout, Write};
use std::ops::Range;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender, TryRecvError};
use crossterm::cursor::MoveTo;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseButton,
    MouseEvent, MouseEventKind,
};
use crossterm::style::Print;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Padding, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::config::SourceConfig;
use crate::data::{self, ListingService};
use crate::debounce::ScheduledTask;
use crate::download::{self, DownloadOutcome, Downloader};
use crate::filter::SearchBox;
use crate::gallery::{Effect, Gallery};
use crate::kitty::{self, KittyImage};
use crate::media;
use crate::state::FileEntry;
use crate::view::{Action, Button, Grid, ImageSlot, Thumbnail};
use crate::viewer::ModalKey;

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_TEXT_DIMMED: Color = Color::Rgb(88, 91, 112);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const CARD_WIDTH: u16 = 26;
const CARD_HEIGHT: u16 = 5;
const KITTY_CACHE_MAX: usize = 8;

#[derive(Clone)]
pub struct Options {
    pub source: SourceConfig,
    pub search_debounce: Duration,
    pub reveal_delay: Duration,
    pub listing_service: Arc<dyn ListingService>,
    pub media_handle: Option<media::Handle>,
    pub downloader: Option<Downloader>,
    pub config_path: String,
    pub inline_images: bool,
}

enum AsyncResponse {
    Listing {
        files: Vec<FileEntry>,
    },
    Download {
        filename: String,
        outcome: DownloadOutcome,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Target {
    Card(usize),
    Button(Action),
    SearchBar,
    ModalContent,
    AboutContent,
}

#[derive(Debug, Clone)]
struct Hit {
    area: Rect,
    target: Target,
}

#[derive(Debug, Clone, Default)]
struct FrameState {
    hero_image: Option<Rect>,
    modal_image: Option<Rect>,
    grid_columns: usize,
    grid_rows: usize,
    drawn_cards: Range<usize>,
}

struct ActiveKitty {
    id: u32,
    col: u16,
    row: u16,
    wrap_tmux: bool,
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Model {
    gallery: Gallery,
    source: SourceConfig,
    config_path: String,
    status_message: String,
    listing_service: Arc<dyn ListingService>,
    media_handle: Option<media::Handle>,
    downloader: Option<Downloader>,
    search: SearchBox,
    search_focused: bool,
    reveal: ScheduledTask<()>,
    reveal_delay: Duration,
    revealed: bool,
    listing_in_flight: bool,
    downloads_in_flight: usize,
    thumbnails: HashMap<String, Thumbnail>,
    pending_media: HashMap<String, Receiver<media::ResultEntry>>,
    inline_images: HashMap<String, Arc<media::Image>>,
    kitty_enabled: bool,
    kitty_images: HashMap<u32, KittyImage>,
    active_kitty: Option<ActiveKitty>,
    needs_kitty_flush: bool,
    hits: Vec<Hit>,
    frame: FrameState,
    needs_redraw: bool,
    spinner: Spinner,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        let status_message = format!("Loading images from {}…", location_label(&options.source));
        Self {
            gallery: Gallery::new(options.source.slug()),
            source: options.source,
            config_path: options.config_path,
            status_message,
            listing_service: options.listing_service,
            media_handle: options.media_handle,
            downloader: options.downloader,
            search: SearchBox::new(options.search_debounce),
            search_focused: false,
            reveal: ScheduledTask::new(),
            reveal_delay: options.reveal_delay,
            revealed: false,
            listing_in_flight: false,
            downloads_in_flight: 0,
            thumbnails: HashMap::new(),
            pending_media: HashMap::new(),
            inline_images: HashMap::new(),
            kitty_enabled: options.inline_images,
            kitty_images: HashMap::new(),
            active_kitty: None,
            needs_kitty_flush: false,
            hits: Vec::new(),
            frame: FrameState::default(),
            needs_redraw: true,
            spinner: Spinner::new(),
            response_tx,
            response_rx,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        stdout.execute(EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        self.start_listing();
        let result = self.event_loop(&mut terminal);

        self.clear_active_kitty(terminal.backend_mut())?;
        disable_raw_mode()?;
        terminal.backend_mut().execute(DisableMouseCapture)?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async(Instant::now()) {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.request_drawn_thumbnails();
                self.flush_inline_images(terminal.backend_mut())?;
                self.needs_redraw = false;
            }

            let mut timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));
            if let Some(deadline) = self.next_deadline() {
                timeout = timeout.min(deadline.saturating_duration_since(Instant::now()));
            }

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code, Instant::now()) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                                self.mark_dirty();
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Err(err) = self.handle_mouse(mouse) {
                            self.status_message = format!("Error: {}", err);
                            self.mark_dirty();
                        }
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if self.poll_async(Instant::now()) {
                self.mark_dirty();
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                if self.is_loading() {
                    if self.spinner.advance() {
                        self.mark_dirty();
                    }
                } else {
                    self.spinner.reset();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn is_loading(&self) -> bool {
        let view = self.gallery.view();
        self.listing_in_flight
            || view.page_loader.visible
            || self.downloads_in_flight > 0
            || !self.pending_media.is_empty()
    }

    fn next_deadline(&self) -> Option<Instant> {
        let search = if self.revealed {
            self.search.deadline()
        } else {
            None
        };
        [self.reveal.deadline(), search].into_iter().flatten().min()
    }

    fn start_listing(&mut self) {
        if self.listing_in_flight {
            return;
        }
        self.listing_in_flight = true;
        let tx = self.response_tx.clone();
        let service = self.listing_service.clone();
        let source = self.source.clone();
        thread::spawn(move || {
            let files = data::load_gallery_files(service.as_ref(), &source);
            let _ = tx.send(AsyncResponse::Listing { files });
        });
    }

    /// Drains background results and fires due timers. Returns whether
    /// anything changed.
    fn poll_async(&mut self, now: Instant) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message, now);
            changed = true;
        }
        if self.poll_media() {
            changed = true;
        }
        if self.tick(now) {
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse, now: Instant) {
        match message {
            AsyncResponse::Listing { files } => self.apply_listing(files, now),
            AsyncResponse::Download { filename, outcome } => {
                self.downloads_in_flight = self.downloads_in_flight.saturating_sub(1);
                self.status_message = outcome.status_message(&filename);
            }
        }
    }

    fn apply_listing(&mut self, files: Vec<FileEntry>, now: Instant) {
        self.listing_in_flight = false;
        let count = files.len();
        if self.gallery.load(files) {
            self.status_message = format!(
                "{count} image{} in {}.",
                if count == 1 { "" } else { "s" },
                location_label(&self.source)
            );
            self.reveal.schedule_after((), self.reveal_delay, now);
        } else {
            self.status_message = format!("No images found in {}.", location_label(&self.source));
            self.revealed = true;
        }
        self.needs_kitty_flush = true;
    }

    fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if self.reveal.take_due(now).is_some() {
            self.revealed = true;
            self.gallery.reveal();
            if !self.search.text().is_empty() {
                let query = self.search.text().to_string();
                self.gallery.filter_files(&query);
            }
            self.after_gallery_change();
            changed = true;
        }
        if self.revealed {
            if let Some(query) = self.search.take_due(now) {
                tracing::debug!(query = %query, "filtering gallery");
                self.gallery.filter_files(&query);
                self.after_gallery_change();
                changed = true;
            }
        }
        changed
    }

    /// Reapplies what is known about every image to freshly rendered
    /// cards and fetches whatever the hero or modal now shows.
    fn after_gallery_change(&mut self) {
        let thumbnails = &self.thumbnails;
        for card in &mut self.gallery.view_mut().gallery.cards {
            match thumbnails.get(&card.image.src) {
                Some(Thumbnail::Failed) => {
                    if card.thumbnail != Thumbnail::Failed {
                        card.mark_failed();
                    }
                }
                Some(state) => card.thumbnail = *state,
                None => {}
            }
        }

        let wanted = self.inline_sources();
        self.inline_images.retain(|url, _| wanted.contains(url));
        for url in wanted {
            if !self.inline_images.contains_key(&url) {
                self.request_media(&url);
            }
        }
        self.needs_kitty_flush = true;
        self.mark_dirty();
    }

    fn inline_sources(&self) -> Vec<String> {
        let view = self.gallery.view();
        [view.hero.as_ref(), view.modal.image.as_ref()]
            .into_iter()
            .flatten()
            .map(|slot| slot.src.clone())
            .collect()
    }

    fn request_media(&mut self, url: &str) {
        if url.is_empty() || self.pending_media.contains_key(url) {
            return;
        }
        if matches!(self.thumbnails.get(url), Some(Thumbnail::Failed)) {
            return;
        }
        let Some(handle) = self.media_handle.as_ref() else {
            return;
        };
        let rx = handle.enqueue(url);
        self.pending_media.insert(url.to_string(), rx);
        self.thumbnails
            .entry(url.to_string())
            .or_insert(Thumbnail::Loading);
        for card in self.gallery.view_mut().gallery.cards_for_url_mut(url) {
            if card.thumbnail == Thumbnail::Deferred {
                card.thumbnail = Thumbnail::Loading;
            }
        }
    }

    /// Cards are fetched once they have been on screen, like lazily
    /// loaded images.
    fn request_drawn_thumbnails(&mut self) {
        let range = self.frame.drawn_cards.clone();
        let urls: Vec<String> = self
            .gallery
            .view()
            .gallery
            .cards
            .iter()
            .skip(range.start)
            .take(range.len())
            .filter(|card| card.thumbnail == Thumbnail::Deferred)
            .map(|card| card.image.src.clone())
            .collect();
        for url in urls {
            self.request_media(&url);
        }
    }

    fn poll_media(&mut self) -> bool {
        let mut finished: Vec<media::ResultEntry> = Vec::new();
        self.pending_media.retain(|url, rx| match rx.try_recv() {
            Ok(entry) => {
                finished.push(entry);
                false
            }
            Err(TryRecvError::Empty) => true,
            Err(TryRecvError::Disconnected) => {
                finished.push(media::ResultEntry {
                    url: url.clone(),
                    image: Err(anyhow!("media: worker dropped the request")),
                });
                false
            }
        });
        let changed = !finished.is_empty();
        for entry in finished {
            self.apply_media_result(entry);
        }
        changed
    }

    fn apply_media_result(&mut self, entry: media::ResultEntry) {
        let media::ResultEntry { url, image } = entry;
        match image {
            Ok(image) => {
                let state = Thumbnail::Loaded {
                    width: image.width,
                    height: image.height,
                };
                self.thumbnails.insert(url.clone(), state);
                for card in self.gallery.view_mut().gallery.cards_for_url_mut(&url) {
                    card.thumbnail = state;
                }
                if self.inline_sources().contains(&url) {
                    self.inline_images.insert(url, image);
                    self.needs_kitty_flush = true;
                }
            }
            Err(err) => {
                tracing::warn!(url = %url, error = %err, "image failed to load");
                self.thumbnails.insert(url.clone(), Thumbnail::Failed);
                for card in self.gallery.view_mut().gallery.cards_for_url_mut(&url) {
                    card.mark_failed();
                }
            }
        }
        self.mark_dirty();
    }

    fn perform(&mut self, action: Action) {
        if let Some(effect) = self.gallery.dispatch(action) {
            self.run_effect(effect);
        }
        self.after_gallery_change();
    }

    fn run_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Download { url, filename } => self.start_download(url, filename),
            Effect::OpenUrl { url } => self.open_url(&url),
        }
    }

    fn start_download(&mut self, url: String, filename: String) {
        let Some(downloader) = self.downloader.clone() else {
            self.open_url(&url);
            return;
        };
        self.downloads_in_flight += 1;
        self.status_message = format!("Downloading {filename}…");
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let outcome =
                downloader.download_with_fallback(&url, &filename, download::open_in_browser);
            let _ = tx.send(AsyncResponse::Download { filename, outcome });
        });
    }

    fn open_url(&mut self, url: &str) {
        match webbrowser::open(url) {
            Ok(_) => {
                self.status_message = "Opened in your browser.".to_string();
            }
            Err(err) => {
                tracing::warn!(url, error = %err, "failed to open browser");
                self.status_message = format!("Failed to open browser: {err} (URL: {url})");
            }
        }
        self.mark_dirty();
    }

    fn press(&mut self, button: &Button, unavailable: &str) {
        match button.press() {
            Some(action) => self.perform(action),
            None => {
                self.status_message = unavailable.to_string();
                self.mark_dirty();
            }
        }
    }

    fn handle_key(&mut self, code: KeyCode, now: Instant) -> Result<bool> {
        if self.gallery.view().about.open {
            return Ok(self.handle_about_key(code));
        }
        if self.gallery.modal_shown() {
            return Ok(self.handle_viewer_key(code));
        }
        if self.search_focused {
            self.handle_search_key(code, now);
            return Ok(false);
        }

        let columns = self.frame.grid_columns.max(1) as isize;
        match code {
            KeyCode::Char('q') => return Ok(true),
            KeyCode::Char('/') => {
                self.search_focused = true;
                self.status_message = "Type to filter by name. Enter or Esc to finish.".into();
            }
            KeyCode::Esc => {
                if !self.search.text().is_empty() {
                    self.search.clear(now);
                    self.sync_search_input();
                }
            }
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(-1),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(1),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-columns),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(columns),
            KeyCode::PageUp => self.move_selection(-columns * self.frame.grid_rows.max(1) as isize),
            KeyCode::PageDown => {
                self.move_selection(columns * self.frame.grid_rows.max(1) as isize)
            }
            KeyCode::Home => self.gallery.view_mut().gallery.selected = 0,
            KeyCode::End => {
                let grid = &mut self.gallery.view_mut().gallery;
                grid.selected = grid.cards.len().saturating_sub(1);
            }
            KeyCode::Enter => {
                if let Some(action) = self.gallery.view().gallery.selected_card().map(|c| c.activate()) {
                    self.perform(action);
                }
            }
            KeyCode::Char('v') => {
                let button = self.gallery.view().view.clone();
                self.press(&button, "Nothing to view.");
            }
            KeyCode::Char('d') => {
                let button = self.gallery.view().download.clone();
                self.press(&button, "Nothing to download.");
            }
            KeyCode::Char('s') => {
                let button = self.gallery.view().shuffle.clone();
                self.press(&button, "Nothing to shuffle.");
            }
            KeyCode::Char('a') => self.perform(Action::ShowAbout),
            _ => {}
        }
        self.mark_dirty();
        Ok(false)
    }

    fn handle_viewer_key(&mut self, code: KeyCode) -> bool {
        let key = match code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => Some(ModalKey::Escape),
            KeyCode::Left | KeyCode::Char('h') => Some(ModalKey::ArrowLeft),
            KeyCode::Right | KeyCode::Char('l') => Some(ModalKey::ArrowRight),
            KeyCode::Char('d') => {
                let button = self.gallery.view().modal.download.clone();
                self.press(&button, "Nothing to download.");
                None
            }
            KeyCode::Char('o') => {
                let button = self.gallery.view().modal.open_original.clone();
                self.press(&button, "Nothing to open.");
                None
            }
            _ => None,
        };
        if let Some(key) = key {
            self.gallery.handle_modal_key(key);
            self.after_gallery_change();
        }
        false
    }

    fn handle_about_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('a') => {
                let button = self.gallery.view().about.close.clone();
                self.press(&button, "");
            }
            KeyCode::Char('o') => {
                let url = self.source.repo_url();
                self.open_url(&url);
            }
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, code: KeyCode, now: Instant) {
        match code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Tab => {
                self.search_focused = false;
                self.status_message.clear();
            }
            KeyCode::Backspace => self.search.backspace(now),
            KeyCode::Char(ch) => self.search.insert_char(ch, now),
            _ => {}
        }
        self.sync_search_input();
    }

    fn sync_search_input(&mut self) {
        let text = self.search.text().to_string();
        self.gallery.view_mut().search_input = text;
        self.mark_dirty();
    }

    fn move_selection(&mut self, delta: isize) {
        let grid = &mut self.gallery.view_mut().gallery;
        if grid.cards.is_empty() {
            return;
        }
        let last = grid.cards.len() as isize - 1;
        grid.selected = (grid.selected as isize + delta).clamp(0, last) as usize;
    }

    fn handle_mouse(&mut self, event: MouseEvent) -> Result<()> {
        match event.kind {
            MouseEventKind::Down(MouseButton::Left) => self.handle_click(event.column, event.row),
            MouseEventKind::ScrollDown if !self.gallery.modal_shown() => {
                self.move_selection(self.frame.grid_columns.max(1) as isize);
            }
            MouseEventKind::ScrollUp if !self.gallery.modal_shown() => {
                self.move_selection(-(self.frame.grid_columns.max(1) as isize));
            }
            _ => return Ok(()),
        }
        self.mark_dirty();
        Ok(())
    }

    fn hit_at(&self, column: u16, row: u16) -> Option<Target> {
        self.hits
            .iter()
            .rev()
            .find(|hit| rect_contains(hit.area, column, row))
            .map(|hit| hit.target.clone())
    }

    fn handle_click(&mut self, column: u16, row: u16) {
        let target = self.hit_at(column, row);

        if self.gallery.view().about.open {
            if let Some(Target::Button(action)) = target {
                self.perform(action);
            }
            return;
        }

        if self.gallery.modal_shown() {
            match target {
                Some(Target::Button(action)) => self.perform(action),
                Some(Target::ModalContent) => self.gallery.click_modal_backdrop(true),
                _ => {
                    self.gallery.click_modal_backdrop(false);
                    self.after_gallery_change();
                }
            }
            return;
        }

        self.search_focused = matches!(target, Some(Target::SearchBar));
        match target {
            Some(Target::Card(position)) => {
                let action = {
                    let grid = &mut self.gallery.view_mut().gallery;
                    grid.selected = position;
                    grid.selected_card().map(|card| card.activate())
                };
                if let Some(action) = action {
                    self.perform(action);
                }
            }
            Some(Target::Button(action)) => self.perform(action),
            _ => {}
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let hero_height = (full.height / 3).clamp(7, 16);
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(hero_height),
                Constraint::Length(3),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let card_count = self.gallery.view().gallery.cards.len();
        let grid_title = if card_count == 0 {
            "Gallery".to_string()
        } else {
            format!("Gallery ({card_count})")
        };
        let grid_block = panel_block(grid_title, false);
        let grid_inner = grid_block.inner(layout[3]);
        let columns = (grid_inner.width / CARD_WIDTH).max(1) as usize;
        let rows = (grid_inner.height / CARD_HEIGHT).max(1) as usize;
        keep_selection_visible(&mut self.gallery.view_mut().gallery, columns, rows);

        let mut hits: Vec<Hit> = Vec::new();
        let mut state = FrameState {
            grid_columns: columns,
            grid_rows: rows,
            ..FrameState::default()
        };

        self.draw_status(frame, layout[0]);
        state.hero_image = self.draw_featured(frame, layout[1], &mut hits);
        self.draw_search(frame, layout[2], &mut hits);
        state.drawn_cards = self.draw_grid(frame, layout[3], grid_block, columns, rows, &mut hits);
        self.draw_footer(frame, layout[4]);

        if self.gallery.modal_shown() {
            state.modal_image = self.draw_modal(frame, full, &mut hits);
        }
        if self.gallery.view().about.open {
            self.draw_about(frame, full, &mut hits);
        }

        self.hits = hits;
        self.frame = state;
        self.needs_kitty_flush = true;
    }

    fn draw_status(&self, frame: &mut Frame<'_>, area: Rect) {
        let view = self.gallery.view();
        let mut text = format!(" {}", view.about_repo);
        if !self.status_message.is_empty() {
            text.push_str("  │  ");
            if self.is_loading() {
                text.push_str(self.spinner.frame());
                text.push(' ');
            }
            text.push_str(&self.status_message);
        }
        let status_line = Paragraph::new(text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, area);
    }

    fn draw_featured(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut Vec<Hit>) -> Option<Rect> {
        let view = self.gallery.view();
        let block = panel_block("Featured", false);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(inner);
        let image_area = chunks[0];

        if view.featured_loader.visible {
            let loading = Paragraph::new(format!("{} Loading…", self.spinner.frame()))
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .alignment(Alignment::Center);
            frame.render_widget(loading, centered_line(image_area));
            return None;
        }

        if let Some(slot) = view.hero.as_ref() {
            self.draw_image_slot(frame, image_area, slot);
        }

        if !view.feature_meta.aria_hidden {
            let meta_chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Length(1),
                    Constraint::Min(0),
                ])
                .split(chunks[1]);
            let name = Paragraph::new(view.feature_meta.name.clone()).style(
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            );
            frame.render_widget(name, meta_chunks[0]);
            let info = Paragraph::new(view.feature_meta.info.clone())
                .style(Style::default().fg(COLOR_TEXT_SECONDARY));
            frame.render_widget(info, meta_chunks[1]);
            draw_buttons(
                frame,
                meta_chunks[3],
                &[&view.view, &view.download, &view.shuffle],
                hits,
            );
        }

        view.hero.as_ref().map(|_| image_area)
    }

    fn draw_image_slot(&self, frame: &mut Frame<'_>, area: Rect, slot: &ImageSlot) {
        if self.kitty_enabled && self.inline_images.contains_key(&slot.src) {
            return;
        }
        let (text, style) = match self.thumbnails.get(&slot.src) {
            Some(Thumbnail::Failed) => (
                "Failed to load".to_string(),
                Style::default().fg(COLOR_ERROR),
            ),
            Some(Thumbnail::Loaded { width, height }) => (
                format!("{}\n{width}×{height}", slot.alt),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
            _ if self.media_handle.is_none() => {
                (slot.alt.clone(), Style::default().fg(COLOR_TEXT_SECONDARY))
            }
            _ => (
                format!("{} Loading image…", self.spinner.frame()),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
        };
        let lines = text.lines().count() as u16;
        let target = Rect {
            y: area.y + area.height.saturating_sub(lines) / 2,
            height: lines.min(area.height),
            ..area
        };
        let paragraph = Paragraph::new(text)
            .style(style)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, target);
    }

    fn draw_search(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut Vec<Hit>) {
        let block = panel_block("Search", self.search_focused);
        let text = self.gallery.view().search_input.clone();
        let line = if text.is_empty() && !self.search_focused {
            Line::from(Span::styled(
                "Press / to filter by name",
                Style::default()
                    .fg(COLOR_TEXT_DIMMED)
                    .add_modifier(Modifier::ITALIC),
            ))
        } else if self.search_focused {
            Line::from(vec![
                Span::styled(text, Style::default().fg(COLOR_TEXT_PRIMARY)),
                Span::styled("▏", Style::default().fg(COLOR_ACCENT)),
            ])
        } else {
            Line::from(Span::styled(text, Style::default().fg(COLOR_TEXT_PRIMARY)))
        };
        frame.render_widget(Paragraph::new(line).block(block), area);
        hits.push(Hit {
            area,
            target: Target::SearchBar,
        });
    }

    fn draw_grid(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        block: Block<'static>,
        columns: usize,
        rows: usize,
        hits: &mut Vec<Hit>,
    ) -> Range<usize> {
        let view = self.gallery.view();
        let grid = &view.gallery;
        let inner = block.inner(area);
        frame.render_widget(block, area);

        if view.page_loader.visible || view.loading_wrap.visible {
            let loading = Paragraph::new(format!("{} Loading gallery…", self.spinner.frame()))
                .style(Style::default().fg(COLOR_TEXT_SECONDARY))
                .alignment(Alignment::Center);
            frame.render_widget(loading, centered_line(inner));
            return 0..0;
        }

        if view.empty_state.visible || !grid.visible {
            let message = if self.search.text().trim().is_empty() {
                "No images to show."
            } else {
                "No images match your search."
            };
            let empty = Paragraph::new(message)
                .style(
                    Style::default()
                        .fg(COLOR_TEXT_SECONDARY)
                        .add_modifier(Modifier::ITALIC),
                )
                .alignment(Alignment::Center);
            frame.render_widget(empty, centered_line(inner));
            return 0..0;
        }

        let start = grid.scroll_row * columns;
        let end = grid.cards.len().min(start + rows * columns);
        for (position, card) in grid.cards.iter().enumerate().take(end).skip(start) {
            let offset = position - start;
            let card_area = Rect {
                x: inner.x + (offset % columns) as u16 * CARD_WIDTH,
                y: inner.y + (offset / columns) as u16 * CARD_HEIGHT,
                width: CARD_WIDTH.saturating_sub(1).min(inner.width),
                height: CARD_HEIGHT.min(inner.height),
            };
            let selected = position == grid.selected;
            let border = if selected {
                COLOR_BORDER_FOCUSED
            } else {
                COLOR_BORDER_IDLE
            };
            let text_color = if card.dimmed {
                COLOR_TEXT_DIMMED
            } else {
                COLOR_TEXT_PRIMARY
            };
            let background = if selected {
                COLOR_PANEL_SELECTED_BG
            } else {
                COLOR_PANEL_BG
            };
            let card_block = Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .style(Style::default().bg(background));
            let width = card_area.width.saturating_sub(2) as usize;

            let file = self.gallery.state().file(card.file_index);
            let title = file.map(FileEntry::display_title).unwrap_or(card.label.as_str());
            let subtitle = file.map(FileEntry::display_subtitle).unwrap_or_default();
            let status = match card.thumbnail {
                Thumbnail::Deferred => String::new(),
                Thumbnail::Loading => format!("{} loading", self.spinner.frame()),
                Thumbnail::Loaded { width, height } => format!("{width}×{height}"),
                Thumbnail::Failed => card.image.alt.clone(),
            };
            let status_color = if card.thumbnail == Thumbnail::Failed {
                COLOR_ERROR
            } else {
                COLOR_TEXT_SECONDARY
            };
            let mut title_style = Style::default().fg(text_color);
            if selected {
                title_style = title_style.add_modifier(Modifier::BOLD);
            }
            let text = Text::from(vec![
                Line::from(Span::styled(truncate(title, width), title_style)),
                Line::from(Span::styled(
                    truncate(&subtitle, width),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )),
                Line::from(Span::styled(
                    truncate(&status, width),
                    Style::default().fg(status_color),
                )),
            ]);
            frame.render_widget(Paragraph::new(text).block(card_block), card_area);
            hits.push(Hit {
                area: card_area,
                target: Target::Card(position),
            });
        }
        start..end
    }

    fn draw_footer(&self, frame: &mut Frame<'_>, area: Rect) {
        let view = self.gallery.view();
        let text = if view.about.open {
            "o: open repository · Esc: close · q: quit"
        } else if self.gallery.modal_shown() {
            "←/→: previous/next · d: download · o: open original · Esc: close · q: quit"
        } else if self.search_focused {
            "Type to filter · Backspace: delete · Enter/Esc: done"
        } else {
            "/: search · arrows/hjkl: move · Enter: open · v: view · d: download · s: shuffle · a: about · q: quit"
        };
        let footer = Paragraph::new(text)
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, area);
    }

    fn draw_modal(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut Vec<Hit>) -> Option<Rect> {
        let modal = &self.gallery.view().modal;
        let popup_area = centered_rect(90, 90, area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default()
            .title(Span::styled(
                modal.name.clone(),
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);
        hits.push(Hit {
            area: popup_area,
            target: Target::ModalContent,
        });

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(inner);

        if let Some(slot) = modal.image.as_ref() {
            self.draw_image_slot(frame, chunks[0], slot);
        }
        let position = match (self.gallery.modal_index(), self.gallery.state().len()) {
            (Some(index), total) if total > 0 => format!("  ({}/{total})", index + 1),
            _ => String::new(),
        };
        let meta = Paragraph::new(format!("{}{position}", modal.meta))
            .style(Style::default().fg(COLOR_TEXT_SECONDARY))
            .alignment(Alignment::Center);
        frame.render_widget(meta, chunks[1]);
        draw_buttons(
            frame,
            chunks[2],
            &[
                &modal.prev,
                &modal.next,
                &modal.download,
                &modal.open_original,
                &modal.close,
            ],
            hits,
        );

        modal.image.as_ref().map(|_| chunks[0])
    }

    fn draw_about(&self, frame: &mut Frame<'_>, area: Rect, hits: &mut Vec<Hit>) {
        let about = &self.gallery.view().about;
        let popup_area = centered_rect(60, 50, area);
        frame.render_widget(Clear, popup_area);
        let block = Block::default()
            .title(Span::styled(
                "About",
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD),
            ))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(COLOR_ACCENT))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .padding(Padding::uniform(1));
        let inner = block.inner(popup_area);
        frame.render_widget(block, popup_area);
        hits.push(Hit {
            area: popup_area,
            target: Target::AboutContent,
        });

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let body = Text::from(vec![
            Line::from(Span::styled(
                format!("repo-gallery {}", crate::VERSION),
                Style::default()
                    .fg(COLOR_TEXT_PRIMARY)
                    .add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                format!("Browsing images from {}", location_label(&self.source)),
                Style::default().fg(COLOR_TEXT_PRIMARY),
            )),
            Line::from(Span::styled(
                self.source.repo_url(),
                Style::default().fg(COLOR_ACCENT),
            )),
            Line::default(),
            Line::from(Span::styled(
                "/ search · Enter open · v view · d download · s shuffle · ←/→ browse the viewer",
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
            Line::from(Span::styled(
                format!("Config: {}", self.config_path),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            )),
        ]);
        frame.render_widget(Paragraph::new(body).wrap(Wrap { trim: false }), chunks[0]);

        let open_repo = Button::new(
            "Open repository",
            Some(Action::OpenOriginal {
                url: self.source.repo_url(),
            }),
        );
        draw_buttons(frame, chunks[1], &[&open_repo, &about.close], hits);
    }

    /// Places the hero or modal image through the kitty protocol after the
    /// text frame has been drawn.
    fn flush_inline_images<W: Write>(&mut self, backend: &mut W) -> Result<()> {
        if !self.kitty_enabled || !self.needs_kitty_flush {
            return Ok(());
        }
        self.needs_kitty_flush = false;

        let view = self.gallery.view();
        let target = if view.about.open {
            None
        } else if view.modal.shown {
            view.modal.image.clone().zip(self.frame.modal_image)
        } else {
            view.hero.clone().zip(self.frame.hero_image)
        };
        let Some((slot, area)) = target else {
            return self.clear_active_kitty(backend);
        };
        let Some(image) = self.inline_images.get(&slot.src).cloned() else {
            return self.clear_active_kitty(backend);
        };

        let (cols, rows) = kitty::fit_cells(image.width, image.height, area.width, area.height);
        let id = kitty::image_id(&slot.src, cols, rows);
        let col = area.x + area.width.saturating_sub(cols) / 2;
        let row = area.y + area.height.saturating_sub(rows) / 2;
        if self
            .active_kitty
            .as_ref()
            .is_some_and(|active| active.id == id && active.col == col && active.row == row)
        {
            return Ok(());
        }
        self.clear_active_kitty(backend)?;

        if !self.kitty_images.contains_key(&id) {
            match kitty::transmit_inline(&image.bytes, cols, rows, id) {
                Ok(kitty) => {
                    if self.kitty_images.len() >= KITTY_CACHE_MAX {
                        self.kitty_images.clear();
                    }
                    self.kitty_images.insert(id, kitty);
                }
                Err(err) => {
                    tracing::warn!(url = %slot.src, error = ?err, "inline image encode failed");
                    self.inline_images.remove(&slot.src);
                    self.mark_dirty();
                    return Ok(());
                }
            }
        }
        let Some(kitty) = self.kitty_images.get_mut(&id) else {
            return Ok(());
        };
        kitty.ensure_transmitted(backend)?;
        crossterm::queue!(backend, MoveTo(col, row), Print(kitty.placement_sequence()))?;
        backend.flush()?;
        self.active_kitty = Some(ActiveKitty {
            id,
            col,
            row,
            wrap_tmux: kitty.wraps_tmux(),
        });
        Ok(())
    }

    fn clear_active_kitty<W: Write>(&mut self, backend: &mut W) -> Result<()> {
        if let Some(active) = self.active_kitty.take() {
            let sequence = kitty::delete_sequence_for(active.id, active.wrap_tmux);
            backend.write_all(sequence.as_bytes())?;
            backend.flush()?;
        }
        Ok(())
    }
}

fn location_label(source: &SourceConfig) -> String {
    let folder = source.folder.trim_matches('/');
    if folder.is_empty() {
        source.slug()
    } else {
        format!("{}/{folder}", source.slug())
    }
}

fn panel_block(title: impl Into<String>, focused: bool) -> Block<'static> {
    let (border, title_style) = if focused {
        (
            COLOR_BORDER_FOCUSED,
            Style::default()
                .fg(COLOR_ACCENT)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        (COLOR_BORDER_IDLE, Style::default().fg(COLOR_TEXT_SECONDARY))
    };
    Block::default()
        .title(Span::styled(title.into(), title_style))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(COLOR_PANEL_BG))
}

fn draw_buttons(frame: &mut Frame<'_>, area: Rect, buttons: &[&Button], hits: &mut Vec<Hit>) {
    let mut x = area.x;
    let right = area.x.saturating_add(area.width);
    for button in buttons {
        let label = format!("[ {} ]", button.label);
        let width = label.width() as u16;
        if x.saturating_add(width) > right {
            break;
        }
        let button_area = Rect {
            x,
            y: area.y,
            width,
            height: 1.min(area.height),
        };
        let style = if button.enabled {
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(COLOR_TEXT_DIMMED)
        };
        frame.render_widget(Paragraph::new(label).style(style), button_area);
        if let Some(action) = button.press() {
            hits.push(Hit {
                area: button_area,
                target: Target::Button(action),
            });
        }
        x = x.saturating_add(width + 1);
    }
}

fn keep_selection_visible(grid: &mut Grid, columns: usize, rows: usize) {
    if grid.cards.is_empty() {
        grid.selected = 0;
        grid.scroll_row = 0;
        return;
    }
    grid.selected = grid.selected.min(grid.cards.len() - 1);
    let selected_row = grid.selected / columns;
    if selected_row < grid.scroll_row {
        grid.scroll_row = selected_row;
    } else if selected_row >= grid.scroll_row + rows {
        grid.scroll_row = selected_row + 1 - rows;
    }
}

fn rect_contains(area: Rect, column: u16, row: u16) -> bool {
    column >= area.x
        && column < area.x.saturating_add(area.width)
        && row >= area.y
        && row < area.y.saturating_add(area.height)
}

fn centered_line(area: Rect) -> Rect {
    Rect {
        y: area.y + area.height / 2,
        height: 1.min(area.height),
        ..area
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn truncate(text: &str, width: usize) -> String {
    if text.width() <= width {
        return text.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let ch_width = ch.width().unwrap_or(0);
        if used + ch_width + 1 > width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MockListingService;
    use crate::state::entry;
    use ratatui::backend::TestBackend;

    fn options() -> Options {
        Options {
            source: SourceConfig::default(),
            search_debounce: Duration::from_millis(200),
            reveal_delay: Duration::from_millis(300),
            listing_service: Arc::new(MockListingService::new(Vec::new())),
            media_handle: None,
            downloader: None,
            config_path: "(defaults)".into(),
            inline_images: false,
        }
    }

    fn loaded(names: &[&str]) -> (Model, Instant) {
        let mut model = Model::new(options());
        let start = Instant::now();
        let files = names.iter().map(|name| entry(name, Some(1024))).collect();
        model.apply_listing(files, start);
        let now = start + Duration::from_millis(300);
        assert!(model.tick(now));
        (model, now)
    }

    fn draw(model: &mut Model) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|frame| model.draw(frame)).unwrap();
        terminal
    }

    #[test]
    fn listing_is_revealed_after_delay() {
        let mut model = Model::new(options());
        let start = Instant::now();
        model.apply_listing(vec![entry("a.png", None), entry("b.png", None)], start);
        assert!(!model.tick(start + Duration::from_millis(100)));
        assert!(model.gallery.view().gallery.cards.is_empty());
        assert!(model.tick(start + Duration::from_millis(300)));
        assert_eq!(model.gallery.view().gallery.cards.len(), 2);
        assert!(model.gallery.state().current().is_some());
        assert_eq!(model.status_message, "2 images in mayank19o7/wallpapers.");
    }

    #[test]
    fn empty_listing_reports_in_status() {
        let mut model = Model::new(options());
        model.apply_listing(Vec::new(), Instant::now());
        assert!(model.gallery.view().empty_state.visible);
        assert_eq!(model.status_message, "No images found in mayank19o7/wallpapers.");
        assert_eq!(model.next_deadline(), None);
    }

    #[test]
    fn typing_filters_after_pause() {
        let (mut model, now) = loaded(&["sunset.png", "forest.png", "sunrise.jpg"]);
        model.handle_key(KeyCode::Char('/'), now).unwrap();
        model.handle_key(KeyCode::Char('s'), now).unwrap();
        model.handle_key(KeyCode::Char('u'), now + Duration::from_millis(50)).unwrap();
        assert_eq!(model.gallery.view().search_input, "su");
        assert!(!model.tick(now + Duration::from_millis(200)));
        assert_eq!(model.gallery.view().gallery.cards.len(), 3);
        assert!(model.tick(now + Duration::from_millis(250)));
        assert_eq!(model.gallery.view().gallery.cards.len(), 2);
    }

    #[test]
    fn q_types_into_search_instead_of_quitting() {
        let (mut model, now) = loaded(&["a.png"]);
        model.handle_key(KeyCode::Char('/'), now).unwrap();
        assert!(!model.handle_key(KeyCode::Char('q'), now).unwrap());
        model.handle_key(KeyCode::Esc, now).unwrap();
        assert!(model.handle_key(KeyCode::Char('q'), now).unwrap());
    }

    #[test]
    fn enter_opens_viewer_and_arrows_wrap() {
        let (mut model, now) = loaded(&["a.png", "b.png", "c.png"]);
        model.handle_key(KeyCode::Enter, now).unwrap();
        assert_eq!(model.gallery.modal_index(), Some(0));
        model.handle_key(KeyCode::Left, now).unwrap();
        assert_eq!(model.gallery.modal_index(), Some(2));
        assert_eq!(model.gallery.view().modal.name, "c");
        model.handle_key(KeyCode::Esc, now).unwrap();
        assert!(!model.gallery.modal_shown());
        assert!(model.gallery.view().modal.image.is_none());
    }

    #[test]
    fn about_dialog_opens_and_closes() {
        let (mut model, now) = loaded(&["a.png"]);
        model.handle_key(KeyCode::Char('a'), now).unwrap();
        assert!(model.gallery.view().about.open);
        draw(&mut model);
        assert!(model
            .hits
            .iter()
            .any(|hit| hit.target == Target::Button(Action::CloseAbout)));
        model.handle_key(KeyCode::Esc, now).unwrap();
        assert!(!model.gallery.view().about.open);
    }

    #[test]
    fn clicking_card_opens_viewer_and_backdrop_closes_it() {
        let (mut model, _) = loaded(&["a.png", "b.png"]);
        draw(&mut model);
        let card = model
            .hits
            .iter()
            .find(|hit| hit.target == Target::Card(1))
            .map(|hit| hit.area)
            .unwrap();
        model.handle_click(card.x + 1, card.y + 1);
        assert_eq!(model.gallery.modal_index(), Some(1));

        draw(&mut model);
        model.handle_click(60, 20);
        assert!(model.gallery.modal_shown());
        model.handle_click(0, 0);
        assert!(!model.gallery.modal_shown());
    }

    #[test]
    fn failed_images_stay_failed_across_renders() {
        let (mut model, now) = loaded(&["a.png", "b.png"]);
        model.apply_media_result(media::ResultEntry {
            url: "https://raw.example/a.png".into(),
            image: Err(anyhow!("404")),
        });
        let card = &model.gallery.view().gallery.cards[0];
        assert!(card.dimmed);
        assert_eq!(card.image.alt, "Failed to load");

        model.handle_key(KeyCode::Char('/'), now).unwrap();
        model.handle_key(KeyCode::Char('a'), now).unwrap();
        model.tick(now + Duration::from_millis(200));
        let card = &model.gallery.view().gallery.cards[0];
        assert_eq!(card.thumbnail, Thumbnail::Failed);
        assert!(card.dimmed);
    }

    #[test]
    fn disabled_featured_controls_report_instead_of_acting() {
        let (mut model, now) = loaded(&["a.png"]);
        model.handle_key(KeyCode::Char('/'), now).unwrap();
        model.handle_key(KeyCode::Char('z'), now).unwrap();
        model.handle_key(KeyCode::Enter, now).unwrap();
        model.tick(now + Duration::from_millis(200));
        model.handle_key(KeyCode::Char('v'), now).unwrap();
        assert!(!model.gallery.modal_shown());
        assert_eq!(model.status_message, "Nothing to view.");
    }

    #[test]
    fn selection_scrolls_into_view() {
        let mut grid = Grid::default();
        grid.cards = (0..20)
            .map(|i| {
                let file = entry(&format!("{i}.png"), None);
                crate::view::Card {
                    file_index: i,
                    label: file.name.clone(),
                    image: ImageSlot {
                        src: file.download_url.clone(),
                        alt: file.name,
                    },
                    thumbnail: Thumbnail::Deferred,
                    dimmed: false,
                }
            })
            .collect();
        grid.selected = 13;
        keep_selection_visible(&mut grid, 4, 2);
        assert_eq!(grid.scroll_row, 2);
        grid.selected = 1;
        keep_selection_visible(&mut grid, 4, 2);
        assert_eq!(grid.scroll_row, 0);
    }

    #[test]
    fn truncate_respects_width() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-name", 6), "a-ver…");
    }
}
