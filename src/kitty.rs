//! Inline images through the kitty graphics protocol.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::env;
use std::hash::{Hash, Hasher};
use std::io::{self, Cursor, Write};
use std::sync::OnceLock;

use anyhow::{bail, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use crossterm::terminal::window_size;
use image::ImageFormat;
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span, Text};

const KITTY_CHUNK_SIZE: usize = 4096;
const FORCE_ENV: &str = "REPO_GALLERY_FORCE_KITTY";
const DISABLE_ENV: &str = "REPO_GALLERY_DISABLE_KITTY";

#[derive(Clone)]
pub struct KittyImage {
    pub id: u32,
    pub cols: u16,
    pub rows: u16,
    transmit_chunks: Vec<String>,
    transmitted: bool,
    wrap_tmux: bool,
}

impl KittyImage {
    pub fn ensure_transmitted<W: Write>(&mut self, writer: &mut W) -> io::Result<()> {
        if self.transmitted {
            return Ok(());
        }
        for chunk in &self.transmit_chunks {
            writer.write_all(chunk.as_bytes())?;
        }
        writer.flush()?;
        self.transmitted = true;
        Ok(())
    }

    pub fn placement_sequence(&self) -> String {
        let base = format!(
            "\x1b_Ga=p,q=2,C=1,i={},c={},r={};\x1b\\",
            self.id, self.cols, self.rows
        );
        wrap_for_tmux(base, self.wrap_tmux)
    }

    pub fn wraps_tmux(&self) -> bool {
        self.wrap_tmux
    }
}

pub fn delete_sequence_for(id: u32, wrap_tmux: bool) -> String {
    wrap_for_tmux(format!("\x1b_Ga=d,q=2,i={id};\x1b\\"), wrap_tmux)
}

fn wrap_for_tmux(base: String, wrap_tmux: bool) -> String {
    if wrap_tmux {
        format!("\x1bPtmux;\x1b{base}\x1b\\")
    } else {
        base
    }
}

#[derive(Clone, Copy)]
struct CellMetrics {
    width: f64,
    height: f64,
}

fn terminal_cell_metrics() -> CellMetrics {
    static METRICS: OnceLock<CellMetrics> = OnceLock::new();
    *METRICS.get_or_init(|| {
        window_size().ok().map_or(
            CellMetrics {
                width: 1.0,
                height: 1.0,
            },
            |size| {
                let columns = size.columns.max(1) as f64;
                let rows = size.rows.max(1) as f64;
                let width = if size.width > 0 {
                    f64::from(size.width) / columns
                } else {
                    1.0
                };
                let height = if size.height > 0 {
                    f64::from(size.height) / rows
                } else {
                    1.0
                };
                CellMetrics { width, height }
            },
        )
    })
}

fn env_truthy(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim(), "1" | "true" | "TRUE" | "True" | "yes" | "YES"))
        .unwrap_or(false)
}

fn running_inside_tmux() -> bool {
    let in_tmux = env::var("TMUX").map(|v| !v.is_empty()).unwrap_or(false)
        || env::var("TMUX_PANE").map(|v| !v.is_empty()).unwrap_or(false);

    in_tmux
        || env::var("TERM")
            .map(|term| term.to_ascii_lowercase().contains("tmux"))
            .unwrap_or(false)
}

pub fn is_kitty_terminal() -> bool {
    if env_truthy(DISABLE_ENV) {
        return false;
    }
    if env_truthy(FORCE_ENV) {
        return true;
    }
    if running_inside_tmux() {
        return false;
    }
    if env::var("KITTY_WINDOW_ID")
        .map(|v| !v.is_empty())
        .unwrap_or(false)
    {
        return true;
    }
    if env::var("WEZTERM_PANE").map(|v| !v.is_empty()).unwrap_or(false) {
        return true;
    }
    if env::var("TERM_PROGRAM")
        .map(|term| term.to_lowercase().contains("wezterm"))
        .unwrap_or(false)
    {
        return true;
    }
    env::var("TERM")
        .map(|term| {
            let lower = term.to_lowercase();
            lower.contains("kitty") || lower.contains("wezterm")
        })
        .unwrap_or(false)
}

pub fn image_id(url: &str, cols: u16, rows: u16) -> u32 {
    let mut hasher = DefaultHasher::new();
    url.hash(&mut hasher);
    cols.hash(&mut hasher);
    rows.hash(&mut hasher);
    // Zero is not a valid kitty image id.
    ((hasher.finish() & 0xFFFF_FFFF) as u32).max(1)
}

/// Fits a `width`x`height` pixel image into at most `max_cols`x`max_rows`
/// cells, keeping its aspect ratio and never scaling up.
pub fn fit_cells(width: u32, height: u32, max_cols: u16, max_rows: u16) -> (u16, u16) {
    let metrics = terminal_cell_metrics();
    fit_cells_with(width, height, max_cols, max_rows, metrics.width, metrics.height)
}

fn fit_cells_with(
    width: u32,
    height: u32,
    max_cols: u16,
    max_rows: u16,
    cell_width: f64,
    cell_height: f64,
) -> (u16, u16) {
    let max_cols = max_cols.max(1);
    let max_rows = max_rows.max(1);
    let native_cols = f64::from(width.max(1)) / cell_width.max(1.0);
    let native_rows = f64::from(height.max(1)) / cell_height.max(1.0);

    let scale_x = f64::from(max_cols) / native_cols;
    let scale_y = f64::from(max_rows) / native_rows;
    let mut scale = scale_x.min(scale_y);
    if scale > 1.0 || scale <= 0.0 {
        scale = 1.0;
    }

    let cols = (native_cols * scale).round() as u16;
    let rows = (native_rows * scale).round() as u16;
    (cols.clamp(1, max_cols), rows.clamp(1, max_rows))
}

fn encode_png(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    if bytes.is_empty() {
        bail!("image had no bytes");
    }

    if matches!(image::guess_format(bytes), Ok(ImageFormat::Png)) {
        return Ok(Cow::Borrowed(bytes));
    }

    let image = image::load_from_memory(bytes).context("decode image")?;
    let mut png_bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut png_bytes), ImageFormat::Png)
        .context("encode image as png")?;
    Ok(Cow::Owned(png_bytes))
}

pub fn transmit_inline(bytes: &[u8], cols: u16, rows: u16, image_id: u32) -> Result<KittyImage> {
    let png_data = encode_png(bytes)?;

    let encoded = general_purpose::STANDARD.encode(png_data.as_ref());
    if encoded.is_empty() {
        bail!("failed to encode image");
    }

    let wrap_tmux = running_inside_tmux();
    let mut chunks: Vec<String> = Vec::new();
    let mut offset = 0;
    while offset < encoded.len() {
        let end = usize::min(offset + KITTY_CHUNK_SIZE, encoded.len());
        let more = if end < encoded.len() { 1 } else { 0 };
        let header = if offset == 0 {
            format!("\x1b_Ga=t,q=2,i={image_id},f=100,m={more};")
        } else {
            format!("\x1b_Ga=t,q=2,i={image_id},m={more};")
        };
        let chunk = format!("{header}{}\x1b\\", &encoded[offset..end]);
        chunks.push(wrap_for_tmux(chunk, wrap_tmux));
        offset = end;
    }

    Ok(KittyImage {
        id: image_id,
        cols: cols.max(1),
        rows: rows.max(1),
        transmit_chunks: chunks,
        transmitted: false,
        wrap_tmux,
    })
}

/// Blank cells reserving room for a placed image, followed by a caption.
pub fn placeholder_text(cols: u16, rows: u16, label: &str) -> Text<'static> {
    let row_line = " ".repeat(cols.max(1) as usize);
    let mut lines: Vec<Line<'static>> = (0..rows.max(1))
        .map(|_| Line::from(row_line.clone()))
        .collect();
    lines.push(Line::from(Span::styled(
        format!("[image: {label}]"),
        Style::default().fg(Color::Rgb(166, 173, 200)),
    )));
    Text::from(lines)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_matches_dimensions() {
        let placeholder = placeholder_text(4, 2, "example");
        assert_eq!(placeholder.lines.len(), 3);
        assert_eq!(placeholder.lines[0].spans[0].content.as_ref(), "    ");
        assert_eq!(
            placeholder.lines[2].spans[0].content.as_ref(),
            "[image: example]"
        );
    }

    #[test]
    fn fit_keeps_aspect_and_bounds() {
        let (cols, rows) = fit_cells_with(1920, 1080, 40, 20, 10.0, 20.0);
        assert!(cols <= 40 && rows <= 20);
        assert_eq!((cols, rows), (40, 11));
    }

    #[test]
    fn fit_never_scales_up() {
        assert_eq!(fit_cells_with(20, 40, 40, 20, 10.0, 20.0), (2, 2));
    }

    #[test]
    fn image_id_is_never_zero_and_stable() {
        let a = image_id("https://x/a.png", 10, 5);
        assert_ne!(a, 0);
        assert_eq!(a, image_id("https://x/a.png", 10, 5));
        assert_ne!(a, image_id("https://x/a.png", 11, 5));
    }

    #[test]
    fn delete_sequence_wraps_for_tmux() {
        assert_eq!(delete_sequence_for(7, false), "\x1b_Ga=d,q=2,i=7;\x1b\\");
        assert!(delete_sequence_for(7, true).starts_with("\x1bPtmux;"));
    }
}
