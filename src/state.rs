#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub name: String,
    pub path: String,
    pub size: Option<u64>,
    pub download_url: String,
    pub kind: String,
}

impl FileEntry {
    /// Name up to the first `.`: `"a.b.png"` becomes `"a"`.
    pub fn display_title(&self) -> &str {
        self.name.split('.').next().unwrap_or_default()
    }

    pub fn extension_label(&self) -> String {
        self.name
            .rsplit('.')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }

    pub fn display_subtitle(&self) -> String {
        format!(
            "{} • {}",
            human_file_size(self.size.unwrap_or(0)),
            self.extension_label()
        )
    }
}

const SIZE_UNITS: [&str; 8] = ["KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

pub fn human_file_size(bytes: u64) -> String {
    const THRESH: f64 = 1024.0;
    if (bytes as f64) < THRESH {
        return format!("{bytes} B");
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    value /= THRESH;
    while value >= THRESH && unit < SIZE_UNITS.len() - 1 {
        value /= THRESH;
        unit += 1;
    }
    format!("{value:.1} {}", SIZE_UNITS[unit])
}

#[derive(Debug, Clone, Default)]
pub struct GalleryState {
    files: Vec<FileEntry>,
    visible: Vec<usize>,
    current: Option<usize>,
}

impl GalleryState {
    pub fn new(files: Vec<FileEntry>) -> Self {
        let visible = (0..files.len()).collect();
        Self {
            files,
            visible,
            current: None,
        }
    }

    pub fn files(&self) -> &[FileEntry] {
        &self.files
    }

    pub fn file(&self, index: usize) -> Option<&FileEntry> {
        self.files.get(index)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn visible(&self) -> &[usize] {
        &self.visible
    }

    pub fn visible_files(&self) -> impl Iterator<Item = &FileEntry> + '_ {
        self.visible.iter().filter_map(|&index| self.files.get(index))
    }

    pub fn is_visible(&self, index: usize) -> bool {
        self.visible.contains(&index)
    }

    pub fn current(&self) -> Option<usize> {
        self.current
    }

    pub fn current_file(&self) -> Option<&FileEntry> {
        self.current.and_then(|index| self.files.get(index))
    }

    /// Ignores indices outside the list so `current` always names a file.
    pub fn set_current(&mut self, index: usize) -> bool {
        if index < self.files.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.files.iter().position(|file| file.name == name)
    }

    pub fn show_all(&mut self) {
        self.visible = (0..self.files.len()).collect();
    }

    /// Keeps the entries whose lower-cased name contains `query`, which the
    /// caller has already lower-cased and trimmed.
    pub fn retain_matching(&mut self, query: &str) {
        self.visible = self
            .files
            .iter()
            .enumerate()
            .filter(|(_, file)| file.name.to_lowercase().contains(query))
            .map(|(index, _)| index)
            .collect();
    }

    /// Wraps around either end; `None` counts as position -1.
    pub fn cycle_index(&self, delta: i64) -> Option<usize> {
        let len = self.files.len() as i64;
        if len == 0 {
            return None;
        }
        let base = self.current.map(|index| index as i64).unwrap_or(-1);
        Some((base + delta + len).rem_euclid(len) as usize)
    }
}

#[cfg(test)]
pub(crate) fn entry(name: &str, size: Option<u64>) -> FileEntry {
    FileEntry {
        name: name.to_string(),
        path: name.to_string(),
        size,
        download_url: format!("https://raw.example/{name}"),
        kind: "file".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn human_sizes() {
        assert_eq!(human_file_size(0), "0 B");
        assert_eq!(human_file_size(1023), "1023 B");
        assert_eq!(human_file_size(2048), "2.0 KB");
        assert_eq!(human_file_size(1536), "1.5 KB");
        assert_eq!(human_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(human_file_size(u64::MAX), "16.0 EB");
    }

    #[test]
    fn title_stops_at_first_dot() {
        let file = entry("sunset.beach.jpeg", Some(10));
        assert_eq!(file.display_title(), "sunset");
        assert_eq!(file.extension_label(), "JPEG");
        assert_eq!(file.display_subtitle(), "10 B • JPEG");
    }

    #[test]
    fn subtitle_with_unknown_size() {
        let file = entry("a.png", None);
        assert_eq!(file.display_subtitle(), "0 B • PNG");
    }

    #[test]
    fn retain_matching_is_sound_and_complete() {
        let mut state = GalleryState::new(vec![
            entry("Red-Fox.png", None),
            entry("blue.jpg", None),
            entry("fox_den.webp", None),
        ]);
        state.retain_matching("fox");
        assert_eq!(state.visible(), &[0, 2]);
        state.show_all();
        assert_eq!(state.visible(), &[0, 1, 2]);
    }

    #[test]
    fn cycle_wraps_both_ends() {
        let mut state = GalleryState::new(vec![
            entry("a.png", None),
            entry("b.png", None),
            entry("c.png", None),
        ]);
        state.set_current(0);
        assert_eq!(state.cycle_index(-1), Some(2));
        state.set_current(2);
        assert_eq!(state.cycle_index(1), Some(0));
        assert_eq!(GalleryState::default().cycle_index(1), None);
    }

    #[test]
    fn set_current_rejects_out_of_range() {
        let mut state = GalleryState::new(vec![entry("a.png", None)]);
        assert!(!state.set_current(3));
        assert_eq!(state.current(), None);
        assert!(state.set_current(0));
        assert_eq!(state.current_file().map(|f| f.name.as_str()), Some("a.png"));
    }
}
