use std::time::{Duration, Instant};

use crate::debounce::Debouncer;
use crate::gallery::Gallery;

#[derive(Debug)]
pub struct SearchBox {
    text: String,
    debouncer: Debouncer<String>,
}

impl SearchBox {
    pub fn new(interval: Duration) -> Self {
        Self {
            text: String::new(),
            debouncer: Debouncer::new(interval),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn insert_char(&mut self, ch: char, now: Instant) {
        self.text.push(ch);
        self.changed(now);
    }

    pub fn backspace(&mut self, now: Instant) {
        if self.text.pop().is_some() {
            self.changed(now);
        }
    }

    pub fn clear(&mut self, now: Instant) {
        if !self.text.is_empty() {
            self.text.clear();
            self.changed(now);
        }
    }

    fn changed(&mut self, now: Instant) {
        self.debouncer.input(normalize_query(&self.text), now);
    }

    pub fn take_due(&mut self, now: Instant) -> Option<String> {
        self.debouncer.take_due(now)
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debouncer.deadline()
    }
}

pub fn normalize_query(raw: &str) -> String {
    raw.trim().to_lowercase()
}

impl Gallery {
    /// Recomputes the visible subset for `query` and keeps the featured
    /// banner consistent with it.
    pub fn filter_files(&mut self, query: &str) {
        let query = normalize_query(query);

        if query.is_empty() {
            self.state.show_all();
            self.render_visible();
            self.pick_featured();
            return;
        }

        self.state.retain_matching(&query);
        self.render_visible();

        if self.state.visible().is_empty() {
            self.show_no_featured_message();
            return;
        }

        match self.state.current() {
            Some(current) if self.state.is_visible(current) => self.show_featured(current),
            _ => self.pick_featured(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::seeded;
    use crate::state::entry;

    fn names(gallery: &Gallery) -> Vec<String> {
        gallery
            .state()
            .visible_files()
            .map(|file| file.name.clone())
            .collect()
    }

    fn sample() -> Gallery {
        seeded(
            vec![
                entry("Sunset.png", Some(100)),
                entry("sunrise.jpg", Some(200)),
                entry("forest.webp", Some(300)),
                entry("SUNFLOWER.gif", Some(400)),
            ],
            7,
        )
    }

    #[test]
    fn matches_are_case_insensitive_substrings() {
        let mut gallery = sample();
        gallery.filter_files("  SUN ");
        assert_eq!(names(&gallery), vec!["Sunset.png", "sunrise.jpg", "SUNFLOWER.gif"]);
        assert_eq!(gallery.view().gallery.cards.len(), 3);
    }

    #[test]
    fn empty_query_restores_everything() {
        let mut gallery = sample();
        gallery.filter_files("forest");
        gallery.filter_files("");
        assert_eq!(gallery.state().visible(), &[0, 1, 2, 3]);
        gallery.filter_files("   ");
        assert_eq!(gallery.state().visible(), &[0, 1, 2, 3]);
        assert_eq!(gallery.view().gallery.cards.len(), 4);
        assert!(gallery.view().download.enabled);
    }

    #[test]
    fn no_matches_disables_featured_controls() {
        let mut gallery = sample();
        gallery.filter_files("zz");
        let view = gallery.view();
        assert!(gallery.state().visible().is_empty());
        assert_eq!(view.feature_meta.name, "No image found");
        assert_eq!(view.feature_meta.info, "Try a different search.");
        assert!(view.hero.is_none());
        assert!(!view.view.enabled);
        assert!(!view.download.enabled);
        assert!(view.empty_state.visible);
        assert_eq!(view.view.press(), None);
    }

    #[test]
    fn featured_kept_when_still_visible() {
        let mut gallery = sample();
        gallery.state.set_current(1);
        gallery.show_featured(1);
        gallery.filter_files("sun");
        assert_eq!(gallery.state().current(), Some(1));
        assert_eq!(gallery.view().feature_meta.name, "sunrise");
    }

    #[test]
    fn featured_repicked_when_filtered_out() {
        let mut gallery = sample();
        gallery.state.set_current(2);
        gallery.show_featured(2);
        gallery.filter_files("sun");
        let current = gallery.state().current().unwrap();
        assert_ne!(current, 2);
        assert!(gallery.state().is_visible(current));
    }

    #[test]
    fn search_box_debounces_edits() {
        let start = Instant::now();
        let mut search = SearchBox::new(Duration::from_millis(200));
        search.insert_char('S', start);
        search.insert_char('u', start + Duration::from_millis(100));
        assert_eq!(search.take_due(start + Duration::from_millis(250)), None);
        assert_eq!(
            search.take_due(start + Duration::from_millis(300)),
            Some("su".to_string())
        );
        assert_eq!(search.text(), "Su");
        search.backspace(start + Duration::from_millis(400));
        search.clear(start + Duration::from_millis(450));
        assert_eq!(
            search.take_due(start + Duration::from_millis(650)),
            Some(String::new())
        );
    }
}
