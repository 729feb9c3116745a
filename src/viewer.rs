use rand::Rng;

use crate::gallery::Gallery;
use crate::view::{Action, ImageSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalKey {
    Escape,
    ArrowLeft,
    ArrowRight,
}

impl Gallery {
    /// Features a random visible file, never the one already featured when
    /// there is another to choose from.
    pub fn pick_featured(&mut self) {
        let visible_len = self.state.visible().len();
        if visible_len == 0 {
            self.view.hero = None;
            self.view.feature_meta.aria_hidden = true;
            self.view.featured_loader.hide();
            return;
        }

        self.view.featured_loader.hide();

        let current = self.state.current();
        let picked = loop {
            let candidate = self.state.visible()[self.rng.gen_range(0..visible_len)];
            if visible_len == 1 || Some(candidate) != current {
                break candidate;
            }
        };

        self.state.set_current(picked);
        self.show_featured(picked);
    }

    pub fn show_featured(&mut self, index: usize) {
        let Some(file) = self.state.file(index) else {
            return;
        };
        let view = &mut self.view;

        view.featured_loader.hide();
        view.feature_meta.aria_hidden = false;
        view.view.enabled = true;
        view.download.enabled = true;

        view.hero = Some(ImageSlot {
            src: file.download_url.clone(),
            alt: file.name.clone(),
        });
        view.feature_meta.name = file.display_title().to_string();
        view.feature_meta.info = file.display_subtitle();

        view.view.wire(Action::OpenFile {
            name: file.name.clone(),
        });
        view.download.wire(Action::Download {
            url: file.download_url.clone(),
            filename: file.name.clone(),
        });
    }

    pub fn show_no_featured_message(&mut self) {
        let view = &mut self.view;
        view.hero = None;
        view.feature_meta.aria_hidden = false;
        view.feature_meta.name = "No image found".to_string();
        view.feature_meta.info = "Try a different search.".to_string();
        view.view.enabled = false;
        view.download.enabled = false;
    }

    pub fn open_modal_by_name(&mut self, name: &str) {
        let Some(index) = self.state.index_of(name) else {
            return;
        };
        self.state.set_current(index);
        self.open_modal_at(index);
    }

    pub fn open_modal_at(&mut self, index: usize) {
        let Some(file) = self.state.file(index) else {
            return;
        };
        let modal = &mut self.view.modal;

        modal.image = Some(ImageSlot {
            src: file.download_url.clone(),
            alt: file.name.clone(),
        });
        modal.name = file.display_title().to_string();
        modal.meta = file.display_subtitle();
        modal.open_original.wire(Action::OpenOriginal {
            url: file.download_url.clone(),
        });
        modal.download.wire(Action::Download {
            url: file.download_url.clone(),
            filename: file.name.clone(),
        });

        modal.shown = true;
        modal.aria_hidden = false;
    }

    /// Hides the modal and drops its image so a reopen never flashes the
    /// previous picture. The current index is left alone.
    pub fn close_modal(&mut self) {
        let modal = &mut self.view.modal;
        modal.shown = false;
        modal.aria_hidden = true;
        modal.image = None;
    }

    pub fn modal_shown(&self) -> bool {
        self.view.modal.shown
    }

    pub fn modal_index(&self) -> Option<usize> {
        self.modal_shown().then(|| self.state.current()).flatten()
    }

    fn cycle(&mut self, delta: i64) {
        let Some(next) = self.state.cycle_index(delta) else {
            return;
        };
        self.state.set_current(next);
        self.open_modal_at(next);
    }

    pub fn prev_modal(&mut self) {
        self.cycle(-1);
    }

    pub fn next_modal(&mut self) {
        self.cycle(1);
    }

    /// Returns whether the key was consumed; keys are ignored while the
    /// modal is hidden.
    pub fn handle_modal_key(&mut self, key: ModalKey) -> bool {
        if !self.modal_shown() {
            return false;
        }
        match key {
            ModalKey::Escape => self.close_modal(),
            ModalKey::ArrowLeft => self.prev_modal(),
            ModalKey::ArrowRight => self.next_modal(),
        }
        true
    }

    /// A click on the backdrop closes the modal; clicks on its content do not.
    pub fn click_modal_backdrop(&mut self, inside_content: bool) {
        if self.modal_shown() && !inside_content {
            self.close_modal();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gallery::{seeded, Effect};
    use crate::state::entry;

    fn three() -> Gallery {
        seeded(
            vec![entry("a.png", Some(1)), entry("b.png", Some(2)), entry("c.png", Some(3))],
            11,
        )
    }

    #[test]
    fn single_png_listing_scenario() {
        let mut a = entry("a.png", Some(2048));
        a.download_url = "u1".into();
        let gallery = seeded(vec![a], 5);
        let view = gallery.view();
        assert_eq!(view.gallery.cards.len(), 1);
        assert_eq!(view.feature_meta.name, "a");
        assert_eq!(view.feature_meta.info, "2.0 KB • PNG");
        assert_eq!(
            view.hero,
            Some(ImageSlot {
                src: "u1".into(),
                alt: "a.png".into()
            })
        );
        assert_eq!(
            view.download.press(),
            Some(Action::Download {
                url: "u1".into(),
                filename: "a.png".into()
            })
        );
    }

    #[test]
    fn repick_never_repeats_with_choices() {
        let mut gallery = three();
        for _ in 0..200 {
            let before = gallery.state().current();
            gallery.pick_featured();
            assert_ne!(gallery.state().current(), before);
        }
    }

    #[test]
    fn repick_with_single_visible_keeps_it() {
        let mut gallery = three();
        gallery.filter_files("b.png");
        gallery.pick_featured();
        assert_eq!(gallery.state().current(), Some(1));
    }

    #[test]
    fn repick_with_nothing_visible_clears_hero() {
        let mut gallery = three();
        gallery.filter_files("zz");
        gallery.pick_featured();
        assert!(gallery.view().hero.is_none());
        assert!(gallery.view().feature_meta.aria_hidden);
    }

    #[test]
    fn next_wraps_after_last() {
        let mut gallery = three();
        gallery.open_modal_by_name("a.png");
        assert_eq!(gallery.modal_index(), Some(0));
        gallery.next_modal();
        gallery.next_modal();
        assert_eq!(gallery.modal_index(), Some(2));
        assert_eq!(gallery.view().modal.name, "c");
        gallery.next_modal();
        assert_eq!(gallery.modal_index(), Some(0));
    }

    #[test]
    fn prev_wraps_before_first() {
        let mut gallery = three();
        gallery.open_modal_by_name("a.png");
        gallery.prev_modal();
        assert_eq!(gallery.modal_index(), Some(2));
    }

    #[test]
    fn navigation_spans_full_list_not_visible_subset() {
        let mut gallery = three();
        gallery.filter_files("a");
        gallery.open_modal_by_name("a.png");
        gallery.next_modal();
        assert_eq!(gallery.modal_index(), Some(1));
    }

    #[test]
    fn open_unknown_file_is_noop() {
        let mut gallery = three();
        gallery.open_modal_by_name("missing.png");
        assert!(!gallery.modal_shown());
        gallery.open_modal_at(9);
        assert!(!gallery.modal_shown());
    }

    #[test]
    fn close_clears_image_but_keeps_index() {
        let mut gallery = three();
        gallery.open_modal_by_name("b.png");
        assert!(!gallery.view().modal.aria_hidden);
        gallery.close_modal();
        let modal = &gallery.view().modal;
        assert!(!modal.shown);
        assert!(modal.aria_hidden);
        assert!(modal.image.is_none());
        assert_eq!(gallery.state().current(), Some(1));
    }

    #[test]
    fn keys_only_apply_while_shown() {
        let mut gallery = three();
        assert!(!gallery.handle_modal_key(ModalKey::ArrowRight));
        gallery.open_modal_by_name("c.png");
        assert!(gallery.handle_modal_key(ModalKey::ArrowRight));
        assert_eq!(gallery.modal_index(), Some(0));
        assert!(gallery.handle_modal_key(ModalKey::ArrowLeft));
        assert_eq!(gallery.modal_index(), Some(2));
        assert!(gallery.handle_modal_key(ModalKey::Escape));
        assert!(!gallery.modal_shown());
    }

    #[test]
    fn backdrop_click_closes_but_content_click_does_not() {
        let mut gallery = three();
        gallery.open_modal_by_name("a.png");
        gallery.click_modal_backdrop(true);
        assert!(gallery.modal_shown());
        gallery.click_modal_backdrop(false);
        assert!(!gallery.modal_shown());
    }

    #[test]
    fn modal_actions_are_wired_to_the_open_file() {
        let mut gallery = three();
        gallery.open_modal_by_name("b.png");
        let modal = gallery.view().modal.clone();
        let effect = modal
            .open_original
            .press()
            .and_then(|action| gallery.dispatch(action));
        assert_eq!(
            effect,
            Some(Effect::OpenUrl {
                url: "https://raw.example/b.png".into()
            })
        );
        assert_eq!(modal.meta, "2 B • PNG");
    }

    #[test]
    fn view_button_opens_featured_file() {
        let mut gallery = three();
        let featured = gallery.state().current_file().unwrap().name.clone();
        let action = gallery.view().view.press().unwrap();
        gallery.dispatch(action);
        assert!(gallery.modal_shown());
        assert_eq!(
            gallery.state().current_file().map(|f| f.name.clone()),
            Some(featured)
        );
    }
}
