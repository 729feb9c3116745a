use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::render;
use crate::state::{FileEntry, GalleryState};
use crate::view::{Action, View};

/// Side effects an action asks the host to perform; the gallery itself
/// never touches the network or the browser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Download { url: String, filename: String },
    OpenUrl { url: String },
}

pub struct Gallery {
    pub(crate) state: GalleryState,
    pub(crate) view: View,
    pub(crate) rng: StdRng,
}

impl Gallery {
    pub fn new(about_repo: impl Into<String>) -> Self {
        Self::with_rng(about_repo, StdRng::from_entropy())
    }

    pub fn with_rng(about_repo: impl Into<String>, rng: StdRng) -> Self {
        Self {
            state: GalleryState::default(),
            view: View::new(about_repo),
            rng,
        }
    }

    pub fn state(&self) -> &GalleryState {
        &self.state
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut View {
        &mut self.view
    }

    /// Installs the fetched list. Returns `false` when there is nothing to
    /// show, in which case the empty state is already up; otherwise the
    /// caller reveals the gallery with [`Gallery::reveal`].
    pub fn load(&mut self, files: Vec<FileEntry>) -> bool {
        self.state = GalleryState::new(files);
        if self.state.is_empty() {
            self.view.page_loader.hide();
            self.view.loading_wrap.hide();
            self.view.empty_state.show();
            self.view.featured_loader.hide();
            self.view.gallery.visible = false;
            return false;
        }
        true
    }

    pub fn reveal(&mut self) {
        self.render_visible();
        self.pick_featured();
    }

    pub(crate) fn render_visible(&mut self) {
        render::render_gallery(&mut self.view, self.state.files(), self.state.visible());
    }

    pub fn dispatch(&mut self, action: Action) -> Option<Effect> {
        match action {
            Action::OpenFile { name } => {
                self.open_modal_by_name(&name);
                None
            }
            Action::Download { url, filename } => Some(Effect::Download { url, filename }),
            Action::OpenOriginal { url } => Some(Effect::OpenUrl { url }),
            Action::Shuffle => {
                self.pick_featured();
                None
            }
            Action::CloseModal => {
                self.close_modal();
                None
            }
            Action::Previous => {
                self.prev_modal();
                None
            }
            Action::Next => {
                self.next_modal();
                None
            }
            Action::ShowAbout => {
                self.view.about.open = true;
                None
            }
            Action::CloseAbout => {
                self.view.about.open = false;
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn seeded(files: Vec<FileEntry>, seed: u64) -> Gallery {
    let mut gallery = Gallery::with_rng("octo/pics", StdRng::seed_from_u64(seed));
    if gallery.load(files) {
        gallery.reveal();
    }
    gallery
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::entry;

    #[test]
    fn empty_listing_shows_empty_state() {
        let gallery = seeded(Vec::new(), 1);
        let view = gallery.view();
        assert!(view.empty_state.visible);
        assert!(!view.page_loader.visible);
        assert!(!view.featured_loader.visible);
        assert!(view.gallery.cards.is_empty());
        assert_eq!(gallery.state().current(), None);
    }

    #[test]
    fn reveal_renders_and_features() {
        let gallery = seeded(vec![entry("a.png", Some(2048)), entry("b.png", None)], 3);
        assert_eq!(gallery.view().gallery.cards.len(), 2);
        assert!(gallery.state().current().is_some());
        assert!(!gallery.view().featured_loader.visible);
    }

    #[test]
    fn download_and_open_become_effects() {
        let mut gallery = seeded(vec![entry("a.png", None)], 1);
        let effect = gallery.dispatch(Action::Download {
            url: "u".into(),
            filename: "a.png".into(),
        });
        assert_eq!(
            effect,
            Some(Effect::Download {
                url: "u".into(),
                filename: "a.png".into()
            })
        );
        assert_eq!(
            gallery.dispatch(Action::OpenOriginal { url: "u".into() }),
            Some(Effect::OpenUrl { url: "u".into() })
        );
    }

    #[test]
    fn about_dialog_toggles() {
        let mut gallery = seeded(vec![entry("a.png", None)], 1);
        gallery.dispatch(Action::ShowAbout);
        assert!(gallery.view().about.open);
        let close = gallery.view().about.close.press();
        assert_eq!(close, Some(Action::CloseAbout));
        gallery.dispatch(Action::CloseAbout);
        assert!(!gallery.view().about.open);
    }
}
