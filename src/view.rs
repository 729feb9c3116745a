//! Typed binding of every surface element the gallery components write to.
//!
//! Components never draw; they mutate a [`View`] and the terminal layer in
//! `ui` paints whatever the view currently says.

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    OpenFile { name: String },
    Download { url: String, filename: String },
    OpenOriginal { url: String },
    Shuffle,
    CloseModal,
    Previous,
    Next,
    ShowAbout,
    CloseAbout,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: &'static str,
    pub enabled: bool,
    pub action: Option<Action>,
}

impl Button {
    pub fn new(label: &'static str, action: Option<Action>) -> Self {
        Self {
            label,
            enabled: true,
            action,
        }
    }

    pub fn wire(&mut self, action: Action) {
        self.action = Some(action);
    }

    /// Disabled or unwired buttons do nothing.
    pub fn press(&self) -> Option<Action> {
        if self.enabled {
            self.action.clone()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Indicator {
    pub visible: bool,
}

impl Indicator {
    pub fn shown() -> Self {
        Self { visible: true }
    }

    pub fn hidden() -> Self {
        Self { visible: false }
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSlot {
    pub src: String,
    pub alt: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Thumbnail {
    Deferred,
    Loading,
    Loaded { width: u32, height: u32 },
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    pub file_index: usize,
    pub label: String,
    pub image: ImageSlot,
    pub thumbnail: Thumbnail,
    pub dimmed: bool,
}

impl Card {
    pub fn activate(&self) -> Action {
        Action::OpenFile {
            name: self.label.clone(),
        }
    }

    pub fn mark_failed(&mut self) {
        self.thumbnail = Thumbnail::Failed;
        self.dimmed = true;
        self.image.alt = "Failed to load".to_string();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    pub visible: bool,
    pub cards: Vec<Card>,
    pub selected: usize,
    pub scroll_row: usize,
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            visible: true,
            cards: Vec::new(),
            selected: 0,
            scroll_row: 0,
        }
    }
}

impl Grid {
    pub fn selected_card(&self) -> Option<&Card> {
        self.cards.get(self.selected)
    }

    pub fn cards_for_url_mut<'a>(&'a mut self, url: &'a str) -> impl Iterator<Item = &'a mut Card> {
        self.cards.iter_mut().filter(move |card| card.image.src == url)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureMeta {
    pub aria_hidden: bool,
    pub name: String,
    pub info: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub shown: bool,
    pub aria_hidden: bool,
    pub image: Option<ImageSlot>,
    pub name: String,
    pub meta: String,
    pub prev: Button,
    pub next: Button,
    pub download: Button,
    pub open_original: Button,
    pub close: Button,
}

impl Default for ModalView {
    fn default() -> Self {
        Self {
            shown: false,
            aria_hidden: true,
            image: None,
            name: String::new(),
            meta: String::new(),
            prev: Button::new("◀ Prev", Some(Action::Previous)),
            next: Button::new("Next ▶", Some(Action::Next)),
            download: Button::new("Download", None),
            open_original: Button::new("Open original", None),
            close: Button::new("Close", Some(Action::CloseModal)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AboutDialog {
    pub open: bool,
    pub close: Button,
}

impl Default for AboutDialog {
    fn default() -> Self {
        Self {
            open: false,
            close: Button::new("Close", Some(Action::CloseAbout)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub about_repo: String,
    pub gallery: Grid,
    pub loading_wrap: Indicator,
    pub page_loader: Indicator,
    pub empty_state: Indicator,
    pub hero: Option<ImageSlot>,
    pub feature_meta: FeatureMeta,
    pub featured_loader: Indicator,
    pub search_input: String,
    pub modal: ModalView,
    pub shuffle: Button,
    pub view: Button,
    pub download: Button,
    pub about: AboutDialog,
}

impl View {
    /// The page as it looks before the listing arrives: loaders spinning,
    /// nothing featured yet.
    pub fn new(about_repo: impl Into<String>) -> Self {
        Self {
            about_repo: about_repo.into(),
            gallery: Grid::default(),
            loading_wrap: Indicator::shown(),
            page_loader: Indicator::shown(),
            empty_state: Indicator::hidden(),
            hero: None,
            feature_meta: FeatureMeta {
                aria_hidden: true,
                name: String::new(),
                info: String::new(),
            },
            featured_loader: Indicator::shown(),
            search_input: String::new(),
            modal: ModalView::default(),
            shuffle: Button::new("Shuffle", Some(Action::Shuffle)),
            view: Button::new("View", None),
            download: Button::new("Download", None),
            about: AboutDialog::default(),
        }
    }
}
