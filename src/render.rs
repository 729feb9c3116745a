use crate::state::FileEntry;
use crate::view::{Card, ImageSlot, Thumbnail, View};

/// Rebuilds the grid from scratch: one card per index of `list`, in order.
/// An empty list hides the grid and shows the empty state instead.
pub fn render_gallery(view: &mut View, files: &[FileEntry], list: &[usize]) {
    view.gallery.cards.clear();
    view.gallery.selected = 0;
    view.gallery.scroll_row = 0;
    view.page_loader.hide();
    view.loading_wrap.hide();

    if list.is_empty() {
        view.gallery.visible = false;
        view.empty_state.show();
        return;
    }

    view.gallery.visible = true;
    view.empty_state.hide();
    view.gallery.cards = list
        .iter()
        .filter_map(|&index| files.get(index).map(|file| card_for(index, file)))
        .collect();
}

fn card_for(file_index: usize, file: &FileEntry) -> Card {
    Card {
        file_index,
        label: file.name.clone(),
        image: ImageSlot {
            src: file.download_url.clone(),
            alt: file.name.clone(),
        },
        thumbnail: Thumbnail::Deferred,
        dimmed: false,
    }
}
