use crate::source::ImageReference;

/// Attribute images can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    FileName,
    FilePath,
    /// Last modification time
    Modified,
    FileSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

/// Stable sort of `images` by `key`.
///
/// Files whose metadata cannot be read sort before every readable file.
pub fn sort_images(images: &mut [ImageReference], key: SortKey, order: SortOrder) {
    match key {
        SortKey::FileName => sort_by_cached(images, order, |img| img.display_name.clone()),
        SortKey::FilePath => sort_by_cached(images, order, |img| img.path.clone()),
        SortKey::Modified => sort_by_cached(images, order, |img| {
            std::fs::metadata(&img.path)
                .and_then(|meta| meta.modified())
                .ok()
        }),
        SortKey::FileSize => sort_by_cached(images, order, |img| {
            std::fs::metadata(&img.path).map(|meta| meta.len()).ok()
        }),
    }
}

fn sort_by_cached<K: Ord>(
    images: &mut [ImageReference],
    order: SortOrder,
    mut key: impl FnMut(&ImageReference) -> K,
) {
    let mut keyed: Vec<(K, ImageReference)> =
        images.iter().map(|image| (key(image), image.clone())).collect();
    match order {
        SortOrder::Ascending => keyed.sort_by(|a, b| a.0.cmp(&b.0)),
        SortOrder::Descending => keyed.sort_by(|a, b| b.0.cmp(&a.0)),
    }
    for (slot, (_, image)) in images.iter_mut().zip(keyed) {
        *slot = image;
    }
}

