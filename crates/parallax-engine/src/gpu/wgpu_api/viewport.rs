use glam::UVec2;

use crate::coords::PixelRect;

/// Converts a lower-left-origin viewport into wgpu's top-left convention.
///
/// `None` means the whole target. Returns `None` when nothing of the viewport lies
/// inside the target.
pub(super) fn top_left_viewport(viewport: Option<PixelRect>, target: UVec2) -> Option<PixelRect> {
    let rect = viewport.unwrap_or(PixelRect::full(target)).clamped_to(target);
    if rect.is_empty() {
        return None;
    }
    let top = target.y - (rect.y + rect.height);
    Some(PixelRect::new(rect.x, top, rect.width, rect.height))
}
