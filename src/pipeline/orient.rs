//! Orientation policy: decide whether a page needs turning.
//!
//! Pages are rotated a quarter turn counter-clockwise when their aspect
//! disagrees with the requested [`Layout`]. Comparison is strict, so square
//! pages are left alone under every layout.

use crate::config::Layout;
use crate::engine::PageHandle;
use crate::error::EngineError;
use tracing::debug;

/// Angle applied to a page whose aspect disagrees with the layout.
pub const ROTATION_DEGREES: f64 = -90.0;

/// The rotation `layout` asks for on a `width` × `height` page, if any.
pub fn rotation_for(layout: Layout, width: u32, height: u32) -> Option<f64> {
    let needs_turn = match layout {
        Layout::Keep => false,
        Layout::Landscape => width < height,
        Layout::Portrait => height < width,
    };
    needs_turn.then_some(ROTATION_DEGREES)
}

/// Apply the orientation policy to `page` in place.
///
/// Returns `true` if the page was rotated.
pub fn apply(page: &mut dyn PageHandle, layout: Layout) -> Result<bool, EngineError> {
    let (width, height) = (page.width(), page.height());
    match rotation_for(layout, width, height) {
        Some(degrees) => {
            debug!("Rotating {}x{} page by {}° for {}", width, height, degrees, layout);
            page.rotate(degrees)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
