//! Draws emitted elements onto a surface, one frame per call.

use pyviz_lang::{ElementKind, Rgb, VisualElement};

use crate::surface::{DrawSurface, SurfaceError};

/// Clears to `background`, draws every element in order and commits once.
/// Bars become rects sized from their `bar_width`/`bar_height` metadata;
/// everything else is drawn as text.
pub fn render_elements<S: DrawSurface + ?Sized>(
    elements: &[VisualElement],
    surface: &mut S,
    background: Rgb,
) -> Result<(), SurfaceError> {
    surface.clear(background)?;
    for el in elements {
        match el.kind {
            ElementKind::VariableBar => {
                let (w, h) = bar_size(el);
                surface.rect(el.x, el.y, w, h, el.color)?;
            }
            _ => surface.text(el.x, el.y, &el.text, el.color)?,
        }
    }
    surface.commit()
}

fn bar_size(el: &VisualElement) -> (i32, i32) {
    let dim = |key: &str| {
        el.meta(key)
            .and_then(|v| v.as_f64())
            .filter(|v| v.is_finite())
            .map(|v| v.round().clamp(0.0, i32::MAX as f64) as i32)
            .unwrap_or(0)
    };
    (dim("bar_width"), dim("bar_height"))
}
