use super::Renderer;

/// Screen-space extent of a projected point set, in normalized device
/// coordinates (`-1..1` on both axes).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ScreenBounds {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl ScreenBounds {
    /// Whether any part of the bounds overlaps the viewport.
    pub fn is_visible(&self) -> bool {
        self.max[0] > -1.0 && self.max[1] > -1.0 && self.min[0] < 1.0 && self.min[1] < 1.0
    }

    /// Converts the bottom-left corner to pixels, origin bottom-left.
    pub fn anchor_px(&self, viewport: (f32, f32)) -> (f32, f32) {
        (
            (self.min[0] + 1.0) / 2.0 * viewport.0,
            (self.max[1] + 1.0) / 2.0 * viewport.1,
        )
    }
}

/// Projects `points` through the renderer and returns their screen bounds.
///
/// Points behind the eye (`w <= 0`) are ignored. Returns `None` when no point
/// is in front of the eye.
pub fn project_bounds(
    renderer: &dyn Renderer,
    points: impl IntoIterator<Item = [f32; 4]>,
) -> Option<ScreenBounds> {
    let mut bounds: Option<ScreenBounds> = None;

    for point in points {
        let [x, y, _, w] = renderer.transform_point_to_screen(point);
        if w <= 0.0 {
            continue;
        }
        let (sx, sy) = (x / w, y / w);

        let b = bounds.get_or_insert(ScreenBounds {
            min: [sx, sy],
            max: [sx, sy],
        });
        b.min[0] = b.min[0].min(sx);
        b.min[1] = b.min[1].min(sy);
        b.max[0] = b.max[0].max(sx);
        b.max[1] = b.max[1].max(sy);
    }

    bounds
}
