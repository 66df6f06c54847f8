//! Viewport-aware placement of the tooltip overlay.

use serde::{Deserialize, Serialize};

use crate::config::TooltipConfig;

/// Rectangle in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Rect {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub const fn new(top: f64, left: f64, width: f64, height: f64) -> Self {
        Self {
            top,
            left,
            width,
            height,
        }
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn center_x(&self) -> f64 {
        self.left + self.width / 2.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

/// Visible area plus the document scroll offset.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    #[serde(default)]
    pub scroll_x: f64,
    #[serde(default)]
    pub scroll_y: f64,
}

impl Viewport {
    pub const fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            scroll_x: 0.0,
            scroll_y: 0.0,
        }
    }

    pub const fn with_scroll(mut self, scroll_x: f64, scroll_y: f64) -> Self {
        self.scroll_x = scroll_x;
        self.scroll_y = scroll_y;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    Above,
    Below,
}

/// Absolute top/left of the overlay and the side of the anchor it sits on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TooltipPosition {
    pub top: f64,
    pub left: f64,
    pub placement: Placement,
}

/// Places the overlay with the default tooltip geometry.
pub fn compute(anchor: Rect, overlay: Option<Size>, viewport: Viewport) -> TooltipPosition {
    TooltipConfig::default().compute(anchor, overlay, viewport)
}

impl TooltipConfig {
    /// Resolves the overlay size, substituting the fallback estimate for missing or
    /// not-yet-measured dimensions.
    pub fn overlay_size(&self, measured: Option<Size>) -> Size {
        let measured = measured.unwrap_or_default();
        let usable = |value: f64| value.is_finite() && value > 0.0;
        Size {
            width: if usable(measured.width) {
                measured.width
            } else {
                self.fallback_width
            },
            height: if usable(measured.height) {
                measured.height
            } else {
                self.fallback_height
            },
        }
    }

    /// Flips above the anchor only when the space below cannot hold the overlay plus the
    /// margin and there is more room above; then centres horizontally and clamps to the
    /// edge padding.
    pub fn compute(&self, anchor: Rect, overlay: Option<Size>, viewport: Viewport) -> TooltipPosition {
        let size = self.overlay_size(overlay);

        let space_below = viewport.height - anchor.bottom();
        let space_above = anchor.top;
        let placement = if space_below < size.height + self.margin && space_above > space_below {
            Placement::Above
        } else {
            Placement::Below
        };

        let top = match placement {
            Placement::Above => anchor.top - size.height - self.gutter,
            Placement::Below => anchor.bottom() + self.gutter,
        } + viewport.scroll_y;

        let centred = anchor.center_x() - size.width / 2.0;
        let max_left = viewport.width - size.width - self.edge_padding;
        // Minimum wins when the viewport is too narrow for both bounds.
        let left = centred.min(max_left).max(self.edge_padding) + viewport.scroll_x;

        TooltipPosition {
            top,
            left,
            placement,
        }
    }
}
