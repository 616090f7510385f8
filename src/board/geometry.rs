// Board geometry, derived once from the drawing surface when a board is built.

use crate::config::EngineConfig;
use crate::error::EngineError;

/// Logical drawing size of the canvas (its `width`/`height` attributes, not CSS pixels).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Surface {
    pub width: f64,
    pub height: f64,
}

impl Surface {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoardGeometry {
    pub columns: u8,
    pub width: f64,
    pub height: f64,
    pub tile_width: f64,
    pub tile_height: f64,
    pub separator: f64,
    pub vertical_gap: f64,
}

impl BoardGeometry {
    pub fn from_surface(surface: Surface, cfg: &EngineConfig) -> Result<Self, EngineError> {
        let invalid = || EngineError::InvalidSurface {
            width: surface.width,
            height: surface.height,
        };
        if !(surface.width.is_finite() && surface.height.is_finite()) {
            return Err(invalid());
        }
        let columns = cfg.columns.max(1);
        let tile_width = (surface.width - f64::from(columns - 1) * cfg.separator) / f64::from(columns);
        let tile_height = surface.height / f64::from(cfg.visible_rows.max(1)) - cfg.vertical_gap;
        if tile_width <= 0.0 || tile_height <= 0.0 {
            return Err(invalid());
        }
        Ok(Self {
            columns,
            width: surface.width,
            height: surface.height,
            tile_width,
            tile_height,
            separator: cfg.separator,
            vertical_gap: cfg.vertical_gap,
        })
    }

    pub fn column_x(&self, column: u8) -> f64 {
        f64::from(column) * (self.tile_width + self.separator)
    }

    /// Height of a tile spanning `rows` rows, gaps between those rows included.
    pub fn span_height(&self, rows: u8) -> f64 {
        let rows = f64::from(rows.max(1));
        rows * self.tile_height + (rows - 1.0) * self.vertical_gap
    }

    /// A falling tile whose bottom reaches this line has been missed.
    pub fn lower_bound(&self) -> f64 {
        self.height
    }
}
