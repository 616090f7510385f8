// Canvas drawing for the board and the score banner.

use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

use crate::board::Board;
use crate::tile::Tile;

const TILE_COLOR: &str = "#000000";
const LONG_TILE_COLOR: &str = "#1b1b4d";
const HOLD_BAR_COLOR: &str = "#87CEEB";
const BORDER_COLOR: &str = "#0000FF";
const SKY_BLUE: &str = "#87CEEB";
const SHADOW_COLOR: &str = "#000080";

pub struct Renderer {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
}

impl Renderer {
    pub fn new(canvas: HtmlCanvasElement, ctx: CanvasRenderingContext2d) -> Self {
        Self { canvas, ctx }
    }

    pub fn clear(&self) {
        let (w, h) = (self.canvas.width() as f64, self.canvas.height() as f64);
        self.ctx.clear_rect(0.0, 0.0, w, h);
    }

    pub fn draw(&self, board: Option<&Board>, score: u32) {
        self.clear();
        if let Some(board) = board {
            for tile in board.tiles() {
                self.draw_tile(tile);
            }
        }
        self.draw_score(score);
    }

    fn draw_tile(&self, tile: &Tile) {
        let ctx = &self.ctx;
        ctx.set_global_alpha(tile.opacity);
        ctx.set_fill_style_str(if tile.is_long { LONG_TILE_COLOR } else { TILE_COLOR });
        ctx.fill_rect(tile.x, tile.y, tile.width, tile.height);
        ctx.set_global_alpha(1.0);
        ctx.set_stroke_style_str(BORDER_COLOR);
        ctx.set_line_width(2.0);
        ctx.stroke_rect(tile.x, tile.y, tile.width, tile.height);

        // Centre line on long tiles so they read as "hold me".
        if tile.is_long && tile.height > 0.0 {
            ctx.set_fill_style_str(HOLD_BAR_COLOR);
            let bar = (tile.width * 0.08).max(2.0);
            ctx.fill_rect(tile.x + (tile.width - bar) / 2.0, tile.y, bar, tile.height);
        }
    }

    fn draw_score(&self, score: u32) {
        let ctx = &self.ctx;
        let mid = self.canvas.width() as f64 / 2.0;
        let text = format!("SCORE: {score}");
        ctx.set_font("bold 24px Arial");
        ctx.set_text_align("center");
        ctx.set_fill_style_str(SHADOW_COLOR);
        ctx.fill_text(&text, mid + 2.0, 32.0).ok();
        ctx.set_fill_style_str(SKY_BLUE);
        ctx.fill_text(&text, mid, 30.0).ok();
    }
}
