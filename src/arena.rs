//! Mapping between terminal cells and game-area coordinates.
//!
//! Terminal cells are roughly twice as tall as they are wide, so each cell
//! spans `CELL_WIDTH` x `CELL_HEIGHT` game units. That keeps circular targets
//! round on screen and gives the kinematics a pixel-like scale.

use ratatui::layout::Rect;

use crate::kinematics::{GameArea, Target};

pub const CELL_WIDTH: f64 = 8.0;
pub const CELL_HEIGHT: f64 = 16.0;

/// What a pointer press landed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pointer {
    Target(u64),
    Background,
    Outside,
}

/// The terminal region the playfield occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Arena {
    pub rect: Rect,
}

impl Arena {
    pub fn new(rect: Rect) -> Self {
        Self { rect }
    }

    pub fn game_area(&self) -> GameArea {
        GameArea::new(
            self.rect.width as f64 * CELL_WIDTH,
            self.rect.height as f64 * CELL_HEIGHT,
        )
    }

    pub fn contains(&self, column: u16, row: u16) -> bool {
        column >= self.rect.x
            && column < self.rect.x + self.rect.width
            && row >= self.rect.y
            && row < self.rect.y + self.rect.height
    }

    /// Game-area bounds `(left, top, right, bottom)` covered by a cell, or
    /// `None` when the cell is outside the playfield.
    pub fn cell_bounds(&self, column: u16, row: u16) -> Option<(f64, f64, f64, f64)> {
        if !self.contains(column, row) {
            return None;
        }
        let left = (column - self.rect.x) as f64 * CELL_WIDTH;
        let top = (row - self.rect.y) as f64 * CELL_HEIGHT;
        Some((left, top, left + CELL_WIDTH, top + CELL_HEIGHT))
    }

    /// Classifies a press at a terminal cell. A target counts as hit when its
    /// circle overlaps the pressed cell; when several overlap, the one drawn
    /// last (latest in the list) wins.
    pub fn pick(&self, targets: &[Target], column: u16, row: u16) -> Pointer {
        let Some((left, top, right, bottom)) = self.cell_bounds(column, row) else {
            return Pointer::Outside;
        };

        targets
            .iter()
            .rev()
            .find(|t| {
                let nx = t.x.clamp(left, right);
                let ny = t.y.clamp(top, bottom);
                t.contains(nx, ny)
            })
            .map_or(Pointer::Background, |t| Pointer::Target(t.id))
    }
}
