//! # Page Grid Planner
//!
//! Assigns every record a slot: a page, a grid cell and the card rectangle
//! in page coordinates. The planner does no drawing and has no side
//! effects; given the same record count and geometry it always returns the
//! same slots.
//!
//! Cards fill each page row-major, left to right and then top to bottom,
//! exactly the way the vocabulary list reads. A page holds
//! `columns × rows` cards, and there is always at least one page.

pub mod grid;

use serde::{Deserialize, Serialize};

use crate::error::{CardgridError, Result};
use crate::model::{mm, PageSize, Rect};

/// Fixed page geometry for the card grid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageGeometry {
    pub page_width: f64,
    pub page_height: f64,
    /// Uniform margin on all four sides, in points.
    pub margin: f64,
    /// Space between adjacent cards, in points.
    pub gap: f64,
    pub columns: usize,
    pub rows: usize,
}

impl Default for PageGeometry {
    /// A4 portrait, 12 mm margin, no gap, 3×3 cards.
    fn default() -> Self {
        Self::new(PageSize::A4, mm(12.0), 0.0, 3, 3)
    }
}

impl PageGeometry {
    pub fn new(size: PageSize, margin: f64, gap: f64, columns: usize, rows: usize) -> Self {
        let (page_width, page_height) = size.dimensions();
        Self {
            page_width,
            page_height,
            margin,
            gap,
            columns,
            rows,
        }
    }

    pub fn cards_per_page(&self) -> usize {
        self.columns * self.rows
    }

    pub fn card_width(&self) -> f64 {
        grid::equal_track_size(
            self.page_width - 2.0 * self.margin,
            self.gap,
            self.columns.max(1),
        )
    }

    pub fn card_height(&self) -> f64 {
        grid::equal_track_size(
            self.page_height - 2.0 * self.margin,
            self.gap,
            self.rows.max(1),
        )
    }

    /// Reject geometry that cannot produce a positive card size.
    pub fn validate(&self) -> Result<()> {
        let values = [
            ("page width", self.page_width),
            ("page height", self.page_height),
            ("margin", self.margin),
            ("gap", self.gap),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(CardgridError::InvalidGeometry(format!(
                    "{} is not a finite number",
                    name
                )));
            }
            if value < 0.0 {
                return Err(CardgridError::InvalidGeometry(format!(
                    "{} must not be negative (got {})",
                    name, value
                )));
            }
        }
        if self.columns == 0 || self.rows == 0 {
            return Err(CardgridError::InvalidGeometry(format!(
                "grid must have at least one column and one row (got {}×{})",
                self.columns, self.rows
            )));
        }

        let (card_w, card_h) = (self.card_width(), self.card_height());
        if card_w <= 0.0 || card_h <= 0.0 {
            return Err(CardgridError::InvalidGeometry(format!(
                "cards would be {:.2}×{:.2} pt; reduce margin, gap, columns or rows",
                card_w, card_h
            )));
        }
        Ok(())
    }
}

/// Where one card goes. Produced by the planner and consumed once by the
/// card renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardSlot {
    /// 0-based page index.
    pub page: usize,
    /// 0-based row in reading order (0 = top of the page).
    pub row: usize,
    pub column: usize,
    /// Card bounds in page coordinates (bottom-left origin).
    pub rect: Rect,
}

/// Plans card slots for a validated geometry.
#[derive(Debug, Clone)]
pub struct GridPlanner {
    geometry: PageGeometry,
    card_width: f64,
    card_height: f64,
}

impl GridPlanner {
    /// Validate the geometry once; every plan after that is infallible.
    pub fn new(geometry: PageGeometry) -> Result<Self> {
        geometry.validate()?;
        Ok(Self {
            card_width: geometry.card_width(),
            card_height: geometry.card_height(),
            geometry,
        })
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// (width, height) of every card, in points.
    pub fn card_size(&self) -> (f64, f64) {
        (self.card_width, self.card_height)
    }

    /// Number of pages for `record_count` cards. Never zero: an empty list
    /// still gets one blank page.
    pub fn page_count(&self, record_count: usize) -> usize {
        record_count.div_ceil(self.geometry.cards_per_page()).max(1)
    }

    /// Card rectangle for a cell, given in reading order.
    pub fn slot_rect(&self, row: usize, column: usize) -> Rect {
        let g = &self.geometry;
        Rect {
            x: grid::column_origin_x(column, g.margin, self.card_width, g.gap),
            y: grid::row_origin_y(row, g.rows, g.margin, self.card_height, g.gap),
            width: self.card_width,
            height: self.card_height,
        }
    }

    /// One slot per record, in input order.
    pub fn plan(&self, record_count: usize) -> Vec<CardSlot> {
        let per_page = self.geometry.cards_per_page();
        let columns = self.geometry.columns;

        (0..record_count)
            .map(|index| {
                let page = index / per_page;
                let cell = index % per_page;
                let (row, column) = (cell / columns, cell % columns);
                CardSlot {
                    page,
                    row,
                    column,
                    rect: self.slot_rect(row, column),
                }
            })
            .collect()
    }
}

/// Validate `geometry` and plan `record_count` slots in one call.
pub fn plan(record_count: usize, geometry: &PageGeometry) -> Result<Vec<CardSlot>> {
    Ok(GridPlanner::new(*geometry)?.plan(record_count))
}
