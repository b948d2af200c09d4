//! Static per-row layout: seat count and centre-aisle split.
//!
//! ```text
//!  row 1:  1 2 3 ... 42 43 | 44 45 ... 85 86
//!          └── left ─────┘   └── right ───┘
//!                    leftSegmentEnd = 43, rightSegmentStart = 44
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{SeatMapError, SeatMapResult};

/// Layout of one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowConfig {
    /// Row number, 1-based.
    pub row_number: u32,
    /// Seats in the row.
    pub total_seats: u32,
    /// Last position before the centre aisle.
    pub left_segment_end: u32,
    /// First position after the centre aisle.
    pub right_segment_start: u32,
}

impl RowConfig {
    /// Create a row configuration.
    ///
    /// # Errors
    ///
    /// Returns an error unless
    /// `1 <= left_segment_end < right_segment_start <= total_seats`.
    pub fn new(
        row_number: u32,
        total_seats: u32,
        left_segment_end: u32,
        right_segment_start: u32,
    ) -> SeatMapResult<Self> {
        let config = Self {
            row_number,
            total_seats,
            left_segment_end,
            right_segment_start,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the segment invariant.
    ///
    /// # Errors
    ///
    /// Returns [`SeatMapError::InvalidConfig`] when the split is out of order.
    pub fn validate(&self) -> SeatMapResult<()> {
        if self.left_segment_end >= 1
            && self.left_segment_end < self.right_segment_start
            && self.right_segment_start <= self.total_seats
        {
            Ok(())
        } else {
            Err(SeatMapError::InvalidConfig(format!(
                "row {}: need 1 <= {} < {} <= {}",
                self.row_number, self.left_segment_end, self.right_segment_start, self.total_seats
            )))
        }
    }

    /// Number of seats left of the aisle.
    #[must_use]
    pub const fn left_size(&self) -> u32 {
        self.left_segment_end
    }

    /// Number of seats right of the aisle.
    #[must_use]
    pub const fn right_size(&self) -> u32 {
        self.total_seats + 1 - self.right_segment_start
    }

    /// Row centre as a (possibly fractional) position.
    #[must_use]
    pub fn center(&self) -> f64 {
        f64::from(self.total_seats + 1) / 2.0
    }
}

/// Serializable row table: explicit rows plus the fallback for the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RowLayoutConfig {
    /// Explicitly configured rows.
    pub rows: Vec<RowConfig>,
    /// Template for rows not in `rows`; its `row_number` is ignored.
    pub default_row: RowConfig,
}

impl Default for RowLayoutConfig {
    /// The canonical hall table: row 1 has 86 seats split 43/44,
    /// every other row 88 seats split 44/45.
    fn default() -> Self {
        Self {
            rows: vec![RowConfig {
                row_number: 1,
                total_seats: 86,
                left_segment_end: 43,
                right_segment_start: 44,
            }],
            default_row: RowConfig {
                row_number: 0,
                total_seats: 88,
                left_segment_end: 44,
                right_segment_start: 45,
            },
        }
    }
}

/// Lookup table from row number to [`RowConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct RowLayout {
    rows: BTreeMap<u32, RowConfig>,
    default_row: RowConfig,
}

impl RowLayout {
    /// Build and validate a layout.
    ///
    /// # Errors
    ///
    /// Returns an error if any row (or the default) breaks the segment
    /// invariant, or a row number repeats.
    pub fn new(config: &RowLayoutConfig) -> SeatMapResult<Self> {
        config.default_row.validate()?;
        let mut rows = BTreeMap::new();
        for row in &config.rows {
            row.validate()?;
            if rows.insert(row.row_number, *row).is_some() {
                return Err(SeatMapError::InvalidConfig(format!(
                    "row {} configured twice",
                    row.row_number
                )));
            }
        }
        Ok(Self {
            rows,
            default_row: config.default_row,
        })
    }

    /// Layout of a row, falling back to the default row template.
    #[must_use]
    pub fn get(&self, row_number: u32) -> RowConfig {
        self.rows.get(&row_number).copied().unwrap_or(RowConfig {
            row_number,
            ..self.default_row
        })
    }

    /// Whether a row has an explicit entry.
    #[must_use]
    pub fn is_configured(&self, row_number: u32) -> bool {
        self.rows.contains_key(&row_number)
    }
}

impl Default for RowLayout {
    fn default() -> Self {
        let config = RowLayoutConfig::default();
        Self {
            rows: config.rows.iter().map(|r| (r.row_number, *r)).collect(),
            default_row: config.default_row,
        }
    }
}
