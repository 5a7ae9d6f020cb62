//! Sparse column-encoded vector field
//!
//! A [`Field`] stores one interpolated vector per pixel, but only for the
//! columns and rows where data exists. Each column is either absent (no
//! valid data anywhere in it) or a run of cells offset from the top of the
//! display, so long empty leading regions cost nothing.

use rand::Rng;

/// Magnitude sentinel: the vector exists but lies outside the display mask.
pub const INVISIBLE: f64 = -1.0;

/// Magnitude sentinel: no vector exists at all (out-of-field lookups).
pub const NIL: f64 = -2.0;

/// An interpolated vector with its precomputed magnitude.
///
/// (dx, dy) is the per-frame displacement in pixels; the magnitude is
/// the vector's length in the original sample units (before any display
/// scaling) or one of the sentinels [`INVISIBLE`] and [`NIL`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldVector {
    pub dx: f64,
    pub dy: f64,
    pub magnitude: f64,
}

impl FieldVector {
    /// The non-existent vector returned for lookups outside the field.
    pub const NIL: FieldVector = FieldVector {
        dx: f64::NAN,
        dy: f64::NAN,
        magnitude: NIL,
    };

    pub fn new(dx: f64, dy: f64, magnitude: f64) -> Self {
        Self { dx, dy, magnitude }
    }

    /// Whether this is the [`NIL`] sentinel.
    #[inline]
    pub fn is_nil(&self) -> bool {
        self.magnitude == NIL
    }

    /// Whether a particle at this vector should be drawn.
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.magnitude > INVISIBLE
    }
}

/// One column of the field: a run of cells starting just below `offset`.
///
/// The cell for row y lives at index `y - offset - 1`, i.e. `offset` is
/// `y_min - 1` for the first populated row `y_min`. Cells inside the run
/// where the field mask did not hold are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    offset: i64,
    cells: Vec<Option<FieldVector>>,
}

impl Column {
    /// Start a column whose first cell will be at row `y_min`.
    pub fn new(y_min: i64) -> Self {
        Self {
            offset: y_min - 1,
            cells: Vec::new(),
        }
    }

    /// Append the cell for the next row.
    pub fn push(&mut self, cell: Option<FieldVector>) {
        self.cells.push(cell);
    }

    /// Cell at row y, if the row is inside this column's run.
    #[inline]
    pub fn get(&self, y: i64) -> Option<FieldVector> {
        let idx = y - self.offset - 1;
        if idx < 0 {
            return None;
        }
        self.cells.get(idx as usize).copied().flatten()
    }

    /// Number of cells that hold data.
    pub fn valid_cells(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// Row of the n-th cell holding data, if it exists.
    fn nth_valid_row(&self, n: usize) -> Option<i64> {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_some())
            .nth(n)
            .map(|(i, _)| self.offset + 1 + i as i64)
    }
}

/// An immutable 2D vector field over a pixel region.
///
/// Built once per animation session and read-only afterwards; multiple
/// animators may safely share one field. Refreshing data means building a
/// new field and swapping it in between frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// X coordinate of the first column
    x0: i64,
    columns: Vec<Option<Column>>,
    /// prefix[i] = number of data cells in columns [0, i)
    prefix: Vec<usize>,
}

impl Field {
    /// Assemble a field from per-column data. `x0` is the pixel x
    /// coordinate of `columns[0]`.
    pub fn new(x0: i64, columns: Vec<Option<Column>>) -> Self {
        let mut prefix = Vec::with_capacity(columns.len() + 1);
        prefix.push(0);
        for column in &columns {
            let count = column.as_ref().map_or(0, Column::valid_cells);
            prefix.push(prefix.last().copied().unwrap_or(0) + count);
        }
        Self {
            x0,
            columns,
            prefix,
        }
    }

    /// The vector nearest to the point (x, y), or [`FieldVector::NIL`] if
    /// the field holds no data there.
    pub fn get(&self, x: f64, y: f64) -> FieldVector {
        let col = x.round() as i64 - self.x0;
        if col < 0 {
            return FieldVector::NIL;
        }
        match self.columns.get(col as usize) {
            Some(Some(column)) => column
                .get(y.round() as i64)
                .unwrap_or(FieldVector::NIL),
            _ => FieldVector::NIL,
        }
    }

    /// Total number of cells holding data.
    pub fn valid_cell_count(&self) -> usize {
        self.prefix.last().copied().unwrap_or(0)
    }

    /// Whether the field holds any data at all.
    pub fn is_empty(&self) -> bool {
        self.valid_cell_count() == 0
    }

    /// Pick a uniformly random cell among those that actually hold data
    /// and return its (x, y) pixel coordinates.
    ///
    /// Uniformity is over data cells, not over the bounding rectangle: a
    /// cell index is drawn from [0, valid_cell_count) and located by
    /// binary-searching the per-column prefix sums. Returns `None` for an
    /// empty field.
    pub fn randomize<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<(f64, f64)> {
        let total = self.valid_cell_count();
        if total == 0 {
            return None;
        }
        let p = rng.random_range(0..total);

        // Last column index with prefix[x] <= p. partition_point never
        // returns 0 here because prefix[0] == 0 <= p.
        let x = self.prefix.partition_point(|&w| w <= p) - 1;
        let row = self.columns[x]
            .as_ref()
            .and_then(|c| c.nth_valid_row(p - self.prefix[x]))?;
        Some(((self.x0 + x as i64) as f64, row as f64))
    }
}
