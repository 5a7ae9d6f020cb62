//! Batched construction of the vector field
//!
//! Walks the display bounds column by column, interpolating a vector for
//! every pixel the field mask admits. Construction is time-sliced: the
//! builder runs until a wall-clock budget is spent, then hands itself
//! back to the host event loop and resumes later without redoing any
//! column. The builder owns no timer; the host decides when to call
//! [`FieldBuilder::advance`] again (a short pause such as
//! [`MIN_SLEEP_TIME`] keeps the loop responsive).

use std::time::{Duration, Instant};

use windfield_core::{Column, DisplayBounds, Field, FieldVector, Vector2, INVISIBLE};

use crate::interpolation::Interpolate;

/// Wall-clock budget a single batch runs before yielding.
pub const MAX_TASK_TIME: Duration = Duration::from_millis(100);

/// Recommended pause before resuming a yielded batch.
pub const MIN_SLEEP_TIME: Duration = Duration::from_millis(25);

/// Outcome of one batch of field construction.
pub enum BuildStep<I, FM, DM> {
    /// Budget exhausted; call `advance` again to continue.
    Continue(FieldBuilder<I, FM, DM>),
    /// All columns built.
    Done(Field),
}

/// A resumable field-construction task.
///
/// Holds the cursor of the column scan, so partially built state
/// survives across yields.
pub struct FieldBuilder<I, FM, DM> {
    interpolator: I,
    bounds: DisplayBounds,
    field_mask: FM,
    display_mask: DM,
    velocity_scale: f64,
    columns: Vec<Option<Column>>,
    cursor: i64,
}

impl<I, FM, DM> FieldBuilder<I, FM, DM>
where
    I: Interpolate<Value = Vector2>,
    FM: Fn(i64, i64) -> bool,
    DM: Fn(i64, i64) -> bool,
{
    /// Set up a build over `bounds`. `field_mask` delimits where vectors
    /// exist at all, `display_mask` where they are visible on screen, and
    /// `velocity_scale` converts interpolated units to pixels per frame.
    pub fn new(
        interpolator: I,
        bounds: DisplayBounds,
        field_mask: FM,
        display_mask: DM,
        velocity_scale: f64,
    ) -> Self {
        Self {
            interpolator,
            bounds,
            field_mask,
            display_mask,
            velocity_scale,
            columns: Vec::with_capacity(bounds.width.max(0) as usize),
            cursor: bounds.x,
        }
    }

    /// Columns completed so far.
    pub fn columns_done(&self) -> i64 {
        self.cursor - self.bounds.x
    }

    pub fn columns_total(&self) -> i64 {
        self.bounds.width
    }

    /// Run one batch, at most until `budget` of wall-clock time is spent.
    /// Work is sliced at column granularity and never restarted.
    pub fn advance(mut self, budget: Duration) -> BuildStep<I, FM, DM> {
        let start = Instant::now();
        while self.cursor < self.bounds.x_max() {
            let column = self.interpolate_column(self.cursor);
            self.columns.push(column);
            self.cursor += 1;
            if start.elapsed() > budget {
                return BuildStep::Continue(self);
            }
        }
        BuildStep::Done(Field::new(self.bounds.x, self.columns))
    }

    /// Run to completion without yielding.
    pub fn build(self) -> Field {
        let mut task = self;
        loop {
            match task.advance(Duration::MAX) {
                BuildStep::Continue(next) => task = next,
                BuildStep::Done(field) => return field,
            }
        }
    }

    fn interpolate_column(&self, x: i64) -> Option<Column> {
        // Find the row extent where the field mask is defined.
        let mut y_min = self.bounds.y;
        let y_bound = self.bounds.y_max();
        while y_min < y_bound && !(self.field_mask)(x, y_min) {
            y_min += 1;
        }
        if y_min >= y_bound {
            return None;
        }
        let mut y_max = y_bound - 1;
        while y_max > y_min && !(self.field_mask)(x, y_max) {
            y_max -= 1;
        }

        let mut column = Column::new(y_min);
        for y in y_min..=y_max {
            let cell = if (self.field_mask)(x, y) {
                let v = self.interpolator.interpolate(x as f64, y as f64);
                // Magnitude stays in sample units (m/s for wind): the
                // style buckets quantize real speed, not display speed.
                // Only the displacement components are scaled to pixels.
                let magnitude = if (self.display_mask)(x, y) {
                    v.magnitude()
                } else {
                    INVISIBLE
                };
                let scaled = v.scaled(self.velocity_scale);
                Some(FieldVector::new(scaled.x, scaled.y, magnitude))
            } else {
                None
            };
            column.push(cell);
        }
        Some(column)
    }
}
