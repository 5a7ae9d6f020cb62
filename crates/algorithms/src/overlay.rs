//! Static scalar overlays
//!
//! Fits a thin-plate-spline surface to scalar samples (temperature,
//! humidity, wind speed, ...) and walks the display bounds in 2x2 pixel
//! cells, producing a normalized level per cell for the external
//! renderer to color. Uses the same yield-and-resume batching as the
//! field builder so a large overlay never blocks the host loop.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use windfield_core::{DisplayBounds, Result};

use crate::interpolation::{Interpolate, SamplePoint, ThinPlateSpline};

/// Size in pixels of one overlay cell.
pub const CELL_SIZE: i64 = 2;

/// How a recipe maps its value range onto [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scale {
    Linear,
    #[serde(rename = "log")]
    Logarithmic,
}

/// Display recipe for one measured quantity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub min: f64,
    pub max: f64,
    pub scale: Scale,
}

impl Recipe {
    pub fn new(min: f64, max: f64, scale: Scale) -> Self {
        Self { min, max, scale }
    }

    /// Wind velocity in m/s.
    pub fn wind_velocity() -> Self {
        Self::new(1.0, 20.0, Scale::Logarithmic)
    }

    pub fn range(&self) -> f64 {
        self.max - self.min
    }

    /// Spline rigidity used for this quantity: 5% of the value range.
    pub fn rigidity(&self) -> f64 {
        self.range() * 0.05
    }

    /// Clamp an interpolated value to [min, max] and normalize to [0, 1],
    /// through the logarithmic mapping if the recipe asks for one.
    pub fn level(&self, z: f64) -> f64 {
        let z = (z.clamp(self.min, self.max) - self.min) / self.range();
        match self.scale {
            Scale::Linear => z,
            // Map to [1, 101] and back so level 0 stays at 0.
            Scale::Logarithmic => (z * 100.0 + 1.0).ln() / 101.0_f64.ln(),
        }
    }
}

/// One colored overlay cell: the normalized level at pixel (x, y),
/// covering [`CELL_SIZE`] pixels in each direction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayCell {
    pub x: i64,
    pub y: i64,
    pub level: f64,
}

/// A finished overlay, handed to the external renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overlay {
    pub cells: Vec<OverlayCell>,
}

/// Outcome of one batch of overlay construction.
pub enum OverlayStep<I, DM> {
    Continue(OverlayBuilder<I, DM>),
    Done(Overlay),
}

/// A resumable overlay-construction task over any scalar interpolator.
pub struct OverlayBuilder<I, DM> {
    interpolator: I,
    bounds: DisplayBounds,
    display_mask: DM,
    recipe: Recipe,
    cells: Vec<OverlayCell>,
    cursor: i64,
}

impl<I, DM> std::fmt::Debug for OverlayBuilder<I, DM> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OverlayBuilder")
            .field("bounds", &self.bounds)
            .field("recipe", &self.recipe)
            .field("cursor", &self.cursor)
            .finish_non_exhaustive()
    }
}

impl<DM> OverlayBuilder<ThinPlateSpline, DM>
where
    DM: Fn(i64, i64) -> bool,
{
    /// Fit a thin plate spline to the samples with the recipe's rigidity
    /// and prepare an overlay build over `bounds`.
    ///
    /// # Errors
    /// Construction errors of [`ThinPlateSpline::new`].
    pub fn thin_plate_spline(
        points: Vec<SamplePoint>,
        recipe: Recipe,
        bounds: DisplayBounds,
        display_mask: DM,
    ) -> Result<Self> {
        let tps = ThinPlateSpline::new(points, recipe.rigidity())?;
        Ok(Self::new(tps, recipe, bounds, display_mask))
    }
}

impl<I, DM> OverlayBuilder<I, DM>
where
    I: Interpolate<Value = f64>,
    DM: Fn(i64, i64) -> bool,
{
    pub fn new(interpolator: I, recipe: Recipe, bounds: DisplayBounds, display_mask: DM) -> Self {
        Self {
            interpolator,
            bounds,
            display_mask,
            recipe,
            cells: Vec::new(),
            cursor: bounds.x,
        }
    }

    pub fn columns_done(&self) -> i64 {
        (self.cursor - self.bounds.x) / CELL_SIZE
    }

    pub fn columns_total(&self) -> i64 {
        (self.bounds.width + CELL_SIZE - 1) / CELL_SIZE
    }

    /// Run one batch, at most until `budget` of wall-clock time is
    /// spent, sliced at column granularity.
    pub fn advance(mut self, budget: Duration) -> OverlayStep<I, DM> {
        let start = Instant::now();
        while self.cursor < self.bounds.x_max() {
            self.interpolate_column(self.cursor);
            self.cursor += CELL_SIZE;
            if start.elapsed() > budget {
                return OverlayStep::Continue(self);
            }
        }
        OverlayStep::Done(Overlay { cells: self.cells })
    }

    /// Run to completion without yielding.
    pub fn build(self) -> Overlay {
        let mut task = self;
        loop {
            match task.advance(Duration::MAX) {
                OverlayStep::Continue(next) => task = next,
                OverlayStep::Done(overlay) => return overlay,
            }
        }
    }

    fn interpolate_column(&mut self, x: i64) {
        let mut y = self.bounds.y;
        while y < self.bounds.y_max() {
            if (self.display_mask)(x, y) {
                let z = self.interpolator.interpolate(x as f64, y as f64);
                self.cells.push(OverlayCell {
                    x,
                    y,
                    level: self.recipe.level(z),
                });
            }
            y += CELL_SIZE;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Plane;

    impl Interpolate for Plane {
        type Value = f64;

        fn interpolate(&self, x: f64, _y: f64) -> f64 {
            x
        }
    }

    fn bounds() -> DisplayBounds {
        DisplayBounds::new(0, 0, 20, 10)
    }

    #[test]
    fn test_levels_clamped_and_normalized() {
        let recipe = Recipe::new(5.0, 15.0, Scale::Linear);
        let overlay = OverlayBuilder::new(Plane, recipe, bounds(), |_, _| true).build();

        for cell in &overlay.cells {
            assert!((0.0..=1.0).contains(&cell.level), "level {}", cell.level);
            assert_eq!(cell.x % CELL_SIZE, 0);
            assert_eq!(cell.y % CELL_SIZE, 0);
        }

        // x below min clamps to 0, above max to 1.
        let low = overlay.cells.iter().find(|c| c.x == 0).unwrap();
        let high = overlay.cells.iter().find(|c| c.x == 18).unwrap();
        assert_eq!(low.level, 0.0);
        assert_eq!(high.level, 1.0);
    }

    #[test]
    fn test_logarithmic_mapping_boosts_low_values() {
        let linear = Recipe::new(0.0, 10.0, Scale::Linear);
        let log = Recipe::new(0.0, 10.0, Scale::Logarithmic);
        assert_eq!(log.level(0.0), 0.0);
        assert!((log.level(10.0) - 1.0).abs() < 1e-12);
        assert!(log.level(2.0) > linear.level(2.0));
    }

    #[test]
    fn test_display_mask_filters_cells() {
        let recipe = Recipe::new(0.0, 20.0, Scale::Linear);
        let overlay =
            OverlayBuilder::new(Plane, recipe, bounds(), |x, _| x >= 10).build();
        assert!(!overlay.cells.is_empty());
        assert!(overlay.cells.iter().all(|c| c.x >= 10));
    }

    #[test]
    fn test_time_sliced_build_matches_one_shot() {
        let recipe = Recipe::new(0.0, 20.0, Scale::Logarithmic);
        let mask = |x: i64, y: i64| (x + y) % 3 != 0;

        let mut task = OverlayBuilder::new(Plane, recipe.clone(), bounds(), mask);
        let sliced = loop {
            match task.advance(Duration::ZERO) {
                OverlayStep::Continue(next) => task = next,
                OverlayStep::Done(overlay) => break overlay,
            }
        };

        let one_shot = OverlayBuilder::new(Plane, recipe, bounds(), mask).build();
        assert_eq!(sliced, one_shot);
    }

    #[test]
    fn test_tps_overlay_end_to_end() {
        let points = vec![
            SamplePoint::new(0.0, 0.0, 2.0),
            SamplePoint::new(19.0, 0.0, 18.0),
            SamplePoint::new(0.0, 9.0, 6.0),
            SamplePoint::new(19.0, 9.0, 12.0),
            SamplePoint::new(10.0, 5.0, 10.0),
        ];
        let builder = OverlayBuilder::thin_plate_spline(
            points,
            Recipe::wind_velocity(),
            bounds(),
            |_, _| true,
        )
        .unwrap();
        let overlay = builder.build();
        assert_eq!(overlay.cells.len(), 10 * 5);
        assert!(overlay.cells.iter().all(|c| (0.0..=1.0).contains(&c.level)));
    }

    #[test]
    fn test_too_few_points_fails_fast() {
        let err = OverlayBuilder::thin_plate_spline(
            vec![SamplePoint::new(0.0, 0.0, 1.0)],
            Recipe::wind_velocity(),
            bounds(),
            |_, _| true,
        )
        .unwrap_err();
        assert_eq!(
            err,
            windfield_core::Error::InsufficientPoints {
                required: 3,
                actual: 1
            }
        );
    }
}
