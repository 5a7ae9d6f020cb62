//! Display bounds in pixel space

use serde::{Deserialize, Serialize};

/// The location and size of the rectangular region being animated,
/// in whole pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayBounds {
    /// X coordinate of the upper-left corner
    pub x: i64,
    /// Y coordinate of the upper-left corner
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl DisplayBounds {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Compute bounds from two geographic corners and a projection into
    /// pixel space. The upper-left pixel is floored and the lower-right
    /// ceiled so the bounds fully cover the projected region.
    pub fn from_corners<P>(lng0: f64, lat0: f64, lng1: f64, lat1: f64, project: P) -> Self
    where
        P: Fn(f64, f64) -> (f64, f64),
    {
        let (ulx, uly) = project(lng0, lat1);
        let (lrx, lry) = project(lng1, lat0);
        let x = ulx.floor() as i64;
        let y = uly.floor() as i64;
        Self {
            x,
            y,
            width: lrx.ceil() as i64 - x + 1,
            height: lry.ceil() as i64 - y + 1,
        }
    }

    /// Exclusive upper bound in x.
    #[inline]
    pub fn x_max(&self) -> i64 {
        self.x + self.width
    }

    /// Exclusive upper bound in y.
    #[inline]
    pub fn y_max(&self) -> i64 {
        self.y + self.height
    }

    /// Whether the pixel (x, y) lies inside the bounds.
    #[inline]
    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && x < self.x_max() && y >= self.y && y < self.y_max()
    }
}
