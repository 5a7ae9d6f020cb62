//! Animation settings
//!
//! Tunables for the particle animation, with defaults derived from the
//! display bounds the way the original visualization sized itself.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use windfield_core::DisplayBounds;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationSettings {
    /// Number of particles kept alive in the pool
    pub particle_count: usize,
    /// Max number of frames a particle is drawn before regeneration
    pub max_particle_age: u32,
    /// Particle speed as number of pixels per unit vector
    pub velocity_scale: f64,
    /// Desired time per frame
    pub frame_interval: Duration,
    /// Number of speed-based draw buckets (stroke styles)
    pub style_count: usize,
}

impl AnimationSettings {
    /// Derive settings from the size of the animated region.
    pub fn derive(bounds: &DisplayBounds) -> Self {
        let height = bounds.height as f64;
        Self {
            particle_count: (height / 0.24).round() as usize,
            max_particle_age: 40,
            velocity_scale: (height / 700.0 * 1000.0).round() / 1000.0,
            frame_interval: Duration::from_millis(60),
            style_count: 35,
        }
    }

    /// Map a vector magnitude (in sample units, m/s for wind) to a draw
    /// bucket. Speeds are clamped at 10; everything faster shares the
    /// last bucket.
    pub fn style_index(&self, magnitude: f64) -> usize {
        let m = magnitude.clamp(0.0, 10.0);
        (m / 10.0 * (self.style_count - 1) as f64).floor() as usize
    }
}
