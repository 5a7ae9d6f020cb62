//! # Windfield Algorithms
//!
//! Spatial interpolation and animation building blocks for windfield.
//!
//! ## Available Categories
//!
//! - **linalg**: Dense LU decomposition and solve
//! - **interpolation**: k-d tree, IDW, thin-plate splines, bilinear
//! - **samples**: Station directory and measurement ingestion
//! - **field_builder**: Time-sliced vector field construction
//! - **overlay**: Scalar overlay rasterization
//! - **particle**: Particle pool animation over a field
//! - **settings**: Display-derived animation parameters

pub mod field_builder;
pub mod interpolation;
pub mod linalg;
pub mod overlay;
pub mod particle;
pub mod samples;
pub mod settings;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::field_builder::{BuildStep, FieldBuilder, MAX_TASK_TIME, MIN_SLEEP_TIME};
    pub use crate::interpolation::{
        bilinear, InverseDistanceWeighting, Interpolate, KdTree, Neighbor, NeighborHeap,
        SamplePoint, SampleValue, ThinPlateSpline,
    };
    pub use crate::linalg::{lu_decompose, solve, Matrix};
    pub use crate::overlay::{
        Overlay, OverlayBuilder, OverlayCell, OverlayStep, Recipe, Scale, CELL_SIZE,
    };
    pub use crate::particle::{
        AnimationHandle, Particle, ParticleAnimation, RenderSink, Segment,
    };
    pub use crate::samples::{
        build_points, componentize, scalar_points, wind_points, SampleSet, ScalarSample, Station,
        StationDirectory, StationRow, WindSample,
    };
    pub use crate::settings::AnimationSettings;
    pub use windfield_core::prelude::*;
}
