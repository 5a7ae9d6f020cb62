//! Particle advection animation
//!
//! Maintains a fixed pool of particles advected through the vector field.
//! Frame by frame each particle ages by one and moves by the vector at
//! its position; at max age it reincarnates at a random data cell.
//! Visible moves are grouped into speed buckets so the renderer can
//! stroke every particle of one style in a single path operation, after
//! fading previously drawn trails.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use rand::Rng;
use windfield_core::{DisplayBounds, Field};

use crate::settings::AnimationSettings;

/// A pooled particle. Recycled in place on respawn, never reallocated.
#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    /// Next position, valid for particles queued in a draw bucket
    pub xt: f64,
    pub yt: f64,
    pub age: u32,
}

/// A line segment from a particle's current to its next position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub x: f64,
    pub y: f64,
    pub xt: f64,
    pub yt: f64,
}

/// Where a frame's output goes. Implemented by the external renderer;
/// the engine never touches a drawing surface itself.
pub trait RenderSink {
    /// Fade previously drawn particle trails.
    fn fade(&mut self, bounds: DisplayBounds);
    /// Stroke all segments sharing one style bucket.
    fn stroke_bucket(&mut self, style: usize, segments: &[Segment]);
    /// Ask the host map view to repaint.
    fn repaint(&mut self);
}

/// Cancellation flag shared with a running animation.
///
/// `stop` is idempotent; once set, no further frame is produced. An
/// in-flight frame completes normally.
#[derive(Debug, Clone)]
pub struct AnimationHandle {
    stopped: Arc<AtomicBool>,
}

impl AnimationHandle {
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Relaxed)
    }
}

/// The particle animation loop state.
///
/// The host drives it: either call [`frame`](Self::frame) from its own
/// timer at `settings.frame_interval`, or hand the loop to
/// [`run`](Self::run) on a dedicated thread.
pub struct ParticleAnimation<R: Rng> {
    settings: AnimationSettings,
    bounds: DisplayBounds,
    field: Field,
    particles: Vec<Particle>,
    buckets: Vec<Vec<Segment>>,
    rng: R,
    stopped: Arc<AtomicBool>,
}

impl<R: Rng> ParticleAnimation<R> {
    /// Start an animation over `field`, seeding the particle pool at
    /// random data cells with staggered ages.
    pub fn start(
        settings: AnimationSettings,
        bounds: DisplayBounds,
        field: Field,
        mut rng: R,
    ) -> (Self, AnimationHandle) {
        let mut particles = Vec::new();
        if !field.is_empty() {
            particles.reserve(settings.particle_count);
            for _ in 0..settings.particle_count {
                // randomize only fails on an empty field, checked above
                let (x, y) = field.randomize(&mut rng).unwrap_or((0.0, 0.0));
                let age = rng.random_range(0..=settings.max_particle_age);
                particles.push(Particle {
                    x,
                    y,
                    xt: x,
                    yt: y,
                    age,
                });
            }
        }

        let buckets = vec![Vec::new(); settings.style_count];
        let stopped = Arc::new(AtomicBool::new(false));
        let handle = AnimationHandle {
            stopped: Arc::clone(&stopped),
        };
        (
            Self {
                settings,
                bounds,
                field,
                particles,
                buckets,
                rng,
                stopped,
            },
            handle,
        )
    }

    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Draw buckets filled by the most recent tick.
    pub fn buckets(&self) -> &[Vec<Segment>] {
        &self.buckets
    }

    /// Replace the field between frames, returning the old one. This is
    /// the supported way to refresh data under a running animation; the
    /// field itself is immutable once published.
    pub fn swap_field(&mut self, field: Field) -> Field {
        std::mem::replace(&mut self.field, field)
    }

    /// Advance every particle by one tick and regroup the visible moves
    /// into draw buckets.
    pub fn evolve(&mut self) {
        for bucket in &mut self.buckets {
            bucket.clear();
        }

        let max_age = self.settings.max_particle_age;
        for particle in &mut self.particles {
            if particle.age > max_age {
                if let Some((x, y)) = self.field.randomize(&mut self.rng) {
                    particle.x = x;
                    particle.y = y;
                    particle.age = 0;
                }
            }

            let v = self.field.get(particle.x, particle.y);
            if v.is_nil() {
                // Particle has escaped the field, never to return;
                // mark it for reincarnation on the next tick.
                particle.age = max_age;
            } else {
                let xt = particle.x + v.dx;
                let yt = particle.y + v.dy;
                if v.is_visible() && self.field.get(xt, yt).is_visible() {
                    particle.xt = xt;
                    particle.yt = yt;
                    self.buckets[self.settings.style_index(v.magnitude)].push(Segment {
                        x: particle.x,
                        y: particle.y,
                        xt,
                        yt,
                    });
                    particle.x = xt;
                    particle.y = yt;
                } else {
                    // Not visible, but the particle still moves.
                    particle.x = xt;
                    particle.y = yt;
                }
            }
            particle.age += 1;
        }
    }

    /// Produce one frame: evolve the pool, then emit fade, bucket
    /// strokes and a repaint request to the sink.
    ///
    /// Returns false, producing nothing, once the handle was stopped.
    pub fn frame<S: RenderSink>(&mut self, sink: &mut S) -> bool {
        if self.stopped.load(Ordering::Relaxed) {
            return false;
        }

        self.evolve();
        sink.fade(self.bounds);
        for (style, bucket) in self.buckets.iter().enumerate() {
            if !bucket.is_empty() {
                sink.stroke_bucket(style, bucket);
            }
        }
        sink.repaint();
        true
    }

    /// Free-running loop at the configured frame interval. Blocks the
    /// calling thread until the handle is stopped.
    pub fn run<S: RenderSink>(&mut self, sink: &mut S) {
        loop {
            let start = Instant::now();
            if !self.frame(sink) {
                return;
            }
            let interval = self.settings.frame_interval;
            std::thread::sleep(interval.saturating_sub(start.elapsed()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use windfield_core::{Column, FieldVector, INVISIBLE};

    #[derive(Default)]
    struct RecordingSink {
        fades: usize,
        strokes: Vec<(usize, usize)>,
        repaints: usize,
    }

    impl RenderSink for RecordingSink {
        fn fade(&mut self, _bounds: DisplayBounds) {
            self.fades += 1;
        }

        fn stroke_bucket(&mut self, style: usize, segments: &[Segment]) {
            self.strokes.push((style, segments.len()));
        }

        fn repaint(&mut self) {
            self.repaints += 1;
        }
    }

    fn uniform_column(y_min: i64, rows: usize, v: FieldVector) -> Column {
        let mut c = Column::new(y_min);
        for _ in 0..rows {
            c.push(Some(v));
        }
        c
    }

    /// 6x6 field of rightward vectors at x = 0..6, all visible.
    fn uniform_field(dx: f64) -> Field {
        let v = FieldVector::new(dx, 0.0, dx.abs());
        let columns = (0..6).map(|_| Some(uniform_column(0, 6, v))).collect();
        Field::new(0, columns)
    }

    fn test_settings() -> AnimationSettings {
        AnimationSettings {
            particle_count: 20,
            max_particle_age: 4,
            velocity_scale: 1.0,
            frame_interval: std::time::Duration::from_millis(1),
            style_count: 10,
        }
    }

    fn start(field: Field) -> (ParticleAnimation<StdRng>, AnimationHandle) {
        ParticleAnimation::start(
            test_settings(),
            DisplayBounds::new(0, 0, 8, 8),
            field,
            StdRng::seed_from_u64(11),
        )
    }

    #[test]
    fn test_pool_seeded_on_data_cells() {
        let (anim, _) = start(uniform_field(1.0));
        assert_eq!(anim.particles().len(), 20);
        for p in anim.particles() {
            assert!(!anim.field.get(p.x, p.y).is_nil());
            assert!(p.age <= 4);
        }
    }

    #[test]
    fn test_visible_moves_land_in_one_bucket() {
        let (mut anim, _) = start(uniform_field(1.0));
        anim.evolve();

        let expected_style = anim.settings().style_index(1.0);
        let mut total = 0;
        for (style, bucket) in anim.buckets().iter().enumerate() {
            if style != expected_style {
                assert!(bucket.is_empty(), "unexpected segments in bucket {style}");
            }
            total += bucket.len();
        }
        assert!(total > 0);

        // Every drawn segment is a unit move to the right.
        for segment in &anim.buckets()[expected_style] {
            assert_eq!(segment.xt, segment.x + 1.0);
            assert_eq!(segment.yt, segment.y);
        }
    }

    #[test]
    fn test_escaped_particle_forced_to_max_age_and_respawned() {
        let (mut anim, _) = start(uniform_field(1.0));
        let max_age = anim.settings().max_particle_age;

        // Strand one particle outside the field.
        anim.particles[0].x = 100.0;
        anim.particles[0].y = 100.0;
        anim.particles[0].age = 1;

        anim.evolve();
        // Forced to max age, then the tick's age increment applies.
        assert_eq!(anim.particles[0].age, max_age + 1);

        anim.evolve();
        let p = anim.particles[0];
        assert_eq!(p.age, 1, "respawned particle starts a new life");
        assert!(!anim.field.get(p.x, p.y).is_nil(), "respawn must land on data");
    }

    #[test]
    fn test_invisible_particles_move_without_drawing() {
        let v = FieldVector::new(1.0, 0.0, INVISIBLE);
        let columns = (0..6).map(|_| Some(uniform_column(0, 6, v))).collect();
        let (mut anim, _) = start(Field::new(0, columns));

        let before: Vec<(f64, f64)> = anim.particles().iter().map(|p| (p.x, p.y)).collect();
        anim.evolve();
        assert!(anim.buckets().iter().all(Vec::is_empty));
        for (p, (x, y)) in anim.particles().iter().zip(before) {
            assert_eq!(p.x, x + 1.0);
            assert_eq!(p.y, y);
        }
    }

    #[test]
    fn test_buckets_cleared_each_frame() {
        let (mut anim, _) = start(uniform_field(1.0));
        anim.evolve();
        let first: usize = anim.buckets().iter().map(Vec::len).sum();
        anim.evolve();
        let second: usize = anim.buckets().iter().map(Vec::len).sum();
        // Counts may differ as particles drift off-screen, but stale
        // segments must never accumulate.
        assert!(second <= first + anim.particles().len());
        assert!(first > 0);
    }

    #[test]
    fn test_frame_emits_fade_strokes_repaint() {
        let (mut anim, _) = start(uniform_field(1.0));
        let mut sink = RecordingSink::default();
        assert!(anim.frame(&mut sink));
        assert_eq!(sink.fades, 1);
        assert_eq!(sink.repaints, 1);
        assert!(!sink.strokes.is_empty());
    }

    #[test]
    fn test_stop_is_idempotent_and_final() {
        let (mut anim, handle) = start(uniform_field(1.0));
        let mut sink = RecordingSink::default();
        assert!(anim.frame(&mut sink));

        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
        assert!(!anim.frame(&mut sink));
        assert!(!anim.frame(&mut sink));
        // Only the pre-stop frame reached the sink.
        assert_eq!(sink.fades, 1);
        assert_eq!(sink.repaints, 1);
    }

    #[test]
    fn test_swap_field_between_frames() {
        let (mut anim, _) = start(uniform_field(1.0));
        anim.evolve();

        let old = anim.swap_field(uniform_field(-1.0));
        assert!(!old.is_empty());
        anim.evolve();

        let style = anim.settings().style_index(1.0);
        for segment in &anim.buckets()[style] {
            assert_eq!(segment.xt, segment.x - 1.0, "field swap must steer particles");
        }
    }

    #[test]
    fn test_empty_field_animates_nothing() {
        let (mut anim, _) = start(Field::new(0, vec![None; 4]));
        assert!(anim.particles().is_empty());
        let mut sink = RecordingSink::default();
        assert!(anim.frame(&mut sink));
        assert!(sink.strokes.is_empty());
    }
}
