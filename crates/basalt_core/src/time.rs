//! Fixed-step timing.
//!
//! [`StepTimer`] owns the accumulator that decides how many simulation
//! steps a render frame must run and what the leftover interpolation
//! factor is.  Hosts feed it their own frame delta; the runtime never
//! reads the wall clock itself.

/// Fixed-timestep accumulator.
///
/// Feed it the variable render-frame delta with [`StepTimer::advance`],
/// then drain whole simulation steps with [`StepTimer::consume`]:
///
/// ```rust,ignore
/// timer.advance(frame_dt);
/// while timer.consume() {
///     world.fixed_step();
/// }
/// let alpha = timer.alpha(); // render interpolation factor
/// ```
#[derive(Debug, Clone)]
pub struct StepTimer {
    fixed_dt: f32,
    accumulator: f32,
}

impl StepTimer {
    /// `fixed_dt` is the simulation step length in seconds; must be > 0.
    pub fn new(fixed_dt: f32) -> Self {
        debug_assert!(fixed_dt > 0.0);
        Self {
            fixed_dt,
            accumulator: 0.0,
        }
    }

    /// The simulation step length in seconds.
    #[inline]
    pub fn fixed_dt(&self) -> f32 {
        self.fixed_dt
    }

    /// Add a render frame's delta.  Clamped to 0.1 s so a long stall
    /// never queues up hundreds of steps (spiral-of-death guard).
    pub fn advance(&mut self, dt: f32) {
        self.accumulator += dt.min(0.1);
    }

    /// Take one fixed step out of the accumulator if one is available.
    pub fn consume(&mut self) -> bool {
        if self.accumulator >= self.fixed_dt {
            self.accumulator -= self.fixed_dt;
            true
        } else {
            false
        }
    }

    /// Leftover fraction of a step, in `[0, 1)` — the interpolation factor
    /// for rendering between the last two simulated states.
    pub fn alpha(&self) -> f32 {
        self.accumulator / self.fixed_dt
    }
}
