//! Speed profile along a subdivided path

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::sync::Arc;

// Internal
use super::{
    AccelBounds, ConstraintWarning, ConstraintWarningKind, Params, PathPoint, TrajConstraint,
    TrajectoryState,
};
use crate::geom::Pose2;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Path steps shorter than this are treated as zero length.
///
/// Units: meters
const MIN_STEP_M: f64 = 1e-6;

/// Tolerance used when checking the profile reaches the requested start and
/// end speeds.
///
/// Units: meters/second
const END_SPEED_TOL_MS: f64 = 1e-6;

/// Tolerance used when comparing accelerations between passes.
///
/// Units: meters/second^2
const ACCEL_TOL_MSS: f64 = 1e-6;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Speed and acceleration limits at one path point, refined by the passes.
#[derive(Debug, Clone, Copy)]
struct ConstrainedPoint {
    /// Units: meters
    path_length_m: f64,

    /// Units: meters/second
    speed_ms: f64,

    /// Units: meters/second^2
    min_accel_mss: f64,

    /// Units: meters/second^2
    max_accel_mss: f64,
}

/// Works out the speed profile for one path.
pub(crate) struct Profiler<'a> {
    points: &'a [PathPoint],
    constraints: &'a [Arc<dyn TrajConstraint + Send + Sync>],
    params: &'a Params,

    warnings: Vec<ConstraintWarning>,

    /// Points which already have a speed warning recorded.
    speed_warned: Vec<bool>,

    /// Points which already have an acceleration warning recorded.
    accel_warned: Vec<bool>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<'a> Profiler<'a> {
    pub(crate) fn new(
        points: &'a [PathPoint],
        constraints: &'a [Arc<dyn TrajConstraint + Send + Sync>],
        params: &'a Params,
    ) -> Self {
        Self {
            points,
            constraints,
            params,
            warnings: Vec::new(),
            speed_warned: vec![false; points.len()],
            accel_warned: vec![false; points.len()],
        }
    }

    /// Run the forward and backward passes and integrate the result into time.
    ///
    /// Returns the profile states, one per path point, and any warnings
    /// raised while clamping unachievable constraints.
    pub(crate) fn run(mut self) -> (Vec<TrajectoryState>, Vec<ConstraintWarning>) {
        let caps = self.speed_caps();

        let mut constrained = self.forward_pass(&caps);
        self.backward_pass(&mut constrained);
        self.check_end_speeds(&constrained);

        let states = self.integrate(&constrained);

        (states, self.warnings)
    }

    /// Record a warning if the profile misses the requested start or end
    /// speed.
    fn check_end_speeds(&mut self, constrained: &[ConstrainedPoint]) {
        let (first, last) = match (constrained.first(), constrained.last()) {
            (Some(f), Some(l)) => (*f, *l),
            _ => return,
        };

        if (first.speed_ms - self.params.start_speed_ms).abs() > END_SPEED_TOL_MS {
            self.warnings.push(ConstraintWarning {
                path_length_m: first.path_length_m,
                kind: ConstraintWarningKind::StartSpeedUnreachable {
                    reached_ms: first.speed_ms,
                    requested_ms: self.params.start_speed_ms,
                },
            });
        }

        if (last.speed_ms - self.params.end_speed_ms).abs() > END_SPEED_TOL_MS {
            self.warnings.push(ConstraintWarning {
                path_length_m: last.path_length_m,
                kind: ConstraintWarningKind::EndSpeedUnreachable {
                    reached_ms: last.speed_ms,
                    requested_ms: self.params.end_speed_ms,
                },
            });
        }
    }

    /// Highest speed allowed at each point by the maximum speed and the
    /// constraints, raised to the minimum speed where needed.
    fn speed_caps(&mut self) -> Vec<f64> {
        let mut caps = Vec::with_capacity(self.points.len());

        for (i, point) in self.points.iter().enumerate() {
            let cap = self
                .constraints
                .iter()
                .map(|c| c.max_velocity_ms(point))
                .fold(self.params.max_speed_ms, f64::min);

            if cap < self.params.min_speed_ms || cap.is_nan() {
                self.warn_speed(i, cap);
                caps.push(self.params.min_speed_ms);
            }
            else {
                caps.push(cap);
            }
        }

        caps
    }

    /// Accelerate as hard as allowed from the start speed.
    fn forward_pass(&mut self, caps: &[f64]) -> Vec<ConstrainedPoint> {
        let mut constrained: Vec<ConstrainedPoint> = Vec::with_capacity(self.points.len());

        let mut pred = ConstrainedPoint {
            path_length_m: self.points[0].path_length_m,
            speed_ms: self.params.start_speed_ms,
            min_accel_mss: -self.params.max_accel_mss,
            max_accel_mss: self.params.max_accel_mss,
        };

        for i in 0..self.points.len() {
            let ds = self.points[i].path_length_m - pred.path_length_m;
            let mut state;

            loop {
                let reachable_ms = (pred.speed_ms.powi(2) + 2.0 * pred.max_accel_mss * ds)
                    .max(0.0)
                    .sqrt();
                let speed_ms = self.floor_speed(i, reachable_ms).min(caps[i]);
                let bounds = self.accel_bounds(i, speed_ms);

                state = ConstrainedPoint {
                    path_length_m: self.points[i].path_length_m,
                    speed_ms,
                    min_accel_mss: bounds.min_mss,
                    max_accel_mss: bounds.max_mss,
                };

                if ds < MIN_STEP_M {
                    break;
                }

                // If this point can't support the acceleration needed to reach
                // it, reduce the acceleration out of the previous point and
                // try again.
                let actual = (state.speed_ms.powi(2) - pred.speed_ms.powi(2)) / (2.0 * ds);
                if state.max_accel_mss < actual - ACCEL_TOL_MSS
                    && state.max_accel_mss < pred.max_accel_mss
                {
                    pred.max_accel_mss = state.max_accel_mss;
                }
                else {
                    if actual > pred.min_accel_mss {
                        pred.max_accel_mss = actual;
                    }
                    break;
                }
            }

            if let Some(prev) = constrained.last_mut() {
                *prev = pred;
            }
            constrained.push(state);
            pred = state;
        }

        constrained
    }

    /// Decelerate as hard as allowed into the end speed.
    fn backward_pass(&mut self, constrained: &mut [ConstrainedPoint]) {
        let n = constrained.len();

        let mut succ = ConstrainedPoint {
            path_length_m: self.points[n - 1].path_length_m,
            speed_ms: self.params.end_speed_ms,
            min_accel_mss: -self.params.max_accel_mss,
            max_accel_mss: self.params.max_accel_mss,
        };

        for i in (0..n).rev() {
            let ds = constrained[i].path_length_m - succ.path_length_m;

            loop {
                let reachable_ms = (succ.speed_ms.powi(2) + 2.0 * succ.min_accel_mss * ds)
                    .max(0.0)
                    .sqrt();
                let speed_ms = self.floor_speed(i, reachable_ms);

                // Already slow enough
                if speed_ms >= constrained[i].speed_ms {
                    break;
                }

                let bounds = self.accel_bounds(i, speed_ms);
                constrained[i].speed_ms = speed_ms;
                constrained[i].min_accel_mss = bounds.min_mss;
                constrained[i].max_accel_mss = bounds.max_mss;

                if ds > -MIN_STEP_M {
                    break;
                }

                let actual = (constrained[i].speed_ms.powi(2) - succ.speed_ms.powi(2)) / (2.0 * ds);
                if constrained[i].min_accel_mss > actual + ACCEL_TOL_MSS
                    && constrained[i].min_accel_mss > succ.min_accel_mss
                {
                    succ.min_accel_mss = constrained[i].min_accel_mss;
                }
                else {
                    succ.min_accel_mss = actual;
                    break;
                }
            }

            if i + 1 < n {
                constrained[i + 1].min_accel_mss = succ.min_accel_mss;
            }
            succ = constrained[i];
        }
    }

    /// Convert the distance based profile into timed states.
    fn integrate(&self, constrained: &[ConstrainedPoint]) -> Vec<TrajectoryState> {
        let mut states: Vec<TrajectoryState> = Vec::with_capacity(constrained.len());
        let sign = if self.params.reversed { -1.0 } else { 1.0 };

        let mut time_s = 0.0;
        let mut prev = constrained[0];

        for (point, c) in self.points.iter().zip(constrained.iter()) {
            let ds = c.path_length_m - prev.path_length_m;
            let mut accel_mss = 0.0;

            if ds > MIN_STEP_M {
                accel_mss = (c.speed_ms.powi(2) - prev.speed_ms.powi(2)) / (2.0 * ds);

                let speed_sum = c.speed_ms + prev.speed_ms;
                if speed_sum > 0.0 {
                    time_s += 2.0 * ds / speed_sum;
                }
                else {
                    // Stopped at both ends, time it as an accelerate then
                    // brake move over the segment
                    time_s += 2.0 * (ds / self.params.max_accel_mss).sqrt();
                }
            }

            // The acceleration of a segment is carried by the state at its start
            if let Some(last) = states.last_mut() {
                last.accel_mss = sign * accel_mss;
            }

            let course_rad = if self.params.reversed {
                wrap_pi(point.travel_rad + std::f64::consts::PI)
            }
            else {
                point.travel_rad
            };

            states.push(TrajectoryState {
                time_s,
                pose: Pose2::new(point.position_m.x, point.position_m.y, point.heading_rad),
                course_rad,
                velocity_ms: sign * c.speed_ms,
                accel_mss: sign * accel_mss,
                omega_rads: c.speed_ms * point.heading_rate_radpm,
                curvature_radpm: point.curvature_radpm,
                path_length_m: point.path_length_m,
            });

            prev = *c;
        }

        states
    }

    /// Raise the speed at an interior point to the minimum speed, so that a
    /// profile forced to decelerate can never come to a stop mid-path.
    fn floor_speed(&mut self, i: usize, speed_ms: f64) -> f64 {
        if i == 0 || i + 1 == self.points.len() || speed_ms >= self.params.min_speed_ms {
            return speed_ms;
        }

        self.warn_speed(i, speed_ms);
        self.params.min_speed_ms
    }

    /// Record that the speed at point `i` was raised to the minimum.
    fn warn_speed(&mut self, i: usize, speed_ms: f64) {
        if self.speed_warned[i] {
            return;
        }

        self.speed_warned[i] = true;
        self.warnings.push(ConstraintWarning {
            path_length_m: self.points[i].path_length_m,
            kind: ConstraintWarningKind::SpeedBelowMinimum {
                speed_ms,
                min_speed_ms: self.params.min_speed_ms,
            },
        });
    }

    /// Combined acceleration bounds of all constraints at point `i`, with the
    /// minimum lowered to the maximum if they cross.
    fn accel_bounds(&mut self, i: usize, speed_ms: f64) -> AccelBounds {
        let point = &self.points[i];
        let reversed = self.params.reversed;
        let velocity_ms = if reversed { -speed_ms } else { speed_ms };

        let mut bounds = AccelBounds {
            min_mss: -self.params.max_accel_mss,
            max_mss: self.params.max_accel_mss,
        };

        for c in self.constraints.iter() {
            let b = c.accel_bounds(point, velocity_ms);

            // Bounds are given in the signed velocity direction
            let (min, max) = if reversed { (-b.max_mss, -b.min_mss) } else { (b.min_mss, b.max_mss) };
            bounds.min_mss = bounds.min_mss.max(min);
            bounds.max_mss = bounds.max_mss.min(max);
        }

        if bounds.min_mss > bounds.max_mss {
            if !self.accel_warned[i] {
                self.accel_warned[i] = true;
                self.warnings.push(ConstraintWarning {
                    path_length_m: point.path_length_m,
                    kind: ConstraintWarningKind::InfeasibleAccel {
                        min_accel_mss: bounds.min_mss,
                        max_accel_mss: bounds.max_mss,
                    },
                });
            }
            bounds.min_mss = bounds.max_mss;
        }

        bounds
    }
}
