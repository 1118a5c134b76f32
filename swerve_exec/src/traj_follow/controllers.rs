//! # Trajectory following controllers
//!
//! PID controllers correcting the position and heading errors of the robot
//! against the current trajectory sample.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::Serialize;

// Internal
use super::Params;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller run at a fixed period.
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Derivative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64,
}

/// The controllers used by the follower.
#[derive(Debug, Serialize, Clone)]
pub struct FollowControllers {
    /// Field X error controller
    x_ctrl: PidController,

    /// Field Y error controller
    y_ctrl: PidController,

    /// Heading error controller
    head_ctrl: PidController,

    /// Units: meters/second
    max_pos_correction_ms: f64,

    /// Units: radians/second
    max_head_correction_rads: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            integral: 0f64,
            prev_error: None,
        }
    }

    /// Get the value of the controller for the given error, `dt_s` after the
    /// previous call.
    pub fn get(&mut self, error: f64, dt_s: f64) -> f64 {
        // Accumulate the integral term
        self.integral += error * dt_s;

        // On the first call there's no previous error, so rather than produce
        // a large spike assume no derivative.
        let deriv = match self.prev_error {
            Some(e) if dt_s > 0.0 => (error - e) / dt_s,
            _ => 0f64,
        };

        self.prev_error = Some(error);

        self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv
    }

    /// Clear the integral and derivative history.
    pub fn reset(&mut self) {
        self.integral = 0f64;
        self.prev_error = None;
    }
}

impl FollowControllers {

    /// Create a new instance of the controllers from the parameters
    pub fn new(params: &Params) -> Self {
        Self {
            x_ctrl: PidController::new(params.pos_k_p, params.pos_k_i, params.pos_k_d),
            y_ctrl: PidController::new(params.pos_k_p, params.pos_k_i, params.pos_k_d),
            head_ctrl: PidController::new(params.head_k_p, params.head_k_i, params.head_k_d),
            max_pos_correction_ms: params.max_pos_correction_ms,
            max_head_correction_rads: params.max_head_correction_rads,
        }
    }

    pub fn reset(&mut self) {
        self.x_ctrl.reset();
        self.y_ctrl.reset();
        self.head_ctrl.reset();
    }

    /// Field frame velocity correcting the position error (target minus
    /// actual).
    ///
    /// Units: meters/second
    pub fn pos_correction_ms(&mut self, error_m: &Vector2<f64>, dt_s: f64) -> Vector2<f64> {
        let corr = Vector2::new(
            self.x_ctrl.get(error_m.x, dt_s),
            self.y_ctrl.get(error_m.y, dt_s),
        );

        // Limit the magnitude but keep the direction
        let mag = corr.norm();
        if mag > self.max_pos_correction_ms {
            corr * (self.max_pos_correction_ms / mag)
        }
        else {
            corr
        }
    }

    /// Rotation rate correcting the heading error (target minus actual).
    ///
    /// Units: radians/second
    pub fn head_correction_rads(&mut self, error_rad: f64, dt_s: f64) -> f64 {
        self.head_ctrl
            .get(error_rad, dt_s)
            .clamp(-self.max_head_correction_rads, self.max_head_correction_rads)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_pid() {
        let mut pid = PidController::new(2.0, 1.0, 0.5);

        // First call: no derivative, integral of one period
        assert_abs_diff_eq!(pid.get(1.0, 0.1), 2.0 + 0.1);

        // Second call: error falls by 0.5 over 0.1 s
        assert_abs_diff_eq!(pid.get(0.5, 0.1), 1.0 + 0.15 + 0.5 * -5.0, epsilon = 1e-12);

        pid.reset();
        assert_abs_diff_eq!(pid.get(1.0, 0.1), 2.1);
    }

    #[test]
    fn test_correction_limits() {
        let mut params = Params::default();
        params.pos_k_p = 10.0;
        params.max_pos_correction_ms = 1.0;
        params.head_k_p = 10.0;
        params.max_head_correction_rads = 0.5;
        let mut ctrl = FollowControllers::new(&params);

        let corr = ctrl.pos_correction_ms(&Vector2::new(0.3, -0.4), 0.02);
        assert_abs_diff_eq!(corr.norm(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(corr.x / corr.y, -0.75, epsilon = 1e-12);

        assert_abs_diff_eq!(ctrl.head_correction_rads(-1.0, 0.02), -0.5);
    }
}
