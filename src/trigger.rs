//! Where and when new bolts strike.

use cgmath::{InnerSpace, Vector3};
use rand::Rng;

/// Depth span of timer strikes as a fraction of the shell radius.
const SHELL_DEPTH_FRACTION: f32 = 0.94;

/// Random point on the shell of `radius`.
///
/// `y` and `z` are drawn independently; `x` takes whatever radius is left,
/// with a random sign. When `y` and `z` alone already reach the radius, `x`
/// collapses to 0 and the point lies on or outside the shell.
pub fn shell_source<R: Rng>(rng: &mut R, radius: f32) -> Vector3<f32> {
    let z = radius * SHELL_DEPTH_FRACTION * rng.random_range(-1.0..1.0f32);
    let y = radius * rng.random_range(-1.0..1.0f32);
    let rest = radius * radius - z * z - y * y;
    let x = if rest <= 0.0 { 0.0 } else { rest.sqrt() };
    let sign = if rng.random_range(-1.0..1.0f32) <= 0.0 { -1.0 } else { 1.0 };
    Vector3::new(sign * x, y, z)
}

/// Point `offset` away from `center` in the direction of `source`.
pub fn destination_for(source: Vector3<f32>, center: Vector3<f32>, offset: f32) -> Vector3<f32> {
    let toward = source - center;
    if toward.magnitude2() <= f32::EPSILON {
        return center;
    }
    center + toward.normalize() * offset
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointingRay {
    pub origin: Vector3<f32>,
    pub direction: Vector3<f32>,
}

impl PointingRay {
    pub fn new(origin: Vector3<f32>, direction: Vector3<f32>) -> Self {
        Self { origin, direction }
    }

    pub fn at(&self, t: f32) -> Vector3<f32> {
        self.origin + self.direction * t
    }

    /// Far intersection with the origin-centred sphere of `radius`.
    pub fn shell_hit(&self, radius: f32) -> Option<Vector3<f32>> {
        let a = self.direction.magnitude2();
        if a <= f32::EPSILON {
            return None;
        }
        let b = 2.0 * self.origin.dot(self.direction);
        let c = self.origin.magnitude2() - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant < 0.0 {
            return None;
        }
        let t = (-b + discriminant.sqrt()) / (2.0 * a);
        (t >= 0.0).then(|| self.at(t))
    }
}

/// Fires at random intervals drawn below an adjustable upper bound.
#[derive(Clone, Debug)]
pub struct TimerTrigger {
    elapsed: f64,
    pace: f64,
    upper_bound: f64,
    step: f64,
    min: f64,
    max: f64,
}

impl TimerTrigger {
    pub fn new(pace: f64, upper_bound: f64, step: f64, min: f64, max: f64) -> Self {
        Self {
            elapsed: 0.0,
            pace,
            upper_bound: upper_bound.clamp(min, max),
            step,
            min,
            max,
        }
    }

    pub fn pace(&self) -> f64 {
        self.pace
    }

    pub fn upper_bound(&self) -> f64 {
        self.upper_bound
    }

    /// Accumulates `dt` and reports whether a strike is due. A strike resets
    /// the accumulator and draws the next pace.
    pub fn advance<R: Rng>(&mut self, rng: &mut R, dt: f64) -> bool {
        self.elapsed += dt;
        if self.elapsed <= self.pace {
            return false;
        }
        self.elapsed = 0.0;
        self.pace = if self.upper_bound > 0.0 {
            rng.random_range(0.0..self.upper_bound)
        } else {
            0.0
        };
        true
    }

    /// Shortens the longest possible gap between strikes.
    pub fn faster(&mut self) -> f64 {
        self.upper_bound -= self.step;
        if self.upper_bound < self.min {
            self.upper_bound = self.min;
        }
        log::info!("strikes come faster, pace upper bound {:.1}s", self.upper_bound);
        self.upper_bound
    }

    pub fn slower(&mut self) -> f64 {
        self.upper_bound = (self.upper_bound + self.step).min(self.max);
        log::info!("strikes come slower, pace upper bound {:.1}s", self.upper_bound);
        self.upper_bound
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::SmallRng, SeedableRng};

    #[test]
    fn shell_sources_lie_on_or_beyond_the_shell() {
        let mut rng = SmallRng::seed_from_u64(21);
        let mut collapsed = 0;
        for _ in 0..2000 {
            let source = shell_source(&mut rng, 5.0);
            assert!(source.z.abs() <= 4.7 + 1e-5);
            assert!(source.y.abs() <= 5.0 + 1e-5);
            if source.x != 0.0 {
                assert!((source.magnitude() - 5.0).abs() < 1e-3);
            } else {
                collapsed += 1;
                assert!(source.magnitude() >= 5.0 - 1e-4);
            }
        }
        // y and z alone overshoot the radius in roughly a fifth of the draws
        assert!(collapsed > 0);
    }

    #[test]
    fn destination_sits_on_small_sphere_toward_source() {
        let center = Vector3::new(0.0, 0.6, -1.0);
        let destination = destination_for(Vector3::new(5.0, 0.0, 0.0), center, 0.1);
        assert!(((destination - center).magnitude() - 0.1).abs() < 1e-6);
        assert!(destination.x > 0.0);
        assert_eq!(destination_for(center, center, 0.1), center);
    }

    #[test]
    fn ray_from_inside_hits_shell_in_front() {
        let ray = PointingRay::new(Vector3::new(0.0, 0.5, 0.0), Vector3::new(0.0, 0.0, -2.0));
        let hit = ray.shell_hit(5.0).unwrap();
        assert!((hit.magnitude() - 5.0).abs() < 1e-4);
        assert!(hit.z < 0.0);
    }

    #[test]
    fn missing_ray_yields_no_hit() {
        let outside = PointingRay::new(Vector3::new(0.0, 10.0, 0.0), Vector3::new(1.0, 0.0, 0.0));
        assert_eq!(outside.shell_hit(5.0), None);
        let behind = PointingRay::new(Vector3::new(0.0, 0.0, 10.0), Vector3::new(0.0, 0.0, 1.0));
        assert_eq!(behind.shell_hit(5.0), None);
        let still = PointingRay::new(Vector3::new(0.0, 0.0, 0.0), Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(still.shell_hit(5.0), None);
    }

    #[test]
    fn timer_fires_after_pace_and_redraws_it() {
        let mut rng = SmallRng::seed_from_u64(2);
        let mut timer = TimerTrigger::new(1.0, 2.5, 0.5, 0.5, 30.0);
        let dt = 1.0 / 60.0;
        let mut ticks = 0;
        while !timer.advance(&mut rng, dt) {
            ticks += 1;
        }
        assert!((59..=61).contains(&ticks), "{ticks}");
        assert!((0.0..2.5).contains(&timer.pace()));
    }

    #[test]
    fn pace_bounds_are_clamped() {
        let mut timer = TimerTrigger::new(1.0, 2.5, 0.5, 0.5, 30.0);
        for _ in 0..10 {
            timer.faster();
        }
        assert_eq!(timer.upper_bound(), 0.5);
        for _ in 0..100 {
            timer.slower();
        }
        assert_eq!(timer.upper_bound(), 30.0);
    }
}
