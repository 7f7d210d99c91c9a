//! Feedback loop from frame and mesh timings to the quaterna target.

use crate::config::RegulatorConfig;
use std::time::{Duration, Instant};

/// Picks how many quaterna the scene can afford.
///
/// Two directions feed in: the ratio of actual to desired frame time (above one means
/// the renderer is struggling), and how long the last mesh generation took. Each call to
/// [`adjusted_load`](Self::adjusted_load) consumes the samples gathered since the last one.
#[derive(Debug, Clone)]
pub struct Regulator {
    config: RegulatorConfig,
    frame_ratio: Option<f64>,
    mesh_generation_period: Option<Duration>,
    reset_time: Instant,
}

impl Regulator {
    pub fn new(config: RegulatorConfig) -> Self {
        Self {
            config,
            frame_ratio: None,
            mesh_generation_period: None,
            reset_time: Instant::now(),
        }
    }

    /// Restarts the reaction boost, e.g. after an origin reset.
    pub fn reset(&mut self) {
        self.reset_time = Instant::now();
    }

    /// Records one frame ratio. Only the worst since the last adjustment counts.
    pub fn sample_frame_ratio(&mut self, ratio: f64) {
        self.frame_ratio = Some(self.frame_ratio.map_or(ratio, |worst| worst.max(ratio)));
    }

    pub fn sample_mesh_generation_period(&mut self, period: Duration) {
        self.mesh_generation_period = Some(self.mesh_generation_period.map_or(period, |worst| worst.max(period)));
    }

    pub fn adjusted_load(&mut self, current: usize) -> usize {
        let elapsed = self.reset_time.elapsed();
        self.adjusted_load_at(current, elapsed)
    }

    /// [`adjusted_load`](Self::adjusted_load) as it would be `since_reset` after the last reset.
    pub fn adjusted_load_at(&mut self, current: usize, since_reset: Duration) -> usize {
        let frame_directed = self.frame_ratio_directed_target(current, since_reset);
        let mesh_directed = self.mesh_generation_directed_target(current);

        self.frame_ratio = None;
        self.mesh_generation_period = None;
        frame_directed.min(mesh_directed)
    }

    fn frame_rate_reaction_coefficient(&self, since_reset: Duration) -> f64 {
        let config = &self.config;
        let half_lives = since_reset.as_secs_f64() / config.frame_rate_reaction_coefficient_boost_half_life;
        config.frame_rate_reaction_coefficient_base + config.frame_rate_reaction_coefficient_boost * 0.5_f64.powf(half_lives)
    }

    fn frame_ratio_directed_target(&self, current: usize, since_reset: Duration) -> usize {
        let Some(ratio) = self.frame_ratio else {
            return current;
        };
        if !(ratio > 0.0) {
            return current + 1;
        }

        let coefficient = self.frame_rate_reaction_coefficient(since_reset);
        let exact = current as f64 * (ratio.ln() * -coefficient).exp();
        let target = exact.floor() as usize;
        // Always creep upward while frames are on time.
        if target == current { current + 1 } else { target }
    }

    fn mesh_generation_directed_target(&self, current: usize) -> usize {
        match self.mesh_generation_period {
            Some(period) if period >= self.config.max_mesh_generation_period => {
                ((current as f64 * self.config.max_mesh_generation_reaction_coefficient) as usize).saturating_sub(1)
            }
            _ => usize::MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn regulator() -> Regulator {
        Regulator::new(RegulatorConfig::default())
    }

    #[test]
    fn no_samples_keeps_the_load() {
        assert_eq!(regulator().adjusted_load_at(100, Duration::ZERO), 100);
    }

    #[test]
    fn slow_frames_shrink_and_fast_frames_grow() {
        let mut regulator = regulator();
        regulator.sample_frame_ratio(2.0);
        assert!(regulator.adjusted_load_at(1000, Duration::ZERO) < 1000);

        regulator.sample_frame_ratio(0.5);
        assert!(regulator.adjusted_load_at(1000, Duration::ZERO) > 1000);

        // On-time frames still creep upward.
        regulator.sample_frame_ratio(1.0);
        assert_eq!(regulator.adjusted_load_at(1000, Duration::ZERO), 1001);
    }

    #[test]
    fn worst_frame_ratio_wins() {
        let mut a = regulator();
        a.sample_frame_ratio(0.5);
        a.sample_frame_ratio(2.0);

        let mut b = regulator();
        b.sample_frame_ratio(2.0);

        assert_eq!(a.adjusted_load_at(1000, Duration::ZERO), b.adjusted_load_at(1000, Duration::ZERO));
    }

    #[test]
    fn reaction_boost_decays() {
        let mut fresh = regulator();
        fresh.sample_frame_ratio(2.0);
        let mut settled = regulator();
        settled.sample_frame_ratio(2.0);

        let early = fresh.adjusted_load_at(1000, Duration::ZERO);
        let late = settled.adjusted_load_at(1000, Duration::from_secs(60));
        assert!(early < late);
    }

    #[test]
    fn slow_mesh_generation_caps_the_load() {
        let mut regulator = regulator();
        regulator.sample_frame_ratio(0.5);
        regulator.sample_mesh_generation_period(Duration::from_secs(2));
        assert_eq!(regulator.adjusted_load_at(1000, Duration::ZERO), 996);

        // Samples are consumed.
        assert_eq!(regulator.adjusted_load_at(1000, Duration::ZERO), 1000);
    }

    #[test]
    fn non_positive_ratio_grows_by_one() {
        let mut regulator = regulator();
        regulator.sample_frame_ratio(0.0);
        assert_eq!(regulator.adjusted_load_at(10, Duration::ZERO), 11);
    }
}
