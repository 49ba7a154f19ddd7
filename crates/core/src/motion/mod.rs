use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    config::MotionConfig,
    path::PathCurve,
    scene::{LightState, Pose},
};

/// Whether the camera still follows the path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionState {
    Traveling,
    Holding,
}

/// Turns progress into a camera and light pose, once per redraw.
///
/// Below `end_of_motion` every redraw re-samples the curve. At or past it the
/// placement is sampled once at `end_of_motion` and frozen, while the key
/// light keeps decaying.
#[derive(Debug)]
pub struct MotionDriver {
    curve: PathCurve,
    config: MotionConfig,
    rng: StdRng,
    state: MotionState,
    held: Option<Pose>,
    key_intensity: f32,
}

impl MotionDriver {
    pub fn new(curve: PathCurve, config: MotionConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            curve,
            config,
            rng,
            state: MotionState::Traveling,
            held: None,
            key_intensity: 0.0,
        }
    }

    pub fn curve(&self) -> &PathCurve {
        &self.curve
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn update(&mut self, progress: f64) -> Pose {
        let mut pose = if progress < self.config.end_of_motion {
            self.state = MotionState::Traveling;
            self.held = None;
            self.sample(progress)
        } else {
            if self.state == MotionState::Traveling {
                tracing::debug!(progress, "camera motion frozen");
            }
            self.state = MotionState::Holding;
            match self.held {
                Some(pose) => pose,
                None => {
                    let pose = self.sample(self.config.end_of_motion);
                    self.held = Some(pose);
                    pose
                }
            }
        };

        pose.key_light.intensity = self.next_key_intensity(progress);
        pose.fill_light.intensity = (progress * self.config.fill_gain) as f32;
        pose
    }

    fn sample(&self, progress: f64) -> Pose {
        let camera = self.curve.point_at_wrapped(progress);
        let look_at = self.curve.point_at_wrapped(progress + self.config.look_ahead);
        let key = self.curve.point_at_wrapped(progress + self.config.key_light_offset);
        let fill = self.curve.point_at_wrapped(progress + self.config.fill_light_offset);

        Pose {
            camera,
            look_at,
            key_light: LightState {
                position: key,
                intensity: 0.0,
            },
            fill_light: LightState {
                position: fill,
                intensity: 0.0,
            },
        }
    }

    fn next_key_intensity(&mut self, progress: f64) -> f32 {
        self.key_intensity = if progress < self.config.fade_start {
            self.rng.gen::<f32>() * self.config.flicker_max
        } else {
            (self.key_intensity - self.config.decay_per_frame).max(0.0)
        };
        self.key_intensity
    }
}
