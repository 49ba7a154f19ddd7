use crate::{
    motion::MotionDriver,
    scene::{Pose, SceneInstance},
    Result,
};

/// Rendering backend the core hands poses to. The core never inspects what
/// the backend draws.
pub trait SceneSink {
    fn apply_pose(&mut self, pose: &Pose);

    fn redraw(&mut self) -> Result<()>;
}

/// Headless backend: keeps the scene state and counts redraws.
#[derive(Debug, Default)]
pub struct RenderGraph {
    scene: SceneInstance,
    frames_drawn: u64,
}

impl RenderGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> &SceneInstance {
        &self.scene
    }

    pub fn scene_mut(&mut self) -> &mut SceneInstance {
        &mut self.scene
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames_drawn
    }
}

impl SceneSink for RenderGraph {
    fn apply_pose(&mut self, pose: &Pose) {
        self.scene.apply_pose(pose);
    }

    fn redraw(&mut self) -> Result<()> {
        self.frames_drawn += 1;
        tracing::trace!(
            frame = self.frames_drawn,
            camera = %self.scene.pose.camera,
            panels = self.scene.panels.len(),
            "redraw"
        );
        Ok(())
    }
}

/// Whether the render loop wants another redraw opportunity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    Stop,
}

/// Self-rescheduling redraw driver.
///
/// There is no external cancellation: the loop ends by answering
/// [`LoopControl::Stop`] once progress reaches `stop_threshold`, after which
/// [`RenderLoop::frame`] does nothing.
#[derive(Debug)]
pub struct RenderLoop {
    stop_threshold: f64,
    frames: u64,
    stopped: bool,
}

impl RenderLoop {
    pub fn new(stop_threshold: f64) -> Self {
        Self {
            stop_threshold,
            frames: 0,
            stopped: false,
        }
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn frame<S: SceneSink>(
        &mut self,
        progress: f64,
        motion: &mut MotionDriver,
        scene: &mut S,
    ) -> Result<LoopControl> {
        if self.stopped {
            return Ok(LoopControl::Stop);
        }

        let pose = motion.update(progress);
        scene.apply_pose(&pose);
        scene.redraw()?;
        self.frames += 1;

        if progress < self.stop_threshold {
            Ok(LoopControl::Continue)
        } else {
            tracing::info!(progress, frames = self.frames, "render loop finished");
            self.stopped = true;
            Ok(LoopControl::Stop)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::MotionConfig,
        path::{ControlPoint, PathCurve},
    };

    fn driver() -> MotionDriver {
        let points = [
            ControlPoint::new(0.0, 0.0),
            ControlPoint::new(10.0, 0.0),
            ControlPoint::new(10.0, 10.0),
            ControlPoint::new(0.0, 10.0),
            ControlPoint::new(0.0, 0.0),
        ];
        let config = MotionConfig {
            seed: Some(1),
            ..MotionConfig::default()
        };
        MotionDriver::new(PathCurve::new(&points).unwrap(), config)
    }

    #[test]
    fn draws_until_the_stop_threshold() {
        let mut motion = driver();
        let mut graph = RenderGraph::new();
        let mut render = RenderLoop::new(0.99);

        assert_eq!(render.frame(0.5, &mut motion, &mut graph).unwrap(), LoopControl::Continue);
        assert_eq!(render.frame(0.98, &mut motion, &mut graph).unwrap(), LoopControl::Continue);
        assert_eq!(render.frame(0.991, &mut motion, &mut graph).unwrap(), LoopControl::Stop);
        assert!(render.is_stopped());

        assert_eq!(render.frame(0.5, &mut motion, &mut graph).unwrap(), LoopControl::Stop);
        assert_eq!(render.frames(), 3);
        assert_eq!(graph.frames_drawn(), 3);
    }

    #[test]
    fn hands_the_pose_to_the_scene() {
        let mut motion = driver();
        let mut graph = RenderGraph::new();
        let mut render = RenderLoop::new(0.99);

        render.frame(0.25, &mut motion, &mut graph).unwrap();
        let expected = motion.curve().point_at(0.25);
        assert_eq!(graph.scene().pose.camera, expected);
    }
}
