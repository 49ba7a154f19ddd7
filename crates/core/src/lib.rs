//! Timeline synchronisation core for the audio-driven fly-through.
//!
//! An external audio clock is mapped onto a normalised progress value. A poll
//! loop writes that value and fires scripted one-shot events as thresholds are
//! reached, while an independently paced redraw loop samples a closed path at
//! the same progress to place the camera and lights. Both loops run
//! cooperatively inside a [`Session`].

pub mod clock;
pub mod config;
pub mod error;
pub mod motion;
pub mod path;
pub mod render;
pub mod scene;
pub mod schedule;
pub mod session;
pub mod timeline;

pub use clock::{ClockSource, EndedNotifier, EndedSignal, PlaybackClock};
pub use config::{AppConfig, MotionConfig, PathConfig, RenderConfig, TimelineConfig};
pub use error::{FlythroughError, Result};
pub use motion::{MotionDriver, MotionState};
pub use path::{ControlPoint, PathCurve};
pub use render::{LoopControl, RenderGraph, RenderLoop, SceneSink};
pub use scene::{LightState, Pose, SceneInstance, Sprite, TextPanel};
pub use schedule::{EventId, EventScheduler, FiringPolicy, PollReport};
pub use session::{Activity, Session, SessionReport};
pub use timeline::{shared_progress, ProgressMapper, ProgressReader, ProgressWriter};
