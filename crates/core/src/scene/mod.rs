use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A point light as handed to the scene backend.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct LightState {
    pub position: Vec3,
    pub intensity: f32,
}

/// Everything the motion driver produces for one redraw.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub camera: Vec3,
    pub look_at: Vec3,
    pub key_light: LightState,
    pub fill_light: LightState,
}

impl Pose {
    /// Same placement, ignoring light intensities.
    pub fn same_placement(&self, other: &Pose) -> bool {
        self.camera == other.camera
            && self.look_at == other.look_at
            && self.key_light.position == other.key_light.position
            && self.fill_light.position == other.fill_light.position
    }
}

/// Text shown at a fixed point of the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPanel {
    pub text: String,
    pub position: Vec3,
    /// Camera orientation at the moment the panel appeared.
    pub facing: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub name: String,
    pub position: Vec3,
    pub scale: [f32; 2],
    pub visible: bool,
}

/// Scene state the scripted content mutates and the renderer draws.
#[derive(Debug, Clone, Default)]
pub struct SceneInstance {
    pub pose: Pose,
    pub panels: Vec<TextPanel>,
    pub sprite: Option<Sprite>,
}

impl SceneInstance {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply_pose(&mut self, pose: &Pose) {
        self.pose = *pose;
    }

    /// Direction the camera currently looks along.
    pub fn camera_facing(&self) -> Vec3 {
        (self.pose.look_at - self.pose.camera).normalize_or_zero()
    }

    pub fn show_text(&mut self, text: impl Into<String>, position: Vec3) {
        let panel = TextPanel {
            text: text.into(),
            position,
            facing: self.camera_facing(),
        };
        self.panels.push(panel);
    }

    pub fn place_sprite(&mut self, sprite: Sprite) {
        self.sprite = Some(sprite);
    }

    pub fn move_sprite(&mut self, position: Vec3) {
        if let Some(sprite) = self.sprite.as_mut() {
            sprite.position = position;
        }
    }
}
