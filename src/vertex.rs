use glam::Vec3;

use crate::session::{Camera, ScreenPoint};

/// Vertex structure with world position, screen position and view depth
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vertex {
    pub position: Vec3,
    pub screen_position: [f32; 2],
    pub depth: f32,
}

impl Vertex {
    /// Projects `position` through `camera`; `None` behind the eye
    pub fn project(position: Vec3, camera: &Camera) -> Option<Vertex> {
        let ScreenPoint { x, y, depth } = camera.project(position)?;
        Some(Vertex {
            position,
            screen_position: [x, y],
            depth,
        })
    }
}
