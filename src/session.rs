//! Tracking, camera and environment checks.
//!
//! The terminal has no real camera, so the session tracks a virtual square
//! plane at y = 0 viewed through an orbiting perspective camera. Tracking
//! becomes available after a warm-up period, the way surface detection
//! needs a few frames on a real device.

use glam::{Mat4, Quat, Vec3};
use log::{debug, info};

use crate::error::{SessionUnavailable, SolarError, SolarResult};

/// Smallest terminal the demo will run in
pub const MIN_COLUMNS: u16 = 40;
pub const MIN_ROWS: u16 = 12;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackingState {
    /// Still looking for a surface
    Initializing,
    Tracking,
    /// Session suspended by the host
    Paused,
}

/// A point on a tracked surface
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfacePose {
    pub position: Vec3,
    pub rotation: Quat,
}

/// A projected point in cell coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScreenPoint {
    pub x: f32,
    pub y: f32,
    /// Distance from the eye along the view axis
    pub depth: f32,
}

/// What the frame loop needs from a tracking backend
pub trait TrackingProvider {
    /// Called once per rendered frame
    fn tick(&mut self);
    fn tracking_state(&self) -> TrackingState;
    /// The surface under a screen point, if one is tracked there
    fn hit_test(&self, point: [f32; 2]) -> Option<SurfacePose>;
    fn pause(&mut self);
    fn resume(&mut self);
}

/// Orbiting look-at camera rendering into a grid of terminal cells
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub target: Vec3,
    /// Eye distance at zoom 1
    pub distance: f32,
    pub pitch: f32,
    pub yaw: f32,
    pub zoom: f32,
    pub fov_y: f32,
    /// Viewport size in cells (columns, rows)
    pub viewport: [u16; 2],
    /// Height of a cell divided by its width
    pub cell_aspect: f32,
}

impl Camera {
    pub fn new(columns: u16, rows: u16) -> Self {
        Camera {
            target: Vec3::new(0.0, 0.3, 0.0),
            distance: 6.5,
            pitch: 35f32.to_radians(),
            yaw: 0.0,
            zoom: 1.0,
            fov_y: 50f32.to_radians(),
            viewport: [columns.max(1), rows.max(1)],
            cell_aspect: 2.0,
        }
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.viewport = [columns.max(1), rows.max(1)];
    }

    pub fn eye(&self) -> Vec3 {
        let distance = self.distance / self.zoom.max(0.01);
        let (sin_p, cos_p) = self.pitch.sin_cos();
        let (sin_y, cos_y) = self.yaw.sin_cos();
        self.target + distance * Vec3::new(cos_p * sin_y, sin_p, cos_p * cos_y)
    }

    /// Right, up and backward axes of the view in world space
    pub fn basis(&self) -> (Vec3, Vec3, Vec3) {
        let back = (self.eye() - self.target).normalize_or_zero();
        let right = Vec3::Y.cross(back).normalize_or_zero();
        let up = back.cross(right);
        (right, up, back)
    }

    fn aspect(&self) -> f32 {
        self.viewport[0] as f32 / (self.viewport[1] as f32 * self.cell_aspect)
    }

    pub fn view_projection(&self) -> Mat4 {
        let projection = Mat4::perspective_rh(self.fov_y, self.aspect(), 0.05, 100.0);
        let view = Mat4::look_at_rh(self.eye(), self.target, Vec3::Y);
        projection * view
    }

    /// Projects a world point to cell coordinates; `None` behind the eye
    pub fn project(&self, world: Vec3) -> Option<ScreenPoint> {
        let clip = self.view_projection() * world.extend(1.0);
        if clip.w <= 1e-4 {
            return None;
        }
        let ndc = clip.truncate() / clip.w;
        Some(ScreenPoint {
            x: (ndc.x + 1.0) * 0.5 * self.viewport[0] as f32,
            y: (1.0 - ndc.y) * 0.5 * self.viewport[1] as f32,
            depth: clip.w,
        })
    }

    /// Rows covered by one metre at `depth`
    pub fn rows_per_meter(&self, depth: f32) -> f32 {
        self.viewport[1] as f32 / (2.0 * depth.max(1e-4) * (self.fov_y * 0.5).tan())
    }

    /// World-space ray through a cell coordinate
    pub fn ray(&self, x: f32, y: f32) -> (Vec3, Vec3) {
        let ndc_x = x / self.viewport[0] as f32 * 2.0 - 1.0;
        let ndc_y = 1.0 - y / self.viewport[1] as f32 * 2.0;
        let inverse = self.view_projection().inverse();
        let near = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 0.0));
        let far = inverse.project_point3(Vec3::new(ndc_x, ndc_y, 1.0));
        (near, (far - near).normalize_or_zero())
    }
}

/// Tracking session over a single virtual ground plane
#[derive(Clone, Debug)]
pub struct VirtualSession {
    camera: Camera,
    plane_half_extent: f32,
    warmup_frames: u32,
    frames_seen: u32,
    paused: bool,
}

impl VirtualSession {
    pub fn new(camera: Camera, plane_half_extent: f32, warmup_frames: u32) -> Self {
        VirtualSession {
            camera,
            plane_half_extent,
            warmup_frames,
            frames_seen: 0,
            paused: false,
        }
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.camera
    }

    pub fn plane_half_extent(&self) -> f32 {
        self.plane_half_extent
    }

    fn is_tracking(&self) -> bool {
        self.frames_seen >= self.warmup_frames
    }

    fn in_polygon(&self, point: Vec3) -> bool {
        point.x.abs() <= self.plane_half_extent && point.z.abs() <= self.plane_half_extent
    }
}

impl TrackingProvider for VirtualSession {
    fn tick(&mut self) {
        if self.paused || self.is_tracking() {
            return;
        }
        self.frames_seen += 1;
        if self.is_tracking() {
            info!("surface detected after {} frames", self.frames_seen);
        }
    }

    fn tracking_state(&self) -> TrackingState {
        if self.paused {
            TrackingState::Paused
        } else if self.is_tracking() {
            TrackingState::Tracking
        } else {
            TrackingState::Initializing
        }
    }

    fn hit_test(&self, point: [f32; 2]) -> Option<SurfacePose> {
        if self.tracking_state() != TrackingState::Tracking {
            return None;
        }
        let (origin, direction) = self.camera.ray(point[0], point[1]);
        if direction.y >= -1e-6 {
            return None;
        }
        let t = -origin.y / direction.y;
        let position = origin + direction * t;
        if !self.in_polygon(position) {
            debug!("hit at {position:?} is outside the plane");
            return None;
        }
        Some(SurfacePose {
            position,
            rotation: Quat::IDENTITY,
        })
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }
}

/// Checks the terminal the demo was started in, returning its size
pub fn check_environment() -> SolarResult<(u16, u16)> {
    let size = termsize::get().ok_or(SessionUnavailable::NotATerminal)?;
    check_size(size.cols, size.rows)
}

pub fn check_size(columns: u16, rows: u16) -> SolarResult<(u16, u16)> {
    if columns < MIN_COLUMNS || rows < MIN_ROWS {
        return Err(SolarError::EnvironmentUnsupported(format!(
            "terminal is {columns}x{rows}, at least {MIN_COLUMNS}x{MIN_ROWS} is required"
        )));
    }
    Ok((columns, rows))
}
