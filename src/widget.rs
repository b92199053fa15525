use std::rc::Rc;
use std::time::{Duration, Instant};

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind};
use crossterm::style::Color;
use glam::Vec3;
use log::{debug, error, info};

use crate::assets::{AssetSet, PendingAssets};
use crate::composer::{self, TapEffect};
use crate::config::Config;
use crate::error::SolarResult;
use crate::graphics::{draw_line, draw_sphere, draw_text, draw_text_centered, Cell, Framebuffer};
use crate::scene::{NodeId, NodeRole, Scene, SceneNode, Transform};
use crate::session::{Camera, SurfacePose, TrackingProvider, TrackingState, VirtualSession};
use crate::state::{AppState, MotionKind, SolarSettings, SpeedControl};
use crate::vertex::Vertex;

/// Radius of a sprite at scale 1, in metres
pub const MODEL_RADIUS: f32 = 0.3;
/// Lit bodies are drawn larger than their true scale so they stay visible
pub const PLANET_EXAGGERATION: f32 = 4.0;

const SEARCHING_MESSAGE: &str = "Searching for surfaces... move around";
const TOAST_SHORT: Duration = Duration::from_millis(2000);
const TOAST_LONG: Duration = Duration::from_millis(3500);
const SPEED_STEP: i32 = 5;
const RING_SEGMENTS: usize = 48;

enum AssetStatus {
    Loading(PendingAssets),
    Loaded(AssetSet),
    Failed,
}

struct Toast {
    text: String,
    remaining: Duration,
}

/// The solar system view: owns the session, the scene and the UI state
pub struct SolarView {
    settings: Rc<SolarSettings>,
    session: VirtualSession,
    scene: Scene,
    solar_system: Option<NodeId>,
    assets: AssetStatus,
    orbit_control: SpeedControl,
    rotation_control: SpeedControl,
    state: AppState,
    framebuffer: Framebuffer,
    snackbar: Option<String>,
    toast: Option<Toast>,
    frames_since_last_update: usize,
    last_fps_calculation: Instant,
    fps: f64,
    quit: bool,
}

impl SolarView {
    pub fn new(
        config: &Config,
        settings: Rc<SolarSettings>,
        columns: u16,
        rows: u16,
        assets: PendingAssets,
    ) -> Self {
        let session = VirtualSession::new(
            Camera::new(columns, rows),
            config.plane_extent,
            config.warmup_frames,
        );
        SolarView {
            orbit_control: SpeedControl::new(MotionKind::Orbit, &settings),
            rotation_control: SpeedControl::new(MotionKind::Spin, &settings),
            settings,
            session,
            scene: Scene::new(),
            solar_system: None,
            assets: AssetStatus::Loading(assets),
            state: AppState::new(columns, rows),
            framebuffer: Framebuffer::new(columns as usize, rows as usize),
            snackbar: Some(SEARCHING_MESSAGE.to_string()),
            toast: None,
            frames_since_last_update: 0,
            last_fps_calculation: Instant::now(),
            fps: 0.0,
            quit: false,
        }
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn is_placed(&self) -> bool {
        self.solar_system.is_some()
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn settings(&self) -> &Rc<SolarSettings> {
        &self.settings
    }

    pub fn session(&self) -> &VirtualSession {
        &self.session
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    pub fn snackbar(&self) -> Option<&str> {
        self.snackbar.as_deref()
    }

    pub fn toast(&self) -> Option<&str> {
        self.toast.as_ref().map(|t| t.text.as_str())
    }

    fn show_toast(&mut self, text: impl Into<String>, lifetime: Duration) {
        let text = text.into();
        debug!("toast: {text}");
        self.toast = Some(Toast {
            text,
            remaining: lifetime,
        });
    }

    fn show_loading_message(&mut self) {
        if self.snackbar.is_none() && !self.is_placed() {
            self.snackbar = Some(SEARCHING_MESSAGE.to_string());
        }
    }

    fn sync_camera(&mut self) {
        let camera = self.session.camera_mut();
        camera.yaw = self.state.camera_yaw;
        camera.zoom = self.state.zoom;
    }

    /// Handle a terminal event
    pub fn event(&mut self, event: &Event) -> SolarResult<()> {
        match event {
            Event::Key(key_event) => self.key(key_event)?,
            Event::Mouse(mouse_event) => self.mouse(mouse_event)?,
            Event::Resize(columns, rows) => self.resize(*columns, *rows),
            Event::FocusLost => {
                info!("session paused");
                self.state.paused = true;
                self.session.pause();
            }
            Event::FocusGained => {
                info!("session resumed");
                self.state.paused = false;
                self.session.resume();
                self.show_loading_message();
            }
            _ => {}
        }
        Ok(())
    }

    fn key(&mut self, key_event: &KeyEvent) -> SolarResult<()> {
        if key_event.kind == KeyEventKind::Release {
            return Ok(());
        }
        let [x, y] = self.state.reticle;
        let [columns, rows] = [self.framebuffer.width() as u16, self.framebuffer.height() as u16];
        match key_event.code {
            KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => self.quit = true,
            KeyCode::Char('d') | KeyCode::Char('D') => self.state.debug = !self.state.debug,
            KeyCode::Char('w') | KeyCode::Char('W') => {
                self.state.show_orbits = !self.state.show_orbits
            }
            KeyCode::Left => self.state.reticle[0] = x.saturating_sub(1),
            KeyCode::Right => self.state.reticle[0] = (x + 1).min(columns.saturating_sub(1)),
            KeyCode::Up => self.state.reticle[1] = y.saturating_sub(1),
            KeyCode::Down => self.state.reticle[1] = (y + 1).min(rows.saturating_sub(1)),
            KeyCode::Char(' ') | KeyCode::Enter => {
                self.tap([x as f32 + 0.5, y as f32 + 0.5])?;
            }
            KeyCode::Char('o') => self.adjust_speed(MotionKind::Orbit, -SPEED_STEP)?,
            KeyCode::Char('O') => self.adjust_speed(MotionKind::Orbit, SPEED_STEP)?,
            KeyCode::Char('r') => self.adjust_speed(MotionKind::Spin, -SPEED_STEP)?,
            KeyCode::Char('R') => self.adjust_speed(MotionKind::Spin, SPEED_STEP)?,
            KeyCode::Char('[') => self.state.camera_yaw -= 5f32.to_radians(),
            KeyCode::Char(']') => self.state.camera_yaw += 5f32.to_radians(),
            KeyCode::Char('+') | KeyCode::Char('=') => self.zoom_by(1.1),
            KeyCode::Char('-') => self.zoom_by(1.0 / 1.1),
            _ => {}
        }
        Ok(())
    }

    fn mouse(&mut self, mouse_event: &MouseEvent) -> SolarResult<()> {
        match mouse_event.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                self.state.reticle = [mouse_event.column, mouse_event.row];
                self.tap([mouse_event.column as f32 + 0.5, mouse_event.row as f32 + 0.5])?;
            }
            MouseEventKind::ScrollUp => self.zoom_by(1.1),
            MouseEventKind::ScrollDown => self.zoom_by(1.0 / 1.1),
            _ => {}
        }
        Ok(())
    }

    fn zoom_by(&mut self, factor: f32) {
        self.state.zoom = (self.state.zoom * factor).clamp(0.1, 10.0); // Clamp zoom level
    }

    pub fn resize(&mut self, columns: u16, rows: u16) {
        self.framebuffer.resize(columns as usize, rows as usize);
        self.session.camera_mut().resize(columns, rows);
        self.state.reticle = [
            self.state.reticle[0].min(columns.saturating_sub(1)),
            self.state.reticle[1].min(rows.saturating_sub(1)),
        ];
    }

    fn control_panel_shown(&self) -> bool {
        self.scene
            .ids_with_role(NodeRole::ControlPanel)
            .any(|id| self.scene.is_active(id))
    }

    /// Moves one of the speed bars on the control panel
    pub fn adjust_speed(&mut self, kind: MotionKind, steps: i32) -> SolarResult<()> {
        if !self.control_panel_shown() {
            self.show_toast("Tap the sun to show the speed controls", TOAST_SHORT);
            return Ok(());
        }
        let control = match kind {
            MotionKind::Orbit => &mut self.orbit_control,
            MotionKind::Spin => &mut self.rotation_control,
        };
        let multiplier = control.step(steps, &self.settings)?;
        debug!("{kind:?} speed set to {multiplier}");
        Ok(())
    }

    /// A single tap at cell coordinates `point`
    pub fn tap(&mut self, point: [f32; 2]) -> SolarResult<()> {
        self.sync_camera();
        match self.assets {
            AssetStatus::Loaded(_) => {}
            AssetStatus::Loading(_) => {
                self.show_toast("Still loading assets, move around", TOAST_SHORT);
                return Ok(());
            }
            AssetStatus::Failed => {
                debug!("tap ignored: assets failed to load");
                return Ok(());
            }
        }

        if self.is_placed() {
            if let Some(node) = self.pick(point) {
                if let Some(TapEffect { role, shown, .. }) = composer::handle_tap(&mut self.scene, node)? {
                    debug!("tap toggled {role:?}, shown: {shown}");
                }
            }
            return Ok(());
        }

        match self.session.hit_test(point) {
            Some(pose) => {
                let AssetStatus::Loaded(assets) = &self.assets else {
                    return Ok(());
                };
                let (sun, planets) = composer::solar_system(assets)?;
                self.place(pose, &sun, &planets)?;
            }
            None if self.session.tracking_state() != TrackingState::Tracking => {
                self.show_toast("No surface yet, keep moving", TOAST_SHORT);
            }
            None => debug!("tap at {point:?} missed the surface"),
        }
        Ok(())
    }

    fn place(
        &mut self,
        pose: SurfacePose,
        sun: &composer::SunDescriptor,
        planets: &[composer::PlanetDescriptor],
    ) -> SolarResult<()> {
        let mut anchor = SceneNode::new("anchor", NodeRole::Anchor);
        anchor.local = Transform {
            translation: pose.position,
            rotation: pose.rotation,
            scale: 1.0,
        };
        let anchor = self.scene.spawn(anchor);
        self.scene.add_root(anchor)?;
        let base = composer::compose(&mut self.scene, sun, planets, &self.settings)?;
        self.scene.set_parent(base, Some(anchor))?;
        self.solar_system = Some(base);
        self.snackbar = None;
        info!("solar system placed at {:?}", pose.position);
        Ok(())
    }

    /// The nearest tappable visual under `point`
    fn pick(&self, point: [f32; 2]) -> Option<NodeId> {
        let camera = self.session.camera();
        let mut best: Option<(NodeId, f32)> = None;
        for (id, vertex, _, radius_cells) in self.visible_bodies(camera) {
            let [rx, ry] = [radius_cells[0].max(1.0), radius_cells[1].max(1.0)];
            let dx = (point[0] - vertex.screen_position[0]) / rx;
            let dy = (point[1] - vertex.screen_position[1]) / ry;
            if dx * dx + dy * dy > 1.0 {
                continue;
            }
            if best.map_or(true, |(_, depth)| vertex.depth < depth) {
                best = Some((id, vertex.depth));
            }
        }
        best.map(|(id, _)| id)
    }

    /// Active nodes with a sphere visual, projected
    fn visible_bodies(&self, camera: &Camera) -> Vec<(NodeId, Vertex, f32, [f32; 2])> {
        let transforms = self.scene.world_transforms();
        self.scene
            .ids()
            .filter_map(|id| {
                let node = self.scene.node(id)?;
                if !matches!(node.role, NodeRole::Visual | NodeRole::SpinPivot) {
                    return None;
                }
                let sprite = node.visual.as_ref()?.sprite();
                let world = transforms.get(id.index()).copied().flatten()?;
                let (scale, _, position) = world.to_scale_rotation_translation();
                let exaggeration = if sprite.emissive { 1.0 } else { PLANET_EXAGGERATION };
                let radius = scale.x * MODEL_RADIUS * exaggeration;
                let vertex = Vertex::project(position, camera)?;
                let rows = radius * camera.rows_per_meter(vertex.depth);
                Some((id, vertex, radius, [rows * camera.cell_aspect, rows]))
            })
            .collect()
    }

    /// Advances the session, asset loading and animations by one frame
    pub fn frame(&mut self, dt: Duration) {
        if let Some(toast) = self.toast.as_mut() {
            toast.remaining = toast.remaining.saturating_sub(dt);
        }
        if self.toast.as_ref().is_some_and(|toast| toast.remaining.is_zero()) {
            self.toast = None;
        }
        if self.state.paused {
            return;
        }

        self.session.tick();
        if self.snackbar.is_some() && self.session.tracking_state() == TrackingState::Tracking {
            self.snackbar = None;
        }

        let loaded = match &mut self.assets {
            AssetStatus::Loading(pending) => pending.poll(),
            _ => None,
        };
        match loaded {
            Some(Ok(assets)) => {
                self.assets = AssetStatus::Loaded(assets);
                self.show_toast("Assets loaded", TOAST_SHORT);
            }
            Some(Err(err)) => {
                error!("unable to load assets: {err}");
                self.assets = AssetStatus::Failed;
                self.show_toast(format!("Unable to load assets: {err}"), TOAST_LONG);
            }
            None => {}
        }

        self.scene.update(dt);
    }

    /// Paint the whole view into the framebuffer
    pub fn paint(&mut self) {
        // Update FPS calculation
        self.frames_since_last_update += 1;
        let now = Instant::now();
        let duration = now.duration_since(self.last_fps_calculation);
        if duration.as_secs_f64() >= 1.0 {
            self.fps = self.frames_since_last_update as f64 / duration.as_secs_f64();
            self.frames_since_last_update = 0;
            self.last_fps_calculation = now;
        }

        self.sync_camera();
        self.framebuffer.clear();
        let camera = self.session.camera().clone();
        let tracking = self.session.tracking_state() == TrackingState::Tracking;

        if tracking && !self.is_placed() {
            self.paint_surface(&camera);
        }
        if self.is_placed() {
            self.paint_solar_system(&camera);
        }
        self.paint_overlays();
    }

    fn paint_surface(&mut self, camera: &Camera) {
        let extent = self.session.plane_half_extent();
        let steps = (extent / 0.5).floor() as i32;
        let cell = Cell {
            ch: '+',
            color: Color::DarkGrey,
        };
        for i in -steps..=steps {
            for j in -steps..=steps {
                let point = Vec3::new(i as f32 * 0.5, 0.0, j as f32 * 0.5);
                if let Some(v) = Vertex::project(point, camera) {
                    let [x, y] = v.screen_position;
                    self.framebuffer.plot(x.floor() as isize, y.floor() as isize, v.depth, cell);
                }
            }
        }
    }

    fn paint_solar_system(&mut self, camera: &Camera) {
        let transforms = self.scene.world_transforms();
        let world_of = |id: NodeId| transforms.get(id.index()).copied().flatten();
        let light_pos = self
            .scene
            .ids_with_role(NodeRole::Sun)
            .find_map(|id| world_of(id))
            .map(|m| m.transform_point3(Vec3::ZERO))
            .unwrap_or(Vec3::Y);

        if self.state.show_orbits {
            let ring = Cell {
                ch: '.',
                color: Color::Grey,
            };
            let pivots: Vec<NodeId> = self.scene.ids_with_role(NodeRole::OrbitPivot).collect();
            for pivot in pivots {
                let Some(center) = world_of(pivot).map(|m| m.transform_point3(Vec3::ZERO)) else {
                    continue;
                };
                let radius = self
                    .scene
                    .child_with_role(pivot, NodeRole::Body)
                    .and_then(|body| self.scene.node(body))
                    .map(|body| body.local.translation.length())
                    .unwrap_or(0.0);
                let points: Vec<Option<Vertex>> = (0..=RING_SEGMENTS)
                    .map(|i| {
                        let angle = i as f32 / RING_SEGMENTS as f32 * std::f32::consts::TAU;
                        let offset = Vec3::new(angle.cos(), 0.0, angle.sin()) * radius;
                        Vertex::project(center + offset, camera)
                    })
                    .collect();
                for pair in points.windows(2) {
                    if let [Some(a), Some(b)] = pair {
                        draw_line(&mut self.framebuffer, a, b, ring);
                    }
                }
            }
        }

        let basis = camera.basis();
        for (id, vertex, radius, radius_cells) in self.visible_bodies(camera) {
            let Some(node) = self.scene.node(id) else {
                continue;
            };
            let Some(visual) = node.visual.as_ref() else {
                continue;
            };
            let orientation = world_of(id)
                .map(|m| m.to_scale_rotation_translation().1)
                .unwrap_or_default();
            draw_sphere(
                &mut self.framebuffer,
                &vertex,
                radius,
                radius_cells,
                basis,
                orientation,
                visual.sprite(),
                light_pos,
            );
        }

        for id in self.scene.ids_with_role(NodeRole::InfoCard) {
            let (Some(node), Some(world)) = (self.scene.node(id), world_of(id)) else {
                continue;
            };
            let Some(v) = Vertex::project(world.transform_point3(Vec3::ZERO), camera) else {
                continue;
            };
            let label = node.label.clone().unwrap_or_default();
            let [x, y] = v.screen_position;
            draw_text_centered(&mut self.framebuffer, x as isize, y as isize - 1, &label, Color::White);
        }

        let panels: Vec<NodeId> = self.scene.ids_with_role(NodeRole::ControlPanel).collect();
        for id in panels {
            let Some(world) = world_of(id) else {
                continue;
            };
            if let Some(v) = Vertex::project(world.transform_point3(Vec3::ZERO), camera) {
                self.paint_control_panel(v.screen_position);
            }
        }
    }

    fn paint_control_panel(&mut self, anchor: [f32; 2]) {
        let bar = |control: &SpeedControl| {
            let filled = (control.ratio() * 10.0).round() as usize;
            format!(
                "[{}{}] {:>4.1}x",
                "#".repeat(filled),
                "-".repeat(10 - filled.min(10)),
                control.multiplier()
            )
        };
        let lines = [
            format!("+{:-^29}+", " solar controls "),
            format!("| orbit    {} |", bar(&self.orbit_control)),
            format!("| rotation {} |", bar(&self.rotation_control)),
            format!("| {:<27} |", "o/O orbit   r/R spin"),
            format!("+{}+", "-".repeat(29)),
        ];
        let width = lines[0].chars().count() as isize;
        let height = self.framebuffer.height() as isize;
        let x = (anchor[0] as isize - width / 2).max(0);
        let rows = lines.len() as isize;
        let top = (anchor[1] as isize - rows).clamp(0, (height - rows).max(0));
        for (i, line) in lines.iter().enumerate() {
            draw_text(&mut self.framebuffer, x, top + i as isize, line, Color::White);
        }
    }

    fn paint_overlays(&mut self) {
        let width = self.framebuffer.width() as isize;
        let height = self.framebuffer.height() as isize;

        if !self.is_placed() {
            let [x, y] = self.state.reticle;
            let hit = self.session.hit_test([x as f32 + 0.5, y as f32 + 0.5]).is_some();
            let color = if hit { Color::Green } else { Color::Red };
            self.framebuffer.put(x as isize, y as isize, Cell { ch: '+', color });
        }

        if let Some(snackbar) = &self.snackbar {
            let text = format!(" {snackbar} ");
            draw_text_centered(&mut self.framebuffer, width / 2, height - 1, &text, Color::White);
        }
        if let Some(toast) = &self.toast {
            let text = format!(" {} ", toast.text);
            draw_text_centered(&mut self.framebuffer, width / 2, height - 3, &text, Color::Cyan);
        }

        // Add debug info if debug mode is enabled
        if self.state.debug {
            let lines = [
                format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
                format!("FPS: {:.2}", self.fps),
                format!(
                    "Orbit: {:.1}x  Rotation: {:.1}x",
                    self.settings.orbit_speed_multiplier(),
                    self.settings.rotation_speed_multiplier()
                ),
                format!("Tracking: {:?}", self.session.tracking_state()),
                format!("Zoom: {:.2}  Yaw: {:.0}", self.state.zoom, self.state.camera_yaw.to_degrees()),
                format!("Nodes: {}", self.scene.len()),
            ];
            for (i, line) in lines.iter().enumerate() {
                draw_text(&mut self.framebuffer, 1, i as isize, line, Color::White);
            }
        }

        // Display 'Paused' if the session is paused
        if self.state.paused {
            draw_text_centered(&mut self.framebuffer, width / 2, height / 2, " Paused ", Color::White);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::AssetLoader;
    use crate::composer::asset_names;
    use crossterm::event::KeyModifiers;
    use std::thread;

    fn config(warmup_frames: u32) -> Config {
        Config {
            warmup_frames,
            ..Config::default()
        }
    }

    fn loaded_view(warmup_frames: u32) -> SolarView {
        let pending = AssetLoader::default().load_all(asset_names());
        let mut view = SolarView::new(
            &config(warmup_frames),
            Rc::new(SolarSettings::new()),
            80,
            24,
            pending,
        );
        for _ in 0..1000 {
            view.frame(Duration::ZERO);
            if matches!(view.assets, AssetStatus::Loaded(_)) {
                return view;
            }
            thread::sleep(Duration::from_millis(1));
        }
        panic!("assets did not load");
    }

    fn press(view: &mut SolarView, code: KeyCode) {
        view.event(&Event::Key(KeyEvent::new(code, KeyModifiers::NONE)))
            .unwrap();
    }

    fn screen_of(view: &SolarView, world: Vec3) -> [f32; 2] {
        let point = view.session().camera().project(world).unwrap();
        [point.x, point.y]
    }

    fn screen_text(view: &SolarView) -> String {
        (0..view.framebuffer().height())
            .map(|y| view.framebuffer().row_text(y))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn has_color(view: &SolarView, color: Color) -> bool {
        let fb = view.framebuffer();
        (0..fb.height()).any(|y| (0..fb.width()).any(|x| fb.get(x, y).is_some_and(|c| c.color == color)))
    }

    #[test]
    fn tap_before_assets_load_does_not_place() {
        let pending = AssetLoader::new(Duration::from_secs(60)).load_all(asset_names());
        let mut view = SolarView::new(&config(0), Rc::new(SolarSettings::new()), 80, 24, pending);
        view.frame(Duration::ZERO);
        view.tap([40.0, 12.0]).unwrap();
        assert!(!view.is_placed());
        assert_eq!(view.toast(), Some("Still loading assets, move around"));
    }

    #[test]
    fn failed_assets_never_place() {
        let pending = AssetLoader::default().load_all(["Sol", "Nibiru"]);
        let mut view = SolarView::new(&config(0), Rc::new(SolarSettings::new()), 80, 24, pending);
        for _ in 0..1000 {
            view.frame(Duration::ZERO);
            if matches!(view.assets, AssetStatus::Failed) {
                break;
            }
            thread::sleep(Duration::from_millis(1));
        }
        assert!(view.toast().unwrap().starts_with("Unable to load assets"));
        let target = screen_of(&view, Vec3::ZERO);
        view.tap(target).unwrap();
        assert!(!view.is_placed());
        assert!(view.scene().is_empty());
    }

    #[test]
    fn snackbar_hides_once_tracking() {
        let pending = AssetLoader::new(Duration::from_secs(60)).load_all(asset_names());
        let mut view = SolarView::new(&config(3), Rc::new(SolarSettings::new()), 80, 24, pending);
        assert!(view.snackbar().is_some());
        view.frame(Duration::from_millis(16));
        assert!(view.snackbar().is_some());
        for _ in 0..2 {
            view.frame(Duration::from_millis(16));
        }
        assert_eq!(view.snackbar(), None);
    }

    #[test]
    fn placement_happens_once() {
        let mut view = loaded_view(0);
        view.frame(Duration::ZERO);
        let target = screen_of(&view, Vec3::new(0.5, 0.0, 0.5));
        view.tap(target).unwrap();
        assert!(view.is_placed());
        let nodes = view.scene().len();
        assert_eq!(view.scene().ids_with_role(NodeRole::Anchor).count(), 1);

        let elsewhere = screen_of(&view, Vec3::new(-1.0, 0.0, 1.0));
        view.tap(elsewhere).unwrap();
        assert_eq!(view.scene().len(), nodes);
        assert_eq!(view.scene().ids_with_role(NodeRole::Anchor).count(), 1);

        let anchor = view.scene().ids_with_role(NodeRole::Anchor).next().unwrap();
        let at = view.scene().world_position(anchor).unwrap();
        assert!((at - Vec3::new(0.5, 0.0, 0.5)).length() < 1e-2);
    }

    #[test]
    fn speed_keys_follow_the_panel() {
        let mut view = loaded_view(0);
        view.frame(Duration::ZERO);
        view.tap(screen_of(&view, Vec3::ZERO)).unwrap();
        assert!(view.control_panel_shown());

        press(&mut view, KeyCode::Char('O'));
        assert!((view.settings().orbit_speed_multiplier() - 1.5).abs() < 1e-5);
        assert_eq!(view.settings().rotation_speed_multiplier(), 1.0);
        for _ in 0..3 {
            press(&mut view, KeyCode::Char('r'));
        }
        assert_eq!(view.settings().rotation_speed_multiplier(), 0.0);

        let sun = view.scene().find_by_name("Sun").unwrap();
        let sun_at = view.scene().world_position(sun).unwrap();
        view.tap(screen_of(&view, sun_at)).unwrap();
        assert!(!view.control_panel_shown());

        press(&mut view, KeyCode::Char('O'));
        assert!((view.settings().orbit_speed_multiplier() - 1.5).abs() < 1e-5);
        assert_eq!(view.toast(), Some("Tap the sun to show the speed controls"));
    }

    #[test]
    fn paint_shows_bodies_and_panel() {
        let mut view = loaded_view(0);
        view.frame(Duration::ZERO);
        view.tap(screen_of(&view, Vec3::ZERO)).unwrap();
        view.frame(Duration::from_millis(500));
        press(&mut view, KeyCode::Char('d'));
        view.paint();
        let text = screen_text(&view);
        assert!(text.contains("solar controls"));
        assert!(text.contains("FPS"));

        let sun = view.scene().find_by_name("Sun").unwrap();
        let sun_at = view.scene().world_position(sun).unwrap();
        view.tap(screen_of(&view, sun_at)).unwrap();
        view.paint();
        assert!(has_color(&view, Color::Yellow));
        assert!(!screen_text(&view).contains("solar controls"));
    }

    #[test]
    fn focus_loss_pauses_animation() {
        let mut view = loaded_view(0);
        view.frame(Duration::ZERO);
        view.tap(screen_of(&view, Vec3::ZERO)).unwrap();
        let earth = view.scene().find_by_name("Earth").unwrap();
        let before = view.scene().world_position(earth).unwrap();

        view.event(&Event::FocusLost).unwrap();
        view.frame(Duration::from_secs(3));
        assert_eq!(view.scene().world_position(earth).unwrap(), before);
        assert_eq!(view.session().tracking_state(), TrackingState::Paused);

        view.event(&Event::FocusGained).unwrap();
        view.frame(Duration::from_secs(3));
        assert_ne!(view.scene().world_position(earth).unwrap(), before);
    }

    #[test]
    fn quit_and_zoom_keys() {
        let mut view = loaded_view(0);
        for _ in 0..100 {
            press(&mut view, KeyCode::Char('+'));
        }
        assert_eq!(view.state().zoom, 10.0);
        press(&mut view, KeyCode::Char('q'));
        assert!(view.should_quit());
    }
}
