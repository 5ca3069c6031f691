use glam::{Mat4, Quat, Vec2, Vec3};

use super::config::CameraConfig;
use super::input::{CameraCommand, CameraInput, NavigationMode};
use super::projection::perspective;

/// Squared sine of the smallest angle allowed between up and forward.
const PARALLEL_EPSILON: f32 = 1e-6;

/// What a drag is doing.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum DragKind {
    Pan,
    Orbit,
    Look,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum AnimationKind {
    ResetHome,
    OrbitPreset,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum CameraState {
    Idle,
    Dragging(DragKind),
    Animating(AnimationKind),
}

/// An eye/focal transition in progress.
#[derive(Debug, Copy, Clone, PartialEq)]
struct Animation {
    kind: AnimationKind,
    start_eye: Vec3,
    target_eye: Vec3,
    start_focal: Vec3,
    target_focal: Vec3,
    start_up: Vec3,
    target_up: Vec3,
    started_at: f64,
}

/// Orbit/pan and walk navigation over an eye/focal pair.
///
/// Input is polled once per frame through [`recalculate_view`]. While a
/// reset or preset transition runs, every other input is ignored and new
/// transitions are rejected.
///
/// [`recalculate_view`]: Self::recalculate_view
#[derive(Debug, Clone)]
pub struct NavigationCamera {
    config: CameraConfig,
    eye: Vec3,
    focal: Vec3,
    up: Vec3,
    forward: Vec3,
    right: Vec3,
    state: CameraState,
    animation: Option<Animation>,
    last_cursor: Option<Vec2>,
    cursor_warp: Option<Vec2>,
    /// Real cursor position behind this frame's warp request.
    warp_origin: Option<Vec2>,
}

impl NavigationCamera {
    pub fn new(config: CameraConfig) -> Self {
        let mut camera = Self {
            eye: config.home_eye,
            focal: config.home_focal,
            up: config.home_up,
            forward: Vec3::NEG_Y,
            right: Vec3::X,
            state: CameraState::Idle,
            animation: None,
            last_cursor: None,
            cursor_warp: None,
            warp_origin: None,
            config,
        };
        camera.update_basis();
        camera
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    pub fn focal(&self) -> Vec3 {
        self.focal
    }

    pub fn up(&self) -> Vec3 {
        self.up
    }

    pub fn forward(&self) -> Vec3 {
        self.forward
    }

    pub fn right(&self) -> Vec3 {
        self.right
    }

    pub fn state(&self) -> CameraState {
        self.state
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn distance(&self) -> f32 {
        self.eye.distance(self.focal)
    }

    /// Places the camera directly, cancelling drags and animations.
    pub fn set_view(&mut self, eye: Vec3, focal: Vec3, up: Vec3) {
        self.eye = eye;
        self.focal = focal;
        self.up = up;
        self.animation = None;
        self.state = CameraState::Idle;
        self.update_basis();
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_to_rh(self.eye, self.forward, self.view_up())
    }

    pub fn projection(&self, aspect: f32) -> Mat4 {
        let c = &self.config;
        perspective(c.fov_y, aspect, c.z_near, c.z_far, c.clip_space)
    }

    /// Cursor position the runtime should move the pointer to, if a drag
    /// crossed the window border.
    pub fn take_cursor_warp(&mut self) -> Option<Vec2> {
        self.cursor_warp.take()
    }

    /// Undoes this frame's warp when the platform could not move the pointer,
    /// so the next delta is measured from where the cursor really is.
    pub fn cancel_cursor_warp(&mut self) {
        self.cursor_warp = None;
        if let Some(origin) = self.warp_origin.take() {
            if self.last_cursor.is_some() {
                self.last_cursor = Some(origin);
            }
        }
    }

    /// Advances the camera by one frame and returns the view matrix.
    ///
    /// `dt` is the frame delta in seconds, `now` the clock time animations are
    /// measured against.
    pub fn recalculate_view(&mut self, input: &CameraInput, dt: f32, now: f64) -> Mat4 {
        self.warp_origin = None;
        if self.animation.is_some() {
            self.step_animation(now);
        } else {
            match input.mode {
                NavigationMode::Orbit => self.update_orbit(input, now),
                NavigationMode::Walk => self.update_walk(input, dt),
            }
        }
        self.view_matrix()
    }

    // ── orbit / pan ───────────────────────────────────────────────────────

    fn update_orbit(&mut self, input: &CameraInput, now: f64) {
        if matches!(self.state, CameraState::Dragging(DragKind::Look)) {
            self.end_drag();
        }

        if input.middle_down {
            let kind = if input.shift { DragKind::Pan } else { DragKind::Orbit };
            if let Some(delta) = self.drag_delta(kind, input) {
                match kind {
                    DragKind::Pan => self.pan(delta),
                    _ => self.orbit_drag(delta),
                }
            }
            return;
        }

        if matches!(self.state, CameraState::Dragging(_)) {
            self.end_drag();
        }

        for command in &input.commands {
            self.apply_command(*command, now);
            if self.animation.is_some() {
                return;
            }
        }

        if input.scroll != 0.0 {
            self.zoom(input.scroll);
        }
    }

    fn apply_command(&mut self, command: CameraCommand, now: f64) {
        let step = self.config.rotation_speed;
        match command {
            CameraCommand::RotateLeft => self.yaw_about_focal((-5.0 * step * 0.2).to_radians()),
            CameraCommand::RotateRight => self.yaw_about_focal((5.0 * step * 0.2).to_radians()),
            CameraCommand::RotateUp => self.pitch_about_focal(self.pitch_step()),
            CameraCommand::RotateDown => self.pitch_about_focal(-self.pitch_step()),
            CameraCommand::ResetHome => {
                let (eye, focal, up) = (
                    self.config.home_eye,
                    self.config.home_focal,
                    self.config.home_up,
                );
                self.start_animation(AnimationKind::ResetHome, eye, focal, up, now);
            }
            CameraCommand::Preset(preset) => {
                let eye = preset.target_eye(self.eye, self.focal);
                let focal = self.focal;
                self.start_animation(AnimationKind::OrbitPreset, eye, focal, preset.up(), now);
            }
        }
    }

    /// Pitch step shrinks with distance so far views do not whip around.
    fn pitch_step(&self) -> f32 {
        let distance = self.distance().max(f32::EPSILON);
        (1.0 * self.config.rotation_speed * 0.5 / distance).to_radians()
    }

    fn yaw_about_focal(&mut self, angle: f32) {
        self.rotate_about_focal(Quat::from_axis_angle(Vec3::Z, angle));
    }

    fn pitch_about_focal(&mut self, angle: f32) {
        self.rotate_about_focal(Quat::from_axis_angle(self.right, angle));
    }

    fn rotate_about_focal(&mut self, rotation: Quat) {
        self.eye = self.focal + rotation * (self.eye - self.focal);
        self.up = (rotation * self.up).normalize();
        self.update_basis();
    }

    /// Nudges the eye along the view direction; never through the focal point.
    fn zoom(&mut self, scroll: f32) {
        let step = self.config.zoom_step * scroll.signum();
        if step > 0.0 && self.distance() <= step {
            return;
        }
        self.eye += self.forward * step;
        self.update_basis();
    }

    fn orbit_drag(&mut self, delta: Vec2) {
        let k = self.config.mouse_sensitivity;
        let yaw = Quat::from_axis_angle(Vec3::Z, -delta.x * k);
        let pitch = Quat::from_axis_angle(self.right, -delta.y * k);
        self.rotate_about_focal(yaw * pitch);
    }

    fn pan(&mut self, delta: Vec2) {
        let distance = self.distance().max(f32::EPSILON);
        let offset =
            (self.right * -delta.x + self.up * delta.y) * self.config.pan_speed / distance;
        self.eye += offset;
        self.focal += offset;
    }

    // ── walk ──────────────────────────────────────────────────────────────

    fn update_walk(&mut self, input: &CameraInput, dt: f32) {
        if matches!(
            self.state,
            CameraState::Dragging(DragKind::Pan | DragKind::Orbit)
        ) {
            self.end_drag();
        }

        if !input.right_down {
            if self.state != CameraState::Idle {
                self.end_drag();
            }
            return;
        }

        let keys = input.walk;
        let axis = |pos: bool, neg: bool| (pos as i32 - neg as i32) as f32;
        let motion = self.forward * axis(keys.forward, keys.back)
            + self.right * axis(keys.right, keys.left)
            + self.up * axis(keys.up, keys.down);
        let step = motion * self.config.move_speed * dt;
        self.eye += step;

        if let Some(delta) = self.drag_delta(DragKind::Look, input) {
            let k = self.config.mouse_sensitivity;
            let rotation = (Quat::from_axis_angle(self.up, -delta.x * k)
                * Quat::from_axis_angle(self.right, -delta.y * k))
            .normalize();
            self.forward = (rotation * self.forward).normalize();
        }

        self.focal = self.eye + self.forward;
        self.update_basis();
    }

    // ── dragging ──────────────────────────────────────────────────────────

    /// Tracks the cursor for a drag of `kind`. The first frame of a drag only
    /// records the position.
    fn drag_delta(&mut self, kind: DragKind, input: &CameraInput) -> Option<Vec2> {
        let cursor = input.cursor?;

        if self.state != CameraState::Dragging(kind) {
            self.state = CameraState::Dragging(kind);
            self.last_cursor = Some(cursor);
            return None;
        }

        let last = self.last_cursor.replace(cursor)?;
        let delta = cursor - last;

        if let Some(warped) = wrap_cursor(cursor, input.viewport) {
            self.last_cursor = Some(warped);
            self.cursor_warp = Some(warped);
            self.warp_origin = Some(cursor);
        }

        (delta != Vec2::ZERO).then_some(delta)
    }

    fn end_drag(&mut self) {
        self.state = CameraState::Idle;
        self.last_cursor = None;
    }

    // ── animation ─────────────────────────────────────────────────────────

    fn start_animation(
        &mut self,
        kind: AnimationKind,
        target_eye: Vec3,
        target_focal: Vec3,
        target_up: Vec3,
        now: f64,
    ) {
        if self.animation.is_some() {
            return;
        }
        self.animation = Some(Animation {
            kind,
            start_eye: self.eye,
            target_eye,
            start_focal: self.focal,
            target_focal,
            start_up: self.up,
            target_up,
            started_at: now,
        });
        self.state = CameraState::Animating(kind);
        self.last_cursor = None;
        log::debug!("camera animation {kind:?} started");
    }

    fn step_animation(&mut self, now: f64) {
        let Some(anim) = self.animation else { return };

        let duration = self.config.animation_duration().max(f32::EPSILON) as f64;
        let t = ((now - anim.started_at) / duration).clamp(0.0, 1.0) as f32;

        if t >= 1.0 {
            self.eye = anim.target_eye;
            self.focal = anim.target_focal;
            self.up = anim.target_up;
            self.animation = None;
            self.state = CameraState::Idle;
            log::debug!("camera animation {:?} finished", anim.kind);
        } else {
            self.eye = anim.start_eye.lerp(anim.target_eye, t);
            self.focal = anim.start_focal.lerp(anim.target_focal, t);
            // Opposite ups cancel out halfway; update_basis repairs a zero up.
            self.up = anim.start_up.lerp(anim.target_up, t).normalize_or_zero();
        }
        self.update_basis();
    }

    fn update_basis(&mut self) {
        let forward = self.focal - self.eye;
        if forward.length_squared() > f32::EPSILON {
            self.forward = forward.normalize();
        }
        if self.forward.cross(self.up).length_squared() <= PARALLEL_EPSILON {
            self.up = self.view_up();
        }
        self.right = self.forward.cross(self.up).normalize();
    }

    /// Up vector for the view matrix. When `up` is (anti)parallel to the view
    /// direction it is rebuilt from the last good right vector.
    fn view_up(&self) -> Vec3 {
        if self.forward.cross(self.up).length_squared() > PARALLEL_EPSILON {
            return self.up;
        }
        let up = self.right.cross(self.forward);
        if up.length_squared() > PARALLEL_EPSILON {
            up.normalize()
        } else {
            self.forward.any_orthonormal_vector()
        }
    }
}

/// Wraps a cursor that reached the window border to the opposite side.
///
/// Returns the new position, or `None` if the cursor is inside the window.
pub fn wrap_cursor(cursor: Vec2, viewport: Vec2) -> Option<Vec2> {
    if viewport.x < 4.0 || viewport.y < 4.0 {
        return None;
    }
    let wrap = |v: f32, size: f32| {
        if v <= 0.0 {
            size - 2.0
        } else if v >= size - 1.0 {
            1.0
        } else {
            v
        }
    };
    let wrapped = Vec2::new(wrap(cursor.x, viewport.x), wrap(cursor.y, viewport.y));
    (wrapped != cursor).then_some(wrapped)
}
