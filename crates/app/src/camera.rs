use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll, MouseScrollUnit};
use bevy::prelude::*;

use terrain::{TerrainSettings, TerrainViewer};

/// Pan speed as a fraction of the orbit distance per second.
const PAN_RATE: f32 = 0.4;
/// Zoom factor per scroll line.
const ZOOM_STEP: f32 = 1.15;
const PIXELS_PER_LINE: f32 = 100.0;
const MIN_DISTANCE: f32 = 10.0;
const PITCH_RANGE: (f32, f32) = (0.09, 1.48);
const RADIANS_PER_PIXEL: f32 = 0.005;

/// Camera circling a focus point on the terrain.
#[derive(Resource, Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    pub focus: Vec3,
    pub yaw: f32,
    /// Elevation above the ground plane, kept inside `PITCH_RANGE`.
    pub pitch: f32,
    pub distance: f32,
    /// Side length of the terrain in world units; bounds focus and zoom.
    pub extent: f32,
}

impl OrbitCamera {
    pub fn over_terrain(extent: f32) -> Self {
        Self {
            focus: Vec3::new(extent * 0.5, 0.0, extent * 0.5),
            yaw: 0.6,
            pitch: 40.0_f32.to_radians(),
            distance: extent * 0.9,
            extent,
        }
    }

    /// Yaw about +Y, then tilt up by `pitch`.
    fn rotation(&self) -> Quat {
        Quat::from_euler(EulerRot::YXZ, self.yaw, -self.pitch, 0.0)
    }

    pub fn transform(&self) -> Transform {
        let eye = self.focus + self.rotation() * Vec3::new(0.0, 0.0, self.distance);
        Transform::from_translation(eye).looking_at(self.focus, Vec3::Y)
    }

    /// Moves the focus along the ground. `input.y < 0` is away from the camera.
    fn pan(&mut self, input: Vec2, dt: f32) {
        let heading = Quat::from_rotation_y(self.yaw);
        let step = heading * Vec3::new(input.x, 0.0, input.y) * self.distance * PAN_RATE * dt;
        let margin = self.extent * 0.25;
        let lo = Vec3::new(-margin, self.focus.y, -margin);
        let hi = Vec3::new(self.extent + margin, self.focus.y, self.extent + margin);
        self.focus = (self.focus + step).clamp(lo, hi);
    }

    fn rotate(&mut self, pixels: Vec2) {
        self.yaw += pixels.x * RADIANS_PER_PIXEL;
        self.pitch = (self.pitch - pixels.y * RADIANS_PER_PIXEL).clamp(PITCH_RANGE.0, PITCH_RANGE.1);
    }

    fn zoom(&mut self, lines: f32) {
        self.distance = (self.distance * ZOOM_STEP.powf(-lines)).clamp(MIN_DISTANCE, self.extent * 4.0);
    }
}

/// Startup system; runs once [`TerrainSettings`] is in place.
pub fn setup_camera(mut commands: Commands, settings: Res<TerrainSettings>) {
    let orbit = OrbitCamera::over_terrain(settings.dimension as f32);
    commands.spawn((Camera3d::default(), orbit.transform(), TerrainViewer));
    commands.spawn((
        DirectionalLight {
            illuminance: 8_000.0,
            ..default()
        },
        Transform::from_xyz(1.0, 2.0, 0.5).looking_at(Vec3::ZERO, Vec3::Y),
    ));
    commands.insert_resource(orbit);
}

pub fn apply_orbit_camera(
    orbit: Res<OrbitCamera>,
    mut cameras: Query<&mut Transform, With<TerrainViewer>>,
) {
    if !orbit.is_changed() {
        return;
    }
    for mut transform in &mut cameras {
        *transform = orbit.transform();
    }
}

/// WASD or arrow keys.
pub fn camera_pan_keyboard(
    keys: Res<ButtonInput<KeyCode>>,
    time: Res<Time>,
    mut orbit: ResMut<OrbitCamera>,
) {
    let axis = |neg: [KeyCode; 2], pos: [KeyCode; 2]| {
        let held = |pair: [KeyCode; 2]| keys.any_pressed(pair) as i8 as f32;
        held(pos) - held(neg)
    };
    let input = Vec2::new(
        axis([KeyCode::KeyA, KeyCode::ArrowLeft], [KeyCode::KeyD, KeyCode::ArrowRight]),
        axis([KeyCode::KeyW, KeyCode::ArrowUp], [KeyCode::KeyS, KeyCode::ArrowDown]),
    );
    if input != Vec2::ZERO {
        orbit.pan(input.normalize(), time.delta_secs());
    }
}

/// Right mouse button held: horizontal motion turns, vertical motion tilts.
pub fn camera_orbit_drag(
    buttons: Res<ButtonInput<MouseButton>>,
    motion: Res<AccumulatedMouseMotion>,
    mut orbit: ResMut<OrbitCamera>,
) {
    if buttons.pressed(MouseButton::Right) && motion.delta != Vec2::ZERO {
        orbit.rotate(motion.delta);
    }
}

pub fn camera_zoom(scroll: Res<AccumulatedMouseScroll>, mut orbit: ResMut<OrbitCamera>) {
    let lines = match scroll.unit {
        MouseScrollUnit::Line => scroll.delta.y,
        MouseScrollUnit::Pixel => scroll.delta.y / PIXELS_PER_LINE,
    };
    if lines != 0.0 {
        orbit.zoom(lines);
    }
}
