use bevy::prelude::*;
use bevy::window::PresentMode;
use bevy::winit::{UpdateMode, WinitSettings};

use terrain::TerrainPlugin;

mod camera;
mod heightmap;
mod patches;
mod picking;
mod settings;

fn main() {
    let mut app = App::new();

    app.add_plugins(DefaultPlugins.set(WindowPlugin {
        primary_window: Some(Window {
            title: "QuadTerrain".to_string(),
            resolution: (1280.0, 720.0).into(),
            present_mode: PresentMode::AutoVsync,
            ..default()
        }),
        ..default()
    }))
    .insert_resource(WinitSettings {
        focused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(16)),
        unfocused_mode: UpdateMode::reactive_low_power(std::time::Duration::from_millis(100)),
    })
    .insert_resource(ClearColor(Color::srgb(0.62, 0.74, 0.86)))
    .init_resource::<picking::ShowLeafBoxes>()
    .init_resource::<patches::TerrainSeed>()
    .add_plugins(TerrainPlugin)
    .add_systems(
        Startup,
        (
            settings::load_settings,
            (camera::setup_camera, patches::spawn_terrain),
        )
            .chain(),
    )
    .add_systems(
        Update,
        (
            (
                camera::camera_pan_keyboard,
                camera::camera_orbit_drag,
                camera::camera_zoom,
                camera::apply_orbit_camera,
            )
                .chain(),
            (
                picking::update_pick_ray,
                picking::handle_toggle_keys,
                picking::draw_pick_marker,
                picking::draw_leaf_boxes,
            ),
            (patches::regenerate_on_key, patches::sync_patch_visibility),
        ),
    );

    app.run();
}
