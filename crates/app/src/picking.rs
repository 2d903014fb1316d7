use bevy::prelude::*;
use bevy::render::primitives::Aabb;

use terrain::{LeafDraw, Terrain, TerrainPickRay, TerrainViewer, VisibleLeaves};

const MARKER_SIZE: f32 = 2.0;
const MARKER_STEM: f32 = 12.0;

/// `B` toggles drawing the boxes of visible leaves.
#[derive(Resource, Default)]
pub struct ShowLeafBoxes(pub bool);

/// Cursor to world ray. No cursor over the window means no pick this frame.
pub fn update_pick_ray(
    windows: Query<&Window>,
    cameras: Query<(&Camera, &GlobalTransform), With<TerrainViewer>>,
    mut pick_ray: ResMut<TerrainPickRay>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let Ok((camera, cam_transform)) = cameras.get_single() else {
        return;
    };

    pick_ray.viewer = cam_transform.translation();
    pick_ray.ray = window
        .cursor_position()
        .and_then(|screen_pos| camera.viewport_to_world(cam_transform, screen_pos).ok());
}

pub fn handle_toggle_keys(
    keys: Res<ButtonInput<KeyCode>>,
    mut terrains: Query<&mut Terrain>,
    mut show_boxes: ResMut<ShowLeafBoxes>,
) {
    if keys.just_pressed(KeyCode::KeyP) {
        for mut terrain in &mut terrains {
            let enabled = !terrain.picking_enabled();
            terrain.set_picking_enabled(enabled);
            info!("Terrain picking {}", if enabled { "on" } else { "off" });
        }
    }
    if keys.just_pressed(KeyCode::KeyB) {
        show_boxes.0 = !show_boxes.0;
    }
}

pub fn draw_pick_marker(terrains: Query<&Terrain>, mut gizmos: Gizmos) {
    for terrain in &terrains {
        let pick = terrain.last_pick();
        if !pick.is_hit() {
            continue;
        }
        let p = pick.world_position;
        let color = Color::srgb(1.0, 0.25, 0.1);
        gizmos.cuboid(
            Transform::from_translation(p).with_scale(Vec3::splat(MARKER_SIZE)),
            color,
        );
        gizmos.line(p, p + Vec3::Y * MARKER_STEM, color);
    }
}

/// World-space box of a visible leaf, sized like its conservative bound.
fn leaf_box(draw: &LeafDraw, height_scale: f32) -> Transform {
    let local = Aabb::from_min_max(
        Vec3::ZERO,
        Vec3::new(draw.rect.width as f32, height_scale, draw.rect.height as f32),
    );
    let (min, max) = draw.world_transform.world_min_max(&local);
    Transform::from_translation((min + max) * 0.5).with_scale(max - min)
}

pub fn draw_leaf_boxes(
    show_boxes: Res<ShowLeafBoxes>,
    terrains: Query<(&Terrain, &VisibleLeaves)>,
    mut gizmos: Gizmos,
) {
    if !show_boxes.0 {
        return;
    }
    for (terrain, visible) in &terrains {
        for draw in &visible.leaves {
            gizmos.cuboid(leaf_box(draw, terrain.height_scale()), Color::srgb(0.2, 0.8, 1.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use terrain::{GridRect, TerrainTransform};

    #[test]
    fn test_leaf_box_covers_scaled_leaf() {
        let draw = LeafDraw {
            rect: GridRect::new(8, 0, 8, 8),
            level: 1,
            quadrant: None,
            world_transform: TerrainTransform::new(Vec3::new(16.0, 0.0, 0.0), Vec3::new(2.0, 0.5, 2.0)),
            sample_offset: Vec2::new(0.5, 0.0),
            sample_scale: 0.5,
        };
        let t = leaf_box(&draw, 64.0);
        assert_eq!(t.translation, Vec3::new(24.0, 16.0, 8.0));
        assert_eq!(t.scale, Vec3::new(16.0, 32.0, 16.0));
    }
}
