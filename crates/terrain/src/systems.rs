//! ECS wiring for [`Terrain`].
//!
//! ```text
//! TransformPropagate, UpdateFrusta  →  Cull  →  Pick
//! ```
//!
//! * **Cull** – walks each terrain's quad-tree against the first
//!   [`TerrainViewer`] frustum and rewrites [`VisibleLeaves`].
//! * **Pick** – intersects [`TerrainPickRay`] with every terrain that has
//!   picking enabled and stores the result on the component.

use bevy::prelude::*;
use bevy::render::primitives::Frustum;
use bevy::render::view::VisibilitySystems;
use bevy::transform::TransformSystem;

use crate::cull::LeafDraw;
use crate::pick::PickResult;
use crate::terrain::Terrain;
use crate::transform::TerrainTransform;

/// Marks the camera whose frustum drives terrain culling.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct TerrainViewer;

/// World-space ray to pick with this frame. Written by whoever owns input.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct TerrainPickRay {
    /// `None` clears the stored pick on the next run.
    pub ray: Option<Ray3d>,
    /// Distances in [`PickResult`] are measured from here.
    pub viewer: Vec3,
}

/// Leaves that passed culling this frame, NW to SE within each parent.
#[derive(Component, Debug, Default, Clone)]
pub struct VisibleLeaves {
    pub leaves: Vec<LeafDraw>,
}

impl VisibleLeaves {
    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }
}

#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum TerrainSystems {
    Cull,
    Pick,
}

pub struct TerrainPlugin;

impl Plugin for TerrainPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<TerrainPickRay>()
            .configure_sets(
                PostUpdate,
                (TerrainSystems::Cull, TerrainSystems::Pick)
                    .chain()
                    .after(TransformSystem::TransformPropagate)
                    .after(VisibilitySystems::UpdateFrusta),
            )
            .add_systems(
                PostUpdate,
                (
                    cull_terrain_leaves.in_set(TerrainSystems::Cull),
                    pick_terrain.in_set(TerrainSystems::Pick),
                ),
            );
    }
}

/// Rebuilds [`VisibleLeaves`] for every terrain. With no viewer nothing is visible.
pub fn cull_terrain_leaves(
    viewers: Query<&Frustum, With<TerrainViewer>>,
    mut terrains: Query<(Entity, &Terrain, &GlobalTransform, &mut VisibleLeaves)>,
) {
    let frustum = viewers.iter().next();
    for (entity, terrain, global, mut visible) in &mut terrains {
        visible.leaves.clear();
        let Some(frustum) = frustum else {
            continue;
        };
        let (transform, discarded) = TerrainTransform::from_global(global);
        if discarded {
            warn_once!("Terrain {entity} is rotated; only translation and scale are applied");
        }
        terrain.visit_visible(&transform, frustum, |draw| visible.leaves.push(draw));
    }
}

/// Runs the pick ray against every terrain with picking enabled.
pub fn pick_terrain(pick_ray: Res<TerrainPickRay>, mut terrains: Query<(&mut Terrain, &GlobalTransform)>) {
    for (mut terrain, global) in &mut terrains {
        if !terrain.picking_enabled() {
            continue;
        }
        let result = match pick_ray.ray {
            Some(ray) => {
                let (transform, _) = TerrainTransform::from_global(global);
                terrain.pick(&transform, ray, pick_ray.viewer)
            }
            None => PickResult::miss(),
        };
        terrain.set_last_pick(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TerrainSettings;
    use crate::cull::test_frustum::box_frustum;
    use crate::height_field::HeightSource;

    fn test_app() -> App {
        let mut app = App::new();
        app.add_plugins(MinimalPlugins);
        app.add_plugins(TerrainPlugin);
        app
    }

    fn spawn_terrain(app: &mut App, settings: &TerrainSettings, height: f32) -> Entity {
        let n = (settings.dimension * settings.dimension) as usize;
        let terrain = Terrain::from_source(settings, HeightSource::Samples(&vec![height; n])).unwrap();
        // No TransformPlugin here, so the global transform is set by hand.
        app.world_mut()
            .spawn((terrain, Transform::IDENTITY, GlobalTransform::IDENTITY))
            .id()
    }

    #[test]
    fn test_spawn_inserts_required_components() {
        let mut app = test_app();
        let entity = app
            .world_mut()
            .spawn(Terrain::new(&TerrainSettings::new(8, 1)).unwrap())
            .id();
        assert!(app.world().get::<VisibleLeaves>(entity).is_some());
        assert!(app.world().get::<Transform>(entity).is_some());
    }

    #[test]
    fn test_no_viewer_means_nothing_visible() {
        let mut app = test_app();
        let entity = spawn_terrain(&mut app, &TerrainSettings::new(16, 2), 0.0);
        app.update();
        assert!(app.world().get::<VisibleLeaves>(entity).unwrap().is_empty());
    }

    #[test]
    fn test_cull_system_fills_visible_leaves() {
        let mut app = test_app();
        let entity = spawn_terrain(&mut app, &TerrainSettings::new(16, 2), 0.0);
        app.world_mut().spawn((
            TerrainViewer,
            box_frustum(Vec3::new(0.5, 0.0, 0.5), Vec3::new(7.5, 10.0, 3.5)),
        ));
        app.update();
        let visible = app.world().get::<VisibleLeaves>(entity).unwrap();
        assert_eq!(visible.len(), 2, "got: {:?}", visible.leaves);
        assert_eq!(visible.leaves[0].rect.x, 0);
        assert_eq!(visible.leaves[1].rect.x, 4);
    }

    #[test]
    fn test_pick_system_stores_result() {
        let mut app = test_app();
        let entity = spawn_terrain(&mut app, &TerrainSettings::new(16, 2), 0.5);
        app.insert_resource(TerrainPickRay {
            ray: Some(Ray3d {
                origin: Vec3::new(5.5, 128.0, 9.5),
                direction: Dir3::NEG_Y,
            }),
            viewer: Vec3::new(5.5, 128.0, 9.5),
        });
        app.update();
        let pick = app.world().get::<Terrain>(entity).unwrap().last_pick();
        assert_eq!(pick.world_position, Vec3::new(5.5, 33.0, 9.5));
        assert_eq!(pick.distance, Some(95.0));

        app.world_mut().resource_mut::<TerrainPickRay>().ray = None;
        app.update();
        assert!(!app.world().get::<Terrain>(entity).unwrap().last_pick().is_hit());
    }

    #[test]
    fn test_pick_system_skips_disabled_terrain() {
        let mut app = test_app();
        let mut settings = TerrainSettings::new(16, 2);
        settings.picking_enabled = false;
        let entity = spawn_terrain(&mut app, &settings, 0.5);
        app.insert_resource(TerrainPickRay {
            ray: Some(Ray3d {
                origin: Vec3::new(5.5, 128.0, 9.5),
                direction: Dir3::NEG_Y,
            }),
            viewer: Vec3::ZERO,
        });
        app.update();
        assert!(!app.world().get::<Terrain>(entity).unwrap().last_pick().is_hit());
    }
}
