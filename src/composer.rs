//! Builds the sun/planet/moon hierarchy.
//!
//! Each body hangs off its own orbit pivot so every body can revolve at its
//! own rate:
//!
//! ```text
//! base
//! └── sun
//!     ├── sun visual
//!     ├── control panel
//!     └── orbit pivot ── body ─┬── spin pivot (visual)
//!                              ├── info card
//!                              └── orbit pivot ── moon body ── ...
//! ```

use std::rc::Rc;

use glam::Vec3;
use log::info;

use crate::assets::{AssetHandle, AssetSet};
use crate::error::{AssetError, SceneError};
use crate::rotation::RotationController;
use crate::scene::{NodeId, NodeRole, Scene, SceneNode};
use crate::state::{MotionKind, SolarSettings};

/// Scene metres per astronomical unit
pub const AU_TO_METERS: f32 = 0.5;

/// Where the control panel floats relative to the sun
pub const CONTROL_PANEL_OFFSET: Vec3 = Vec3::new(0.0, 0.25, 0.0);

/// Info cards float this far above a body, in body units
pub const INFO_CARD_OFFSET: Vec3 = Vec3::new(0.0, 0.1, 0.0);

#[derive(Clone, Debug)]
pub struct SunDescriptor {
    pub name: String,
    pub visual_asset: AssetHandle,
    pub control_panel_asset: AssetHandle,
    pub scale: f32,
    /// Height of the sun above the base
    pub height: f32,
}

#[derive(Clone, Debug)]
pub struct PlanetDescriptor {
    pub name: String,
    /// Distance from the parent body
    pub distance_au: f32,
    pub orbit_degrees_per_second: f32,
    pub visual_asset: AssetHandle,
    pub scale: f32,
    pub moons: Vec<PlanetDescriptor>,
}

/// Result of tapping a composed node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TapEffect {
    /// The panel or card that was toggled
    pub target: NodeId,
    pub role: NodeRole,
    pub shown: bool,
}

/// Builds a detached hierarchy and returns its base node.
///
/// Controllers start once the caller attaches the base under a live node.
/// Every call builds a new, independent hierarchy.
pub fn compose(
    scene: &mut Scene,
    sun: &SunDescriptor,
    planets: &[PlanetDescriptor],
    settings: &Rc<SolarSettings>,
) -> Result<NodeId, SceneError> {
    let base = scene.spawn(SceneNode::new("base", NodeRole::Base));

    let sun_node = scene.spawn_child(
        base,
        SceneNode::new(&sun.name, NodeRole::Sun).with_translation(Vec3::new(0.0, sun.height, 0.0)),
    )?;
    scene.spawn_child(
        sun_node,
        SceneNode::new(format!("{} visual", sun.name), NodeRole::Visual)
            .with_visual(sun.visual_asset.clone())
            .with_scale(sun.scale),
    )?;
    scene.spawn_child(
        sun_node,
        SceneNode::new("solar controls", NodeRole::ControlPanel)
            .with_visual(sun.control_panel_asset.clone())
            .with_translation(CONTROL_PANEL_OFFSET),
    )?;

    for planet in planets {
        compose_body(scene, sun_node, planet, settings)?;
    }

    info!("composed solar system with {} planets", planets.len());
    Ok(base)
}

/// Orbit pivot under `parent`, body under the pivot, moons under the body
fn compose_body(
    scene: &mut Scene,
    parent: NodeId,
    descriptor: &PlanetDescriptor,
    settings: &Rc<SolarSettings>,
) -> Result<NodeId, SceneError> {
    let orbit = scene.spawn_child(
        parent,
        SceneNode::new(format!("{} orbit", descriptor.name), NodeRole::OrbitPivot).with_controller(
            RotationController::new(Rc::clone(settings), MotionKind::Orbit)
                .with_degrees_per_second(descriptor.orbit_degrees_per_second),
        ),
    )?;

    let body = scene.spawn_child(
        orbit,
        SceneNode::new(&descriptor.name, NodeRole::Body)
            .with_translation(Vec3::new(descriptor.distance_au * AU_TO_METERS, 0.0, 0.0)),
    )?;

    scene.spawn_child(
        body,
        SceneNode::new(format!("{} visual", descriptor.name), NodeRole::SpinPivot)
            .with_visual(descriptor.visual_asset.clone())
            .with_scale(descriptor.scale)
            .with_controller(RotationController::new(Rc::clone(settings), MotionKind::Spin)),
    )?;

    scene.spawn_child(
        body,
        SceneNode::new(format!("{} info", descriptor.name), NodeRole::InfoCard)
            .with_label(descriptor.name.clone())
            .with_translation(INFO_CARD_OFFSET + Vec3::Y * descriptor.scale)
            .disabled(),
    )?;

    for moon in &descriptor.moons {
        compose_body(scene, body, moon, settings)?;
    }
    Ok(body)
}

/// Tapping the sun toggles the control panel, tapping a body its info card
pub fn handle_tap(scene: &mut Scene, tapped: NodeId) -> Result<Option<TapEffect>, SceneError> {
    let Some(owner) = scene.ancestor_where(tapped, |node| {
        matches!(node.role, NodeRole::Sun | NodeRole::Body)
    }) else {
        return Ok(None);
    };
    let role = match scene.node(owner).map(|node| node.role) {
        Some(NodeRole::Sun) => NodeRole::ControlPanel,
        Some(NodeRole::Body) => NodeRole::InfoCard,
        _ => return Ok(None),
    };
    let Some(target) = scene.child_with_role(owner, role) else {
        return Ok(None);
    };
    let shown = scene.toggle_enabled(target)?;
    Ok(Some(TapEffect {
        target,
        role,
        shown,
    }))
}

struct CatalogEntry {
    name: &'static str,
    asset: &'static str,
    distance_au: f32,
    orbit_degrees_per_second: f32,
    scale: f32,
    moons: &'static [CatalogEntry],
}

const SUN_ASSET: &str = "Sol";
const CONTROL_PANEL_ASSET: &str = "SolarControls";

const MOONS_OF_EARTH: &[CatalogEntry] = &[CatalogEntry {
    name: "Moon",
    asset: "Luna",
    distance_au: 0.15,
    orbit_degrees_per_second: 100.0,
    scale: 0.018,
    moons: &[],
}];

/// Mercury to Neptune, in placement order
const PLANETS: &[CatalogEntry] = &[
    CatalogEntry {
        name: "Mercury",
        asset: "Mercury",
        distance_au: 0.4,
        orbit_degrees_per_second: 47.0,
        scale: 0.019,
        moons: &[],
    },
    CatalogEntry {
        name: "Venus",
        asset: "Venus",
        distance_au: 0.7,
        orbit_degrees_per_second: 35.0,
        scale: 0.0475,
        moons: &[],
    },
    CatalogEntry {
        name: "Earth",
        asset: "Earth",
        distance_au: 1.0,
        orbit_degrees_per_second: 29.0,
        scale: 0.05,
        moons: MOONS_OF_EARTH,
    },
    CatalogEntry {
        name: "Mars",
        asset: "Mars",
        distance_au: 1.5,
        orbit_degrees_per_second: 24.0,
        scale: 0.0265,
        moons: &[],
    },
    CatalogEntry {
        name: "Jupiter",
        asset: "Jupiter",
        distance_au: 2.2,
        orbit_degrees_per_second: 13.0,
        scale: 0.16,
        moons: &[],
    },
    CatalogEntry {
        name: "Saturn",
        asset: "Saturn",
        distance_au: 3.5,
        orbit_degrees_per_second: 9.0,
        scale: 0.1325,
        moons: &[],
    },
    CatalogEntry {
        name: "Uranus",
        asset: "Uranus",
        distance_au: 5.2,
        orbit_degrees_per_second: 7.0,
        scale: 0.1,
        moons: &[],
    },
    CatalogEntry {
        name: "Neptune",
        asset: "Neptune",
        distance_au: 6.1,
        orbit_degrees_per_second: 5.0,
        scale: 0.074,
        moons: &[],
    },
];

/// Every asset the built-in solar system needs, for one batch load
pub fn asset_names() -> Vec<&'static str> {
    fn collect(entries: &[CatalogEntry], out: &mut Vec<&'static str>) {
        for entry in entries {
            out.push(entry.asset);
            collect(entry.moons, out);
        }
    }
    let mut names = vec![SUN_ASSET];
    collect(PLANETS, &mut names);
    names.push(CONTROL_PANEL_ASSET);
    names
}

fn describe(entry: &CatalogEntry, assets: &AssetSet) -> Result<PlanetDescriptor, AssetError> {
    Ok(PlanetDescriptor {
        name: entry.name.to_string(),
        distance_au: entry.distance_au,
        orbit_degrees_per_second: entry.orbit_degrees_per_second,
        visual_asset: assets.get(entry.asset)?,
        scale: entry.scale,
        moons: entry
            .moons
            .iter()
            .map(|moon| describe(moon, assets))
            .collect::<Result<_, _>>()?,
    })
}

/// Descriptors for our solar system from a loaded batch
pub fn solar_system(assets: &AssetSet) -> Result<(SunDescriptor, Vec<PlanetDescriptor>), AssetError> {
    let sun = SunDescriptor {
        name: "Sun".to_string(),
        visual_asset: assets.get(SUN_ASSET)?,
        control_panel_asset: assets.get(CONTROL_PANEL_ASSET)?,
        scale: 0.5,
        height: 0.5,
    };
    let planets = PLANETS
        .iter()
        .map(|entry| describe(entry, assets))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((sun, planets))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::load_batch;
    use std::time::Duration;

    fn built_in() -> (SunDescriptor, Vec<PlanetDescriptor>) {
        let names: Vec<String> = asset_names().into_iter().map(String::from).collect();
        solar_system(&load_batch(&names).unwrap()).unwrap()
    }

    fn placed(settings: &Rc<SolarSettings>) -> (Scene, NodeId) {
        let (sun, planets) = built_in();
        let mut scene = Scene::new();
        let anchor = scene.spawn(SceneNode::new("anchor", NodeRole::Anchor));
        scene.add_root(anchor).unwrap();
        let base = compose(&mut scene, &sun, &planets, settings).unwrap();
        scene.set_parent(base, Some(anchor)).unwrap();
        (scene, base)
    }

    #[test]
    fn catalogue_is_in_declared_order() {
        let (_, planets) = built_in();
        let names: Vec<&str> = planets.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            ["Mercury", "Venus", "Earth", "Mars", "Jupiter", "Saturn", "Uranus", "Neptune"]
        );
        assert_eq!(planets[2].moons.len(), 1);
        assert_eq!(asset_names().len(), 11);
    }

    #[test]
    fn one_pivot_body_pair_per_planet_and_moon() {
        let settings = Rc::new(SolarSettings::new());
        let (scene, _) = placed(&settings);
        assert_eq!(scene.ids_with_role(NodeRole::OrbitPivot).count(), 9);
        assert_eq!(scene.ids_with_role(NodeRole::Body).count(), 9);
        assert_eq!(scene.ids_with_role(NodeRole::SpinPivot).count(), 9);
        assert_eq!(scene.ids_with_role(NodeRole::Sun).count(), 1);
        assert_eq!(scene.ids_with_role(NodeRole::ControlPanel).count(), 1);
    }

    #[test]
    fn bodies_sit_at_scaled_distance_from_their_pivot() {
        let settings = Rc::new(SolarSettings::new());
        let (scene, _) = placed(&settings);
        let (_, planets) = built_in();
        for planet in planets.iter().chain(planets[2].moons.iter()) {
            let body = scene.find_by_name(&planet.name).unwrap();
            let node = scene.node(body).unwrap();
            assert_eq!(node.local.translation, Vec3::new(planet.distance_au * AU_TO_METERS, 0.0, 0.0));
            let pivot = scene.node(node.parent().unwrap()).unwrap();
            assert_eq!(pivot.role, NodeRole::OrbitPivot);
            let controller = pivot.controller.as_ref().unwrap();
            assert_eq!(controller.motion(), MotionKind::Orbit);
            assert_eq!(controller.degrees_per_second(), planet.orbit_degrees_per_second);
        }
    }

    #[test]
    fn moon_orbits_its_planet() {
        let settings = Rc::new(SolarSettings::new());
        let (scene, _) = placed(&settings);
        let moon = scene.find_by_name("Moon").unwrap();
        let moon_pivot = scene.node(moon).unwrap().parent().unwrap();
        let earth = scene.find_by_name("Earth").unwrap();
        assert_eq!(scene.node(moon_pivot).unwrap().parent(), Some(earth));

        let sun = scene.find_by_name("Sun").unwrap();
        let mercury = scene.find_by_name("Mercury").unwrap();
        let mercury_pivot = scene.node(mercury).unwrap().parent().unwrap();
        assert_eq!(scene.node(mercury_pivot).unwrap().parent(), Some(sun));
    }

    #[test]
    fn spin_pivots_follow_rotation_multiplier() {
        let settings = Rc::new(SolarSettings::new());
        let (scene, _) = placed(&settings);
        for id in scene.ids_with_role(NodeRole::SpinPivot) {
            let node = scene.node(id).unwrap();
            let controller = node.controller.as_ref().unwrap();
            assert_eq!(controller.motion(), MotionKind::Spin);
            assert!(controller.is_active());
            assert!(node.visual.is_some());
        }
    }

    #[test]
    fn world_positions_at_phase_zero() {
        let settings = Rc::new(SolarSettings::new());
        let (scene, _) = placed(&settings);
        let earth = scene.find_by_name("Earth").unwrap();
        let moon = scene.find_by_name("Moon").unwrap();
        let earth_at = scene.world_position(earth).unwrap();
        assert!((earth_at - Vec3::new(0.5, 0.5, 0.0)).length() < 1e-5);
        let moon_at = scene.world_position(moon).unwrap();
        assert!((moon_at - Vec3::new(0.575, 0.5, 0.0)).length() < 1e-5);
    }

    #[test]
    fn orbit_keeps_distance_while_moving() {
        let settings = Rc::new(SolarSettings::new());
        let (mut scene, _) = placed(&settings);
        let sun = scene.find_by_name("Sun").unwrap();
        let mars = scene.find_by_name("Mars").unwrap();
        for _ in 0..10 {
            scene.update(Duration::from_millis(700));
            let offset = scene.world_position(mars).unwrap() - scene.world_position(sun).unwrap();
            assert!((offset.length() - 1.5 * AU_TO_METERS).abs() < 1e-4);
            assert!(offset.y.abs() < 1e-5);
        }
    }

    #[test]
    fn composing_twice_gives_independent_trees() {
        let settings = Rc::new(SolarSettings::new());
        let (sun, planets) = built_in();
        let mut scene = Scene::new();
        let first = compose(&mut scene, &sun, &planets, &settings).unwrap();
        let second = compose(&mut scene, &sun, &planets, &settings).unwrap();
        assert_ne!(first, second);
        assert_eq!(scene.ids_with_role(NodeRole::Base).count(), 2);
        assert_eq!(scene.ids_with_role(NodeRole::OrbitPivot).count(), 18);
    }

    #[test]
    fn taps_toggle_panel_and_cards() {
        let settings = Rc::new(SolarSettings::new());
        let (mut scene, base) = placed(&settings);

        let sun_visual = scene
            .ids_with_role(NodeRole::Visual)
            .next()
            .unwrap();
        let panel = scene.ids_with_role(NodeRole::ControlPanel).next().unwrap();
        assert!(scene.is_active(panel));
        let effect = handle_tap(&mut scene, sun_visual).unwrap().unwrap();
        assert_eq!(effect.role, NodeRole::ControlPanel);
        assert_eq!(effect.target, panel);
        assert!(!effect.shown);
        assert!(!scene.is_active(panel));
        let effect = handle_tap(&mut scene, sun_visual).unwrap().unwrap();
        assert!(effect.shown);

        let earth = scene.find_by_name("Earth").unwrap();
        let earth_visual = scene.child_with_role(earth, NodeRole::SpinPivot).unwrap();
        let effect = handle_tap(&mut scene, earth_visual).unwrap().unwrap();
        assert_eq!(effect.role, NodeRole::InfoCard);
        assert_eq!(scene.node(effect.target).unwrap().label.as_deref(), Some("Earth"));

        assert_eq!(handle_tap(&mut scene, base).unwrap(), None);
    }
}
