//! Scene graph: an arena of role-tagged node records.
//!
//! A node is *active* while it hangs off a root through a chain of enabled
//! nodes. Rotation controllers start when their node becomes active and
//! stop when it stops being active. Only the per-frame [`Scene::update`]
//! pass writes local rotations, and only for pivots that own a controller.

use std::time::Duration;

use glam::{Mat4, Quat, Vec3};
use log::{debug, trace};

use crate::assets::AssetHandle;
use crate::error::SceneError;
use crate::rotation::RotationController;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// What a node is for
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeRole {
    /// Pinned to a surface hit
    Anchor,
    Base,
    Sun,
    /// Carries a visual and nothing else
    Visual,
    ControlPanel,
    InfoCard,
    /// Invisible node whose rotation carries its children around
    OrbitPivot,
    /// Spinning node holding a body's visual
    SpinPivot,
    Body,
}

impl NodeRole {
    pub fn is_pivot(self) -> bool {
        matches!(self, NodeRole::OrbitPivot | NodeRole::SpinPivot)
    }
}

/// Local transform relative to the parent
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: f32,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: 1.0,
    };

    pub fn from_translation(translation: Vec3) -> Self {
        Transform {
            translation,
            ..Self::IDENTITY
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(Vec3::splat(self.scale), self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Clone, Debug)]
pub struct SceneNode {
    pub name: String,
    pub role: NodeRole,
    pub local: Transform,
    pub visual: Option<AssetHandle>,
    /// Text shown by panels and cards
    pub label: Option<String>,
    pub controller: Option<RotationController>,
    enabled: bool,
    active: bool,
    is_root: bool,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl SceneNode {
    pub fn new(name: impl Into<String>, role: NodeRole) -> Self {
        SceneNode {
            name: name.into(),
            role,
            local: Transform::IDENTITY,
            visual: None,
            label: None,
            controller: None,
            enabled: true,
            active: false,
            is_root: false,
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.local.translation = translation;
        self
    }

    pub fn with_scale(mut self, scale: f32) -> Self {
        self.local.scale = scale;
        self
    }

    pub fn with_visual(mut self, visual: AssetHandle) -> Self {
        self.visual = Some(visual);
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_controller(mut self, controller: RotationController) -> Self {
        self.controller = Some(controller);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }
}

#[derive(Debug, Default)]
pub struct Scene {
    nodes: Vec<Option<SceneNode>>,
}

impl Scene {
    pub fn new() -> Self {
        Scene { nodes: Vec::new() }
    }

    /// Adds a detached node. It stays inactive until it reaches a root.
    pub fn spawn(&mut self, mut node: SceneNode) -> NodeId {
        node.parent = None;
        node.children.clear();
        node.active = false;
        node.is_root = false;
        self.nodes.push(Some(node));
        NodeId(self.nodes.len() - 1)
    }

    /// Spawns `node` directly under `parent`
    pub fn spawn_child(&mut self, parent: NodeId, node: SceneNode) -> Result<NodeId, SceneError> {
        let id = self.spawn(node);
        self.set_parent(id, Some(parent))?;
        Ok(id)
    }

    /// Makes `id` a live root of the scene
    pub fn add_root(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.set_parent(id, None)?;
        self.try_node_mut(id)?.is_root = true;
        self.refresh_activation(id);
        Ok(())
    }

    pub fn node(&self, id: NodeId) -> Option<&SceneNode> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut SceneNode> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn try_node(&self, id: NodeId) -> Result<&SceneNode, SceneError> {
        self.node(id).ok_or(SceneError::MissingNode(id.0))
    }

    fn try_node_mut(&mut self, id: NodeId) -> Result<&mut SceneNode, SceneError> {
        self.node_mut(id).ok_or(SceneError::MissingNode(id.0))
    }

    pub fn is_active(&self, id: NodeId) -> bool {
        self.node(id).is_some_and(SceneNode::is_active)
    }

    /// Number of live records
    pub fn len(&self) -> usize {
        self.nodes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All live node ids in creation order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.is_some())
            .map(|(index, _)| NodeId(index))
    }

    pub fn ids_with_role(&self, role: NodeRole) -> impl Iterator<Item = NodeId> + '_ {
        self.ids()
            .filter(move |id| self.node(*id).is_some_and(|node| node.role == role))
    }

    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.ids()
            .find(|id| self.node(*id).is_some_and(|node| node.name == name))
    }

    /// First direct child of `parent` with `role`
    pub fn child_with_role(&self, parent: NodeId, role: NodeRole) -> Option<NodeId> {
        self.node(parent)?
            .children
            .iter()
            .copied()
            .find(|child| self.node(*child).is_some_and(|node| node.role == role))
    }

    /// Walks up from `id` (inclusive) to the first node accepted by `pred`
    pub fn ancestor_where(&self, id: NodeId, pred: impl Fn(&SceneNode) -> bool) -> Option<NodeId> {
        let mut current = Some(id);
        while let Some(id) = current {
            let node = self.node(id)?;
            if pred(node) {
                return Some(id);
            }
            current = node.parent;
        }
        None
    }

    fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        std::iter::successors(Some(id), |id| self.node(*id).and_then(|n| n.parent))
            .any(|id| id == ancestor)
    }

    /// Re-parents `child`, or detaches it when `parent` is `None`
    pub fn set_parent(&mut self, child: NodeId, parent: Option<NodeId>) -> Result<(), SceneError> {
        self.try_node(child)?;
        if let Some(parent) = parent {
            self.try_node(parent)?;
            if self.is_ancestor(child, parent) {
                return Err(SceneError::Cycle {
                    child: child.0,
                    parent: parent.0,
                });
            }
        }

        if let Some(old) = self.try_node(child)?.parent {
            if let Some(old) = self.node_mut(old) {
                old.children.retain(|c| *c != child);
            }
        }
        if let Some(parent) = parent {
            self.try_node_mut(parent)?.children.push(child);
        }
        let node = self.try_node_mut(child)?;
        node.parent = parent;
        node.is_root = false;
        self.refresh_activation(child);
        Ok(())
    }

    pub fn set_enabled(&mut self, id: NodeId, enabled: bool) -> Result<(), SceneError> {
        self.try_node_mut(id)?.enabled = enabled;
        self.refresh_activation(id);
        Ok(())
    }

    /// Flips the enabled flag, returning the new value
    pub fn toggle_enabled(&mut self, id: NodeId) -> Result<bool, SceneError> {
        let enabled = !self.try_node(id)?.enabled;
        self.set_enabled(id, enabled)?;
        Ok(enabled)
    }

    /// Detaches and destroys `id` and its whole subtree
    pub fn remove(&mut self, id: NodeId) -> Result<(), SceneError> {
        self.set_parent(id, None)?;
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) {
                trace!("destroy node {} ({:?})", node.name, node.role);
                stack.extend(node.children);
            }
        }
        Ok(())
    }

    /// Propagates activation changes from `id` down its subtree
    fn refresh_activation(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            let parent_active = match node.parent {
                Some(parent) => self.is_active(parent),
                None => node.is_root,
            };
            let Some(node) = self.node_mut(id) else {
                continue;
            };
            let active = parent_active && node.enabled;
            if active == node.active {
                continue;
            }
            node.active = active;
            if let Some(controller) = node.controller.as_mut() {
                if active {
                    controller.activate();
                } else {
                    controller.deactivate();
                }
                debug!(
                    "{} {}",
                    node.name,
                    if active { "activated" } else { "deactivated" }
                );
            }
            stack.extend(node.children.iter().copied());
        }
    }

    /// Per-frame pass over every active node that owns a controller
    pub fn update(&mut self, dt: Duration) {
        for node in self.nodes.iter_mut().flatten() {
            if !node.active || !node.role.is_pivot() {
                continue;
            }
            if let Some(controller) = node.controller.as_mut() {
                controller.update(dt);
                node.local.rotation = controller.orientation();
            }
        }
    }

    /// World matrix of `id`, composed through its ancestors
    pub fn world_matrix(&self, id: NodeId) -> Option<Mat4> {
        let node = self.node(id)?;
        let local = node.local.matrix();
        match node.parent {
            Some(parent) => Some(self.world_matrix(parent)? * local),
            None => Some(local),
        }
    }

    pub fn world_position(&self, id: NodeId) -> Option<Vec3> {
        self.world_matrix(id).map(|m| m.transform_point3(Vec3::ZERO))
    }

    /// World matrices of every active node, indexed by [`NodeId::index`]
    pub fn world_transforms(&self) -> Vec<Option<Mat4>> {
        let mut out = vec![None; self.nodes.len()];
        let mut stack: Vec<(NodeId, Mat4)> = self
            .ids()
            .filter(|id| self.node(*id).is_some_and(|n| n.is_root && n.active))
            .map(|id| (id, Mat4::IDENTITY))
            .collect();
        while let Some((id, parent)) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if !node.active {
                continue;
            }
            let world = parent * node.local.matrix();
            out[id.0] = Some(world);
            stack.extend(node.children.iter().map(|child| (*child, world)));
        }
        out
    }
}
