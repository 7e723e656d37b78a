//! Scene holding instantiated prefabs
//!
//! Built on top of the hecs ECS library. Every instance is an entity with a
//! [`Name`], a local [`Transform`] and an optional [`Parent`].

use glam::{Mat4, Quat, Vec3};
use hecs::Entity;

use crate::assets::InstanceId;

/// Local position, rotation and scale of an instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position relative to the parent
    pub position: Vec3,
    /// Rotation as a quaternion
    pub rotation: Quat,
    /// Scale factor
    pub scale: Vec3,
}

impl Transform {
    /// Create a transform with just a position
    #[must_use]
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Decompose an affine matrix
    #[must_use]
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, position) = matrix.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }

    /// Get the transformation matrix
    #[must_use]
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

/// Name component for debugging
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

/// Parent component - indicates this entity has a parent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parent(pub Entity);

/// Template an instance is created from
#[derive(Debug, Clone, PartialEq)]
pub struct Prefab {
    /// Name given to every instance
    pub name: String,
    /// Transform of the prefab root
    pub transform: Transform,
}

impl Prefab {
    /// Create a prefab with an identity transform
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
        }
    }

    /// Set the root transform
    #[must_use]
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }
}

fn entity_of(instance: InstanceId) -> Option<Entity> {
    Entity::from_bits(instance.raw())
}

fn instance_of(entity: Entity) -> InstanceId {
    InstanceId::from_raw(entity.to_bits().get())
}

/// World containing every live instance
#[derive(Default)]
pub struct SceneWorld {
    inner: hecs::World,
}

impl SceneWorld {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn an instance of `prefab`.
    ///
    /// With a parent, the prefab transform is taken as local unless
    /// `keep_world_space` is set, in which case the instance keeps the
    /// prefab's world placement. Returns `None` if the parent does not exist.
    pub fn spawn_instance(
        &mut self,
        prefab: &Prefab,
        parent: Option<InstanceId>,
        keep_world_space: bool,
    ) -> Option<InstanceId> {
        let parent = match parent {
            Some(instance) => Some(self.live_entity(instance)?),
            None => None,
        };

        let entity = match parent {
            Some(parent_entity) => {
                let local = if keep_world_space {
                    let parent_world = self.world_matrix_of(parent_entity);
                    Transform::from_matrix(parent_world.inverse() * prefab.transform.matrix())
                } else {
                    prefab.transform
                };
                self.inner
                    .spawn((Name(prefab.name.clone()), local, Parent(parent_entity)))
            }
            None => self
                .inner
                .spawn((Name(prefab.name.clone()), prefab.transform)),
        };

        Some(instance_of(entity))
    }

    /// Despawn an instance together with all of its descendants.
    ///
    /// Returns every instance that was removed, the requested one first.
    pub fn despawn_instance(&mut self, instance: InstanceId) -> Vec<InstanceId> {
        let Some(root) = self.live_entity(instance) else {
            return Vec::new();
        };

        let mut removed = Vec::new();
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            let children: Vec<Entity> = self
                .inner
                .iter()
                .filter(|entity| {
                    entity
                        .get::<&Parent>()
                        .is_some_and(|parent| parent.0 == current)
                })
                .map(|entity| entity.entity())
                .collect();
            stack.extend(children);

            if self.inner.despawn(current).is_ok() {
                removed.push(instance_of(current));
            }
        }
        removed
    }

    /// Check if an instance exists
    #[must_use]
    pub fn contains(&self, instance: InstanceId) -> bool {
        self.live_entity(instance).is_some()
    }

    /// Get the number of live instances
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.inner.len() as usize
    }

    #[must_use]
    pub fn name(&self, instance: InstanceId) -> Option<String> {
        let entity = self.live_entity(instance)?;
        self.inner
            .get::<&Name>(entity)
            .ok()
            .map(|name| name.0.clone())
    }

    #[must_use]
    pub fn parent(&self, instance: InstanceId) -> Option<InstanceId> {
        let entity = self.live_entity(instance)?;
        self.inner
            .get::<&Parent>(entity)
            .ok()
            .map(|parent| instance_of(parent.0))
    }

    #[must_use]
    pub fn local_transform(&self, instance: InstanceId) -> Option<Transform> {
        let entity = self.live_entity(instance)?;
        self.inner.get::<&Transform>(entity).ok().map(|t| *t)
    }

    /// World-space matrix of an instance, walking up its parents
    #[must_use]
    pub fn world_matrix(&self, instance: InstanceId) -> Option<Mat4> {
        let entity = self.live_entity(instance)?;
        Some(self.world_matrix_of(entity))
    }

    fn world_matrix_of(&self, entity: Entity) -> Mat4 {
        let local = self
            .inner
            .get::<&Transform>(entity)
            .map(|t| t.matrix())
            .unwrap_or(Mat4::IDENTITY);
        match self.inner.get::<&Parent>(entity).map(|p| p.0) {
            Ok(parent) => self.world_matrix_of(parent) * local,
            Err(_) => local,
        }
    }

    fn live_entity(&self, instance: InstanceId) -> Option<Entity> {
        entity_of(instance).filter(|entity| self.inner.contains(*entity))
    }
}

impl std::fmt::Debug for SceneWorld {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SceneWorld")
            .field("instances", &self.inner.len())
            .finish()
    }
}
