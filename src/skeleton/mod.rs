//! 骨骼系统

mod bone;
mod hierarchy;

pub use bone::BoneNode;
pub use hierarchy::BoneHierarchy;

use glam::Vec3;

/// 骨骼定义（名称、父骨骼名称、绑定姿势下的世界空间位置）
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneDefinition {
    pub name: String,
    pub parent: Option<String>,
    pub position: Vec3,
}

impl BoneDefinition {
    pub fn new(name: &str, parent: Option<&str>, position: Vec3) -> Self {
        Self {
            name: name.to_string(),
            parent: parent.map(str::to_string),
            position,
        }
    }
}

/// 骨骼层级提供者（模型、Avatar 等）
pub trait HierarchySource {
    fn bone_definitions(&self) -> Vec<BoneDefinition>;
}

impl HierarchySource for [BoneDefinition] {
    fn bone_definitions(&self) -> Vec<BoneDefinition> {
        self.to_vec()
    }
}

impl HierarchySource for Vec<BoneDefinition> {
    fn bone_definitions(&self) -> Vec<BoneDefinition> {
        self.clone()
    }
}
