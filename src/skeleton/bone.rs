//! 骨骼节点

use glam::{Mat4, Quat, Vec3};

/// 骨骼节点
///
/// 节点存放在 [`BoneHierarchy`](super::BoneHierarchy) 的数组中，
/// `parent` 是同一数组内的下标，且总是小于自身下标。
#[derive(Clone, Debug)]
pub struct BoneNode {
    name: String,
    parent: Option<usize>,

    // 初始位置（世界空间，绑定姿势）
    initial_position: Vec3,
    // 相对于父骨骼的偏移（根骨骼为初始位置本身）
    bone_offset: Vec3,
    // 绑定矩阵及其逆
    bind_pose: Mat4,
    inverse_bind_matrix: Mat4,

    /// 动画平移（相对静止姿势的偏移）
    pub local_position: Vec3,
    /// 动画旋转
    pub local_rotation: Quat,

    /// 是否为 MLTD 关键骨骼（仅目标层级使用）
    pub is_key_bone: bool,

    // 变换结果
    world_transform: Mat4,
}

impl BoneNode {
    pub(crate) fn new(name: String, parent: Option<usize>, initial_position: Vec3, parent_position: Vec3) -> Self {
        let bind_pose = Mat4::from_translation(initial_position);
        let bone_offset = if parent.is_some() {
            initial_position - parent_position
        } else {
            initial_position
        };

        Self {
            name,
            parent,
            initial_position,
            bone_offset,
            bind_pose,
            inverse_bind_matrix: bind_pose.inverse(),
            local_position: Vec3::ZERO,
            local_rotation: Quat::IDENTITY,
            is_key_bone: false,
            world_transform: Mat4::IDENTITY,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub fn initial_position(&self) -> Vec3 {
        self.initial_position
    }

    pub fn bone_offset(&self) -> Vec3 {
        self.bone_offset
    }

    pub fn bind_pose(&self) -> Mat4 {
        self.bind_pose
    }

    /// 重置动画状态，不重新计算任何矩阵
    pub fn initialize(&mut self) {
        self.local_position = Vec3::ZERO;
        self.local_rotation = Quat::IDENTITY;
    }

    /// 本地变换：先旋转，再平移到 `bone_offset + local_position`
    pub fn local_transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.local_rotation, self.bone_offset + self.local_position)
    }

    /// 全局变换，首次更新前为单位矩阵
    pub fn world_transform(&self) -> Mat4 {
        self.world_transform
    }

    /// 蒙皮矩阵 = 当前全局变换 * 逆绑定矩阵
    pub fn skinning_matrix(&self) -> Mat4 {
        self.world_transform * self.inverse_bind_matrix
    }

    pub(crate) fn set_world_transform(&mut self, transform: Mat4) {
        self.world_transform = transform;
    }
}
