//! 动画关键帧

use glam::{Quat, Vec3};

/// 源动作关键帧（MLTD）
///
/// 位移和旋转通道各自独立，可能只有其中之一。
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SourceKeyframe {
    /// 骨骼层级路径，如 `BODY_SCALE/MODEL_00/BASE/MUNE1`
    pub path: String,
    /// 本地位移（Unity 坐标系）
    pub position: Option<Vec3>,
    /// 欧拉角（角度制，Unity 旋转顺序）
    pub rotation: Option<Vec3>,
}

impl SourceKeyframe {
    pub fn new(path: &str) -> Self {
        Self {
            path: path.to_string(),
            position: None,
            rotation: None,
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_rotation(mut self, euler_degrees: Vec3) -> Self {
        self.rotation = Some(euler_degrees);
        self
    }
}

/// VMD 骨骼关键帧（重定向输出）
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VmdBoneFrame {
    pub frame_index: u32,
    pub bone_name: String,
    pub position: Vec3,
    pub rotation: Quat,
}

impl VmdBoneFrame {
    pub fn new(frame_index: u32, bone_name: &str) -> Self {
        Self {
            frame_index,
            bone_name: bone_name.to_string(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}
