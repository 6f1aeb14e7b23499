//! MMD Retarget - 将 MLTD 角色动作重定向到 MMD 模型骨骼
//!
//! 提供与 MillionDance 骨骼动作转换等价的功能：
//! - 源/目标骨骼层级构建（拓扑排序）
//! - 正向运动学与蒙皮矩阵计算
//! - MLTD 骨骼路径到 MMD 骨骼名的映射
//! - 逐帧重定向，输出 VMD 骨骼关键帧
//!
//! 二进制格式读写（PMX/VMD/Unity 资源）不在本 crate 范围内，
//! 由调用方通过 [`skeleton::HierarchySource`]、[`animation::BodyAnimationSource`]
//! 和 [`retarget::BoneFrameSink`] 接入。

pub mod animation;
pub mod config;
pub mod coordinate;
pub mod retarget;
pub mod skeleton;

pub use animation::{BodyAnimation, BodyAnimationSource, SourceKeyframe, VmdBoneFrame};
pub use config::ConversionConfig;
pub use retarget::{create_bone_frames, BoneFrameConverter, BoneFrameSink, BoneLookup, BoneNameTable};
pub use skeleton::{BoneDefinition, BoneHierarchy, BoneNode, HierarchySource};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RetargetError {
    #[error("Unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    #[error("Hierarchy structure error: {0}")]
    Structural(String),

    #[error("Input format error: {0}")]
    InputFormat(String),

    #[error("Attachment target \"{target}\" of bone \"{bone}\" is missing from the hierarchy")]
    AttachmentTargetMissing { bone: String, target: String },
}

pub type Result<T> = std::result::Result<T, RetargetError>;
