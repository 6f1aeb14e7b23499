//! 动画数据
//!
//! 源动作（MLTD 身体动作，按采样分块）与重定向输出（VMD 骨骼关键帧）。

mod body_animation;
mod keyframe;

pub use body_animation::{BodyAnimation, BodyAnimationSource};
pub use keyframe::{SourceKeyframe, VmdBoneFrame};
