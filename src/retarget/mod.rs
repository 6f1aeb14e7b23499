//! MLTD → MMD 骨骼动作重定向

mod bone_frames;
mod bone_lookup;

pub use bone_frames::{create_bone_frames, BoneFrameConverter, BoneFrameSink};
pub use bone_lookup::{BoneLookup, BoneNameTable};
