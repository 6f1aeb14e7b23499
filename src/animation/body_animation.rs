//! MLTD 身体动作数据
//!
//! 关键帧按采样分块存放：每个采样块恰好包含 `bone_count` 个关键帧，
//! 每块中骨骼路径的顺序相同。

use std::slice::ChunksExact;

use super::SourceKeyframe;
use crate::{Result, RetargetError};

/// 身体动作
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BodyAnimation {
    /// 有动画的骨骼数量（每个采样块的长度）
    pub bone_count: usize,
    /// 所有关键帧，按采样块顺序排列
    pub key_frames: Vec<SourceKeyframe>,
    /// 源采样率
    pub frame_rate: f32,
}

impl BodyAnimation {
    /// MLTD 动作的采样率
    pub const DEFAULT_FRAME_RATE: f32 = 60.0;

    pub fn new(bone_count: usize, key_frames: Vec<SourceKeyframe>) -> Self {
        Self {
            bone_count,
            key_frames,
            frame_rate: Self::DEFAULT_FRAME_RATE,
        }
    }

    /// 由采样块构建，块长度取第一块的长度
    pub fn from_samples(samples: Vec<Vec<SourceKeyframe>>) -> Self {
        let bone_count = samples.first().map(Vec::len).unwrap_or(0);
        Self::new(bone_count, samples.into_iter().flatten().collect())
    }

    /// 采样数量
    pub fn sample_count(&self) -> usize {
        if self.bone_count == 0 {
            0
        } else {
            self.key_frames.len() / self.bone_count
        }
    }

    /// 第一个采样块（用于确定关键骨骼）
    pub fn first_sample(&self) -> &[SourceKeyframe] {
        self.sample(0).unwrap_or(&[])
    }

    /// 获取指定采样块
    pub fn sample(&self, index: usize) -> Option<&[SourceKeyframe]> {
        if self.bone_count == 0 {
            return None;
        }
        let start = index.checked_mul(self.bone_count)?;
        let end = start.checked_add(self.bone_count)?;
        self.key_frames.get(start..end)
    }

    /// 按顺序遍历采样块
    pub fn samples(&self) -> ChunksExact<'_, SourceKeyframe> {
        self.key_frames.chunks_exact(self.bone_count.max(1))
    }

    /// 校验分块结构
    ///
    /// 关键帧总数必须能被骨骼数整除，且每块的骨骼路径顺序与第一块一致。
    pub fn validate(&self) -> Result<()> {
        let key_frame_count = self.key_frames.len();

        if self.bone_count == 0 {
            if key_frame_count == 0 {
                return Ok(());
            }
            return Err(RetargetError::InputFormat(format!(
                "animation has {} key frames but zero animated bones",
                key_frame_count
            )));
        }

        if key_frame_count % self.bone_count != 0 {
            return Err(RetargetError::InputFormat(format!(
                "key frame count {} is not a multiple of animated bone count {}",
                key_frame_count, self.bone_count
            )));
        }

        let first = self.first_sample();
        for (i, block) in self.samples().enumerate().skip(1) {
            for (j, (key_frame, reference)) in block.iter().zip(first).enumerate() {
                if key_frame.path != reference.path {
                    return Err(RetargetError::InputFormat(format!(
                        "sample {} slot {}: expected bone \"{}\", found \"{}\"",
                        i, j, reference.path, key_frame.path
                    )));
                }
            }
        }

        Ok(())
    }
}

/// 身体动作提供者
pub trait BodyAnimationSource {
    fn convert(&self) -> Result<BodyAnimation>;
}

impl BodyAnimationSource for BodyAnimation {
    fn convert(&self) -> Result<BodyAnimation> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn block(angle: f32) -> Vec<SourceKeyframe> {
        vec![
            SourceKeyframe::new("MODEL_00/BASE").with_position(Vec3::ZERO),
            SourceKeyframe::new("MODEL_00/BASE/MUNE1").with_rotation(Vec3::new(0.0, angle, 0.0)),
        ]
    }

    #[test]
    fn test_sample_blocks() {
        let animation = BodyAnimation::from_samples(vec![block(0.0), block(10.0), block(20.0)]);
        assert_eq!(animation.bone_count, 2);
        assert_eq!(animation.sample_count(), 3);
        assert!(animation.validate().is_ok());

        let second = animation.sample(1).unwrap();
        assert_eq!(second[1].rotation, Some(Vec3::new(0.0, 10.0, 0.0)));
        assert!(animation.sample(3).is_none());
        assert_eq!(animation.samples().count(), 3);
    }

    #[test]
    fn test_indivisible_key_frame_count() {
        let key_frames = (0..100)
            .map(|i| SourceKeyframe::new(&format!("BONE_{}", i % 7)))
            .collect();
        let animation = BodyAnimation::new(7, key_frames);
        assert!(matches!(
            animation.validate(),
            Err(RetargetError::InputFormat(_))
        ));
    }

    #[test]
    fn test_inconsistent_block_order() {
        let mut second = block(10.0);
        second.swap(0, 1);
        let animation = BodyAnimation::from_samples(vec![block(0.0), second]);
        assert!(matches!(
            animation.validate(),
            Err(RetargetError::InputFormat(_))
        ));
    }

    #[test]
    fn test_sample_index_out_of_range() {
        let animation = BodyAnimation::from_samples(vec![block(0.0), block(10.0)]);
        assert!(animation.sample(2).is_none());
        assert!(animation.sample(usize::MAX / 2).is_none());
        assert!(animation.sample(usize::MAX).is_none());

        let single = BodyAnimation::new(1, vec![SourceKeyframe::new("POSITION")]);
        assert!(single.sample(usize::MAX).is_none());
    }

    #[test]
    fn test_empty_animation() {
        let animation = BodyAnimation::new(0, Vec::new());
        assert!(animation.validate().is_ok());
        assert_eq!(animation.sample_count(), 0);
        assert!(animation.first_sample().is_empty());

        let broken = BodyAnimation::new(0, vec![SourceKeyframe::new("POSITION")]);
        assert!(broken.validate().is_err());
    }
}
