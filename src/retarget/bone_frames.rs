//! 骨骼动作重定向
//!
//! 逐个采样把 MLTD 关键帧应用到源层级，更新正向运动学后，
//! 求解每个目标骨骼的本地姿势，使目标蒙皮变形与源蒙皮变形一致。

use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

use glam::{Mat4, Quat, Vec3};

use super::BoneLookup;
use crate::animation::{BodyAnimation, BodyAnimationSource, SourceKeyframe, VmdBoneFrame};
use crate::config::ConversionConfig;
use crate::coordinate::{fix_unity_position, fix_unity_rotation, unity_euler_deg};
use crate::skeleton::{BoneHierarchy, HierarchySource};
use crate::{Result, RetargetError};

/// 重定向输出的接收方
pub trait BoneFrameSink {
    fn push_frame(&mut self, frame: VmdBoneFrame);
}

impl BoneFrameSink for Vec<VmdBoneFrame> {
    fn push_frame(&mut self, frame: VmdBoneFrame) {
        self.push(frame);
    }
}

/// 采样块中一个槽位对应的源骨骼
#[derive(Clone, Copy, Debug)]
pub(crate) struct ChannelBinding {
    bone: usize,
    /// 额外接收旋转的重新挂接骨骼
    attachment: Option<usize>,
}

/// 转换一个完整的动作：每次调用都构建新的骨骼层级
pub fn create_bone_frames(
    animation_source: &dyn BodyAnimationSource,
    source_bones: &dyn HierarchySource,
    target_bones: &dyn HierarchySource,
    config: &ConversionConfig,
    lookup: &BoneLookup,
) -> Result<Vec<VmdBoneFrame>> {
    let converter = BoneFrameConverter::new(config, lookup);
    converter.check_config()?;

    let mut source = BoneHierarchy::from_source(source_bones)?;
    let mut target = BoneHierarchy::from_source(target_bones)?;
    let animation = animation_source.convert()?;

    converter.create_bone_frames(&animation, &mut source, &mut target)
}

/// 骨骼动作转换器
pub struct BoneFrameConverter<'a> {
    config: &'a ConversionConfig,
    lookup: &'a BoneLookup,
}

impl<'a> BoneFrameConverter<'a> {
    pub fn new(config: &'a ConversionConfig, lookup: &'a BoneLookup) -> Self {
        Self { config, lookup }
    }

    /// 生成 VMD 骨骼关键帧
    pub fn create_bone_frames(
        &self,
        animation: &BodyAnimation,
        source: &mut BoneHierarchy,
        target: &mut BoneHierarchy,
    ) -> Result<Vec<VmdBoneFrame>> {
        let mut frames = Vec::new();
        self.create_bone_frames_into(animation, source, target, &mut frames)?;
        Ok(frames)
    }

    /// 生成 VMD 骨骼关键帧并写入 `sink`
    ///
    /// 配置和输入格式错误在写入任何关键帧之前返回。
    /// 两个层级在调用期间被独占，姿势字段逐帧覆盖。
    pub fn create_bone_frames_into<S: BoneFrameSink + ?Sized>(
        &self,
        animation: &BodyAnimation,
        source: &mut BoneHierarchy,
        target: &mut BoneHierarchy,
        sink: &mut S,
    ) -> Result<()> {
        self.check_config()?;
        check_bone_counts(source, target);
        animation.validate()?;

        source.initialize();
        target.initialize();

        let first_sample = animation.first_sample();
        self.mark_key_bones(first_sample, target);
        let bindings = self.bind_channels(first_sample, source)?;
        let counterparts = self.match_source_bones(source, target);

        let mut output_frames = 0usize;
        for (i, sample) in animation.samples().enumerate() {
            let Some(frame_index) = self.config.output_frame_index(i) else {
                continue;
            };

            self.apply_source_pose(sample, &bindings, source);
            source.update_all_transforms();
            solve_target_frame(frame_index, source, target, &counterparts, sink);

            output_frames += 1;
        }

        log::info!(
            "骨骼动作转换完成: {} 个采样, 输出 {} 帧 ({} FPS)",
            animation.sample_count(),
            output_frames,
            self.config.output_frame_rate(animation.frame_rate)
        );

        Ok(())
    }

    pub(crate) fn check_config(&self) -> Result<()> {
        if self.config.appends_bones() {
            return Err(RetargetError::UnsupportedConfiguration(
                "character motion frames generation is not supported when appending bones (eyes and/or IK) is enabled"
                    .to_string(),
            ));
        }
        Ok(())
    }

    /// 标记目标层级中的关键骨骼
    fn mark_key_bones(&self, first_sample: &[SourceKeyframe], target: &mut BoneHierarchy) {
        let mut names: Vec<String> = first_sample
            .iter()
            .map(|key_frame| self.lookup.target_name_from_path(&key_frame.path))
            .collect();
        names.extend(self.lookup.always_key_bones().map(str::to_string));

        for name in &names {
            if !target.mark_key_bone(name) {
                log::warn!("无法标记关键骨骼 {}: 模型中不存在该骨骼", name);
            }
        }
    }

    /// 为采样块的每个槽位查找源骨骼，之后每个采样直接复用
    pub(crate) fn bind_channels(
        &self,
        first_sample: &[SourceKeyframe],
        source: &BoneHierarchy,
    ) -> Result<Vec<Option<ChannelBinding>>> {
        first_sample
            .iter()
            .map(|key_frame| -> Result<Option<ChannelBinding>> {
                let bone_name = self.lookup.bone_name_from_path(&key_frame.path);

                // 部分角色没有 POSITION 骨骼
                let Some(bone) = source.find_bone_by_name(&bone_name) else {
                    log::warn!("源层级中没有骨骼 {}，跳过该通道", bone_name);
                    return Ok(None);
                };

                let attachment = match self.lookup.attachment_for(&bone_name) {
                    Some(target_name) => Some(source.find_bone_by_name(target_name).ok_or_else(|| {
                        RetargetError::AttachmentTargetMissing {
                            bone: bone_name.clone(),
                            target: target_name.to_string(),
                        }
                    })?),
                    None => None,
                };

                log::debug!("通道 {} -> 源骨骼 #{}", key_frame.path, bone);
                Ok(Some(ChannelBinding { bone, attachment }))
            })
            .collect()
    }

    /// 目标骨骼 → 对应的源骨骼
    ///
    /// 多个源骨骼解析到同一目标名时，重新挂接的骨骼优先，否则取拓扑序靠前的。
    fn match_source_bones(&self, source: &BoneHierarchy, target: &BoneHierarchy) -> Vec<Option<usize>> {
        let reattached: HashSet<&str> = self
            .lookup
            .table()
            .attachments
            .values()
            .map(String::as_str)
            .collect();

        let mut by_target_name: HashMap<String, usize> = HashMap::with_capacity(source.len());
        for (i, bone) in source.iter().enumerate() {
            let name = self.lookup.target_name_from_bone_name(bone.name());
            match by_target_name.entry(name) {
                Entry::Vacant(entry) => {
                    entry.insert(i);
                }
                Entry::Occupied(mut entry) => {
                    if reattached.contains(bone.name()) {
                        entry.insert(i);
                    }
                }
            }
        }

        let counterparts: Vec<Option<usize>> = target
            .iter()
            .map(|bone| by_target_name.get(bone.name()).copied())
            .collect();

        for (bone, counterpart) in target.iter().zip(&counterparts) {
            if bone.is_key_bone && counterpart.is_none() {
                log::warn!("关键骨骼 {} 在源层级中没有对应骨骼，不会输出", bone.name());
            }
        }

        counterparts
    }

    /// 把一个采样块应用到源层级（不更新全局变换）
    pub(crate) fn apply_source_pose(
        &self,
        sample: &[SourceKeyframe],
        bindings: &[Option<ChannelBinding>],
        source: &mut BoneHierarchy,
    ) {
        let position_scale = self.config.position_scale();

        for (key_frame, binding) in sample.iter().zip(bindings) {
            let Some(binding) = binding else {
                continue;
            };

            if let Some(position) = key_frame.position {
                source[binding.bone].local_position = fix_unity_position(position) * position_scale;
            }

            if let Some(euler) = key_frame.rotation {
                let rotation = fix_unity_rotation(unity_euler_deg(euler.x, euler.y, euler.z));
                source[binding.bone].local_rotation = rotation;

                if let Some(attachment) = binding.attachment {
                    source[attachment].local_rotation = rotation;
                }
            }
        }
    }
}

/// 源与目标骨骼数量不一致时只做诊断
fn check_bone_counts(source: &BoneHierarchy, target: &BoneHierarchy) {
    if source.len() != target.len() {
        log::warn!(
            "源层级与目标层级骨骼数量不一致: {} != {}",
            source.len(),
            target.len()
        );
    }
    debug_assert_eq!(
        source.len(),
        target.len(),
        "hierarchy bone count should be equal between source and target"
    );
}

/// 按拓扑顺序求解一帧内所有关键骨骼
///
/// 每个骨骼求解后立即写回并更新全局变换，子骨骼因此看到父骨骼本帧的姿势。
fn solve_target_frame<S: BoneFrameSink + ?Sized>(
    frame_index: u32,
    source: &BoneHierarchy,
    target: &mut BoneHierarchy,
    counterparts: &[Option<usize>],
    sink: &mut S,
) {
    for j in 0..target.len() {
        let counterpart = counterparts[j].filter(|_| target[j].is_key_bone);
        if let Some(source_index) = counterpart {
            let (position, rotation) = solve_local_pose(source.skinning_matrix(source_index), target, j);

            let mut frame = VmdBoneFrame::new(frame_index, target[j].name());
            frame.position = position;
            frame.rotation = rotation;
            sink.push_frame(frame);

            let bone = &mut target[j];
            bone.local_position = position;
            bone.local_rotation = rotation;
        }

        target.update_transform(j);
    }
}

/// 求解目标骨骼的本地姿势，使其蒙皮矩阵等于 `skin`
///
/// skin == world * inv(bind)，world == parent_world * local，
/// 所以 local = inv(parent_world) * skin * bind。
/// 分解出的平移包含静止姿势下相对父骨骼的偏移，减去 bone_offset 后才是 VMD 位移。
pub(crate) fn solve_local_pose(skin: Mat4, target: &BoneHierarchy, index: usize) -> (Vec3, Quat) {
    let bone = &target[index];
    let local = target.parent_world_transform(index).inverse() * skin * bone.bind_pose();
    let (_, rotation, translation) = local.to_scale_rotation_translation();
    (translation - bone.bone_offset(), rotation.normalize())
}
