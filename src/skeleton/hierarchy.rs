//! 骨骼层级

use glam::Mat4;
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

use super::{BoneDefinition, BoneNode, HierarchySource};
use crate::{Result, RetargetError};

/// 骨骼层级
///
/// 骨骼按拓扑顺序存放：下标即拓扑序号，父骨骼总是排在子骨骼之前。
/// 构建完成后骨骼数量固定，只有姿势字段会被逐帧改写。
#[derive(Clone, Debug)]
pub struct BoneHierarchy {
    bones: Vec<BoneNode>,
    name_to_index: HashMap<String, usize>,
}

impl BoneHierarchy {
    /// 从骨骼提供者构建层级
    pub fn from_source<S: HierarchySource + ?Sized>(source: &S) -> Result<Self> {
        Self::build(&source.bone_definitions())
    }

    /// 构建骨骼层级
    ///
    /// 输入顺序任意；输出为前序遍历顺序，同级骨骼保持输入中的相对顺序。
    pub fn build(definitions: &[BoneDefinition]) -> Result<Self> {
        let count = definitions.len();

        let mut definition_index = HashMap::with_capacity(count);
        for (i, def) in definitions.iter().enumerate() {
            if definition_index.insert(def.name.as_str(), i).is_some() {
                return Err(RetargetError::Structural(format!(
                    "duplicate bone name \"{}\"",
                    def.name
                )));
            }
        }

        // 通过名称链接父骨骼
        let mut roots = Vec::new();
        let mut children: Vec<Vec<usize>> = vec![Vec::new(); count];
        for (i, def) in definitions.iter().enumerate() {
            match def.parent.as_deref() {
                Some(parent_name) => {
                    let parent = *definition_index.get(parent_name).ok_or_else(|| {
                        RetargetError::Structural(format!(
                            "parent \"{}\" of bone \"{}\" does not exist",
                            parent_name, def.name
                        ))
                    })?;
                    children[parent].push(i);
                }
                None => roots.push(i),
            }
        }

        // 前序遍历，得到拓扑顺序
        let mut order = Vec::with_capacity(count);
        let mut stack: Vec<usize> = roots.iter().rev().copied().collect();
        while let Some(i) = stack.pop() {
            order.push(i);
            stack.extend(children[i].iter().rev().copied());
        }

        // 环上的骨骼无法从任何根骨骼到达
        if order.len() != count {
            let mut visited = vec![false; count];
            for &i in &order {
                visited[i] = true;
            }
            let stranded: Vec<&str> = definitions
                .iter()
                .enumerate()
                .filter(|(i, _)| !visited[*i])
                .map(|(_, def)| def.name.as_str())
                .collect();
            return Err(RetargetError::Structural(format!(
                "bone parent links form a cycle: {}",
                stranded.join(", ")
            )));
        }

        let mut rank = vec![0usize; count];
        for (r, &i) in order.iter().enumerate() {
            rank[i] = r;
        }

        let mut bones: Vec<BoneNode> = Vec::with_capacity(count);
        let mut name_to_index = HashMap::with_capacity(count);
        for &i in &order {
            let def = &definitions[i];
            let parent = def
                .parent
                .as_deref()
                .and_then(|name| definition_index.get(name))
                .map(|&p| rank[p]);
            let parent_position = parent
                .map(|p| bones[p].initial_position())
                .unwrap_or_default();

            name_to_index.insert(def.name.clone(), bones.len());
            bones.push(BoneNode::new(def.name.clone(), parent, def.position, parent_position));
        }

        log::debug!("骨骼层级构建完成: {} 个骨骼, {} 个根骨骼", count, roots.len());

        Ok(Self { bones, name_to_index })
    }

    /// 通过名称查找骨骼
    pub fn find_bone_by_name(&self, name: &str) -> Option<usize> {
        self.name_to_index.get(name).copied()
    }

    /// 获取骨骼数量
    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// 获取骨骼
    pub fn bone(&self, index: usize) -> Option<&BoneNode> {
        self.bones.get(index)
    }

    /// 获取可变骨骼引用
    pub fn bone_mut(&mut self, index: usize) -> Option<&mut BoneNode> {
        self.bones.get_mut(index)
    }

    /// 按拓扑顺序遍历
    pub fn iter(&self) -> std::slice::Iter<'_, BoneNode> {
        self.bones.iter()
    }

    /// 重置所有骨骼的动画状态
    pub fn initialize(&mut self) {
        for bone in &mut self.bones {
            bone.initialize();
        }
    }

    /// 标记关键骨骼，骨骼不存在时返回 false
    pub fn mark_key_bone(&mut self, name: &str) -> bool {
        match self.find_bone_by_name(name) {
            Some(index) => {
                self.bones[index].is_key_bone = true;
                true
            }
            None => false,
        }
    }

    /// 父骨骼的全局变换（根骨骼为单位矩阵）
    pub fn parent_world_transform(&self, index: usize) -> Mat4 {
        self.bones[index]
            .parent()
            .map(|p| self.bones[p].world_transform())
            .unwrap_or(Mat4::IDENTITY)
    }

    /// 更新单个骨骼的全局变换
    ///
    /// 要求父骨骼在本帧已经更新过。
    pub fn update_transform(&mut self, index: usize) {
        let world = self.parent_world_transform(index) * self.bones[index].local_transform();
        self.bones[index].set_world_transform(world);
    }

    /// 按拓扑顺序更新所有骨骼
    pub fn update_all_transforms(&mut self) {
        for i in 0..self.bones.len() {
            self.update_transform(i);
        }
    }

    /// 获取全局变换
    pub fn world_transform(&self, index: usize) -> Mat4 {
        self.bones.get(index).map(|b| b.world_transform()).unwrap_or(Mat4::IDENTITY)
    }

    /// 获取蒙皮矩阵
    pub fn skinning_matrix(&self, index: usize) -> Mat4 {
        self.bones.get(index).map(|b| b.skinning_matrix()).unwrap_or(Mat4::IDENTITY)
    }
}

// 下标越界说明层级构建有误，直接 panic
impl Index<usize> for BoneHierarchy {
    type Output = BoneNode;

    fn index(&self, index: usize) -> &BoneNode {
        &self.bones[index]
    }
}

impl IndexMut<usize> for BoneHierarchy {
    fn index_mut(&mut self, index: usize) -> &mut BoneNode {
        &mut self.bones[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn chain() -> Vec<BoneDefinition> {
        vec![
            BoneDefinition::new("root", None, Vec3::ZERO),
            BoneDefinition::new("hip", Some("root"), Vec3::new(0.0, 1.0, 0.0)),
            BoneDefinition::new("chest", Some("hip"), Vec3::new(0.0, 1.5, 0.0)),
            BoneDefinition::new("arm", Some("chest"), Vec3::new(0.5, 1.5, 0.0)),
            BoneDefinition::new("leg", Some("hip"), Vec3::new(0.2, 0.5, 0.0)),
        ]
    }

    fn assert_topological(hierarchy: &BoneHierarchy) {
        for (i, bone) in hierarchy.iter().enumerate() {
            if let Some(p) = bone.parent() {
                assert!(p < i, "parent of {} must precede it", bone.name());
            }
        }
    }

    #[test]
    fn test_build_order_is_topological() {
        let hierarchy = BoneHierarchy::build(&chain()).unwrap();
        assert_eq!(hierarchy.len(), 5);
        assert_topological(&hierarchy);
    }

    #[test]
    fn test_build_sorts_shuffled_input() {
        let mut defs = chain();
        defs.reverse();
        defs.swap(1, 3);
        let hierarchy = BoneHierarchy::build(&defs).unwrap();
        assert_topological(&hierarchy);
        assert_eq!(hierarchy.bone(0).unwrap().name(), "root");

        let chest = hierarchy.find_bone_by_name("chest").unwrap();
        let hip = hierarchy.find_bone_by_name("hip").unwrap();
        assert_eq!(hierarchy.bone(chest).unwrap().parent(), Some(hip));
    }

    #[test]
    fn test_missing_parent_is_structural_error() {
        let defs = vec![
            BoneDefinition::new("root", None, Vec3::ZERO),
            BoneDefinition::new("arm", Some("shoulder"), Vec3::X),
        ];
        let err = BoneHierarchy::build(&defs).unwrap_err();
        assert!(matches!(err, RetargetError::Structural(_)));
    }

    #[test]
    fn test_duplicate_name_is_structural_error() {
        let defs = vec![
            BoneDefinition::new("root", None, Vec3::ZERO),
            BoneDefinition::new("root", None, Vec3::X),
        ];
        assert!(matches!(
            BoneHierarchy::build(&defs),
            Err(RetargetError::Structural(_))
        ));
    }

    #[test]
    fn test_cycle_is_structural_error() {
        let defs = vec![
            BoneDefinition::new("root", None, Vec3::ZERO),
            BoneDefinition::new("a", Some("b"), Vec3::X),
            BoneDefinition::new("b", Some("a"), Vec3::Y),
        ];
        assert!(matches!(
            BoneHierarchy::build(&defs),
            Err(RetargetError::Structural(_))
        ));
    }

    #[test]
    fn test_rest_pose_skin_is_identity() {
        let mut hierarchy = BoneHierarchy::build(&chain()).unwrap();
        hierarchy.initialize();
        hierarchy.update_all_transforms();
        for (i, bone) in hierarchy.iter().enumerate() {
            assert!(hierarchy.skinning_matrix(i).abs_diff_eq(Mat4::IDENTITY, 1e-6));
            assert!(bone.world_transform().abs_diff_eq(bone.bind_pose(), 1e-6));
        }
    }

    #[test]
    fn test_update_is_idempotent() {
        let mut hierarchy = BoneHierarchy::build(&chain()).unwrap();
        hierarchy.initialize();
        let hip = hierarchy.find_bone_by_name("hip").unwrap();
        let bone = hierarchy.bone_mut(hip).unwrap();
        bone.local_rotation = Quat::from_rotation_y(0.7);
        bone.local_position = Vec3::new(0.1, 0.0, 0.0);

        hierarchy.update_all_transforms();
        let world: Vec<Mat4> = (0..hierarchy.len()).map(|i| hierarchy.world_transform(i)).collect();
        let skin: Vec<Mat4> = (0..hierarchy.len()).map(|i| hierarchy.skinning_matrix(i)).collect();

        hierarchy.update_all_transforms();
        for i in 0..hierarchy.len() {
            assert_eq!(hierarchy.world_transform(i), world[i]);
            assert_eq!(hierarchy.skinning_matrix(i), skin[i]);
        }
    }

    #[test]
    fn test_parent_rotation_moves_child() {
        let mut hierarchy = BoneHierarchy::build(&chain()).unwrap();
        hierarchy.initialize();
        let chest = hierarchy.find_bone_by_name("chest").unwrap();
        let arm = hierarchy.find_bone_by_name("arm").unwrap();
        hierarchy.bone_mut(chest).unwrap().local_rotation =
            Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        hierarchy.update_all_transforms();

        // arm 相对 chest 的偏移 (0.5,0,0) 旋转到 (0,0.5,0)
        let arm_position = hierarchy.world_transform(arm).w_axis.truncate();
        assert!((arm_position - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
        // 刚性绑定在 chest 上的点随之旋转
        let p = hierarchy.skinning_matrix(chest).transform_point3(Vec3::new(0.5, 1.5, 0.0));
        assert!((p - Vec3::new(0.0, 2.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn test_name_index_matches_bones() {
        let mut defs = chain();
        defs.reverse();
        let hierarchy = BoneHierarchy::build(&defs).unwrap();
        for (i, bone) in hierarchy.iter().enumerate() {
            assert_eq!(hierarchy.find_bone_by_name(bone.name()), Some(i));
            assert_eq!(hierarchy[i].name(), bone.name());
        }
        for def in &defs {
            let index = hierarchy.find_bone_by_name(&def.name).unwrap();
            assert_eq!(hierarchy.bone(index).unwrap().name(), def.name);
        }
    }

    #[test]
    fn test_mark_key_bone() {
        let mut hierarchy = BoneHierarchy::build(&chain()).unwrap();
        assert!(hierarchy.mark_key_bone("arm"));
        assert!(!hierarchy.mark_key_bone("tail"));
        let arm = hierarchy.find_bone_by_name("arm").unwrap();
        assert!(hierarchy.bone(arm).unwrap().is_key_bone);
    }
}
