//! MLTD 骨骼路径到 MMD 骨骼名的映射

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// 默认的 MLTD → MMD 骨骼名映射（只读）
static MLTD_BONE_NAMES: Lazy<HashMap<String, String>> = Lazy::new(|| {
    [
        ("POSITION", "全ての親"),
        ("BASE", "センター"),
        ("KOSHI", "下半身"),
        ("MUNE1", "上半身"),
        ("MUNE2", "上半身2"),
        ("KUBI", "首"),
        ("ATAMA", "頭"),
        // 左半身
        ("KATA_L", "左肩"),
        ("UDE_L", "左腕"),
        ("HIJI_L", "左ひじ"),
        ("TE_L", "左手首"),
        ("OYA1_L", "左親指０"),
        ("OYA2_L", "左親指１"),
        ("OYA3_L", "左親指２"),
        ("HITO1_L", "左人指１"),
        ("HITO2_L", "左人指２"),
        ("HITO3_L", "左人指３"),
        ("NAKA1_L", "左中指１"),
        ("NAKA2_L", "左中指２"),
        ("NAKA3_L", "左中指３"),
        ("KUSU1_L", "左薬指１"),
        ("KUSU2_L", "左薬指２"),
        ("KUSU3_L", "左薬指３"),
        ("KO1_L", "左小指１"),
        ("KO2_L", "左小指２"),
        ("KO3_L", "左小指３"),
        ("MOMO_L", "左足"),
        ("HIZA_L", "左ひざ"),
        ("ASHI_L", "左足首"),
        ("TSUMASAKI_L", "左つま先"),
        // 右半身
        ("KATA_R", "右肩"),
        ("UDE_R", "右腕"),
        ("HIJI_R", "右ひじ"),
        ("TE_R", "右手首"),
        ("OYA1_R", "右親指０"),
        ("OYA2_R", "右親指１"),
        ("OYA3_R", "右親指２"),
        ("HITO1_R", "右人指１"),
        ("HITO2_R", "右人指２"),
        ("HITO3_R", "右人指３"),
        ("NAKA1_R", "右中指１"),
        ("NAKA2_R", "右中指２"),
        ("NAKA3_R", "右中指３"),
        ("KUSU1_R", "右薬指１"),
        ("KUSU2_R", "右薬指２"),
        ("KUSU3_R", "右薬指３"),
        ("KO1_R", "右小指１"),
        ("KO2_R", "右小指２"),
        ("KO3_R", "右小指３"),
        ("MOMO_R", "右足"),
        ("HIZA_R", "右ひざ"),
        ("ASHI_R", "右足首"),
        ("TSUMASAKI_R", "右つま先"),
    ]
    .into_iter()
    .map(|(mltd, mmd)| (mltd.to_string(), mmd.to_string()))
    .collect()
});

/// 骨骼名映射表
///
/// 作为值传给 [`BoneLookup`]，不同角色/模型可以使用各自的表。
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoneNameTable {
    /// 从路径中移除的结构性节点（如根缩放节点）
    pub stripped_segments: Vec<String>,
    /// 短骨骼名 → 目标骨骼名；表中没有的名称保持不变
    pub names: HashMap<String, String>,
    /// 源骨骼路径 → 额外接收同一旋转的源骨骼（重新挂接）
    pub attachments: HashMap<String, String>,
    /// 总是标记为关键骨骼的目标骨骼名
    pub always_key_bones: Vec<String>,
}

impl BoneNameTable {
    /// MLTD 角色到 MMD 模型的默认映射
    pub fn mltd() -> Self {
        let mut attachments = HashMap::new();
        // 两套骨骼中头部的挂接位置不同
        attachments.insert(
            "MODEL_00/BASE/MUNE1/MUNE2/KUBI/ATAMA".to_string(),
            "KUBI/ATAMA".to_string(),
        );

        Self {
            stripped_segments: vec!["BODY_SCALE".to_string()],
            names: MLTD_BONE_NAMES.clone(),
            attachments,
            // 颈部骨骼及其日文名，名称不一致时也保证输出
            always_key_bones: vec!["KUBI".to_string(), "頭".to_string()],
        }
    }

    /// 不做任何改名的空表
    pub fn identity() -> Self {
        Self {
            stripped_segments: Vec::new(),
            names: HashMap::new(),
            attachments: HashMap::new(),
            always_key_bones: Vec::new(),
        }
    }
}

impl Default for BoneNameTable {
    fn default() -> Self {
        Self::mltd()
    }
}

/// 骨骼名解析器
#[derive(Clone, Debug, Default)]
pub struct BoneLookup {
    table: BoneNameTable,
}

impl BoneLookup {
    pub fn new(table: BoneNameTable) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &BoneNameTable {
        &self.table
    }

    /// 去掉结构性节点后的路径，即源层级中的骨骼名
    pub fn bone_name_from_path(&self, path: &str) -> String {
        if self.table.stripped_segments.is_empty() {
            return path.to_string();
        }
        path.split('/')
            .filter(|segment| !self.table.stripped_segments.iter().any(|s| s == segment))
            .collect::<Vec<_>>()
            .join("/")
    }

    /// 由动作路径得到目标骨骼名
    pub fn target_name_from_path(&self, path: &str) -> String {
        self.target_name_from_bone_name(&self.bone_name_from_path(path))
    }

    /// 由源层级骨骼名得到目标骨骼名
    pub fn target_name_from_bone_name(&self, bone_name: &str) -> String {
        let short_name = bone_name.rsplit('/').next().unwrap_or(bone_name);
        match self.table.names.get(short_name) {
            Some(name) => name.clone(),
            None => short_name.to_string(),
        }
    }

    /// 重新挂接的源骨骼（参数为去掉结构性节点后的路径）
    pub fn attachment_for(&self, bone_name: &str) -> Option<&str> {
        self.table.attachments.get(bone_name).map(String::as_str)
    }

    /// 总是标记为关键骨骼的名称
    pub fn always_key_bones(&self) -> impl Iterator<Item = &str> {
        self.table.always_key_bones.iter().map(String::as_str)
    }
}
