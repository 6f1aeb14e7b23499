//! 动作转换配置
//!
//! 所有参数扁平化，每次转换显式传入，不使用全局实例。

/// 转换配置（扁平化，不嵌套）
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ConversionConfig {
    // ========== 附加骨骼 ==========
    /// 是否向模型追加 IK 骨骼，默认 false
    /// 角色动作重定向不支持追加骨骼，开启时转换直接失败
    pub append_ik_bones: bool,
    /// 是否向模型追加眼睛骨骼，默认 false
    /// 同上
    pub append_eye_bones: bool,

    // ========== 帧率 ==========
    /// 是否把 60 FPS 的源动作抽帧为 30 FPS，默认 true
    /// 直接丢弃奇数采样，不做插值
    pub transform_60fps_to_30fps: bool,

    // ========== 缩放 ==========
    /// 是否把位移缩放到 VMD 尺寸，默认 true
    pub scale_to_vmd_size: bool,
    /// Unity 单位（米）到 MMD 单位的缩放系数，默认 12.5
    /// 仅在 scale_to_vmd_size 为 true 时生效
    pub unit_scale: f32,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            append_ik_bones: false,
            append_eye_bones: false,

            // MLTD 动作以 60 FPS 采样，MMD 标准为 30 FPS
            transform_60fps_to_30fps: true,

            // 1 MMD 单位约 8 cm
            scale_to_vmd_size: true,
            unit_scale: 12.5,
        }
    }
}

impl ConversionConfig {
    /// 是否请求了追加骨骼
    pub fn appends_bones(&self) -> bool {
        self.append_ik_bones || self.append_eye_bones
    }

    /// 源采样序号对应的输出帧号；被抽帧丢弃的采样返回 None
    pub fn output_frame_index(&self, sample_index: usize) -> Option<u32> {
        if self.transform_60fps_to_30fps {
            if sample_index % 2 == 1 {
                return None;
            }
            Some((sample_index / 2) as u32)
        } else {
            Some(sample_index as u32)
        }
    }

    /// 输出动作的帧率
    pub fn output_frame_rate(&self, source_frame_rate: f32) -> f32 {
        if self.transform_60fps_to_30fps {
            source_frame_rate / 2.0
        } else {
            source_frame_rate
        }
    }

    /// 位移缩放系数（未开启缩放时为 1）
    pub fn position_scale(&self) -> f32 {
        if self.scale_to_vmd_size {
            self.unit_scale
        } else {
            1.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decimated_frame_index() {
        let config = ConversionConfig::default();
        assert_eq!(config.output_frame_index(0), Some(0));
        assert_eq!(config.output_frame_index(1), None);
        assert_eq!(config.output_frame_index(4), Some(2));
        assert_eq!(config.output_frame_rate(60.0), 30.0);
    }

    #[test]
    fn test_full_rate_frame_index() {
        let config = ConversionConfig {
            transform_60fps_to_30fps: false,
            ..Default::default()
        };
        assert_eq!(config.output_frame_index(7), Some(7));
        assert_eq!(config.output_frame_rate(60.0), 60.0);
    }

    #[test]
    fn test_position_scale() {
        let mut config = ConversionConfig::default();
        assert_eq!(config.position_scale(), 12.5);
        config.scale_to_vmd_size = false;
        assert_eq!(config.position_scale(), 1.0);
    }
}
