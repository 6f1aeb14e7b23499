//! Unity 坐标系到 MMD 骨骼空间的转换
//!
//! Unity 使用左手坐标系，源动作中的位移和旋转需要沿 X 轴镜像后
//! 才能在右手坐标系下参与层级计算。

use glam::{EulerRot, Quat, Vec3};

/// 由 Unity 欧拉角（角度制）构造旋转
///
/// 与 `UnityEngine.Quaternion.Euler` 一致：先绕 Z，再绕 X，最后绕 Y（外旋），
/// 即 `q = qy * qx * qz`。
pub fn unity_euler_deg(x: f32, y: f32, z: f32) -> Quat {
    Quat::from_euler(
        EulerRot::YXZ,
        y.to_radians(),
        x.to_radians(),
        z.to_radians(),
    )
}

/// 位移手性转换（X 轴反转）
pub fn fix_unity_position(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

/// 旋转手性转换（X 轴镜像）
///
/// 镜像后绕 X 轴的旋转保持不变，绕 Y/Z 轴的旋转方向取反。
pub fn fix_unity_rotation(q: Quat) -> Quat {
    Quat::from_xyzw(q.x, -q.y, -q.z, q.w)
}
