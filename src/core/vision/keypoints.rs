use super::config::SignatureConfig;
use super::frame::FrameView;
use serde::{Deserialize, Serialize};

/// 关键点，坐标按帧宽高归一化到 [0,1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Sobel 梯度幅值
    pub intensity: f32,
}

impl Keypoint {
    #[inline]
    pub fn distance_to(&self, other: &Keypoint) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// 粗粒度角点检测：按步长采样 Sobel 幅值，超过阈值的按强度降序取前 N 个
///
/// 没有亚像素细化，也没有步长之外的非极大值抑制，换取每帧恒定的开销。
/// 只读取采样点的 3x3 邻域，亮度按需计算，不生成整帧灰度图。
pub fn extract_keypoints(frame: &FrameView<'_>, config: &SignatureConfig) -> Vec<Keypoint> {
    let w = frame.width as usize;
    let h = frame.height as usize;
    let border = config.keypoint_border.max(1);
    let stride = config.keypoint_stride.max(1);

    // 帧太小，内部没有可采样的位置
    if w <= border * 2 || h <= border * 2 {
        return Vec::new();
    }

    let mut points = Vec::new();

    for y in (border..h - border).step_by(stride) {
        for x in (border..w - border).step_by(stride) {
            let magnitude = sobel_magnitude(frame, x, y);
            if magnitude > config.gradient_threshold {
                points.push(Keypoint {
                    x: x as f32 / w as f32,
                    y: y as f32 / h as f32,
                    intensity: magnitude as f32,
                });
            }
        }
    }

    // 稳定排序，强度相同时保持扫描顺序
    points.sort_by(|a, b| b.intensity.total_cmp(&a.intensity));
    points.truncate(config.max_keypoints);
    points
}

/// 3x3 Sobel 梯度幅值，调用方保证 (x, y) 不在最外圈
fn sobel_magnitude(frame: &FrameView<'_>, x: usize, y: usize) -> f64 {
    let p = |dx: isize, dy: isize| {
        let sx = (x as isize + dx) as usize;
        let sy = (y as isize + dy) as usize;
        frame.luma_at(sx, sy)
    };

    // Gx: -1 0 1
    //     -2 0 2
    //     -1 0 1
    let gx = -p(-1, -1) + p(1, -1) - 2.0 * p(-1, 0) + 2.0 * p(1, 0) - p(-1, 1) + p(1, 1);

    // Gy: -1 -2 -1
    //      0  0  0
    //      1  2  1
    let gy = -p(-1, -1) - 2.0 * p(0, -1) - p(1, -1) + p(-1, 1) + 2.0 * p(0, 1) + p(1, 1);

    (gx * gx + gy * gy).sqrt()
}
