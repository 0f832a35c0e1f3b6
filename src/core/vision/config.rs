//! 可调参数
//!
//! 这些数值都是经验值，不是推导出来的常量。换机型/换摄像头后需要重新标定，
//! 所以全部暴露为可覆盖的配置（App 可以下发 JSON）。

use serde::{Deserialize, Serialize};

/// 特征提取参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SignatureConfig {
    /// Sobel 梯度幅值阈值，超过才算关键点
    pub gradient_threshold: f64,
    /// 采样步长（像素）
    pub keypoint_stride: usize,
    /// 边缘排除宽度（像素）
    pub keypoint_border: usize,
    /// 最多保留的关键点数
    pub max_keypoints: usize,
}

impl Default for SignatureConfig {
    fn default() -> Self {
        Self {
            gradient_threshold: 50.0,
            keypoint_stride: 4,
            keypoint_border: 3,
            max_keypoints: 20,
        }
    }
}

/// 距离分档阈值（严格大于）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BucketThresholds {
    pub very_close: f32,
    pub close: f32,
    pub medium: f32,
}

impl Default for BucketThresholds {
    fn default() -> Self {
        Self {
            very_close: 0.85,
            close: 0.70,
            medium: 0.55,
        }
    }
}

/// 相似度打分参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ScoringConfig {
    /// 归一化坐标下关键点匹配的最大欧氏距离
    pub keypoint_match_distance: f32,
    pub hash_weight: f32,
    pub keypoint_weight: f32,
    pub buckets: BucketThresholds,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            keypoint_match_distance: 0.05,
            hash_weight: 0.6,
            keypoint_weight: 0.4,
            buckets: BucketThresholds::default(),
        }
    }
}

/// 帧泵参数
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// 两次处理之间的最小间隔（毫秒）
    pub min_frame_interval_ms: u64,
    /// 连续多少次失败/空结果后提示用户重新对准
    pub reframe_after_misses: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_frame_interval_ms: 120,
            reframe_after_misses: 8,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FinderConfig {
    pub signature: SignatureConfig,
    pub scoring: ScoringConfig,
    pub session: SessionConfig,
}

impl FinderConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
