//! 相似度打分与距离分档
//!
//! 纯函数：输入实时特征和已学习的特征列表，输出 `ProximityEstimate`，不保留任何状态。

use super::config::{BucketThresholds, ScoringConfig};
use super::error::FinderError;
use super::keypoints::Keypoint;
use super::phash::hash_similarity;
use super::signature::VisualSignature;
use serde::{Deserialize, Serialize};

/// 粗粒度距离分档
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceBucket {
    VeryClose,
    Close,
    Medium,
    Far,
}

impl DistanceBucket {
    /// 严格大于比较：恰好 0.85 归为 Close
    pub fn from_similarity(similarity: f32, thresholds: &BucketThresholds) -> Self {
        if similarity > thresholds.very_close {
            DistanceBucket::VeryClose
        } else if similarity > thresholds.close {
            DistanceBucket::Close
        } else if similarity > thresholds.medium {
            DistanceBucket::Medium
        } else {
            DistanceBucket::Far
        }
    }
}

/// 匹配到的关键点包围盒（归一化坐标）
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Region {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Region {
    fn around(points: &[Keypoint]) -> Option<Self> {
        let first = points.first()?;
        let init = Region {
            min_x: first.x,
            min_y: first.y,
            max_x: first.x,
            max_y: first.y,
        };
        Some(points.iter().skip(1).fold(init, |r, p| Region {
            min_x: r.min_x.min(p.x),
            min_y: r.min_y.min(p.y),
            max_x: r.max_x.max(p.x),
            max_y: r.max_y.max(p.y),
        }))
    }

    pub fn center(&self) -> (f32, f32) {
        ((self.min_x + self.max_x) / 2.0, (self.min_y + self.max_y) / 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityEstimate {
    /// [0,1]，1.0 表示完全相同
    pub similarity: f32,
    pub distance_bucket: DistanceBucket,
    /// 目前没有独立的置信度模型，等于 similarity
    pub confidence: f32,
    /// 与最佳匹配项对上的实时关键点的包围盒
    pub region: Option<Region>,
    /// 最佳匹配项在输入列表中的下标
    pub best_index: Option<usize>,
}

impl ProximityEstimate {
    pub fn no_match() -> Self {
        Self {
            similarity: 0.0,
            distance_bucket: DistanceBucket::Far,
            confidence: 0.0,
            region: None,
            best_index: None,
        }
    }
}

/// 单个已学习特征的打分结果
#[derive(Debug, Clone, PartialEq)]
pub struct MatchScore {
    pub hash_similarity: f32,
    pub keypoint_similarity: f32,
    pub similarity: f32,
    pub matched: Vec<Keypoint>,
}

/// 实时关键点中，最近邻距离小于阈值的那些
fn matched_keypoints(live: &[Keypoint], learned: &[Keypoint], max_distance: f32) -> Vec<Keypoint> {
    if learned.is_empty() {
        return Vec::new();
    }
    live.iter()
        .filter(|p| {
            learned
                .iter()
                .map(|q| p.distance_to(q))
                .fold(f32::INFINITY, f32::min)
                < max_distance
        })
        .copied()
        .collect()
}

/// 两个特征的相似度：0.6 * 哈希相似度 + 0.4 * 关键点相似度（权重可配）
pub fn compare_signatures(
    live: &VisualSignature,
    learned: &VisualSignature,
    config: &ScoringConfig,
) -> Result<MatchScore, FinderError> {
    if live.perceptual_hash.len() != learned.perceptual_hash.len() {
        return Err(FinderError::InvalidSignature(format!(
            "hash length mismatch: {} vs {}",
            live.perceptual_hash.len(),
            learned.perceptual_hash.len()
        )));
    }

    let hash_similarity = hash_similarity(&live.perceptual_hash, &learned.perceptual_hash)?;

    let matched = matched_keypoints(
        &live.keypoints,
        &learned.keypoints,
        config.keypoint_match_distance,
    );
    let keypoint_similarity = if live.keypoints.is_empty() || learned.keypoints.is_empty() {
        0.0
    } else {
        matched.len() as f32 / live.keypoints.len() as f32
    };

    let similarity = (config.hash_weight * hash_similarity
        + config.keypoint_weight * keypoint_similarity)
        .clamp(0.0, 1.0);

    Ok(MatchScore {
        hash_similarity,
        keypoint_similarity,
        similarity,
        matched,
    })
}

/// 与所有已学习特征比较，取最大相似度并分档
///
/// 列表为空时返回相似度 0 / Far。任何一个特征畸形都直接报错。
pub fn estimate_proximity(
    live: &VisualSignature,
    learned: &[VisualSignature],
    config: &ScoringConfig,
) -> Result<ProximityEstimate, FinderError> {
    live.validate()?;

    let mut best: Option<(usize, MatchScore)> = None;
    for (index, candidate) in learned.iter().enumerate() {
        candidate.validate()?;
        let score = compare_signatures(live, candidate, config)?;
        let better = match &best {
            Some((_, current)) => score.similarity > current.similarity,
            None => true,
        };
        if better {
            best = Some((index, score));
        }
    }

    let Some((index, score)) = best else {
        return Ok(ProximityEstimate::no_match());
    };

    Ok(ProximityEstimate {
        similarity: score.similarity,
        distance_bucket: DistanceBucket::from_similarity(score.similarity, &config.buckets),
        confidence: score.similarity,
        region: Region::around(&score.matched),
        best_index: Some(index),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::vision::signature::extract_signature;
    use crate::core::vision::signature::tests::{create_textured_pixels, paint_block};

    fn signature(hash: &str, keypoints: Vec<(f32, f32)>) -> VisualSignature {
        VisualSignature {
            perceptual_hash: hash.into(),
            keypoints: keypoints
                .into_iter()
                .map(|(x, y)| Keypoint { x, y, intensity: 100.0 })
                .collect(),
            width: 64,
            height: 64,
            captured_at_ms: 0,
        }
    }

    #[test]
    fn test_bucket_boundaries() {
        let t = BucketThresholds::default();
        assert_eq!(DistanceBucket::from_similarity(0.86, &t), DistanceBucket::VeryClose);
        assert_eq!(DistanceBucket::from_similarity(0.85, &t), DistanceBucket::Close);
        assert_eq!(DistanceBucket::from_similarity(0.70, &t), DistanceBucket::Medium);
        assert_eq!(DistanceBucket::from_similarity(0.55, &t), DistanceBucket::Far);
        assert_eq!(DistanceBucket::from_similarity(0.0, &t), DistanceBucket::Far);
        assert_eq!(DistanceBucket::from_similarity(1.0, &t), DistanceBucket::VeryClose);
    }

    #[test]
    fn test_empty_store_is_far() {
        let live = signature("0123456789abcdef", vec![(0.5, 0.5)]);
        let estimate = estimate_proximity(&live, &[], &ScoringConfig::default()).unwrap();

        assert_eq!(estimate.similarity, 0.0);
        assert_eq!(estimate.distance_bucket, DistanceBucket::Far);
        assert_eq!(estimate.confidence, 0.0);
        assert!(estimate.best_index.is_none());
    }

    #[test]
    fn test_self_similarity() {
        let pixels = create_textured_pixels(80, 60, 11);
        let sig = extract_signature(&pixels, 80, 60).unwrap();
        assert!(!sig.keypoints.is_empty());

        let estimate =
            estimate_proximity(&sig, std::slice::from_ref(&sig), &ScoringConfig::default())
                .unwrap();
        assert_eq!(estimate.similarity, 1.0);
        assert_eq!(estimate.confidence, 1.0);
        assert_eq!(estimate.distance_bucket, DistanceBucket::VeryClose);
        assert_eq!(estimate.best_index, Some(0));
        assert!(estimate.region.is_some());
    }

    #[test]
    fn test_distinct_frames_score_lower() {
        let (w, h) = (128, 128);
        let original = create_textured_pixels(w, h, 21);
        let mut covered = original.clone();
        paint_block(&mut covered, w, (0, 0, 96, 96), [200, 40, 40, 255]);

        let live = extract_signature(&original, w, h).unwrap();
        let learned = extract_signature(&covered, w, h).unwrap();

        let estimate =
            estimate_proximity(&live, &[learned], &ScoringConfig::default()).unwrap();
        assert!(estimate.similarity < 0.9, "similarity {}", estimate.similarity);
    }

    #[test]
    fn test_hash_only_path_when_keypoints_missing() {
        let live = signature("ffff000000000000", vec![]);
        let learned = signature("ffff000000000000", vec![(0.1, 0.1)]);

        let score = compare_signatures(&live, &learned, &ScoringConfig::default()).unwrap();
        assert_eq!(score.hash_similarity, 1.0);
        assert_eq!(score.keypoint_similarity, 0.0);
        assert!((score.similarity - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_keypoint_match_threshold() {
        let learned = signature("0000000000000000", vec![(0.5, 0.5)]);
        let near = signature("0000000000000000", vec![(0.53, 0.5), (0.9, 0.9)]);

        let score = compare_signatures(&near, &learned, &ScoringConfig::default()).unwrap();
        assert_eq!(score.matched.len(), 1);
        assert_eq!(score.keypoint_similarity, 0.5);
        assert!((score.similarity - 0.8).abs() < 1e-6);

        let far = signature("0000000000000000", vec![(0.56, 0.5)]);
        let score = compare_signatures(&far, &learned, &ScoringConfig::default()).unwrap();
        assert_eq!(score.keypoint_similarity, 0.0);
    }

    #[test]
    fn test_best_of_many() {
        let live = signature("ff00000000000000", vec![(0.2, 0.3), (0.6, 0.7)]);
        let learned = vec![
            signature("0000000000000000", vec![(0.9, 0.9)]),
            signature("ff00000000000000", vec![(0.2, 0.3), (0.6, 0.7)]),
            signature("f000000000000000", vec![(0.2, 0.3)]),
        ];

        let estimate =
            estimate_proximity(&live, &learned, &ScoringConfig::default()).unwrap();
        assert_eq!(estimate.best_index, Some(1));
        assert_eq!(estimate.similarity, 1.0);
        let region = estimate.region.unwrap();
        assert_eq!((region.min_x, region.min_y), (0.2, 0.3));
        assert_eq!((region.max_x, region.max_y), (0.6, 0.7));
        let (cx, cy) = region.center();
        assert!((cx - 0.4).abs() < 1e-6 && (cy - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_no_matched_keypoints_has_no_region() {
        let live = signature("0000000000000000", vec![(0.1, 0.1)]);
        let learned = signature("0000000000000000", vec![(0.9, 0.9)]);
        let estimate =
            estimate_proximity(&live, &[learned], &ScoringConfig::default()).unwrap();
        assert!(estimate.region.is_none());
        assert_eq!(estimate.best_index, Some(0));
    }

    #[test]
    fn test_malformed_signatures_fail_fast() {
        let live = signature("0000000000000000", vec![(0.1, 0.1)]);

        let short = signature("00000000", vec![(0.1, 0.1)]);
        assert!(matches!(
            estimate_proximity(&live, &[short], &ScoringConfig::default()),
            Err(FinderError::InvalidSignature(_))
        ));

        let empty_hash = signature("", vec![]);
        assert!(matches!(
            estimate_proximity(&empty_hash, &[], &ScoringConfig::default()),
            Err(FinderError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_custom_weights() {
        let config = ScoringConfig {
            hash_weight: 1.0,
            keypoint_weight: 0.0,
            ..Default::default()
        };
        let live = signature("ff00000000000000", vec![]);
        let learned = signature("ff00000000000000", vec![]);
        let estimate = estimate_proximity(&live, &[learned], &config).unwrap();
        assert_eq!(estimate.similarity, 1.0);
    }
}
