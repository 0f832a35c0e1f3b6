use super::config::SignatureConfig;
use super::error::FinderError;
use super::frame::{Frame, FrameView};
use super::keypoints::{extract_keypoints, Keypoint};
use super::phash::{is_hex_hash, perceptual_hash};
use log::debug;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// 一帧画面的视觉特征（提取后不可变）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualSignature {
    /// 16 位十六进制 pHash
    pub perceptual_hash: String,
    /// 按强度降序
    pub keypoints: Vec<Keypoint>,
    pub width: u32,
    pub height: u32,
    pub captured_at_ms: u64,
}

impl VisualSignature {
    /// 打分前的快速校验，畸形特征直接报错，不产出无意义的分数
    pub fn validate(&self) -> Result<(), FinderError> {
        if !is_hex_hash(&self.perceptual_hash) {
            return Err(FinderError::InvalidSignature(format!(
                "perceptual hash must be non-empty hex, got {:?}",
                self.perceptual_hash
            )));
        }
        if self.width == 0 || self.height == 0 {
            return Err(FinderError::InvalidSignature(format!(
                "source dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        for (i, kp) in self.keypoints.iter().enumerate() {
            let in_unit = |v: f32| v.is_finite() && (0.0..=1.0).contains(&v);
            if !in_unit(kp.x) || !in_unit(kp.y) {
                return Err(FinderError::InvalidSignature(format!(
                    "keypoint {} outside [0,1]: ({}, {})",
                    i, kp.x, kp.y
                )));
            }
            if !kp.intensity.is_finite() || kp.intensity < 0.0 {
                return Err(FinderError::InvalidSignature(format!(
                    "keypoint {} has invalid intensity {}",
                    i, kp.intensity
                )));
            }
        }
        Ok(())
    }
}

/// 从裸 RGBA 缓冲区提取特征，使用默认参数，时间戳取当前墙钟时间
///
/// 直接借用调用方的缓冲区，不复制整帧。
pub fn extract_signature(
    pixels: &[u8],
    width: u32,
    height: u32,
) -> Result<VisualSignature, FinderError> {
    let view = FrameView::new(pixels, width, height);
    extract_view_signature(&view, &SignatureConfig::default(), now_ms(), 0)
}

/// 从帧提取特征，时间戳取帧自带的时间戳
pub fn extract_frame_signature(
    frame: &Frame,
    config: &SignatureConfig,
) -> Result<VisualSignature, FinderError> {
    extract_view_signature(&frame.view(), config, frame.timestamp_ms(), frame.frame_number)
}

fn extract_view_signature(
    view: &FrameView<'_>,
    config: &SignatureConfig,
    captured_at_ms: u64,
    frame_number: u64,
) -> Result<VisualSignature, FinderError> {
    view.validate()?;

    let perceptual_hash = perceptual_hash(view);
    let keypoints = extract_keypoints(view, config);

    debug!(
        "🔍 Signature #{}: hash={}, keypoints={}",
        frame_number,
        perceptual_hash,
        keypoints.len()
    );

    Ok(VisualSignature {
        perceptual_hash,
        keypoints,
        width: view.width,
        height: view.height,
        captured_at_ms,
    })
}

pub(crate) fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::vision::phash::HASH_HEX_LEN;

    /// 确定性的伪随机纹理（LCG），每个像素都有强梯度
    pub(crate) fn create_textured_pixels(width: u32, height: u32, seed: u32) -> Vec<u8> {
        let mut state = seed;
        let mut data = Vec::with_capacity((width * height * 4) as usize);
        for _ in 0..width * height {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let v = (state >> 24) as u8;
            data.extend_from_slice(&[v, v.wrapping_mul(3), v ^ 0x5a, 255]);
        }
        data
    }

    /// 在纹理上覆盖一块纯色矩形
    pub(crate) fn paint_block(
        data: &mut [u8],
        width: u32,
        (x0, y0, x1, y1): (u32, u32, u32, u32),
        rgba: [u8; 4],
    ) {
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = ((y * width + x) * 4) as usize;
                data[idx..idx + 4].copy_from_slice(&rgba);
            }
        }
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let pixels = create_textured_pixels(96, 64, 7);
        let a = extract_signature(&pixels, 96, 64).unwrap();
        let b = extract_signature(&pixels, 96, 64).unwrap();

        assert_eq!(a.perceptual_hash, b.perceptual_hash);
        assert_eq!(a.keypoints, b.keypoints);
        assert_eq!((a.width, a.height), (96, 64));
    }

    #[test]
    fn test_hash_length_and_keypoint_bound() {
        for (w, h, seed) in [(32, 32, 1), (64, 48, 2), (200, 120, 3)] {
            let pixels = create_textured_pixels(w, h, seed);
            let sig = extract_signature(&pixels, w, h).unwrap();

            assert_eq!(sig.perceptual_hash.len(), HASH_HEX_LEN);
            assert!(sig.keypoints.len() <= 20);
            for pair in sig.keypoints.windows(2) {
                assert!(pair[0].intensity >= pair[1].intensity);
            }
            assert!(sig.validate().is_ok());
        }
    }

    #[test]
    fn test_uniform_frame_scenario() {
        let pixels = vec![90u8; 64 * 64 * 4];
        let sig = extract_signature(&pixels, 64, 64).unwrap();

        assert!(sig.keypoints.is_empty());
        // 所有交流系数都等于中位数 0，按规则全部记 0
        assert_eq!(sig.perceptual_hash, "0000000000000000");
    }

    #[test]
    fn test_invalid_frames() {
        assert!(matches!(
            extract_signature(&[], 0, 0),
            Err(FinderError::InvalidFrame(_))
        ));
        assert!(matches!(
            extract_signature(&[0u8; 12], 2, 2),
            Err(FinderError::InvalidFrame(_))
        ));
    }

    #[test]
    fn test_borrowed_and_owned_paths_agree() {
        let pixels = create_textured_pixels(120, 90, 21);
        let borrowed = extract_signature(&pixels, 120, 90).unwrap();

        let frame = Frame::new(120, 90, pixels, 0, 0);
        let owned = extract_frame_signature(&frame, &SignatureConfig::default()).unwrap();

        assert_eq!(borrowed.perceptual_hash, owned.perceptual_hash);
        assert_eq!(borrowed.keypoints, owned.keypoints);
    }

    #[test]
    fn test_frame_timestamp_is_kept() {
        let frame = Frame::new(40, 40, create_textured_pixels(40, 40, 9), 1234, 5);
        let sig = extract_frame_signature(&frame, &SignatureConfig::default()).unwrap();
        assert_eq!(sig.captured_at_ms, 1234);
    }

    #[test]
    fn test_validate_rejects_malformed() {
        let pixels = create_textured_pixels(64, 64, 4);
        let good = extract_signature(&pixels, 64, 64).unwrap();

        let mut bad = good.clone();
        bad.perceptual_hash.clear();
        assert!(matches!(bad.validate(), Err(FinderError::InvalidSignature(_))));

        let mut bad = good.clone();
        bad.perceptual_hash = "not-hex-at-all!!".into();
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.width = 0;
        assert!(bad.validate().is_err());

        let mut bad = good.clone();
        bad.keypoints.push(Keypoint { x: 1.5, y: 0.2, intensity: 60.0 });
        assert!(bad.validate().is_err());

        let mut bad = good;
        bad.keypoints.push(Keypoint { x: 0.5, y: 0.2, intensity: f32::NAN });
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_serde_field_names() {
        let sig = VisualSignature {
            perceptual_hash: "00ff00ff00ff00ff".into(),
            keypoints: vec![Keypoint { x: 0.25, y: 0.5, intensity: 80.0 }],
            width: 10,
            height: 20,
            captured_at_ms: 42,
        };
        let json = serde_json::to_string(&sig).unwrap();
        assert!(json.contains("\"perceptualHash\""));
        assert!(json.contains("\"capturedAtMs\":42"));

        let back: VisualSignature = serde_json::from_str(&json).unwrap();
        assert_eq!(back, sig);
    }
}
