//! 寻物会话（帧泵）
//!
//! 调用方按相机节奏喂帧；会话负责限速、提取特征、打分、驱动引导状态机并回调反馈端。
//! 同一时刻只处理一帧，不需要取消或超时机制。

use crate::core::vision::config::FinderConfig;
use crate::core::vision::error::FinderError;
use crate::core::vision::frame::Frame;
use crate::core::vision::scorer::ProximityEstimate;
use crate::core::vision::signature::extract_frame_signature;
use crate::core::vision::store::{LearnedItem, SignatureStore};
use crate::finder::feedback::FeedbackSink;
use crate::finder::state_machine::{FrameSignal, GuidanceAction, GuidanceStateMachine};
use log::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutcome {
    /// 距上一帧不足最小间隔，直接丢弃
    Throttled,
    Scored(ProximityEstimate),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub processed_frames: u64,
    pub throttled_frames: u64,
    pub failed_frames: u64,
}

pub struct FinderSession {
    config: FinderConfig,
    guidance: GuidanceStateMachine,
    last_processed_ms: Option<u64>,
    stats: SessionStats,
}

impl FinderSession {
    pub fn new() -> Self {
        Self::with_config(FinderConfig::default())
    }

    pub fn with_config(config: FinderConfig) -> Self {
        Self {
            guidance: GuidanceStateMachine::with_config(config.session.clone()),
            config,
            last_processed_ms: None,
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// 用当前帧"教"一个物品
    pub fn teach(
        &self,
        frame: &Frame,
        store: &mut SignatureStore,
        name: Option<String>,
    ) -> Result<LearnedItem, FinderError> {
        let signature = extract_frame_signature(frame, &self.config.signature)?;
        store.teach(signature, name)
    }

    /// 处理一帧
    ///
    /// 畸形帧先于限速检查被拒绝，不会被当成普通的限速丢弃。只有提取成功的帧才占用
    /// 限速间隔。提取或打分失败时先计入连续失败次数（可能触发重新对准提示），再把错误
    /// 原样返回，由调用方决定是否跳过这一帧继续。
    pub fn process_frame(
        &mut self,
        frame: &Frame,
        store: &SignatureStore,
        sink: &mut dyn FeedbackSink,
    ) -> Result<FrameOutcome, FinderError> {
        if let Err(e) = frame.validate() {
            return Err(self.fail(frame, e, sink));
        }

        let ts = frame.timestamp_ms();
        if let Some(last) = self.last_processed_ms {
            // 时间戳回退（相机重启）时不限速
            if ts >= last && ts - last < self.config.session.min_frame_interval_ms {
                self.stats.throttled_frames += 1;
                return Ok(FrameOutcome::Throttled);
            }
        }
        self.stats.processed_frames += 1;

        let live = match extract_frame_signature(frame, &self.config.signature) {
            Ok(live) => live,
            Err(e) => return Err(self.fail(frame, e, sink)),
        };
        self.last_processed_ms = Some(ts);

        let estimate = match store.estimate(&live, &self.config.scoring) {
            Ok(estimate) => estimate,
            Err(e) => return Err(self.fail(frame, e, sink)),
        };

        let signal = if live.keypoints.is_empty() {
            FrameSignal::Miss
        } else {
            FrameSignal::Scored(estimate.distance_bucket)
        };

        debug!(
            "📍 Frame #{}: similarity={:.3}, bucket={:?}, keypoints={}",
            frame.frame_number,
            estimate.similarity,
            estimate.distance_bucket,
            live.keypoints.len()
        );

        self.dispatch(signal, Some(&estimate), sink);
        Ok(FrameOutcome::Scored(estimate))
    }

    fn fail(
        &mut self,
        frame: &Frame,
        error: FinderError,
        sink: &mut dyn FeedbackSink,
    ) -> FinderError {
        self.stats.failed_frames += 1;
        warn!("⚠️ Frame #{} failed: {}", frame.frame_number, error);
        self.dispatch(FrameSignal::Miss, None, sink);
        error
    }

    fn dispatch(
        &mut self,
        signal: FrameSignal,
        estimate: Option<&ProximityEstimate>,
        sink: &mut dyn FeedbackSink,
    ) {
        match self.guidance.process_frame(signal) {
            GuidanceAction::Feedback => {
                if let Some(estimate) = estimate {
                    sink.on_estimate(estimate);
                }
            }
            GuidanceAction::Hint(hint) => {
                debug!("💡 Guidance hint: {:?}", hint);
                sink.on_hint(hint);
            }
            GuidanceAction::Silent => {}
        }
    }

    pub fn needs_reframe(&self) -> bool {
        self.guidance.needs_reframe()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.clone()
    }

    pub fn reset(&mut self) {
        self.guidance.reset();
        self.last_processed_ms = None;
        self.stats = SessionStats::default();
    }
}

impl Default for FinderSession {
    fn default() -> Self {
        Self::new()
    }
}
