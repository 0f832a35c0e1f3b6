use crate::core::vision::scorer::ProximityEstimate;
use crate::finder::state_machine::GuidanceHint;

/// 反馈端（提示音 / 震动 / TTS），由 UI 层实现
///
/// 分档到具体音效的映射属于展示层，这里只负责把估计结果交出去。
pub trait FeedbackSink {
    fn on_estimate(&mut self, estimate: &ProximityEstimate);

    fn on_hint(&mut self, hint: GuidanceHint);
}

/// 记录收到的所有回调（测试替身）
#[cfg(test)]
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub estimates: Vec<ProximityEstimate>,
    pub hints: Vec<GuidanceHint>,
}

#[cfg(test)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_estimate(&self) -> Option<&ProximityEstimate> {
        self.estimates.last()
    }
}

#[cfg(test)]
impl FeedbackSink for RecordingSink {
    fn on_estimate(&mut self, estimate: &ProximityEstimate) {
        self.estimates.push(estimate.clone());
    }

    fn on_hint(&mut self, hint: GuidanceHint) {
        self.hints.push(hint);
    }
}
