use crate::core::vision::config::SessionConfig;
use crate::core::vision::scorer::DistanceBucket;

/// 给用户的引导提示
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidanceHint {
    /// 连续多帧提取失败或画面无特征（镜头被挡、对着白墙等）
    ReframeCamera,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GuidanceState {
    Searching { misses: u32 },
    Tracking { bucket: DistanceBucket },
    Reframe { misses: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GuidanceAction {
    /// 把本帧估计交给反馈端
    Feedback,
    /// 本帧没有可用结果，保持静默
    Silent,
    Hint(GuidanceHint),
}

/// 一帧的处理结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameSignal {
    /// 打分成功，且实时画面有关键点
    Scored(DistanceBucket),
    /// 提取/打分失败，或实时画面没有任何关键点
    Miss,
}

impl GuidanceState {
    pub fn new() -> Self {
        GuidanceState::Searching { misses: 0 }
    }

    pub fn transition(&self, signal: FrameSignal, config: &SessionConfig) -> (GuidanceState, GuidanceAction) {
        match (self, signal) {
            (_, FrameSignal::Scored(bucket)) => {
                (GuidanceState::Tracking { bucket }, GuidanceAction::Feedback)
            }

            (GuidanceState::Searching { misses }, FrameSignal::Miss) => {
                let misses = misses + 1;
                if misses >= config.reframe_after_misses {
                    (
                        GuidanceState::Reframe { misses },
                        GuidanceAction::Hint(GuidanceHint::ReframeCamera),
                    )
                } else {
                    (GuidanceState::Searching { misses }, GuidanceAction::Silent)
                }
            }

            // 跟踪中丢一帧，从头计数
            (GuidanceState::Tracking { .. }, FrameSignal::Miss) => {
                GuidanceState::Searching { misses: 0 }.transition(signal, config)
            }

            // 已经提示过，不重复提示
            (GuidanceState::Reframe { misses }, FrameSignal::Miss) => (
                GuidanceState::Reframe {
                    misses: misses.saturating_add(1),
                },
                GuidanceAction::Silent,
            ),
        }
    }
}

impl Default for GuidanceState {
    fn default() -> Self {
        Self::new()
    }
}

pub struct GuidanceStateMachine {
    state: GuidanceState,
    config: SessionConfig,
    frame_counter: u64,
}

impl GuidanceStateMachine {
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            state: GuidanceState::new(),
            config,
            frame_counter: 0,
        }
    }

    pub fn process_frame(&mut self, signal: FrameSignal) -> GuidanceAction {
        self.frame_counter += 1;

        let (new_state, action) = self.state.transition(signal, &self.config);
        self.state = new_state;

        action
    }

    pub fn current_state(&self) -> &GuidanceState {
        &self.state
    }

    pub fn needs_reframe(&self) -> bool {
        matches!(self.state, GuidanceState::Reframe { .. })
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_counter
    }

    pub fn reset(&mut self) {
        self.state = GuidanceState::new();
        self.frame_counter = 0;
    }
}

impl Default for GuidanceStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
