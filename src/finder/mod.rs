//! 寻物引导 - 把视觉引擎接到相机帧流上
//!
//! 1. 限速 - 最小帧间隔，同一时刻只处理一帧
//! 2. 打分 - 提取实时特征并与已学习物品比较
//! 3. 状态机 - 连续失败/无特征时提示用户重新对准
//! 4. 反馈 - 结果交给 UI 层的提示音/震动/TTS

pub mod feedback;
pub mod session;
pub mod state_machine;

pub use feedback::FeedbackSink;
pub use session::{FinderSession, FrameOutcome, SessionStats};
pub use state_machine::{FrameSignal, GuidanceAction, GuidanceHint, GuidanceState, GuidanceStateMachine};
