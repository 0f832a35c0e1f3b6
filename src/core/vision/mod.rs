//! 端上视觉相似度引擎（寻物功能）
//!
//! 1. 特征提取 - pHash（32x32 DCT）+ 稀疏 Sobel 关键点
//! 2. 特征存储 - 用户"教"过的物品
//! 3. 相似度打分 - 哈希汉明距离 + 关键点最近邻匹配，映射为距离分档

pub mod config;
pub mod error;
pub mod frame;
pub mod keypoints;
pub mod phash;
pub mod scorer;
pub mod signature;
pub mod store;

pub use config::{BucketThresholds, FinderConfig, ScoringConfig, SessionConfig, SignatureConfig};
pub use error::FinderError;
pub use frame::{Frame, FrameView, YFrameData};
pub use keypoints::Keypoint;
pub use phash::hamming_distance;
pub use scorer::{estimate_proximity, DistanceBucket, ProximityEstimate, Region};
pub use signature::{extract_frame_signature, extract_signature, VisualSignature};
pub use store::{LearnedItem, SignatureStore};
