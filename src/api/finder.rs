//! 寻物器 - 教物品 + 实时距离估计

use crate::core::vision::{
    DistanceBucket, FinderConfig, FinderError, Frame, LearnedItem, ProximityEstimate, Region,
    SignatureStore, VisualSignature, YFrameData,
};
use crate::core::vision::signature::{extract_frame_signature, now_ms};
use crate::finder::{FeedbackSink, FinderSession, FrameOutcome, GuidanceHint, SessionStats};
use flutter_rust_bridge::frb;
use log::info;
use rayon::prelude::*;
use std::sync::{Mutex, MutexGuard};

/// 已学习物品（给 Dart 侧展示用）
#[derive(Debug, Clone)]
pub struct LearnedItemInfo {
    pub id: u64,
    pub name: Option<String>,
    pub perceptual_hash: String,
    pub keypoint_count: u32,
    pub created_at_ms: u64,
}

impl From<&LearnedItem> for LearnedItemInfo {
    fn from(item: &LearnedItem) -> Self {
        Self {
            id: item.id,
            name: item.name.clone(),
            perceptual_hash: item.signature.perceptual_hash.clone(),
            keypoint_count: item.signature.keypoints.len() as u32,
            created_at_ms: item.created_at_ms,
        }
    }
}

/// 单帧距离估计
#[derive(Debug, Clone)]
pub struct ProximityInfo {
    pub similarity: f32,
    pub confidence: f32,
    pub bucket: DistanceBucket,
    /// 最佳匹配物品
    pub item_id: Option<u64>,
    pub region: Option<Region>,
    /// 本帧触发的引导提示（每段连续失败只出现一次）
    pub hint: Option<GuidanceHint>,
}

/// 桥接层的反馈端：估计结果已经作为返回值交给 Dart，这里只收集提示
#[derive(Default)]
struct HintSink {
    hint: Option<GuidanceHint>,
}

impl FeedbackSink for HintSink {
    fn on_estimate(&mut self, _estimate: &ProximityEstimate) {}

    fn on_hint(&mut self, hint: GuidanceHint) {
        self.hint = Some(hint);
    }
}

/// 寻物器
///
/// ```dart
/// final finder = ItemFinder.create();
/// await finder.teachFrame(rgba: bytes, width: w, height: h, name: "钥匙");
/// final info = await finder.processYFrame(frame: yFrame);
/// if (info?.hint != null) showReframeHint();
/// ```
///
/// 两把锁的获取顺序固定为先 session 后 store。
#[frb(opaque)]
pub struct ItemFinder {
    store: Mutex<SignatureStore>,
    session: Mutex<FinderSession>,
}

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>, FinderError> {
    mutex
        .lock()
        .map_err(|e| FinderError::LockPoisoned(format!("{} lock poisoned: {}", what, e)))
}

impl ItemFinder {
    /// 使用默认参数创建
    #[frb(sync)]
    pub fn create() -> Self {
        Self::with_config(FinderConfig::default())
    }

    /// 使用 JSON 下发的标定参数创建，缺省字段取默认值
    #[frb(sync)]
    pub fn create_with_config(config_json: String) -> Result<Self, FinderError> {
        let config = FinderConfig::from_json(&config_json)?;
        Ok(Self::with_config(config))
    }

    fn with_config(config: FinderConfig) -> Self {
        crate::init_logging();
        info!("🔎 ItemFinder: created");
        Self {
            store: Mutex::new(SignatureStore::new()),
            session: Mutex::new(FinderSession::with_config(config)),
        }
    }

    /// 用一帧相机画面教一个物品
    #[frb]
    pub fn teach_frame(
        &self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        name: Option<String>,
    ) -> Result<LearnedItemInfo, FinderError> {
        let frame = Frame::from_rgba(width, height, rgba, now_ms(), 0)?;
        let session = lock(&self.session, "session")?;
        let mut store = lock(&self.store, "store")?;
        let item = session.teach(&frame, &mut store, name)?;
        Ok(LearnedItemInfo::from(&item))
    }

    /// 用相册里的一张照片（JPEG/PNG/BMP）教一个物品
    #[frb]
    pub fn teach_photo(
        &self,
        photo: Vec<u8>,
        name: Option<String>,
    ) -> Result<LearnedItemInfo, FinderError> {
        let frame = Frame::from_encoded(&photo, now_ms(), 0)?;
        let session = lock(&self.session, "session")?;
        let mut store = lock(&self.store, "store")?;
        let item = session.teach(&frame, &mut store, name)?;
        Ok(LearnedItemInfo::from(&item))
    }

    /// 同一物品的多张照片（不同角度），并行解码提取；任何一张失败则整批不入库
    #[frb]
    pub fn teach_photos(
        &self,
        photos: Vec<Vec<u8>>,
        name: Option<String>,
    ) -> Result<Vec<LearnedItemInfo>, FinderError> {
        let config = lock(&self.session, "session")?.config().signature.clone();
        let now = now_ms();

        let signatures: Vec<VisualSignature> = photos
            .par_iter()
            .enumerate()
            .map(|(i, photo)| {
                let frame = Frame::from_encoded(photo, now, i as u64)?;
                extract_frame_signature(&frame, &config)
            })
            .collect::<Result<_, _>>()?;

        let mut store = lock(&self.store, "store")?;
        signatures
            .into_iter()
            .map(|signature| {
                let item = store.teach(signature, name.clone())?;
                Ok(LearnedItemInfo::from(&item))
            })
            .collect()
    }

    /// 删除物品，返回是否真的删除了
    #[frb(sync)]
    pub fn forget(&self, id: u64) -> Result<bool, FinderError> {
        Ok(lock(&self.store, "store")?.remove(id))
    }

    #[frb(sync)]
    pub fn items(&self) -> Result<Vec<LearnedItemInfo>, FinderError> {
        Ok(lock(&self.store, "store")?
            .list()
            .iter()
            .map(LearnedItemInfo::from)
            .collect())
    }

    #[frb(sync)]
    pub fn clear(&self) -> Result<(), FinderError> {
        lock(&self.store, "store")?.clear();
        info!("🧹 ItemFinder: store cleared");
        Ok(())
    }

    /// 用相机亮度平面教一个物品
    #[frb]
    pub fn teach_y_frame(
        &self,
        frame: YFrameData,
        name: Option<String>,
    ) -> Result<LearnedItemInfo, FinderError> {
        let frame = frame.to_frame()?;
        let session = lock(&self.session, "session")?;
        let mut store = lock(&self.store, "store")?;
        let item = session.teach(&frame, &mut store, name)?;
        Ok(LearnedItemInfo::from(&item))
    }

    /// 处理一帧实时画面（RGBA）；被限速丢弃时返回 None
    #[frb]
    pub fn process_frame(
        &self,
        rgba: Vec<u8>,
        width: u32,
        height: u32,
        timestamp_ms: u64,
    ) -> Result<Option<ProximityInfo>, FinderError> {
        self.process(Frame::new(width, height, rgba, timestamp_ms, 0))
    }

    /// 处理一帧相机亮度平面；被限速丢弃时返回 None
    #[frb]
    pub fn process_y_frame(
        &self,
        frame: YFrameData,
    ) -> Result<Option<ProximityInfo>, FinderError> {
        self.process(frame.to_frame()?)
    }

    fn process(&self, frame: Frame) -> Result<Option<ProximityInfo>, FinderError> {
        let mut session = lock(&self.session, "session")?;
        let store = lock(&self.store, "store")?;
        let mut sink = HintSink::default();

        match session.process_frame(&frame, &store, &mut sink)? {
            FrameOutcome::Throttled => Ok(None),
            FrameOutcome::Scored(estimate) => Ok(Some(ProximityInfo {
                similarity: estimate.similarity,
                confidence: estimate.confidence,
                bucket: estimate.distance_bucket,
                item_id: estimate
                    .best_index
                    .and_then(|i| store.list().get(i))
                    .map(|item| item.id),
                region: estimate.region,
                hint: sink.hint,
            })),
        }
    }

    /// 连续失败/无特征，UI 应提示用户重新对准镜头
    #[frb(sync)]
    pub fn needs_reframe(&self) -> Result<bool, FinderError> {
        Ok(lock(&self.session, "session")?.needs_reframe())
    }

    #[frb(sync)]
    pub fn stats(&self) -> Result<SessionStats, FinderError> {
        Ok(lock(&self.session, "session")?.stats())
    }

    /// 导出全部物品（JSON），由 App 持久化
    #[frb(sync)]
    pub fn export_items(&self) -> Result<String, FinderError> {
        lock(&self.store, "store")?.to_json()
    }

    /// 导入之前导出的物品，替换当前内容
    #[frb(sync)]
    pub fn import_items(&self, json: String) -> Result<u32, FinderError> {
        let restored = SignatureStore::from_json(&json)?;
        let count = restored.len() as u32;
        *lock(&self.store, "store")? = restored;
        info!("📥 ItemFinder: imported {} items", count);
        Ok(count)
    }

    /// 重置会话状态（限速、引导状态、统计），保留已学习物品
    #[frb(sync)]
    pub fn reset_session(&self) -> Result<(), FinderError> {
        lock(&self.session, "session")?.reset();
        Ok(())
    }
}

impl Drop for ItemFinder {
    fn drop(&mut self) {
        info!("🗑️ ItemFinder: released");
    }
}
