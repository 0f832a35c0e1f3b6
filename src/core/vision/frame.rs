use super::error::FinderError;
use std::time::Duration;

/// BT.601 亮度权重
pub const LUMA_R: f64 = 0.299;
pub const LUMA_G: f64 = 0.587;
pub const LUMA_B: f64 = 0.114;

/// 单个 RGBA 像素的亮度
#[inline]
pub fn luminance(r: u8, g: u8, b: u8) -> f64 {
    LUMA_R * r as f64 + LUMA_G * g as f64 + LUMA_B * b as f64
}

/// 相机帧（RGBA，行优先，stride = width * 4）
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>, // RGBA 格式
    pub timestamp: Duration,
    pub frame_number: u64,
}

impl Frame {
    pub fn new(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Self {
        Self {
            width,
            height,
            data,
            timestamp: Duration::from_millis(timestamp_ms),
            frame_number,
        }
    }

    /// 带校验的构造，尺寸或缓冲区长度不对时返回 `InvalidFrame`
    pub fn from_rgba(
        width: u32,
        height: u32,
        data: Vec<u8>,
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, FinderError> {
        let frame = Self::new(width, height, data, timestamp_ms, frame_number);
        frame.validate()?;
        Ok(frame)
    }

    /// 从 JPEG/PNG/BMP 编码数据解码（用户从相册选择照片来"教"物品）
    pub fn from_encoded(
        bytes: &[u8],
        timestamp_ms: u64,
        frame_number: u64,
    ) -> Result<Self, FinderError> {
        let rgba = image::load_from_memory(bytes)?.to_rgba8();
        let (width, height) = rgba.dimensions();
        Self::from_rgba(width, height, rgba.into_raw(), timestamp_ms, frame_number)
    }

    pub fn validate(&self) -> Result<(), FinderError> {
        self.view().validate()
    }

    /// 借用像素数据的只读视图，特征提取都走这里
    pub fn view(&self) -> FrameView<'_> {
        FrameView::new(&self.data, self.width, self.height)
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn timestamp_ms(&self) -> u64 {
        self.timestamp.as_millis() as u64
    }
}

/// 借用的 RGBA 缓冲区，提取时不复制整帧
#[derive(Debug, Clone, Copy)]
pub struct FrameView<'a> {
    pub width: u32,
    pub height: u32,
    pub data: &'a [u8],
}

impl<'a> FrameView<'a> {
    pub fn new(data: &'a [u8], width: u32, height: u32) -> Self {
        Self { width, height, data }
    }

    pub fn validate(&self) -> Result<(), FinderError> {
        if self.width == 0 || self.height == 0 {
            return Err(FinderError::InvalidFrame(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        let expected = self.width as usize * self.height as usize * 4;
        if self.data.len() != expected {
            return Err(FinderError::InvalidFrame(format!(
                "expected {} bytes for {}x{} RGBA, got {}",
                expected,
                self.width,
                self.height,
                self.data.len()
            )));
        }
        Ok(())
    }

    /// 单个像素的亮度，调用方保证坐标在范围内
    #[inline]
    pub fn luma_at(&self, x: usize, y: usize) -> f64 {
        let idx = (y * self.width as usize + x) * 4;
        luminance(self.data[idx], self.data[idx + 1], self.data[idx + 2])
    }
}

/// 相机插件传来的亮度平面（Android YUV_420_888 / iOS 420f 的 plane[0]）
///
/// 特征只用到亮度，色度平面不过桥。`row_stride` 即平面的 bytesPerRow，可能大于宽度。
#[derive(Debug, Clone)]
pub struct YFrameData {
    pub width: u32,
    pub height: u32,
    pub row_stride: u32,
    pub y_plane: Vec<u8>,
    pub timestamp_ms: u64,
    pub frame_number: u64,
}

impl YFrameData {
    /// 展开成灰度 RGBA 帧；BT.601 权重之和为 1，亮度保持不变
    pub fn to_frame(&self) -> Result<Frame, FinderError> {
        let w = self.width as usize;
        let h = self.height as usize;
        let stride = self.row_stride as usize;

        if w == 0 || h == 0 {
            return Err(FinderError::InvalidFrame(format!(
                "dimensions must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if stride < w {
            return Err(FinderError::InvalidFrame(format!(
                "row stride {} smaller than width {}",
                stride, w
            )));
        }
        // 最后一行可以没有行尾填充
        let needed = stride * (h - 1) + w;
        if self.y_plane.len() < needed {
            return Err(FinderError::InvalidFrame(format!(
                "Y plane has {} bytes, {}x{} with stride {} needs {}",
                self.y_plane.len(),
                w,
                h,
                stride,
                needed
            )));
        }

        let mut rgba = Vec::with_capacity(w * h * 4);
        for row in self.y_plane.chunks(stride).take(h) {
            for &y in &row[..w] {
                rgba.extend_from_slice(&[y, y, y, 255]);
            }
        }

        Ok(Frame::new(
            self.width,
            self.height,
            rgba,
            self.timestamp_ms,
            self.frame_number,
        ))
    }
}
