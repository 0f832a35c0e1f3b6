//! DCT 感知哈希（pHash）
//!
//! 32x32 灰度网格 → 二维 DCT-II → 取左上 8x8 低频块（去掉直流分量，共 63 个系数）
//! → 与中位数比较得到比特 → 每 4 比特一个十六进制字符，右侧补 '0' 到 16 位。

use super::error::FinderError;
use super::frame::FrameView;
use once_cell::sync::Lazy;
use rustdct::{Dct2, DctPlanner, TransformType2And3};
use std::f64::consts::FRAC_1_SQRT_2;
use std::sync::Arc;

/// 下采样网格边长
pub const HASH_GRID: usize = 32;
/// 参与哈希的低频块边长
pub const HASH_BLOCK: usize = 8;
/// 哈希字符串长度（64 比特）
pub const HASH_HEX_LEN: usize = 16;

/// 绝对值小于它的系数视为 0，纯色帧才能得到稳定的全 0 哈希
const COEFF_EPSILON: f64 = 1e-6;

const HEX_DIGITS: &[u8; 16] = b"0123456789abcdef";

static DCT2_GRID: Lazy<Arc<dyn TransformType2And3<f64>>> =
    Lazy::new(|| DctPlanner::new().plan_dct2(HASH_GRID));

/// 计算整帧的感知哈希
pub fn perceptual_hash(frame: &FrameView<'_>) -> String {
    let mut grid = downsample_luma(frame);
    dct_2d(&mut grid);
    let coefficients = low_frequency_block(&grid);
    let bits = threshold_at_median(&coefficients);
    pack_hex(&bits)
}

/// 最近邻下采样到 32x32 灰度网格
///
/// 不做区域平均：速度优先，代价是对单像素噪声更敏感。
/// 小于 32 像素的边同样按最近邻放大。
pub fn downsample_luma(frame: &FrameView<'_>) -> Vec<f64> {
    let w = frame.width as usize;
    let h = frame.height as usize;
    let mut grid = Vec::with_capacity(HASH_GRID * HASH_GRID);

    for gy in 0..HASH_GRID {
        let sy = gy * h / HASH_GRID;
        for gx in 0..HASH_GRID {
            let sx = gx * w / HASH_GRID;
            grid.push(frame.luma_at(sx, sy));
        }
    }

    grid
}

/// 原地二维 DCT-II（先行后列），每轴不归一化，u/v = 0 处乘 1/√2
pub fn dct_2d(grid: &mut [f64]) {
    let n = HASH_GRID;
    let dct = &*DCT2_GRID;

    for row in grid.chunks_exact_mut(n) {
        dct.process_dct2(row);
    }

    let mut column = vec![0.0f64; n];
    for u in 0..n {
        for (y, value) in column.iter_mut().enumerate() {
            *value = grid[y * n + u];
        }
        dct.process_dct2(&mut column);
        for (v, &value) in column.iter().enumerate() {
            grid[v * n + u] = value;
        }
    }

    for v in 0..n {
        for u in 0..n {
            grid[v * n + u] *= scale_factor(u) * scale_factor(v);
        }
    }
}

#[inline]
fn scale_factor(k: usize) -> f64 {
    if k == 0 {
        FRAC_1_SQRT_2
    } else {
        1.0
    }
}

/// 按行（从上到下、从左到右）收集左上 8x8 块，跳过 (0,0)
fn low_frequency_block(grid: &[f64]) -> Vec<f64> {
    let mut coefficients = Vec::with_capacity(HASH_BLOCK * HASH_BLOCK - 1);
    for v in 0..HASH_BLOCK {
        for u in 0..HASH_BLOCK {
            if u == 0 && v == 0 {
                continue;
            }
            let c = grid[v * HASH_GRID + u];
            coefficients.push(if c.abs() < COEFF_EPSILON { 0.0 } else { c });
        }
    }
    coefficients
}

pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

/// 严格大于中位数记 1，等于中位数记 0
fn threshold_at_median(coefficients: &[f64]) -> Vec<bool> {
    let m = median(coefficients);
    coefficients.iter().map(|&c| c > m).collect()
}

/// 每 4 比特（高位在前）打包成一个十六进制字符
///
/// 63 比特时最后一组只有 3 比特，按 3 位二进制数取值；结果右侧补 '0' 到 16 位。
pub fn pack_hex(bits: &[bool]) -> String {
    let mut hash: String = bits
        .chunks(4)
        .map(|chunk| {
            let nibble = chunk
                .iter()
                .fold(0usize, |acc, &bit| (acc << 1) | bit as usize);
            HEX_DIGITS[nibble] as char
        })
        .collect();

    while hash.len() < HASH_HEX_LEN {
        hash.push('0');
    }
    hash
}

#[inline]
fn hex_nibble(c: char) -> Option<u32> {
    c.to_digit(16)
}

pub fn is_hex_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.chars().all(|c| hex_nibble(c).is_some())
}

/// 两个十六进制哈希的汉明距离，只比较公共长度部分
pub fn hamming_distance(a: &str, b: &str) -> Result<u32, FinderError> {
    a.chars().zip(b.chars()).try_fold(0u32, |acc, (ca, cb)| {
        match (hex_nibble(ca), hex_nibble(cb)) {
            (Some(na), Some(nb)) => Ok(acc + (na ^ nb).count_ones()),
            _ => Err(FinderError::InvalidSignature(format!(
                "non-hex character in hash pair ({:?}, {:?})",
                ca, cb
            ))),
        }
    })
}

/// 1 - 汉明距离 / 总比特数
pub fn hash_similarity(a: &str, b: &str) -> Result<f32, FinderError> {
    let total_bits = a.chars().count().min(b.chars().count()) * 4;
    if total_bits == 0 {
        return Err(FinderError::InvalidSignature("empty perceptual hash".into()));
    }
    let distance = hamming_distance(a, b)?;
    Ok(1.0 - distance as f32 / total_bits as f32)
}
