//! # 衍射图构建
//!
//! 对一个 Cluster 的测量序列：
//! 1. 在所选 γ 扇区（半开区间，最后一个扇区含上端点）内，把有效像素强度
//!    （乘以平场校正因子）按 2θ 分箱累加
//! 2. 每箱取像素平均并按成员平均（或乘以成员数求和），丢弃空箱
//! 3. 按归一化模式除以合并后的监视器计数 / 曝光时间 / 其变化量，乘以强度标度
//! 4. 配置了基线区间时，在区间并集内拟合多项式并从曲线中扣除
//! 5. 对每个峰区间，在扣除基线后的曲线上统计原始峰并（非 `Raw` 时）拟合峰形
//!
//! `Dfgram::average` 把多个 Cluster 累加到同一 2θ 网格上，得到平均衍射图。
//!
//! `Dfgram` 不可变；设置改变后由会话整体丢弃重建。
//!
//! ## 依赖关系
//! - 被 `session.rs`, `calc/peak_info.rs`, `export/` 使用
//! - 使用 `calc/angle_map.rs`, `data/sequence.rs`, `fit/`

use crate::calc::AngleMap;
use crate::data::Sequence;
use crate::error::{DfredError, Result};
use crate::fit::{fit_peak, fit_polynomial, Fitted, RawOutcome};
use crate::models::{Curve, Range};
use crate::pars::{BaselineSettings, GammaSector, NormMode, Params, PeakSettings, PeakShape};

/// 构建衍射图所需的只读输入
#[derive(Debug, Clone, Copy)]
pub struct ReductionInputs<'a> {
    pub angle_map: &'a AngleMap,
    /// 按原始像素顺序的平场校正因子，NaN 表示排除
    pub corr_factors: Option<&'a [f64]>,
    pub params: &'a Params,
    pub baseline: &'a BaselineSettings,
    pub peaks: &'a [PeakSettings],
}

/// 单个峰区间的结果
#[derive(Debug, Clone, PartialEq)]
pub struct PeakOutcome {
    pub range: Range,
    pub shape: PeakShape,
    /// 窗口内数据的原始统计
    pub raw: RawOutcome,
    /// 峰形拟合结果；`Raw` 峰形为 None
    pub fitted: Option<Fitted>,
}

impl PeakOutcome {
    /// 峰形拟合成功
    pub fn is_fitted(&self) -> bool {
        self.fitted.as_ref().is_some_and(|f| f.success())
    }
}

/// 一个 Cluster 的衍射图
#[derive(Debug, Clone, PartialEq)]
pub struct Dfgram {
    curve: Curve,
    gamma_range: Range,
    /// None 表示未配置基线
    baseline: Option<Fitted>,
    curve_minus_bg: Curve,
    peaks: Vec<PeakOutcome>,
}

impl Dfgram {
    /// 从测量序列构建
    pub fn compute(seq: &Sequence, inputs: &ReductionInputs, slice: usize) -> Result<Self> {
        let sector = inputs
            .params
            .gamma
            .sector(&inputs.angle_map.gamma_range(), slice);
        let curve = bin_intensities(seq, inputs, &sector)?;
        Ok(Self::from_curve(curve, sector.range, inputs.baseline, inputs.peaks))
    }

    /// 多个 Cluster 合并到同一 2θ 网格上的平均衍射图
    ///
    /// 每个 Cluster 用自己的角度映射与归一化系数累加；γ 扇区取自全部
    /// 角度映射 γ 范围的并集，2θ 网格覆盖全部 Cluster 在该扇区内的范围。
    /// 设置（参数、基线、峰）取第一个输入。
    pub fn average(parts: &[(Sequence, ReductionInputs)], slice: usize) -> Result<Self> {
        let Some((_, first)) = parts.first() else {
            return Err(DfredError::NoData("no clusters to average".to_string()));
        };
        let params = first.params;

        let full_gamma = parts
            .iter()
            .map(|(_, inp)| inp.angle_map.gamma_range())
            .fold(Range::empty(), |acc, r| acc.union(&r));
        let sector = params.gamma.sector(&full_gamma, slice);
        let tth_range = parts
            .iter()
            .map(|(_, inp)| inp.angle_map.tth_range_in(&sector))
            .fold(Range::empty(), |acc, r| acc.union(&r));

        let curve = if tth_range.is_empty() {
            log::warn!("no valid pixels in gamma range {}", sector.range);
            Curve::new()
        } else {
            let n_bins = bin_count(params, &tth_range, first.angle_map.pixel_angle());
            let mut binner = Binner::new(tth_range, n_bins);
            for (seq, inputs) in parts {
                let scale = sequence_scale(seq, inputs.params)?;
                binner.add(seq, inputs, &sector, scale);
            }
            binner.into_curve()
        };
        Ok(Self::from_curve(curve, sector.range, first.baseline, first.peaks))
    }

    /// 在已分箱的曲线上拟合基线与峰
    pub fn from_curve(
        curve: Curve,
        gamma_range: Range,
        baseline: &BaselineSettings,
        peaks: &[PeakSettings],
    ) -> Self {
        let (baseline, curve_minus_bg) = if baseline.is_configured() {
            let fitted = fit_polynomial(
                &curve.intersect_ranges(&baseline.ranges),
                baseline.polynom_degree,
            );
            let minus = if fitted.success() {
                curve.subtract(|x| fitted.y(x))
            } else {
                log::warn!("baseline fit failed, background not subtracted");
                curve.clone()
            };
            (Some(fitted), minus)
        } else {
            (None, curve.clone())
        };

        let peaks = peaks
            .iter()
            .map(|p| peak_outcome(&curve_minus_bg, p))
            .collect();

        Self {
            curve,
            gamma_range,
            baseline,
            curve_minus_bg,
            peaks,
        }
    }

    /// 原始（归一化后的）曲线
    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    pub fn gamma_range(&self) -> Range {
        self.gamma_range
    }

    /// 基线拟合；None 表示未配置
    pub fn baseline(&self) -> Option<&Fitted> {
        self.baseline.as_ref()
    }

    /// x 处的背景值，无成功的基线时为 0
    pub fn background_at(&self, x: f64) -> f64 {
        match &self.baseline {
            Some(f) if f.success() => f.y(x),
            _ => 0.0,
        }
    }

    /// 扣除基线后的曲线
    pub fn curve_minus_bg(&self) -> &Curve {
        &self.curve_minus_bg
    }

    pub fn peaks(&self) -> &[PeakOutcome] {
        &self.peaks
    }

    pub fn peak(&self, index: usize) -> Option<&PeakOutcome> {
        self.peaks.get(index)
    }

    pub fn range_tth(&self) -> Range {
        self.curve.range_x()
    }

    pub fn range_inten(&self) -> Range {
        self.curve.range_y()
    }
}

/// 单个峰：原始统计加可选的峰形拟合
fn peak_outcome(curve_minus_bg: &Curve, settings: &PeakSettings) -> PeakOutcome {
    let window = curve_minus_bg.intersect(&settings.range);
    let raw = RawOutcome::from_curve(&window);

    let fitted = settings.shape.fit_function().map(|function| {
        let guess = RawOutcome {
            center: settings.guess.center.unwrap_or(raw.center),
            fwhm: settings.guess.fwhm.unwrap_or(raw.fwhm),
            height: settings.guess.height.unwrap_or(raw.height),
            ..raw
        };
        fit_peak(function, &window, &guess)
    });

    PeakOutcome {
        range: settings.range,
        shape: settings.shape,
        raw,
        fitted,
    }
}

/// 归一化分母；平均模式下按成员数换算
fn norm_denominator(seq: &Sequence, params: &Params) -> Result<f64> {
    let mode = params.norm_mode;
    if mode == NormMode::None {
        return Ok(1.0);
    }
    let mut value = seq.norm_value(mode);
    if params.intensity.average_members {
        value /= seq.count() as f64;
    }
    if !value.is_finite() || value <= 0.0 {
        return Err(DfredError::NormalizationError(format!(
            "normalization by {} needs a positive value, got {}",
            mode, value
        )));
    }
    Ok(value)
}

/// 序列中每个像素强度的总系数：强度标度 × 成员数（求和模式）÷ 归一化分母
fn sequence_scale(seq: &Sequence, params: &Params) -> Result<f64> {
    let denominator = norm_denominator(seq, params)?;
    let members = if params.intensity.average_members {
        1.0
    } else {
        seq.count() as f64
    };
    Ok(params.intensity.scale * members / denominator)
}

/// 分箱数：显式给定，或按束心像素角宽自动确定
fn bin_count(params: &Params, tth_range: &Range, pixel_angle: f64) -> usize {
    match params.binning.tth_bins {
        Some(n) => n.max(1),
        None if pixel_angle > 0.0 => ((tth_range.width() / pixel_angle).ceil() as usize).max(1),
        None => 1,
    }
}

/// 固定 2θ 网格上的像素强度累加器
///
/// 每箱结果为落入该箱的全部像素（已乘系数）的平均；空箱丢弃。
struct Binner {
    tth_range: Range,
    bin_width: f64,
    sums: Vec<f64>,
    counts: Vec<usize>,
}

impl Binner {
    fn new(tth_range: Range, n_bins: usize) -> Self {
        Self {
            tth_range,
            bin_width: tth_range.width() / n_bins as f64,
            sums: vec![0.0; n_bins],
            counts: vec![0; n_bins],
        }
    }

    fn bin_of(&self, tth: f64) -> Option<usize> {
        if !self.tth_range.contains(tth) {
            return None;
        }
        let last = self.sums.len() - 1;
        if self.bin_width > 0.0 {
            Some((((tth - self.tth_range.min) / self.bin_width) as usize).min(last))
        } else {
            Some(0)
        }
    }

    /// 累加序列各成员在扇区内的有效像素
    fn add(&mut self, seq: &Sequence, inputs: &ReductionInputs, sector: &GammaSector, scale: f64) {
        let map = inputs.angle_map;
        assert_eq!(
            map.size(),
            seq.image_size(),
            "angle map built for a different image size"
        );
        for member in seq.members() {
            let intens = member.image().intens();
            for (i, angles) in map.angles().iter().enumerate() {
                let Some(a) = angles else { continue };
                if !sector.contains(a.gamma) {
                    continue;
                }
                let factor = match inputs.corr_factors {
                    Some(f) if f[i].is_finite() => f[i],
                    Some(_) => continue,
                    None => 1.0,
                };
                let Some(bin) = self.bin_of(a.tth) else { continue };
                self.sums[bin] += intens[i] * factor * scale;
                self.counts[bin] += 1;
            }
        }
    }

    fn into_curve(self) -> Curve {
        let mut curve = Curve::new();
        for (b, (sum, count)) in self.sums.iter().zip(&self.counts).enumerate() {
            if *count == 0 {
                continue;
            }
            let x = self.tth_range.min + (b as f64 + 0.5) * self.bin_width;
            curve.push(x, sum / *count as f64);
        }
        curve
    }
}

fn bin_intensities(
    seq: &Sequence,
    inputs: &ReductionInputs,
    sector: &GammaSector,
) -> Result<Curve> {
    let scale = sequence_scale(seq, inputs.params)?;
    let map = inputs.angle_map;
    let tth_range = map.tth_range_in(sector);
    if tth_range.is_empty() {
        log::warn!("no valid pixels in gamma range {}", sector.range);
        return Ok(Curve::new());
    }

    let mut binner = Binner::new(
        tth_range,
        bin_count(inputs.params, &tth_range, map.pixel_angle()),
    );
    binner.add(seq, inputs, sector, scale);
    Ok(binner.into_curve())
}
