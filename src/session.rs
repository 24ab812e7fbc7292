//! # 分析会话
//!
//! 会话是唯一的聚合根：持有数据集、平场校正集、全部设置以及各缓存
//! （角度映射、校正因子、每个 Cluster 的衍射图、平均衍射图、极图）。
//! 外部只通过会话访问核心。
//!
//! 缓存不追踪依赖；每个 setter 在返回前使受影响的缓存失效，
//! 下次访问时重新计算：
//!
//! | 设置                          | 角度映射 | 校正因子 | 衍射图 | 平均衍射图 | 极图 |
//! |-------------------------------|:--------:|:--------:|:------:|:----------:|:----:|
//! | 文件增删                      | ✓        | ✓        | ✓      | ✓          | ✓    |
//! | 几何                          | ✓        |          | ✓      | ✓          | ✓    |
//! | 图像变换 / 裁剪               | ✓        | ✓        | ✓      | ✓          | ✓    |
//! | 校正文件                      |          | ✓        | ✓      | ✓          | ✓    |
//! | 分组因子、归一化、γ、分箱、强度 |          |          | ✓      | ✓          | ✓    |
//! | 基线、峰                      |          |          | ✓      | ✓          | ✓    |
//! | Cluster 选择、丢弃不完整 Cluster |          |          |        | ✓          | ✓    |
//! | 极图插值                      |          |          |        |            | ✓    |
//!
//! 没有参与分析的 Cluster 时，批量计算与范围查询返回 `NoData`。
//!
//! ## 依赖关系
//! - 被 `commands/`, `tests/pipeline.rs` 使用
//! - 使用 `cache/`, `calc/`, `data/`, `pars/`
//! - 使用 `rayon` 并行构建衍射图

use crate::cache::{KeyedCache, VectorCache};
use crate::calc::{pole_figure, AngleMap, Dfgram, PeakInfo, PolePoint, ReductionInputs};
use crate::data::{Cluster, Corrset, Datafile, Dataset};
use crate::error::{DfredError, Result};
use crate::models::{Range, Size2d};
use crate::pars::{
    Geometry, GammaSelection, ImageCut, ImageTransform, IntensityParams, InterpolParams, NormMode,
    PeakGuess, PeakSettings, PeakShape, SessionSettings,
};

use rayon::prelude::*;
use std::sync::Arc;

/// 各缓存的重新计算次数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub angle_map_builds: usize,
    pub corr_factor_builds: usize,
    pub dfgram_builds: usize,
    pub avg_dfgram_builds: usize,
    pub pole_figure_builds: usize,
}

/// 角度映射与校正因子缓存
#[derive(Debug, Default)]
struct SharedCaches {
    /// 键为 Cluster 的平均探测器臂角
    angle_maps: KeyedCache<Arc<AngleMap>, f64>,
    corr_factors: KeyedCache<Arc<Vec<f64>>, (ImageCut, ImageTransform)>,
    stats: CacheStats,
}

impl SharedCaches {
    fn angle_map(&mut self, settings: &SessionSettings, size: Size2d, tth: f64) -> Arc<AngleMap> {
        let stats = &mut self.stats;
        let map = self.angle_maps.get_or_compute(tth, |&tth| {
            stats.angle_map_builds += 1;
            log::debug!("building angle map for 2theta = {:.3} ({})", tth, size);
            Arc::new(AngleMap::new(
                &settings.geometry,
                &settings.transform,
                &settings.cut,
                size,
                tth,
            ))
        });
        Arc::clone(map)
    }

    fn corr_factors(
        &mut self,
        settings: &SessionSettings,
        corrset: Option<&Corrset>,
    ) -> Result<Option<Arc<Vec<f64>>>> {
        let Some(corrset) = corrset.filter(|_| settings.corr_enabled) else {
            return Ok(None);
        };
        let stats = &mut self.stats;
        let factors = self
            .corr_factors
            .get((settings.cut, settings.transform), |(cut, transform)| {
                stats.corr_factor_builds += 1;
                log::debug!("computing correction factors from '{}'", corrset.name());
                corrset.factors(cut, transform).map(Arc::new)
            })?;
        Ok(Some(Arc::clone(factors)))
    }

    /// 为一组 Cluster 准备角度映射；同一臂角只取一次
    fn angle_maps_for(
        &mut self,
        settings: &SessionSettings,
        dataset: &Dataset,
        indices: &[usize],
        size: Size2d,
    ) -> Vec<(usize, Arc<AngleMap>)> {
        let mut maps: Vec<(f64, Arc<AngleMap>)> = Vec::new();
        let mut jobs = Vec::with_capacity(indices.len());
        for &index in indices {
            let tth = dataset.clusters()[index].metadata().tth();
            let map = match maps.iter().find(|(k, _)| *k == tth) {
                Some((_, m)) => Arc::clone(m),
                None => {
                    let m = self.angle_map(settings, size, tth);
                    maps.push((tth, Arc::clone(&m)));
                    m
                }
            };
            jobs.push((index, map));
        }
        jobs
    }

    fn invalidate(&mut self) {
        self.angle_maps.invalidate();
        self.corr_factors.invalidate();
    }
}

fn reduction_inputs<'a>(
    settings: &'a SessionSettings,
    angle_map: &'a AngleMap,
    corr_factors: Option<&'a [f64]>,
) -> ReductionInputs<'a> {
    ReductionInputs {
        angle_map,
        corr_factors,
        params: &settings.params,
        baseline: &settings.baseline,
        peaks: &settings.peaks,
    }
}

fn build_dfgram(
    dataset: &Dataset,
    cluster: &Cluster,
    settings: &SessionSettings,
    angle_map: &AngleMap,
    corr_factors: Option<&[f64]>,
    slice: usize,
) -> Result<Dfgram> {
    let seq = cluster.sequence(dataset);
    let inputs = reduction_inputs(settings, angle_map, corr_factors);
    Dfgram::compute(&seq, &inputs, slice)
}

/// 分析会话
#[derive(Debug, Default)]
pub struct Session {
    dataset: Dataset,
    corrset: Option<Corrset>,
    settings: SessionSettings,
    shared: SharedCaches,
    dfgrams: VectorCache<Dfgram>,
    avg_dfgram: KeyedCache<Dfgram, ()>,
    /// 键为峰序号
    pole_figures: KeyedCache<Vec<PolePoint>, usize>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: SessionSettings) -> Result<Self> {
        let mut session = Self::new();
        session.apply_settings(settings)?;
        Ok(session)
    }

    // ─────────────────────────────────────────────────────────────
    // 只读访问
    // ─────────────────────────────────────────────────────────────

    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    pub fn clusters(&self) -> &[Cluster] {
        self.dataset.clusters()
    }

    pub fn cluster(&self, index: usize) -> Result<&Cluster> {
        let count = self.dataset.clusters().len();
        self.dataset.cluster(index).ok_or_else(|| {
            DfredError::InvalidArgument(format!("no cluster with index {} ({} total)", index, count))
        })
    }

    /// 参与分析的 Cluster
    pub fn active_clusters(&self) -> impl Iterator<Item = &Cluster> {
        self.dataset
            .active_clusters(self.settings.params.drop_incomplete)
    }

    pub fn corrset(&self) -> Option<&Corrset> {
        self.corrset.as_ref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn peaks(&self) -> &[PeakSettings] {
        &self.settings.peaks
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.shared.stats
    }

    /// 已缓存的衍射图个数
    pub fn cached_dfgram_count(&self) -> usize {
        self.dfgrams.cached_count()
    }

    // ─────────────────────────────────────────────────────────────
    // 衍射图
    // ─────────────────────────────────────────────────────────────

    /// Cluster 在当前 γ 扇区的衍射图（缓存）
    pub fn dfgram(&mut self, index: usize) -> Result<&Dfgram> {
        let Self {
            dataset,
            corrset,
            settings,
            shared,
            dfgrams,
            ..
        } = self;
        let count = dataset.clusters().len();
        let cluster = dataset.cluster(index).ok_or_else(|| {
            DfredError::InvalidArgument(format!("no cluster with index {} ({} total)", index, count))
        })?;

        dfgrams.value_for(index, |_| {
            let size = dataset.file(cluster.file_index()).image_size();
            let map = shared.angle_map(settings, size, cluster.metadata().tth());
            let corr = shared.corr_factors(settings, corrset.as_ref())?;
            shared.stats.dfgram_builds += 1;
            log::debug!("building dfgram for cluster {}", index);
            build_dfgram(
                dataset,
                cluster,
                settings,
                &map,
                corr.as_deref().map(Vec::as_slice),
                settings.params.gamma.slice,
            )
        })
    }

    /// 已缓存的衍射图；未计算或已失效时为 None
    pub fn cached_dfgram(&self, index: usize) -> Option<&Dfgram> {
        self.dfgrams.get(index)
    }

    /// 任意 γ 扇区的衍射图（不缓存）
    pub fn dfgram_for_slice(&mut self, index: usize, slice: usize) -> Result<Dfgram> {
        let slices = self.settings.params.gamma.slices;
        if slice >= slices {
            return Err(DfredError::InvalidArgument(format!(
                "gamma slice {} out of range (0..{})",
                slice, slices
            )));
        }
        let cluster = self.cluster(index)?.clone();
        let size = self.image_size()?;
        let map = self.shared.angle_map(&self.settings, size, cluster.metadata().tth());
        let corr = self
            .shared
            .corr_factors(&self.settings, self.corrset.as_ref())?;
        build_dfgram(
            &self.dataset,
            &cluster,
            &self.settings,
            &map,
            corr.as_deref().map(Vec::as_slice),
            slice,
        )
    }

    /// 并行构建所有参与分析且未缓存的衍射图，返回新构建的个数
    ///
    /// 角度映射与校正因子先串行准备好，再只读共享给各工作线程；
    /// 每个缓存槽位在并行阶段结束后由本线程写入一次。
    pub fn compute_all_dfgrams(&mut self) -> Result<usize> {
        let stale: Vec<usize> = self
            .active_indices()?
            .into_iter()
            .filter(|i| !self.dfgrams.is_cached(*i))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }
        let size = self.image_size()?;

        let jobs = self
            .shared
            .angle_maps_for(&self.settings, &self.dataset, &stale, size);
        let corr = self
            .shared
            .corr_factors(&self.settings, self.corrset.as_ref())?;

        let dataset = &self.dataset;
        let settings = &self.settings;
        let corr = corr.as_deref().map(Vec::as_slice);
        let built: Vec<(usize, Result<Dfgram>)> = jobs
            .par_iter()
            .map(|(index, map)| {
                let cluster = &dataset.clusters()[*index];
                let slice = settings.params.gamma.slice;
                (*index, build_dfgram(dataset, cluster, settings, map, corr, slice))
            })
            .collect();

        log::debug!("built {} dfgrams in parallel", built.len());
        self.shared.stats.dfgram_builds += built.len();

        let mut first_error = None;
        let mut count = 0;
        for (index, result) in built {
            match result {
                Ok(dfgram) => {
                    self.dfgrams.set(index, dfgram);
                    count += 1;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(count),
        }
    }

    /// 每个参与分析的 Cluster 上第 `peak_index` 个峰的参数
    pub fn peak_infos(&mut self, peak_index: usize) -> Result<Vec<PeakInfo>> {
        if peak_index >= self.settings.peaks.len() {
            return Err(DfredError::InvalidArgument(format!(
                "no peak with index {} ({} defined)",
                peak_index,
                self.settings.peaks.len()
            )));
        }
        self.compute_all_dfgrams()?;

        let infos = self
            .active_clusters()
            .filter_map(|c| {
                let dfgram = self.dfgrams.get(c.index())?;
                let peak = dfgram.peak(peak_index)?;
                Some(PeakInfo::new(c, dfgram, peak))
            })
            .collect();
        Ok(infos)
    }

    /// 全部参与分析的 Cluster 合并的平均衍射图（缓存）
    pub fn avg_dfgram(&mut self) -> Result<&Dfgram> {
        let active = self.active_indices()?;
        let size = self.image_size()?;
        let Self {
            dataset,
            corrset,
            settings,
            shared,
            avg_dfgram,
            ..
        } = self;

        avg_dfgram.get((), |_| {
            let maps = shared.angle_maps_for(settings, dataset, &active, size);
            let corr = shared.corr_factors(settings, corrset.as_ref())?;
            shared.stats.avg_dfgram_builds += 1;
            log::debug!("building averaged dfgram over {} clusters", active.len());

            let corr = corr.as_deref().map(Vec::as_slice);
            let parts: Vec<_> = maps
                .iter()
                .map(|(index, map)| {
                    (
                        dataset.clusters()[*index].sequence(dataset),
                        reduction_inputs(settings, map, corr),
                    )
                })
                .collect();
            Dfgram::average(&parts, settings.params.gamma.slice)
        })
    }

    /// 第 `peak_index` 个峰的极图（缓存）
    ///
    /// 插值关闭时为各 Cluster 的测量点，打开时为规则 (α, β) 网格。
    pub fn pole_figure(&mut self, peak_index: usize) -> Result<&[PolePoint]> {
        self.check_peak(peak_index)?;
        let infos = if self.pole_figures.is_cached(&peak_index) {
            Vec::new()
        } else {
            self.peak_infos(peak_index)?
        };
        let Self {
            settings,
            shared,
            pole_figures,
            ..
        } = self;

        let points = pole_figures.get_or_compute(peak_index, |_| {
            shared.stats.pole_figure_builds += 1;
            log::debug!("building pole figure for peak {}", peak_index);
            pole_figure(&infos, &settings.interpolation)
        });
        Ok(points.as_slice())
    }

    /// 所有参与分析的衍射图的 2θ 范围
    pub fn range_tth(&mut self) -> Result<Range> {
        self.compute_all_dfgrams()?;
        Ok(self.fold_dfgram_ranges(|d| d.range_tth()))
    }

    /// 所有参与分析的衍射图的强度范围
    pub fn range_inten(&mut self) -> Result<Range> {
        self.compute_all_dfgrams()?;
        Ok(self.fold_dfgram_ranges(|d| d.range_inten()))
    }

    /// 所有原始图像的强度范围
    pub fn range_inten_images(&self) -> Range {
        self.dataset
            .clusters()
            .iter()
            .map(|c| c.sequence(&self.dataset).range_inten())
            .fold(Range::empty(), |acc, r| acc.union(&r))
    }

    fn fold_dfgram_ranges<F: Fn(&Dfgram) -> Range>(&self, f: F) -> Range {
        self.active_clusters()
            .filter_map(|c| self.dfgrams.get(c.index()))
            .map(f)
            .filter(|r| !r.is_empty())
            .fold(Range::empty(), |acc, r| acc.union(&r))
    }

    /// 参与分析的 Cluster 序号；为空时返回 `NoData`
    fn active_indices(&self) -> Result<Vec<usize>> {
        let active: Vec<usize> = self.active_clusters().map(|c| c.index()).collect();
        if active.is_empty() {
            return Err(DfredError::NoData("no active clusters".to_string()));
        }
        Ok(active)
    }

    fn image_size(&self) -> Result<Size2d> {
        self.dataset
            .image_size()
            .ok_or_else(|| DfredError::NoData("no files loaded".to_string()))
    }

    // ─────────────────────────────────────────────────────────────
    // 数据
    // ─────────────────────────────────────────────────────────────

    pub fn add_file(&mut self, file: Datafile) -> Result<()> {
        if let Some(corr) = &self.corrset {
            if corr.image_size() != file.image_size() {
                return Err(DfredError::ImageSizeMismatch {
                    expected: corr.image_size().to_string(),
                    found: file.image_size().to_string(),
                });
            }
        }
        log::info!("adding file '{}' ({} measurements)", file.name(), file.count());
        self.dataset.add_file(file)?;
        self.invalidate_all();
        Ok(())
    }

    pub fn remove_file(&mut self, index: usize) -> Result<Datafile> {
        let file = self.dataset.remove_file(index)?;
        self.invalidate_all();
        Ok(file)
    }

    pub fn set_binning_factor(&mut self, factor: usize) -> Result<()> {
        self.dataset.set_binning_factor(factor)?;
        self.settings.binning_factor = factor;
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_cluster_selected(&mut self, index: usize, selected: bool) -> Result<()> {
        self.dataset.set_cluster_selected(index, selected)?;
        self.invalidate_averages();
        Ok(())
    }

    /// 设置或移除平场校正文件
    pub fn set_corr_file(&mut self, file: Option<Datafile>) -> Result<()> {
        let corrset = match file {
            Some(f) => {
                if let Some(size) = self.dataset.image_size() {
                    if f.image_size() != size {
                        return Err(DfredError::ImageSizeMismatch {
                            expected: size.to_string(),
                            found: f.image_size().to_string(),
                        });
                    }
                }
                log::info!("using correction file '{}'", f.name());
                Some(Corrset::new(&f))
            }
            None => None,
        };
        self.corrset = corrset;
        self.shared.corr_factors.invalidate();
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_corr_enabled(&mut self, enabled: bool) {
        self.settings.corr_enabled = enabled;
        self.invalidate_dfgrams();
    }

    // ─────────────────────────────────────────────────────────────
    // 探测器
    // ─────────────────────────────────────────────────────────────

    pub fn set_geometry(&mut self, geometry: Geometry) -> Result<()> {
        geometry.validate()?;
        self.settings.geometry = geometry;
        self.shared.angle_maps.invalidate();
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_image_transform(&mut self, transform: ImageTransform) -> Result<()> {
        if let Some(size) = self.dataset.image_size() {
            self.settings.cut.validate(transform.detector_size(size))?;
        }
        self.settings.transform = transform;
        self.shared.invalidate();
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_image_cut(&mut self, cut: ImageCut) -> Result<()> {
        if let Some(size) = self.dataset.image_size() {
            cut.validate(self.settings.transform.detector_size(size))?;
        }
        self.settings.cut = cut;
        self.shared.invalidate();
        self.invalidate_dfgrams();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // 归约参数
    // ─────────────────────────────────────────────────────────────

    pub fn set_norm_mode(&mut self, mode: NormMode) {
        self.settings.params.norm_mode = mode;
        self.invalidate_dfgrams();
    }

    pub fn set_gamma_selection(&mut self, gamma: GammaSelection) -> Result<()> {
        gamma.validate()?;
        self.settings.params.gamma = gamma;
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_tth_bins(&mut self, bins: Option<usize>) -> Result<()> {
        if bins == Some(0) {
            return Err(DfredError::InvalidArgument(
                "number of 2theta bins must be at least 1".to_string(),
            ));
        }
        self.settings.params.binning.tth_bins = bins;
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_intensity(&mut self, intensity: IntensityParams) {
        self.settings.params.intensity = intensity;
        self.invalidate_dfgrams();
    }

    pub fn set_drop_incomplete(&mut self, drop: bool) {
        self.settings.params.drop_incomplete = drop;
        self.invalidate_averages();
    }

    /// 只影响极图
    pub fn set_interpolation(&mut self, interpolation: InterpolParams) -> Result<()> {
        interpolation.validate()?;
        self.settings.interpolation = interpolation;
        self.pole_figures.invalidate();
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // 基线与峰
    // ─────────────────────────────────────────────────────────────

    pub fn set_baseline_degree(&mut self, degree: usize) -> Result<()> {
        if degree > crate::pars::BaselineSettings::MAX_POLYNOM_DEGREE {
            return Err(DfredError::InvalidArgument(format!(
                "baseline polynomial degree {} exceeds maximum {}",
                degree,
                crate::pars::BaselineSettings::MAX_POLYNOM_DEGREE
            )));
        }
        self.settings.baseline.polynom_degree = degree;
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn add_baseline_range(&mut self, range: Range) {
        self.settings.baseline.ranges.add(range);
        self.invalidate_dfgrams();
    }

    pub fn remove_baseline_range(&mut self, index: usize) -> Result<Range> {
        let range = self.settings.baseline.ranges.remove(index).ok_or_else(|| {
            DfredError::InvalidArgument(format!("no baseline range with index {}", index))
        })?;
        self.invalidate_dfgrams();
        Ok(range)
    }

    pub fn clear_baseline_ranges(&mut self) {
        self.settings.baseline.ranges.clear();
        self.invalidate_dfgrams();
    }

    pub fn add_peak(&mut self, peak: PeakSettings) {
        self.settings.peaks.push(peak);
        self.invalidate_dfgrams();
    }

    pub fn remove_peak(&mut self, index: usize) -> Result<PeakSettings> {
        self.check_peak(index)?;
        let peak = self.settings.peaks.remove(index);
        self.invalidate_dfgrams();
        Ok(peak)
    }

    pub fn set_peak_range(&mut self, index: usize, range: Range) -> Result<()> {
        self.check_peak(index)?;
        self.settings.peaks[index].range = range;
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_peak_shape(&mut self, index: usize, shape: PeakShape) -> Result<()> {
        self.check_peak(index)?;
        self.settings.peaks[index].shape = shape;
        self.invalidate_dfgrams();
        Ok(())
    }

    pub fn set_peak_guess(&mut self, index: usize, guess: PeakGuess) -> Result<()> {
        self.check_peak(index)?;
        self.settings.peaks[index].guess = guess;
        self.invalidate_dfgrams();
        Ok(())
    }

    fn check_peak(&self, index: usize) -> Result<()> {
        if index >= self.settings.peaks.len() {
            return Err(DfredError::InvalidArgument(format!(
                "no peak with index {} ({} defined)",
                index,
                self.settings.peaks.len()
            )));
        }
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────
    // 整体设置
    // ─────────────────────────────────────────────────────────────

    /// 替换全部设置，所有缓存失效
    pub fn apply_settings(&mut self, settings: SessionSettings) -> Result<()> {
        settings.validate()?;
        if let Some(size) = self.dataset.image_size() {
            settings.cut.validate(settings.transform.detector_size(size))?;
        }
        self.dataset.set_binning_factor(settings.binning_factor)?;
        self.settings = settings;
        self.invalidate_all();
        Ok(())
    }

    fn invalidate_dfgrams(&mut self) {
        if self.dfgrams.cached_count() > 0 {
            log::debug!("invalidating {} cached dfgrams", self.dfgrams.cached_count());
        }
        self.dfgrams.invalidate_all();
        self.invalidate_averages();
    }

    /// 依赖参与分析的 Cluster 集合的缓存
    fn invalidate_averages(&mut self) {
        self.avg_dfgram.invalidate();
        self.pole_figures.invalidate();
    }

    fn invalidate_all(&mut self) {
        self.shared.invalidate();
        self.invalidate_dfgrams();
    }
}
