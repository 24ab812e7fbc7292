//! 端到端场景：分组、归一化、缓存复用与失效、基线扣除和峰拟合、平均衍射图与极图

use dfred::calc::{Dfgram, FitStatus};
use dfred::data::Datafile;
use dfred::fit::{self, PeakFunction, RawOutcome};
use dfred::models::{keys, Curve, Image, Measurement, Metadata, Range, Ranges, Size2d};
use dfred::pars::{BaselineSettings, NormMode, PeakSettings, PeakShape};
use dfred::Session;

const SIZE: Size2d = Size2d { w: 8, h: 6 };

fn measurement(i: usize, value: f64, mon: f64) -> Measurement {
    Measurement::new(
        Metadata::new()
            .with(keys::OMG, i as f64)
            .with(keys::PHI, 0.0)
            .with(keys::CHI, 0.0)
            .with(keys::TTH, 30.0)
            .with(keys::MONITOR, mon)
            .with(keys::TIME, 1.0),
        Image::filled(SIZE, value),
    )
}

fn datafile(n: usize, value: f64, mon: f64) -> Datafile {
    Datafile::new("scan", (0..n).map(|i| measurement(i, value, mon)).collect()).unwrap()
}

fn gaussian_on_line(x: f64) -> f64 {
    let t = x - 30.0;
    5.0 + 0.1 * x + 50.0 * (-4.0 * std::f64::consts::LN_2 * t * t / 0.25).exp()
}

fn sampled(from: f64, to: f64, n: usize, f: fn(f64) -> f64) -> Curve {
    let step = (to - from) / (n - 1) as f64;
    Curve::from_points((0..n).map(|i| {
        let x = from + i as f64 * step;
        (x, f(x))
    }))
}

#[test]
fn test_grouping_ten_by_three() {
    let mut s = Session::new();
    s.add_file(datafile(10, 1.0, 100.0)).unwrap();
    s.set_binning_factor(3).unwrap();

    let sizes: Vec<usize> = s.clusters().iter().map(|c| c.size()).collect();
    assert_eq!(sizes, vec![3, 3, 3, 1]);
    assert!(s.clusters()[3].is_incomplete());
    assert!(!s.clusters()[0].is_incomplete());

    // 监视器计数求和，角度取平均
    let md = s.clusters()[1].metadata();
    assert!((md.monitor_count() - 300.0).abs() < 1e-12);
    assert!((md.omg() - 4.0).abs() < 1e-12);

    s.set_drop_incomplete(true);
    assert_eq!(s.active_clusters().count(), 3);
}

#[test]
fn test_monitor_normalization() {
    let mut s = Session::new();
    s.add_file(datafile(3, 200.0, 100.0)).unwrap();
    s.set_binning_factor(3).unwrap();

    // 默认对成员取平均
    let raw: Vec<f64> = s.dfgram(0).unwrap().curve().ys().to_vec();
    assert!(!raw.is_empty());
    assert!(raw.iter().all(|y| (y - 200.0).abs() < 1e-9));

    s.set_norm_mode(NormMode::Monitor);
    let normalized = s.dfgram(0).unwrap().curve().ys().to_vec();
    assert_eq!(normalized.len(), raw.len());
    assert!(normalized.iter().all(|y| (y - 2.0).abs() < 1e-9));

    // 求和与平均给出相同的归一化曲线
    let mut intensity = s.settings().params.intensity;
    intensity.average_members = false;
    s.set_intensity(intensity);
    let summed = s.dfgram(0).unwrap().curve().ys().to_vec();
    assert!(summed.iter().all(|y| (y - 2.0).abs() < 1e-9));

    s.set_norm_mode(NormMode::None);
    let raw_sum = s.dfgram(0).unwrap().curve().ys().to_vec();
    assert!(raw_sum.iter().all(|y| (y - 600.0).abs() < 1e-9));
}

#[test]
fn test_cache_reuse_and_invalidation() {
    let mut s = Session::new();
    s.add_file(datafile(4, 1.0, 100.0)).unwrap();

    assert_eq!(s.compute_all_dfgrams().unwrap(), 4);
    // 四个 Cluster 共享同一臂角，只建一次角度映射
    assert_eq!(s.cache_stats().angle_map_builds, 1);
    assert_eq!(s.cache_stats().dfgram_builds, 4);

    s.dfgram(2).unwrap();
    assert_eq!(s.cache_stats().dfgram_builds, 4);

    let settings = s.settings().clone();
    s.apply_settings(settings).unwrap();
    assert_eq!(s.cached_dfgram_count(), 0);
    assert!(s.cached_dfgram(0).is_none());

    s.dfgram(0).unwrap();
    assert_eq!(s.cache_stats().dfgram_builds, 5);
    assert_eq!(s.cache_stats().angle_map_builds, 2);
}

#[test]
fn test_baseline_subtraction_and_peak_fit() {
    let curve = sampled(25.0, 35.0, 501, gaussian_on_line);
    let baseline = BaselineSettings {
        polynom_degree: 1,
        ranges: Ranges::from_ranges([Range::new(25.0, 28.0), Range::new(32.0, 35.0)]),
    };
    let peaks = [PeakSettings::new(Range::new(28.5, 31.5), PeakShape::Gaussian)];
    let df = Dfgram::from_curve(curve, Range::new(-1.0, 1.0), &baseline, &peaks);

    assert!(df.baseline().is_some_and(|b| b.success()));
    assert!((df.background_at(30.0) - 8.0).abs() < 1e-6);
    assert!((df.background_at(26.0) - 7.6).abs() < 1e-6);

    // 扣除基线后只剩高斯峰
    let minus = df.curve_minus_bg();
    assert_eq!(minus.len(), df.curve().len());
    for (x, y) in minus.points() {
        let t = x - 30.0;
        let peak = 50.0 * (-4.0 * std::f64::consts::LN_2 * t * t / 0.25).exp();
        assert!((y - peak).abs() < 1e-5, "at {}: {} vs {}", x, y, peak);
    }

    let peak = df.peak(0).unwrap();
    assert!(peak.is_fitted());
    let fitted = peak.fitted.as_ref().unwrap();
    assert!((fitted.center().unwrap().value - 30.0).abs() < 1e-6);
    assert!((fitted.fwhm().unwrap().value - 0.5).abs() < 1e-6);
    assert!((fitted.height().unwrap().value - 50.0).abs() < 1e-5);

    // 原始统计的峰位在采样网格上
    assert!((peak.raw.center - 30.0).abs() < 1e-9);
}

#[test]
fn test_gaussian_round_trip() {
    let curve = sampled(28.0, 32.0, 201, |x| {
        let t = x - 30.2;
        12.0 * (-4.0 * std::f64::consts::LN_2 * t * t / 0.36).exp()
    });
    let guess = RawOutcome::from_curve(&curve);
    let fitted = fit::fit_peak(PeakFunction::Gaussian, &curve, &guess);

    assert!(fitted.success());
    let p = fitted.par_values();
    assert!((p[0] - 30.2).abs() < 1e-6);
    assert!((p[1] - 0.6).abs() < 1e-6);
    assert!((p[2] - 12.0).abs() < 1e-6);

    let area = 12.0 * 0.6 * 0.5 * (std::f64::consts::PI / std::f64::consts::LN_2).sqrt();
    assert!((fitted.intensity().unwrap().value - area).abs() < 1e-5);
}

#[test]
fn test_too_few_points_fails_without_error() {
    let curve = Curve::from_points([(30.0, 1.0), (30.1, 2.0)]);
    let guess = RawOutcome::from_curve(&curve);
    let fitted = fit::fit_peak(PeakFunction::PseudoVoigt1, &curve, &guess);
    assert!(!fitted.success());
    assert!(fitted.center().is_none());
}

#[test]
fn test_peak_infos_per_active_cluster() {
    let mut s = Session::new();
    s.add_file(datafile(5, 10.0, 100.0)).unwrap();
    s.set_binning_factor(2).unwrap();
    s.add_peak(PeakSettings::new(Range::new(29.0, 31.0), PeakShape::Raw));

    let infos = s.peak_infos(0).unwrap();
    assert_eq!(infos.len(), 3);
    assert!(infos.iter().all(|i| i.status == FitStatus::Raw));
    assert!(infos.iter().all(|i| i.center.error.is_nan()));
    assert!(infos.iter().all(|i| (0.0..=90.0).contains(&i.alpha)));
    assert!(infos.iter().all(|i| (0.0..360.0).contains(&i.beta)));

    s.set_cluster_selected(1, false).unwrap();
    assert_eq!(s.peak_infos(0).unwrap().len(), 2);
}

#[test]
fn test_averaged_dfgram_and_pole_figure() {
    let mut s = Session::new();
    s.add_file(datafile(4, 10.0, 100.0)).unwrap();
    s.add_peak(PeakSettings::new(Range::new(29.0, 31.0), PeakShape::Raw));

    let avg = s.avg_dfgram().unwrap();
    assert!(!avg.curve().is_empty());
    assert!(avg.curve().ys().iter().all(|y| (y - 10.0).abs() < 1e-9));
    assert_eq!(avg.peaks().len(), 1);

    // 未插值时极图就是各 Cluster 的测量点
    let points = s.pole_figure(0).unwrap().to_vec();
    let infos = s.peak_infos(0).unwrap();
    assert_eq!(points.len(), infos.len());
    for (p, i) in points.iter().zip(&infos) {
        assert_eq!(p.alpha, i.alpha);
        assert_eq!(p.beta, i.beta);
        assert_eq!(p.intensity, i.intensity.value);
    }
}
