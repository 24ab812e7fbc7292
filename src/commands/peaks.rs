//! # peaks 子命令实现
//!
//! 在每个参与分析的 Cluster 上拟合各峰，打印峰参数表并导出 CSV；
//! 可选地导出每个峰的极图（测量点或插值网格）。
//!
//! ## 依赖关系
//! - 使用 `cli/peaks.rs` 定义的 PeaksArgs
//! - 使用 `dfred::export::peak_infos_to_csv`, `pole_figure_to_csv` 写文件
//! - 使用 `tabled` 打印表格

use super::{compute_dfgrams, load_session, resolve_settings};
use crate::cli::peaks::PeaksArgs;
use crate::utils::output;

use dfred::calc::{FitStatus, PeakInfo};
use dfred::export;
use dfred::pars::{PeakSettings, PeakShape};
use dfred::{DfredError, Result};

use std::path::{Path, PathBuf};
use tabled::{Table, Tabled};

/// 执行 peaks
pub fn execute(args: PeaksArgs) -> Result<()> {
    output::print_header("Peak Fitting");

    let mut settings = resolve_settings(&args.reduction)?;
    let shape: PeakShape = args.shape.into();
    for range in &args.peaks {
        settings.peaks.push(PeakSettings::new(*range, shape));
    }
    if settings.peaks.is_empty() {
        return Err(DfredError::InvalidArgument(
            "no peaks defined; use --peak min:max or a settings file with peaks".to_string(),
        ));
    }
    if !settings.baseline.is_configured() {
        output::print_warning("No baseline ranges given; peaks are fitted on the raw curve");
    }
    if args.interpolate {
        settings.interpolation.enabled = true;
    }

    let peaks = settings.peaks.clone();
    let mut session = load_session(&args.input, settings, args.reduction.corr.as_deref())?;
    compute_dfgrams(&mut session)?;

    for (k, peak) in peaks.iter().enumerate() {
        let infos = session.peak_infos(k)?;
        let path = peak_output_path(&args.output, k, peaks.len());
        export::peak_infos_to_csv(&infos, &path)?;

        print_peak_table(k, peak, &infos, args.top_n);

        let fitted = infos.iter().filter(|i| i.status == FitStatus::Fitted).count();
        let failed = infos.iter().filter(|i| i.status == FitStatus::Failed).count();
        if failed > 0 {
            output::print_warning(&format!("Peak {}: {} of {} fits failed", k, failed, infos.len()));
        }
        output::print_success(&format!(
            "Peak {} ({} fitted) saved to '{}'",
            k,
            fitted,
            path.display()
        ));

        if let Some(pf_output) = &args.pole_figure {
            let pf_path = peak_output_path(pf_output, k, peaks.len());
            let points = session.pole_figure(k)?;
            let missing = points.iter().filter(|p| p.is_missing()).count();
            export::pole_figure_to_csv(points, &pf_path)?;
            if missing > 0 {
                output::print_warning(&format!(
                    "Peak {}: {} of {} pole figure points have no data",
                    k,
                    missing,
                    points.len()
                ));
            }
            output::print_success(&format!(
                "Pole figure of peak {} ({} points) saved to '{}'",
                k,
                points.len(),
                pf_path.display()
            ));
        }
    }

    Ok(())
}

/// 多个峰时在文件名后加 `_peak<k>`
fn peak_output_path(output: &Path, index: usize, count: usize) -> PathBuf {
    if count <= 1 {
        return output.to_path_buf();
    }
    let stem = output
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("peaks");
    let ext = output.extension().and_then(|s| s.to_str()).unwrap_or("csv");
    output.with_file_name(format!("{}_peak{}.{}", stem, index, ext))
}

fn print_peak_table(index: usize, peak: &PeakSettings, infos: &[PeakInfo], count: usize) {
    #[derive(Tabled)]
    struct PeakRow {
        #[tabled(rename = "#")]
        cluster: usize,
        #[tabled(rename = "2θ arm (°)")]
        tth: String,
        #[tabled(rename = "Center (°)")]
        center: String,
        #[tabled(rename = "FWHM (°)")]
        fwhm: String,
        #[tabled(rename = "Intensity")]
        intensity: String,
        #[tabled(rename = "α (°)")]
        alpha: String,
        #[tabled(rename = "β (°)")]
        beta: String,
        #[tabled(rename = "Status")]
        status: String,
    }

    let rows: Vec<PeakRow> = infos
        .iter()
        .take(count)
        .map(|i| PeakRow {
            cluster: i.cluster,
            tth: format!("{:.3}", i.tth),
            center: i.center.to_string(),
            fwhm: i.fwhm.to_string(),
            intensity: i.intensity.to_string(),
            alpha: format!("{:.2}", i.alpha),
            beta: format!("{:.2}", i.beta),
            status: i.status.to_string(),
        })
        .collect();

    if !rows.is_empty() {
        output::print_header(&format!(
            "Peak {}: {} in {} ({} of {} clusters)",
            index,
            peak.shape,
            peak.range,
            rows.len(),
            infos.len()
        ));
        println!("{}", Table::new(&rows));
    }
}
