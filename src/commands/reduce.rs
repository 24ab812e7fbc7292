//! # reduce 子命令实现
//!
//! 计算每个参与分析的 Cluster 的衍射图，并行导出为 CSV / XY 文件；
//! 可选地再导出全部 Cluster 的平均衍射图。
//!
//! ## 依赖关系
//! - 使用 `cli/reduce.rs` 定义的 ReduceArgs
//! - 使用 `batch/` 并行导出
//! - 使用 `dfred::export` 写文件

use super::{cluster_stem, compute_dfgrams, load_session, resolve_settings};
use crate::batch::{BatchRunner, ProcessResult};
use crate::cli::reduce::ReduceArgs;
use crate::utils::output;

use dfred::export::{self, ExportFormat};
use dfred::{DfredError, Result, Session};

use std::fs;
use std::path::Path;

/// 执行 reduce
pub fn execute(args: ReduceArgs) -> Result<()> {
    output::print_header("Diffractogram Reduction");

    let settings = resolve_settings(&args.reduction)?;
    let mut session = load_session(&args.input, settings, args.reduction.corr.as_deref())?;

    compute_dfgrams(&mut session)?;

    fs::create_dir_all(&args.output).map_err(|e| DfredError::FileWriteError {
        path: args.output.display().to_string(),
        source: e,
    })?;

    let format: ExportFormat = args.format.into();
    let tasks: Vec<(usize, String)> = session
        .active_clusters()
        .map(|c| (c.index(), cluster_stem(&session, c.index())))
        .collect();

    let runner = BatchRunner::new(args.jobs);
    output::print_info(&format!(
        "Exporting {} diffractograms as {} with {} jobs",
        tasks.len(),
        format.extension(),
        runner.jobs()
    ));

    let result = runner.run(&tasks, "Exporting", |(index, stem)| {
        export_cluster(&session, *index, stem, format, &args.output, args.overwrite)
    });

    output::print_separator();
    output::print_success(&format!(
        "Export complete: {} success, {} skipped, {} failed",
        result.success, result.skipped, result.failed
    ));

    if !result.failures.is_empty() {
        output::print_warning("Failed clusters:");
        for (name, err) in result.failures.iter().take(10) {
            output::print_error(&format!("  {}: {}", name, err));
        }
        if result.failures.len() > 10 {
            output::print_warning(&format!("  ... and {} more", result.failures.len() - 10));
        }
    }

    if args.average {
        export_average(&mut session, format, &args.output, args.overwrite)?;
    }

    output::print_done(&format!("Output directory: '{}'", args.output.display()));
    Ok(())
}

/// 导出平均衍射图
fn export_average(
    session: &mut Session,
    format: ExportFormat,
    dir: &Path,
    overwrite: bool,
) -> Result<()> {
    let path = dir.join(format!("average.{}", format.extension()));
    if path.exists() && !overwrite {
        output::print_warning(&format!("Output exists, skipping: {}", path.display()));
        return Ok(());
    }
    let dfgram = session.avg_dfgram()?;
    export::write_dfgram(dfgram, "average", format, &path)?;
    output::print_success(&format!(
        "Averaged diffractogram ({} points) saved to '{}'",
        dfgram.curve().len(),
        path.display()
    ));
    Ok(())
}

/// 导出单个 Cluster 的衍射图
fn export_cluster(
    session: &Session,
    index: usize,
    stem: &str,
    format: ExportFormat,
    dir: &Path,
    overwrite: bool,
) -> ProcessResult {
    let path = dir.join(format!("{}.{}", stem, format.extension()));
    if path.exists() && !overwrite {
        return ProcessResult::Skipped(format!("Output exists, skipping: {}", path.display()));
    }

    let Some(dfgram) = session.cached_dfgram(index) else {
        return ProcessResult::Failed(stem.to_string(), "diffractogram not computed".to_string());
    };
    match export::write_dfgram(dfgram, stem, format, &path) {
        Ok(()) => ProcessResult::Success(path.display().to_string()),
        Err(e) => ProcessResult::Failed(stem.to_string(), e.to_string()),
    }
}
