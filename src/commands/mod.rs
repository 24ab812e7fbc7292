//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑；会话的构建（设置文件 + 命令行覆盖 + 加载输入）
//! 在这里统一完成。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `batch/`, `utils/` 与核心库 `dfred`
//! - 子模块: info, reduce, peaks, init_settings

pub mod info;
pub mod init_settings;
pub mod peaks;
pub mod reduce;

use crate::batch::FileCollector;
use crate::cli::common::{InputArgs, ReductionArgs};
use crate::cli::Commands;
use crate::utils::{output, progress};

use dfred::loaders::{self, LoadOptions};
use dfred::pars::SessionSettings;
use dfred::{DfredError, Result, Session};

use std::path::Path;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Info(args) => info::execute(args),
        Commands::Reduce(args) => reduce::execute(args),
        Commands::Peaks(args) => peaks::execute(args),
        Commands::InitSettings(args) => init_settings::execute(args),
    }
}

/// 读取设置文件（若有）并应用命令行覆盖
pub fn resolve_settings(args: &ReductionArgs) -> Result<SessionSettings> {
    let mut settings = match &args.settings {
        Some(path) => {
            let s = SessionSettings::load(path)?;
            output::print_info(&format!("Settings loaded from '{}'", path.display()));
            s
        }
        None => SessionSettings::default(),
    };

    if let Some(binning) = args.binning {
        settings.binning_factor = binning;
    }
    if let Some(norm) = args.norm {
        settings.params.norm_mode = norm.into();
    }
    if let Some(bins) = args.bins {
        settings.params.binning.tth_bins = Some(bins);
    }
    if let Some(slices) = args.slices {
        settings.params.gamma.slices = slices;
    }
    if let Some(slice) = args.slice {
        settings.params.gamma.slice = slice;
    }
    if args.sum {
        settings.params.intensity.average_members = false;
    }
    if let Some(degree) = args.degree {
        settings.baseline.polynom_degree = degree;
    }
    for range in &args.baseline {
        settings.baseline.ranges.add(*range);
    }

    settings.validate()?;
    Ok(settings)
}

/// 收集并加载输入文件，构建会话
pub fn load_session(
    input: &InputArgs,
    settings: SessionSettings,
    corr: Option<&Path>,
) -> Result<Session> {
    if !input.input.exists() {
        return Err(DfredError::FileNotFound {
            path: input.input.display().to_string(),
        });
    }

    let files = FileCollector::new(input.input.clone())
        .with_pattern(&input.pattern)?
        .recursive(input.recursive)
        .collect();
    if files.is_empty() {
        return Err(DfredError::NoFilesFound {
            pattern: input.pattern.clone(),
        });
    }
    output::print_info(&format!("Found {} input file(s)", files.len()));

    let options = LoadOptions {
        default_tth: input.tth,
    };
    let mut session = Session::with_settings(settings)?;

    if let Some(path) = corr {
        let corr_file = loaders::load_file(path, &options)?;
        output::print_info(&format!(
            "Correction file '{}' ({} images)",
            corr_file.name(),
            corr_file.count()
        ));
        session.set_corr_file(Some(corr_file))?;
    }

    let pb = progress::create_progress_bar(files.len() as u64, "Loading");
    for path in &files {
        let file = loaders::load_file(path, &options);
        pb.inc(1);
        match file {
            Ok(file) => session.add_file(file)?,
            Err(e) => {
                pb.finish_and_clear();
                return Err(e);
            }
        }
    }
    pb.finish_and_clear();

    output::print_success(&format!(
        "Loaded {} measurements into {} clusters",
        session.dataset().measurement_count(),
        session.clusters().len()
    ));
    Ok(session)
}

/// 计算所有参与分析的衍射图（带 spinner）
pub fn compute_dfgrams(session: &mut Session) -> Result<usize> {
    let spinner = progress::create_spinner("Computing diffractograms");
    let result = session.compute_all_dfgrams();
    spinner.finish_and_clear();
    let built = result?;
    log::info!("cache stats after compute: {:?}", session.cache_stats());
    output::print_success(&format!("Computed {} diffractograms", built));
    Ok(built)
}

/// Cluster 导出文件名的主干：`<数据文件名>_c<序号>`
pub fn cluster_stem(session: &Session, index: usize) -> String {
    let file = session
        .cluster(index)
        .ok()
        .map(|c| session.dataset().file(c.file_index()).name().to_string())
        .unwrap_or_default();
    let stem = Path::new(&file)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("cluster");
    format!("{}_c{:04}", stem, index)
}
