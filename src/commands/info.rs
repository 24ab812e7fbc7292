//! # info 子命令实现
//!
//! 加载数据、分组，打印数据集摘要与 Cluster 表。
//!
//! ## 依赖关系
//! - 使用 `cli/info.rs` 定义的 InfoArgs
//! - 使用 `tabled` 打印表格

use super::{compute_dfgrams, load_session, resolve_settings};
use crate::cli::info::InfoArgs;
use crate::utils::output;

use dfred::{Result, Session};

use tabled::{Table, Tabled};

#[derive(Tabled)]
struct ClusterRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "File")]
    file: String,
    #[tabled(rename = "Members")]
    members: String,
    #[tabled(rename = "ω (°)")]
    omg: String,
    #[tabled(rename = "φ (°)")]
    phi: String,
    #[tabled(rename = "χ (°)")]
    chi: String,
    #[tabled(rename = "2θ (°)")]
    tth: String,
    #[tabled(rename = "Monitor")]
    monitor: String,
    #[tabled(rename = "Time (s)")]
    time: String,
    #[tabled(rename = "Flags")]
    flags: String,
}

/// 执行 info
pub fn execute(args: InfoArgs) -> Result<()> {
    output::print_header("Dataset Information");

    let settings = resolve_settings(&args.reduction)?;
    let mut session = load_session(&args.input, settings, args.reduction.corr.as_deref())?;

    print_summary(&session);
    print_cluster_table(&session);

    if args.ranges {
        compute_dfgrams(&mut session)?;
        let tth = session.range_tth()?;
        let inten = session.range_inten()?;
        output::print_separator();
        output::print_kv("2θ range", &tth.to_string());
        output::print_kv("Intensity range", &inten.to_string());
    }

    Ok(())
}

fn print_summary(session: &Session) {
    let dataset = session.dataset();
    let settings = session.settings();
    let active = session.active_clusters().count();

    output::print_kv("Files", &dataset.files().len().to_string());
    output::print_kv("Measurements", &dataset.measurement_count().to_string());
    if let Some(size) = dataset.image_size() {
        output::print_kv("Image size", &size.to_string());
    }
    output::print_kv("Image intensity", &session.range_inten_images().to_string());
    output::print_kv("Binning factor", &dataset.binning_factor().to_string());
    output::print_kv(
        "Clusters",
        &format!("{} ({} active)", session.clusters().len(), active),
    );
    output::print_kv("Normalization", &settings.params.norm_mode.to_string());
    let corr = match session.corrset() {
        Some(c) if settings.corr_enabled => c.name().to_string(),
        Some(c) => format!("{} (disabled)", c.name()),
        None => "none".to_string(),
    };
    output::print_kv("Correction", &corr);
}

fn print_cluster_table(session: &Session) {
    let dataset = session.dataset();
    let rows: Vec<ClusterRow> = session
        .clusters()
        .iter()
        .map(|c| {
            let md = c.metadata();
            let mut flags = Vec::new();
            if c.is_incomplete() {
                flags.push("incomplete");
            }
            if !c.is_selected() {
                flags.push("unselected");
            }
            ClusterRow {
                index: c.index(),
                file: dataset.file(c.file_index()).name().to_string(),
                members: format!("{}..{}", c.offset(), c.offset() + c.size()),
                omg: format!("{:.3}", md.omg()),
                phi: format!("{:.3}", md.phi()),
                chi: format!("{:.3}", md.chi()),
                tth: format!("{:.3}", md.tth()),
                monitor: format!("{:.0}", md.monitor_count()),
                time: format!("{:.2}", md.time()),
                flags: flags.join(","),
            }
        })
        .collect();

    if !rows.is_empty() {
        output::print_header(&format!("{} Clusters", rows.len()));
        println!("{}", Table::new(&rows));
    }
}
