//! # 批量执行器
//!
//! 在独立的 rayon 线程池中并行处理任务列表（每个 Cluster 的导出等）。
//!
//! ## 功能
//! - 线程数来自 `--jobs`，0 表示 CPU 核数
//! - 进度条显示
//! - 失败收集与汇总
//!
//! ## 依赖关系
//! - 被 `commands/reduce.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行处理

use crate::utils::progress;

use rayon::prelude::*;

/// 单个任务的处理结果
#[derive(Debug, Clone)]
pub enum ProcessResult {
    /// 写出的文件
    Success(String),
    /// 跳过原因（如输出文件已存在）
    Skipped(String),
    /// (任务名, 错误信息)
    Failed(String, String),
}

/// 批量处理统计
#[derive(Debug, Default)]
pub struct BatchResult {
    pub success: usize,
    pub skipped: usize,
    pub failed: usize,
    pub failures: Vec<(String, String)>,
}

impl BatchResult {
    pub fn merge(&mut self, result: ProcessResult) {
        match result {
            ProcessResult::Success(output) => {
                log::debug!("wrote {}", output);
                self.success += 1;
            }
            ProcessResult::Skipped(reason) => {
                log::info!("{}", reason);
                self.skipped += 1;
            }
            ProcessResult::Failed(name, err) => {
                self.failed += 1;
                self.failures.push((name, err));
            }
        }
    }
}

/// 批量执行器
pub struct BatchRunner {
    jobs: usize,
}

impl BatchRunner {
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self { jobs }
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理任务列表，结果按输入顺序合并
    pub fn run<T, F>(&self, items: &[T], message: &str, processor: F) -> BatchResult
    where
        T: Sync,
        F: Fn(&T) -> ProcessResult + Sync + Send,
    {
        let pb = progress::create_progress_bar(items.len() as u64, message);

        let work = || -> Vec<ProcessResult> {
            items
                .par_iter()
                .map(|item| {
                    let result = processor(item);
                    pb.inc(1);
                    result
                })
                .collect()
        };

        let results = match rayon::ThreadPoolBuilder::new().num_threads(self.jobs).build() {
            Ok(pool) => pool.install(work),
            Err(e) => {
                log::warn!(
                    "could not build a {}-thread pool ({}), using the global pool",
                    self.jobs,
                    e
                );
                work()
            }
        };
        pb.finish_and_clear();

        let mut batch = BatchResult::default();
        for result in results {
            batch.merge(result);
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_counts_results() {
        let items: Vec<usize> = (0..10).collect();
        let runner = BatchRunner::new(2);
        let result = runner.run(&items, "test", |&i| match i % 3 {
            0 => ProcessResult::Success(i.to_string()),
            1 => ProcessResult::Skipped(i.to_string()),
            _ => ProcessResult::Failed(i.to_string(), "boom".to_string()),
        });
        assert_eq!(result.success, 4);
        assert_eq!(result.skipped, 3);
        assert_eq!(result.failed, 3);
        assert_eq!(result.failures[0].0, "2");
    }

    #[test]
    fn test_zero_jobs_means_all_cpus() {
        assert_eq!(BatchRunner::new(0).jobs(), num_cpus::get());
    }
}
