//! # 批量执行器
//!
//! 在固定大小的线程池中并行处理一批编号任务（如一层的全部补丁）。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代，每个工作线程复用一份临时缓冲区
//! - 部分结果通过满足结合律的合并函数归约
//! - 任一任务出错即中止并返回该错误
//! - 进度条显示
//!
//! ## 依赖关系
//! - 被 `flux/aggregate.rs` 和 `commands/run.rs` 调用
//! - 使用 `rayon` 进行并行计算, `num_cpus` 确定默认线程数

use crate::error::{QpdError, Result};

use indicatif::ProgressBar;
use rayon::prelude::*;

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    pool: rayon::ThreadPool,
}

impl BatchRunner {
    /// 创建新的批量执行器（`jobs == 0` 时使用全部核心）
    pub fn new(jobs: usize) -> Result<Self> {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build()
            .map_err(|e| QpdError::Configuration(format!("cannot start {} workers: {}", jobs, e)))?;

        Ok(Self { jobs, pool })
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 在线程池中同时执行两个独立任务
    pub fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.pool.install(|| rayon::join(a, b))
    }

    /// 并行处理 `0..count` 并归约结果
    ///
    /// `init` 为每个工作线程创建一份可复用的缓冲区；
    /// `merge` 必须满足结合律，`identity` 为其单位元。
    pub fn fold_reduce<T, S, INIT, F, ID, M>(
        &self,
        count: usize,
        pb: &ProgressBar,
        init: INIT,
        process: F,
        identity: ID,
        merge: M,
    ) -> Result<T>
    where
        T: Send,
        INIT: Fn() -> S + Sync + Send,
        F: Fn(&mut S, usize) -> Result<T> + Sync + Send,
        ID: Fn() -> T + Sync + Send,
        M: Fn(T, T) -> T + Sync + Send,
    {
        self.pool.install(|| {
            (0..count)
                .into_par_iter()
                .map_init(&init, |scratch, index| {
                    let result = process(scratch, index);
                    pb.inc(1);
                    result
                })
                .try_reduce(&identity, |a, b| Ok(merge(a, b)))
        })
    }
}
