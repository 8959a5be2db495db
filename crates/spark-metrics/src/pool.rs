//! # pool 模块说明
//!
//! ## 角色定位（Why）
//! - 工作线程池、连接池等资源池的任务会先排队、再占用资源、最后释放，与请求生命周期同构；
//! - 运维需要看到排队深度、占用数量、排队与占用时长，以及成功、失败、拒绝的次数。
//!
//! ## 契约（What）
//! - `enqueue`：`tasks{state=queued}` +1，开启排队计时，返回 [`PoolTask`]；
//! - `dequeue`：排队数 −1、占用数 +1，排队计时记入 `queue_time`，开启占用计时，返回 [`PoolUsage`]；
//! - `rejected`：排队数 −1，排队计时照常记录，`completed{result=rejected}` +1；
//! - `end`：占用数 −1，占用计时记入 `usage_time`，按结果累加 `completed`；
//! - 句柄均按值消费，每段计时恰好关闭一次；未经钩子消费而被丢弃的句柄不记录样本。

use crate::contract::pool_state;
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::registry::{CounterChild, GaugeChild, HistogramChild, HistogramTimer};

/// 排队中的任务。
#[derive(Debug)]
pub struct PoolTask {
    timer: Option<HistogramTimer>,
}

impl PoolTask {
    pub fn detached() -> Self {
        Self { timer: None }
    }
}

/// 正在占用资源的任务。
#[derive(Debug)]
pub struct PoolUsage {
    timer: Option<HistogramTimer>,
}

impl PoolUsage {
    pub fn detached() -> Self {
        Self { timer: None }
    }
}

impl Drop for PoolTask {
    fn drop(&mut self) {
        discard(self.timer.take());
    }
}

impl Drop for PoolUsage {
    fn drop(&mut self) {
        discard(self.timer.take());
    }
}

fn close(timer: Option<HistogramTimer>) {
    if let Some(timer) = timer {
        timer.observe_duration();
    }
}

fn discard(timer: Option<HistogramTimer>) {
    if let Some(timer) = timer {
        timer.stop_and_discard();
    }
}

/// 资源池事件钩子。
pub trait PoolMetrics: Send + Sync {
    fn enqueue(&self) -> PoolTask {
        PoolTask::detached()
    }

    fn dequeue(&self, _task: PoolTask) -> PoolUsage {
        PoolUsage::detached()
    }

    fn rejected(&self, _task: PoolTask) {}

    fn end(&self, _usage: PoolUsage, _succeeded: bool) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopPoolMetrics;

impl PoolMetrics for NoopPoolMetrics {}

/// 写入注册表的资源池钩子，一个实例对应一个 `(pool_type, pool_name)`。
#[derive(Debug)]
pub struct PoolMetricsHook {
    queued: GaugeChild,
    in_use: GaugeChild,
    queue_time: HistogramChild,
    usage_time: HistogramChild,
    succeeded: CounterChild,
    failed: CounterChild,
    rejected: CounterChild,
}

impl PoolMetricsHook {
    pub fn new(
        pool_type: &str,
        pool_name: &str,
        max_size: usize,
        factory: &InstrumentFactory,
    ) -> Result<Self> {
        let tasks = factory.pool_tasks()?;
        let completed = factory.pool_completed()?;
        factory
            .pool_max_size()?
            .with_label_values(&[pool_type, pool_name])?
            .set(max_size as f64);

        Ok(Self {
            queued: tasks.with_label_values(&[pool_type, pool_name, pool_state::QUEUED])?,
            in_use: tasks.with_label_values(&[pool_type, pool_name, pool_state::IN_USE])?,
            queue_time: factory
                .pool_time("queue")?
                .with_label_values(&[pool_type, pool_name])?,
            usage_time: factory
                .pool_time("usage")?
                .with_label_values(&[pool_type, pool_name])?,
            succeeded: completed.with_label_values(&[
                pool_type,
                pool_name,
                pool_state::SUCCEEDED,
            ])?,
            failed: completed.with_label_values(&[pool_type, pool_name, pool_state::FAILED])?,
            rejected: completed.with_label_values(&[
                pool_type,
                pool_name,
                pool_state::REJECTED,
            ])?,
        })
    }
}

impl PoolMetrics for PoolMetricsHook {
    fn enqueue(&self) -> PoolTask {
        self.queued.inc();
        PoolTask {
            timer: Some(self.queue_time.start_timer()),
        }
    }

    fn dequeue(&self, mut task: PoolTask) -> PoolUsage {
        close(task.timer.take());
        self.queued.dec();
        self.in_use.inc();
        PoolUsage {
            timer: Some(self.usage_time.start_timer()),
        }
    }

    fn rejected(&self, mut task: PoolTask) {
        close(task.timer.take());
        self.queued.dec();
        self.rejected.inc();
    }

    fn end(&self, mut usage: PoolUsage, succeeded: bool) {
        close(usage.timer.take());
        self.in_use.dec();
        if succeeded {
            self.succeeded.inc();
        } else {
            self.failed.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::registry::Registry;

    #[test]
    fn queue_and_usage_phases_balance() {
        let factory = InstrumentFactory::new(Arc::new(Registry::new()));
        let hook = PoolMetricsHook::new("worker", "default", 4, &factory).unwrap();

        let first = hook.enqueue();
        let second = hook.enqueue();
        assert_eq!(hook.queued.get(), 2.0);

        let usage = hook.dequeue(first);
        hook.rejected(second);
        assert_eq!(hook.queued.get(), 0.0);
        assert_eq!(hook.in_use.get(), 1.0);

        hook.end(usage, false);
        assert_eq!(hook.in_use.get(), 0.0);
        assert_eq!(hook.failed.get(), 1);
        assert_eq!(hook.rejected.get(), 1);
        assert_eq!(hook.queue_time.get_sample_count(), 2);
        assert_eq!(hook.usage_time.get_sample_count(), 1);

        let max = factory
            .pool_max_size()
            .unwrap()
            .with_label_values(&["worker", "default"])
            .unwrap();
        assert_eq!(max.get(), 4.0);
    }

    #[test]
    fn abandoned_task_records_nothing() {
        let factory = InstrumentFactory::new(Arc::new(Registry::new()));
        let hook = PoolMetricsHook::new("worker", "abandoned", 1, &factory).unwrap();

        drop(hook.enqueue());
        assert_eq!(hook.queue_time.get_sample_count(), 0);
        assert_eq!(hook.queued.get(), 1.0, "排队数只由钩子调整");
    }
}
