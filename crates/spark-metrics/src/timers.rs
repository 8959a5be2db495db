//! 宿主定时器观测。
//!
//! - 创建：`created` +1、`active` +1；
//! - 结束：若被取消 `cancelled` +1，随后 `destroyed` +1、`active` −1。

use crate::contract::timer_state;
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::registry::GaugeChild;

/// `id` 为宿主分配的定时器编号，仅用于关联，不作为标签。
pub trait TimerMetrics: Send + Sync {
    fn created(&self, _id: u64) {}

    fn ended(&self, _id: u64, _cancelled: bool) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTimerMetrics;

impl TimerMetrics for NoopTimerMetrics {}

#[derive(Debug)]
pub struct TimerMetricsHook {
    created: GaugeChild,
    active: GaugeChild,
    cancelled: GaugeChild,
    destroyed: GaugeChild,
}

impl TimerMetricsHook {
    pub fn new(factory: &InstrumentFactory) -> Result<Self> {
        let timers = factory.timers()?;
        Ok(Self {
            created: timers.with_label_values(&[timer_state::CREATED])?,
            active: timers.with_label_values(&[timer_state::ACTIVE])?,
            cancelled: timers.with_label_values(&[timer_state::CANCELLED])?,
            destroyed: timers.with_label_values(&[timer_state::DESTROYED])?,
        })
    }
}

impl TimerMetrics for TimerMetricsHook {
    fn created(&self, _id: u64) {
        self.created.inc();
        self.active.inc();
    }

    fn ended(&self, _id: u64, cancelled: bool) {
        if cancelled {
            self.cancelled.inc();
        }
        self.destroyed.inc();
        self.active.dec();
    }
}
