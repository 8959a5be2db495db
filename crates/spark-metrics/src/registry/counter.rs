use std::fmt;

use prometheus::{IntCounter, IntCounterVec};

use crate::error::Result;

use super::child_count;
use super::descriptor::InstrumentDescriptor;

/// 计数器子项：`prometheus` 的整型计数器，克隆共享同一累加器。
pub type CounterChild = IntCounter;

/// 单调递增计数器。
///
/// # 教案式说明
/// - **意图 (Why)**：统计请求总数、字节数、错误次数等只增不减的量；
/// - **契约 (What)**：每个标签取值组合对应一个 [`CounterChild`]，同一组合多次查询得到同一累加器；
/// - **执行 (How)**：底层为 [`IntCounterVec`]，子项内部是无锁原子加法；本类型只补充描述与数量校验。
#[derive(Clone)]
pub struct Counter {
    descriptor: InstrumentDescriptor,
    vec: IntCounterVec,
}

impl Counter {
    pub(crate) fn new(descriptor: InstrumentDescriptor) -> Result<Self> {
        let vec = IntCounterVec::new(descriptor.opts(), &descriptor.label_name_refs())?;
        Ok(Self { descriptor, vec })
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    /// 按有序标签值获取子计数器；取值数量不符时返回 `LabelArity`。
    pub fn with_label_values<S: AsRef<str>>(&self, values: &[S]) -> Result<CounterChild> {
        let values = self.descriptor.label_value_refs(values)?;
        Ok(self.vec.get_metric_with_label_values(&values)?)
    }

    /// 已出现过的标签组合数量。
    pub fn child_count(&self) -> usize {
        child_count(&self.vec)
    }

    pub(crate) fn vec(&self) -> &IntCounterVec {
        &self.vec
    }
}

impl fmt::Debug for Counter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Counter")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
