use std::fmt;

use prometheus::GaugeVec;

use crate::error::Result;

use super::child_count;
use super::descriptor::InstrumentDescriptor;

/// Gauge 子项。初始值为 `0.0`，克隆共享同一累加器。
pub type GaugeChild = prometheus::Gauge;

/// 可增可减的瞬时值。
///
/// # 教案式说明
/// - **意图 (Why)**：活跃连接、在途请求、队列深度等需要双向调整的量；
/// - **执行 (How)**：底层为 [`GaugeVec`]，子项以原子 `f64` 完成读改写，并发的增减不会互相覆盖；
/// - **风险提示 (Trade-offs)**：高争用下子项内部的 CAS 可能重试，单次调整仍为常数开销。
#[derive(Clone)]
pub struct Gauge {
    descriptor: InstrumentDescriptor,
    vec: GaugeVec,
}

impl Gauge {
    pub(crate) fn new(descriptor: InstrumentDescriptor) -> Result<Self> {
        let vec = GaugeVec::new(descriptor.opts(), &descriptor.label_name_refs())?;
        Ok(Self { descriptor, vec })
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    pub fn with_label_values<S: AsRef<str>>(&self, values: &[S]) -> Result<GaugeChild> {
        let values = self.descriptor.label_value_refs(values)?;
        Ok(self.vec.get_metric_with_label_values(&values)?)
    }

    pub fn child_count(&self) -> usize {
        child_count(&self.vec)
    }

    pub(crate) fn vec(&self) -> &GaugeVec {
        &self.vec
    }
}

impl fmt::Debug for Gauge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gauge")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}
