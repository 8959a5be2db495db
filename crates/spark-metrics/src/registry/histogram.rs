use std::fmt;

use prometheus::HistogramVec;

use crate::error::Result;

use super::child_count;
use super::descriptor::InstrumentDescriptor;

/// 直方图子项，克隆共享同一组桶。
pub type HistogramChild = prometheus::Histogram;

/// 一次未关闭的计时。
///
/// - `observe_duration`/`stop_and_record` 按值消费计时器，同一计时不可能被记录两次；
/// - `stop_and_discard` 放弃本次计时；直接丢弃计时器会记录一次样本，
///   需要“不记录”语义的持有者须显式调用 `stop_and_discard`。
pub use prometheus::HistogramTimer;

/// 分桶直方图。
///
/// # 教案式说明
/// - **意图 (Why)**：请求处理时延、池排队时长等需要分布而非单值的观测；
/// - **契约 (What)**：所有子项共享描述中的分桶上界；观测值落入第一个满足 `value <= bound` 的桶，
///   超出最大上界的样本只计入 `+Inf`（即样本总数）；
/// - **执行 (How)**：底层为 [`HistogramVec`]，分桶上界在构造时由描述一次性给定。
#[derive(Clone)]
pub struct Histogram {
    descriptor: InstrumentDescriptor,
    vec: HistogramVec,
}

impl Histogram {
    pub(crate) fn new(descriptor: InstrumentDescriptor) -> Result<Self> {
        let vec = HistogramVec::new(descriptor.histogram_opts(), &descriptor.label_name_refs())?;
        Ok(Self { descriptor, vec })
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }

    pub fn with_label_values<S: AsRef<str>>(&self, values: &[S]) -> Result<HistogramChild> {
        let values = self.descriptor.label_value_refs(values)?;
        Ok(self.vec.get_metric_with_label_values(&values)?)
    }

    pub fn child_count(&self) -> usize {
        child_count(&self.vec)
    }

    pub(crate) fn vec(&self) -> &HistogramVec {
        &self.vec
    }
}

impl fmt::Debug for Histogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Histogram")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use prometheus::core::Metric;

    use super::*;

    fn histogram(bounds: &[f64]) -> Histogram {
        Histogram::new(
            InstrumentDescriptor::histogram("spark_latency_seconds", "latency")
                .with_label_names(["local_address"])
                .with_buckets(bounds.to_vec()),
        )
        .unwrap()
    }

    #[test]
    fn observations_land_in_first_matching_bucket() {
        let histogram = histogram(&[0.1, 1.0]);
        let child = histogram.with_label_values(&["a"]).unwrap();
        child.observe(0.1);
        child.observe(0.5);
        child.observe(5.0);

        let proto = child.metric();
        let buckets: Vec<(f64, u64)> = proto
            .get_histogram()
            .get_bucket()
            .iter()
            .map(|bucket| (bucket.get_upper_bound(), bucket.get_cumulative_count()))
            .collect();
        assert_eq!(buckets, vec![(0.1, 1), (1.0, 2)]);
        assert_eq!(child.get_sample_count(), 3, "超出上界的样本只计入 +Inf");
        assert!((child.get_sample_sum() - 5.6).abs() < 1e-9);
    }

    #[test]
    fn timer_records_exactly_once() {
        let histogram = histogram(&[60.0]);
        let child = histogram.with_label_values(&["a"]).unwrap();

        child.start_timer().observe_duration();
        child.start_timer().stop_and_discard();

        assert_eq!(child.get_sample_count(), 1);
    }
}
