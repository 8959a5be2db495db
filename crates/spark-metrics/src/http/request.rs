//! 多阶段请求生命周期跟踪。
//!
//! # 教案式说明
//! - **意图 (Why)**：一次 HTTP 交换会经历“开始、请求体结束、可能的重置、响应结束”等阶段，
//!   每个阶段都要关闭上一段计时并开启下一段，同时维护在途数量；
//! - **契约 (What)**：
//!   - `begin`：`active` +1、`total` +1，开启计时并返回 [`RequestMetric`]；
//!   - `request_end`：关闭当前计时并开启下一段，不改动计数；
//!   - `reset`：关闭当前计时并开启新计时，`reset` +1；若句柄尚未结算，再做 `processed` +1、`active` −1；
//!   - `response_end`：按值消费句柄，关闭计时，`responses{status}` +1；若尚未结算，同样结算一次；
//!   - `upgrade`：`upgraded` +1，不触碰计时；
//! - **执行 (How)**：中间阶段接收 `&mut RequestMetric`，终结阶段按值接收，
//!   由所有权保证同一句柄不会被终结两次；
//! - **风险提示 (Trade-offs)**：未走到终结阶段就被丢弃的句柄不记录当前段的时延样本，
//!   在途数量也不会回落，由测试覆盖而非运行期检查。

use std::sync::Arc;

use crate::contract::request_state;
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::labels::{LabelSchema, LabelSet, Observation, status_label};
use crate::registry::{Counter, Gauge, HistogramChild, HistogramTimer, child_or_warn};

use super::HttpMethod;

/// 句柄所处阶段。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RequestPhase {
    /// 在途，尚未计入 `processed`。
    Active,
    /// 已经被首次 `reset` 结算。
    Reset,
}

/// 单次请求的跟踪句柄。
///
/// - 身份（方法、路径、主机）创建后不可变；
/// - 只持有一个当前计时，由所属 [`HttpRequestMetrics`] 替换或关闭；
/// - 由调用方独占，不跨线程并发修改。
#[derive(Debug)]
pub struct RequestMetric {
    method: HttpMethod,
    path: String,
    host: String,
    timer: Option<HistogramTimer>,
    phase: RequestPhase,
}

impl RequestMetric {
    /// 不关联任何仪表的句柄，供空实现返回。
    pub fn detached(method: HttpMethod, path: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            host: host.into(),
            timer: None,
            phase: RequestPhase::Active,
        }
    }

    pub fn method(&self) -> &HttpMethod {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn phase(&self) -> RequestPhase {
        self.phase
    }

    /// 是否持有未关闭的计时。
    pub fn is_timing(&self) -> bool {
        self.timer.is_some()
    }

    fn swap_timer(&mut self, next: HistogramTimer) {
        if let Some(previous) = self.timer.replace(next) {
            previous.observe_duration();
        }
    }

    fn close_timer(&mut self) {
        if let Some(previous) = self.timer.take() {
            previous.observe_duration();
        }
    }

    /// 首次调用返回 `true` 并把句柄标记为已结算。
    fn settle(&mut self) -> bool {
        match self.phase {
            RequestPhase::Active => {
                self.phase = RequestPhase::Reset;
                true
            }
            RequestPhase::Reset => false,
        }
    }
}

impl Drop for RequestMetric {
    fn drop(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.stop_and_discard();
        }
    }
}

/// 一个本地地址上的请求计数、响应计数与处理时延。
#[derive(Debug)]
pub struct HttpRequestMetrics {
    local_address: Arc<str>,
    schema: LabelSchema,
    requests: Arc<Gauge>,
    responses: Arc<Counter>,
    process_time: HistogramChild,
}

impl HttpRequestMetrics {
    pub fn new(
        subsystem: &str,
        local_address: impl Into<Arc<str>>,
        enabled: LabelSet,
        factory: &InstrumentFactory,
    ) -> Result<Self> {
        let local_address = local_address.into();
        let requests = factory.requests(subsystem, enabled)?;
        let responses = factory.responses(subsystem)?;
        let process_time = factory
            .request_time(subsystem)?
            .with_label_values(&[&*local_address])?;
        Ok(Self {
            local_address,
            schema: LabelSchema::requests(enabled),
            requests,
            responses,
            process_time,
        })
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    pub fn begin(
        &self,
        method: HttpMethod,
        path: impl Into<String>,
        host: impl Into<String>,
    ) -> RequestMetric {
        let mut metric = RequestMetric::detached(method, path, host);
        metric.timer = Some(self.process_time.start_timer());
        self.adjust(&metric, request_state::ACTIVE, 1.0);
        self.adjust(&metric, request_state::TOTAL, 1.0);
        metric
    }

    pub fn request_end(&self, metric: &mut RequestMetric) {
        metric.swap_timer(self.process_time.start_timer());
    }

    pub fn reset(&self, metric: &mut RequestMetric) {
        metric.swap_timer(self.process_time.start_timer());
        self.adjust(metric, request_state::RESET, 1.0);
        if metric.settle() {
            self.settle(metric);
        }
    }

    pub fn response_end(&self, mut metric: RequestMetric, status: u16) {
        metric.close_timer();
        if metric.settle() {
            self.settle(&metric);
        }
        let status = status_label(status);
        if let Some(child) = child_or_warn(
            self.responses
                .with_label_values(&[&*self.local_address, status.as_ref()]),
        ) {
            child.inc();
        }
    }

    pub fn upgrade(&self, metric: &RequestMetric) {
        self.adjust(metric, request_state::UPGRADED, 1.0);
    }

    fn settle(&self, metric: &RequestMetric) {
        self.adjust(metric, request_state::PROCESSED, 1.0);
        self.adjust(metric, request_state::ACTIVE, -1.0);
    }

    fn adjust(&self, metric: &RequestMetric, state: &str, delta: f64) {
        let observation = Observation {
            local_address: &self.local_address,
            method: metric.method.as_str(),
            host: &metric.host,
            path: &metric.path,
            state,
            status: "",
        };
        let values = self.schema.values(&observation);
        if let Some(child) = child_or_warn(self.requests.with_label_values(&values)) {
            child.add(delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::subsystem::HTTP_SERVER;
    use crate::labels::MetricLabel;
    use crate::registry::Registry;

    fn tracker(enabled: LabelSet) -> (InstrumentFactory, HttpRequestMetrics) {
        let factory = InstrumentFactory::new(Arc::new(Registry::new()));
        let tracker = HttpRequestMetrics::new(HTTP_SERVER, "local", enabled, &factory).unwrap();
        (factory, tracker)
    }

    fn state(tracker: &HttpRequestMetrics, values: &[&str]) -> f64 {
        tracker.requests.with_label_values(values).unwrap().get()
    }

    #[test]
    fn reset_then_response_settles_once() {
        let (_factory, tracker) = tracker(LabelSet::NONE);
        let mut metric = tracker.begin(HttpMethod::Get, "/a", "h1");
        tracker.reset(&mut metric);
        tracker.reset(&mut metric);
        assert_eq!(metric.phase(), RequestPhase::Reset);
        tracker.response_end(metric, 503);

        assert_eq!(state(&tracker, &["local", "GET", "active"]), 0.0);
        assert_eq!(state(&tracker, &["local", "GET", "processed"]), 1.0);
        assert_eq!(state(&tracker, &["local", "GET", "reset"]), 2.0);
        assert_eq!(tracker.process_time.get_sample_count(), 3, "两次重置加一次响应，共三段");
    }

    #[test]
    fn request_end_only_rotates_timer() {
        let (_factory, tracker) = tracker(LabelSet::NONE.with(MetricLabel::UsePath));
        let mut metric = tracker.begin(HttpMethod::Post, "/upload", "h1");
        tracker.request_end(&mut metric);
        assert!(metric.is_timing());
        assert_eq!(tracker.process_time.get_sample_count(), 1);
        assert_eq!(state(&tracker, &["local", "POST", "/upload", "active"]), 1.0);

        tracker.upgrade(&metric);
        tracker.response_end(metric, 101);
        assert_eq!(state(&tracker, &["local", "POST", "/upload", "upgraded"]), 1.0);
        assert_eq!(tracker.process_time.get_sample_count(), 2);
    }

    #[test]
    fn out_of_range_status_is_unknown() {
        let (_factory, tracker) = tracker(LabelSet::NONE);
        let metric = tracker.begin(HttpMethod::Get, "/", "h1");
        tracker.response_end(metric, 999);
        assert_eq!(
            tracker
                .responses
                .with_label_values(&["local", "unknown"])
                .unwrap()
                .get(),
            1
        );
    }

    #[test]
    fn dropped_handle_records_no_sample() {
        let (_factory, tracker) = tracker(LabelSet::NONE);
        let mut metric = tracker.begin(HttpMethod::Get, "/", "h1");
        tracker.request_end(&mut metric);
        drop(metric);
        assert_eq!(tracker.process_time.get_sample_count(), 1, "只记录已关闭的第一段");
    }
}
