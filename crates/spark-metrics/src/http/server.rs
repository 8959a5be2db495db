use std::sync::Arc;

use crate::contract::subsystem::HTTP_SERVER;
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::labels::LabelSet;
use crate::registry::GaugeChild;
use crate::tcp::{TcpMetrics, TcpMetricsHook};

use super::{HttpMethod, HttpRequestMetrics, RequestMetric};

/// HTTP 服务端事件钩子。
///
/// # 教案式说明
/// - **意图 (Why)**：区分“开始”和“结束”两个切面，中间阶段只借用句柄，终结阶段消费句柄；
/// - **契约 (What)**：默认实现返回不计时的 [`RequestMetric::detached`]，其余方法为空；
///   实现者不得在回调中阻塞。
pub trait HttpServerMetrics: TcpMetrics {
    fn request_begin(&self, method: HttpMethod, path: &str, host: &str) -> RequestMetric {
        RequestMetric::detached(method, path, host)
    }

    fn request_end(&self, _metric: &mut RequestMetric) {}

    fn request_reset(&self, _metric: &mut RequestMetric) {}

    fn response_end(&self, _metric: RequestMetric, _status: u16) {}

    fn upgrade(&self, _metric: &RequestMetric) {}

    fn websocket_connected(&self) {}

    fn websocket_disconnected(&self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHttpServerMetrics;

impl TcpMetrics for NoopHttpServerMetrics {}

impl HttpServerMetrics for NoopHttpServerMetrics {}

/// 写入注册表的 HTTP 服务端钩子。
#[derive(Debug)]
pub struct HttpServerMetricsHook {
    tcp: TcpMetricsHook,
    requests: HttpRequestMetrics,
    websockets: GaugeChild,
}

impl HttpServerMetricsHook {
    pub fn new(
        local_address: impl Into<Arc<str>>,
        enabled: LabelSet,
        factory: &InstrumentFactory,
    ) -> Result<Self> {
        let local_address: Arc<str> = local_address.into();
        let tcp = TcpMetricsHook::new(HTTP_SERVER, Arc::clone(&local_address), factory)?;
        let requests =
            HttpRequestMetrics::new(HTTP_SERVER, Arc::clone(&local_address), enabled, factory)?;
        let websockets = factory
            .websockets(HTTP_SERVER)?
            .with_label_values(&[&*local_address])?;
        Ok(Self {
            tcp,
            requests,
            websockets,
        })
    }

    pub fn requests(&self) -> &HttpRequestMetrics {
        &self.requests
    }
}

impl TcpMetrics for HttpServerMetricsHook {
    fn connected(&self) {
        self.tcp.connected();
    }

    fn disconnected(&self) {
        self.tcp.disconnected();
    }

    fn bytes_read(&self, bytes: u64) {
        self.tcp.bytes_read(bytes);
    }

    fn bytes_written(&self, bytes: u64) {
        self.tcp.bytes_written(bytes);
    }

    fn exception_occurred(&self, class: &str) {
        self.tcp.exception_occurred(class);
    }
}

impl HttpServerMetrics for HttpServerMetricsHook {
    fn request_begin(&self, method: HttpMethod, path: &str, host: &str) -> RequestMetric {
        self.requests.begin(method, path, host)
    }

    fn request_end(&self, metric: &mut RequestMetric) {
        self.requests.request_end(metric);
    }

    fn request_reset(&self, metric: &mut RequestMetric) {
        self.requests.reset(metric);
    }

    fn response_end(&self, metric: RequestMetric, status: u16) {
        self.requests.response_end(metric, status);
    }

    fn upgrade(&self, metric: &RequestMetric) {
        self.requests.upgrade(metric);
    }

    fn websocket_connected(&self) {
        self.websockets.inc();
    }

    fn websocket_disconnected(&self) {
        self.websockets.dec();
    }
}
