use std::sync::Arc;

use crate::contract::endpoint_state;
use crate::contract::subsystem::HTTP_CLIENT;
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::labels::LabelSet;
use crate::registry::GaugeChild;
use crate::tcp::{TcpMetrics, TcpMetricsHook};

use super::{HttpMethod, HttpRequestMetrics, RequestMetric};

/// HTTP 客户端事件钩子。
///
/// 请求生命周期与服务端一致；端点事件描述连接池中单个目标的创建、连接与排队。
pub trait HttpClientMetrics: TcpMetrics {
    fn request_begin(&self, method: HttpMethod, path: &str, host: &str) -> RequestMetric {
        RequestMetric::detached(method, path, host)
    }

    fn request_end(&self, _metric: &mut RequestMetric) {}

    fn request_reset(&self, _metric: &mut RequestMetric) {}

    fn response_end(&self, _metric: RequestMetric, _status: u16) {}

    fn endpoint_created(&self) {}

    fn endpoint_destroyed(&self) {}

    fn endpoint_connected(&self) {}

    fn endpoint_disconnected(&self) {}

    fn request_enqueued(&self) {}

    fn request_dequeued(&self) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHttpClientMetrics;

impl TcpMetrics for NoopHttpClientMetrics {}

impl HttpClientMetrics for NoopHttpClientMetrics {}

#[derive(Debug)]
struct EndpointGauges {
    active: GaugeChild,
    connected: GaugeChild,
    queued: GaugeChild,
}

/// 写入注册表的 HTTP 客户端钩子。
#[derive(Debug)]
pub struct HttpClientMetricsHook {
    tcp: TcpMetricsHook,
    requests: HttpRequestMetrics,
    endpoints: EndpointGauges,
}

impl HttpClientMetricsHook {
    pub fn new(
        local_address: impl Into<Arc<str>>,
        enabled: LabelSet,
        factory: &InstrumentFactory,
    ) -> Result<Self> {
        let local_address: Arc<str> = local_address.into();
        let tcp = TcpMetricsHook::new(HTTP_CLIENT, Arc::clone(&local_address), factory)?;
        let requests =
            HttpRequestMetrics::new(HTTP_CLIENT, Arc::clone(&local_address), enabled, factory)?;
        let gauge = factory.endpoints(HTTP_CLIENT)?;
        let endpoints = EndpointGauges {
            active: gauge.with_label_values(&[&*local_address, endpoint_state::ACTIVE])?,
            connected: gauge.with_label_values(&[&*local_address, endpoint_state::CONNECTED])?,
            queued: gauge.with_label_values(&[&*local_address, endpoint_state::QUEUED])?,
        };
        Ok(Self {
            tcp,
            requests,
            endpoints,
        })
    }

    pub fn requests(&self) -> &HttpRequestMetrics {
        &self.requests
    }
}

impl TcpMetrics for HttpClientMetricsHook {
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

impl HttpClientMetrics for HttpClientMetricsHook {
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

    fn endpoint_created(&self) {
        self.endpoints.active.inc();
    }

    fn endpoint_destroyed(&self) {
        self.endpoints.active.dec();
    }

    fn endpoint_connected(&self) {
        self.endpoints.connected.inc();
    }

    fn endpoint_disconnected(&self) {
        self.endpoints.connected.dec();
    }

    fn request_enqueued(&self) {
        self.endpoints.queued.inc();
    }

    fn request_dequeued(&self) {
        self.endpoints.queued.dec();
    }
}
