//! HTTP 请求生命周期场景测试
//!
//! - **核心目标 (Why)**：从宿主视角驱动 `MetricsAdapter` 提供的 HTTP 钩子，
//!   校验在途数、处理数、响应数与时延样本在典型场景下的取值；
//! - **合同 (What)**：每个 `request_begin` 都配对一次 `response_end`，保证没有遗留的未关闭计时。

use std::sync::Arc;

use spark_metrics::http::HttpMethod;
use spark_metrics::{Collector, MetricLabel, MetricsAdapter, MetricsOptions, Registry};

fn adapter(options: MetricsOptions) -> (Arc<Registry>, MetricsAdapter) {
    let registry = Arc::new(Registry::new());
    let adapter = MetricsAdapter::new(options.with_registry(Arc::clone(&registry)))
        .expect("适配层构造应成功");
    (registry, adapter)
}

fn collector(registry: &Registry, name: &str) -> Collector {
    registry
        .get(name)
        .unwrap_or_else(|| panic!("缺少仪表 {name}"))
}

fn label_names(registry: &Registry, name: &str) -> Vec<String> {
    collector(registry, name).descriptor().label_names().to_vec()
}

/// 计数器与 Gauge 取当前值，直方图取样本数。
fn value(registry: &Registry, name: &str, labels: &[&str]) -> f64 {
    match collector(registry, name) {
        Collector::Counter(counter) => counter.with_label_values(labels).expect("标签数量正确").get() as f64,
        Collector::Gauge(gauge) => gauge.with_label_values(labels).expect("标签数量正确").get(),
        Collector::Histogram(histogram) => histogram
            .with_label_values(labels)
            .expect("标签数量正确")
            .get_sample_count() as f64,
    }
}

#[test]
fn single_request_round_trip() {
    let (registry, adapter) = adapter(MetricsOptions::new());
    let server = adapter
        .create_http_server_metrics("0.0.0.0:8080")
        .expect("服务端钩子");

    let metric = server.request_begin(HttpMethod::Get, "/a", "h1");
    let requests = "spark_http_server_requests";
    assert_eq!(value(&registry, requests, &["0.0.0.0:8080", "GET", "h1", "active"]), 1.0);
    assert_eq!(value(&registry, requests, &["0.0.0.0:8080", "GET", "h1", "total"]), 1.0);

    server.response_end(metric, 200);
    assert_eq!(value(&registry, requests, &["0.0.0.0:8080", "GET", "h1", "active"]), 0.0);
    assert_eq!(value(&registry, requests, &["0.0.0.0:8080", "GET", "h1", "processed"]), 1.0);
    assert_eq!(
        value(&registry, "spark_http_server_responses", &["0.0.0.0:8080", "200"]),
        1.0
    );

    let latency = collector(&registry, "spark_http_server_request_time_seconds");
    let latency = latency.as_histogram().expect("时延仪表应为直方图");
    let child = latency.with_label_values(&["0.0.0.0:8080"]).expect("标签数量正确");
    assert_eq!(child.get_sample_count(), 1);
    assert!(child.get_sample_sum() >= 0.0);
}

#[test]
fn each_reset_records_one_latency_sample() {
    let (registry, adapter) = adapter(MetricsOptions::new());
    let server = adapter.create_http_server_metrics("local").expect("服务端钩子");

    let mut metric = server.request_begin(HttpMethod::Put, "/upload", "h1");
    for _ in 0..3 {
        server.request_reset(&mut metric);
    }
    let samples = value(&registry, "spark_http_server_request_time_seconds", &["local"]);
    assert_eq!(samples, 3.0, "每次重置关闭一段计时");

    server.response_end(metric, 500);
    let requests = "spark_http_server_requests";
    assert_eq!(value(&registry, requests, &["local", "PUT", "h1", "reset"]), 3.0);
    assert_eq!(value(&registry, requests, &["local", "PUT", "h1", "processed"]), 1.0);
    assert_eq!(value(&registry, requests, &["local", "PUT", "h1", "active"]), 0.0);
    assert_eq!(
        value(&registry, "spark_http_server_request_time_seconds", &["local"]),
        4.0
    );
}

#[test]
fn disabled_path_shares_one_child() {
    let (_registry, adapter) = adapter(MetricsOptions::new());
    let server = adapter.create_http_server_metrics("local").expect("服务端钩子");

    let first = server.request_begin(HttpMethod::Get, "/a", "h1");
    let second = server.request_begin(HttpMethod::Get, "/b", "h1");
    server.response_end(first, 200);
    server.response_end(second, 200);

    let gauge = adapter
        .registry()
        .gauge(
            spark_metrics::InstrumentDescriptor::gauge("spark_http_server_requests", "")
                .with_label_names(["local_address", "method", "host", "state"]),
        )
        .expect("形状一致");
    assert_eq!(gauge.child_count(), 3, "路径维度关闭时两条路径共用 active/total/processed 三个子项");
    let total = gauge
        .with_label_values(&["local", "GET", "h1", "total"])
        .expect("标签数量正确");
    assert_eq!(total.get(), 2.0);
}

#[test]
fn enabling_path_splits_children() {
    let options = MetricsOptions::new()
        .enable_for_server(MetricLabel::UsePath)
        .disable_for_server(MetricLabel::UseHost);
    let (registry, adapter) = adapter(options);
    let server = adapter.create_http_server_metrics("local").expect("服务端钩子");

    for path in ["/a", "/b", "/a"] {
        let metric = server.request_begin(HttpMethod::Get, path, "ignored");
        server.response_end(metric, 204);
    }

    let requests = "spark_http_server_requests";
    assert_eq!(label_names(&registry, requests), vec!["local_address", "method", "path", "state"]);
    assert_eq!(value(&registry, requests, &["local", "GET", "/a", "total"]), 2.0);
    assert_eq!(value(&registry, requests, &["local", "GET", "/b", "total"]), 1.0);
}

#[test]
fn client_uses_client_label_set() {
    let options = MetricsOptions::new()
        .disable_for_client(MetricLabel::UseHost)
        .enable_for_server(MetricLabel::UsePath);
    let (registry, adapter) = adapter(options);
    let client = adapter.create_http_client_metrics(None).expect("客户端钩子");

    let mut metric = client.request_begin(HttpMethod::Post, "/submit", "api");
    client.request_end(&mut metric);
    client.response_end(metric, 201);
    client.endpoint_created();
    client.request_enqueued();

    let requests = "spark_http_client_requests";
    assert_eq!(label_names(&registry, requests), vec!["local_address", "method", "state"]);
    assert_eq!(value(&registry, requests, &["unknown", "POST", "processed"]), 1.0);
    assert_eq!(
        value(&registry, "spark_http_client_endpoints", &["unknown", "queued"]),
        1.0
    );
    assert_eq!(
        value(&registry, "spark_http_client_request_time_seconds", &["unknown"]),
        2.0,
        "请求体结束与响应结束各关闭一段计时"
    );
}

#[test]
fn websocket_upgrade_is_counted() {
    let (registry, adapter) = adapter(MetricsOptions::new());
    let server = adapter.create_http_server_metrics("local").expect("服务端钩子");

    let metric = server.request_begin(HttpMethod::Get, "/ws", "h1");
    server.upgrade(&metric);
    server.websocket_connected();
    server.response_end(metric, 101);

    assert_eq!(
        value(&registry, "spark_http_server_requests", &["local", "GET", "h1", "upgraded"]),
        1.0
    );
    assert_eq!(value(&registry, "spark_http_server_websockets", &["local"]), 1.0);
    server.websocket_disconnected();
    assert_eq!(value(&registry, "spark_http_server_websockets", &["local"]), 0.0);
}
