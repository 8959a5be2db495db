use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use spark_metrics::http::HttpMethod;
use spark_metrics::{CategorySet, MetricsAdapter, MetricsOptions, Registry};

/// 单次请求的完整钩子路径：`request_begin` + `response_end`。
///
/// # 设计目的（Why）
/// - 钩子运行在宿主 I/O 线程上，开销直接计入每个请求的延迟；
/// - 同时测量真实钩子与空实现，二者差值即为开启观测的代价。
///
/// # 执行逻辑（How）
/// - 每个基准使用独立注册表，预先创建钩子，循环内只包含事件调用。
fn bench_request_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("http_server_request");

    for (label, categories) in [("enabled", CategorySet::ALL), ("disabled", CategorySet::NONE)] {
        let options = MetricsOptions::new()
            .with_categories(categories)
            .with_registry(Arc::new(Registry::new()));
        let Ok(adapter) = MetricsAdapter::new(options) else {
            panic!("适配层构造失败");
        };
        let Ok(server) = adapter.create_http_server_metrics("0.0.0.0:8080") else {
            panic!("服务端钩子构造失败");
        };

        group.bench_function(label, |b| {
            b.iter(|| {
                let metric = server.request_begin(HttpMethod::Get, black_box("/a"), "h1");
                server.response_end(metric, black_box(200));
            })
        });
    }
    group.finish();
}

/// 固定标签的 TCP 字节计数，只有一次原子加法。
fn bench_tcp_bytes(c: &mut Criterion) {
    let options = MetricsOptions::new().with_registry(Arc::new(Registry::new()));
    let Ok(adapter) = MetricsAdapter::new(options) else {
        panic!("适配层构造失败");
    };
    let Ok(tcp) = adapter.create_net_server_metrics("0.0.0.0:9000") else {
        panic!("TCP 钩子构造失败");
    };
    c.bench_function("tcp_bytes_read", |b| b.iter(|| tcp.bytes_read(black_box(512))));
}

criterion_group!(metrics_benches, bench_request_round_trip, bench_tcp_bytes);
criterion_main!(metrics_benches);
