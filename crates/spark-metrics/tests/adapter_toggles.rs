//! 适配层类别开关与关闭语义
//!
//! - **核心目标 (Why)**：关闭的类别不得向注册表写入任何仪表；`close` 可重复调用，并且只移除自己创建的仪表；
//! - **合同 (What)**：每个测试使用独立注册表，断言基于 `Registry::names` 的精确集合。

use std::sync::Arc;

use spark_metrics::event_bus::ReplyFailure;
use spark_metrics::http::HttpMethod;
use spark_metrics::{
    CategorySet, InstrumentDescriptor, MetricsAdapter, MetricsCategory, MetricsOptions, Registry,
};

fn options_with(registry: &Arc<Registry>, categories: CategorySet) -> MetricsOptions {
    MetricsOptions::new()
        .with_categories(categories)
        .with_registry(Arc::clone(registry))
}

#[test]
fn all_disabled_registers_nothing() {
    let registry = Arc::new(Registry::new());
    let adapter = MetricsAdapter::new(options_with(&registry, CategorySet::NONE)).expect("构造应成功");

    adapter.unit_deployed("Worker");
    adapter.timer_created(1);
    adapter.timer_ended(1, false);

    let server = adapter.create_http_server_metrics("local").expect("空实现");
    let metric = server.request_begin(HttpMethod::Get, "/", "h");
    assert!(!metric.is_timing(), "空实现的句柄不计时");
    server.response_end(metric, 200);

    adapter.create_http_client_metrics(None).expect("空实现").endpoint_created();
    adapter.create_net_server_metrics("local").expect("空实现").connected();
    adapter.create_net_client_metrics(None).expect("空实现").bytes_read(3);
    adapter.create_datagram_metrics().expect("空实现").bytes_written(3);
    adapter
        .create_event_bus_metrics()
        .expect("空实现")
        .reply_failure("a", ReplyFailure::NoHandlers);
    let pool = adapter.create_pool_metrics("worker", "default", 8).expect("空实现");
    let usage = pool.dequeue(pool.enqueue());
    pool.end(usage, true);

    assert!(registry.is_empty(), "关闭的类别不得注册任何仪表");
}

#[test]
fn units_and_timers_are_registered_at_construction() {
    let registry = Arc::new(Registry::new());
    let categories = CategorySet::NONE
        .with(MetricsCategory::Units)
        .with(MetricsCategory::Timers);
    let adapter = MetricsAdapter::new(options_with(&registry, categories)).expect("构造应成功");

    assert_eq!(registry.names(), vec!["spark_timers_number", "spark_units_number"]);

    adapter.unit_deployed("Worker");
    adapter.unit_deployed("Worker");
    adapter.unit_undeployed("Worker");
    let units = registry
        .gauge(InstrumentDescriptor::gauge("spark_units_number", "").with_label_names(["class"]))
        .expect("形状一致");
    assert_eq!(units.with_label_values(&["Worker"]).expect("标签").get(), 1.0);
}

#[test]
fn only_enabled_categories_produce_instruments() {
    let registry = Arc::new(Registry::new());
    let categories = CategorySet::NONE.with(MetricsCategory::NetServer);
    let adapter = MetricsAdapter::new(options_with(&registry, categories)).expect("构造应成功");

    let tcp = adapter.create_net_server_metrics("0.0.0.0:7000").expect("真实钩子");
    tcp.connected();
    adapter.create_net_client_metrics(None).expect("空实现").connected();

    assert!(adapter.is_enabled(MetricsCategory::NetServer));
    assert!(!adapter.is_enabled(MetricsCategory::NetClient));
    assert!(registry.names().iter().all(|name| name.starts_with("spark_net_server_")));
}

#[test]
fn close_twice_removes_everything_once() {
    let registry = Arc::new(Registry::new());
    let adapter = MetricsAdapter::new(options_with(&registry, CategorySet::ALL)).expect("构造应成功");

    adapter.create_http_server_metrics("local").expect("服务端");
    adapter.create_http_client_metrics(Some("local")).expect("客户端");
    adapter.create_net_server_metrics("local").expect("TCP 服务端");
    adapter.create_net_client_metrics(None).expect("TCP 客户端");
    adapter.create_datagram_metrics().expect("UDP");
    adapter.create_event_bus_metrics().expect("事件总线");
    adapter.create_pool_metrics("worker", "default", 4).expect("资源池");
    assert!(!registry.is_empty());

    adapter.close();
    adapter.close();
    assert!(adapter.is_closed());
    assert!(registry.is_empty(), "关闭后不应残留适配层创建的仪表");
}

#[test]
fn close_keeps_foreign_instruments() {
    let registry = Arc::new(Registry::new());
    registry
        .counter(InstrumentDescriptor::counter("spark_host_restarts", "restarts"))
        .expect("宿主自有仪表");

    let adapter = MetricsAdapter::new(options_with(&registry, CategorySet::ALL)).expect("构造应成功");
    adapter.create_net_server_metrics("local").expect("TCP 服务端");
    adapter.close();

    assert_eq!(registry.names(), vec!["spark_host_restarts"]);
}

#[test]
fn hooks_requested_after_close_are_noops() {
    let registry = Arc::new(Registry::new());
    let adapter = MetricsAdapter::new(options_with(&registry, CategorySet::ALL)).expect("构造应成功");
    adapter.close();

    let tcp = adapter.create_net_server_metrics("local").expect("空实现");
    tcp.connected();
    assert!(registry.is_empty(), "关闭后不得重新注册仪表");
}

#[test]
fn shape_conflict_aborts_construction() {
    let registry = Arc::new(Registry::new());
    registry
        .counter(InstrumentDescriptor::counter("spark_units_number", "clash"))
        .expect("抢先注册同名计数器");

    let err = MetricsAdapter::new(options_with(&registry, CategorySet::ALL))
        .expect_err("同名不同形状必须中止构造");
    assert!(err.is_wiring_error());
}

#[test]
fn failed_construction_leaves_no_instruments_behind() {
    let registry = Arc::new(Registry::new());
    registry
        .counter(InstrumentDescriptor::counter("spark_timers_number", "clash"))
        .expect("抢先注册同名计数器");

    let err = MetricsAdapter::new(options_with(&registry, CategorySet::ALL))
        .expect_err("定时器仪表冲突应中止构造");
    assert!(err.is_wiring_error());
    assert_eq!(
        registry.names(),
        vec!["spark_timers_number"],
        "已建好的部署单元仪表必须随失败一起撤销"
    );
}

#[test]
fn failed_hook_creation_rolls_back_its_instruments() {
    let registry = Arc::new(Registry::new());
    registry
        .counter(
            InstrumentDescriptor::counter("spark_http_server_websockets", "clash")
                .with_label_names(["local_address"]),
        )
        .expect("抢先注册同名计数器");

    let categories = CategorySet::NONE.with(MetricsCategory::HttpServer);
    let adapter = MetricsAdapter::new(options_with(&registry, categories)).expect("构造应成功");
    let Err(err) = adapter.create_http_server_metrics("local") else {
        panic!("websockets 仪表冲突应中止钩子创建");
    };
    assert!(err.is_wiring_error());
    assert_eq!(registry.names(), vec!["spark_http_server_websockets"]);

    adapter.close();
    assert_eq!(registry.names(), vec!["spark_http_server_websockets"]);
}
