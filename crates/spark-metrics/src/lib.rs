//! # spark-metrics
//!
//! ## 定位与职责（Why）
//! - 为宿主运行时提供进程级指标仪表：在 `prometheus` 客户端之上维护按名称唯一的索引，
//!   统一计数器/Gauge/直方图三类仪表的形状校验，并以 Prometheus 文本格式导出；
//! - 在此之上提供按类别开关的观测钩子（HTTP、TCP、UDP、事件总线、资源池、部署单元、定时器），
//!   宿主只需在事件发生时调用，开关与标签基数治理由本 crate 负责。
//!
//! ## 架构嵌入（Where）
//! - `registry`：名称索引、形状校验与 `prometheus::Registry` 的注册同步；
//! - `labels` / `options`：可选标签维度与启动配置；
//! - `factory`：命名约定与仪表归属；
//! - `http`、`tcp`、`datagram`、`event_bus`、`pool`、`units`、`timers`：各类别钩子；
//! - `adapter`：宿主入口，按配置选择真实钩子或空实现；
//! - `exposition`：基于 `prometheus::TextEncoder` 的文本格式编码。
//!
//! ## 约束（Trade-offs）
//! - 钩子运行在宿主 I/O 线程上，任何方法都不阻塞、不返回错误；装配期错误只出现在构造路径；
//! - 本 crate 不安装 `tracing` 订阅者，日志去向由宿主决定。

/// 宿主入口与类别开关。
pub mod adapter;

/// 仪表名称与标签的稳定常量。
pub mod contract;

pub mod datagram;

/// 错误类型与 crate 级 `Result` 别名。
pub mod error;

pub mod event_bus;

/// Prometheus 文本格式编码。
pub mod exposition;

/// 仪表命名与归属跟踪。
pub mod factory;

/// HTTP 服务端与客户端观测。
///
/// - **意图说明 (Why)**：请求生命周期跨越多个回调，需要句柄在阶段之间传递计时；
/// - **契约定位 (What)**：中间阶段借用句柄，终结阶段按值消费。
pub mod http;

/// 可选标签维度与有序标签模式。
pub mod labels;

/// 启动配置。
pub mod options;

pub mod pool;

/// 仪表注册表。
///
/// - **意图说明 (Why)**：同名仪表至多一个实例，形状冲突在装配期暴露；
/// - **风险提示 (Trade-offs)**：`gather` 委托给导出注册表逐个采集，跨仪表不保证同一时刻。
pub mod registry;

pub mod tcp;
pub mod timers;
pub mod units;

pub use adapter::MetricsAdapter;
pub use error::{InstrumentShape, MetricsError, Result};
pub use exposition::{Encoder, TEXT_FORMAT, TextEncoder, encode_text};
pub use factory::InstrumentFactory;
pub use labels::{
    Dimension, LabelContext, LabelSchema, LabelSet, MetricLabel, Observation, label_names,
    label_values,
};
pub use options::{CategorySet, MetricsCategory, MetricsOptions};
pub use registry::{
    Collector, Counter, CounterChild, DEFAULT_BUCKETS, Gauge, GaugeChild, Histogram,
    HistogramChild, HistogramTimer, InstrumentDescriptor, InstrumentKind, Registry,
};
pub use prometheus::proto::MetricFamily;
