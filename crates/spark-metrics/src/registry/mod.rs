//! # registry 模块说明
//!
//! ## 角色定位（Why）
//! - 进程内按名称唯一索引仪表，保证同名仪表至多存在一个实例，重复请求返回同一实例；
//! - 供钩子在装配期创建仪表、在运行期按标签取值更新子累加器，供导出端在任意时刻采集快照。
//!
//! ## 并发模型（How）
//! - 仪表本身与采集由 `prometheus` 客户端承担：每个名称对应一个 `*Vec`，注册到内部的
//!   [`prometheus::Registry`]；
//! - 名称索引使用 `DashMap`：查找走分片读锁，创建通过 `entry` 在分片写锁内完成“查-建-注册”，
//!   并发的首次请求只会有一个线程真正构造仪表；注销同样在分片写锁内先从导出端摘除再移出索引，
//!   同名的重建与注销不会交错；
//! - 子累加器为原子量，采集与更新互不阻塞整个注册表。
//!
//! ## 契约（What）
//! - 同名不同形状（类型、标签名或直方图分桶）的请求返回 [`MetricsError::ShapeConflict`]；
//! - `unregister*` 同时移除名称索引与导出端注册，已持有子项的调用方仍可继续写入，
//!   但其数据不再被采集。

mod counter;
mod descriptor;
mod gauge;
mod histogram;

use std::fmt;
use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use prometheus::proto::MetricFamily;
use tracing::{debug, error, warn};

use crate::error::{InstrumentShape, MetricsError, Result};

pub use counter::{Counter, CounterChild};
pub use descriptor::{DEFAULT_BUCKETS, InstrumentDescriptor, InstrumentKind};
pub use gauge::{Gauge, GaugeChild};
pub use histogram::{Histogram, HistogramChild, HistogramTimer};

/// 注册表中的一个条目。
///
/// - 克隆只复制 `Arc`，所有克隆指向同一仪表；
/// - [`Collector::ptr_eq`] 用于判断两个条目是否为同一实例。
#[derive(Clone, Debug)]
pub enum Collector {
    Counter(Arc<Counter>),
    Gauge(Arc<Gauge>),
    Histogram(Arc<Histogram>),
}

impl Collector {
    /// 依据描述构造全新的仪表，尚未注册到任何注册表。
    pub fn from_descriptor(descriptor: InstrumentDescriptor) -> Result<Self> {
        Ok(match descriptor.kind() {
            InstrumentKind::Counter => Collector::Counter(Arc::new(Counter::new(descriptor)?)),
            InstrumentKind::Gauge => Collector::Gauge(Arc::new(Gauge::new(descriptor)?)),
            InstrumentKind::Histogram => {
                Collector::Histogram(Arc::new(Histogram::new(descriptor)?))
            }
        })
    }

    pub fn descriptor(&self) -> &InstrumentDescriptor {
        match self {
            Collector::Counter(counter) => counter.descriptor(),
            Collector::Gauge(gauge) => gauge.descriptor(),
            Collector::Histogram(histogram) => histogram.descriptor(),
        }
    }

    pub fn name(&self) -> &str {
        self.descriptor().name()
    }

    pub fn kind(&self) -> InstrumentKind {
        self.descriptor().kind()
    }

    pub fn shape(&self) -> InstrumentShape {
        self.descriptor().shape()
    }

    pub fn ptr_eq(&self, other: &Collector) -> bool {
        match (self, other) {
            (Collector::Counter(a), Collector::Counter(b)) => Arc::ptr_eq(a, b),
            (Collector::Gauge(a), Collector::Gauge(b)) => Arc::ptr_eq(a, b),
            (Collector::Histogram(a), Collector::Histogram(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    pub fn as_counter(&self) -> Option<&Arc<Counter>> {
        match self {
            Collector::Counter(counter) => Some(counter),
            _ => None,
        }
    }

    pub fn as_gauge(&self) -> Option<&Arc<Gauge>> {
        match self {
            Collector::Gauge(gauge) => Some(gauge),
            _ => None,
        }
    }

    pub fn as_histogram(&self) -> Option<&Arc<Histogram>> {
        match self {
            Collector::Histogram(histogram) => Some(histogram),
            _ => None,
        }
    }

    /// 采集当前全部子项。
    pub fn collect(&self) -> Vec<MetricFamily> {
        prometheus::core::Collector::collect(self.boxed().as_ref())
    }

    /// 供 `prometheus` 注册表注册与摘除的句柄，与本条目共享底层累加器。
    fn boxed(&self) -> Box<dyn prometheus::core::Collector> {
        match self {
            Collector::Counter(counter) => Box::new(counter.vec().clone()),
            Collector::Gauge(gauge) => Box::new(gauge.vec().clone()),
            Collector::Histogram(histogram) => Box::new(histogram.vec().clone()),
        }
    }
}

/// 仪表注册表。
///
/// # 教案式说明
/// - **意图 (Why)**：注册表是可注入的普通值，测试各自持有独立实例；
///   需要进程级共享时使用 [`Registry::global`]；
/// - **契约 (What)**：见模块文档；所有方法均可在任意线程并发调用；
/// - **风险提示 (Trade-offs)**：`gather` 逐个仪表采集，不同仪表之间的快照并非同一时刻。
pub struct Registry {
    exporter: prometheus::Registry,
    collectors: DashMap<Arc<str>, Collector>,
}

static GLOBAL_REGISTRY: OnceLock<Arc<Registry>> = OnceLock::new();

impl Default for Registry {
    fn default() -> Self {
        Self {
            exporter: prometheus::Registry::new(),
            collectors: DashMap::new(),
        }
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进程级默认注册表，首次调用时惰性创建。
    pub fn global() -> Arc<Registry> {
        Arc::clone(GLOBAL_REGISTRY.get_or_init(|| Arc::new(Registry::new())))
    }

    /// 获取或创建仪表。
    ///
    /// - **前置条件**：描述需通过名称与分桶校验；
    /// - **后置条件**：返回的条目与此后同名同形状请求得到的条目 `ptr_eq`；
    /// - 形状不一致时记录 `error` 日志并返回 [`MetricsError::ShapeConflict`]。
    pub fn get_or_create(&self, descriptor: InstrumentDescriptor) -> Result<Collector> {
        self.get_or_create_tracked(descriptor)
            .map(|(collector, _)| collector)
    }

    /// 与 [`Registry::get_or_create`] 相同，额外返回本次调用是否真正创建了仪表。
    pub(crate) fn get_or_create_tracked(
        &self,
        descriptor: InstrumentDescriptor,
    ) -> Result<(Collector, bool)> {
        descriptor.validate()?;

        let existing = self
            .collectors
            .get(descriptor.name())
            .map(|entry| entry.value().clone());
        let (collector, created) = match existing {
            Some(collector) => (collector, false),
            None => match self.collectors.entry(Arc::from(descriptor.name())) {
                Entry::Occupied(occupied) => (occupied.get().clone(), false),
                Entry::Vacant(vacant) => {
                    let collector = Collector::from_descriptor(descriptor.clone())?;
                    self.exporter.register(collector.boxed())?;
                    vacant.insert(collector.clone());
                    (collector, true)
                }
            },
        };

        if created {
            debug!(
                target: "spark_metrics::registry",
                name = descriptor.name(),
                kind = descriptor.kind().as_str(),
                "instrument registered"
            );
            return Ok((collector, true));
        }

        let existing = collector.shape();
        let requested = descriptor.shape();
        if existing != requested {
            error!(
                target: "spark_metrics::registry",
                name = descriptor.name(),
                existing = %existing,
                requested = %requested,
                "instrument shape conflict"
            );
            return Err(MetricsError::ShapeConflict {
                name: descriptor.name().to_owned(),
                existing,
                requested,
            });
        }
        Ok((collector, false))
    }

    /// 获取或创建计数器；同名条目为其他类型时返回形状冲突。
    pub fn counter(&self, descriptor: InstrumentDescriptor) -> Result<Arc<Counter>> {
        let requested = requested_shape(&descriptor, InstrumentKind::Counter);
        downcast(&self.get_or_create(descriptor)?, requested, Collector::as_counter)
    }

    pub fn gauge(&self, descriptor: InstrumentDescriptor) -> Result<Arc<Gauge>> {
        let requested = requested_shape(&descriptor, InstrumentKind::Gauge);
        downcast(&self.get_or_create(descriptor)?, requested, Collector::as_gauge)
    }

    pub fn histogram(&self, descriptor: InstrumentDescriptor) -> Result<Arc<Histogram>> {
        let requested = requested_shape(&descriptor, InstrumentKind::Histogram);
        downcast(&self.get_or_create(descriptor)?, requested, Collector::as_histogram)
    }

    /// 注册外部构造的条目。
    ///
    /// - 同一实例重复注册视为成功；
    /// - 名称已被其他实例占用时返回 [`MetricsError::AlreadyRegistered`]。
    pub fn register(&self, collector: Collector) -> Result<()> {
        collector.descriptor().validate()?;
        match self.collectors.entry(Arc::from(collector.name())) {
            Entry::Occupied(occupied) if occupied.get().ptr_eq(&collector) => Ok(()),
            Entry::Occupied(_) => Err(MetricsError::AlreadyRegistered {
                name: collector.name().to_owned(),
            }),
            Entry::Vacant(vacant) => {
                self.exporter.register(collector.boxed())?;
                debug!(
                    target: "spark_metrics::registry",
                    name = collector.name(),
                    kind = collector.kind().as_str(),
                    "instrument registered"
                );
                vacant.insert(collector);
                Ok(())
            }
        }
    }

    /// 按名称移除条目。
    pub fn unregister(&self, name: &str) -> Option<Collector> {
        match self.collectors.entry(Arc::from(name)) {
            Entry::Occupied(occupied) => {
                self.detach(occupied.get());
                Some(occupied.remove())
            }
            Entry::Vacant(_) => None,
        }
    }

    /// 仅当名称下仍是同一实例时才移除，避免误删他人后来注册的同名仪表。
    pub fn unregister_instance(&self, collector: &Collector) -> bool {
        match self.collectors.entry(Arc::from(collector.name())) {
            Entry::Occupied(occupied) if occupied.get().ptr_eq(collector) => {
                self.detach(occupied.get());
                occupied.remove();
                true
            }
            _ => false,
        }
    }

    /// 清空注册表，返回移除的条目数。
    pub fn unregister_all(&self) -> usize {
        let mut removed = 0;
        self.collectors.retain(|_, collector| {
            self.detach(collector);
            removed += 1;
            false
        });
        debug!(target: "spark_metrics::registry", removed, "registry cleared");
        removed
    }

    /// 从导出端摘除。调用方须持有该名称所在分片的写锁。
    fn detach(&self, collector: &Collector) {
        match self.exporter.unregister(collector.boxed()) {
            Ok(()) => debug!(
                target: "spark_metrics::registry",
                name = collector.name(),
                "instrument unregistered"
            ),
            Err(err) => warn!(
                target: "spark_metrics::registry",
                name = collector.name(),
                error = %err,
                "instrument missing from exporter"
            ),
        }
    }

    pub fn get(&self, name: &str) -> Option<Collector> {
        self.collectors.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.collectors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.collectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collectors.is_empty()
    }

    /// 已注册名称，按字典序排列。
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .collectors
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort();
        names
    }

    /// 采集全部仪表快照，按名称排序；尚无任何子项的仪表不出现在结果中。
    pub fn gather(&self) -> Vec<MetricFamily> {
        self.exporter.gather()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("instruments", &self.collectors.len())
            .finish()
    }
}

pub(crate) fn requested_shape(
    descriptor: &InstrumentDescriptor,
    kind: InstrumentKind,
) -> InstrumentShape {
    descriptor.shape_as(kind)
}

/// 把条目收窄为具体仪表类型，类型不符时报告形状冲突。
pub(crate) fn downcast<T>(
    collector: &Collector,
    requested: InstrumentShape,
    pick: fn(&Collector) -> Option<&Arc<T>>,
) -> Result<Arc<T>> {
    match pick(collector) {
        Some(instrument) => Ok(Arc::clone(instrument)),
        None => Err(MetricsError::ShapeConflict {
            name: collector.name().to_owned(),
            existing: collector.shape(),
            requested,
        }),
    }
}

/// 事件期取子项：标签数量不符时记录告警并丢弃本次观测。
pub(crate) fn child_or_warn<C>(result: Result<C>) -> Option<C> {
    match result {
        Ok(child) => Some(child),
        Err(err) => {
            warn!(
                target: "spark_metrics::registry",
                error = %err,
                "metric observation dropped"
            );
            None
        }
    }
}

/// `*Vec` 当前持有的子项数量。
fn child_count(vec: &dyn prometheus::core::Collector) -> usize {
    prometheus::core::Collector::collect(vec)
        .iter()
        .map(|family| family.get_metric().len())
        .sum()
}
