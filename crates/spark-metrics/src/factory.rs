//! # factory 模块说明
//!
//! ## 角色定位（Why）
//! - 各类别钩子共用同一批仪表（例如所有 HTTP 服务端实例共享 `spark_http_server_requests`），
//!   名称拼接与标签定义集中在这里，钩子只关心事件；
//! - 工厂记录“由自己创建”的仪表，关闭时只注销这些实例，不会误删其他组件注册的同名仪表。
//!
//! ## 契约（What）
//! - 名称格式 `spark_<subsystem>_<suffix>`；
//! - 重复请求返回同一仪表；形状冲突作为装配期错误返回；
//! - [`InstrumentFactory::scoped`] 把一次装配中的多次创建视为整体，任一步失败时撤销本次新建的仪表；
//! - [`InstrumentFactory::close`] 幂等，返回本次实际注销的数量；关闭后的创建请求返回
//!   [`MetricsError::Closed`]，与关闭并发的创建不会在注册表中留下仪表。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use tracing::debug;

use crate::contract::{NAMESPACE, label, subsystem};
use crate::error::{MetricsError, Result};
use crate::labels::{LabelSchema, LabelSet};
use crate::registry::{
    Collector, Counter, Gauge, Histogram, InstrumentDescriptor, InstrumentKind, Registry,
    downcast, requested_shape,
};

#[derive(Debug)]
pub struct InstrumentFactory {
    registry: Arc<Registry>,
    created: DashMap<Arc<str>, Collector>,
    closed: AtomicBool,
}

impl InstrumentFactory {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self {
            registry,
            created: DashMap::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// 由本工厂创建且尚未注销的仪表名，按字典序排列。
    pub fn created_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .created
            .iter()
            .map(|entry| entry.key().to_string())
            .collect();
        names.sort();
        names
    }

    /// 在一次装配中创建多个仪表。
    ///
    /// - **契约 (What)**：`build` 成功时，其间新建的仪表归入本工厂；失败时逐一注销后原样返回错误，
    ///   注册表中不留下无人持有的仪表；
    /// - **执行 (How)**：`build` 面对的是共享注册表的临时工厂，成功后再把记录并入本工厂；
    ///   并入后若发现本工厂已关闭，同样撤销并返回 [`MetricsError::Closed`]。
    pub fn scoped<T, F>(&self, build: F) -> Result<T>
    where
        F: FnOnce(&InstrumentFactory) -> Result<T>,
    {
        if self.is_closed() {
            return Err(MetricsError::Closed);
        }
        let scope = InstrumentFactory::new(Arc::clone(&self.registry));
        match build(&scope) {
            Ok(value) => {
                self.adopt(scope)?;
                Ok(value)
            }
            Err(err) => {
                let removed = scope.close();
                debug!(
                    target: "spark_metrics::factory",
                    removed,
                    error = %err,
                    "partial instrument set rolled back"
                );
                Err(err)
            }
        }
    }

    fn adopt(&self, scope: InstrumentFactory) -> Result<()> {
        let adopted: Vec<Collector> = scope
            .created
            .into_iter()
            .map(|(_, collector)| collector)
            .collect();
        for collector in &adopted {
            self.created
                .insert(Arc::from(collector.name()), collector.clone());
        }
        if self.is_closed() {
            for collector in &adopted {
                self.release(collector);
            }
            return Err(MetricsError::Closed);
        }
        Ok(())
    }

    fn track(&self, descriptor: InstrumentDescriptor) -> Result<Collector> {
        if self.is_closed() {
            return Err(MetricsError::Closed);
        }
        let (collector, created) = self.registry.get_or_create_tracked(descriptor)?;
        if created {
            self.created
                .insert(Arc::from(collector.name()), collector.clone());
            // close 可能已在插入之前清扫完毕。
            if self.is_closed() {
                self.release(&collector);
                return Err(MetricsError::Closed);
            }
        }
        Ok(collector)
    }

    fn release(&self, collector: &Collector) {
        self.created
            .remove_if(collector.name(), |_, tracked| tracked.ptr_eq(collector));
        self.registry.unregister_instance(collector);
    }

    pub fn counter(&self, descriptor: InstrumentDescriptor) -> Result<Arc<Counter>> {
        let requested = requested_shape(&descriptor, InstrumentKind::Counter);
        downcast(&self.track(descriptor)?, requested, Collector::as_counter)
    }

    pub fn gauge(&self, descriptor: InstrumentDescriptor) -> Result<Arc<Gauge>> {
        let requested = requested_shape(&descriptor, InstrumentKind::Gauge);
        downcast(&self.track(descriptor)?, requested, Collector::as_gauge)
    }

    pub fn histogram(&self, descriptor: InstrumentDescriptor) -> Result<Arc<Histogram>> {
        let requested = requested_shape(&descriptor, InstrumentKind::Histogram);
        downcast(&self.track(descriptor)?, requested, Collector::as_histogram)
    }

    /// `spark_<subsystem>_requests{local_address, method, [host], [path], state}`。
    pub fn requests(&self, subsystem: &str, enabled: LabelSet) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem, "requests"),
                "Number of processed requests by state",
            )
            .with_label_names(LabelSchema::requests(enabled).names()),
        )
    }

    /// `spark_<subsystem>_responses{local_address, status}`。
    pub fn responses(&self, subsystem: &str) -> Result<Arc<Counter>> {
        self.counter(
            InstrumentDescriptor::counter(
                metric_name(subsystem, "responses"),
                "Number of responses by status code",
            )
            .with_label_names(LabelSchema::responses().names()),
        )
    }

    /// `spark_<subsystem>_request_time_seconds{local_address}`。
    pub fn request_time(&self, subsystem: &str) -> Result<Arc<Histogram>> {
        self.histogram(
            InstrumentDescriptor::histogram(
                metric_name(subsystem, "request_time_seconds"),
                "Request processing time in seconds",
            )
            .with_label_names([label::LOCAL_ADDRESS]),
        )
    }

    /// `spark_<subsystem>_connections{local_address}`。
    pub fn connections(&self, subsystem: &str) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem, "connections"),
                "Number of opened connections",
            )
            .with_label_names([label::LOCAL_ADDRESS]),
        )
    }

    /// `spark_<subsystem>_websockets{local_address}`。
    pub fn websockets(&self, subsystem: &str) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem, "websockets"),
                "Number of connected websockets",
            )
            .with_label_names([label::LOCAL_ADDRESS]),
        )
    }

    /// `spark_<subsystem>_endpoints{local_address, state}`。
    pub fn endpoints(&self, subsystem: &str) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem, "endpoints"),
                "Number of client endpoints by state",
            )
            .with_label_names([label::LOCAL_ADDRESS, label::STATE]),
        )
    }

    /// `spark_<subsystem>_bytes{local_address, type}`。
    pub fn bytes(&self, subsystem: &str) -> Result<Arc<Counter>> {
        self.counter(
            InstrumentDescriptor::counter(
                metric_name(subsystem, "bytes"),
                "Number of bytes read or written",
            )
            .with_label_names([label::LOCAL_ADDRESS, label::TYPE]),
        )
    }

    /// `spark_<subsystem>_errors{local_address, class}`。
    pub fn errors(&self, subsystem: &str) -> Result<Arc<Counter>> {
        self.counter(
            InstrumentDescriptor::counter(
                metric_name(subsystem, "errors"),
                "Number of errors by error class",
            )
            .with_label_names([label::LOCAL_ADDRESS, label::CLASS]),
        )
    }

    /// `spark_units_number{class}`。
    pub fn units(&self) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem::UNITS, "number"),
                "Number of deployed units by class",
            )
            .with_label_names([label::CLASS]),
        )
    }

    /// `spark_timers_number{state}`。
    pub fn timers(&self) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem::TIMERS, "number"),
                "Number of host timers by state",
            )
            .with_label_names([label::STATE]),
        )
    }

    /// `spark_eventbus_handlers{address}`。
    pub fn event_bus_handlers(&self) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem::EVENT_BUS, "handlers"),
                "Number of registered event bus handlers",
            )
            .with_label_names([label::ADDRESS]),
        )
    }

    /// `spark_eventbus_messages{address, state}`。
    pub fn event_bus_messages(&self) -> Result<Arc<Counter>> {
        self.counter(
            InstrumentDescriptor::counter(
                metric_name(subsystem::EVENT_BUS, "messages"),
                "Number of event bus messages by state",
            )
            .with_label_names([label::ADDRESS, label::STATE]),
        )
    }

    /// `spark_eventbus_failures{address, reason}`。
    pub fn event_bus_failures(&self) -> Result<Arc<Counter>> {
        self.counter(
            InstrumentDescriptor::counter(
                metric_name(subsystem::EVENT_BUS, "failures"),
                "Number of event bus reply failures",
            )
            .with_label_names([label::ADDRESS, label::REASON]),
        )
    }

    /// `spark_pool_tasks{pool_type, pool_name, state}`。
    pub fn pool_tasks(&self) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem::POOL, "tasks"),
                "Number of pool tasks by state",
            )
            .with_label_names([label::POOL_TYPE, label::POOL_NAME, label::STATE]),
        )
    }

    /// `spark_pool_max_size{pool_type, pool_name}`。
    pub fn pool_max_size(&self) -> Result<Arc<Gauge>> {
        self.gauge(
            InstrumentDescriptor::gauge(
                metric_name(subsystem::POOL, "max_size"),
                "Configured maximum pool size",
            )
            .with_label_names([label::POOL_TYPE, label::POOL_NAME]),
        )
    }

    /// `spark_pool_completed{pool_type, pool_name, result}`。
    pub fn pool_completed(&self) -> Result<Arc<Counter>> {
        self.counter(
            InstrumentDescriptor::counter(
                metric_name(subsystem::POOL, "completed"),
                "Number of finished pool tasks by result",
            )
            .with_label_names([label::POOL_TYPE, label::POOL_NAME, label::RESULT]),
        )
    }

    /// `spark_pool_<phase>_time_seconds{pool_type, pool_name}`，`phase` 为 `queue` 或 `usage`。
    pub fn pool_time(&self, phase: &str) -> Result<Arc<Histogram>> {
        self.histogram(
            InstrumentDescriptor::histogram(
                metric_name(subsystem::POOL, &format!("{phase}_time_seconds")),
                "Time spent in a pool phase in seconds",
            )
            .with_label_names([label::POOL_TYPE, label::POOL_NAME]),
        )
    }

    /// 注销本工厂创建的全部仪表，返回实际移除的数量。重复调用返回 `0`。
    pub fn close(&self) -> usize {
        if self.closed.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let mut removed = 0;
        self.created.retain(|_, collector| {
            if self.registry.unregister_instance(collector) {
                removed += 1;
            }
            false
        });
        removed
    }
}

fn metric_name(subsystem: &str, suffix: &str) -> String {
    format!("{NAMESPACE}_{subsystem}_{suffix}")
}
