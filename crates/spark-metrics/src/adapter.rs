//! # adapter 模块说明
//!
//! ## 角色定位（Why）
//! - 宿主运行时只面对一个入口：启动时用 [`MetricsOptions`] 构造 [`MetricsAdapter`]，
//!   之后为每个服务端、客户端、套接字与资源池索取对应类别的钩子；
//! - 关闭的类别得到空实现，调用方无需在热路径上判断开关。
//!
//! ## 契约（What）
//! - 类别选择在构造时冻结，之后修改配置不影响已有适配层；
//! - `create_*` 在装配期返回 `Result`，形状冲突等错误应中止启动；
//! - 本地地址缺失时记为 `unknown`；
//! - 构造或 `create_*` 失败时，本次调用已新建的仪表全部撤销，注册表回到调用之前的状态；
//! - [`MetricsAdapter::close`] 注销本适配层创建的全部仪表，重复调用无副作用；
//!   关闭后再索取钩子只会得到空实现，与关闭并发的索取同样如此。

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use crate::contract::UNKNOWN;
use crate::contract::subsystem::{NET_CLIENT, NET_SERVER};
use crate::datagram::{DatagramMetrics, DatagramMetricsHook, NoopDatagramMetrics};
use crate::error::{MetricsError, Result};
use crate::event_bus::{EventBusMetrics, EventBusMetricsHook, NoopEventBusMetrics};
use crate::factory::InstrumentFactory;
use crate::http::{
    HttpClientMetrics, HttpClientMetricsHook, HttpServerMetrics, HttpServerMetricsHook,
    NoopHttpClientMetrics, NoopHttpServerMetrics,
};
use crate::labels::LabelContext;
use crate::options::{CategorySet, MetricsCategory, MetricsOptions};
use crate::pool::{NoopPoolMetrics, PoolMetrics, PoolMetricsHook};
use crate::registry::Registry;
use crate::tcp::{NoopTcpMetrics, TcpMetrics, TcpMetricsHook};
use crate::timers::{NoopTimerMetrics, TimerMetrics, TimerMetricsHook};
use crate::units::{NoopUnitMetrics, UnitMetrics, UnitMetricsHook};

/// 宿主运行时的指标入口。
///
/// # 教案式说明
/// - **意图 (Why)**：把“哪些类别开启”从每次事件的分支判断，变成构造时一次性的实现选择；
/// - **执行 (How)**：部署单元与定时器钩子在构造时建立并常驻；其余类别按需创建，
///   每次都依据冻结的 [`CategorySet`] 选择真实钩子或空实现；
/// - **风险提示 (Trade-offs)**：多个适配层共享同一注册表时，仪表归属于首个创建它的适配层，
///   只有该适配层关闭时才会注销。
pub struct MetricsAdapter {
    options: MetricsOptions,
    categories: CategorySet,
    factory: InstrumentFactory,
    units: Box<dyn UnitMetrics>,
    timers: Box<dyn TimerMetrics>,
    closed: AtomicBool,
}

impl MetricsAdapter {
    pub fn new(options: MetricsOptions) -> Result<Self> {
        let categories = options.categories();
        let factory = InstrumentFactory::new(Arc::clone(options.registry()));

        let (units, timers) = factory.scoped(|scope| {
            let units: Box<dyn UnitMetrics> = if categories.contains(MetricsCategory::Units) {
                Box::new(UnitMetricsHook::new(scope)?)
            } else {
                Box::new(NoopUnitMetrics)
            };
            let timers: Box<dyn TimerMetrics> = if categories.contains(MetricsCategory::Timers) {
                Box::new(TimerMetricsHook::new(scope)?)
            } else {
                Box::new(NoopTimerMetrics)
            };
            Ok((units, timers))
        })?;

        info!(
            target: "spark_metrics::adapter",
            categories = ?categories,
            "metrics adapter initialized"
        );
        Ok(Self {
            options,
            categories,
            factory,
            units,
            timers,
            closed: AtomicBool::new(false),
        })
    }

    pub fn options(&self) -> &MetricsOptions {
        &self.options
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.factory.registry()
    }

    pub fn is_enabled(&self, category: MetricsCategory) -> bool {
        self.categories.contains(category)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// 类别开启且适配层尚未关闭时，在一次装配范围内构造真实钩子。
    ///
    /// 返回 `Ok(None)` 表示应使用空实现：类别关闭，或适配层已经（或正在）关闭。
    fn build<T, F>(&self, category: MetricsCategory, make: F) -> Result<Option<T>>
    where
        F: FnOnce(&InstrumentFactory) -> Result<T>,
    {
        if !self.categories.contains(category) {
            return Ok(None);
        }
        if self.is_closed() {
            warn_after_close(category);
            return Ok(None);
        }
        match self.factory.scoped(make) {
            Ok(hook) => Ok(Some(hook)),
            Err(MetricsError::Closed) => {
                warn_after_close(category);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn unit_deployed(&self, class: &str) {
        self.units.deployed(class);
    }

    pub fn unit_undeployed(&self, class: &str) {
        self.units.undeployed(class);
    }

    pub fn timer_created(&self, id: u64) {
        self.timers.created(id);
    }

    pub fn timer_ended(&self, id: u64, cancelled: bool) {
        self.timers.ended(id, cancelled);
    }

    pub fn create_event_bus_metrics(&self) -> Result<Arc<dyn EventBusMetrics>> {
        match self.build(MetricsCategory::EventBus, EventBusMetricsHook::new)? {
            Some(hook) => Ok(Arc::new(hook)),
            None => Ok(Arc::new(NoopEventBusMetrics)),
        }
    }

    pub fn create_http_server_metrics(
        &self,
        local_address: &str,
    ) -> Result<Arc<dyn HttpServerMetrics>> {
        let enabled = self.options.enabled_labels(LabelContext::Server);
        let hook = self.build(MetricsCategory::HttpServer, |factory| {
            HttpServerMetricsHook::new(local_address, enabled, factory)
        })?;
        match hook {
            Some(hook) => Ok(Arc::new(hook)),
            None => Ok(Arc::new(NoopHttpServerMetrics)),
        }
    }

    pub fn create_http_client_metrics(
        &self,
        local_address: Option<&str>,
    ) -> Result<Arc<dyn HttpClientMetrics>> {
        let enabled = self.options.enabled_labels(LabelContext::Client);
        let hook = self.build(MetricsCategory::HttpClient, |factory| {
            HttpClientMetricsHook::new(local_address.unwrap_or(UNKNOWN), enabled, factory)
        })?;
        match hook {
            Some(hook) => Ok(Arc::new(hook)),
            None => Ok(Arc::new(NoopHttpClientMetrics)),
        }
    }

    pub fn create_net_server_metrics(&self, local_address: &str) -> Result<Arc<dyn TcpMetrics>> {
        let hook = self.build(MetricsCategory::NetServer, |factory| {
            TcpMetricsHook::new(NET_SERVER, local_address, factory)
        })?;
        match hook {
            Some(hook) => Ok(Arc::new(hook)),
            None => Ok(Arc::new(NoopTcpMetrics)),
        }
    }

    pub fn create_net_client_metrics(
        &self,
        local_address: Option<&str>,
    ) -> Result<Arc<dyn TcpMetrics>> {
        let hook = self.build(MetricsCategory::NetClient, |factory| {
            TcpMetricsHook::new(NET_CLIENT, local_address.unwrap_or(UNKNOWN), factory)
        })?;
        match hook {
            Some(hook) => Ok(Arc::new(hook)),
            None => Ok(Arc::new(NoopTcpMetrics)),
        }
    }

    pub fn create_datagram_metrics(&self) -> Result<Arc<dyn DatagramMetrics>> {
        match self.build(MetricsCategory::DatagramSocket, DatagramMetricsHook::new)? {
            Some(hook) => Ok(Arc::new(hook)),
            None => Ok(Arc::new(NoopDatagramMetrics)),
        }
    }

    pub fn create_pool_metrics(
        &self,
        pool_type: &str,
        pool_name: &str,
        max_size: usize,
    ) -> Result<Arc<dyn PoolMetrics>> {
        let hook = self.build(MetricsCategory::Pools, |factory| {
            PoolMetricsHook::new(pool_type, pool_name, max_size, factory)
        })?;
        match hook {
            Some(hook) => Ok(Arc::new(hook)),
            None => Ok(Arc::new(NoopPoolMetrics)),
        }
    }

    /// 注销本适配层创建的全部仪表。重复调用直接返回。
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let removed = self.factory.close();
        info!(
            target: "spark_metrics::adapter",
            removed,
            "metrics adapter closed"
        );
    }
}

fn warn_after_close(category: MetricsCategory) {
    warn!(
        target: "spark_metrics::adapter",
        category = category.as_str(),
        "metrics requested after close, using no-op hooks"
    );
}

impl std::fmt::Debug for MetricsAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAdapter")
            .field("categories", &self.categories)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}
