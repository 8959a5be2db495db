//! TCP 连接类观测：连接数、读写字节与异常。
//!
//! HTTP 服务端与客户端在此之上追加请求生命周期，因此 [`TcpMetrics`] 同时是它们的父 trait。

use std::sync::Arc;

use crate::contract::bytes_type;
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::registry::{Counter, CounterChild, GaugeChild, child_or_warn};

/// TCP 连接事件钩子。
///
/// # 教案式说明
/// - **意图 (Why)**：宿主在连接建立、关闭与收发数据时调用，关闭类别时换成 [`NoopTcpMetrics`]；
/// - **契约 (What)**：所有方法默认空实现，调用方无需判断类别是否开启；方法不得阻塞或失败。
pub trait TcpMetrics: Send + Sync {
    fn connected(&self) {}

    fn disconnected(&self) {}

    fn bytes_read(&self, _bytes: u64) {}

    fn bytes_written(&self, _bytes: u64) {}

    /// `class` 为异常类别名，例如 `ConnectionReset`。
    fn exception_occurred(&self, _class: &str) {}
}

/// 关闭类别时使用的空实现。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopTcpMetrics;

impl TcpMetrics for NoopTcpMetrics {}

/// 写入注册表的 TCP 钩子。
///
/// 标签固定的子项在构造时解析并缓存，热路径只剩一次原子操作。
#[derive(Debug)]
pub struct TcpMetricsHook {
    local_address: Arc<str>,
    connections: GaugeChild,
    read: CounterChild,
    written: CounterChild,
    errors: Arc<Counter>,
}

impl TcpMetricsHook {
    pub fn new(
        subsystem: &str,
        local_address: impl Into<Arc<str>>,
        factory: &InstrumentFactory,
    ) -> Result<Self> {
        let local_address = local_address.into();
        let connections = factory
            .connections(subsystem)?
            .with_label_values(&[&*local_address])?;
        let bytes = factory.bytes(subsystem)?;
        let read = bytes.with_label_values(&[&*local_address, bytes_type::READ])?;
        let written = bytes.with_label_values(&[&*local_address, bytes_type::WRITTEN])?;
        let errors = factory.errors(subsystem)?;
        Ok(Self {
            local_address,
            connections,
            read,
            written,
            errors,
        })
    }

    pub fn local_address(&self) -> &str {
        &self.local_address
    }
}

impl TcpMetrics for TcpMetricsHook {
    fn connected(&self) {
        self.connections.inc();
    }

    fn disconnected(&self) {
        self.connections.dec();
    }

    fn bytes_read(&self, bytes: u64) {
        self.read.inc_by(bytes);
    }

    fn bytes_written(&self, bytes: u64) {
        self.written.inc_by(bytes);
    }

    fn exception_occurred(&self, class: &str) {
        if let Some(child) = child_or_warn(
            self.errors
                .with_label_values(&[&*self.local_address, class]),
        ) {
            child.inc();
        }
    }
}
