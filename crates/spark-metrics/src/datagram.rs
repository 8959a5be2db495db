//! UDP 套接字观测。
//!
//! 套接字可能先创建、后绑定，本地地址在 `listening` 之前未知，因此地址放在读写锁中，
//! 绑定前的事件记在 `unknown` 下。

use std::sync::Arc;

use parking_lot::RwLock;

use crate::contract::subsystem::DATAGRAM;
use crate::contract::{UNKNOWN, bytes_type};
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::registry::{Counter, child_or_warn};

pub trait DatagramMetrics: Send + Sync {
    fn listening(&self, _local_address: &str) {}

    fn bytes_read(&self, _bytes: u64) {}

    fn bytes_written(&self, _bytes: u64) {}

    fn exception_occurred(&self, _class: &str) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopDatagramMetrics;

impl DatagramMetrics for NoopDatagramMetrics {}

#[derive(Debug)]
pub struct DatagramMetricsHook {
    local_address: RwLock<Arc<str>>,
    bytes: Arc<Counter>,
    errors: Arc<Counter>,
}

impl DatagramMetricsHook {
    pub fn new(factory: &InstrumentFactory) -> Result<Self> {
        Ok(Self {
            local_address: RwLock::new(Arc::from(UNKNOWN)),
            bytes: factory.bytes(DATAGRAM)?,
            errors: factory.errors(DATAGRAM)?,
        })
    }

    pub fn local_address(&self) -> Arc<str> {
        Arc::clone(&self.local_address.read())
    }

    fn add_bytes(&self, kind: &str, bytes: u64) {
        let local = self.local_address();
        if let Some(child) = child_or_warn(self.bytes.with_label_values(&[&*local, kind])) {
            child.inc_by(bytes);
        }
    }
}

impl DatagramMetrics for DatagramMetricsHook {
    fn listening(&self, local_address: &str) {
        *self.local_address.write() = Arc::from(local_address);
    }

    fn bytes_read(&self, bytes: u64) {
        self.add_bytes(bytes_type::READ, bytes);
    }

    fn bytes_written(&self, bytes: u64) {
        self.add_bytes(bytes_type::WRITTEN, bytes);
    }

    fn exception_occurred(&self, class: &str) {
        let local = self.local_address();
        if let Some(child) = child_or_warn(self.errors.with_label_values(&[&*local, class])) {
            child.inc();
        }
    }
}
