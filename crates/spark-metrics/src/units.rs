//! 部署单元数量，按单元类别计数。

use std::sync::Arc;

use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::registry::{Gauge, child_or_warn};

pub trait UnitMetrics: Send + Sync {
    fn deployed(&self, _class: &str) {}

    fn undeployed(&self, _class: &str) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopUnitMetrics;

impl UnitMetrics for NoopUnitMetrics {}

#[derive(Debug)]
pub struct UnitMetricsHook {
    units: Arc<Gauge>,
}

impl UnitMetricsHook {
    pub fn new(factory: &InstrumentFactory) -> Result<Self> {
        Ok(Self {
            units: factory.units()?,
        })
    }

    fn adjust(&self, class: &str, delta: f64) {
        if let Some(child) = child_or_warn(self.units.with_label_values(&[class])) {
            child.add(delta);
        }
    }
}

impl UnitMetrics for UnitMetricsHook {
    fn deployed(&self, class: &str) {
        self.adjust(class, 1.0);
    }

    fn undeployed(&self, class: &str) {
        self.adjust(class, -1.0);
    }
}
