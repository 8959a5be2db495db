//! 事件总线观测：处理器数量、消息流转与回复失败。

use std::sync::Arc;

use crate::contract::message_state;
use crate::error::Result;
use crate::factory::InstrumentFactory;
use crate::registry::{Counter, Gauge, child_or_warn};

/// 回复失败原因。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ReplyFailure {
    Timeout,
    NoHandlers,
    RecipientFailure,
}

impl ReplyFailure {
    pub const fn as_str(self) -> &'static str {
        match self {
            ReplyFailure::Timeout => "timeout",
            ReplyFailure::NoHandlers => "no_handlers",
            ReplyFailure::RecipientFailure => "recipient_failure",
        }
    }
}

pub trait EventBusMetrics: Send + Sync {
    fn handler_registered(&self, _address: &str) {}

    fn handler_unregistered(&self, _address: &str) {}

    /// `publish` 为 `true` 表示广播，否则为点对点发送。
    fn message_sent(&self, _address: &str, _publish: bool) {}

    /// `delivered` 为 `false` 表示消息到达但没有本地处理器接收。
    fn message_received(&self, _address: &str, _delivered: bool) {}

    fn reply_failure(&self, _address: &str, _failure: ReplyFailure) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopEventBusMetrics;

impl EventBusMetrics for NoopEventBusMetrics {}

/// 写入注册表的事件总线钩子。地址取值由宿主决定，子项按需创建。
#[derive(Debug)]
pub struct EventBusMetricsHook {
    handlers: Arc<Gauge>,
    messages: Arc<Counter>,
    failures: Arc<Counter>,
}

impl EventBusMetricsHook {
    pub fn new(factory: &InstrumentFactory) -> Result<Self> {
        Ok(Self {
            handlers: factory.event_bus_handlers()?,
            messages: factory.event_bus_messages()?,
            failures: factory.event_bus_failures()?,
        })
    }

    fn handlers_add(&self, address: &str, delta: f64) {
        if let Some(child) = child_or_warn(self.handlers.with_label_values(&[address])) {
            child.add(delta);
        }
    }

    fn message(&self, address: &str, state: &str) {
        if let Some(child) = child_or_warn(self.messages.with_label_values(&[address, state])) {
            child.inc();
        }
    }
}

impl EventBusMetrics for EventBusMetricsHook {
    fn handler_registered(&self, address: &str) {
        self.handlers_add(address, 1.0);
    }

    fn handler_unregistered(&self, address: &str) {
        self.handlers_add(address, -1.0);
    }

    fn message_sent(&self, address: &str, publish: bool) {
        let state = if publish {
            message_state::PUBLISHED
        } else {
            message_state::SENT
        };
        self.message(address, state);
    }

    fn message_received(&self, address: &str, delivered: bool) {
        self.message(address, message_state::RECEIVED);
        let outcome = if delivered {
            message_state::DELIVERED
        } else {
            message_state::DISCARDED
        };
        self.message(address, outcome);
    }

    fn reply_failure(&self, address: &str, failure: ReplyFailure) {
        if let Some(child) =
            child_or_warn(self.failures.with_label_values(&[address, failure.as_str()]))
        {
            child.inc();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registry;

    #[test]
    fn received_messages_split_by_outcome() {
        let factory = InstrumentFactory::new(Arc::new(Registry::new()));
        let hook = EventBusMetricsHook::new(&factory).unwrap();

        hook.handler_registered("orders");
        hook.message_sent("orders", true);
        hook.message_received("orders", true);
        hook.message_received("orders", false);
        hook.reply_failure("orders", ReplyFailure::Timeout);

        let count = |state: &str| {
            hook.messages
                .with_label_values(&["orders", state])
                .unwrap()
                .get()
        };
        assert_eq!(count(message_state::PUBLISHED), 1);
        assert_eq!(count(message_state::RECEIVED), 2);
        assert_eq!(count(message_state::DELIVERED), 1);
        assert_eq!(count(message_state::DISCARDED), 1);
        assert_eq!(
            hook.handlers.with_label_values(&["orders"]).unwrap().get(),
            1.0
        );
        assert_eq!(
            hook.failures
                .with_label_values(&["orders", "timeout"])
                .unwrap()
                .get(),
            1
        );
    }
}
