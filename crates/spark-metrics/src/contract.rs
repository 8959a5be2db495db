//! 指标名称与标签的稳定契约。
//!
//! # 教案式说明
//! - **意图 (Why)**：仪表名后缀、标签键与标签取值在看板、告警与测试中被反复引用，集中声明可避免拼写漂移；
//! - **契约 (What)**：常量一经发布即视为兼容承诺，新增可以，修改需同步更新看板；
//! - **命名**：完整名称为 `spark_<子系统>_<后缀>`，由 [`crate::factory::InstrumentFactory`] 拼接。

/// 所有仪表名的公共前缀。
pub const NAMESPACE: &str = "spark";

/// 本地地址缺失时使用的占位值。
pub const UNKNOWN: &str = "unknown";

/// 标签键。
pub mod label {
    pub const LOCAL_ADDRESS: &str = "local_address";
    pub const METHOD: &str = "method";
    pub const HOST: &str = "host";
    pub const PATH: &str = "path";
    pub const STATE: &str = "state";
    pub const STATUS: &str = "status";
    pub const TYPE: &str = "type";
    pub const CLASS: &str = "class";
    pub const ADDRESS: &str = "address";
    pub const REASON: &str = "reason";
    pub const POOL_TYPE: &str = "pool_type";
    pub const POOL_NAME: &str = "pool_name";
    pub const RESULT: &str = "result";
}

/// HTTP 请求 `state` 标签取值。
pub mod request_state {
    pub const ACTIVE: &str = "active";
    pub const TOTAL: &str = "total";
    pub const PROCESSED: &str = "processed";
    pub const RESET: &str = "reset";
    pub const UPGRADED: &str = "upgraded";
}

/// HTTP 客户端端点 `state` 标签取值。
pub mod endpoint_state {
    pub const ACTIVE: &str = "active";
    pub const CONNECTED: &str = "connected";
    pub const QUEUED: &str = "queued";
}

/// 字节计数 `type` 标签取值。
pub mod bytes_type {
    pub const READ: &str = "read";
    pub const WRITTEN: &str = "written";
}

/// 宿主定时器 `state` 标签取值。
pub mod timer_state {
    pub const CREATED: &str = "created";
    pub const ACTIVE: &str = "active";
    pub const CANCELLED: &str = "cancelled";
    pub const DESTROYED: &str = "destroyed";
}

/// 事件总线消息 `state` 标签取值。
pub mod message_state {
    pub const SENT: &str = "sent";
    pub const PUBLISHED: &str = "published";
    pub const RECEIVED: &str = "received";
    pub const DELIVERED: &str = "delivered";
    pub const DISCARDED: &str = "discarded";
}

/// 资源池 `state` / `result` 标签取值。
pub mod pool_state {
    pub const QUEUED: &str = "queued";
    pub const IN_USE: &str = "in_use";
    pub const SUCCEEDED: &str = "succeeded";
    pub const FAILED: &str = "failed";
    pub const REJECTED: &str = "rejected";
}

/// 子系统名，作为仪表名中缀。
pub mod subsystem {
    pub const HTTP_SERVER: &str = "http_server";
    pub const HTTP_CLIENT: &str = "http_client";
    pub const NET_SERVER: &str = "net_server";
    pub const NET_CLIENT: &str = "net_client";
    pub const DATAGRAM: &str = "datagram_socket";
    pub const EVENT_BUS: &str = "eventbus";
    pub const POOL: &str = "pool";
    pub const UNITS: &str = "units";
    pub const TIMERS: &str = "timers";
}
