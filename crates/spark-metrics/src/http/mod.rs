//! # http 模块说明
//!
//! ## 角色定位（Why）
//! - HTTP 服务端与客户端在 TCP 观测之上追加请求生命周期、WebSocket 与端点统计；
//! - 请求跟踪逻辑两侧共用 [`HttpRequestMetrics`]，差异只在于使用哪一侧的可选标签。
//!
//! ## 结构（How）
//! - `request`：句柄与多阶段计时；
//! - `server` / `client`：类别 trait、空实现与写入注册表的钩子。

mod client;
mod request;
mod server;

use std::fmt;
use std::sync::Arc;

pub use client::{HttpClientMetrics, HttpClientMetricsHook, NoopHttpClientMetrics};
pub use request::{HttpRequestMetrics, RequestMetric, RequestPhase};
pub use server::{HttpServerMetrics, HttpServerMetricsHook, NoopHttpServerMetrics};

/// HTTP 方法。未知方法保留原始文本。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Head,
    Post,
    Put,
    Delete,
    Connect,
    Options,
    Trace,
    Patch,
    Other(Arc<str>),
}

impl HttpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Head => "HEAD",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Connect => "CONNECT",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Other(name) => &**name,
        }
    }
}

impl From<&str> for HttpMethod {
    fn from(value: &str) -> Self {
        match value {
            "GET" => HttpMethod::Get,
            "HEAD" => HttpMethod::Head,
            "POST" => HttpMethod::Post,
            "PUT" => HttpMethod::Put,
            "DELETE" => HttpMethod::Delete,
            "CONNECT" => HttpMethod::Connect,
            "OPTIONS" => HttpMethod::Options,
            "TRACE" => HttpMethod::Trace,
            "PATCH" => HttpMethod::Patch,
            other => HttpMethod::Other(Arc::from(other)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
