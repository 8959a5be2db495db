//! # exposition 模块说明
//!
//! ## 角色定位（Why）
//! - 把 [`Registry::gather`] 的快照编码为 Prometheus 文本格式 0.0.4，由宿主自行挂到任意 HTTP 端点上；
//! - 编码器直接复用 `prometheus` 的 [`TextEncoder`]，本模块只提供面向注册表的便捷入口。
//!
//! ## 格式要点（What）
//! - 每个仪表输出 `# HELP`、`# TYPE` 两行，随后逐个样本输出；
//! - 同一样本内标签按名称排序输出，与注册时的取值顺序无关；
//! - 直方图样本展开为 `_bucket{le=...}`（含 `+Inf`）、`_sum`、`_count`。

use crate::error::Result;
use crate::registry::Registry;

pub use prometheus::{Encoder, TEXT_FORMAT, TextEncoder};

/// 把注册表当前快照编码为文本。
pub fn encode_text(registry: &Registry) -> Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    String::from_utf8(buffer).map_err(|err| prometheus::Error::Msg(err.to_string()).into())
}
