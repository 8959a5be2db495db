//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 集中定义注册表、标签解析与仪表创建过程中的错误语义；
//! - 区分两类错误：装配期错误（形状冲突、非法名称、非法分桶）必须立即上抛并中止启动，
//!   事件期错误（标签数量不符）只在钩子内部记录告警后丢弃，绝不穿透到宿主 I/O 路径。
//!
//! ## 设计要求（What）
//! - 所有变体派生 `thiserror::Error`，可直接交给 `anyhow`/`eyre` 等上层框架处理；
//! - 底层 `prometheus` 客户端的错误经 `#[from]` 透传，不再二次包装；
//! - 变体携带仪表名称等可读上下文，便于在启动日志中定位接线错误。

use thiserror::Error;

use crate::registry::InstrumentKind;

/// 仪表的“形状”：类型 + 有序标签名，直方图另含分桶上界。
///
/// - **契约 (What)**：两个形状相等当且仅当类型一致、标签名逐位相等且分桶上界逐位相等；
///   计数器与 Gauge 的 `buckets` 恒为空；
/// - 仅用于错误报告与比较，不参与热路径。
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentShape {
    pub kind: InstrumentKind,
    pub label_names: Vec<String>,
    pub buckets: Vec<f64>,
}

impl core::fmt::Display for InstrumentShape {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}[{}]", self.kind.as_str(), self.label_names.join(","))?;
        if !self.buckets.is_empty() {
            let bounds: Vec<String> = self.buckets.iter().map(f64::to_string).collect();
            write!(f, "{{{}}}", bounds.join(","))?;
        }
        Ok(())
    }
}

/// 指标子系统错误域。
///
/// # 教案式说明
/// - **意图 (Why)**：形状冲突属于编程错误，应在装配阶段暴露；将其与运行期降级路径分离，
///   调用方可以用 `?` 传播装配错误，而钩子内部对事件期错误只做记录。
/// - **契约 (What)**：所有变体满足 `Send + Sync + 'static`，可跨线程传播。
#[derive(Debug, Error)]
pub enum MetricsError {
    /// 同名仪表已以不同形状（类型、标签名或分桶）注册。
    #[error("instrument `{name}` already registered as {existing}, requested {requested}")]
    ShapeConflict {
        name: String,
        existing: InstrumentShape,
        requested: InstrumentShape,
    },

    /// `register` 时名称已被另一个实例占用。
    #[error("instrument `{name}` is already registered by another collector")]
    AlreadyRegistered { name: String },

    /// 观测时提供的标签值数量与仪表的标签名数量不一致。
    #[error("instrument `{name}` expects {expected} label values, got {actual}")]
    LabelArity {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// 仪表名或标签名不符合 `[a-zA-Z_:][a-zA-Z0-9_:]*`。
    #[error("invalid metric or label name `{name}`")]
    InvalidName { name: String },

    /// 直方图分桶为空、含非有限值或未严格递增。
    #[error("invalid histogram buckets for `{name}`: {reason}")]
    InvalidBuckets { name: String, reason: &'static str },

    /// 工厂已关闭，不再创建或跟踪仪表。
    #[error("instrument factory is closed")]
    Closed,

    /// 底层 `prometheus` 客户端拒绝了仪表构造、注册或编码。
    #[error(transparent)]
    Backend(#[from] prometheus::Error),
}

impl MetricsError {
    /// 是否为装配期错误（应中止启动）。
    ///
    /// - [`MetricsError::LabelArity`] 属于事件期错误，[`MetricsError::Closed`] 只表示关闭后的迟到请求；
    ///   其余均视为接线缺陷。
    pub fn is_wiring_error(&self) -> bool {
        !matches!(self, MetricsError::LabelArity { .. } | MetricsError::Closed)
    }
}

/// crate 级结果别名。
pub type Result<T, E = MetricsError> = core::result::Result<T, E>;
