use prometheus::{HistogramOpts, Opts};

use crate::error::{InstrumentShape, MetricsError, Result};

/// Prometheus 客户端默认的延迟分桶（秒），与 [`prometheus::DEFAULT_BUCKETS`] 一致。
pub const DEFAULT_BUCKETS: &[f64; 11] = prometheus::DEFAULT_BUCKETS;

/// 仪表类型。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Counter,
    Gauge,
    Histogram,
}

impl InstrumentKind {
    /// 导出格式中 `# TYPE` 行使用的稳定字符串。
    pub const fn as_str(self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::Gauge => "gauge",
            InstrumentKind::Histogram => "histogram",
        }
    }
}

/// 仪表的元数据描述。
///
/// # 设计背景（Why）
/// - 名称、说明、类型与有序标签名在创建时一次性确定，此后构成仪表的“形状”，不得再改变；
/// - 链式构造，便于在工厂中集中声明。
///
/// # 契约说明（What）
/// - `name` 需满足 `[a-zA-Z_:][a-zA-Z0-9_:]*`，标签名需满足 `[a-zA-Z_][a-zA-Z0-9_]*` 且不以 `__` 开头；
/// - 直方图不得使用保留标签 `le`；分桶必须非空、有限且严格递增；
/// - **后置条件**：[`Registry`](super::Registry) 在注册前调用 `validate`，违规时返回装配期错误。
#[derive(Clone, Debug, PartialEq)]
pub struct InstrumentDescriptor {
    name: String,
    help: String,
    kind: InstrumentKind,
    label_names: Vec<String>,
    buckets: Vec<f64>,
}

impl InstrumentDescriptor {
    fn new(kind: InstrumentKind, name: impl Into<String>, help: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            help: help.into(),
            kind,
            label_names: Vec::new(),
            buckets: Vec::new(),
        }
    }

    /// 构造计数器描述。
    pub fn counter(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(InstrumentKind::Counter, name, help)
    }

    /// 构造 Gauge 描述。
    pub fn gauge(name: impl Into<String>, help: impl Into<String>) -> Self {
        Self::new(InstrumentKind::Gauge, name, help)
    }

    /// 构造直方图描述，默认使用 [`DEFAULT_BUCKETS`]。
    pub fn histogram(name: impl Into<String>, help: impl Into<String>) -> Self {
        let mut descriptor = Self::new(InstrumentKind::Histogram, name, help);
        descriptor.buckets = DEFAULT_BUCKETS.to_vec();
        descriptor
    }

    /// 设置有序标签名。顺序即为取值向量的对齐顺序。
    pub fn with_label_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.label_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// 覆盖直方图分桶上界。对非直方图描述无效。
    pub fn with_buckets(mut self, buckets: impl Into<Vec<f64>>) -> Self {
        if self.kind == InstrumentKind::Histogram {
            self.buckets = buckets.into();
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    pub fn label_names(&self) -> &[String] {
        &self.label_names
    }

    /// 直方图分桶上界；计数器与 Gauge 返回空切片。
    pub fn buckets(&self) -> &[f64] {
        &self.buckets
    }

    /// 提取用于冲突比较的形状。
    pub fn shape(&self) -> InstrumentShape {
        self.shape_as(self.kind)
    }

    /// 以指定类型提取形状；分桶仅在直方图形状中出现。
    pub(crate) fn shape_as(&self, kind: InstrumentKind) -> InstrumentShape {
        let buckets = if kind == InstrumentKind::Histogram {
            self.buckets.clone()
        } else {
            Vec::new()
        };
        InstrumentShape {
            kind,
            label_names: self.label_names.clone(),
            buckets,
        }
    }

    pub(crate) fn opts(&self) -> Opts {
        Opts::new(self.name.as_str(), self.help.as_str())
    }

    pub(crate) fn histogram_opts(&self) -> HistogramOpts {
        HistogramOpts::from(self.opts()).buckets(self.buckets.clone())
    }

    pub(crate) fn label_name_refs(&self) -> Vec<&str> {
        self.label_names.iter().map(String::as_str).collect()
    }

    /// 校验取值数量并借出为 `prometheus` 需要的 `&[&str]` 形式。
    pub(crate) fn label_value_refs<'a, S: AsRef<str>>(
        &self,
        values: &'a [S],
    ) -> Result<Vec<&'a str>> {
        let expected = self.label_names.len();
        if values.len() != expected {
            return Err(MetricsError::LabelArity {
                name: self.name.clone(),
                expected,
                actual: values.len(),
            });
        }
        Ok(values.iter().map(AsRef::as_ref).collect())
    }

    /// 校验名称、标签名与分桶。
    pub(crate) fn validate(&self) -> Result<()> {
        if !is_valid_metric_name(&self.name) {
            return Err(MetricsError::InvalidName {
                name: self.name.clone(),
            });
        }

        for label in &self.label_names {
            let reserved = self.kind == InstrumentKind::Histogram && label == "le";
            if reserved || !is_valid_label_name(label) {
                return Err(MetricsError::InvalidName {
                    name: label.clone(),
                });
            }
        }

        if self.kind == InstrumentKind::Histogram {
            validate_buckets(&self.name, &self.buckets)?;
        }
        Ok(())
    }
}

fn validate_buckets(name: &str, buckets: &[f64]) -> Result<()> {
    let invalid = |reason| MetricsError::InvalidBuckets {
        name: name.to_owned(),
        reason,
    };

    if buckets.is_empty() {
        return Err(invalid("bucket list is empty"));
    }
    if buckets.iter().any(|bound| !bound.is_finite()) {
        return Err(invalid("bucket bounds must be finite"));
    }
    if buckets.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(invalid("bucket bounds must be strictly increasing"));
    }
    Ok(())
}

fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' || first == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_label_name(name: &str) -> bool {
    if name.starts_with("__") {
        return false;
    }
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
