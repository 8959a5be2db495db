//! # options 模块说明
//!
//! ## 角色定位（Why）
//! - 宿主在启动时决定开启哪些类别的观测、客户端与服务端各启用哪些可选标签，以及写入哪个注册表；
//! - 配置可以由代码链式构造，也可以由宿主从 JSON/TOML 反序列化得到。
//!
//! ## 设计要求（What）
//! - 序列化键沿用既有配置格式：`metrics`、`clientMetricLabelValues`、`serverMetricLabelValues`；
//! - 代码构造的缺省值：九个类别全部开启，客户端与服务端均启用 `useHost`；
//! - 反序列化时缺失的键视为空集合：没有类别、没有可选标签；
//! - 注册表句柄不参与序列化，缺省指向 [`Registry::global`]。

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::labels::{LabelContext, LabelSet, MetricLabel};
use crate::registry::Registry;

/// 可开关的观测类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricsCategory {
    /// 部署单元数量。
    #[serde(rename = "Verticles")]
    Units,
    Timers,
    EventBus,
    #[serde(rename = "HTTPServer")]
    HttpServer,
    #[serde(rename = "HTTPClient")]
    HttpClient,
    NetServer,
    NetClient,
    DatagramSocket,
    Pools,
}

impl MetricsCategory {
    pub const ALL: [MetricsCategory; 9] = [
        MetricsCategory::Units,
        MetricsCategory::Timers,
        MetricsCategory::EventBus,
        MetricsCategory::HttpServer,
        MetricsCategory::HttpClient,
        MetricsCategory::NetServer,
        MetricsCategory::NetClient,
        MetricsCategory::DatagramSocket,
        MetricsCategory::Pools,
    ];

    const fn bit(self) -> u16 {
        1 << self as u16
    }

    /// 配置与日志中使用的名称。
    pub const fn as_str(self) -> &'static str {
        match self {
            MetricsCategory::Units => "Verticles",
            MetricsCategory::Timers => "Timers",
            MetricsCategory::EventBus => "EventBus",
            MetricsCategory::HttpServer => "HTTPServer",
            MetricsCategory::HttpClient => "HTTPClient",
            MetricsCategory::NetServer => "NetServer",
            MetricsCategory::NetClient => "NetClient",
            MetricsCategory::DatagramSocket => "DatagramSocket",
            MetricsCategory::Pools => "Pools",
        }
    }
}

impl fmt::Display for MetricsCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 类别位集。序列化为类别名数组。
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<MetricsCategory>", into = "Vec<MetricsCategory>")]
pub struct CategorySet(u16);

impl CategorySet {
    pub const NONE: CategorySet = CategorySet(0);
    pub const ALL: CategorySet = CategorySet((1 << MetricsCategory::ALL.len()) - 1);

    pub fn contains(self, category: MetricsCategory) -> bool {
        self.0 & category.bit() != 0
    }

    pub fn with(self, category: MetricsCategory) -> Self {
        CategorySet(self.0 | category.bit())
    }

    pub fn without(self, category: MetricsCategory) -> Self {
        CategorySet(self.0 & !category.bit())
    }

    pub fn len(self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// 按 [`MetricsCategory::ALL`] 的固定顺序迭代。
    pub fn iter(self) -> impl Iterator<Item = MetricsCategory> {
        MetricsCategory::ALL
            .into_iter()
            .filter(move |category| self.contains(*category))
    }
}

impl Default for CategorySet {
    fn default() -> Self {
        CategorySet::ALL
    }
}

impl fmt::Debug for CategorySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<MetricsCategory> for CategorySet {
    fn from_iter<I: IntoIterator<Item = MetricsCategory>>(iter: I) -> Self {
        iter.into_iter().fold(CategorySet::NONE, CategorySet::with)
    }
}

impl From<Vec<MetricsCategory>> for CategorySet {
    fn from(categories: Vec<MetricsCategory>) -> Self {
        categories.into_iter().collect()
    }
}

impl From<CategorySet> for Vec<MetricsCategory> {
    fn from(set: CategorySet) -> Self {
        set.iter().collect()
    }
}

fn default_label_set() -> LabelSet {
    LabelSet::NONE.with(MetricLabel::UseHost)
}

fn no_categories() -> CategorySet {
    CategorySet::NONE
}

fn no_labels() -> LabelSet {
    LabelSet::NONE
}

/// 指标适配层配置。
///
/// # 教案式说明
/// - **意图 (Why)**：把“开哪些类别、打哪些标签、写到哪里”收敛成一个值，适配层构造时一次性读取后冻结；
/// - **契约 (What)**：构造后的修改不会影响已经建好的适配层；
/// - **执行 (How)**：链式方法按值返回新配置，与 `InstrumentDescriptor` 的构造风格一致。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricsOptions {
    #[serde(rename = "metrics", default = "no_categories")]
    categories: CategorySet,
    #[serde(rename = "clientMetricLabelValues", default = "no_labels")]
    client_labels: LabelSet,
    #[serde(rename = "serverMetricLabelValues", default = "no_labels")]
    server_labels: LabelSet,
    #[serde(skip, default = "Registry::global")]
    registry: Arc<Registry>,
}

impl Default for MetricsOptions {
    fn default() -> Self {
        Self {
            categories: CategorySet::ALL,
            client_labels: default_label_set(),
            server_labels: default_label_set(),
            registry: Registry::global(),
        }
    }
}

impl MetricsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enable(mut self, category: MetricsCategory) -> Self {
        self.categories = self.categories.with(category);
        self
    }

    pub fn disable(mut self, category: MetricsCategory) -> Self {
        self.categories = self.categories.without(category);
        self
    }

    /// 整体替换类别集合。
    pub fn with_categories(mut self, categories: CategorySet) -> Self {
        self.categories = categories;
        self
    }

    pub fn enable_for_client(mut self, label: MetricLabel) -> Self {
        self.client_labels = self.client_labels.with(label);
        self
    }

    pub fn disable_for_client(mut self, label: MetricLabel) -> Self {
        self.client_labels = self.client_labels.without(label);
        self
    }

    pub fn enable_for_server(mut self, label: MetricLabel) -> Self {
        self.server_labels = self.server_labels.with(label);
        self
    }

    pub fn disable_for_server(mut self, label: MetricLabel) -> Self {
        self.server_labels = self.server_labels.without(label);
        self
    }

    /// 整体替换某一侧启用的可选标签。
    pub fn with_labels(mut self, context: LabelContext, labels: LabelSet) -> Self {
        match context {
            LabelContext::Client => self.client_labels = labels,
            LabelContext::Server => self.server_labels = labels,
        }
        self
    }

    pub fn with_registry(mut self, registry: Arc<Registry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn is_enabled(&self, category: MetricsCategory) -> bool {
        self.categories.contains(category)
    }

    pub fn categories(&self) -> CategorySet {
        self.categories
    }

    pub fn enabled_labels(&self, context: LabelContext) -> LabelSet {
        match context {
            LabelContext::Client => self.client_labels,
            LabelContext::Server => self.server_labels,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }
}
