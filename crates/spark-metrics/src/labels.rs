//! # labels 模块说明
//!
//! ## 角色定位（Why）
//! - 运维侧可为客户端与服务端分别开关 `host`、`path` 等高基数维度；
//! - 仪表创建时需要有序标签名，事件发生时需要同序标签取值，两者一旦错位就会把数据写进错误的列。
//!
//! ## 设计要求（What）
//! - [`LabelSchema`] 是一组有序 [`Dimension`]，标签名与标签取值都是对同一列表的投影，
//!   长度与位置天然一致，而不依赖集合迭代顺序；
//! - 顺序规则：必选维度在前（`local_address`、`method`），可选维度其次（`host` 先于 `path`），
//!   终结维度最后（请求计数为 `state`，响应计数为 `status`）；
//! - 未启用的可选维度同时从两侧省略。

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::contract::{UNKNOWN, label};
use crate::options::MetricsOptions;

/// 可由配置开关的可选标签维度。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetricLabel {
    #[serde(rename = "useHost")]
    UseHost,
    #[serde(rename = "usePath")]
    UsePath,
}

/// 已启用的可选维度集合。
///
/// - 序列化为 [`MetricLabel`] 数组，例如 `["useHost"]`；
/// - 迭代顺序固定为 `UseHost`、`UsePath`，与集合构造顺序无关。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Vec<MetricLabel>", into = "Vec<MetricLabel>")]
pub struct LabelSet {
    host: bool,
    path: bool,
}

impl LabelSet {
    pub const NONE: LabelSet = LabelSet {
        host: false,
        path: false,
    };

    pub const ALL: LabelSet = LabelSet {
        host: true,
        path: true,
    };

    pub fn contains(self, label: MetricLabel) -> bool {
        match label {
            MetricLabel::UseHost => self.host,
            MetricLabel::UsePath => self.path,
        }
    }

    pub fn with(mut self, label: MetricLabel) -> Self {
        self.set(label, true);
        self
    }

    pub fn without(mut self, label: MetricLabel) -> Self {
        self.set(label, false);
        self
    }

    fn set(&mut self, label: MetricLabel, enabled: bool) {
        match label {
            MetricLabel::UseHost => self.host = enabled,
            MetricLabel::UsePath => self.path = enabled,
        }
    }

    pub fn iter(self) -> impl Iterator<Item = MetricLabel> {
        [MetricLabel::UseHost, MetricLabel::UsePath]
            .into_iter()
            .filter(move |label| self.contains(*label))
    }
}

impl FromIterator<MetricLabel> for LabelSet {
    fn from_iter<I: IntoIterator<Item = MetricLabel>>(iter: I) -> Self {
        iter.into_iter().fold(LabelSet::NONE, LabelSet::with)
    }
}

impl From<Vec<MetricLabel>> for LabelSet {
    fn from(labels: Vec<MetricLabel>) -> Self {
        labels.into_iter().collect()
    }
}

impl From<LabelSet> for Vec<MetricLabel> {
    fn from(set: LabelSet) -> Self {
        set.iter().collect()
    }
}

/// 选择使用哪一侧的已启用维度。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LabelContext {
    Client,
    Server,
}

/// 标签维度。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Dimension {
    LocalAddress,
    Method,
    Host,
    Path,
    State,
    Status,
}

impl Dimension {
    pub const fn label_name(self) -> &'static str {
        match self {
            Dimension::LocalAddress => label::LOCAL_ADDRESS,
            Dimension::Method => label::METHOD,
            Dimension::Host => label::HOST,
            Dimension::Path => label::PATH,
            Dimension::State => label::STATE,
            Dimension::Status => label::STATUS,
        }
    }

    fn pick<'a>(self, observation: &Observation<'a>) -> &'a str {
        match self {
            Dimension::LocalAddress => observation.local_address,
            Dimension::Method => observation.method,
            Dimension::Host => observation.host,
            Dimension::Path => observation.path,
            Dimension::State => observation.state,
            Dimension::Status => observation.status,
        }
    }
}

/// 一次观测携带的全部维度取值，未用到的字段保持空串即可。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Observation<'a> {
    pub local_address: &'a str,
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    pub state: &'a str,
    pub status: &'a str,
}

/// 有序维度列表。
///
/// # 教案式说明
/// - **意图 (Why)**：让“名称列表”和“取值列表”出自同一份顺序定义；
/// - **契约 (What)**：`names().len() == values(obs).len()` 对任意配置与观测成立；
/// - **执行 (How)**：构造时按固定规则压入维度，投影时逐个映射。
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelSchema {
    dimensions: Vec<Dimension>,
}

impl LabelSchema {
    /// 请求计数使用的维度：`local_address, method, [host], [path], state`。
    pub fn requests(enabled: LabelSet) -> Self {
        let mut dimensions = vec![Dimension::LocalAddress, Dimension::Method];
        if enabled.contains(MetricLabel::UseHost) {
            dimensions.push(Dimension::Host);
        }
        if enabled.contains(MetricLabel::UsePath) {
            dimensions.push(Dimension::Path);
        }
        dimensions.push(Dimension::State);
        Self { dimensions }
    }

    /// 响应计数使用的维度：`local_address, status`。
    pub fn responses() -> Self {
        Self {
            dimensions: vec![Dimension::LocalAddress, Dimension::Status],
        }
    }

    pub fn dimensions(&self) -> &[Dimension] {
        &self.dimensions
    }

    pub fn len(&self) -> usize {
        self.dimensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.dimensions.iter().map(|d| d.label_name()).collect()
    }

    pub fn values<'a>(&self, observation: &Observation<'a>) -> Vec<&'a str> {
        self.dimensions.iter().map(|d| d.pick(observation)).collect()
    }
}

/// 请求计数的有序标签名；启用的可选维度取自 `options` 中 `context` 一侧的配置。
pub fn label_names(context: LabelContext, options: &MetricsOptions) -> Vec<&'static str> {
    LabelSchema::requests(options.enabled_labels(context)).names()
}

/// 与 [`label_names`] 同序的标签取值。
pub fn label_values(
    context: LabelContext,
    options: &MetricsOptions,
    observation: &Observation<'_>,
) -> Vec<String> {
    LabelSchema::requests(options.enabled_labels(context))
        .values(observation)
        .into_iter()
        .map(str::to_owned)
        .collect()
}

/// HTTP 状态码标签；`100..=599` 之外的取值记为 `unknown`。
pub fn status_label(code: u16) -> Cow<'static, str> {
    if (100..=599).contains(&code) {
        Cow::Owned(code.to_string())
    } else {
        Cow::Borrowed(UNKNOWN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_dimensions_keep_fixed_order() {
        let options = MetricsOptions::new()
            .enable_for_server(MetricLabel::UsePath)
            .disable_for_client(MetricLabel::UseHost);
        assert_eq!(
            label_names(LabelContext::Server, &options),
            vec!["local_address", "method", "host", "path", "state"]
        );
        assert_eq!(
            label_names(LabelContext::Client, &options),
            vec!["local_address", "method", "state"]
        );
    }

    #[test]
    fn values_follow_names() {
        let observation = Observation {
            local_address: "0.0.0.0:8080",
            method: "GET",
            host: "h1",
            path: "/a",
            state: "active",
            status: "",
        };
        let options = MetricsOptions::new()
            .disable_for_client(MetricLabel::UseHost)
            .enable_for_client(MetricLabel::UsePath);
        assert_eq!(
            label_values(LabelContext::Client, &options, &observation),
            vec!["0.0.0.0:8080", "GET", "/a", "active"]
        );
        assert_eq!(
            label_values(LabelContext::Server, &options, &observation),
            vec!["0.0.0.0:8080", "GET", "h1", "active"],
            "服务端仍使用缺省的 useHost"
        );
    }

    #[test]
    fn status_codes_outside_range_are_unknown() {
        assert_eq!(status_label(200), "200");
        assert_eq!(status_label(599), "599");
        assert_eq!(status_label(42), "unknown");
        assert_eq!(status_label(600), "unknown");
    }

    #[test]
    fn label_set_serializes_as_array() {
        let json = serde_json::to_string(&LabelSet::ALL).unwrap();
        assert_eq!(json, r#"["useHost","usePath"]"#);
        let parsed: LabelSet = serde_json::from_str(r#"["usePath"]"#).unwrap();
        assert!(parsed.contains(MetricLabel::UsePath));
        assert!(!parsed.contains(MetricLabel::UseHost));
    }
}
