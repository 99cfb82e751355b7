//! 摘要记录与按主题汇总的数据结构
//!
//! - `Record`：单页的提取结果，固定包含全部主题
//! - `TopicCorpus`：按主题转置后的各页内容
//! - `TopicSummary`：每个主题合并后的段落

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value as JsonValue};

/// 论文摘要的固定主题
///
/// 声明顺序即输出顺序
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Topic {
    Introduction,
    Method,
    Contribution,
    Experiment,
    Discussion,
}

impl Topic {
    pub const ALL: [Topic; 5] = [
        Topic::Introduction,
        Topic::Method,
        Topic::Contribution,
        Topic::Experiment,
        Topic::Discussion,
    ];

    /// JSON 字段名
    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::Introduction => "introduction",
            Topic::Method => "method",
            Topic::Contribution => "contribution",
            Topic::Experiment => "experiment",
            Topic::Discussion => "discussion",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单页提取结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    fields: BTreeMap<Topic, String>,
}

impl Default for Record {
    /// 所有主题均为空字符串
    fn default() -> Self {
        Self {
            fields: Topic::ALL
                .iter()
                .map(|topic| (*topic, String::new()))
                .collect(),
        }
    }
}

impl Record {
    /// 从 LLM 返回的 JSON 对象构建记录
    ///
    /// 未知字段被丢弃；缺失或不是字符串的主题按空字符串处理
    pub fn from_json_object(object: &Map<String, JsonValue>) -> Self {
        let mut record = Self::default();
        for topic in Topic::ALL {
            if let Some(JsonValue::String(text)) = object.get(topic.as_str()) {
                record.set(topic, text.clone());
            }
        }
        record
    }

    pub fn get(&self, topic: Topic) -> &str {
        self.fields.get(&topic).map(String::as_str).unwrap_or("")
    }

    pub fn set(&mut self, topic: Topic, text: impl Into<String>) {
        self.fields.insert(topic, text.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (Topic, &str)> {
        self.fields.iter().map(|(topic, text)| (*topic, text.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|text| text.is_empty())
    }
}

/// 按主题转置后的各页内容，主题内保持页序
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicCorpus {
    sections: BTreeMap<Topic, Vec<String>>,
}

impl TopicCorpus {
    /// 将逐页记录按主题分组
    pub fn from_records(records: &[Record]) -> Self {
        let mut sections: BTreeMap<Topic, Vec<String>> = Topic::ALL
            .iter()
            .map(|topic| (*topic, Vec::with_capacity(records.len())))
            .collect();

        for record in records {
            for (topic, text) in record.iter() {
                sections.entry(topic).or_default().push(text.to_string());
            }
        }

        Self { sections }
    }

    pub fn get(&self, topic: Topic) -> &[String] {
        self.sections
            .get(&topic)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (Topic, &[String])> {
        self.sections
            .iter()
            .map(|(topic, values)| (*topic, values.as_slice()))
    }

    /// 第 `index` 页在各主题下的内容，用于还原原始记录
    pub fn record_at(&self, index: usize) -> Option<Record> {
        let mut record = Record::default();
        for (topic, values) in self.iter() {
            record.set(topic, values.get(index)?.clone());
        }
        Some(record)
    }
}

/// 每个主题合并后的段落
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopicSummary {
    sections: BTreeMap<Topic, String>,
}

impl TopicSummary {
    pub fn insert(&mut self, topic: Topic, text: impl Into<String>) {
        self.sections.insert(topic, text.into());
    }

    pub fn get(&self, topic: Topic) -> Option<&str> {
        self.sections.get(&topic).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// 渲染为最终合并请求的输入，每行 `topic: text`
    pub fn render(&self) -> String {
        self.sections
            .iter()
            .map(|(topic, text)| format!("{}: {}", topic, text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl FromIterator<(Topic, String)> for TopicSummary {
    fn from_iter<I: IntoIterator<Item = (Topic, String)>>(iter: I) -> Self {
        Self {
            sections: iter.into_iter().collect(),
        }
    }
}
