//! 提示词
//!
//! 三类请求各自的系统提示词：逐页提取、按主题合并、全文合并

use crate::models::Topic;

/// 逐页提取，要求返回只含固定字段的 JSON 对象
pub const EXTRACT_PROMPT: &str = r#"## Role

你是一位经验丰富的学术助手，擅长阅读技术论文并提炼关键观点与贡献。

## Instruction

阅读下面给出的论文片段，只在片段中确实出现相应内容时进行总结：

* introduction：研究问题，作者想解决什么
* method：方法概述，以及与哪些经典方法或已有工作相关
* contribution：关键贡献或创新点
* experiment：实验设置与结果
* discussion：对结果的讨论

## Output

1. 只输出一个 JSON 对象，不要附加任何说明文字，也不要使用 markdown 代码块
2. 所有键和值都使用双引号
3. 片段中没有的部分请留空字符串，不要编造

{"introduction": "...", "method": "...", "contribution": "...", "experiment": "...", "discussion": "..."}"#;

/// 全文合并，输出可直接嵌入 LaTeX 正文的文本
pub const FINAL_MERGE_PROMPT: &str = r#"## Role

你是一位经验丰富的学术助手，擅长阅读技术论文并提炼关键观点与贡献。

## Instruction

下面是一篇论文各个部分的总结。请用中文把它们整合成一篇完整的介绍，详细说明论文的主要内容和贡献。
术语要准确，行文连贯，不要遗漏细节；术语和缩写可以保留英文原文。

## Output

输出一段或多段符合 LaTeX 语法的正文：

1. 使用 `\par` 分段，数学公式和符号使用 `$...$`，`%` 写作 `\%`
2. 可以使用 amsmath、amssymb 中的命令
3. 不要输出 preamble，也不要输出 `\begin{document}` 之类的环境"#;

/// 按主题合并的系统提示词
pub fn gather_prompt(topic: Topic) -> String {
    format!(
        r#"## Role

你是一位经验丰富的学术助手，擅长阅读技术论文并提炼关键观点与贡献。

## Instruction

下面每一行是同一篇论文中 {topic} 部分的片段总结。请把它们合并成一个完整的段落，保证逻辑连贯、语句通顺，内容与原文一致。
片段之间相互矛盾时，以多数片段的说法为准。

## Output

只输出合并后的段落文本。"#
    )
}

/// 把片段渲染成逐行列表
pub fn render_bullets(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("* {}", value))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_bullets_keeps_order_and_empties() {
        let values = vec!["a".to_string(), String::new(), "c".to_string()];
        assert_eq!(render_bullets(&values), "* a\n* \n* c");
    }

    #[test]
    fn test_gather_prompt_names_topic() {
        assert!(gather_prompt(Topic::Experiment).contains("experiment"));
        assert_ne!(gather_prompt(Topic::Method), FINAL_MERGE_PROMPT);
    }

    #[test]
    fn test_extract_prompt_lists_every_topic() {
        for topic in Topic::ALL {
            assert!(EXTRACT_PROMPT.contains(topic.as_str()));
        }
    }
}
