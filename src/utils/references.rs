//! 引用资料处理 - 标题清洗与参考资料章节装配

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("静态正则"));
static MARKUP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[*_`#\[\]<>|]").expect("静态正则"));

/// 清洗搜索结果标题：去除markdown残留符号、折叠空白、剥离首尾引号
pub fn clean_title(title: &str) -> String {
    let stripped = MARKUP_RE.replace_all(title, "");
    let collapsed = WHITESPACE_RE.replace_all(stripped.trim(), " ");
    collapsed
        .trim_matches(|c| c == '"' || c == '\'' || c == '“' || c == '”')
        .trim()
        .to_string()
}

/// 规范化标题：清洗后若与URL相同（不区分大小写）或为空，
/// 置为空串，向下游标记"需要抽取"
pub fn normalize_title(title: &str, url: &str) -> String {
    if title.is_empty() {
        return String::new();
    }
    let cleaned = clean_title(title);
    if cleaned.is_empty() || cleaned.to_lowercase() == url.to_lowercase() {
        return String::new();
    }
    cleaned
}

/// 装配参考资料章节
///
/// 引用列表由外部curator整理，此处仅做格式化，不经过模型。
pub fn format_references_section(
    references: &[String],
    reference_titles: &HashMap<String, String>,
) -> String {
    if references.is_empty() {
        return String::new();
    }

    let mut section = String::from("## 参考资料\n\n");
    for (i, url) in references.iter().enumerate() {
        let title = reference_titles
            .get(url)
            .map(String::as_str)
            .filter(|t| !t.is_empty())
            .unwrap_or(url.as_str());
        section.push_str(&format!("{}. [{}]({})\n", i + 1, title, url));
    }
    section.trim_end().to_string()
}
