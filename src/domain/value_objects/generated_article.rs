use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

static ARTICLE_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<article>(.*?)</article>").expect("valid regex"));
static HORIZONTAL_RULE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<hr\s*/?>").expect("valid regex"));
static HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<h1>(.*?)</h1>").expect("valid regex"));
static NON_SLUG_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s-]").expect("valid regex"));

/// One article carved out of a model's HTML output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArticle {
    pub title: String,
    pub slug: String,
    pub content: String,
}

impl GeneratedArticle {
    /// Splits raw model output into articles.
    ///
    /// Each `<article>` block becomes one article. Output without any block is
    /// treated as a single article, unless it is blank.
    pub fn extract_all(raw_html: &str) -> Vec<GeneratedArticle> {
        let mut blocks: Vec<&str> = ARTICLE_BLOCK
            .captures_iter(raw_html)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect();

        if blocks.is_empty() && !raw_html.trim().is_empty() {
            blocks.push(raw_html);
        }

        blocks
            .into_iter()
            .enumerate()
            .map(|(index, block)| Self::from_block(index, block))
            .collect()
    }

    fn from_block(index: usize, block: &str) -> GeneratedArticle {
        let html = HORIZONTAL_RULE.replace_all(block.trim(), "");
        let html = html.trim();

        let title = HEADING
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().trim().to_string())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Untitled article {}", index + 1));

        let content = HEADING.replace(html, "").trim().to_string();

        GeneratedArticle {
            slug: slugify(&title),
            title,
            content,
        }
    }
}

pub fn slugify(title: &str) -> String {
    NON_SLUG_CHARS
        .replace_all(title, "")
        .replace(' ', "-")
        .to_lowercase()
}
