use chrono::SecondsFormat;

use crate::news_fetcher::NewsArticle;
use crate::preferences::PersonalizationContext;

/// Rendered in place of the news list when no articles were fetched.
pub const NO_NEWS_SENTINEL: &str = "No recent news available.";

const ANALYST_ROLE: &str = "You are an expert fintech analyst providing insights about \
financial technology trends and news.";

const ANALYST_GUIDANCE: &str = "Focus on providing actionable insights and industry implications.\n\
Be concise but thorough in your analysis. When you rely on a news item above, mention it by title.";

/// System instruction for the completion model.
#[derive(Debug, Clone, PartialEq)]
pub struct Prompt {
    pub instruction: String,
    /// True iff a preference block was included.
    pub personalized: bool,
}

/// `"<title> (<publishedAt>)"` per article, newline-joined, or the sentinel.
pub fn render_news_section(articles: &[NewsArticle]) -> String {
    if articles.is_empty() {
        return NO_NEWS_SENTINEL.to_string();
    }
    articles
        .iter()
        .map(|a| {
            format!(
                "{} ({})",
                a.title,
                a.published_at.to_rfc3339_opts(SecondsFormat::Secs, true)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the system instruction. Pure: identical inputs give identical output.
pub fn build_prompt(articles: &[NewsArticle], context: &PersonalizationContext) -> Prompt {
    let mut instruction = String::new();
    instruction.push_str(ANALYST_ROLE);
    instruction.push_str("\n\nRecent fintech news:\n");
    instruction.push_str(&render_news_section(articles));
    instruction.push_str("\n\n");

    let personalized = match context {
        PersonalizationContext::Anonymous => false,
        PersonalizationContext::Profiled(prefs) => {
            instruction.push_str("Consider the user's context:\n");
            instruction.push_str(&format!("- Occupation: {}\n", prefs.occupation));
            instruction.push_str(&format!("- Industry: {}\n", prefs.industry));
            instruction.push_str(&format!("- Interests: {}\n", prefs.interests.join(", ")));
            instruction.push_str(
                "Tailor your analysis to be particularly relevant for someone in this position, \
                 highlighting aspects that intersect with their industry and interests.\n\n",
            );
            true
        }
    };

    instruction.push_str(ANALYST_GUIDANCE);

    Prompt {
        instruction,
        personalized,
    }
}
