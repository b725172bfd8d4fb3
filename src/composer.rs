/// Content composition
///
/// Builds the final post text: generated (or templated) summary, hashtags
/// derived from the analysis, and truncation to the platform limit.

use crate::analysis::{Analysis, MarketSentiment};
use crate::generation::{generate_trends_summary, TextGenerator};
use crate::trends::Category;

pub const MAX_HASHTAGS: usize = 8;
const ELLIPSIS: &str = "...";

/// Hard-truncate to `max_length` characters, ending with an ellipsis
pub fn truncate_with_ellipsis(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }
    let keep = max_length.saturating_sub(ELLIPSIS.len());
    let mut truncated: String = text.chars().take(keep).collect();
    truncated.push_str(ELLIPSIS);
    truncated
}

/// Shorten text to `max_length` characters, cutting at sentence boundaries when possible.
///
/// Sentences are split on runs of `.`, `!` and `?` and re-joined with `.`;
/// whole sentences are kept while the result leaves room for the trailing
/// ellipsis. When not even the first sentence fits, the text is hard-truncated.
pub fn format_for_twitter(text: &str, max_length: usize) -> String {
    if text.chars().count() <= max_length {
        return text.to_string();
    }

    let budget = max_length.saturating_sub(ELLIPSIS.len());
    let mut result = String::new();
    let mut result_len = 0;

    // A run of terminators counts as a single boundary
    for sentence in text.split(['.', '!', '?']).filter(|s| !s.is_empty()) {
        let sentence_len = sentence.chars().count();
        if result_len + sentence_len + 1 > budget {
            break;
        }
        result.push_str(sentence);
        result.push('.');
        result_len += sentence_len + 1;
    }

    if result.is_empty() {
        return truncate_with_ellipsis(text, max_length);
    }

    result.push_str(ELLIPSIS);
    result
}

/// Hashtags for a post, deduplicated in insertion order and capped at [`MAX_HASHTAGS`]
pub fn relevant_hashtags(analysis: &Analysis) -> Vec<String> {
    let mut hashtags: Vec<String> = vec!["#CryptoAnalysis".into(), "#CryptoTrends".into()];

    let sentiment_tags: [&str; 2] = match analysis.market_sentiment {
        MarketSentiment::Bullish => ["#Bullish", "#CryptoBull"],
        MarketSentiment::Bearish => ["#Bearish", "#CryptoBear"],
        MarketSentiment::Neutral => ["#Neutral", "#CryptoMarket"],
    };
    hashtags.extend(sentiment_tags.iter().map(|t| t.to_string()));

    for trend in analysis.top_trends.iter().take(3) {
        let tag = trend.keyword.strip_prefix('#').unwrap_or(&trend.keyword);
        if !tag.is_empty() {
            hashtags.push(format!("#{}", tag));
        }
    }

    let mut seen_categories: Vec<Category> = Vec::new();
    for trend in &analysis.top_trends {
        if seen_categories.contains(&trend.category) {
            continue;
        }
        seen_categories.push(trend.category);

        let tags: &[&str] = match trend.category {
            Category::Bitcoin => &["#Bitcoin", "#BTC"],
            Category::Ethereum => &["#Ethereum", "#ETH"],
            Category::Defi => &["#DeFi"],
            Category::Nft => &["#NFT", "#NFTs"],
            Category::Web3 => &["#Web3"],
            _ => &[],
        };
        hashtags.extend(tags.iter().map(|t| t.to_string()));
    }

    let mut unique: Vec<String> = Vec::with_capacity(MAX_HASHTAGS);
    for tag in hashtags {
        if unique.len() == MAX_HASHTAGS {
            break;
        }
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

/// Compose the text to publish for an analysis
pub async fn compose_post(
    generator: &dyn TextGenerator,
    analysis: &Analysis,
    max_length: usize,
) -> String {
    let summary = generate_trends_summary(generator, analysis).await;
    let summary = format_for_twitter(&summary, max_length);
    let hashtags = relevant_hashtags(analysis).join(" ");

    format_for_twitter(&format!("{}\n\n{}", summary, hashtags), max_length)
}
