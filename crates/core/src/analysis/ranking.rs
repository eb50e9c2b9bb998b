use crate::analysis::sentiment::SentimentScorer;
use crate::domain::NewsItem;
use crate::ingest::types::Article;

pub const MAX_RANKED_NEWS: usize = 5;

/// Scores every article once, in provider order.
pub fn score_articles(scorer: &SentimentScorer, articles: &[Article]) -> Vec<NewsItem> {
    articles
        .iter()
        .map(|a| NewsItem {
            title: a.title.clone(),
            description: a.description.clone(),
            url: a.url.clone(),
            sentiment: scorer.score_article(&a.title, &a.description),
        })
        .collect()
}

/// Keeps the `MAX_RANKED_NEWS` items with the largest absolute sentiment.
/// The sort is stable, so equal magnitudes keep provider order.
pub fn rank_by_magnitude(mut items: Vec<NewsItem>) -> Vec<NewsItem> {
    items.sort_by(|a, b| b.sentiment.abs().total_cmp(&a.sentiment.abs()));
    items.truncate(MAX_RANKED_NEWS);
    items
}

pub fn score_and_rank(scorer: &SentimentScorer, articles: &[Article]) -> Vec<NewsItem> {
    rank_by_magnitude(score_articles(scorer, articles))
}
