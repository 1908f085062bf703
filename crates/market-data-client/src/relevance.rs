use briefing_core::{ArticleCandidate, NewsOutcome};

/// Decides whether a search result is really about the queried keyword.
///
/// A keyword in the title is enough on its own. Otherwise the keyword has to
/// show up at least `min_mentions` times across description and content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelevanceFilter {
    pub min_mentions: usize,
}

impl Default for RelevanceFilter {
    fn default() -> Self {
        Self { min_mentions: 2 }
    }
}

impl RelevanceFilter {
    pub fn new(min_mentions: usize) -> Self {
        Self { min_mentions }
    }

    pub fn is_relevant(&self, article: &ArticleCandidate, keyword: &str) -> bool {
        let keyword = keyword.to_lowercase();
        let title = lowercase(&article.title);

        if title.contains(&keyword) {
            return true;
        }

        let mentions = lowercase(&article.description).matches(&keyword).count()
            + lowercase(&article.content).matches(&keyword).count();
        mentions >= self.min_mentions
    }

    /// First relevant candidate in provider order.
    pub fn first_relevant<'a>(
        &self,
        articles: &'a [ArticleCandidate],
        keyword: &str,
    ) -> Option<&'a ArticleCandidate> {
        articles.iter().find(|a| self.is_relevant(a, keyword))
    }

    pub fn evaluate(&self, articles: &[ArticleCandidate], keyword: &str) -> NewsOutcome {
        if articles.is_empty() {
            return NewsOutcome::NoArticles;
        }
        match self.first_relevant(articles, keyword) {
            Some(article) => NewsOutcome::Relevant(article.headline()),
            None => NewsOutcome::NoRelevantArticle,
        }
    }
}

fn lowercase(field: &Option<String>) -> String {
    field.as_deref().unwrap_or_default().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter() -> RelevanceFilter {
        RelevanceFilter::default()
    }

    #[test]
    fn test_title_match_alone_is_enough() {
        let article = ArticleCandidate::new("Bitcoin hits new high", "", "");
        assert!(filter().is_relevant(&article, "Bitcoin"));
    }

    #[test]
    fn test_title_match_is_case_insensitive() {
        let article = ArticleCandidate::new("Why BITCOIN miners are selling", "", "");
        assert!(filter().is_relevant(&article, "bitcoin"));
    }

    #[test]
    fn test_single_body_mention_is_rejected() {
        let article = ArticleCandidate::new(
            "Markets wrap",
            "Stocks rose while bitcoin was flat",
            "",
        );
        assert!(!filter().is_relevant(&article, "Bitcoin"));
    }

    #[test]
    fn test_description_plus_content_mention_is_accepted() {
        let article = ArticleCandidate::new(
            "Markets wrap",
            "Stocks rose while Bitcoin was flat",
            "Analysts expect bitcoin volatility to return.",
        );
        assert!(filter().is_relevant(&article, "Bitcoin"));
    }

    #[test]
    fn test_null_fields_count_as_empty() {
        let article = ArticleCandidate {
            title: None,
            description: Some("ethereum and ethereum again".into()),
            content: None,
        };
        assert!(filter().is_relevant(&article, "Ethereum"));

        let bare = ArticleCandidate::default();
        assert!(!filter().is_relevant(&bare, "Ethereum"));
    }

    #[test]
    fn test_threshold_is_configurable() {
        let article = ArticleCandidate::new("Markets wrap", "one bitcoin mention", "");
        assert!(RelevanceFilter::new(1).is_relevant(&article, "bitcoin"));
        assert!(!RelevanceFilter::new(3).is_relevant(
            &ArticleCandidate::new("Markets wrap", "bitcoin bitcoin", ""),
            "bitcoin"
        ));
    }

    #[test]
    fn test_first_match_wins_in_provider_order() {
        let a = ArticleCandidate::new("Bitcoin ETF inflows", "first", "");
        let b = ArticleCandidate::new("Crypto roundup", "bitcoin and bitcoin", "second");
        let noise = ArticleCandidate::new("Gold rallies", "no mention", "");

        let ordered = vec![noise.clone(), a.clone(), b.clone()];
        assert_eq!(filter().first_relevant(&ordered, "Bitcoin"), Some(&a));

        let swapped = vec![noise, b.clone(), a];
        assert_eq!(filter().first_relevant(&swapped, "Bitcoin"), Some(&b));
    }

    #[test]
    fn test_evaluate_outcomes() {
        assert_eq!(filter().evaluate(&[], "Bitcoin"), NewsOutcome::NoArticles);

        let off_topic = vec![ArticleCandidate::new("Gold rallies", "bitcoin once", "")];
        assert_eq!(
            filter().evaluate(&off_topic, "Bitcoin"),
            NewsOutcome::NoRelevantArticle
        );

        let on_topic = vec![ArticleCandidate::new("Bitcoin slips", "Traders take profit", "")];
        match filter().evaluate(&on_topic, "Bitcoin") {
            NewsOutcome::Relevant(h) => assert_eq!(h.to_string(), "Bitcoin slips: Traders take profit"),
            other => panic!("expected relevant headline, got {:?}", other),
        }
    }
}
