use serde::Serialize;
use tracing::info;

use crate::cache::CacheService;
use crate::error::AppError;
use crate::store::RangeOrder;

pub const LEADERBOARD_KEY: &str = "sortedSet";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedElement {
    pub element: String,
    pub score: f64,
}

impl CacheService {
    /// Добавляет элемент или меняет его счёт (ZADD).
    pub async fn upsert_element(&self, element: &str, score: f64) -> Result<(), AppError> {
        self.store.sorted_set_add(LEADERBOARD_KEY, element, score).await?;
        info!("Leaderboard: {} -> {}", element, score);
        Ok(())
    }

    pub async fn elements(&self, order: RangeOrder) -> Result<Vec<RankedElement>, AppError> {
        let elements = self.store.sorted_set_range(LEADERBOARD_KEY, order).await?;
        Ok(elements
            .into_iter()
            .map(|(element, score)| RankedElement { element, score })
            .collect())
    }

    /// `true`, если элемент был в таблице.
    pub async fn delete_element(&self, element: &str) -> Result<bool, AppError> {
        let removed = self.store.sorted_set_remove(LEADERBOARD_KEY, element).await?;
        if removed {
            info!("Leaderboard: {} removed", element);
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::test_support::cache;

    fn names(elements: &[RankedElement]) -> Vec<&str> {
        elements.iter().map(|e| e.element.as_str()).collect()
    }

    #[tokio::test]
    async fn ranking_follows_scores() {
        let (cache, _) = cache();
        cache.upsert_element("alice", 10.0).await.unwrap();
        cache.upsert_element("bob", 2.5).await.unwrap();
        cache.upsert_element("carol", 7.0).await.unwrap();

        let asc = cache.elements(RangeOrder::Ascending).await.unwrap();
        assert_eq!(names(&asc), ["bob", "carol", "alice"]);

        cache.upsert_element("bob", 11.0).await.unwrap();
        let desc = cache.elements(RangeOrder::Descending).await.unwrap();
        assert_eq!(names(&desc), ["bob", "alice", "carol"]);
        assert_eq!(desc[0].score, 11.0);
    }

    #[tokio::test]
    async fn delete_reports_whether_element_existed() {
        let (cache, _) = cache();
        cache.upsert_element("alice", 1.0).await.unwrap();
        assert!(cache.delete_element("alice").await.unwrap());
        assert!(!cache.delete_element("alice").await.unwrap());
        assert!(cache.elements(RangeOrder::Ascending).await.unwrap().is_empty());
    }
}
