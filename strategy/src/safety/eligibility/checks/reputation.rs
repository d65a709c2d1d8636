use anyhow::Result;
use rand::Rng;

use crate::ports::ChainPort;

/// Resample with probability `1 / (sample + 1)`.
pub fn should_resample(sample: u32) -> bool {
    rand::thread_rng().gen_range(0..=sample) == 0
}

/// Lowest raw author reputation among up to `sample` trending posts.
/// `None` when trending is empty.
pub async fn refresh_trending_floor(chain: &dyn ChainPort, sample: u32) -> Result<Option<i64>> {
    let trending = chain.get_discussions_by_trending("", sample).await?;
    Ok(trending.iter().map(|post| post.author_reputation).min())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockChain;
    use drphil_core::Candidate;

    #[tokio::test]
    async fn test_floor_is_trending_minimum() {
        let chain = MockChain::new();
        chain.put_trending(
            [50_000_000_000_i64, 3_000_000_000, 900_000_000_000]
                .iter()
                .map(|rep| Candidate { author_reputation: *rep, ..Default::default() })
                .collect(),
        );
        assert_eq!(refresh_trending_floor(&chain, 100).await.unwrap(), Some(3_000_000_000));
        assert_eq!(refresh_trending_floor(&MockChain::new(), 100).await.unwrap(), None);
    }

    #[test]
    fn test_zero_sample_always_resamples() {
        assert!(should_resample(0));
    }
}
