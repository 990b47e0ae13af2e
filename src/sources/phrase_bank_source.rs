//! フレーズバンクによる既定のコメントソース

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{CommentRequest, CommentSource, CommentSourceError};
use crate::simulator::phrase_bank;

/// ローカルのフレーズバンクから引くソース
pub struct PhraseBankSource {
    rng: Mutex<StdRng>,
}

impl PhraseBankSource {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Default for PhraseBankSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CommentSource for PhraseBankSource {
    async fn produce_comment(&self, request: &CommentRequest) -> Result<String, CommentSourceError> {
        let phrase = {
            let mut rng = self.rng.lock();
            phrase_bank::draw_phrase(request.tone, &mut *rng)
        };
        Ok(phrase.to_string())
    }

    fn name(&self) -> &'static str {
        "phrase-bank"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulator::phrase_bank::phrases;
    use crate::simulator::CommentMode;

    #[test]
    fn test_phrase_bank_source_uses_requested_tone() {
        let source = PhraseBankSource::with_seed(9);
        let request = CommentRequest::new(CommentMode::Romantic, "Host", "cooking");
        for _ in 0..20 {
            let text = tokio_test::block_on(source.produce_comment(&request)).expect("infallible");
            assert!(phrases(CommentMode::Romantic).contains(&text.as_str()));
        }
        assert_eq!(source.name(), "phrase-bank");
    }
}
