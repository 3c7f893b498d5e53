use super::Dao;
use crate::store::error::StoreResult;
use crate::store::models::{ClaimType, NewClaim, VerifiedState};

impl Dao {
    /// Whether any claim row (real or placeholder) exists for the article.
    pub(crate) async fn article_has_claims(&self, article_id: i64) -> StoreResult<bool> {
        let row = sqlx::query("SELECT id FROM claims WHERE article_id = $1 LIMIT 1")
            .bind(article_id)
            .fetch_optional(self.pool())
            .await?;
        Ok(row.is_some())
    }

    pub(crate) async fn insert_claim(&self, claim: &NewClaim) -> StoreResult<()> {
        sqlx::query(
            r"
            INSERT INTO claims
                (article_id, claim_text, claim_type, verified_state, verification_source, confidence)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT DO NOTHING
            ",
        )
        .bind(claim.article_id)
        .bind(&claim.claim_text)
        .bind(claim.claim_type.as_str())
        .bind(claim.verified_state.as_str())
        .bind(&claim.verification_source)
        .bind(claim.confidence)
        .execute(self.pool())
        .await?;

        Ok(())
    }

    /// Mark an article that produced no claims as processed so the
    /// extractor never revisits it.
    pub(crate) async fn insert_placeholder_claim(&self, article_id: i64) -> StoreResult<()> {
        let placeholder = NewClaim {
            article_id,
            claim_text: "No claims extracted".to_string(),
            claim_type: ClaimType::None,
            verified_state: VerifiedState::Unverified,
            verification_source: None,
            confidence: 0.0,
        };
        self.insert_claim(&placeholder).await
    }
}
