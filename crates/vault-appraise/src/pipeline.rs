//! The identification & appraisal pipeline.
//!
//! One scan runs identify -> research -> structure strictly in sequence,
//! each stage consuming the previous stage's output, each remote call
//! wrapped in the shared retry combinator. When the grounded route is
//! unavailable, the scan degrades to basic mode: identification only, no
//! citations, results clearly marked as estimates.
//!
//! The pipeline never writes to the local store; it hands drafts and
//! patches back for the caller to persist.

use chrono::Utc;

use vault_core::{
    generate_item_id, AppraisalPatch, CollectibleItem, Condition, VaultCategory,
};

use crate::client::ModelClient;
use crate::config::PipelineConfig;
use crate::profiles::profile_for;
use crate::retry::with_backoff;
use crate::structuring::AppraisalRecord;
use crate::types::AppraiseError;

/// Stage at which a pipeline run can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Identifying,
    Researching,
    Structuring,
    FallbackIdentifying,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            PipelineStage::Identifying => "identifying",
            PipelineStage::Researching => "researching",
            PipelineStage::Structuring => "structuring",
            PipelineStage::FallbackIdentifying => "fallback-identifying",
        })
    }
}

/// A pipeline failure, carrying the stage it died in so the caller can
/// report "identified but not valued" distinctly from a total failure.
#[derive(Debug, thiserror::Error)]
#[error("{stage} stage failed: {error}")]
pub struct ScanError {
    pub stage: PipelineStage,
    pub error: AppraiseError,
}

impl ScanError {
    fn at(stage: PipelineStage) -> impl FnOnce(AppraiseError) -> ScanError {
        move |error| ScanError { stage, error }
    }
}

/// A completed scan: the draft item plus how it was produced.
#[derive(Debug)]
pub struct ScanOutcome {
    pub item: CollectibleItem,
    /// True when the draft came from the basic-mode route and the valuation
    /// is lower-confidence.
    pub degraded: bool,
}

/// Drives the scan and re-evaluation flows against a [`ModelClient`].
pub struct AppraisalPipeline<C: ModelClient> {
    client: C,
    config: PipelineConfig,
}

impl<C: ModelClient> AppraisalPipeline<C> {
    pub fn new(client: C) -> Self {
        Self::with_config(client, PipelineConfig::default())
    }

    pub fn with_config(client: C, config: PipelineConfig) -> Self {
        Self { client, config }
    }

    /// Photograph-to-draft: the full grounded route, degrading to basic mode
    /// when the service is unavailable (never for configuration or
    /// bad-response failures).
    pub async fn scan(
        &self,
        image_b64: &str,
        category: VaultCategory,
    ) -> Result<ScanOutcome, ScanError> {
        match self.scan_grounded(image_b64, category).await {
            Ok(outcome) => Ok(outcome),
            Err(failure) if failure.error.allows_fallback() => {
                tracing::warn!(
                    stage = %failure.stage,
                    error = %failure.error,
                    "grounded scan unavailable, degrading to basic mode"
                );
                self.scan_basic(image_b64, category).await
            }
            Err(failure) => Err(failure),
        }
    }

    async fn scan_grounded(
        &self,
        image_b64: &str,
        category: VaultCategory,
    ) -> Result<ScanOutcome, ScanError> {
        let profile = profile_for(category);
        let policy = self.config.retry.primary;

        let prompt = profile.identify_prompt();
        let identification = with_backoff(policy, || self.client.identify(image_b64, &prompt))
            .await
            .map_err(ScanError::at(PipelineStage::Identifying))?;
        tracing::debug!(vault = %category, "identification complete");

        let query = profile.research_query(&identification);
        let answer = with_backoff(policy, || self.client.research(&query))
            .await
            .map_err(ScanError::at(PipelineStage::Researching))?;
        tracing::debug!(citations = answer.sources.len(), "research complete");

        let combined = format!(
            "Identification:\n{}\n\nMarket research:\n{}",
            identification, answer.text
        );
        let raw = with_backoff(policy, || self.client.structure(&combined))
            .await
            .map_err(ScanError::at(PipelineStage::Structuring))?;
        let record = AppraisalRecord::from_json_text(&raw)
            .map_err(ScanError::at(PipelineStage::Structuring))?;

        Ok(ScanOutcome {
            item: assemble_draft(category, record, answer.sources, image_b64),
            degraded: false,
        })
    }

    async fn scan_basic(
        &self,
        image_b64: &str,
        category: VaultCategory,
    ) -> Result<ScanOutcome, ScanError> {
        let profile = profile_for(category);
        let policy = self.config.retry.fallback;

        // Identify and value in one call: the basic prompt asks for the full
        // appraisal shape, so the degraded draft still carries an estimate.
        let prompt = profile.basic_prompt();
        let raw = with_backoff(policy, || self.client.identify_basic(image_b64, &prompt))
            .await
            .map_err(ScanError::at(PipelineStage::FallbackIdentifying))?;
        let mut record = AppraisalRecord::from_json_text(&raw)
            .map_err(ScanError::at(PipelineStage::FallbackIdentifying))?;

        // Mark the result so the user can tell the valuation is an estimate.
        if record.significance.is_empty() {
            record.significance = "Identified in basic mode (estimated)".to_string();
        } else {
            record.significance.push_str(" (estimated)");
        }
        record
            .facts
            .push("Valued without live market data (basic mode)".to_string());

        Ok(ScanOutcome {
            item: assemble_draft(category, record, Vec::new(), image_b64),
            degraded: true,
        })
    }

    /// Fresh grounded valuation for an item already in the vault.
    ///
    /// Returns a patch scoped to the appraisal fields; the caller applies it
    /// with [`CollectibleItem::apply_appraisal`] after persisting. There is
    /// no basic-mode fallback here: a failed re-valuation leaves the item,
    /// including `last_valued`, exactly as it was.
    pub async fn re_evaluate(&self, item: &CollectibleItem) -> Result<AppraisalPatch, ScanError> {
        let profile = profile_for(item.category);
        let policy = self.config.retry.primary;

        let query = profile.re_evaluation_query(item);
        let answer = with_backoff(policy, || self.client.research(&query))
            .await
            .map_err(ScanError::at(PipelineStage::Researching))?;

        let raw = with_backoff(policy, || self.client.structure(&answer.text))
            .await
            .map_err(ScanError::at(PipelineStage::Structuring))?;
        let record = AppraisalRecord::from_json_text(&raw)
            .map_err(ScanError::at(PipelineStage::Structuring))?;

        Ok(AppraisalPatch {
            estimated_value: record.estimated_value,
            facts: if record.facts.is_empty() {
                item.facts.clone()
            } else {
                record.facts
            },
            significance: if record.significance.is_empty() {
                item.significance.clone()
            } else {
                record.significance
            },
            ai_justification: record.justification,
            sources: answer.sources,
            valued_at: Utc::now(),
        })
    }
}

fn assemble_draft(
    category: VaultCategory,
    record: AppraisalRecord,
    sources: Vec<vault_core::SourceRef>,
    image_b64: &str,
) -> CollectibleItem {
    let now = Utc::now();
    CollectibleItem {
        id: generate_item_id(),
        category,
        title: record.title,
        sub_title: record.sub_title,
        provider: record.provider,
        year: record.year,
        condition: Condition::Ungraded,
        significance: record.significance,
        estimated_value: record.estimated_value,
        facts: record.facts,
        ai_justification: record.justification,
        sources,
        image: Some(image_b64.to_string()),
        date_added: now,
        last_valued: now,
    }
    .normalized()
}
