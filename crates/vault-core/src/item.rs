use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::VaultCategory;

/// Opaque item identifier, unique across every vault.
///
/// New items get a UUID v4 string; ids imported from the legacy blob keep
/// whatever form they had there. Ids are never reused.
pub type ItemId = String;

/// Generate a fresh id for a newly created item.
pub fn generate_item_id() -> ItemId {
    Uuid::new_v4().to_string()
}

/// Physical/graded condition of a collectible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Condition {
    #[serde(rename = "Gem Mint")]
    GemMint,
    Mint,
    #[serde(rename = "Near Mint")]
    NearMint,
    #[serde(rename = "Very Fine")]
    VeryFine,
    Fine,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Fair,
    Poor,
    /// Default for freshly scanned items until the user grades them.
    #[default]
    Ungraded,
}

impl Condition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Condition::GemMint => "Gem Mint",
            Condition::Mint => "Mint",
            Condition::NearMint => "Near Mint",
            Condition::VeryFine => "Very Fine",
            Condition::Fine => "Fine",
            Condition::VeryGood => "Very Good",
            Condition::Good => "Good",
            Condition::Fair => "Fair",
            Condition::Poor => "Poor",
            Condition::Ungraded => "Ungraded",
        }
    }
}

impl std::fmt::Display for Condition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Citation attached to a grounded appraisal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    pub title: String,
    pub uri: String,
}

/// Drop citations with an empty URI; a title alone is not citable.
pub fn retain_citable(sources: Vec<SourceRef>) -> Vec<SourceRef> {
    sources.into_iter().filter(|s| !s.uri.is_empty()).collect()
}

/// The persisted entity: one collectible in one vault.
///
/// Serialized with camelCase field names, matching both the on-device
/// payload format and the legacy export blob.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectibleItem {
    pub id: ItemId,
    pub category: VaultCategory,

    // Identity/descriptive fields. Meaning varies by vault:
    // title = name/player/denomination, sub_title = issue/set/mint mark,
    // provider = publisher/manufacturer/grading service.
    pub title: String,
    #[serde(default)]
    pub sub_title: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default)]
    pub year: String,
    #[serde(default)]
    pub condition: Condition,

    // Appraisal fields, replaced wholesale on each re-evaluation.
    #[serde(default)]
    pub significance: String,
    #[serde(default)]
    pub estimated_value: f64,
    #[serde(default)]
    pub facts: Vec<String>,
    #[serde(default)]
    pub ai_justification: String,
    #[serde(default)]
    pub sources: Vec<SourceRef>,

    /// Size-reduced photo, base64 JPEG. Overwritten only explicitly.
    #[serde(default, alias = "imageUrl", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    pub date_added: DateTime<Utc>,
    pub last_valued: DateTime<Utc>,
}

impl CollectibleItem {
    /// Enforce persist-time invariants: `estimated_value` is a finite number
    /// (never NaN/undefined), and every citation carries a URI.
    pub fn normalized(mut self) -> Self {
        if !self.estimated_value.is_finite() {
            self.estimated_value = 0.0;
        }
        self.sources = retain_citable(self.sources);
        self
    }

    /// Apply a re-evaluation patch.
    ///
    /// Touches only the appraisal fields and `last_valued`; id, category,
    /// identity fields, image, and `date_added` are left as they were.
    pub fn apply_appraisal(&mut self, patch: AppraisalPatch) {
        self.estimated_value = if patch.estimated_value.is_finite() {
            patch.estimated_value
        } else {
            0.0
        };
        self.facts = patch.facts;
        self.significance = patch.significance;
        self.ai_justification = patch.ai_justification;
        self.sources = retain_citable(patch.sources);
        self.last_valued = patch.valued_at;
    }
}

/// Result of a successful re-evaluation, scoped to the fields it may change.
///
/// Produced by the appraisal pipeline; applied by the caller through
/// [`CollectibleItem::apply_appraisal`] after the write is confirmed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppraisalPatch {
    pub estimated_value: f64,
    pub facts: Vec<String>,
    pub significance: String,
    pub ai_justification: String,
    pub sources: Vec<SourceRef>,
    pub valued_at: DateTime<Utc>,
}
