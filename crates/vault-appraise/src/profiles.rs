//! Per-category capability profiles.
//!
//! What "title", "subTitle", and "provider" mean differs per vault (player
//! vs. issue vs. denomination), so each category carries its own instruction
//! text and the prompts are assembled from the profile instead of branching
//! at every call site.

use vault_core::{CollectibleItem, VaultCategory};

/// Instruction profile for one vault category.
#[derive(Debug, Clone, Copy)]
pub struct CategoryProfile {
    pub category: VaultCategory,
    /// What the user is photographing ("comic book", "sports card", ...).
    pub subject: &'static str,
    /// What to extract into each identity field.
    pub field_guide: &'static str,
}

const PROFILES: [CategoryProfile; 4] = [
    CategoryProfile {
        category: VaultCategory::Comics,
        subject: "comic book",
        field_guide: "title: series title; subTitle: issue number and printing; \
                      provider: publisher (Marvel, DC, Image, etc.); year: cover year; \
                      keyFeatures: key-issue notes (first appearance, variant cover, etc.)",
    },
    CategoryProfile {
        category: VaultCategory::Sports,
        subject: "sports card",
        field_guide: "title: player name; subTitle: card set and card number; \
                      provider: manufacturer (Topps, Panini, Upper Deck, etc.); year: set year; \
                      keyFeatures: notable traits (rookie, holo, autograph, etc.)",
    },
    CategoryProfile {
        category: VaultCategory::Fantasy,
        subject: "trading card game card",
        field_guide: "title: card name; subTitle: set name and collector number; \
                      provider: game and publisher (Magic/Wizards, Pokemon, etc.); \
                      year: release year; keyFeatures: rarity, foil treatment, edition",
    },
    CategoryProfile {
        category: VaultCategory::Coins,
        subject: "coin",
        field_guide: "title: denomination and type; subTitle: mint mark and variety; \
                      provider: grading service if slabbed, otherwise mint; year: mint year; \
                      keyFeatures: errors, key dates, strike designations",
    },
];

/// Profile lookup. Every category has one.
pub fn profile_for(category: VaultCategory) -> &'static CategoryProfile {
    PROFILES
        .iter()
        .find(|p| p.category == category)
        .expect("profile exists for every category")
}

impl CategoryProfile {
    /// Vision prompt: identify the item and answer in the fixed JSON shape.
    pub fn identify_prompt(&self) -> String {
        format!(
            "Identify this {subject} from the photo. {guide}.\n\n\
             Return JSON only:\n\
             {{\n\
               \"title\": \"...\",\n\
               \"subTitle\": \"...\",\n\
               \"provider\": \"...\",\n\
               \"year\": \"YYYY\",\n\
               \"keyFeatures\": \"...\"\n\
             }}",
            subject = self.subject,
            guide = self.field_guide,
        )
    }

    /// Basic-mode vision prompt: identify and value in one call, from the
    /// model's own knowledge instead of live market data. Asks for the full
    /// appraisal shape so the degraded draft still carries an estimate.
    pub fn basic_prompt(&self) -> String {
        format!(
            "Identify this {subject} from the photo and estimate its current \
             market value in USD from your own knowledge. {guide}.\n\n\
             Return JSON only:\n\
             {{\n\
               \"title\": \"...\",\n\
               \"subTitle\": \"...\",\n\
               \"provider\": \"...\",\n\
               \"year\": \"YYYY\",\n\
               \"significance\": \"...\",\n\
               \"estimatedValue\": 0,\n\
               \"facts\": [\"...\"],\n\
               \"justification\": \"...\"\n\
             }}",
            subject = self.subject,
            guide = self.field_guide,
        )
    }

    /// Grounded-research query built from an identification.
    pub fn research_query(&self, identification: &str) -> String {
        format!(
            "Current market value of this {subject}: {identification}. \
             Find recent sale prices and price-guide listings, note what drives \
             the value, and state a single realistic estimate in USD.",
            subject = self.subject,
            identification = identification,
        )
    }

    /// Grounded-research query for re-valuing an already catalogued item.
    pub fn re_evaluation_query(&self, item: &CollectibleItem) -> String {
        format!(
            "Current market value of this {subject}: {title}, {sub_title}, \
             {provider}, {year}, condition {condition}. Find recent sale prices, \
             note collector significance, and state a single realistic estimate in USD.",
            subject = self.subject,
            title = item.title,
            sub_title = item.sub_title,
            provider = item.provider,
            year = item.year,
            condition = item.condition,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_a_profile() {
        for cat in VaultCategory::ALL {
            let profile = profile_for(cat);
            assert_eq!(profile.category, cat);
            assert!(!profile.subject.is_empty());
        }
    }

    #[test]
    fn identify_prompt_requests_the_fixed_shape() {
        let prompt = profile_for(VaultCategory::Sports).identify_prompt();
        assert!(prompt.contains("sports card"));
        for field in ["\"title\"", "\"subTitle\"", "\"provider\"", "\"year\"", "\"keyFeatures\""] {
            assert!(prompt.contains(field), "missing {field} in prompt");
        }
    }

    #[test]
    fn basic_prompt_requests_a_valuation() {
        let prompt = profile_for(VaultCategory::Fantasy).basic_prompt();
        assert!(prompt.contains("\"estimatedValue\""));
        assert!(prompt.contains("\"significance\""));
        assert!(prompt.contains("USD"));
    }

    #[test]
    fn research_query_carries_the_identification() {
        let q = profile_for(VaultCategory::Coins)
            .research_query("1909-S VDB Lincoln cent, red-brown");
        assert!(q.contains("coin"));
        assert!(q.contains("1909-S VDB"));
        assert!(q.contains("USD"));
    }
}
