//! Aggregate reporting over a store snapshot.
//!
//! Pure functions: the UI fetches items from the store and hands the slice
//! here, keeping one-way data flow from store to view.

use serde::Serialize;

use crate::category::VaultCategory;
use crate::item::CollectibleItem;

/// Value summary for one vault partition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySummary {
    pub category: VaultCategory,
    pub item_count: usize,
    pub total_value: f64,
    pub average_value: f64,
}

/// Portfolio-wide report, one summary per vault (empty vaults included).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VaultReport {
    pub total_items: usize,
    pub total_value: f64,
    pub categories: Vec<CategorySummary>,
}

impl VaultReport {
    pub fn for_items(items: &[CollectibleItem]) -> Self {
        let categories = VaultCategory::ALL
            .iter()
            .map(|&category| {
                let mut count = 0usize;
                let mut total = 0.0f64;
                for item in items.iter().filter(|i| i.category == category) {
                    count += 1;
                    total += item.estimated_value;
                }
                CategorySummary {
                    category,
                    item_count: count,
                    total_value: total,
                    average_value: if count > 0 { total / count as f64 } else { 0.0 },
                }
            })
            .collect::<Vec<_>>();

        VaultReport {
            total_items: items.len(),
            total_value: categories.iter().map(|c| c.total_value).sum(),
            categories,
        }
    }

    pub fn summary_for(&self, category: VaultCategory) -> &CategorySummary {
        // ALL covers every variant, so the find cannot miss.
        self.categories
            .iter()
            .find(|c| c.category == category)
            .expect("summary exists for every category")
    }
}
