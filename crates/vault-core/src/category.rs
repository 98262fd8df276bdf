use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A vault is an independent storage partition for one collectible category.
///
/// An item's category is fixed at creation; moving an item between vaults
/// is delete-and-recreate, never an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VaultCategory {
    Comics,
    Sports,
    Fantasy,
    Coins,
}

impl VaultCategory {
    pub const ALL: [VaultCategory; 4] = [
        VaultCategory::Comics,
        VaultCategory::Sports,
        VaultCategory::Fantasy,
        VaultCategory::Coins,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VaultCategory::Comics => "comics",
            VaultCategory::Sports => "sports",
            VaultCategory::Fantasy => "fantasy",
            VaultCategory::Coins => "coins",
        }
    }
}

impl fmt::Display for VaultCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category string that does not name a known vault.
#[derive(Debug, thiserror::Error)]
#[error("Unknown vault category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for VaultCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "comics" => Ok(VaultCategory::Comics),
            "sports" => Ok(VaultCategory::Sports),
            "fantasy" => Ok(VaultCategory::Fantasy),
            "coins" => Ok(VaultCategory::Coins),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_str() {
        for cat in VaultCategory::ALL {
            let parsed: VaultCategory = cat.as_str().parse().unwrap();
            assert_eq!(parsed, cat);
        }
    }

    #[test]
    fn serde_uses_lowercase() {
        let json = serde_json::to_string(&VaultCategory::Sports).unwrap();
        assert_eq!(json, "\"sports\"");
        let back: VaultCategory = serde_json::from_str("\"coins\"").unwrap();
        assert_eq!(back, VaultCategory::Coins);
    }

    #[test]
    fn unknown_category_is_an_error() {
        let err = "stamps".parse::<VaultCategory>().unwrap_err();
        assert!(err.to_string().contains("stamps"));
    }
}
