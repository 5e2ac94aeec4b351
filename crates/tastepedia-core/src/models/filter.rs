//! Multi-facet search filter state and its minimized outgoing form.
//!
//! A facet sitting at its "unset" default is omitted from the outgoing
//! query entirely: a calorie ceiling parked at the slider maximum is not a
//! filter, and sending it as one would be a no-op the server still pays for.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Slider maximum for the calorie ceiling; at this value the facet is unset.
pub const CALORIES_UNSET: u32 = 1000;

/// Slider maximum for the cooking-time ceiling in minutes.
pub const MINUTES_UNSET: u32 = 120;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceTier {
    Low,
    Medium,
    High,
}

impl PriceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

/// Current value of every filter facet, as bound to the UI controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    pub keyword: String,
    pub max_calories: u32,
    pub max_minutes: u32,
    pub max_protein_g: Option<u32>,
    pub cuisines: BTreeSet<String>,
    pub price_tiers: BTreeSet<PriceTier>,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            keyword: String::new(),
            max_calories: CALORIES_UNSET,
            max_minutes: MINUTES_UNSET,
            max_protein_g: None,
            cuisines: BTreeSet::new(),
            price_tiers: BTreeSet::new(),
        }
    }
}

impl FilterState {
    /// Build the minimal outgoing query: only facets that differ from their
    /// unset default appear. An all-default state yields an empty query.
    pub fn minimize(&self) -> SearchQuery {
        let keyword = self.keyword.trim();
        SearchQuery {
            keyword: (!keyword.is_empty()).then(|| keyword.to_string()),
            max_calories: (self.max_calories < CALORIES_UNSET).then_some(self.max_calories),
            max_minutes: (self.max_minutes < MINUTES_UNSET).then_some(self.max_minutes),
            max_protein_g: self.max_protein_g,
            cuisines: self.cuisines.iter().cloned().collect(),
            price_tiers: self.price_tiers.iter().copied().collect(),
        }
    }
}

/// Immutable minimized snapshot of a [`FilterState`], ready to dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchQuery {
    pub keyword: Option<String>,
    pub max_calories: Option<u32>,
    pub max_minutes: Option<u32>,
    pub max_protein_g: Option<u32>,
    pub cuisines: Vec<String>,
    pub price_tiers: Vec<PriceTier>,
}

impl SearchQuery {
    pub fn is_empty(&self) -> bool {
        self.keyword.is_none()
            && self.max_calories.is_none()
            && self.max_minutes.is_none()
            && self.max_protein_g.is_none()
            && self.cuisines.is_empty()
            && self.price_tiers.is_empty()
    }

    /// Flatten into URL query parameters, using the server's facet names.
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(keyword) = &self.keyword {
            params.push(("keyword", keyword.clone()));
        }
        if let Some(max) = self.max_calories {
            params.push(("caloriesMax", max.to_string()));
        }
        if let Some(max) = self.max_minutes {
            params.push(("cookTimeMax", max.to_string()));
        }
        if let Some(max) = self.max_protein_g {
            params.push(("proteinMax", max.to_string()));
        }
        for cuisine in &self.cuisines {
            params.push(("cuisines", cuisine.clone()));
        }
        for tier in &self.price_tiers {
            params.push(("priceTiers", tier.as_str().to_string()));
        }
        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_default_state_produces_empty_query() {
        let query = FilterState::default().minimize();
        assert!(query.is_empty());
        assert!(query.to_query_params().is_empty());
    }

    #[test]
    fn test_facets_at_slider_max_are_omitted() {
        let state = FilterState {
            max_calories: CALORIES_UNSET,
            max_minutes: 30,
            ..FilterState::default()
        };
        let query = state.minimize();
        assert_eq!(query.max_calories, None);
        assert_eq!(query.max_minutes, Some(30));
    }

    #[test]
    fn test_blank_keyword_is_omitted() {
        let state = FilterState {
            keyword: "   ".to_string(),
            ..FilterState::default()
        };
        assert!(state.minimize().is_empty());
    }

    #[test]
    fn test_query_params_use_server_facet_names() {
        let mut state = FilterState {
            keyword: "chicken".to_string(),
            max_calories: 500,
            ..FilterState::default()
        };
        state.cuisines.insert("Thai".to_string());
        state.price_tiers.insert(PriceTier::Low);

        let params = state.minimize().to_query_params();
        assert!(params.contains(&("keyword", "chicken".to_string())));
        assert!(params.contains(&("caloriesMax", "500".to_string())));
        assert!(params.contains(&("cuisines", "Thai".to_string())));
        assert!(params.contains(&("priceTiers", "low".to_string())));
    }
}
