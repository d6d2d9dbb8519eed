// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Self-describing governance.
//!
//! The L0 allow-list can live in the L0 entity `l0_governance`:
//!
//! ```json
//! {"allowed_entities": ["core_safety", "l0_governance", "..."]}
//! ```
//!
//! While that entity is absent or malformed the static default applies.
//! Editing it is an ordinary L0 mutation and is recorded in full.

use serde::Deserialize;
use std::sync::Arc;
use strata_kernel::config::GOVERNANCE_ENTITY_ID;
use strata_kernel::governance::{
    validate_allow_list, GovernancePolicy, LayerTable, PolicyOrigin, StaticPolicy,
};
use strata_kernel::layer::{Layer, LayerPolicy};

use crate::layers::LayerSource;

#[derive(Debug, Deserialize)]
struct GovernanceDocument {
    allowed_entities: Vec<String>,
}

/// Layer table from config, allow-list from the governance entity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SelfDescribingPolicy {
    table: LayerTable,
    allow_list: Vec<String>,
}

impl SelfDescribingPolicy {
    /// Parse and validate a governance document.
    pub fn from_document(table: LayerTable, content: &[u8]) -> Result<Self, String> {
        let doc: GovernanceDocument =
            serde_json::from_slice(content).map_err(|e| e.to_string())?;
        validate_allow_list(&doc.allowed_entities).map_err(|e| e.to_string())?;
        Ok(Self {
            table,
            allow_list: doc.allowed_entities,
        })
    }
}

impl GovernancePolicy for SelfDescribingPolicy {
    fn policy_for(&self, layer: Layer) -> LayerPolicy {
        self.table.get(layer)
    }

    fn l0_allow_list(&self) -> &[String] {
        &self.allow_list
    }

    fn origin(&self) -> PolicyOrigin {
        PolicyOrigin::SelfDescribing
    }
}

/// Pick the policy in force right now.
///
/// Uses the governance entity when it exists and validates, `base`
/// otherwise. Never fails.
pub fn resolve_policy(source: &dyn LayerSource, base: &StaticPolicy) -> Arc<dyn GovernancePolicy> {
    let entity = match source.entity(Layer::L0, GOVERNANCE_ENTITY_ID) {
        Ok(Some(entity)) => entity,
        Ok(None) => return Arc::new(base.clone()),
        Err(e) => {
            tracing::warn!("Could not read {}: {}. Using static policy", GOVERNANCE_ENTITY_ID, e);
            return Arc::new(base.clone());
        }
    };

    match SelfDescribingPolicy::from_document(base.table(), &entity.content) {
        Ok(policy) => {
            tracing::debug!(
                "Self-describing governance active ({} L0 entities allowed)",
                policy.allow_list.len()
            );
            Arc::new(policy)
        }
        Err(e) => {
            tracing::warn!("Malformed {}: {}. Using static policy", GOVERNANCE_ENTITY_ID, e);
            Arc::new(base.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::MemoryLayerSource;
    use serde_json::json;

    #[test]
    fn test_absent_entity_uses_static() {
        let source = MemoryLayerSource::new();
        let policy = resolve_policy(&source, &StaticPolicy::default());
        assert_eq!(policy.origin(), PolicyOrigin::Static);
        assert!(policy.is_allowed_in_l0("core_safety"));
    }

    #[test]
    fn test_valid_entity_replaces_allow_list() {
        let source = MemoryLayerSource::new();
        source
            .put(
                Layer::L0,
                GOVERNANCE_ENTITY_ID,
                json!({"allowed_entities": ["l0_governance", "custom_rule"]}).to_string(),
            )
            .unwrap();

        let policy = resolve_policy(&source, &StaticPolicy::default());
        assert_eq!(policy.origin(), PolicyOrigin::SelfDescribing);
        assert!(policy.is_allowed_in_l0("custom_rule"));
        assert!(!policy.is_allowed_in_l0("core_safety"));
    }

    #[test]
    fn test_malformed_entity_falls_back() {
        let cases = [
            "not json".to_string(),
            json!({"allowed_entities": []}).to_string(),
            json!({"allowed_entities": ["Bad-Id", "l0_governance"]}).to_string(),
            json!({"allowed_entities": ["core_safety"]}).to_string(),
        ];
        for content in cases {
            let source = MemoryLayerSource::new();
            source.put(Layer::L0, GOVERNANCE_ENTITY_ID, content).unwrap();
            let policy = resolve_policy(&source, &StaticPolicy::default());
            assert_eq!(policy.origin(), PolicyOrigin::Static);
        }
    }

    #[test]
    fn test_table_comes_from_base() {
        let mut table = LayerTable::default();
        table.set(
            Layer::L1,
            LayerPolicy::new(false, strata_kernel::layer::RecordingMode::Full),
        );
        let source = MemoryLayerSource::new();
        source
            .put(
                Layer::L0,
                GOVERNANCE_ENTITY_ID,
                json!({"allowed_entities": ["l0_governance"]}).to_string(),
            )
            .unwrap();

        let policy = resolve_policy(&source, &StaticPolicy::with_table(table));
        assert!(!policy.policy_for(Layer::L1).mutable);
    }
}
