/**
 * Knowledge Graph Module
 *
 * DESIGN DECISION: `Node`/`Edge` are projected copies of scalar entity/
 * relationship fields, not references into the originals.
 * WHY: spec §5 — "the knowledge graph *borrows* ids but stores projected
 * copies of scalar fields"; this also makes the graph trivially
 * serializable without lifetime parameters.
 *
 * PATTERN: spec §3/§6 data model (no direct teacher/original_source
 * ancestor for this exact shape; grounded in the teacher's general
 * id-map-plus-metadata struct style, e.g. its pattern registry).
 */

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::{Entity, EntityType};
use crate::relationship::{RelationType, Relationship};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub text: String,
    pub entity_type: EntityType,
    pub confidence: f64,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub relation_type: RelationType,
    pub confidence: f64,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphMetadata {
    pub document_id: String,
    pub created_at: DateTime<Utc>,
}

/// Two maps (nodes-by-id, edges-by-id) plus metadata; owns no information
/// the inputs did not (spec §3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeGraph {
    pub nodes: BTreeMap<String, Node>,
    pub edges: BTreeMap<String, Edge>,
    pub metadata: GraphMetadata,
}

impl KnowledgeGraph {
    /// Build a graph from a filtered entity/relationship batch. Callers are
    /// expected to have already applied confidence/type filters (spec
    /// §4.11 step 4); this function only projects.
    pub fn build(document_id: impl Into<String>, created_at: DateTime<Utc>, entities: &[Entity], relationships: &[Relationship]) -> Self {
        let mut nodes = BTreeMap::new();
        for entity in entities {
            nodes.insert(
                entity.id.clone(),
                Node {
                    id: entity.id.clone(),
                    text: entity.text.clone(),
                    entity_type: entity.entity_type,
                    confidence: entity.confidence,
                    metadata: entity.metadata.clone(),
                },
            );
        }

        let mut edges = BTreeMap::new();
        for relationship in relationships {
            if !nodes.contains_key(&relationship.source_id) || !nodes.contains_key(&relationship.target_id) {
                continue;
            }
            edges.insert(
                relationship.id.clone(),
                Edge {
                    id: relationship.id.clone(),
                    source: relationship.source_id.clone(),
                    target: relationship.target_id.clone(),
                    relation_type: relationship.relation_type,
                    confidence: relationship.confidence,
                    metadata: relationship.metadata.clone(),
                },
            );
        }

        Self {
            nodes,
            edges,
            metadata: GraphMetadata { document_id: document_id.into(), created_at },
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Invariant check: every edge endpoint references a node id (spec §3).
    pub fn is_well_formed(&self) -> bool {
        self.edges
            .values()
            .all(|e| self.nodes.contains_key(&e.source) && self.nodes.contains_key(&e.target))
    }
}
