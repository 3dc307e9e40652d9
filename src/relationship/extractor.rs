use crate::entity::Entity;
use crate::error::Error;

use super::Relationship;

/// Given (text, entities), emits relationships whose endpoints are drawn
/// from the input entity set (spec §4.9).
pub trait RelationshipExtractor: Send + Sync {
    fn extract(&self, text: &str, entities: &[Entity]) -> Result<Vec<Relationship>, Error>;
}
