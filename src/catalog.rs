// 📚 Catalog - the fixed set of Pokemon people vote on
// Entities are immutable: created at startup, never mutated, never deleted.
//
// The built-in catalog holds the ten classic Pokemon. A CSV file with an
// `id,name,image,type` header can replace it.

use crate::error::{Result as VoteResult, VoteError};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

pub type EntityId = u32;

const SPRITE_BASE: &str = "https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon";

// ============================================================================
// ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    pub image: String,
    #[serde(rename = "type")]
    pub category: String,
}

impl Entity {
    pub fn new(id: EntityId, name: &str, image: &str, category: &str) -> Self {
        Entity {
            id,
            name: name.to_string(),
            image: image.to_string(),
            category: category.to_string(),
        }
    }
}

// ============================================================================
// CATALOG
// ============================================================================

/// Ordered (by id) list of entities whose ids are exactly `1..=N`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    entities: Vec<Entity>,
}

impl Catalog {
    /// The ten Pokemon the app ships with
    pub fn builtin() -> Self {
        let sprite = |dex: u32| format!("{}/{}.png", SPRITE_BASE, dex);

        let entities = vec![
            Entity::new(1, "Pikachu", &sprite(25), "Electric"),
            Entity::new(2, "Charizard", &sprite(6), "Fire/Flying"),
            Entity::new(3, "Blastoise", &sprite(9), "Water"),
            Entity::new(4, "Venusaur", &sprite(3), "Grass/Poison"),
            Entity::new(5, "Mewtwo", &sprite(150), "Psychic"),
            Entity::new(6, "Mew", &sprite(151), "Psychic"),
            Entity::new(7, "Dragonite", &sprite(149), "Dragon/Flying"),
            Entity::new(8, "Snorlax", &sprite(143), "Normal"),
            Entity::new(9, "Gengar", &sprite(94), "Ghost/Poison"),
            Entity::new(10, "Machamp", &sprite(68), "Fighting"),
        ];

        Catalog { entities }
    }

    /// Build a catalog, checking that ids are unique, contiguous from 1 and
    /// that every entity has a name
    pub fn from_entities(mut entities: Vec<Entity>) -> VoteResult<Self> {
        entities.sort_by_key(|e| e.id);

        let mut seen = HashSet::new();
        for entity in &entities {
            if !seen.insert(entity.id) {
                return Err(VoteError::InvalidCatalog(format!(
                    "duplicate id {}",
                    entity.id
                )));
            }
            if entity.name.trim().is_empty() {
                return Err(VoteError::InvalidCatalog(format!(
                    "entity {} has an empty name",
                    entity.id
                )));
            }
        }

        for (index, entity) in entities.iter().enumerate() {
            let expected = index as EntityId + 1;
            if entity.id != expected {
                return Err(VoteError::InvalidCatalog(format!(
                    "ids must run 1..={} without gaps, found {} where {} was expected",
                    entities.len(),
                    entity.id,
                    expected
                )));
            }
        }

        Ok(Catalog { entities })
    }

    /// Load a catalog from CSV (`id,name,image,type`)
    pub fn load_csv(csv_path: &Path) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(csv_path)
            .with_context(|| format!("Failed to open catalog file {:?}", csv_path))?;

        let mut entities = Vec::new();
        for result in rdr.deserialize() {
            let entity: Entity = result.context("Failed to deserialize catalog entry")?;
            entities.push(entity);
        }

        let catalog = Catalog::from_entities(entities)?;
        tracing::info!(path = ?csv_path, entities = catalog.len(), "catalog loaded");
        Ok(catalog)
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn ids(&self) -> Vec<EntityId> {
        self.entities.iter().map(|e| e.id).collect()
    }

    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        // ids are 1..=N in order, so the position is id - 1
        let index = (id as usize).checked_sub(1)?;
        self.entities.get(index)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.get(id).is_some()
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

// ============================================================================
// TESTS
// ============================================================================
