//! Domain entities - Heroes and their wire envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A hero as stored by the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hero {
    pub id: i64,
    pub name: String,
}

impl Hero {
    pub fn new(id: i64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Hero {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}  {}", self.id, self.name)
    }
}

/// A hero that has not been assigned an id yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeroDraft {
    pub name: String,
}

impl HeroDraft {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

// Response envelopes

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeroNodes {
    #[serde(default)]
    pub nodes: Vec<Hero>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllHeroes {
    pub all_heroes: HeroNodes,
}

impl AllHeroes {
    pub fn into_heroes(self) -> Vec<Hero> {
        self.all_heroes.nodes
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeroById {
    pub hero_by_id: Option<Hero>,
}

impl HeroById {
    pub fn into_hero(self) -> Option<Hero> {
        self.hero_by_id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeroesWithTerm {
    pub herowithterm: HeroNodes,
}

impl HeroesWithTerm {
    pub fn into_heroes(self) -> Vec<Hero> {
        self.herowithterm.nodes
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct HeroPayload {
    pub hero: Option<Hero>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateHero {
    pub create_hero: HeroPayload,
}

impl CreateHero {
    pub fn into_hero(self) -> Option<Hero> {
        self.create_hero.hero
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateHero {
    pub update_hero_by_id: HeroPayload,
}

impl UpdateHero {
    pub fn into_hero(self) -> Option<Hero> {
        self.update_hero_by_id.hero
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteHero {
    pub delete_hero_by_id: HeroPayload,
}

impl DeleteHero {
    pub fn into_hero(self) -> Option<Hero> {
        self.delete_hero_by_id.hero
    }
}
