//! Word supply
//!
//! Secret words are drawn from a static bank organised as groups of categories.
//! The engine only depends on the [`WordSupply`] trait so tests can inject a
//! deterministic source.

use crate::types::{CategoryGroup, CategoryId, WordCategory, WordPair};
use rand::seq::IndexedRandom;

/// Category preselected for newly created rooms
pub const DEFAULT_CATEGORY: &str = "tft-units";

pub trait WordSupply: Send + Sync {
    /// Draw a random word, restricted to `category_ids` when any of them match.
    /// Falls back to the full pool when the selection is empty or unknown.
    fn random_word(&self, category_ids: &[CategoryId]) -> WordPair;

    /// All category groups, for category selection in the lobby
    fn groups(&self) -> &[CategoryGroup];

    fn has_category(&self, id: &str) -> bool {
        self.groups()
            .iter()
            .flat_map(|g| g.categories.iter())
            .any(|c| c.id == id)
    }
}

/// Built-in word bank
#[derive(Debug, Clone)]
pub struct WordBank {
    groups: Vec<CategoryGroup>,
}

impl WordBank {
    pub fn new() -> Self {
        Self {
            groups: builtin_groups(),
        }
    }

    fn categories(&self) -> impl Iterator<Item = &WordCategory> {
        self.groups.iter().flat_map(|g| g.categories.iter())
    }

    /// Words belonging to any of the given categories
    pub fn words_in(&self, category_ids: &[CategoryId]) -> Vec<&WordPair> {
        self.categories()
            .filter(|c| category_ids.iter().any(|id| *id == c.id))
            .flat_map(|c| c.words.iter())
            .collect()
    }

    pub fn all_words(&self) -> Vec<&WordPair> {
        self.categories().flat_map(|c| c.words.iter()).collect()
    }
}

impl Default for WordBank {
    fn default() -> Self {
        Self::new()
    }
}

impl WordSupply for WordBank {
    fn random_word(&self, category_ids: &[CategoryId]) -> WordPair {
        let mut pool = self.words_in(category_ids);
        if pool.is_empty() {
            if !category_ids.is_empty() {
                tracing::warn!(
                    "No words for categories {:?}, drawing from the full bank",
                    category_ids
                );
            }
            pool = self.all_words();
        }

        pool.choose(&mut rand::rng())
            .map(|w| (*w).clone())
            .unwrap_or_else(|| WordPair {
                word: "Pizza".to_string(),
                category: "Italian food".to_string(),
            })
    }

    fn groups(&self) -> &[CategoryGroup] {
        &self.groups
    }
}

fn category(id: &str, name: &str, description: &str, words: &[(&str, &str)]) -> WordCategory {
    WordCategory {
        id: id.to_string(),
        name: name.to_string(),
        description: description.to_string(),
        words: words
            .iter()
            .map(|(word, category)| WordPair {
                word: word.to_string(),
                category: category.to_string(),
            })
            .collect(),
    }
}

fn builtin_groups() -> Vec<CategoryGroup> {
    vec![
        CategoryGroup {
            id: "tft".to_string(),
            name: "TFT (Teamfight Tactics)".to_string(),
            description: "League of Legends auto-battler content".to_string(),
            categories: vec![
                category(
                    "tft-units",
                    "TFT Units",
                    "Champions and their characteristics",
                    TFT_UNITS,
                ),
                category(
                    "tft-augments",
                    "TFT Augments",
                    "Game-changing augment choices",
                    TFT_AUGMENTS,
                ),
            ],
        },
        CategoryGroup {
            id: "general".to_string(),
            name: "General Knowledge".to_string(),
            description: "Everyday topics everyone knows".to_string(),
            categories: vec![
                category("food", "Food & Drinks", "Popular foods and beverages", FOOD),
                category("movies", "Movies & Shows", "Famous films and TV series", MOVIES),
            ],
        },
    ]
}

const TFT_UNITS: &[(&str, &str)] = &[
    ("Aatrox", "Frontline"),
    ("Ahri", "AP"),
    ("Akali", "Frontline"),
    ("Ashe", "Recommended Item: Guinsoos Rageblade"),
    ("Braum", "Cost ≥ 3"),
    ("Caitlyn", "Backline access"),
    ("Darius", "AD"),
    ("Ekko", "Support"),
    ("Ezreal", "Recommended Item: Spear of Shojin"),
    ("Garen", "Cost ≤ 3"),
    ("Gwen", "AP"),
    ("Janna", "Support"),
    ("Jarvan", "Frontline"),
    ("Jhin", "Recommended Item: Infinity Edge"),
    ("KSante", "Cost ≥ 3"),
    ("Katarina", "Backline access"),
    ("Kayle", "AP"),
    ("Kennen", "Bruiser"),
    ("Lux", "Recommended Item: Jeweled Gauntlet"),
    ("Malphite", "Cost ≤ 3"),
    ("Malzahar", "AP"),
    ("Neeko", "Frontline"),
    ("Poppy", "Bruiser"),
    ("Rakan", "Support"),
    ("Rell", "Frontline"),
    ("Ryze", "Recommended Item: Rabadons Deathcap"),
    ("Samira", "AD"),
    ("Senna", "Cost ≥ 3"),
    ("Seraphine", "AP"),
    ("Shen", "Frontline"),
    ("Sivir", "AD"),
    ("Swain", "Recommended Item: Gargoyle"),
    ("Syndra", "Recommended Item: Archangel"),
    ("Twisted Fate", "Backline"),
    ("Udyr", "Bruiser"),
    ("Varus", "Recommended Item: Last Whisper"),
    ("Vi", "Cost ≤ 3"),
    ("Viego", "AD"),
    ("Volibear", "Frontline"),
    ("Xayah", "Recommended Item: Krakens Fury"),
    ("Xin Zhao", "Tank"),
    ("Yasuo", "Backline access"),
    ("Yone", "Bruiser"),
];

const TFT_AUGMENTS: &[(&str, &str)] = &[
    ("Trade Sector", "Augment - Econ (2-1)"),
    ("Clear Mind", "Augment - Gold (2-1)"),
    ("Prismatic Ticket", "Augment - Econ (2-1, 3-2)"),
    ("Call to Chaos", "Augment - Prismatic (4-2)"),
    ("Pandora's Bench", "Augment - Econ (2-1, 3-2)"),
    ("Birthday Present", "Augment - Prismatic (2-1)"),
    ("Level Up!", "Augment - Econ (2-1)"),
    ("Second Wind", "Augment - Combat (2-1, 3-2, 4-2)"),
    ("Climb The Ladder", "Augment - Combat (3-2, 4-2)"),
    ("Tiny Titans", "Augment - Combat (2-1)"),
    ("Stand United", "Augment - Combat (3-2, 4-2)"),
    ("High End Shopping", "Augment - Combat (2-1, 3-2)"),
    ("Radiant Relics", "Augment - Prismatic (2-1, 3-2, 4-2)"),
    ("Portable Forge", "Augment - Items (2-1, 3-2, 4-2)"),
    ("Pandora's Items", "Augment - Items (2-1, 3-2, 4-2)"),
    ("Item Grab Bag", "Augment - Items (3-2, 4-2)"),
    ("Lucky Gloves", "Augment - Prismatic (2-1, 3-2, 4-2)"),
    ("Salvage Bin", "Augment - Items (2-1, 3-2, 4-2)"),
    ("Worth The Wait", "Augment - Prismatic (2-1)"),
    ("Golemify", "Augment - Gold (3-2)"),
];

const FOOD: &[(&str, &str)] = &[
    ("Pizza", "Italian food"),
    ("Sushi", "Japanese food"),
    ("Tacos", "Mexican food"),
    ("Burger", "Fast food"),
    ("Pasta", "Italian food"),
    ("Ramen", "Japanese food"),
    ("Chocolate", "Sweet treat"),
    ("Coffee", "Hot beverage"),
    ("Ice Cream", "Frozen dessert"),
    ("Steak", "Meat dish"),
    ("Salad", "Healthy food"),
    ("Sandwich", "Lunch food"),
    ("Cereal", "Breakfast food"),
    ("Wine", "Alcoholic drink"),
    ("Apple", "Fruit"),
];

const MOVIES: &[(&str, &str)] = &[
    ("Avatar", "Sci-fi movie"),
    ("Titanic", "Romance movie"),
    ("Friends", "TV comedy show"),
    ("The Office", "TV comedy show"),
    ("Breaking Bad", "TV drama show"),
    ("Star Wars", "Sci-fi franchise"),
    ("Marvel", "Superhero franchise"),
    ("Harry Potter", "Fantasy franchise"),
    ("The Lion King", "Disney movie"),
    ("Frozen", "Animated movie"),
    ("Game of Thrones", "Fantasy TV show"),
    ("Stranger Things", "Netflix series"),
    ("The Batman", "Superhero movie"),
    ("Shrek", "Comedy movie"),
    ("Squid Game", "Korean series"),
];
