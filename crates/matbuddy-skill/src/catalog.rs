// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The embedded technique catalog.

use std::sync::LazyLock;

use serde::Deserialize;

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| {
    let categories = serde_json::from_str(include_str!("../data/techniques.json"))
        .expect("embedded technique catalog is valid");
    Catalog { categories }
});

/// Technique names recognised inside free-form notes.
const KNOWN_TECHNIQUES: &[&str] = &[
    "hip escape", "shrimp", "bridge", "technical stand-up", "granby roll",
    "elbow escape", "trap and roll", "upa",
    "closed guard", "half guard", "open guard", "butterfly guard",
    "de la riva", "spider guard", "lasso guard", "x-guard",
    "single leg x", "rubber guard",
    "torreando", "double under", "knee slice", "knee cut",
    "leg drag", "smash pass", "over-under", "stack pass",
    "long step", "body lock pass",
    "scissor sweep", "flower sweep", "hip bump", "butterfly sweep",
    "tripod sweep", "pendulum sweep", "sickle sweep",
    "single leg", "double leg", "hip throw", "ankle pick",
    "osoto gari", "arm drag", "snap down", "collar drag",
    "armbar", "triangle", "rear naked choke", "rnc",
    "guillotine", "kimura", "americana", "omoplata",
    "ezekiel", "cross choke", "collar choke", "bow and arrow",
    "arm triangle", "darce", "anaconda", "north-south choke",
    "loop choke", "baseball choke",
    "mount", "side control", "back control", "knee on belly",
    "turtle", "north-south", "crucifix",
    "seatbelt", "underhook", "overhook", "frames",
    "collar grip", "sleeve grip",
];

/// The full curriculum, in presentation order.
#[derive(Debug)]
pub struct Catalog {
    categories: Vec<Category>,
}

#[derive(Debug, Deserialize)]
pub struct Category {
    pub key: String,
    pub name: String,
    pub items: Vec<Technique>,
}

#[derive(Debug, Deserialize)]
pub struct Technique {
    pub key: String,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub video_url: String,
    /// Curriculum block the technique is taught in.
    pub block: u8,
}

pub fn catalog() -> &'static Catalog {
    &CATALOG
}

impl Catalog {
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    fn techniques(&self) -> impl Iterator<Item = &Technique> {
        self.categories.iter().flat_map(|c| c.items.iter())
    }

    /// Techniques whose name or key contains `query`; failing that, those
    /// matching any single word of it. `query` must already be lowercase.
    pub fn search(&self, query: &str) -> Vec<&Technique> {
        let hits = |needle: &str, t: &Technique| {
            t.name.to_lowercase().contains(needle) || t.key.contains(needle)
        };

        let exact: Vec<_> = self.techniques().filter(|t| hits(query, t)).collect();
        if !exact.is_empty() {
            return exact;
        }
        self.techniques()
            .filter(|t| query.split_whitespace().any(|word| hits(word, t)))
            .collect()
    }

    /// Category by exact key, else the first whose key or name contains `query`.
    pub fn category(&self, query: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.key == query).or_else(|| {
            self.categories
                .iter()
                .find(|c| c.key.contains(query) || c.name.to_lowercase().contains(query))
        })
    }
}

/// Known technique names mentioned in `text`, title-cased, in list order.
pub fn find_techniques_in_text(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    KNOWN_TECHNIQUES
        .iter()
        .filter(|t| lower.contains(*t))
        .map(|t| title_case(t))
        .collect()
}

fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut at_word_start = true;
    for c in s.chars() {
        if at_word_start {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        at_word_start = !c.is_alphabetic();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_all_categories() {
        let keys: Vec<_> = catalog().categories().iter().map(|c| c.key.as_str()).collect();
        assert_eq!(
            keys,
            [
                "escapes",
                "submissions",
                "sweeps",
                "guardpasses",
                "takedowns",
                "positions",
                "ukemi",
                "selfdefense"
            ]
        );
        assert!(catalog().categories().iter().all(|c| !c.items.is_empty()));
    }

    #[test]
    fn kimura_search_finds_one_technique_with_video() {
        let hits = catalog().search("kimura");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "kimura (double wristlock)");
        assert_eq!(hits[0].video_url, "https://youtu.be/tVJpb6zRXxo");
    }

    #[test]
    fn search_falls_back_to_single_words() {
        let hits = catalog().search("flying kimura");
        assert!(hits.iter().any(|t| t.key == "kimura"));
    }

    #[test]
    fn category_lookup_is_exact_then_partial() {
        assert_eq!(catalog().category("sweeps").unwrap().key, "sweeps");
        assert_eq!(catalog().category("pass").unwrap().key, "guardpasses");
        assert!(catalog().category("yoga").is_none());
    }

    #[test]
    fn techniques_in_text_are_title_cased() {
        let found = find_techniques_in_text("Hit a rear naked choke from the x-guard sweep");
        assert_eq!(found, ["X-Guard", "Rear Naked Choke"]);
    }
}
