//! Non-vegan ingredient keywords.
//!
//! The built-in list is fixed at compile time. Extra keywords from the config
//! file are merged on top of it at startup.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

/// Ingredients (and E-numbers) that usually come from animals.
const BUILTIN_KEYWORDS: &[&str] = &[
    // dairy
    "milk",
    "milkfat",
    "butter",
    "butterfat",
    "buttermilk",
    "cream",
    "cheese",
    "whey",
    "casein",
    "caseinate",
    "sodium caseinate",
    "lactose",
    "lactalbumin",
    "lactoglobulin",
    "yogurt",
    "yoghurt",
    "ghee",
    "curd",
    "kefir",
    // eggs
    "egg",
    "eggs",
    "albumin",
    "albumen",
    "ovalbumin",
    "lysozyme",
    "mayonnaise",
    // meat and fish
    "meat",
    "beef",
    "pork",
    "ham",
    "bacon",
    "chicken",
    "turkey",
    "lamb",
    "veal",
    "duck",
    "fish",
    "anchovy",
    "anchovies",
    "tuna",
    "salmon",
    "shrimp",
    "prawn",
    "crab",
    "lobster",
    "shellfish",
    "oyster",
    "mussel",
    "squid",
    "fish sauce",
    "gelatin",
    "gelatine",
    "collagen",
    "lard",
    "tallow",
    "suet",
    "bone char",
    "bone phosphate",
    "rennet",
    "pepsin",
    "isinglass",
    // insects and other animal products
    "honey",
    "beeswax",
    "royal jelly",
    "propolis",
    "carmine",
    "cochineal",
    "shellac",
    "lanolin",
    "cholecalciferol",
    "vitamin d3",
    "omega-3 fish oil",
    "l-cysteine",
    // E-numbers
    "e120",
    "e441",
    "e542",
    "e901",
    "e904",
    "e913",
    "e966",
    "e1105",
];

/// Plant-based phrases that contain a keyword but are not animal products.
/// They are blanked out before keywords are matched.
const PLANT_BASED_EXCEPTIONS: &[&str] = &[
    "almond milk",
    "cashew milk",
    "coconut milk",
    "coconut milk powder",
    "hemp milk",
    "oat milk",
    "rice milk",
    "soy milk",
    "soya milk",
    "coconut cream",
    "cream of tartar",
    "cocoa butter",
    "cacao butter",
    "shea butter",
    "peanut butter",
    "almond butter",
    "nut butter",
    "butter beans",
    "mango butter",
];

static EXCEPTIONS: LazyLock<Regex> = LazyLock::new(|| {
    let mut phrases: Vec<&str> = PLANT_BASED_EXCEPTIONS.to_vec();
    phrases.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = phrases
        .iter()
        .map(|p| regex::escape(p))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{})\b", alternation))
        .expect("plant-based exception patterns must compile")
});

static BUILTIN: LazyLock<KeywordSet> = LazyLock::new(|| {
    KeywordSet::new(BUILTIN_KEYWORDS.iter().copied())
        .expect("built-in keyword patterns must compile")
});

#[derive(Debug, Clone)]
struct Keyword {
    word: String,
    pattern: Regex,
}

/// A set of lowercase keywords, each matched as a whole word.
#[derive(Debug, Clone)]
pub struct KeywordSet {
    /// Longest keyword first so more specific terms are reported first.
    entries: Vec<Keyword>,
}

impl KeywordSet {
    /// Build a set from arbitrary strings. Entries are trimmed, lowercased and
    /// de-duplicated; empty entries are skipped.
    pub fn new<I, S>(words: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let unique: BTreeSet<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let mut words: Vec<String> = unique.into_iter().collect();
        words.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        let entries = words
            .into_iter()
            .map(|word| {
                let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&word)))?;
                Ok(Keyword { word, pattern })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { entries })
    }

    /// The compiled-in keyword list.
    pub fn builtin() -> &'static KeywordSet {
        &BUILTIN
    }

    /// The built-in list plus `extra`.
    pub fn builtin_with<I, S>(extra: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words: Vec<String> = BUILTIN_KEYWORDS
            .iter()
            .map(|w| w.to_string())
            .chain(extra.into_iter().map(|w| w.as_ref().to_string()))
            .collect();
        Self::new(words)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        let needle = word.trim().to_lowercase();
        self.entries.iter().any(|k| k.word == needle)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|k| k.word.as_str())
    }

    /// First keyword that occurs in `text` as a whole word, ignoring
    /// plant-based phrases such as "coconut milk" or "cocoa butter".
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let masked = EXCEPTIONS.replace_all(text, " ");
        self.entries
            .iter()
            .find(|k| k.pattern.is_match(&masked))
            .map(|k| k.word.as_str())
    }
}
