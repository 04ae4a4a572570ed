//! Name inflection for routes and action types.
//!
//! Model names are PascalCase (`BankAccount`). Routes use the pluralized,
//! delimited form (`bank_accounts`, `bank-accounts`) and action types use
//! the UPPER_SNAKE form (`BANK_ACCOUNT`).

use convert_case::{Case, Casing};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Words whose plural is the word itself.
const UNCOUNTABLE: &[&str] = &[
    "equipment",
    "information",
    "rice",
    "money",
    "species",
    "series",
    "fish",
    "sheep",
    "jeans",
    "police",
    "news",
    "metadata",
];

/// Irregular singular/plural pairs.
const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("man", "men"),
    ("woman", "women"),
    ("child", "children"),
    ("sex", "sexes"),
    ("move", "moves"),
    ("zombie", "zombies"),
    ("goose", "geese"),
    ("foot", "feet"),
    ("tooth", "teeth"),
    ("mouse", "mice"),
    ("louse", "lice"),
    ("ox", "oxen"),
];

/// Path delimiter style for generated routes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Delimiter {
    /// `bank_accounts`
    Underscore,
    /// `bank-accounts`
    #[default]
    Dasherize,
}

impl Delimiter {
    /// Interpret a configured delimiter. `underscore`, `underscores` and `_`
    /// select [`Delimiter::Underscore`]; anything else dasherizes.
    pub fn parse(value: &str) -> Self {
        match value {
            "underscore" | "underscores" | "_" => Delimiter::Underscore,
            _ => Delimiter::Dasherize,
        }
    }

    fn separator(&self) -> &'static str {
        match self {
            Delimiter::Underscore => "_",
            Delimiter::Dasherize => "-",
        }
    }
}

impl From<String> for Delimiter {
    fn from(value: String) -> Self {
        Delimiter::parse(&value)
    }
}

impl From<Delimiter> for String {
    fn from(delimiter: Delimiter) -> Self {
        delimiter.to_string()
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Underscore => write!(f, "underscore"),
            Delimiter::Dasherize => write!(f, "dasherize"),
        }
    }
}

/// Pluralize a single lower-case word.
pub fn pluralize(word: &str) -> String {
    if word.is_empty() || UNCOUNTABLE.contains(&word) {
        return word.to_string();
    }

    for (singular, plural) in IRREGULAR {
        if word == *singular || word == *plural {
            return plural.to_string();
        }
    }

    if let Some(stem) = word.strip_suffix("quiz") {
        return format!("{stem}quizzes");
    }
    for ending in ["matrix", "vertex", "index"] {
        if let Some(stem) = word.strip_suffix(ending) {
            return format!("{stem}{}ices", &ending[..ending.len() - 2]);
        }
    }
    for ending in ["octopus", "virus"] {
        if let Some(stem) = word.strip_suffix(ending) {
            return format!("{stem}{}i", &ending[..ending.len() - 2]);
        }
    }
    for ending in ["alias", "status"] {
        if word.ends_with(ending) {
            return format!("{word}es");
        }
    }
    if word.ends_with("bus") {
        return format!("{word}es");
    }
    for ending in ["buffalo", "tomato", "potato", "hero"] {
        if word.ends_with(ending) {
            return format!("{word}es");
        }
    }
    if let Some(stem) = word.strip_suffix("sis") {
        return format!("{stem}ses");
    }
    for ending in ["axis", "testis"] {
        if let Some(stem) = word.strip_suffix(ending) {
            return format!("{stem}{}es", &ending[..ending.len() - 2]);
        }
    }
    if let Some(stem) = word.strip_suffix("ium").or_else(|| word.strip_suffix("tum")) {
        let letter = &word[stem.len()..stem.len() + 1];
        return format!("{stem}{letter}a");
    }
    if word.ends_with("hive") {
        return format!("{word}s");
    }
    if let Some(stem) = word.strip_suffix("fe") {
        if !stem.ends_with('f') {
            return format!("{stem}ves");
        }
    }
    if let Some(stem) = word.strip_suffix("lf").or_else(|| word.strip_suffix("rf")) {
        let letter = &word[stem.len()..stem.len() + 1];
        return format!("{stem}{letter}ves");
    }
    if let Some(stem) = word.strip_suffix('y') {
        let vowel_before = stem.ends_with(['a', 'e', 'i', 'o', 'u', 'y']);
        if !vowel_before || stem.ends_with("qu") {
            return format!("{stem}ies");
        }
    }
    for ending in ["x", "ch", "ss", "sh"] {
        if word.ends_with(ending) {
            return format!("{word}es");
        }
    }
    if word.ends_with('s') {
        return word.to_string();
    }

    format!("{word}s")
}

/// The route segment for a model name: snake-cased, optionally
/// pluralized on its last word, joined with the delimiter.
pub fn delimit(name: &str, delimiter: Delimiter, plural: bool) -> String {
    let snake = name.to_case(Case::Snake);
    let mut words: Vec<String> = snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();

    if plural {
        if let Some(last) = words.last_mut() {
            *last = pluralize(last);
        }
    }

    words.join(delimiter.separator())
}

/// The model name as used in action types: `BankAccount` → `BANK_ACCOUNT`.
pub fn action_name(name: &str) -> String {
    name.to_case(Case::Snake).to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralize_regular_words() {
        assert_eq!(pluralize("account"), "accounts");
        assert_eq!(pluralize("story"), "stories");
        assert_eq!(pluralize("day"), "days");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("church"), "churches");
        assert_eq!(pluralize("address"), "addresses");
        assert_eq!(pluralize("todo"), "todos");
    }

    #[test]
    fn pluralize_irregular_words() {
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("people"), "people");
        assert_eq!(pluralize("child"), "children");
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(pluralize("status"), "statuses");
        assert_eq!(pluralize("analysis"), "analyses");
        assert_eq!(pluralize("wife"), "wives");
        assert_eq!(pluralize("shelf"), "shelves");
        assert_eq!(pluralize("index"), "indices");
        assert_eq!(pluralize("medium"), "media");
        assert_eq!(pluralize("quiz"), "quizzes");
    }

    #[test]
    fn pluralize_keeps_plurals() {
        assert_eq!(pluralize("accounts"), "accounts");
    }

    #[test]
    fn delimit_names() {
        assert_eq!(
            delimit("BankAccount", Delimiter::Underscore, true),
            "bank_accounts"
        );
        assert_eq!(
            delimit("BankAccount", Delimiter::Dasherize, true),
            "bank-accounts"
        );
        assert_eq!(
            delimit("CurrentUser", Delimiter::Dasherize, false),
            "current-user"
        );
        assert_eq!(delimit("Person", Delimiter::Dasherize, true), "people");
    }

    #[test]
    fn delimiter_aliases() {
        assert_eq!(Delimiter::parse("_"), Delimiter::Underscore);
        assert_eq!(Delimiter::parse("underscores"), Delimiter::Underscore);
        assert_eq!(Delimiter::parse("underscore"), Delimiter::Underscore);
        assert_eq!(Delimiter::parse("%"), Delimiter::Dasherize);
        assert_eq!(Delimiter::parse(""), Delimiter::Dasherize);
        assert_eq!(Delimiter::parse("-"), Delimiter::Dasherize);
    }

    #[test]
    fn action_names() {
        assert_eq!(action_name("BankAccount"), "BANK_ACCOUNT");
        assert_eq!(action_name("Todo"), "TODO");
    }
}
