//! English pluralization used for table-name inference and
//! relationship-name heuristics.
//!
//! Pure, deterministic string functions with a fixed rule order:
//! irregular table, uncountable table, consonant+`y`, sibilant suffix,
//! consonant+`o`, `f`/`fe` endings, then the default `+s`. Singularization
//! mirrors the same rules. Several rules unify around these (table-name
//! inference, relationship detection, chain heuristics), so the order must
//! not change.

use phf::{phf_map, phf_set};

static IRREGULAR_PLURALS: phf::Map<&'static str, &'static str> = phf_map! {
    "child" => "children",
    "person" => "people",
    "man" => "men",
    "woman" => "women",
    "foot" => "feet",
    "tooth" => "teeth",
    "goose" => "geese",
    "mouse" => "mice",
    "ox" => "oxen",
    "quiz" => "quizzes",
    "bus" => "buses",
    "status" => "statuses",
};

static IRREGULAR_SINGULARS: phf::Map<&'static str, &'static str> = phf_map! {
    "children" => "child",
    "people" => "person",
    "men" => "man",
    "women" => "woman",
    "feet" => "foot",
    "teeth" => "tooth",
    "geese" => "goose",
    "mice" => "mouse",
    "oxen" => "ox",
    "quizzes" => "quiz",
    "buses" => "bus",
    "statuses" => "status",
};

static UNCOUNTABLE: phf::Set<&'static str> = phf_set! {
    "equipment",
    "information",
    "money",
    "news",
    "rice",
    "series",
    "sheep",
    "species",
    "fish",
    "deer",
    "feedback",
    "media",
    "metadata",
};

/// Stems whose singular restores `fe` rather than `f` (knives -> knife).
static FE_STEMS: phf::Set<&'static str> = phf_set! {
    "kni",
    "li",
    "wi",
};

fn is_vowel(c: char) -> bool {
    matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')
}

fn ends_consonant_then(word: &str, last: char) -> bool {
    let mut chars = word.chars().rev();
    if chars.next() != Some(last) {
        return false;
    }
    match chars.next() {
        Some(prev) => prev.is_ascii_alphabetic() && !is_vowel(prev),
        None => false,
    }
}

/// Pluralize an English noun.
pub fn pluralize(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some(plural) = IRREGULAR_PLURALS.get(lower.as_str()) {
        return (*plural).to_string();
    }
    if UNCOUNTABLE.contains(lower.as_str()) {
        return word.to_string();
    }

    if ends_consonant_then(&lower, 'y') {
        return format!("{}ies", &word[..word.len() - 1]);
    }
    if lower.ends_with('s')
        || lower.ends_with("sh")
        || lower.ends_with("ch")
        || lower.ends_with('x')
        || lower.ends_with('z')
    {
        return format!("{}es", word);
    }
    if ends_consonant_then(&lower, 'o') {
        return format!("{}es", word);
    }
    if lower.ends_with("fe") {
        return format!("{}ves", &word[..word.len() - 2]);
    }
    if lower.ends_with('f') {
        return format!("{}ves", &word[..word.len() - 1]);
    }
    format!("{}s", word)
}

/// Singularize an English noun (mirror of `pluralize`).
pub fn singularize(word: &str) -> String {
    let lower = word.to_lowercase();
    if let Some(singular) = IRREGULAR_SINGULARS.get(lower.as_str()) {
        return (*singular).to_string();
    }
    if UNCOUNTABLE.contains(lower.as_str()) {
        return word.to_string();
    }

    if lower.ends_with("ies") && word.len() > 3 {
        return format!("{}y", &word[..word.len() - 3]);
    }
    if lower.ends_with("ves") && word.len() > 3 {
        let stem = &word[..word.len() - 3];
        if FE_STEMS.contains(stem.to_lowercase().as_str()) {
            return format!("{}fe", stem);
        }
        return format!("{}f", stem);
    }
    if lower.ends_with("es") && word.len() > 2 {
        let stem = &lower[..lower.len() - 2];
        let sibilant = stem.ends_with("ss")
            || stem.ends_with("sh")
            || stem.ends_with("ch")
            || stem.ends_with('x')
            || stem.ends_with('z');
        if sibilant || ends_consonant_then(stem, 'o') {
            return word[..word.len() - 2].to_string();
        }
        return word[..word.len() - 1].to_string();
    }
    if lower.ends_with('s') && !lower.ends_with("ss") {
        return word[..word.len() - 1].to_string();
    }
    word.to_string()
}

/// True when the word already looks like a plural form.
pub fn is_plural(word: &str) -> bool {
    !word.is_empty() && singularize(word) != word
}

/// Convert a PascalCase/camelCase identifier to snake_case.
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in name.chars().enumerate() {
        if c.is_ascii_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

/// Infer the conventional table name for a model class short name:
/// snake_case with the final word pluralized (`OrderItem` -> `order_items`).
pub fn table_name(class_short: &str) -> String {
    let snake = snake_case(class_short);
    match snake.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, pluralize(last)),
        None => pluralize(&snake),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pluralize_rules() {
        assert_eq!(pluralize("category"), "categories");
        assert_eq!(pluralize("box"), "boxes");
        assert_eq!(pluralize("dish"), "dishes");
        assert_eq!(pluralize("church"), "churches");
        assert_eq!(pluralize("hero"), "heroes");
        assert_eq!(pluralize("leaf"), "leaves");
        assert_eq!(pluralize("knife"), "knives");
        assert_eq!(pluralize("user"), "users");
        assert_eq!(pluralize("day"), "days");
    }

    #[test]
    fn test_irregular_and_uncountable() {
        assert_eq!(pluralize("child"), "children");
        assert_eq!(singularize("children"), "child");
        assert_eq!(pluralize("person"), "people");
        assert_eq!(pluralize("sheep"), "sheep");
        assert_eq!(singularize("sheep"), "sheep");
    }

    #[test]
    fn test_singularize_rules() {
        assert_eq!(singularize("categories"), "category");
        assert_eq!(singularize("boxes"), "box");
        assert_eq!(singularize("heroes"), "hero");
        assert_eq!(singularize("leaves"), "leaf");
        assert_eq!(singularize("knives"), "knife");
        assert_eq!(singularize("users"), "user");
        assert_eq!(singularize("notes"), "note");
        assert_eq!(singularize("class"), "class");
    }

    #[test]
    fn test_round_trip_regular_nouns() {
        for noun in [
            "user", "category", "box", "leaf", "knife", "note", "tag", "hero", "dish",
            "church", "order", "comment", "post", "day",
        ] {
            assert_eq!(
                singularize(&pluralize(noun)),
                noun,
                "round trip failed for {:?}",
                noun
            );
        }
    }

    #[test]
    fn test_is_plural() {
        assert!(is_plural("posts"));
        assert!(is_plural("categories"));
        assert!(!is_plural("post"));
        assert!(!is_plural("sheep"));
    }

    #[test]
    fn test_snake_case_and_table_name() {
        assert_eq!(snake_case("OrderItem"), "order_item");
        assert_eq!(snake_case("user"), "user");
        assert_eq!(table_name("User"), "users");
        assert_eq!(table_name("OrderItem"), "order_items");
        assert_eq!(table_name("Category"), "categories");
    }
}
