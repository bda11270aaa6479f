//! Naming service: pluralization and case conversion.
//!
//! Builders receive a [`Naming`] explicitly. Every operation must be
//! idempotent, since a name may pass through it more than once.

use heck::ToKebabCase;
use serde::Serialize;

pub trait Naming: Send + Sync {
    fn pluralize(&self, name: &str) -> String;

    fn lower_first(&self, name: &str) -> String {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) => c.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }

    fn upper_first(&self, name: &str) -> String {
        let mut chars = name.chars();
        match chars.next() {
            Some(c) => c.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Rule-based English pluralizer working on the last word of a PascalCase name.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnglishNaming;

const IRREGULAR: &[(&str, &str)] = &[
    ("person", "people"),
    ("child", "children"),
    ("man", "men"),
    ("woman", "women"),
    ("mouse", "mice"),
    ("goose", "geese"),
    ("tooth", "teeth"),
    ("foot", "feet"),
    ("ox", "oxen"),
];

const UNCOUNTABLE: &[&str] = &[
    "data",
    "equipment",
    "fish",
    "information",
    "media",
    "metadata",
    "money",
    "news",
    "series",
    "sheep",
    "species",
];

impl Naming for EnglishNaming {
    fn pluralize(&self, name: &str) -> String {
        let split = last_word_start(name);
        let (head, word) = name.split_at(split);
        format!("{head}{}", pluralize_word(word))
    }
}

/// Byte index where the last PascalCase word starts.
fn last_word_start(name: &str) -> usize {
    name.char_indices()
        .skip(1)
        .filter(|(_, c)| c.is_uppercase())
        .map(|(i, _)| i)
        .last()
        .unwrap_or(0)
}

fn pluralize_word(word: &str) -> String {
    let lower = word.to_lowercase();
    if word.is_empty() || UNCOUNTABLE.contains(&lower.as_str()) {
        return word.to_string();
    }

    for (singular, plural) in IRREGULAR {
        if lower == *plural {
            return word.to_string();
        }
        if lower == *singular {
            return match_case(word, plural);
        }
    }

    if lower.ends_with('s') && !(lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is"))
    {
        return word.to_string();
    }
    if let Some(stem) = lower.strip_suffix("is") {
        return format!("{}es", &word[..stem.len()]);
    }
    if ["ss", "sh", "ch", "x", "z", "us"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    if let Some(stem) = lower.strip_suffix('y') {
        if !stem.ends_with(['a', 'e', 'i', 'o', 'u']) && !stem.is_empty() {
            return format!("{}ies", &word[..stem.len()]);
        }
    }
    format!("{word}s")
}

/// Give `replacement` the capitalisation of `original`'s first letter.
fn match_case(original: &str, replacement: &str) -> String {
    if original.chars().next().is_some_and(char::is_uppercase) {
        EnglishNaming.upper_first(replacement)
    } else {
        replacement.to_string()
    }
}

/// Every derived spelling of an entity name used by the builders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Names {
    /// As declared, e.g. `BlogPost`.
    pub name: String,
    /// `blogPost`
    pub camel: String,
    /// `BlogPosts`
    pub plural: String,
    /// `blogPosts`
    pub camel_plural: String,
    /// Route and UI resource identifier, `blogposts`.
    pub resource: String,
    /// `blog-post`
    pub file_stem: String,
}

impl Names {
    pub fn new(naming: &dyn Naming, name: &str) -> Self {
        let name = naming.upper_first(name);
        let plural = naming.pluralize(&name);
        Self {
            camel: naming.lower_first(&name),
            camel_plural: naming.lower_first(&plural),
            resource: resource_name(naming, &name),
            file_stem: name.to_kebab_case(),
            plural,
            name,
        }
    }
}

/// Pluralized, lowercased entity name used as a route/resource identifier.
pub fn resource_name(naming: &dyn Naming, name: &str) -> String {
    naming.pluralize(name).to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plural(s: &str) -> String {
        EnglishNaming.pluralize(s)
    }

    #[test]
    fn test_regular_plurals() {
        assert_eq!(plural("User"), "Users");
        assert_eq!(plural("Category"), "Categories");
        assert_eq!(plural("Day"), "Days");
        assert_eq!(plural("Address"), "Addresses");
        assert_eq!(plural("Box"), "Boxes");
        assert_eq!(plural("Status"), "Statuses");
        assert_eq!(plural("Analysis"), "Analyses");
        assert_eq!(plural("Match"), "Matches");
    }

    #[test]
    fn test_irregular_and_uncountable() {
        assert_eq!(plural("Person"), "People");
        assert_eq!(plural("SalesPerson"), "SalesPeople");
        assert_eq!(plural("Child"), "Children");
        assert_eq!(plural("News"), "News");
        assert_eq!(plural("UserMetadata"), "UserMetadata");
    }

    #[test]
    fn test_pluralize_is_idempotent() {
        for word in [
            "User", "Category", "Address", "Status", "Person", "Analysis", "BlogPost", "Box",
        ] {
            let once = plural(word);
            assert_eq!(plural(&once), once, "pluralizing {word} twice");
        }
    }

    #[test]
    fn test_case_helpers() {
        let n = EnglishNaming;
        assert_eq!(n.lower_first("BlogPost"), "blogPost");
        assert_eq!(n.lower_first("blogPost"), "blogPost");
        assert_eq!(n.upper_first("blogPost"), "BlogPost");
        assert_eq!(n.upper_first(""), "");
    }

    #[test]
    fn test_names() {
        let names = Names::new(&EnglishNaming, "BlogPost");
        assert_eq!(names.name, "BlogPost");
        assert_eq!(names.camel, "blogPost");
        assert_eq!(names.plural, "BlogPosts");
        assert_eq!(names.camel_plural, "blogPosts");
        assert_eq!(names.resource, "blogposts");
        assert_eq!(names.file_stem, "blog-post");
    }
}
