//! Style catalog and semantic style resolution.
//!
//! The catalog is the set of styles a template advertises; resolution maps
//! a semantic role to the best usable styleId and never fails, degrading to
//! the universal default instead.

/// One style a template (or the built-in set) advertises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleEntry {
    pub id: String,
    pub name: String,
}

/// The set of named styles available to the document being built.
///
/// Read-only once constructed; resolution never mutates it.
#[derive(Debug, Clone)]
pub struct StyleCatalog {
    entries: Vec<StyleEntry>,
}

/// Outcome of resolving a semantic role against a catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedStyle {
    pub style_id: String,
    /// True when no candidate matched and the universal default was used.
    pub fallback: bool,
}

/// Semantic paragraph roles the translator asks the catalog for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StyleRole {
    Heading(u8),
    Normal,
    Quote,
    Code,
    ListBullet,
    ListNumber,
}

impl StyleRole {
    /// Candidate template style names, in priority order.
    fn candidates(self) -> Vec<String> {
        match self {
            Self::Heading(level) => vec![format!("Heading {level}")],
            Self::Normal => vec!["Normal".to_string()],
            Self::Quote => vec![
                "Quote".to_string(),
                "Intense Quote".to_string(),
                "Block Text".to_string(),
            ],
            Self::Code => vec![
                "Code".to_string(),
                "Code Block".to_string(),
                "HTML Preformatted".to_string(),
            ],
            Self::ListBullet => vec!["List Bullet".to_string(), "List Paragraph".to_string()],
            Self::ListNumber => vec!["List Number".to_string(), "List Paragraph".to_string()],
        }
    }
}

impl StyleCatalog {
    pub fn new(entries: Vec<StyleEntry>) -> Self {
        Self { entries }
    }

    /// Catalog matching the built-in styles part used when no template is given.
    pub fn builtin() -> Self {
        let entries = [
            ("Normal", "Normal"),
            ("Heading1", "heading 1"),
            ("Heading2", "heading 2"),
            ("Heading3", "heading 3"),
            ("Heading4", "heading 4"),
            ("Heading5", "heading 5"),
            ("Heading6", "heading 6"),
            ("Quote", "Quote"),
            ("Code", "Code"),
            ("ListBullet", "List Bullet"),
            ("ListNumber", "List Number"),
        ]
        .into_iter()
        .map(|(id, name)| StyleEntry {
            id: id.to_string(),
            name: name.to_string(),
        })
        .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[StyleEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find a style by display name or id, tolerating case and spacing variants.
    fn find(&self, wanted: &str) -> Option<&StyleEntry> {
        let wanted = normalize(wanted);
        self.entries
            .iter()
            .find(|entry| normalize(&entry.name) == wanted || normalize(&entry.id) == wanted)
    }

    /// Resolve a semantic role to a concrete styleId.
    ///
    /// Tries each candidate name in order, then degrades to the catalog's
    /// Normal style, then to the literal `Normal` id. A missing custom
    /// style must not abort conversion.
    pub fn resolve(&self, role: StyleRole) -> ResolvedStyle {
        for candidate in role.candidates() {
            if let Some(entry) = self.find(&candidate) {
                return ResolvedStyle {
                    style_id: entry.id.clone(),
                    fallback: false,
                };
            }
        }
        let style_id = self
            .find("Normal")
            .map_or_else(|| "Normal".to_string(), |entry| entry.id.clone());
        ResolvedStyle {
            style_id,
            fallback: !matches!(role, StyleRole::Normal),
        }
    }
}

fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .map(|c| c.to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str) -> StyleEntry {
        StyleEntry {
            id: id.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn builtin_resolves_headings() {
        let catalog = StyleCatalog::builtin();
        let resolved = catalog.resolve(StyleRole::Heading(1));
        assert_eq!(resolved.style_id, "Heading1");
        assert!(!resolved.fallback);
    }

    #[test]
    fn resolution_is_deterministic() {
        let catalog = StyleCatalog::builtin();
        assert_eq!(
            catalog.resolve(StyleRole::Quote),
            catalog.resolve(StyleRole::Quote)
        );
    }

    #[test]
    fn empty_catalog_falls_back_to_normal() {
        let catalog = StyleCatalog::new(Vec::new());
        let resolved = catalog.resolve(StyleRole::Heading(2));
        assert_eq!(resolved.style_id, "Normal");
        assert!(resolved.fallback);
        assert!(!resolved.style_id.is_empty());
    }

    #[test]
    fn normal_is_never_flagged_as_fallback() {
        let catalog = StyleCatalog::new(Vec::new());
        assert!(!catalog.resolve(StyleRole::Normal).fallback);
    }

    #[test]
    fn candidate_chain_is_ordered() {
        let catalog = StyleCatalog::new(vec![
            entry("IntenseQuote", "Intense Quote"),
            entry("Normal", "Normal"),
        ]);
        assert_eq!(catalog.resolve(StyleRole::Quote).style_id, "IntenseQuote");

        let catalog = StyleCatalog::new(vec![
            entry("Quote", "Quote"),
            entry("IntenseQuote", "Intense Quote"),
        ]);
        assert_eq!(catalog.resolve(StyleRole::Quote).style_id, "Quote");
    }

    #[test]
    fn matching_tolerates_spacing_and_case() {
        let catalog = StyleCatalog::new(vec![entry("x1", "heading_1")]);
        assert_eq!(catalog.resolve(StyleRole::Heading(1)).style_id, "x1");

        // Ids count too, the way templates often abbreviate names
        let catalog = StyleCatalog::new(vec![entry("ListBullet", "My Bullets")]);
        assert_eq!(
            catalog.resolve(StyleRole::ListBullet).style_id,
            "ListBullet"
        );
    }

    #[test]
    fn list_roles_share_the_word_default() {
        let catalog = StyleCatalog::new(vec![entry("ListParagraph", "List Paragraph")]);
        assert_eq!(
            catalog.resolve(StyleRole::ListNumber).style_id,
            "ListParagraph"
        );
        assert_eq!(
            catalog.resolve(StyleRole::ListBullet).style_id,
            "ListParagraph"
        );
    }
}
