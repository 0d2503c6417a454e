//! Destination name to decorative prefix lookup.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Prefix used for destinations missing from the table.
pub const DEFAULT_PREFIX: &str = "🌍";

static BUILTIN_PREFIXES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("Torn", "🏙️"),
        ("Mexico", "🇲🇽"),
        ("Cayman Islands", "🇰🇾"),
        ("Canada", "🇨🇦"),
        ("Hawaii", "🌺"),
        ("United Kingdom", "🇬🇧"),
        ("Argentina", "🇦🇷"),
        ("Switzerland", "🇨🇭"),
        ("Japan", "🇯🇵"),
        ("China", "🇨🇳"),
        ("UAE", "🇦🇪"),
        ("South Africa", "🇿🇦"),
    ])
});

/// Immutable prefix table with a fallback for unmapped names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixTable {
    entries: HashMap<String, String>,
    fallback: String,
}

impl PrefixTable {
    /// The built-in destinations.
    pub fn builtin() -> Self {
        Self {
            entries: BUILTIN_PREFIXES
                .iter()
                .map(|(name, prefix)| (name.to_string(), prefix.to_string()))
                .collect(),
            fallback: DEFAULT_PREFIX.to_string(),
        }
    }

    /// The built-in destinations with `overrides` merged on top. Later
    /// overrides win over earlier ones.
    pub fn with_overrides(overrides: &[(String, String)]) -> Self {
        let mut table = Self::builtin();
        for (name, prefix) in overrides {
            table.entries.insert(name.trim().to_string(), prefix.clone());
        }
        table
    }

    /// Prefix for a destination. Matching is exact after trimming.
    pub fn lookup(&self, name: &str) -> &str {
        self.entries
            .get(name.trim())
            .map(String::as_str)
            .unwrap_or(&self.fallback)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for PrefixTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_lookup() {
        let table = PrefixTable::builtin();
        assert_eq!(table.len(), 12);
        assert_eq!(table.lookup("Mexico"), "🇲🇽");
        assert_eq!(table.lookup(" Japan "), "🇯🇵");
    }

    #[test]
    fn test_unmapped_uses_fallback() {
        let table = PrefixTable::builtin();
        assert_eq!(table.lookup("Atlantis"), DEFAULT_PREFIX);
        assert_eq!(table.lookup(""), DEFAULT_PREFIX);
        // Matching is case-sensitive.
        assert_eq!(table.lookup("mexico"), DEFAULT_PREFIX);
    }

    #[test]
    fn test_overrides_replace_and_extend() {
        let table = PrefixTable::with_overrides(&[
            ("Torn".to_string(), "<:city:1458205750617833596>".to_string()),
            ("Atlantis".to_string(), "🔱".to_string()),
            ("Atlantis".to_string(), "🌊".to_string()),
        ]);
        assert_eq!(table.lookup("Torn"), "<:city:1458205750617833596>");
        assert_eq!(table.lookup("Atlantis"), "🌊");
        assert_eq!(table.lookup("Canada"), "🇨🇦");
        assert_eq!(table.len(), 13);
    }
}
