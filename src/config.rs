use educe::Educe;
use serde::{Deserialize, Serialize};

/// The built-in field strategies a struct type can be bound to by default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Fields in declaration order, no drift tolerance.
    #[default]
    Plain,
    /// Fields in declaration order, with a field-name table once per type per call.
    Compatible,
    /// Every field carries its tag and byte length.
    Tagged,
    /// Fields in declaration order, filtered by version range, with one version per record.
    Versioned,
}

/// Engine configuration, fixed at construction.
///
/// Loadable with serde; missing keys take their defaults.
#[derive(Clone, Debug, Educe, Serialize, Deserialize)]
#[educe(PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// Refuse to encode or decode any type that wasn't registered up front. When off, unknown
    /// types are registered on first use and their names are written where a type tag is needed.
    #[educe(Default = true)]
    pub registration_required: bool,
    /// Strategy bound to struct types registered without an explicit one.
    pub default_strategy: StrategyKind,
    /// Track object identities so shared objects are written once and cycles terminate.
    #[educe(Default = true)]
    pub references: bool,
    /// Encode int and long fields (and int/long arrays) as zigzag varints instead of fixed width.
    #[educe(Default = true)]
    pub var_ints: bool,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registration_required(mut self, required: bool) -> Self {
        self.registration_required = required;
        self
    }

    pub fn default_strategy(mut self, kind: StrategyKind) -> Self {
        self.default_strategy = kind;
        self
    }

    pub fn references(mut self, references: bool) -> Self {
        self.references = references;
        self
    }

    pub fn var_ints(mut self, var_ints: bool) -> Self {
        self.var_ints = var_ints;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert!(config.registration_required);
        assert!(config.references);
        assert!(config.var_ints);
        assert_eq!(config.default_strategy, StrategyKind::Plain);
    }

    #[test]
    fn from_json() {
        let config: Config =
            serde_json::from_str(r#"{ "default_strategy": "Tagged", "var_ints": false }"#)
                .unwrap();
        assert_eq!(
            config,
            Config::new()
                .default_strategy(StrategyKind::Tagged)
                .var_ints(false)
        );
        let empty: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(empty, Config::default());
    }
}
