use bulwark_types::TokenSymbol;
use std::collections::BTreeMap;

/// Bidirectional mapping between canonical (ledger-facing) symbols and the
/// display symbols users and the recommendation engine tend to write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AliasTable {
    to_canonical: BTreeMap<TokenSymbol, TokenSymbol>,
    to_display: BTreeMap<TokenSymbol, TokenSymbol>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `display` as the user-facing name of `canonical`.
    /// First registration wins: a display symbol that is already taken, or
    /// that is canonical for another token, is ignored.
    pub fn with_alias(mut self, canonical: impl Into<TokenSymbol>, display: impl Into<TokenSymbol>) -> Self {
        self.insert(canonical.into(), display.into());
        self
    }

    pub fn insert(&mut self, canonical: TokenSymbol, display: TokenSymbol) {
        if canonical == display
            || self.to_canonical.contains_key(&display)
            || self.to_canonical.contains_key(&canonical)
            || self.to_display.contains_key(&display)
            || self.to_display.contains_key(&canonical)
        {
            return;
        }
        self.to_canonical.insert(display.clone(), canonical.clone());
        self.to_display.insert(canonical, display);
    }

    pub fn canonicalize(&self, symbol: &TokenSymbol) -> TokenSymbol {
        self.to_canonical
            .get(symbol)
            .cloned()
            .unwrap_or_else(|| symbol.clone())
    }

    pub fn display(&self, symbol: &TokenSymbol) -> TokenSymbol {
        let canonical = self.canonicalize(symbol);
        self.to_display.get(&canonical).cloned().unwrap_or(canonical)
    }

    /// `(canonical, display)` pairs in canonical order.
    pub fn pairs(&self) -> impl Iterator<Item = (&TokenSymbol, &TokenSymbol)> {
        self.to_display.iter()
    }

    pub fn len(&self) -> usize {
        self.to_display.len()
    }

    pub fn is_empty(&self) -> bool {
        self.to_display.is_empty()
    }
}
