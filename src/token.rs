//! Token choices offered to a selection surface.
//!
//! Holds no protocol state. The two sides of a swap must use different
//! tokens, so the token already chosen for the other side is never
//! selectable.

use solana_program::pubkey::Pubkey;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    pub mint: Pubkey,
}

#[derive(Clone, Debug, Default)]
pub struct TokenList {
    tokens: Vec<TokenInfo>,
}

impl TokenList {
    pub fn new(tokens: Vec<TokenInfo>) -> Self {
        Self { tokens }
    }

    pub fn tokens(&self) -> &[TokenInfo] {
        &self.tokens
    }

    pub fn by_symbol(&self, symbol: &str) -> Option<&TokenInfo> {
        self.tokens.iter().find(|token| token.symbol == symbol)
    }

    pub fn by_mint(&self, mint: &Pubkey) -> Option<&TokenInfo> {
        self.tokens.iter().find(|token| token.mint == *mint)
    }

    /// Entries that can be chosen while `other` is taken by the opposite side.
    pub fn selectable<'a>(&'a self, other: &'a str) -> impl Iterator<Item = &'a TokenInfo> + 'a {
        self.tokens
            .iter()
            .filter(move |token| !token.symbol.is_empty() && token.symbol != other)
    }

    /// Calls `on_select` with `symbol` if it is listed and not taken by the other side.
    ///
    /// Returns whether the callback ran.
    pub fn select<F>(&self, symbol: &str, other: &str, on_select: F) -> bool
    where
        F: FnOnce(&str),
    {
        match self.selectable(other).find(|token| token.symbol == symbol) {
            Some(token) => {
                on_select(token.symbol.as_str());
                true
            }
            None => {
                log::debug!("token {:?} not selectable against {:?}", symbol, other);
                false
            }
        }
    }
}
