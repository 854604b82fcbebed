//! Tokens: opaque payloads passed between neighbouring particles.

use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// Marker trait for token payloads.
///
/// The engine never inspects a token. Algorithms downcast through
/// [`Token::as_any`] to recover their concrete type.
pub trait Token: Any + Debug + Send + Sync {
    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a token. Sender and receiver may both hold one.
pub type TokenRef = Arc<dyn Token>;

/// Ordered token inventory of one particle.
#[derive(Debug, Clone, Default)]
pub struct TokenInventory {
    tokens: Vec<TokenRef>,
}

impl TokenInventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a token. No capacity bound.
    pub fn put(&mut self, token: TokenRef) {
        self.tokens.push(token);
    }

    /// Removes the token at `index`, shifting later tokens down.
    pub fn take(&mut self, index: usize) -> Option<TokenRef> {
        (index < self.tokens.len()).then(|| self.tokens.remove(index))
    }

    pub fn get(&self, index: usize) -> Option<&TokenRef> {
        self.tokens.get(index)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TokenRef> {
        self.tokens.iter()
    }

    /// Index of the first token of type `T`.
    pub fn position_of<T: Token>(&self) -> Option<usize> {
        self.tokens
            .iter()
            .position(|token| token.as_any().is::<T>())
    }

    /// First token of type `T`.
    pub fn peek<T: Token>(&self) -> Option<&T> {
        self.tokens
            .iter()
            .find_map(|token| token.as_any().downcast_ref::<T>())
    }

    /// Number of tokens of type `T`.
    pub fn count_of<T: Token>(&self) -> usize {
        self.tokens
            .iter()
            .filter(|token| token.as_any().is::<T>())
            .count()
    }
}
