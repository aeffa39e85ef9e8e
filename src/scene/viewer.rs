//! Viewer set: the tokens whose vantage drives occlusion fading and culling

use super::ids::TokenId;
use super::token::Token;

/// Which rule produced the viewer set
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViewerSource {
    /// Controlled, visible tokens
    Controlled,
    /// The last controlled token, still visible
    LastControlled,
    /// Every visible token (observer fallback)
    Observer,
    /// No visible tokens at all
    Empty,
}

/// Tokens used as the point of view for this update cycle
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerSet {
    ids: Vec<TokenId>,
    source: ViewerSource,
}

impl ViewerSet {
    /// Resolve viewers: controlled and visible tokens if any, else the last
    /// controlled token if still visible, else all visible tokens.
    pub fn resolve(tokens: &[Token], last_controlled: Option<&TokenId>) -> Self {
        let controlled: Vec<TokenId> = tokens
            .iter()
            .filter(|t| t.controlled && t.visible)
            .map(|t| t.id.clone())
            .collect();
        if !controlled.is_empty() {
            return Self { ids: controlled, source: ViewerSource::Controlled };
        }

        if let Some(last) = last_controlled {
            if tokens.iter().any(|t| &t.id == last && t.visible) {
                return Self { ids: vec![last.clone()], source: ViewerSource::LastControlled };
            }
        }

        let observed: Vec<TokenId> = tokens
            .iter()
            .filter(|t| t.visible)
            .map(|t| t.id.clone())
            .collect();
        let source = if observed.is_empty() { ViewerSource::Empty } else { ViewerSource::Observer };
        Self { ids: observed, source }
    }

    pub fn ids(&self) -> &[TokenId] {
        &self.ids
    }

    pub fn source(&self) -> ViewerSource {
        self.source
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, id: &TokenId) -> bool {
        self.ids.contains(id)
    }

    /// The viewer tokens themselves, in input order
    pub fn tokens<'a>(&self, tokens: &'a [Token]) -> Vec<&'a Token> {
        tokens.iter().filter(|t| self.contains(&t.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Rect;

    fn token(id: &str) -> Token {
        Token::new(id, Rect::new(0.0, 0.0, 100.0, 100.0))
    }

    #[test]
    fn test_controlled_visible_tokens_win() {
        let tokens = vec![
            token("a").with_controlled(true),
            token("b"),
            token("c").with_controlled(true).with_visible(false),
        ];
        let set = ViewerSet::resolve(&tokens, Some(&TokenId::from("b")));
        assert_eq!(set.source(), ViewerSource::Controlled);
        assert_eq!(set.ids(), &[TokenId::from("a")]);
    }

    #[test]
    fn test_last_controlled_fallback() {
        let tokens = vec![token("a"), token("b")];
        let set = ViewerSet::resolve(&tokens, Some(&TokenId::from("b")));
        assert_eq!(set.source(), ViewerSource::LastControlled);
        assert_eq!(set.ids(), &[TokenId::from("b")]);
    }

    #[test]
    fn test_observer_fallback_when_last_controlled_hidden() {
        let tokens = vec![token("a"), token("b").with_visible(false), token("c")];
        let set = ViewerSet::resolve(&tokens, Some(&TokenId::from("b")));
        assert_eq!(set.source(), ViewerSource::Observer);
        assert_eq!(set.ids(), &[TokenId::from("a"), TokenId::from("c")]);
        assert_eq!(set.tokens(&tokens).len(), 2);
    }

    #[test]
    fn test_empty_when_nothing_visible() {
        let tokens = vec![token("a").with_visible(false)];
        let set = ViewerSet::resolve(&tokens, None);
        assert!(set.is_empty());
        assert_eq!(set.source(), ViewerSource::Empty);
    }
}
