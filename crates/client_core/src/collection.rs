use shared::domain::{Card, CardField};

/// Ordered cards under review. Out-of-range indices are silent no-ops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardCollection {
    cards: Vec<Card>,
}

impl CardCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace_all(&mut self, cards: Vec<Card>) {
        self.cards = cards;
    }

    pub fn remove_at(&mut self, index: usize) -> Option<Card> {
        if index < self.cards.len() {
            Some(self.cards.remove(index))
        } else {
            None
        }
    }

    /// Returns `false` when `index` is out of range.
    pub fn update_field(&mut self, index: usize, field: CardField, value: impl Into<String>) -> bool {
        match self.cards.get_mut(index) {
            Some(card) => {
                card.set_field(field, value.into());
                true
            }
            None => false,
        }
    }

    pub fn count(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Card> {
        self.cards.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Card> {
        self.cards.iter()
    }

    pub fn as_slice(&self) -> &[Card] {
        &self.cards
    }

    pub fn to_vec(&self) -> Vec<Card> {
        self.cards.clone()
    }
}

impl From<Vec<Card>> for CardCollection {
    fn from(cards: Vec<Card>) -> Self {
        Self { cards }
    }
}

impl<'a> IntoIterator for &'a CardCollection {
    type Item = &'a Card;
    type IntoIter = std::slice::Iter<'a, Card>;

    fn into_iter(self) -> Self::IntoIter {
        self.cards.iter()
    }
}

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod tests;
