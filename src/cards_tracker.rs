//! Keep track of added or removed cards

use crate::cards::try_get_cards;
use crate::rts::hardware::SoundSystem;
use std::collections::BTreeSet;
use tracing::{info, warn};

/// Cards that appeared or vanished between two polls
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CardsDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl CardsDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct CardsTracker {
    cards: Option<BTreeSet<String>>,
    /// Result of the last poll, until taken
    changes: CardsDiff,
}

impl CardsTracker {
    /// Create it without polling anything yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll the cards and compare them with the last snapshot
    ///
    /// The first call only takes the snapshot.  A failed poll keeps the
    /// last snapshot and reports nothing.
    pub fn diff(&mut self, sys: &dyn SoundSystem) -> CardsDiff {
        // listing cards is much cheaper than listing every pcm
        let cards: BTreeSet<String> = match try_get_cards(sys) {
            Ok(cards) => cards.into_iter().collect(),
            Err(e) => {
                warn!("Could not list cards, keeping the last snapshot: {}", e);
                self.changes = CardsDiff::default();
                return CardsDiff::default();
            }
        };
        let diff = match &self.cards {
            None => CardsDiff::default(),
            Some(old) => CardsDiff {
                added: cards.difference(old).cloned().collect(),
                removed: old.difference(&cards).cloned().collect(),
            },
        };
        self.cards = Some(cards);
        self.changes = diff.clone();
        diff
    }

    /// Hand out what the last poll found
    pub fn take_changes(&mut self) -> CardsDiff {
        std::mem::take(&mut self.changes)
    }

    /// Write to the log if cards were added or removed, true if so
    pub fn log_new_pcms(&mut self, sys: &dyn SoundSystem) -> bool {
        let diff = self.diff(sys);
        for card in diff.removed.iter() {
            info!("PCM {} was removed", card);
        }
        for card in diff.added.iter() {
            info!("Found new PCM {}", card);
        }
        !diff.is_empty()
    }
}
