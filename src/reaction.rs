//! Mutually exclusive spark/glow reactions on a record.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reaction {
    Spark,
    Glow,
}

/// Reaction counters of a record plus the current user's own reaction.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reactions {
    pub spark_count: u64,
    pub glow_count: u64,
    #[serde(default)]
    pub mine: Option<Reaction>,
}

impl Reactions {
    pub fn new(spark_count: u64, glow_count: u64) -> Self {
        Self {
            spark_count,
            glow_count,
            mine: None,
        }
    }

    /// Toggle the current user's reaction.
    ///
    /// The same reaction again withdraws it. A different reaction moves one
    /// unit from the old counter to the new one. Counters never go below zero.
    pub fn toggle(&mut self, reaction: Reaction) {
        match self.mine {
            Some(current) if current == reaction => {
                self.decrement(reaction);
                self.mine = None;
            }
            Some(current) => {
                self.decrement(current);
                self.increment(reaction);
                self.mine = Some(reaction);
            }
            None => {
                self.increment(reaction);
                self.mine = Some(reaction);
            }
        }
    }

    pub fn count(&self, reaction: Reaction) -> u64 {
        match reaction {
            Reaction::Spark => self.spark_count,
            Reaction::Glow => self.glow_count,
        }
    }

    fn counter_mut(&mut self, reaction: Reaction) -> &mut u64 {
        match reaction {
            Reaction::Spark => &mut self.spark_count,
            Reaction::Glow => &mut self.glow_count,
        }
    }

    fn increment(&mut self, reaction: Reaction) {
        let counter = self.counter_mut(reaction);
        *counter = counter.saturating_add(1);
    }

    fn decrement(&mut self, reaction: Reaction) {
        let counter = self.counter_mut(reaction);
        *counter = counter.saturating_sub(1);
    }
}

/// Records that carry reaction counters.
pub trait Reactable {
    fn reactions(&self) -> &Reactions;
    fn reactions_mut(&mut self) -> &mut Reactions;

    fn toggle_reaction(&mut self, reaction: Reaction) {
        self.reactions_mut().toggle(reaction);
    }
}
