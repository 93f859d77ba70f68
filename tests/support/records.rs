//! Feed records used across the integration suites.

use luvhive_state::{Reactable, Reactions, Record};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "posts")]
pub struct Post {
    #[record(id)]
    pub id: String,
    pub author: String,
    pub content: String,
    #[serde(default)]
    pub reactions: Reactions,
}

impl Post {
    pub fn new(id: impl Into<String>, content: &str) -> Self {
        Self {
            id: id.into(),
            author: "alice".into(),
            content: content.to_string(),
            reactions: Reactions::default(),
        }
    }
}

impl Reactable for Post {
    fn reactions(&self) -> &Reactions {
        &self.reactions
    }

    fn reactions_mut(&mut self) -> &mut Reactions {
        &mut self.reactions
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "stories")]
pub struct Story {
    pub id: String,
    pub media_url: String,
}

/// A follow relationship, identified by the followed user's handle.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Record)]
#[record(collection = "following")]
pub struct FollowEdge {
    #[record(id)]
    pub username: String,
    pub display_name: String,
}
