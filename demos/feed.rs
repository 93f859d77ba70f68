//! A feed session end to end: optimistic posts, a flaky server, a reload
//! from the shadow. Run with `RUST_LOG=luvhive_state=debug` to see the
//! reconciliation and eviction logs.

use std::fmt;

use luvhive_state::{
    events, new_record_id, MemoryBackend, PersistenceShadow, Reactable, Reaction, Reactions,
    Record, Remote, ShadowConfig, Synchronizer,
};
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug, Serialize, Deserialize, Record)]
#[record(collection = "posts")]
struct Post {
    id: String,
    content: String,
    #[serde(default)]
    reactions: Reactions,
}

impl Reactable for Post {
    fn reactions(&self) -> &Reactions {
        &self.reactions
    }

    fn reactions_mut(&mut self) -> &mut Reactions {
        &mut self.reactions
    }
}

#[derive(Debug)]
struct Offline;

impl fmt::Display for Offline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "network unreachable")
    }
}

/// Server that accepts everything until it is switched off.
#[derive(Default)]
struct Backend {
    posts: Vec<Post>,
    down: bool,
}

impl Remote<Post> for Backend {
    type Error = Offline;

    fn fetch(&mut self) -> Result<Vec<Post>, Offline> {
        if self.down {
            return Err(Offline);
        }
        Ok(self.posts.clone())
    }

    fn create(&mut self, record: &Post, _idempotency_key: &str) -> Result<Post, Offline> {
        if self.down {
            return Err(Offline);
        }
        self.posts.insert(0, record.clone());
        Ok(record.clone())
    }

    fn update(&mut self, record: &Post) -> Result<Post, Offline> {
        if self.down {
            return Err(Offline);
        }
        if let Some(slot) = self.posts.iter_mut().find(|p| p.id == record.id) {
            *slot = record.clone();
        }
        Ok(record.clone())
    }

    fn delete(&mut self, id: &str) -> Result<(), Offline> {
        if self.down {
            return Err(Offline);
        }
        self.posts.retain(|p| p.id != id);
        Ok(())
    }
}

fn post(content: &str) -> Post {
    Post {
        id: new_record_id(),
        content: content.to_string(),
        reactions: Reactions::default(),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let shadow = PersistenceShadow::new(
        MemoryBackend::with_quota(16 * 1024),
        ShadowConfig::default().with_cap("posts", 10),
    );
    shadow.write_session(&serde_json::json!({ "username": "alice" }))?;

    let mut feed = Synchronizer::new(Backend::default());
    feed.store_mut().on(events::APPENDED, |id| println!("render: appended {}", id));

    let first = feed.create(post("first light"))?;
    feed.edit(&first, |p| p.toggle_reaction(Reaction::Spark))?;

    feed.remote_mut().down = true;
    if let Err(err) = feed.create(post("written on the subway")) {
        println!("could not publish: {}", err);
    }
    println!("failed posts: {:?}", feed.store().failed_ids());

    feed.persist(&shadow, "alice")?;

    let mut reloaded = Synchronizer::new(Backend::default());
    let count = reloaded.restore(&shadow, "alice");
    println!("reloaded {} posts for alice", count);
    for tracked in reloaded.store().tracked() {
        println!("  {} [{:?}] {}", tracked.id(), tracked.status, tracked.data.content);
    }

    let report = shadow.cleanup()?;
    println!("cleanup scanned {} keys", report.scanned);
    Ok(())
}
