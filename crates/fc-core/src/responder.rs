//! Reply strategies for the conversation session.
//!
//! A [`Responder`] stands in for an inference backend: given the message
//! history it produces the assistant's next reply. Implementations here are
//! placeholders; swap in a real backend by implementing the trait.

use std::future::{Future, ready};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::conversation::{Attachment, AttachmentKind, Message, Role};

/// Content (plus optional attachments) for one assistant message.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Reply {
    pub fn text(content: &str) -> Self {
        Self {
            content: content.to_string(),
            attachments: Vec::new(),
        }
    }

    pub fn with_attachment(mut self, kind: AttachmentKind, title: &str, description: &str) -> Self {
        self.attachments.push(Attachment {
            kind,
            title: title.to_string(),
            description: description.to_string(),
        });
        self
    }
}

pub trait Responder: Send + Sync + 'static {
    fn respond(&self, history: &[Message]) -> impl Future<Output = Reply> + Send;
}

/// The canned replies used by the reference assistant.
pub fn reference_replies() -> Vec<Reply> {
    vec![
        Reply::text("I'm analyzing the ARGO data for your query. Here are the results I found:")
            .with_attachment(
                AttachmentKind::Chart,
                "Data Visualization",
                "Interactive chart showing your requested data",
            ),
        Reply::text(
            "Based on the ARGO float network data, here's what I discovered about your query:",
        )
        .with_attachment(
            AttachmentKind::Table,
            "Data Summary",
            "Tabular view of the relevant measurements",
        ),
        Reply::text(
            "I found several interesting patterns in the ocean data. \
             Let me break this down for you with some visualizations:",
        ),
    ]
}

/// Picks uniformly at random from a fixed candidate set.
pub struct RandomResponder {
    candidates: Vec<Reply>,
    rng: Mutex<SmallRng>,
}

impl RandomResponder {
    pub fn new(candidates: Vec<Reply>, rng: SmallRng) -> Self {
        let candidates = if candidates.is_empty() {
            tracing::warn!("random responder given no candidates, using reference replies");
            reference_replies()
        } else {
            candidates
        };
        Self {
            candidates,
            rng: Mutex::new(rng),
        }
    }

    /// Reference replies with an OS-seeded generator.
    pub fn reference() -> Self {
        Self::new(reference_replies(), SmallRng::from_os_rng())
    }

    pub fn seeded(seed: u64) -> Self {
        Self::new(reference_replies(), SmallRng::seed_from_u64(seed))
    }

    fn pick(&self) -> Reply {
        let idx = {
            let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
            rng.random_range(0..self.candidates.len())
        };
        self.candidates[idx].clone()
    }
}

impl Responder for RandomResponder {
    fn respond(&self, _history: &[Message]) -> impl Future<Output = Reply> + Send {
        ready(self.pick())
    }
}

/// Deterministic responder: cycles through `replies` in order.
/// With no replies it echoes the latest user message.
pub struct ScriptedResponder {
    replies: Vec<Reply>,
    cursor: AtomicUsize,
}

impl ScriptedResponder {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            replies,
            cursor: AtomicUsize::new(0),
        }
    }

    pub fn echo() -> Self {
        Self::new(Vec::new())
    }

    fn next_reply(&self, history: &[Message]) -> Reply {
        if self.replies.is_empty() {
            let last = history
                .iter()
                .rev()
                .find(|m| m.role == Role::User)
                .map(|m| m.content.as_str())
                .unwrap_or("");
            return Reply::text(&format!("You said: {last}"));
        }
        let n = self.cursor.fetch_add(1, Ordering::Relaxed);
        self.replies[n % self.replies.len()].clone()
    }
}

impl Responder for ScriptedResponder {
    fn respond(&self, history: &[Message]) -> impl Future<Output = Reply> + Send {
        ready(self.next_reply(history))
    }
}
