//! Conversation session: an append-only message log plus deferred replies.
//!
//! Every accepted `send` appends the user message immediately and schedules
//! one reply task. The task sleeps for the configured latency, asks the
//! [`Responder`] for a reply and appends it. Tasks are independent, so replies
//! to different sends may land in either order, but a reply is always
//! appended after the message that triggered it.
//!
//! Each task holds a child of the session's cancellation token. Closing or
//! dropping the session cancels them all; the cancel happens under the log
//! lock, so once teardown returns nothing else is ever appended.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use uuid::Uuid;

use crate::config::ConversationConfig;
use crate::constants::GREETING;
use crate::responder::{Reply, Responder};
use crate::time::{now_unix_millis, unix_millis_to_iso8601};

const EVENT_BUFFER: usize = 64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    System,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttachmentKind {
    Chart,
    Map,
    Table,
}

/// A visual the assistant offers alongside its text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub kind: AttachmentKind,
    pub title: String,
    pub description: String,
}

/// Session-unique, assigned in creation order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(pub u64);

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// Unix milliseconds. Never decreases along the log.
    pub timestamp_ms: u64,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl Message {
    pub fn timestamp_iso(&self) -> String {
        unix_millis_to_iso8601(self.timestamp_ms)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingResponse,
}

#[derive(Default)]
struct MessageLog {
    messages: Vec<Message>,
    next_id: u64,
}

impl MessageLog {
    fn append(&mut self, role: Role, content: String, attachments: Vec<Attachment>) -> Message {
        let floor = self.messages.last().map(|m| m.timestamp_ms).unwrap_or(0);
        let message = Message {
            id: MessageId(self.next_id),
            role,
            content,
            timestamp_ms: now_unix_millis().max(floor),
            attachments,
        };
        self.next_id += 1;
        self.messages.push(message.clone());
        message
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|e| e.into_inner())
}

/// One user's conversation with the assistant.
///
/// `send` spawns onto the ambient Tokio runtime and must be called from
/// within one.
pub struct ConversationSession<R: Responder> {
    id: Uuid,
    log: Arc<Mutex<MessageLog>>,
    pending: Arc<Mutex<HashMap<MessageId, CancellationToken>>>,
    shutdown: CancellationToken,
    tracker: TaskTracker,
    responder: Arc<R>,
    latency: Duration,
    events: broadcast::Sender<Message>,
}

impl<R: Responder> ConversationSession<R> {
    pub fn new(responder: R, config: &ConversationConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let session = Self {
            id: Uuid::new_v4(),
            log: Arc::new(Mutex::new(MessageLog::default())),
            pending: Arc::new(Mutex::new(HashMap::new())),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
            responder: Arc::new(responder),
            latency: config.response_latency(),
            events,
        };
        if config.greeting {
            lock(&session.log).append(Role::System, GREETING.to_string(), Vec::new());
        }
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Append a user message and schedule its reply.
    ///
    /// Blank (whitespace-only) text is rejected without touching the log.
    pub fn send(&self, text: &str) -> Option<MessageId> {
        if text.trim().is_empty() {
            return None;
        }
        if self.shutdown.is_cancelled() {
            tracing::warn!(session = %self.id, "send after teardown ignored");
            return None;
        }

        let message = lock(&self.log).append(Role::User, text.to_string(), Vec::new());
        let trigger = message.id;
        let _ = self.events.send(message);

        let token = self.shutdown.child_token();
        lock(&self.pending).insert(trigger, token.clone());
        tracing::debug!(session = %self.id, %trigger, "reply scheduled");

        let log = Arc::clone(&self.log);
        let pending = Arc::clone(&self.pending);
        let responder = Arc::clone(&self.responder);
        let events = self.events.clone();
        let latency = self.latency;
        let session = self.id;

        self.tracker.spawn(async move {
            let fired = tokio::select! {
                _ = token.cancelled() => None,
                reply = deferred_reply(&*responder, &log, latency) => Some(reply),
            };

            if let Some(reply) = fired {
                let appended = {
                    let mut guard = lock(&log);
                    // Checked under the log lock; teardown cancels under the same lock.
                    if token.is_cancelled() {
                        None
                    } else {
                        Some(guard.append(Role::System, reply.content, reply.attachments))
                    }
                };
                match appended {
                    Some(message) => {
                        tracing::debug!(%session, %trigger, reply = %message.id, "reply appended");
                        let _ = events.send(message);
                    }
                    None => tracing::debug!(%session, %trigger, "reply dropped at teardown"),
                }
            } else {
                tracing::debug!(%session, %trigger, "reply cancelled");
            }
            lock(&pending).remove(&trigger);
        });

        Some(trigger)
    }

    pub fn state(&self) -> SessionState {
        if lock(&self.pending).is_empty() {
            SessionState::Idle
        } else {
            SessionState::AwaitingResponse
        }
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Snapshot of the log.
    pub fn messages(&self) -> Vec<Message> {
        lock(&self.log).messages.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.log).messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Messages appended from now on, user and system alike.
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.events.subscribe()
    }

    /// Wait for every reply scheduled so far to land. The session stays open.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel every pending reply, wait for the tasks to finish and
    /// return the final transcript.
    pub async fn close(self) -> Vec<Message> {
        self.cancel_all();
        self.tracker.close();
        self.tracker.wait().await;
        tracing::debug!(session = %self.id, "session closed");
        self.messages()
    }

    fn cancel_all(&self) {
        let _guard = lock(&self.log);
        self.shutdown.cancel();
    }
}

impl<R: Responder> Drop for ConversationSession<R> {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

async fn deferred_reply<R: Responder>(
    responder: &R,
    log: &Mutex<MessageLog>,
    latency: Duration,
) -> Reply {
    tokio::time::sleep(latency).await;
    let history = lock(log).messages.clone();
    responder.respond(&history).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::responder::{RandomResponder, ScriptedResponder, reference_replies};
    use std::future::Future;
    use tokio::time::sleep;

    fn config() -> ConversationConfig {
        ConversationConfig::default()
    }

    fn scripted(replies: &[&str]) -> ScriptedResponder {
        ScriptedResponder::new(replies.iter().map(|r| Reply::text(r)).collect())
    }

    async fn elapse(ms: u64) {
        sleep(Duration::from_millis(ms)).await;
        tokio::task::yield_now().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_hello_gets_a_reply_after_latency() {
        let session = ConversationSession::new(RandomResponder::seeded(42), &config());
        assert!(session.is_empty());

        session.send("hello").unwrap();
        assert_eq!(session.len(), 1);
        assert_eq!(session.state(), SessionState::AwaitingResponse);

        elapse(999).await;
        assert_eq!(session.len(), 1);

        elapse(2).await;
        let log = session.messages();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].role, Role::User);
        assert_eq!(log[0].content, "hello");
        assert_eq!(log[1].role, Role::System);
        assert!(log[1].timestamp_ms >= log[0].timestamp_ms);
        assert!(log[1].id > log[0].id);
        assert!(reference_replies().iter().any(|r| r.content == log[1].content));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_input_is_rejected() {
        let session = ConversationSession::new(ScriptedResponder::echo(), &config());
        assert!(session.send("").is_none());
        assert!(session.send("  \t\n").is_none());
        assert!(session.is_empty());
        assert_eq!(session.state(), SessionState::Idle);
        elapse(5000).await;
        assert!(session.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_responder_sees_trigger_in_history() {
        let session = ConversationSession::new(ScriptedResponder::echo(), &config());
        session.send("salinity near the Gulf Stream").unwrap();
        elapse(1001).await;
        assert_eq!(session.messages()[1].content, "You said: salinity near the Gulf Stream");
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_sends_each_get_a_reply_after_trigger() {
        let session = ConversationSession::new(scripted(&["first", "second"]), &config());
        let a = session.send("a").unwrap();
        elapse(400).await;
        let b = session.send("b").unwrap();
        assert_eq!(session.pending_count(), 2);

        elapse(700).await;
        // a's reply has fired, b's has not
        let log = session.messages();
        assert_eq!(log.len(), 3);
        assert_eq!(log[2].content, "first");
        assert_eq!(session.pending_count(), 1);

        elapse(400).await;
        let log = session.messages();
        assert_eq!(log.len(), 4);
        let pos = |id: MessageId| log.iter().position(|m| m.id == id).unwrap();
        assert!(pos(a) < 2 && pos(b) < 3);
        assert_eq!(log[3].content, "second");
        assert!(log.windows(2).all(|w| w[0].timestamp_ms <= w[1].timestamp_ms));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_replies() {
        let session = ConversationSession::new(scripted(&["late"]), &config());
        let mut rx = session.subscribe();
        session.send("one").unwrap();
        session.send("two").unwrap();

        let transcript = session.close().await;
        assert_eq!(transcript.len(), 2);
        assert!(transcript.iter().all(|m| m.role == Role::User));

        elapse(5000).await;
        assert_eq!(rx.recv().await.unwrap().content, "one");
        assert_eq!(rx.recv().await.unwrap().content, "two");
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_waits_for_replies_without_closing() {
        let session = ConversationSession::new(scripted(&["first", "second"]), &config());
        session.send("a").unwrap();
        elapse(300).await;
        session.send("b").unwrap();

        session.drain().await;
        assert_eq!(session.len(), 4);
        assert_eq!(session.state(), SessionState::Idle);

        session.send("c").unwrap();
        session.drain().await;
        let log = session.messages();
        assert_eq!(log.len(), 6);
        assert_eq!(log[5].content, "first");
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_on_idle_session_returns() {
        let session = ConversationSession::new(ScriptedResponder::echo(), &config());
        session.drain().await;
        assert!(session.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending_replies() {
        let session = ConversationSession::new(scripted(&["late"]), &config());
        let mut rx = session.subscribe();
        session.send("bye").unwrap();
        drop(session);

        elapse(5000).await;
        assert_eq!(rx.recv().await.unwrap().role, Role::User);
        assert!(matches!(rx.recv().await, Err(broadcast::error::RecvError::Closed)));
    }

    struct SlowResponder;

    impl Responder for SlowResponder {
        fn respond(&self, _history: &[Message]) -> impl Future<Output = Reply> + Send {
            async {
                sleep(Duration::from_secs(10)).await;
                Reply::text("too late")
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_while_responder_is_working() {
        let session = ConversationSession::new(SlowResponder, &config());
        session.send("hi").unwrap();
        elapse(2000).await;
        assert_eq!(session.state(), SessionState::AwaitingResponse);

        let transcript = session.close().await;
        assert_eq!(transcript.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_and_latency_are_configurable() {
        let cfg = ConversationConfig {
            response_latency_ms: 50,
            greeting: true,
        };
        let session = ConversationSession::new(scripted(&["ok"]), &cfg);
        let log = session.messages();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].role, Role::System);
        assert_eq!(log[0].content, GREETING);

        session.send("hi").unwrap();
        elapse(51).await;
        assert_eq!(session.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_streams_replies() {
        let session = ConversationSession::new(scripted(&["pong"]), &config());
        let mut rx = session.subscribe();
        session.send("ping").unwrap();
        assert_eq!(rx.recv().await.unwrap().content, "ping");
        let reply = rx.recv().await.unwrap();
        assert_eq!(reply.role, Role::System);
        assert_eq!(reply.content, "pong");
    }

    #[test]
    fn test_message_wire_format() {
        let m = Message {
            id: MessageId(3),
            role: Role::System,
            content: "hi".into(),
            timestamp_ms: 0,
            attachments: vec![Attachment {
                kind: AttachmentKind::Map,
                title: "Float Locations".into(),
                description: "47 active floats".into(),
            }],
        };
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["role"], "system");
        assert_eq!(json["timestampMs"], 0);
        assert_eq!(json["attachments"][0]["kind"], "map");
        assert_eq!(m.timestamp_iso(), "1970-01-01T00:00:00Z");
    }
}
