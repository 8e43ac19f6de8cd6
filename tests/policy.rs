//! End-to-end decision-flow tests over an in-memory store

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use topic_warden::policy::{
    AdminRoster, MessageEvent, MessageLedger, OverlayRegistry, PolicyState, RateDecisionEngine,
    Sender, Verdict, WatchedTopic, sweeper,
};
use topic_warden::store::MemoryStore;
use topic_warden::telegram::types::ANONYMOUS_ADMIN_ID;

const CHAT: i64 = -1_001_234_567;
const TOPIC: i64 = 1362;
const DAY: u64 = 86_400;

/// Roster fake: a fixed admin set plus a switchable outage mode
struct MockRoster {
    admins: HashSet<i64>,
    outage: AtomicBool,
}

impl MockRoster {
    fn new(admins: &[i64]) -> Self {
        Self {
            admins: admins.iter().copied().collect(),
            outage: AtomicBool::new(false),
        }
    }

    fn set_outage(&self, outage: bool) {
        self.outage.store(outage, Ordering::SeqCst);
    }
}

#[async_trait]
impl AdminRoster for MockRoster {
    async fn is_platform_admin(&self, _chat: i64, user: i64) -> topic_warden::Result<bool> {
        if self.outage.load(Ordering::SeqCst) {
            return Err(topic_warden::Error::AdminLookup(
                "simulated outage".to_string(),
            ));
        }
        Ok(self.admins.contains(&user))
    }
}

struct Harness {
    engine: RateDecisionEngine,
    state: Arc<Mutex<PolicyState>>,
    store: Arc<MemoryStore>,
    roster: Arc<MockRoster>,
}

fn harness(admins: &[i64]) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let state = Arc::new(Mutex::new(PolicyState {
        ledger: MessageLedger::load(store.clone()),
        overlays: OverlayRegistry::load(store.clone()),
    }));
    let roster = Arc::new(MockRoster::new(admins));
    let engine = RateDecisionEngine::new(
        state.clone(),
        roster.clone(),
        vec![WatchedTopic {
            chat_id: CHAT,
            thread_id: TOPIC,
        }],
        DAY,
    );
    Harness {
        engine,
        state,
        store,
        roster,
    }
}

fn event(user: i64, ts: i64) -> MessageEvent {
    MessageEvent {
        chat_id: CHAT,
        thread_id: Some(TOPIC),
        message_id: ts,
        sender: Sender::User(user),
        timestamp: ts,
    }
}

#[tokio::test]
async fn first_message_allowed_second_rejected() {
    let h = harness(&[]);
    assert_eq!(h.engine.decide(&event(7, 0)).await, Verdict::Allowed);
    assert_eq!(
        h.engine.decide(&event(7, 3_600)).await,
        Verdict::Rejected {
            retry_after_secs: DAY - 3_600,
            cooldown_secs: DAY,
        }
    );
    // a full day later the window has elapsed
    assert_eq!(
        h.engine.decide(&event(7, 3_600 + i64::try_from(DAY).unwrap())).await,
        Verdict::Allowed
    );
}

#[tokio::test]
async fn messages_outside_watched_topic_are_ignored() {
    let h = harness(&[]);
    let mut wrong_topic = event(7, 0);
    wrong_topic.thread_id = Some(TOPIC + 1);
    assert_eq!(h.engine.decide(&wrong_topic).await, Verdict::Ignored);

    let mut wrong_chat = event(7, 0);
    wrong_chat.chat_id = CHAT + 1;
    assert_eq!(h.engine.decide(&wrong_chat).await, Verdict::Ignored);

    let mut no_topic = event(7, 0);
    no_topic.thread_id = None;
    assert_eq!(h.engine.decide(&no_topic).await, Verdict::Ignored);

    // ignored messages never create ledger entries
    let state = h.state.lock().await;
    assert!(state.ledger.snapshot(CHAT).is_empty());
    assert!(state.ledger.snapshot(CHAT + 1).is_empty());
}

#[tokio::test]
async fn rejection_never_advances_the_window() {
    let h = harness(&[]);
    assert_eq!(h.engine.decide(&event(7, 0)).await, Verdict::Allowed);

    let first = h.engine.decide(&event(7, 1_000)).await;
    assert_eq!(
        first,
        Verdict::Rejected {
            retry_after_secs: DAY - 1_000,
            cooldown_secs: DAY,
        }
    );
    // resend at the same elapsed offset: identical remaining wait,
    // proving the rejected message did not reset the window
    let again = h.engine.decide(&event(7, 1_000)).await;
    assert_eq!(first, again);

    let state = h.state.lock().await;
    assert_eq!(state.ledger.last_seen(CHAT, 7), Some(0));
}

#[tokio::test]
async fn cooldown_override_round_trip() {
    // the concrete scenario: default 86400s, override 60s, revert
    let h = harness(&[]);
    assert_eq!(h.engine.decide(&event(7, 0)).await, Verdict::Allowed);
    assert!(matches!(
        h.engine.decide(&event(7, 3_600)).await,
        Verdict::Rejected { .. }
    ));

    h.state
        .lock()
        .await
        .overlays
        .set_cooldown(CHAT, 7, 60)
        .unwrap();
    assert_eq!(h.engine.decide(&event(7, 3_661)).await, Verdict::Allowed);

    h.state
        .lock()
        .await
        .overlays
        .reset_cooldown(CHAT, 7)
        .unwrap();
    // only 59s since the allowed message at t=3661, default restored
    assert_eq!(
        h.engine.decide(&event(7, 3_720)).await,
        Verdict::Rejected {
            retry_after_secs: DAY - 59,
            cooldown_secs: DAY,
        }
    );
}

#[tokio::test]
async fn green_card_allows_everything_without_ledger_dependence() {
    let h = harness(&[]);
    h.state
        .lock()
        .await
        .overlays
        .set_cooldown(CHAT, 7, 0)
        .unwrap();

    for ts in [0, 1, 1, 2] {
        assert_eq!(
            h.engine.decide(&event(7, ts)).await,
            Verdict::ExemptUnlimited
        );
    }
    // absence of a ledger record must never cause a false reject
    let state = h.state.lock().await;
    assert_eq!(state.ledger.last_seen(CHAT, 7), None);
}

#[tokio::test]
async fn platform_admins_are_exempt() {
    let h = harness(&[42]);
    for ts in [0, 1, 2] {
        assert_eq!(h.engine.decide(&event(42, ts)).await, Verdict::ExemptAdmin);
    }
    let state = h.state.lock().await;
    assert_eq!(state.ledger.last_seen(CHAT, 42), None);
}

#[tokio::test]
async fn anonymous_senders_are_exempt_and_never_enter_the_ledger() {
    let h = harness(&[]);

    let mut as_chat = event(0, 0);
    as_chat.sender = Sender::Chat(CHAT);
    assert_eq!(h.engine.decide(&as_chat).await, Verdict::ExemptAdmin);

    let sentinel = event(ANONYMOUS_ADMIN_ID, 0);
    assert_eq!(h.engine.decide(&sentinel).await, Verdict::ExemptAdmin);

    let state = h.state.lock().await;
    assert!(state.ledger.snapshot(CHAT).is_empty());
}

#[tokio::test]
async fn custom_admin_burst_is_all_allowed() {
    let h = harness(&[]);
    h.state
        .lock()
        .await
        .overlays
        .add_custom_admin(CHAT, 9)
        .unwrap();

    // 5 messages in the same second
    for _ in 0..5 {
        assert_eq!(h.engine.decide(&event(9, 100)).await, Verdict::ExemptCustom);
    }
    let state = h.state.lock().await;
    assert_eq!(state.ledger.last_seen(CHAT, 9), None);
}

#[tokio::test]
async fn reset_user_allows_the_very_next_message() {
    let h = harness(&[]);
    assert_eq!(h.engine.decide(&event(7, 100)).await, Verdict::Allowed);
    h.state.lock().await.ledger.reset_user(CHAT, 7).unwrap();
    assert_eq!(h.engine.decide(&event(7, 101)).await, Verdict::Allowed);
}

#[tokio::test]
async fn roster_outage_fails_closed() {
    let h = harness(&[42]);
    h.roster.set_outage(true);

    // even a real admin is rate-limited during the outage
    assert_eq!(h.engine.decide(&event(42, 0)).await, Verdict::Allowed);
    assert!(matches!(
        h.engine.decide(&event(42, 1)).await,
        Verdict::Rejected { .. }
    ));

    h.roster.set_outage(false);
    assert_eq!(h.engine.decide(&event(42, 2)).await, Verdict::ExemptAdmin);
}

#[tokio::test]
async fn sweep_is_invisible_to_verdicts() {
    let h = harness(&[]);
    assert_eq!(h.engine.decide(&event(7, 0)).await, Verdict::Allowed);

    // past the horizon the entry is swept...
    let now = i64::try_from(DAY).unwrap() + 10;
    assert_eq!(sweeper::sweep_once(&h.state, DAY, now).await, 1);
    // ...and the verdict matches the un-swept "cooldown elapsed" case
    assert_eq!(h.engine.decide(&event(7, now)).await, Verdict::Allowed);
}

#[tokio::test]
async fn allowed_messages_survive_a_restart() {
    let h = harness(&[]);
    assert_eq!(h.engine.decide(&event(7, 1_000)).await, Verdict::Allowed);

    // rebuild state from the same store, as a restart would
    let state = Arc::new(Mutex::new(PolicyState {
        ledger: MessageLedger::load(h.store.clone()),
        overlays: OverlayRegistry::load(h.store.clone()),
    }));
    let engine = RateDecisionEngine::new(
        state,
        h.roster.clone(),
        vec![WatchedTopic {
            chat_id: CHAT,
            thread_id: TOPIC,
        }],
        DAY,
    );
    assert!(matches!(
        engine.decide(&event(7, 2_000)).await,
        Verdict::Rejected { .. }
    ));
}

#[tokio::test]
async fn ledger_write_failure_does_not_reverse_the_verdict() {
    let h = harness(&[]);
    h.store.fail_writes(true);
    // durability is lost, but the message was already let through
    assert_eq!(h.engine.decide(&event(7, 0)).await, Verdict::Allowed);
    // in-memory state still enforces the window
    assert!(matches!(
        h.engine.decide(&event(7, 1)).await,
        Verdict::Rejected { .. }
    ));
}
