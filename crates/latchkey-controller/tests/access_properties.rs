//! Property-based tests for the access decision laws.
//!
//! Each case builds a fresh initialized controller on a current-thread
//! runtime and feeds it a generated sequence of tag events.

mod common;

use common::{CREDENTIAL, Harness, harness_with_policy};
use latchkey_controller::{AccessDecision, RepeatPolicy};
use latchkey_core::{LockState, TagId};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Gained(String),
    Lost(String),
    Status,
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

/// The credential with whitespace around it.
fn padded_credential() -> impl Strategy<Value = String> {
    let padding = || prop::string::string_regex("[ \t\r\n]{0,2}").unwrap();
    (padding(), padding()).prop_map(|(head, tail)| format!("{head}{CREDENTIAL}{tail}"))
}

/// The credential with one character swapped out.
fn altered_credential() -> impl Strategy<Value = String> {
    (0..CREDENTIAL.len(), prop::char::range('0', 'z')).prop_map(|(at, c)| {
        let mut tag: Vec<char> = CREDENTIAL.chars().collect();
        tag[at] = c;
        tag.into_iter().collect()
    })
}

/// Tags that never match the credential, near misses included.
fn stranger_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[0-9A-Fa-f]{1,12}").unwrap(),
        "\\PC{1,12}",
        padded_credential(),
        altered_credential(),
    ]
    .prop_filter("must differ from the credential", |t| t != CREDENTIAL)
}

/// Either the credential or a stranger.
fn any_tag() -> impl Strategy<Value = String> {
    prop_oneof![Just(CREDENTIAL.to_string()), stranger_tag()]
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => any_tag().prop_map(Step::Gained),
        2 => any_tag().prop_map(Step::Lost),
        1 => Just(Step::Status),
    ]
}

fn policy() -> impl Strategy<Value = RepeatPolicy> {
    prop_oneof![Just(RepeatPolicy::Toggle), Just(RepeatPolicy::Ignore)]
}

async fn ready(policy: RepeatPolicy) -> Harness {
    let mut h = harness_with_policy(policy);
    h.coordinator.initialize().await.unwrap();
    h
}

async fn apply(h: &mut Harness, step: &Step) {
    let controller = h.coordinator.controller_mut();
    match step {
        Step::Gained(tag) => {
            controller.on_tag_gained(TagId::new(tag).unwrap()).await;
        }
        Step::Lost(tag) => controller.on_tag_lost(TagId::new(tag).unwrap()).await,
        Step::Status => controller.status_dump().await,
    }
}

proptest! {
    /// A tag other than the credential always leaves the door locked.
    #[test]
    fn prop_stranger_always_locks(
        history in prop::collection::vec(step(), 0..20),
        tag in stranger_tag(),
        policy in policy(),
    ) {
        runtime().block_on(async {
            let mut h = ready(policy).await;
            for step in &history {
                apply(&mut h, step).await;
            }

            let decision = h
                .coordinator
                .controller_mut()
                .on_tag_gained(TagId::new(&tag).unwrap())
                .await;

            prop_assert_eq!(decision, AccessDecision::Denied);
            prop_assert_eq!(h.coordinator.controller().lock_state(), LockState::Locked);
            Ok(())
        })?;
    }

    /// Under the toggle policy, n authorized presentations from locked leave
    /// the door unlocked exactly when n is odd.
    #[test]
    fn prop_authorized_toggles(presentations in 1usize..16) {
        runtime().block_on(async {
            let mut h = ready(RepeatPolicy::Toggle).await;
            for _ in 0..presentations {
                h.coordinator
                    .controller_mut()
                    .on_tag_gained(TagId::new(CREDENTIAL).unwrap())
                    .await;
            }

            let expected = if presentations % 2 == 1 {
                LockState::Unlocked
            } else {
                LockState::Locked
            };
            prop_assert_eq!(h.coordinator.controller().lock_state(), expected);
            prop_assert_eq!(h.trail.len(), presentations);
            Ok(())
        })?;
    }

    /// Under the ignore policy, repeated authorized presentations keep the
    /// door unlocked.
    #[test]
    fn prop_authorized_ignore_stays_unlocked(presentations in 1usize..16) {
        runtime().block_on(async {
            let mut h = ready(RepeatPolicy::Ignore).await;
            for _ in 0..presentations {
                h.coordinator
                    .controller_mut()
                    .on_tag_gained(TagId::new(CREDENTIAL).unwrap())
                    .await;
            }

            prop_assert_eq!(h.coordinator.controller().lock_state(), LockState::Unlocked);
            Ok(())
        })?;
    }

    /// Tag loss never changes the lock state or the last seen tag.
    #[test]
    fn prop_tag_lost_keeps_state(
        history in prop::collection::vec(step(), 0..20),
        lost in any_tag(),
        policy in policy(),
    ) {
        runtime().block_on(async {
            let mut h = ready(policy).await;
            for step in &history {
                apply(&mut h, step).await;
            }
            let before = h.coordinator.controller().snapshot();
            let records = h.trail.len();

            h.coordinator
                .controller_mut()
                .on_tag_lost(TagId::new(&lost).unwrap())
                .await;

            prop_assert_eq!(h.coordinator.controller().snapshot(), before);
            prop_assert_eq!(h.trail.len(), records);
            Ok(())
        })?;
    }

    /// Exactly one audit record per presentation and per status check, and
    /// status checks leave state alone.
    #[test]
    fn prop_one_record_per_check(
        history in prop::collection::vec(step(), 0..30),
        policy in policy(),
    ) {
        runtime().block_on(async {
            let mut h = ready(policy).await;
            let mut expected_records = 0;

            for step in &history {
                let before = h.coordinator.controller().snapshot();
                apply(&mut h, step).await;
                match step {
                    Step::Gained(_) => expected_records += 1,
                    Step::Status => {
                        expected_records += 1;
                        prop_assert_eq!(h.coordinator.controller().snapshot(), before);
                    }
                    Step::Lost(_) => {}
                }
            }

            prop_assert_eq!(h.trail.len(), expected_records);
            if let Some(last) = h.trail.last() {
                prop_assert_eq!(last.lock_state, h.coordinator.controller().lock_state());
            }
            Ok(())
        })?;
    }
}
