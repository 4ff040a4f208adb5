//! End-to-end registry tests over mock providers
//!
//! These run the real dial→attach→turn pipeline under paused time: a
//! spawned "talker" task answers each listen with bursts of wire frames
//! separated by gaps longer than the silence threshold.

mod common;

use std::time::Duration;

use common::{attach_when_dialed, registry_with, spawn_talker, test_config, MockPhone, MockStt};
use switchboard_call_engine::EngineError;

const GREETING: &str = "Hi, this is a scheduling assistant calling about tomorrow.";

#[tokio::test(start_paused = true)]
async fn initiate_runs_greeting_turn_and_returns_reply() {
    let phone = MockPhone::new();
    let stt = MockStt::scripted(["sounds good, ten o'clock works well for me, see you then"]);
    let registry = registry_with(test_config(), phone.clone(), stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let bridge = attach_when_dialed(&registry, "carrier-1").await;
    spawn_talker(bridge);

    let call = initiated.await.unwrap().unwrap();
    assert!(!call.call_id.is_empty());
    assert_eq!(
        call.response,
        "sounds good, ten o'clock works well for me, see you then"
    );
    assert_eq!(registry.live_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn short_reply_triggers_one_elaboration_prompt() {
    let phone = MockPhone::new();
    let stt = MockStt::scripted([
        "yes",
        "that works for me, go ahead and schedule it for tomorrow morning",
    ]);
    let registry = registry_with(test_config(), phone, stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let bridge = attach_when_dialed(&registry, "carrier-1").await;
    spawn_talker(bridge);

    let call = initiated.await.unwrap().unwrap();
    assert_eq!(
        call.response,
        "yes\n\nthat works for me, go ahead and schedule it for tomorrow morning"
    );
}

#[tokio::test(start_paused = true)]
async fn adequate_reply_skips_elaboration() {
    let phone = MockPhone::new();
    let stt = MockStt::scripted([
        "I would actually prefer the afternoon if that is at all possible",
        "this transcript must never be consumed",
    ]);
    let registry = registry_with(test_config(), phone, stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let bridge = attach_when_dialed(&registry, "carrier-1").await;
    spawn_talker(bridge);

    let call = initiated.await.unwrap().unwrap();
    assert_eq!(
        call.response,
        "I would actually prefer the afternoon if that is at all possible"
    );
}

#[tokio::test(start_paused = true)]
async fn concurrent_turns_are_rejected_not_queued() {
    let phone = MockPhone::new();
    let stt = MockStt::scripted([
        "first reply with plenty of words to avoid the elaboration prompt",
        "second reply with plenty of words to avoid the elaboration prompt",
    ]);
    let registry = registry_with(test_config(), phone, stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let bridge = attach_when_dialed(&registry, "carrier-1").await;
    spawn_talker(bridge);
    let call = initiated.await.unwrap().unwrap();

    let racing = {
        let registry = registry.clone();
        let call_id = call.call_id.clone();
        tokio::spawn(async move { registry.continue_call(&call_id, "one more question").await })
    };
    // Let the racing turn claim the slot before contending.
    tokio::task::yield_now().await;

    let contended = registry.continue_call(&call.call_id, "me too").await;
    assert!(matches!(contended, Err(EngineError::TurnInProgress { .. })));

    // The first turn is unaffected by the rejected one.
    let reply = racing.await.unwrap().unwrap();
    assert_eq!(
        reply,
        "second reply with plenty of words to avoid the elaboration prompt"
    );
}

#[tokio::test(start_paused = true)]
async fn silent_callee_surfaces_turn_timeout_and_call_stays_live() {
    let phone = MockPhone::new();
    let stt = MockStt::scripted([]);
    let registry = registry_with(test_config(), phone, stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    // Media attaches but nobody ever speaks.
    let _bridge = attach_when_dialed(&registry, "carrier-1").await;

    let error = initiated.await.unwrap().unwrap_err();
    assert!(matches!(error, EngineError::TurnTimeout { seconds: 60 }));
    // A timed-out turn is not a dead call.
    assert_eq!(registry.live_calls(), 1);

    registry.shutdown().await;
    assert_eq!(registry.live_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn watchdog_force_ends_a_stuck_call() {
    let phone = MockPhone::new();
    let stt = MockStt::scripted([]);
    let mut config = test_config();
    config.call_watchdog = Duration::from_secs(5);
    let registry = registry_with(config, phone.clone(), stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let _bridge = attach_when_dialed(&registry, "carrier-1").await;

    // The listen blocks with no audio; the watchdog fires first and closes
    // the media bridge out from under it.
    let error = initiated.await.unwrap().unwrap_err();
    assert!(matches!(error, EngineError::MediaClosed));
    assert_eq!(registry.live_calls(), 0);
    assert_eq!(phone.hangups(), vec!["carrier-1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn end_call_speaks_farewell_hangs_up_and_reports_duration() {
    let phone = MockPhone::new();
    let stt = MockStt::scripted(["yes that all sounds completely fine to me thank you very much"]);
    let registry = registry_with(test_config(), phone.clone(), stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let bridge = attach_when_dialed(&registry, "carrier-1").await;
    spawn_talker(bridge);
    let call = initiated.await.unwrap().unwrap();

    let duration = registry
        .end_call(&call.call_id, "Thanks, goodbye!")
        .await
        .unwrap();
    // The greeting turn alone spans several simulated seconds.
    assert!(duration >= 1, "duration was {duration}");
    assert_eq!(phone.hangups(), vec!["carrier-1".to_string()]);
    assert_eq!(registry.live_calls(), 0);

    assert!(matches!(
        registry.continue_call(&call.call_id, "anyone there?").await,
        Err(EngineError::UnknownCall { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn carrier_completed_status_tears_the_call_down() {
    use switchboard_provider_core::{CarrierCallStatus, StatusUpdate};

    let phone = MockPhone::new();
    let stt = MockStt::scripted(["a perfectly ordinary reply with more than ten words in it total"]);
    let registry = registry_with(test_config(), phone, stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let bridge = attach_when_dialed(&registry, "carrier-1").await;
    spawn_talker(bridge.clone());
    let call = initiated.await.unwrap().unwrap();

    registry
        .handle_status(vec![StatusUpdate {
            carrier_call_id: "carrier-1".to_string(),
            status: CarrierCallStatus::Completed,
        }])
        .await;

    assert_eq!(registry.live_calls(), 0);
    assert!(!bridge.is_open());
    assert!(matches!(
        registry.continue_call(&call.call_id, "hello?").await,
        Err(EngineError::UnknownCall { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn machine_detection_hangs_up_the_carrier_call() {
    use switchboard_provider_core::{CarrierCallStatus, StatusUpdate};

    let phone = MockPhone::new();
    let stt = MockStt::scripted(["a perfectly ordinary reply with more than ten words in it total"]);
    let registry = registry_with(test_config(), phone.clone(), stt);

    let initiated = {
        let registry = registry.clone();
        tokio::spawn(async move { registry.initiate_call(GREETING).await })
    };
    let bridge = attach_when_dialed(&registry, "carrier-1").await;
    spawn_talker(bridge.clone());
    let call = initiated.await.unwrap().unwrap();

    // Detection fires mid-call: the carrier call is still up, so the
    // teardown must hang it up rather than just dropping the session.
    registry
        .handle_status(vec![StatusUpdate {
            carrier_call_id: "carrier-1".to_string(),
            status: CarrierCallStatus::MachineDetected,
        }])
        .await;

    assert_eq!(phone.hangups(), vec!["carrier-1".to_string()]);
    assert_eq!(registry.live_calls(), 0);
    assert!(!bridge.is_open());
    assert!(matches!(
        registry.continue_call(&call.call_id, "hello?").await,
        Err(EngineError::UnknownCall { .. })
    ));
}

#[tokio::test]
async fn unknown_call_id_is_rejected() {
    let registry = registry_with(test_config(), MockPhone::new(), MockStt::scripted([]));
    assert!(matches!(
        registry.continue_call("no-such-call", "hello").await,
        Err(EngineError::UnknownCall { .. })
    ));
    assert!(matches!(
        registry.speak_only("no-such-call", "hello").await,
        Err(EngineError::UnknownCall { .. })
    ));
    assert!(matches!(
        registry.end_call("no-such-call", "bye").await,
        Err(EngineError::UnknownCall { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn failed_dial_removes_the_session() {
    let registry = registry_with(test_config(), MockPhone::failing_dial(), MockStt::scripted([]));
    let error = registry.initiate_call(GREETING).await.unwrap_err();
    assert!(matches!(error, EngineError::Provider(_)));
    assert_eq!(registry.live_calls(), 0);
}
