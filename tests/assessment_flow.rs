//! End-to-end runs of the adaptive loop against scripted models and the
//! in-memory store.

use std::sync::Arc;

use able_mind::actions::{ActionOutcome, Actions, BehavioralData, ReportRequest};
use able_mind::assessment::difficulty::{REASON_DECREASED, REASON_INCREASED};
use able_mind::assessment::generator::FALLBACK_CHALLENGE_TEXT;
use able_mind::assessment::{
    AssessmentRun, BalanceScore, BehavioralSample, Challenge, ChallengeSource, ChallengeType,
    RespondOutcome, RunSettings, RunState, estimate, fallback_report,
};
use able_mind::clients::GuardedModel;
use able_mind::history::load_progress;
use able_mind::store::{MemoryStore, NewUser, SessionStore};

mod common;
use common::ScriptedModel;

fn guarded(model: ScriptedModel) -> GuardedModel {
    GuardedModel::new(Arc::new(model), 5_000)
}

fn settings(total: usize) -> RunSettings {
    RunSettings {
        total_challenges: total,
        ..RunSettings::default()
    }
}

async fn store_with_user() -> (Arc<MemoryStore>, String) {
    let store = Arc::new(MemoryStore::new());
    let user = store
        .create_user(NewUser {
            email: "runner@example.com".into(),
            ..NewUser::default()
        })
        .await
        .expect("user created");
    (store, user.id)
}

#[tokio::test]
async fn full_run_persists_session_and_progress() {
    let (store, user_id) = store_with_user().await;
    let model = guarded(ScriptedModel::healthy());
    let mut run = AssessmentRun::new(&user_id, &model, store.clone(), &settings(3));

    let first = run.start("drafting emails with an assistant").await.unwrap();
    assert_eq!(first.challenge_type(), ChallengeType::MultipleChoice);
    assert_eq!(first.options().len(), 3);
    assert!(!first.is_fallback());

    for _ in 0..2 {
        match run.respond("Cost", 3_000, Some(800)).await.unwrap() {
            RespondOutcome::Next { adjustment, .. } => {
                assert_eq!(adjustment.new_difficulty.value(), 7);
            }
            RespondOutcome::Complete { .. } => panic!("completed early"),
        }
    }

    let outcome = match run.respond("Scope", 12_000, None).await.unwrap() {
        RespondOutcome::Complete { outcome } => outcome,
        RespondOutcome::Next { .. } => panic!("expected completion"),
    };
    assert_eq!(run.state(), RunState::Complete);
    assert_eq!(outcome.score.value(), 75);
    assert_eq!(outcome.report.weaknesses, vec!["Over-reliance on summaries"]);

    let sessions = store.list_sessions(&user_id).await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].usage_context, "drafting emails with an assistant");
    assert_eq!(sessions[0].human_ai_balance_score.value(), 75);

    let progress = load_progress(store.as_ref(), &user_id).await.unwrap();
    assert_eq!(progress.total_sessions, 1);
    assert_eq!(progress.latest_score, Some(75));
    assert_eq!(progress.points[0].session_id, outcome.session.id);
}

#[tokio::test]
async fn offline_model_still_completes_with_fallbacks() {
    let (store, user_id) = store_with_user().await;
    let model = guarded(ScriptedModel::offline());
    let mut run = AssessmentRun::new(&user_id, &model, store.clone(), &settings(2));

    let first = run.start("research summaries").await.unwrap();
    assert!(first.is_fallback());
    assert_eq!(first.text(), FALLBACK_CHALLENGE_TEXT);

    // Fast answer: performance 10, rules raise 5 -> 6
    match run.respond("A", 2_500, None).await.unwrap() {
        RespondOutcome::Next {
            adjustment,
            performance,
            challenge,
            ..
        } => {
            assert_eq!(performance.value(), 10);
            assert_eq!(adjustment.new_difficulty.value(), 6);
            assert_eq!(adjustment.reason, REASON_INCREASED);
            assert!(challenge.is_fallback());
        }
        RespondOutcome::Complete { .. } => panic!("completed early"),
    }

    let outcome = match run.respond("B", 40_000, None).await.unwrap() {
        RespondOutcome::Complete { outcome } => outcome,
        RespondOutcome::Next { .. } => panic!("expected completion"),
    };
    assert_eq!(outcome.report, fallback_report());
    assert_eq!(outcome.score, BalanceScore::from_report(&fallback_report()));
    assert_eq!(store.list_sessions(&user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn abandoned_run_writes_nothing() {
    let (store, user_id) = store_with_user().await;
    let model = guarded(ScriptedModel::healthy());
    let mut run = AssessmentRun::new(&user_id, &model, store.clone(), &settings(3));
    run.start("coding").await.unwrap();

    assert!(run.abandon());
    assert_eq!(run.state(), RunState::Abandoned);
    assert!(run.respond("late", 1_000, None).await.is_err());
    assert!(store.list_sessions(&user_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn stateless_actions_follow_difficulty_rules_when_offline() {
    let store = Arc::new(MemoryStore::new());
    let actions = Actions::new(
        Arc::new(ScriptedModel::offline()),
        store,
        &RunSettings::default(),
    );

    let up = actions
        .submit_and_get_next_challenge("planning", 5, 9, "reasoning")
        .await
        .into_result()
        .unwrap();
    assert_eq!(up.new_difficulty.value(), 6);
    assert_eq!(up.reason, REASON_INCREASED);
    assert!(up.new_challenge.is_fallback());

    let floor = actions
        .submit_and_get_next_challenge("planning", 1, 2, "reasoning")
        .await
        .into_result()
        .unwrap();
    assert_eq!(floor.new_difficulty.value(), 1);
    assert_eq!(floor.reason, REASON_DECREASED);

    let rejected = actions
        .submit_and_get_next_challenge("planning", 0, 5, "reasoning")
        .await;
    let body = serde_json::to_value(&rejected).unwrap();
    assert_eq!(body["success"], false);
    assert!(body["error"].as_str().unwrap().contains("currentDifficulty"));
}

#[tokio::test]
async fn report_action_persists_when_user_given() {
    let (store, user_id) = store_with_user().await;
    let actions = Actions::new(
        Arc::new(ScriptedModel::healthy()),
        store.clone(),
        &RunSettings::default(),
    );
    let sample = BehavioralSample::from_millis(estimate_ms(8), Some(1_000));

    let anonymous = actions
        .generate_report(ReportRequest {
            responses: vec!["Cost".into()],
            behavioral_data: BehavioralData::Averaged(sample),
            context: "spreadsheets".into(),
            user_id: None,
            start_time: None,
        })
        .await;
    let body = serde_json::to_value(&anonymous).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["humanAiBalanceScore"], 75);
    assert!(body.get("sessionId").is_none());

    let saved = actions
        .generate_report(ReportRequest {
            responses: vec!["Cost".into(), "Scope".into()],
            behavioral_data: BehavioralData::PerChallenge(vec![sample, sample]),
            context: "spreadsheets".into(),
            user_id: Some(user_id.clone()),
            start_time: None,
        })
        .await;
    let ActionOutcome::Success(payload) = saved else {
        panic!("report should succeed");
    };
    assert!(payload.session_id.is_some());
    assert_eq!(store.list_sessions(&user_id).await.unwrap().len(), 1);
}

/// Smallest response time that scores `score`
fn estimate_ms(score: u8) -> u64 {
    let ms = (10 - score as u64) * 5_000;
    assert_eq!(estimate(ms).value(), score);
    ms
}

#[test]
fn challenges_are_read_through_accessors() {
    let mc = Challenge::multiple_choice(
        " Which claim needs a citation? ",
        vec!["The date".into(), "The quote".into(), "The author".into()],
    )
    .unwrap()
    .with_source(ChallengeSource::Generated);
    assert_eq!(mc.text(), "Which claim needs a citation?");
    assert_eq!(mc.challenge_type(), ChallengeType::MultipleChoice);
    assert_eq!(mc.source(), Some(ChallengeSource::Generated));
    assert_eq!(mc.options().len(), 3);

    // Without options the only way in is an open challenge
    assert!(Challenge::multiple_choice("Pick one", Vec::new()).is_err());
    let open = Challenge::open("Explain your last edit.").unwrap();
    assert_eq!(open.challenge_type(), ChallengeType::Open);
    assert!(open.options().is_empty());
    assert_eq!(open.source(), None);
}
