// SPDX-FileCopyrightText: 2026 Matbuddy Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Full turns through the orchestrator with a scripted provider.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio_util::sync::CancellationToken;

use matbuddy_agent::turn::{
    daily_quota_reply, EMPTY_MODEL_REPLY, FAILURE_REPLY, GLOBAL_BUDGET_REPLY, OFF_TOPIC_REPLY,
    RATE_LIMITED_REPLY,
};
use matbuddy_agent::{AgentLoop, TurnState};
use matbuddy_core::record::AiUsage;
use matbuddy_core::types::{HistoryEntry, InboundMessage, MessageContent, Part, Role};
use matbuddy_core::{GlobalUsage, StorageAdapter, UserRecord};
use matbuddy_test_utils::{MockChannel, MockProvider, MockStorage, Step, TestHarness};

const CHAT: i64 = 4242;
const NOT_FOUND: &str = "Gemini API error 404 (NOT_FOUND): models/x is not found";
const RATE_LIMITED: &str = "Gemini API error 429 (RESOURCE_EXHAUSTED): Resource has been exhausted";

async fn harness_with(provider: &MockProvider) -> TestHarness {
    TestHarness::builder()
        .with_provider(provider.clone())
        .build()
        .await
        .unwrap()
}

fn record_with_offer() -> UserRecord {
    UserRecord {
        ai_history: vec![
            HistoryEntry::user("drilled kimura from side control today"),
            HistoryEntry::model("nice work! want me to save it as a note?"),
        ],
        ..UserRecord::default()
    }
}

#[tokio::test]
async fn off_topic_message_never_reaches_the_model() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;

    let outcome = h.send_text(CHAT, "should I buy bitcoin?").await;

    assert_eq!(outcome.state, TurnState::RejectedOffTopic);
    assert_eq!(outcome.reply, OFF_TOPIC_REPLY);
    assert!(provider.requests().is_empty());
    assert_eq!(h.record(CHAT).await.unwrap().ai_usage.count, 0);
}

#[tokio::test]
async fn plain_reply_counts_usage_and_appends_history() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Text("a kimura is a shoulder lock".into())]);

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::Replied);
    assert_eq!(outcome.reply, "a kimura is a shoulder lock");
    let record = h.record(CHAT).await.unwrap();
    assert_eq!(record.ai_usage, AiUsage { date: "2026-10-18".into(), count: 1 });
    assert_eq!(
        record.ai_history,
        [
            HistoryEntry::user("what's a kimura?"),
            HistoryEntry::model("a kimura is a shoulder lock"),
        ]
    );
    let global = h.storage.load_global_usage().await.unwrap().unwrap();
    assert_eq!(global, GlobalUsage { month: "2026-10".into(), count: 1 });
    assert_eq!(h.orchestrator.sessions().len(), 1);
}

#[tokio::test]
async fn request_carries_prefetched_user_data_and_tools() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Text("oss".into())]);

    h.send_text(CHAT, "how am I doing?").await;

    let request = &provider.requests()[0];
    assert!(request.system_instruction.starts_with("You are a test training assistant."));
    assert!(request.system_instruction.contains("CURRENT USER DATA"));
    assert!(request.tools.iter().any(|t| t.name == "save_training_note"));
    assert!(request.tools.iter().any(|t| t.name == "search_technique"));
}

#[tokio::test]
async fn footer_appears_near_the_daily_limit() {
    let provider = MockProvider::new();
    let h = TestHarness::builder()
        .with_provider(provider.clone())
        .configure(|c| c.quota.daily_limit = 3)
        .build()
        .await
        .unwrap();
    provider.script(&h.models()[0], vec![Step::Text("oss".into())]);

    let outcome = h.send_text(CHAT, "hi coach").await;

    assert_eq!(outcome.reply, "oss\n\n(2 ai messages left today)");
}

#[tokio::test]
async fn daily_limit_rejects_before_the_model() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    let record = UserRecord {
        ai_usage: AiUsage { date: "2026-10-18".into(), count: 100 },
        ..UserRecord::default()
    };
    h.seed(CHAT, &record).await.unwrap();

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::RejectedBudget);
    assert_eq!(outcome.reply, daily_quota_reply(100));
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn yesterdays_usage_does_not_count_today() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Text("oss".into())]);
    let record = UserRecord {
        ai_usage: AiUsage { date: "2026-10-17".into(), count: 100 },
        ..UserRecord::default()
    };
    h.seed(CHAT, &record).await.unwrap();

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::Replied);
    assert_eq!(h.record(CHAT).await.unwrap().ai_usage.count, 1);
}

#[tokio::test]
async fn monthly_budget_rejects_every_user() {
    let provider = MockProvider::new();
    let h = TestHarness::builder()
        .with_provider(provider.clone())
        .configure(|c| c.quota.monthly_global_limit = 5)
        .build()
        .await
        .unwrap();
    h.storage
        .save_global_usage(&GlobalUsage { month: "2026-10".into(), count: 5 })
        .await
        .unwrap();

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::RejectedBudget);
    assert_eq!(outcome.reply, GLOBAL_BUDGET_REPLY);
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn missing_model_is_skipped_without_delay() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    let models = h.models().to_vec();
    provider.script(&models[0], vec![Step::Fail(NOT_FOUND.into())]);
    provider.script(&models[1], vec![Step::Text("from the second model".into())]);

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::Replied);
    assert_eq!(outcome.reply, "from the second model");
    assert_eq!(provider.started_models(), [models[0].clone(), models[1].clone()]);
}

#[tokio::test(start_paused = true)]
async fn rate_limit_waits_then_retries_same_model() {
    let provider = MockProvider::new();
    let storage = MockStorage::new();
    let h = TestHarness::builder()
        .with_provider(provider.clone())
        .with_storage(Arc::new(storage))
        .build()
        .await
        .unwrap();
    let models = h.models().to_vec();
    provider.script(
        &models[0],
        vec![Step::Fail(RATE_LIMITED.into()), Step::Text("second try".into())],
    );

    let started = tokio::time::Instant::now();
    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.reply, "second try");
    assert!(started.elapsed() >= Duration::from_secs(1));
    assert_eq!(provider.started_models(), [models[0].clone(), models[0].clone()]);
}

#[tokio::test(start_paused = true)]
async fn rate_limits_on_every_model_give_the_busy_reply() {
    let provider = MockProvider::new();
    let storage = MockStorage::new();
    let h = TestHarness::builder()
        .with_provider(provider.clone())
        .with_storage(Arc::new(storage.clone()))
        .configure(|c| c.retry.max_attempts = 1)
        .build()
        .await
        .unwrap();
    for model in h.models() {
        provider.script(model, vec![Step::Fail(RATE_LIMITED.into())]);
    }

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.reply, RATE_LIMITED_REPLY);
    assert_eq!(provider.started_models().len(), 3);
    let record = storage.record(CHAT);
    assert_eq!(record.ai_usage.count, 0);
    assert!(record.ai_history.is_empty());
    assert!(storage.global().is_none());
}

#[tokio::test]
async fn unknown_error_aborts_the_turn() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Fail("connection reset by peer".into())]);

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.reply, FAILURE_REPLY);
    assert_eq!(provider.started_models().len(), 1);
}

#[tokio::test]
async fn empty_model_text_gets_the_default_reply() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Text("   ".into())]);

    let outcome = h.send_text(CHAT, "hmm").await;

    assert_eq!(outcome.state, TurnState::Replied);
    assert_eq!(outcome.reply, EMPTY_MODEL_REPLY);
}

#[tokio::test]
async fn cached_conversation_failure_retries_fresh() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    let model = h.models()[0].clone();
    provider.script(
        &model,
        vec![
            Step::Text("first answer".into()),
            Step::Fail("connection reset by peer".into()),
            Step::Text("fresh answer".into()),
        ],
    );

    h.send_text(CHAT, "first question").await;
    let outcome = h.send_text(CHAT, "second question").await;

    assert_eq!(outcome.state, TurnState::Replied);
    assert_eq!(outcome.reply, "fresh answer");
    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        requests[1].history,
        [
            HistoryEntry::user("first question"),
            HistoryEntry::model("first answer"),
        ]
    );
}

#[tokio::test]
async fn second_turn_reuses_the_cached_conversation() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    let model = h.models()[0].clone();
    provider.script(&model, vec![Step::Text("one".into()), Step::Text("two".into())]);

    h.send_text(CHAT, "first").await;
    let outcome = h.send_text(CHAT, "second").await;

    assert_eq!(outcome.reply, "two");
    assert_eq!(provider.requests().len(), 1);
    assert_eq!(provider.sends().len(), 2);
}

#[tokio::test]
async fn expired_session_starts_a_new_conversation() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    let model = h.models()[0].clone();
    provider.script(&model, vec![Step::Text("one".into()), Step::Text("two".into())]);

    h.send_text(CHAT, "first").await;
    h.clock.advance(chrono::Duration::minutes(31));
    h.send_text(CHAT, "second").await;

    assert_eq!(provider.requests().len(), 2);
}

#[tokio::test]
async fn tool_links_replace_links_the_model_wrote() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(
        &h.models()[0],
        vec![
            Step::Call("search_technique".into(), json!({"query": "kimura"})),
            Step::Text("here's a kimura video: https://youtube.com/watch?v=made_up".into()),
        ],
    );

    let outcome = h.send_text(CHAT, "show me a kimura").await;

    assert_eq!(outcome.state, TurnState::Replied);
    assert_eq!(
        outcome.reply,
        "here's a kimura video\nhttps://youtu.be/tVJpb6zRXxo"
    );
    let results = provider.function_results_sent();
    assert_eq!(results.len(), 1);
    assert!(results[0][0].result.contains("EXACT_VIDEO_URL: https://youtu.be/tVJpb6zRXxo"));
}

#[tokio::test]
async fn affirmative_after_offer_saves_without_the_model() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    h.seed(CHAT, &record_with_offer()).await.unwrap();

    let outcome = h.send_text(CHAT, "yes").await;

    assert_eq!(outcome.state, TurnState::Replied);
    assert_eq!(
        outcome.reply,
        "saved to your notes: \"drilled kimura from side control today\"\ncheck them anytime with /notes"
    );
    assert!(provider.requests().is_empty());
    let record = h.record(CHAT).await.unwrap();
    assert_eq!(record.notes.len(), 1);
    assert_eq!(record.notes[0].text, "drilled kimura from side control today");
    assert_eq!(record.ai_usage.count, 0);
    assert_eq!(record.ai_history.len(), 4);
    assert_eq!(record.ai_history[2], HistoryEntry::user("yes"));
}

#[tokio::test]
async fn refusal_after_offer_goes_to_the_model_and_saves_nothing() {
    for refusal in ["don't save it", "no please", "not right", "please don't"] {
        let provider = MockProvider::new();
        let h = harness_with(&provider).await;
        h.seed(CHAT, &record_with_offer()).await.unwrap();
        provider.script(&h.models()[0], vec![Step::Text("no problem, /notes anytime".into())]);

        let outcome = h.send_text(CHAT, refusal).await;

        assert_eq!(outcome.reply, "no problem, /notes anytime", "{refusal:?}");
        assert_eq!(provider.requests().len(), 1, "{refusal:?}");
        let record = h.record(CHAT).await.unwrap();
        assert!(record.notes.is_empty(), "{refusal:?} saved a note");
        assert_eq!(record.ai_usage.count, 1);
    }
}

#[tokio::test]
async fn affirmative_without_offer_goes_to_the_model() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Text("cool".into())]);

    let outcome = h.send_text(CHAT, "yes").await;

    assert_eq!(outcome.reply, "cool");
    assert!(h.record(CHAT).await.unwrap().notes.is_empty());
}

#[tokio::test]
async fn voice_reply_claiming_a_save_saves_the_offered_note() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    h.seed(CHAT, &record_with_offer()).await.unwrap();
    provider.script(&h.models()[0], vec![Step::Text("got it, saved that for you!".into())]);

    let outcome = h.send_voice(CHAT, vec![0x4f, 0x67, 0x67]).await;

    assert_eq!(outcome.state, TurnState::Replied);
    let record = h.record(CHAT).await.unwrap();
    assert_eq!(record.notes.len(), 1);
    assert_eq!(record.notes[0].text, "drilled kimura from side control today");
    let user_turn = record.ai_history.iter().rev().find(|e| e.role == Role::User).unwrap();
    assert_eq!(user_turn.text, "(voice message)");

    let (_, parts) = &provider.sends()[0];
    assert_eq!(parts.len(), 3);
    assert!(matches!(&parts[0], Part::InlineData { data, .. } if data == &[0x4f, 0x67, 0x67]));
}

#[tokio::test]
async fn voice_turn_that_repeats_the_offer_saves_nothing() {
    for reply in ["Noted! want me to save that as a note?", "i haven't saved it yet"] {
        let provider = MockProvider::new();
        let h = harness_with(&provider).await;
        h.seed(CHAT, &record_with_offer()).await.unwrap();
        provider.script(&h.models()[0], vec![Step::Text(reply.into())]);

        let outcome = h.send_voice(CHAT, vec![0x4f, 0x67, 0x67]).await;

        assert_eq!(outcome.state, TurnState::Replied);
        assert!(h.record(CHAT).await.unwrap().notes.is_empty(), "{reply:?} saved a note");
    }
}

#[tokio::test]
async fn voice_turn_that_saved_itself_is_not_saved_twice() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    h.seed(CHAT, &record_with_offer()).await.unwrap();
    provider.script(
        &h.models()[0],
        vec![
            Step::Call("save_training_note".into(), json!({"note_text": "kimura from side control"})),
            Step::Text("saved!".into()),
        ],
    );

    h.send_voice(CHAT, vec![1, 2, 3]).await;

    let record = h.record(CHAT).await.unwrap();
    assert_eq!(record.notes.len(), 1);
    assert_eq!(record.notes[0].text, "kimura from side control");
}

#[tokio::test]
async fn storage_outage_fails_the_turn() {
    let provider = MockProvider::new();
    let storage = MockStorage::new();
    let h = TestHarness::builder()
        .with_provider(provider.clone())
        .with_storage(Arc::new(storage.clone()))
        .build()
        .await
        .unwrap();
    storage.set_failing(true);

    let outcome = h.send_text(CHAT, "what's a kimura?").await;

    assert_eq!(outcome.state, TurnState::Failed);
    assert_eq!(outcome.reply, FAILURE_REPLY);
    assert!(provider.requests().is_empty());
}

#[tokio::test]
async fn agent_loop_answers_every_message_then_stops() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Text("a".into()), Step::Text("b".into())]);

    let channel = Arc::new(MockChannel::new());
    channel.inject_text(1, "first").await;
    channel.inject_text(2, "what about bitcoin").await;
    channel.inject_text(3, "second").await;
    channel.close();

    let agent = AgentLoop::new(channel.clone(), h.orchestrator.clone())
        .with_drain_timeout(Duration::from_secs(5));
    agent.run(CancellationToken::new()).await.unwrap();

    let sent = channel.sent_messages().await;
    assert_eq!(sent.len(), 3);
    let off_topic = sent.iter().find(|m| m.chat_id == 2).unwrap();
    assert_eq!(off_topic.content, OFF_TOPIC_REPLY);
    let mut typing = channel.typing_chats().await;
    typing.sort();
    assert_eq!(typing, [1, 3]);
}

#[tokio::test]
async fn rejected_turns_show_no_typing_indicator() {
    let provider = MockProvider::new();
    let h = harness_with(&provider).await;
    provider.script(&h.models()[0], vec![Step::Text("oss".into())]);
    let spent = UserRecord {
        ai_usage: AiUsage { date: "2026-10-18".into(), count: 100 },
        ..UserRecord::default()
    };
    h.seed(5, &spent).await.unwrap();

    let channel = Arc::new(MockChannel::new());
    let agent = AgentLoop::new(channel.clone(), h.orchestrator.clone());
    for (chat_id, text) in [(5, "what's a kimura?"), (6, "is bitcoin a good buy"), (7, "hi coach")] {
        agent
            .handle_one(InboundMessage {
                id: format!("m{chat_id}"),
                chat_id,
                content: MessageContent::Text(text.into()),
                timestamp: String::new(),
            })
            .await;
    }

    assert_eq!(channel.typing_chats().await, [7]);
    let sent = channel.sent_messages().await;
    assert_eq!(sent.len(), 3);
    assert_eq!(sent[0].content, daily_quota_reply(100));
    assert_eq!(sent[1].content, OFF_TOPIC_REPLY);
    assert_eq!(sent[2].content, "oss");
}
