use deepsearch_config::DeepSearchConfig;
use deepsearch_core::{
    DeepSearch, DeepSearchError, GENERIC_TURN_ERROR, SqliteStateStore, StateStore,
};
use deepsearch_protocol::{
    ChatMessage, ChatRequest, MessagePart, Role, StreamEvent, ToolInvocationState,
};
use deepsearch_test_utils::{
    CountingScraper, FailingLLM, FixedChatResponse, GatedLLM, ScriptedLLM, StreamingLLM,
    StubSearchProvider, tool_call,
};
use deepsearch_tools::MemoryCacheStore;
use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

struct Harness {
    service: DeepSearch,
    store: Arc<SqliteStateStore>,
    scraper: Arc<CountingScraper>,
}

fn harness(config: DeepSearchConfig, llm: Arc<dyn autoagents_llm::LLMProvider>) -> Harness {
    let store = Arc::new(SqliteStateStore::open_in_memory().expect("store"));
    let scraper = Arc::new(CountingScraper::new());
    let service = DeepSearch::builder(config)
        .llm(llm)
        .search(Arc::new(StubSearchProvider::with_links(&[
            "https://a.test/1",
            "https://b.test/2",
        ])))
        .scraper(scraper.clone())
        .cache(Arc::new(MemoryCacheStore::new()))
        .state_store(store.clone())
        .build()
        .expect("service");
    Harness {
        service,
        store,
        scraper,
    }
}

fn request(chat_id: Option<&str>, messages: Vec<ChatMessage>) -> ChatRequest {
    ChatRequest {
        messages,
        chat_id: chat_id.map(str::to_string),
    }
}

fn research_script() -> Vec<FixedChatResponse> {
    vec![
        FixedChatResponse::with_tool_calls(
            "",
            vec![tool_call(
                "call_search",
                "searchWeb",
                json!({ "query": "rust async runtime" }),
            )],
        ),
        FixedChatResponse::with_tool_calls(
            "Reading the top results.",
            vec![tool_call(
                "call_scrape",
                "scrapePages",
                json!({ "urls": ["https://a.test/1", "https://b.test/2"] }),
            )],
        ),
        FixedChatResponse::new("Rust futures are polled by an executor [A](https://a.test/1)."),
    ]
}

#[tokio::test]
async fn new_chat_turn_searches_scrapes_and_saves() {
    let llm = ScriptedLLM::new(research_script());
    let h = harness(DeepSearchConfig::default(), Arc::new(llm.clone()));

    let stream = h
        .service
        .run_stream(
            "alice",
            request(
                None,
                vec![ChatMessage::text(Role::User, "How do Rust async runtimes work?")],
            ),
        )
        .expect("stream");
    assert!(stream.created);
    let chat_id = stream.chat_id.clone();
    let events = stream.events.collect::<Vec<_>>().await;

    assert_eq!(
        events[0],
        StreamEvent::NewChatCreated {
            chat_id: chat_id.clone()
        }
    );
    let kinds = events.iter().map(StreamEvent::kind).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            "NEW_CHAT_CREATED",
            "tool-call",
            "tool-result",
            "step-finish",
            "text-delta",
            "tool-call",
            "tool-result",
            "step-finish",
            "text-delta",
            "step-finish",
            "finish",
        ]
    );
    assert_eq!(
        events.last(),
        Some(&StreamEvent::Finish {
            chat_id: chat_id.clone(),
            message_count: 4
        })
    );

    let stored = h.store.load_messages(&chat_id).expect("messages");
    let roles = stored.iter().map(|message| message.role).collect::<Vec<_>>();
    assert_eq!(
        roles,
        vec![Role::User, Role::Assistant, Role::Assistant, Role::Assistant]
    );
    let search = stored[1].tool_invocations().next().expect("search invocation");
    assert_eq!(search.tool_name, "searchWeb");
    assert_eq!(search.state, ToolInvocationState::Result);
    assert_eq!(
        search.result.as_ref().expect("result")[0]["link"],
        json!("https://a.test/1")
    );
    assert_eq!(stored[2].text_content(), "Reading the top results.");
    let scrape = stored[2].tool_invocations().next().expect("scrape invocation");
    assert_eq!(scrape.result.as_ref().expect("result")["success"], json!(true));
    assert!(stored[3].text_content().contains("[A](https://a.test/1)"));

    let chat = h.store.load_chat(&chat_id).expect("load").expect("chat");
    assert_eq!(chat.title, "How do Rust async runtimes work?");
    assert_eq!(chat.user_id, "alice");
    assert_eq!(chat.version, 1);
    assert_eq!(h.scraper.calls(), 1);
    assert_eq!(llm.call_count(), 3);
    assert_eq!(
        llm.seen_tools.lock().clone(),
        vec!["scrapePages".to_string(), "searchWeb".to_string()]
    );
}

#[tokio::test]
async fn follow_up_turn_reuses_cached_scrape_and_keeps_order() {
    let scrape = |id: &str, urls: serde_json::Value| {
        FixedChatResponse::with_tool_calls("", vec![tool_call(id, "scrapePages", json!({ "urls": urls }))])
    };
    let llm = ScriptedLLM::new(vec![
        scrape("call_1", json!(["https://a.test/1", "https://b.test/2"])),
        FixedChatResponse::new("first answer"),
        scrape("call_2", json!(["https://b.test/2", "https://a.test/1"])),
        FixedChatResponse::new("second answer"),
    ]);
    let h = harness(DeepSearchConfig::default(), Arc::new(llm));

    let first = h
        .service
        .run(
            "alice",
            request(None, vec![ChatMessage::text(Role::User, "first question")]),
        )
        .await
        .expect("first turn");

    let mut history = first.messages.clone();
    history.push(ChatMessage::text(Role::User, "second question"));
    let second = h
        .service
        .run("alice", request(Some(&first.chat_id), history.clone()))
        .await
        .expect("second turn");

    assert_eq!(h.scraper.calls(), 1);
    assert_eq!(second.chat_id, first.chat_id);
    assert_eq!(second.response, "second answer");
    let stored = h.store.load_messages(&first.chat_id).expect("messages");
    assert_eq!(stored.len(), history.len() + 2);
    assert_eq!(&stored[..history.len()], &history[..]);
    let cached = stored[history.len()]
        .tool_invocations()
        .next()
        .expect("scrape")
        .result
        .clone()
        .expect("result");
    assert_eq!(cached["results"][0]["url"], json!("https://b.test/2"));
    assert_eq!(h.store.load_chat(&first.chat_id).expect("load").expect("chat").version, 2);
}

#[tokio::test]
async fn foreign_chat_is_rejected_before_any_model_call() {
    let llm = ScriptedLLM::new(vec![FixedChatResponse::new("hello")]);
    let h = harness(DeepSearchConfig::default(), Arc::new(llm.clone()));
    let owned = h
        .service
        .run("alice", request(None, vec![ChatMessage::text(Role::User, "mine")]))
        .await
        .expect("turn");

    let err = h
        .service
        .run_stream(
            "mallory",
            request(
                Some(&owned.chat_id),
                vec![ChatMessage::text(Role::User, "let me in")],
            ),
        )
        .err()
        .expect("foreign chat");
    assert!(matches!(err, DeepSearchError::ChatNotFound(_)));
    assert_eq!(llm.call_count(), 1);
    assert_eq!(h.store.load_messages(&owned.chat_id).expect("messages").len(), 2);
    assert!(h.store.list_chats("mallory").expect("list").is_empty());
}

#[tokio::test]
async fn empty_message_list_is_rejected_without_writes() {
    let llm = ScriptedLLM::new(Vec::new());
    let h = harness(DeepSearchConfig::default(), Arc::new(llm.clone()));
    let err = h
        .service
        .run_stream("alice", request(None, Vec::new()))
        .err()
        .expect("empty request");
    assert!(matches!(err, DeepSearchError::InvalidRequest(_)));
    assert!(h.store.list_chats("alice").expect("list").is_empty());
    assert_eq!(llm.call_count(), 0);
}

#[tokio::test]
async fn model_failure_emits_generic_error_and_keeps_incoming_messages() {
    let h = harness(
        DeepSearchConfig::default(),
        Arc::new(FailingLLM::new("provider exploded")),
    );
    let mut stream = h
        .service
        .run_stream(
            "alice",
            request(None, vec![ChatMessage::text(Role::User, "hello")]),
        )
        .expect("stream");
    let chat_id = stream.chat_id.clone();
    let events = (&mut stream.events).collect::<Vec<_>>().await;

    assert_eq!(
        events,
        vec![
            StreamEvent::NewChatCreated {
                chat_id: chat_id.clone()
            },
            StreamEvent::Error {
                message: GENERIC_TURN_ERROR.to_string()
            },
        ]
    );
    let err = stream.finish().await.expect_err("model error");
    let DeepSearchError::Model(message) = err else {
        panic!("expected model error");
    };
    assert!(message.contains("provider exploded"));
    let stored = h.store.load_messages(&chat_id).expect("messages");
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].text_content(), "hello");
}

#[tokio::test]
async fn tool_failures_are_returned_to_the_model() {
    let llm = ScriptedLLM::new(vec![
        FixedChatResponse::with_tool_calls(
            "",
            vec![
                tool_call("call_1", "scrapePages", json!({ "urls": [] })),
                tool_call("call_2", "fetchEverything", json!({})),
            ],
        ),
        FixedChatResponse::new("I could not read anything."),
    ]);
    let h = harness(DeepSearchConfig::default(), Arc::new(llm.clone()));
    let result = h
        .service
        .run(
            "alice",
            request(None, vec![ChatMessage::text(Role::User, "read nothing")]),
        )
        .await
        .expect("turn");

    let results = result.messages[1]
        .tool_invocations()
        .map(|invocation| invocation.result.clone().expect("result"))
        .collect::<Vec<_>>();
    assert_eq!(
        results,
        vec![
            json!({ "error": "invalid arguments: urls cannot be empty" }),
            json!({ "error": "tool not found: fetchEverything" }),
        ]
    );
    let second_request = llm.requests.lock()[1].clone();
    assert!(
        second_request
            .iter()
            .any(|message| message.role == autoagents_llm::chat::ChatRole::Tool)
    );
}

#[tokio::test]
async fn step_budget_bounds_the_turn() {
    let looping = (0..5)
        .map(|index| {
            FixedChatResponse::with_tool_calls(
                "",
                vec![tool_call(
                    &format!("call_{index}"),
                    "searchWeb",
                    json!({ "query": format!("attempt {index}") }),
                )],
            )
        })
        .collect();
    let llm = ScriptedLLM::new(looping);
    let mut config = DeepSearchConfig::default();
    config.agent.max_steps = 2;
    let h = harness(config, Arc::new(llm.clone()));

    let result = h
        .service
        .run(
            "alice",
            request(None, vec![ChatMessage::text(Role::User, "keep searching")]),
        )
        .await
        .expect("turn");
    assert_eq!(llm.call_count(), 2);
    assert_eq!(result.messages.len(), 3);
}

#[tokio::test]
async fn concurrent_turn_that_saves_last_gets_version_conflict() {
    let (llm, release) = GatedLLM::new("slow", "answer");
    let h = harness(DeepSearchConfig::default(), Arc::new(llm));
    let seed = h
        .service
        .run("alice", request(None, vec![ChatMessage::text(Role::User, "seed")]))
        .await
        .expect("seed turn");

    let mut slow_history = seed.messages.clone();
    slow_history.push(ChatMessage::text(Role::User, "slow"));
    let slow = h
        .service
        .run_stream("alice", request(Some(&seed.chat_id), slow_history))
        .expect("slow turn");

    let mut fast_history = seed.messages.clone();
    fast_history.push(ChatMessage::text(Role::User, "fast"));
    let fast = h
        .service
        .run("alice", request(Some(&seed.chat_id), fast_history.clone()))
        .await
        .expect("fast turn");

    release.send(()).expect("release slow turn");
    let err = slow.finish().await.expect_err("stale write");
    assert!(matches!(err, DeepSearchError::VersionConflict { expected: 1, .. }));

    let stored = h.store.load_messages(&seed.chat_id).expect("messages");
    assert_eq!(stored, fast.messages);
    assert_eq!(stored[fast_history.len() - 1].text_content(), "fast");
}

#[tokio::test]
async fn turn_exceeding_duration_times_out() {
    let (llm, _release) = GatedLLM::new("stall", "never");
    let mut config = DeepSearchConfig::default();
    config.server.max_duration_secs = 1;
    let h = harness(config, Arc::new(llm));

    let err = h
        .service
        .run("alice", request(None, vec![ChatMessage::text(Role::User, "stall")]))
        .await
        .expect_err("timeout");
    assert!(matches!(err, DeepSearchError::Timeout(1)));
}

#[tokio::test]
async fn chats_can_be_listed_read_and_deleted_by_owner() {
    let llm = ScriptedLLM::new(Vec::new());
    let h = harness(DeepSearchConfig::default(), Arc::new(llm));
    let first = h
        .service
        .run("alice", request(None, vec![ChatMessage::text(Role::User, "older")]))
        .await
        .expect("first");
    let second = h
        .service
        .run("alice", request(None, vec![ChatMessage::text(Role::User, "newer")]))
        .await
        .expect("second");

    let titles = h
        .service
        .list_chats("alice")
        .expect("list")
        .into_iter()
        .map(|chat| chat.title)
        .collect::<Vec<_>>();
    assert_eq!(titles, vec!["newer".to_string(), "older".to_string()]);

    let transcript = h.service.get_chat("alice", &first.chat_id).expect("get");
    assert_eq!(transcript.messages, first.messages);
    assert!(matches!(
        transcript.messages[1].parts.as_slice(),
        [MessagePart::Text { text }] if text == "done"
    ));
    assert!(matches!(
        h.service.get_chat("bob", &first.chat_id),
        Err(DeepSearchError::ChatNotFound(_))
    ));

    h.service
        .delete_chat("alice", &second.chat_id)
        .expect("delete");
    assert!(matches!(
        h.service.delete_chat("alice", &second.chat_id),
        Err(DeepSearchError::ChatNotFound(_))
    ));
    assert_eq!(h.service.list_chats("alice").expect("list").len(), 1);
}

#[tokio::test]
async fn model_text_is_forwarded_chunk_by_chunk() {
    let llm = StreamingLLM::new(&["Rust ", "futures ", "are lazy."]);
    let h = harness(DeepSearchConfig::default(), Arc::new(llm));

    let stream = h
        .service
        .run_stream(
            "alice",
            request(None, vec![ChatMessage::text(Role::User, "Are futures lazy?")]),
        )
        .expect("stream");
    let chat_id = stream.chat_id.clone();
    let events = stream.events.collect::<Vec<_>>().await;

    let deltas = events
        .iter()
        .filter_map(|event| match event {
            StreamEvent::TextDelta { text } => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(deltas, vec!["Rust ", "futures ", "are lazy."]);
    let kinds = events.iter().map(StreamEvent::kind).collect::<Vec<_>>();
    assert_eq!(
        kinds,
        vec![
            "NEW_CHAT_CREATED",
            "text-delta",
            "text-delta",
            "text-delta",
            "step-finish",
            "finish",
        ]
    );

    let stored = h.store.load_messages(&chat_id).expect("messages");
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].text_content(), "Rust futures are lazy.");
}
