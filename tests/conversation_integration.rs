//! Integration tests for the character response pipeline
//!
//! These drive characters and conversations through a scripted in-process
//! backend:
//! - Accepted responses and relationship feedback
//! - Retry exhaustion and scripted fallbacks
//! - Round bookkeeping across several characters

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;
use troupe::config::RetryConfig;
use troupe::{Backend, BackendError, Character, Conversation, GenerationOptions, Personality, SharedCharacter, Tone};

/// Backend replaying a fixed script, then failing
struct Script {
    replies: RefCell<VecDeque<Result<String, BackendError>>>,
    prompts: RefCell<Vec<String>>,
    calls: Cell<usize>,
}

impl Script {
    fn new(replies: Vec<Result<&str, BackendError>>) -> Rc<Self> {
        Rc::new(Self {
            replies: RefCell::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            prompts: RefCell::new(Vec::new()),
            calls: Cell::new(0),
        })
    }
}

impl Backend for Script {
    fn invoke(&self, prompt: &str, _options: &GenerationOptions) -> Result<String, BackendError> {
        self.calls.set(self.calls.get() + 1);
        self.prompts.borrow_mut().push(prompt.to_string());
        self.replies
            .borrow_mut()
            .pop_front()
            .unwrap_or(Err(BackendError::Transport("connection refused".to_string())))
    }
}

const COOPERATIVE: &str =
    "I fully agree and will help you. Together we can reach the harbor before the storm breaks over the cliffs tonight.";
const NEUTRAL: &str =
    "The lanterns flicker along the harbor wall while fishermen haul their nets onto the wet stones at dusk.";

fn character(name: &str, style: &str, backend: Rc<Script>) -> Character {
    Character::new(
        name,
        Personality::traits([("bravery", 7), ("patience", 4)]),
        vec!["Reach the harbor".to_string()],
        style,
    )
    .with_backend(backend)
    .with_retry(RetryConfig::immediate(2))
}

fn cast(members: Vec<(&str, SharedCharacter)>) -> IndexMap<String, SharedCharacter> {
    members.into_iter().map(|(k, c)| (k.to_string(), c)).collect()
}

#[test]
fn test_cooperative_response_raises_relationship() {
    let aria = character("Aria", "warm, direct", Script::new(vec![Ok(COOPERATIVE)])).shared();
    let bram = character("Bram", "gruff", Script::new(vec![Ok(NEUTRAL)])).shared();
    let mut conversation = Conversation::new(cast(vec![("Aria", aria.clone()), ("Bram", bram.clone())]), "Harbor");

    let responses = conversation.run_round("A storm gathers");

    assert_eq!(troupe::tone::classify(&responses["Aria"]), Tone::Cooperative);
    assert_eq!(aria.borrow().relationship("Bram"), 6);
    assert_eq!(bram.borrow().relationship("Aria"), 5);
}

#[test]
fn test_short_cooperative_output_is_rejected() {
    let backend = Script::new(vec![Ok("I fully agree and will help you."), Ok("I fully agree and will help you.")]);
    let mut aria = character("Aria", "calculating", backend.clone());

    let response = aria.respond("A storm gathers", None);

    assert_eq!(troupe::tone::classify("I fully agree and will help you."), Tone::Cooperative);
    assert_eq!(response, "I'm assessing our options carefully.");
    assert_eq!(backend.calls.get(), 2);
    assert!(aria.conversation_history(None).is_empty());
}

#[test]
fn test_backend_failures_fall_back_without_history() {
    let backend = Script::new(vec![
        Err(BackendError::Timeout),
        Err(BackendError::Status(500)),
        Err(BackendError::Transport("reset".to_string())),
    ]);
    let mut aria = character("Aria", "gentle and compassionate", backend.clone());
    let before = aria.conversation_history(None).len();

    let response = aria.respond("A storm gathers", None);

    let fallbacks = [
        "We need to focus on practical solutions.",
        "There must be a peaceful way through this.",
        "I'm assessing our options carefully.",
    ];
    assert!(fallbacks.contains(&response.as_str()));
    assert_eq!(response, "There must be a peaceful way through this.");
    assert_eq!(aria.conversation_history(None).len(), before);
    assert_eq!(backend.calls.get(), 2);
}

#[test]
fn test_run_round_two_characters() {
    let mut conversation = Conversation::new(
        cast(vec![
            ("knight", character("Sir Galadon", "formal", Script::new(vec![Ok(NEUTRAL)])).shared()),
            ("merchant", character("Baron", "charming", Script::new(vec![Ok(NEUTRAL)])).shared()),
        ]),
        "Marketplace",
    );
    let before = conversation.history().len();

    let responses = conversation.run_round("test");

    assert_eq!(responses.len(), 2);
    assert!(responses.contains_key("knight"));
    assert!(responses.contains_key("merchant"));
    assert_eq!(conversation.history().len(), before + 1);
}

#[test]
fn test_round_prompt_lists_other_participants() {
    let backend = Script::new(vec![Ok(NEUTRAL), Ok(NEUTRAL)]);
    let aria = character("Aria", "direct", backend.clone())
        .with_relationships(IndexMap::from([("Bram".to_string(), 8)]))
        .shared();
    let bram = character("Bram", "direct", Script::new(vec![Ok(NEUTRAL), Ok(NEUTRAL)])).shared();
    let mut conversation = Conversation::new(cast(vec![("Aria", aria), ("Bram", bram)]), "Harbor at dusk");

    conversation.run_round("first");
    conversation.run_round("second");

    let prompts = backend.prompts.borrow();
    assert!(prompts[0].contains("Relationships: Bram:8"));
    assert!(prompts[0].contains(r#""scenario": "Harbor at dusk""#));
    assert!(prompts[0].contains(r#""round_number": 1"#));
    assert!(prompts[1].contains(r#""round_number": 2"#));
    assert!(prompts[1].contains("SITUATION: second"));
}

#[test]
fn test_fallback_round_leaves_relationships_alone() {
    let aria = character("Aria", "direct", Script::new(vec![])).shared();
    let bram = character("Bram", "direct", Script::new(vec![])).shared();
    let mut conversation = Conversation::new(cast(vec![("Aria", aria.clone()), ("Bram", bram.clone())]), "Harbor");

    let responses = conversation.run_round("Silence");

    // "We need to focus on practical solutions." carries no keyword
    assert_eq!(responses["Aria"], "We need to focus on practical solutions.");
    assert!(aria.borrow().relationships().is_empty());
    assert!(aria.borrow().conversation_history(None).is_empty());
    assert_eq!(conversation.history().len(), 1);
    assert_eq!(conversation.summary(), "Conversation with 2 characters over 1 rounds");
}
