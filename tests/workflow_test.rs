//! Workflow session scenarios driven through a recording connection.

use std::sync::Arc;

use account_forge::account::{CharacterClass, ConstructionTarget};
use account_forge::config::ServerConfig;
use account_forge::context::ServerContext;
use account_forge::error::{ErrorCode, ErrorKind, WorkflowError};
use account_forge::gateway::CommitGateway;
use account_forge::handlers::{BuildError, HandlerTable};
use account_forge::protocol::ServerMessage;
use account_forge::session::{Connection, RecordingConnection, SessionState, WorkflowSession};
use account_forge::steps::{parse_steps, Properties, StepRegistry};
use account_forge::store::{ClientIdAllocator, MemoryStore};

type Session = WorkflowSession<RecordingConnection>;

fn props(pairs: &[(&str, &str)]) -> Properties {
    pairs.iter().copied().collect()
}

fn builtin_context() -> Arc<ServerContext> {
    let mut config = ServerConfig {
        server_id: 7,
        symbolic_name: "Tar Valon".to_string(),
        ..Default::default()
    };
    config.special_keys.amyrlin = Some("amyrlin".to_string());
    Arc::new(ServerContext::from_config(config).unwrap())
}

fn custom_context(yaml: &str, first: &str, handlers: HandlerTable) -> Arc<ServerContext> {
    let steps = parse_steps(yaml, "test.yml").unwrap();
    let registry = StepRegistry::from_definitions(steps, first, &handlers).unwrap();
    let gateway = CommitGateway::new(
        Arc::new(MemoryStore::new()),
        ClientIdAllocator::in_memory(0),
        1,
    );
    Arc::new(ServerContext::new(
        ServerConfig::default(),
        handlers,
        registry,
        gateway,
    ))
}

fn started(ctx: &Arc<ServerContext>) -> Session {
    let mut session = WorkflowSession::new(Arc::clone(ctx), RecordingConnection::new());
    session.start().unwrap();
    session
}

fn submit(session: &mut Session, pairs: &[(&str, &str)]) -> Result<(), WorkflowError> {
    session.submit_result(&props(pairs))
}

fn last_property(session: &Session, key: &str) -> Option<String> {
    session.connection().messages().iter().rev().find_map(|m| match m {
        ServerMessage::Step(step) => step.properties.get(key).map(str::to_string),
        _ => None,
    })
}

/// Walk the built-in wizard up to the confirmation page as a Warder.
fn walk_to_confirm(session: &mut Session, login: &str) {
    submit(session, &[]).unwrap();
    submit(session, &[("data.login", login), ("data.email", "lan@malkier.example")]).unwrap();
    submit(session, &[("data.password", "Bukama")]).unwrap();
    submit(session, &[("data.choice", "1")]).unwrap();
    submit(session, &[("data.choice", "2")]).unwrap();
    submit(session, &[("data.choice", "0")]).unwrap();
    submit(session, &[("data.choice", "3")]).unwrap();
    submit(
        session,
        &[("data.player_name", "Lan"), ("data.full_player_name", "al'Lan Mandragoran")],
    )
    .unwrap();
    submit(session, &[("data.past", ""), ("data.past_later", "true")]).unwrap();
}

#[test]
fn full_walk_creates_the_account() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    walk_to_confirm(&mut session, "lan");

    assert_eq!(
        session.connection().step_ids(),
        vec![
            "welcome",
            "login",
            "password",
            "class-select",
            "warder-rank",
            "cloak-color",
            "hair-color",
            "player-name",
            "player-past",
            "confirm",
        ]
    );
    let summary = last_property(&session, "init.summary").unwrap();
    assert!(summary.contains("Player Name : Lan"));
    assert!(summary.contains("Player Rank : Warder"));
    assert!(summary.contains("Tar Valon"));

    submit(&mut session, &[]).unwrap();

    assert_eq!(session.state(), SessionState::Completed);
    assert!(session.connection().closed_by_server());
    match session.connection().last() {
        Some(ServerMessage::CreationCompleted {
            account_id,
            server_id,
            login,
            display_name,
            ..
        }) => {
            assert_eq!(*account_id, 0);
            assert_eq!(*server_id, 7);
            assert_eq!(login, "lan");
            assert_eq!(display_name, "al'Lan Mandragoran");
        }
        other => panic!("expected completion, got {:?}", other),
    }

    let stored = ctx.gateway.store().get("lan").unwrap();
    assert_eq!(stored.account_name, "lan-7-0");
    assert_eq!(stored.inventory.items, vec!["gray cloak".to_string()]);
    assert_eq!(stored.profile.player_past.as_deref(), Some(""));
    assert_eq!(session.target().local_client_id, Some(0));
}

#[test]
fn welcome_is_personalized_with_server_name() {
    let ctx = builtin_context();
    let session = started(&ctx);
    let text = last_property(&session, "init.text").unwrap();
    assert!(text.starts_with("Welcome to Tar Valon !"));
    assert!(text.contains("admin@localhost"));
    assert!(!text.contains('$'));
}

#[test]
fn rejected_value_keeps_the_same_step() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    submit(&mut session, &[]).unwrap();

    let err = submit(&mut session, &[("data.login", "x"), ("data.email", "a@b.example")]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserInput);
    assert_eq!(session.current_step_id(), Some("login"));
    assert_eq!(session.state(), SessionState::AwaitingClientInput);
    assert_eq!(session.connection().errors().len(), 1);
    assert!(session.target().email.is_none());
}

#[test]
fn earlier_keys_are_not_rolled_back() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    submit(&mut session, &[]).unwrap();

    let err = submit(&mut session, &[("data.login", "egwene"), ("data.email", "not an address")])
        .unwrap_err();

    assert_eq!(err, WorkflowError::user_input("Invalid email address !"));
    assert_eq!(session.target().login.as_deref(), Some("egwene"));
    assert_eq!(session.current_step_id(), Some("login"));
}

#[test]
fn non_data_keys_are_ignored() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    submit(&mut session, &[]).unwrap();

    submit(
        &mut session,
        &[
            ("init.label0", "tampered"),
            ("server.next", "confirm"),
            ("data.login", "egwene"),
            ("data.email", "egwene@tower.example"),
        ],
    )
    .unwrap();
    assert_eq!(session.current_step_id(), Some("password"));
}

#[test]
fn out_of_range_choice_changes_nothing() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    submit(&mut session, &[]).unwrap();
    submit(&mut session, &[("data.login", "rand"), ("data.email", "rand@two-rivers.example")]).unwrap();
    submit(&mut session, &[("data.password", "Tam's son")]).unwrap();

    for bad in ["8", "-1", "two"] {
        let err = submit(&mut session, &[("data.choice", bad)]).unwrap_err();
        assert_eq!(err, WorkflowError::user_input("Selection not valid !"));
    }
    assert!(session.target().character().is_none());
    assert_eq!(session.current_step_id(), Some("class-select"));
}

#[test]
fn routing_choice_only_changes_step() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    submit(&mut session, &[]).unwrap();
    submit(&mut session, &[("data.login", "padan"), ("data.email", "fain@example.org")]).unwrap();
    submit(&mut session, &[("data.password", "Mordeth")]).unwrap();

    submit(&mut session, &[("data.choice", "6")]).unwrap();
    assert_eq!(session.current_step_id(), Some("darkfriend"));
    assert!(session.target().character().is_none());
}

#[test]
fn special_key_creates_fixed_character() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    submit(&mut session, &[]).unwrap();
    submit(&mut session, &[("data.login", "siuan"), ("data.email", "siuan@tower.example")]).unwrap();
    submit(&mut session, &[("data.password", "fishes")]).unwrap();
    submit(&mut session, &[("data.choice", "7")]).unwrap();
    assert_eq!(session.current_step_id(), Some("special-key"));

    let err = submit(&mut session, &[("data.key", "guess")]).unwrap_err();
    assert_eq!(err.client_message(), "Wrong Special Character Key !");
    // Unconfigured keys are random, not their names.
    let err = submit(&mut session, &[("data.key", "shaitan")]).unwrap_err();
    assert_eq!(err.client_message(), "Wrong Special Character Key !");
    assert!(session.target().character().is_none());

    submit(&mut session, &[("data.key", "amyrlin")]).unwrap();
    let character = session.target().character().unwrap();
    assert_eq!(character.class, CharacterClass::AesSedai);
    assert_eq!(character.rank.as_deref(), Some("Amyrlin"));
    assert_eq!(session.current_step_id(), Some("player-name"));
}

#[test]
fn previous_returns_a_fresh_copy() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    walk_to_confirm(&mut session, "lan");
    let before = last_property(&session, "init.summary").unwrap();

    session.go_to_previous().unwrap();
    assert_eq!(session.current_step_id(), Some("player-past"));
    session.go_to_previous().unwrap();
    submit(&mut session, &[("data.player_name", "Dai Shan"), ("data.full_player_name", "al'Lan Mandragoran")])
        .unwrap();
    submit(&mut session, &[("data.past", "Born in Malkier")]).unwrap();

    let after = last_property(&session, "init.summary").unwrap();
    assert_ne!(before, after);
    assert!(after.contains("Player Name : Dai Shan"));
}

#[test]
fn previous_is_refused_where_disabled() {
    let ctx = builtin_context();
    let mut session = started(&ctx);

    let err = session.go_to_previous().unwrap_err();

    assert_eq!(
        err,
        WorkflowError::user_input("Previous command is not enabled for this step !!")
    );
    assert_eq!(session.current_step_id(), Some("welcome"));
    assert_eq!(session.connection().step_ids(), vec!["welcome"]);
}

#[test]
fn duplicate_login_is_reported_on_the_last_step() {
    let ctx = builtin_context();

    let mut first = started(&ctx);
    walk_to_confirm(&mut first, "moiraine");
    let mut second = started(&ctx);
    walk_to_confirm(&mut second, "moiraine");

    submit(&mut first, &[]).unwrap();
    let err = submit(&mut second, &[]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::DuplicateAccount);
    assert_eq!(second.state(), SessionState::AwaitingClientInput);
    assert_eq!(second.current_step_id(), Some("confirm"));
    assert!(!second.connection().is_closed());
    assert_eq!(ctx.gateway.store().len(), 1);
}

#[test]
fn cancel_closes_without_commit() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    walk_to_confirm(&mut session, "mat");

    session.cancel().unwrap();

    assert_eq!(session.state(), SessionState::Cancelled);
    assert!(session.connection().closed_by_server());
    assert!(ctx.gateway.store().is_empty());
    assert_eq!(session.cancel().unwrap_err(), WorkflowError::ConnectionClosed);
}

#[test]
fn transport_close_cancels() {
    let ctx = builtin_context();
    let mut session = started(&ctx);
    session.connection_closed();

    assert_eq!(session.state(), SessionState::Cancelled);
    assert!(ctx.gateway.store().is_empty());
}

// Custom step graphs

fn remember_choice(
    _: &ServerConfig,
    target: &mut ConstructionTarget,
    value: &str,
) -> Result<(), BuildError> {
    target.email = Some(value.to_string());
    Ok(())
}

fn with_remember() -> HandlerTable {
    let mut handlers = HandlerTable::builtin();
    handlers.register("rememberChoice", remember_choice);
    handlers
}

#[test]
fn choice_index_resolves_to_label() {
    let ctx = custom_context(
        r#"
steps:
  - id: pick
    kind: radio
    properties:
      init.choice0: A
      init.choice1: B
      data.choice: "0"
      server.method: rememberChoice
      server.next: done
  - id: done
    last_step: true
"#,
        "pick",
        with_remember(),
    );
    let mut session = started(&ctx);

    submit(&mut session, &[("data.choice", "1")]).unwrap();

    assert_eq!(session.target().email.as_deref(), Some("B"));
    assert_eq!(session.current_step_id(), Some("done"));
}

#[test]
fn class_choice_branches_to_its_rank_step() {
    let ctx = custom_context(
        r#"
steps:
  - id: class-select
    kind: radio
    properties:
      init.choice0: Warder
      init.choice1: Aiel
      data.choice: "0"
      server.method: setWotCharacterClass
      server.choice0.next: rank-select
      server.next: elsewhere
  - id: rank-select
    last_step: true
  - id: elsewhere
    last_step: true
"#,
        "class-select",
        HandlerTable::builtin(),
    );
    let mut session = started(&ctx);

    submit(&mut session, &[("data.choice", "0")]).unwrap();

    assert_eq!(session.target().character().unwrap().class, CharacterClass::Warder);
    assert_eq!(session.current_step_id(), Some("rank-select"));
}

#[test]
fn routing_only_choice_follows_its_branch() {
    let ctx = custom_context(
        r#"
steps:
  - id: pick
    properties:
      init.choice0: Left
      init.choice1: Right
      data.choice: "0"
      server.choice0.next: left
      server.choice1.next: right
  - id: left
    last_step: true
  - id: right
    last_step: true
"#,
        "pick",
        HandlerTable::builtin(),
    );
    let mut session = started(&ctx);

    submit(&mut session, &[("data.choice", "1")]).unwrap();

    assert_eq!(session.current_step_id(), Some("right"));
    assert!(session.connection().errors().is_empty());
    assert_eq!(session.target(), &ConstructionTarget::new());
}

#[test]
fn invented_data_key_is_not_a_server_error() {
    let ctx = builtin_context();
    let mut session = started(&ctx);

    submit(&mut session, &[("data.bogus", "x")]).unwrap();
    assert_eq!(session.current_step_id(), Some("login"));

    // On a step with bindings the unknown key is simply not applied.
    submit(
        &mut session,
        &[("data.login", "moiraine"), ("data.bogus", "x"), ("data.email", "moiraine@tower.example")],
    )
    .unwrap();
    assert_eq!(session.current_step_id(), Some("password"));
    assert_eq!(session.target().login.as_deref(), Some("moiraine"));
    assert!(session.connection().errors().is_empty());
}

#[test]
fn named_handler_missing_from_table_is_a_configuration_error() {
    let steps = parse_steps(
        r#"
steps:
  - id: pick
    properties:
      init.choice0: A
      server.method: rememberChoice
      server.next: done
  - id: done
    last_step: true
"#,
        "test.yml",
    )
    .unwrap();
    let registry = StepRegistry::from_definitions(steps, "pick", &with_remember()).unwrap();
    let gateway = CommitGateway::new(
        Arc::new(MemoryStore::new()),
        ClientIdAllocator::in_memory(0),
        1,
    );
    let ctx = Arc::new(ServerContext::new(
        ServerConfig::default(),
        HandlerTable::builtin(),
        registry,
        gateway,
    ));
    let mut session = started(&ctx);

    let err = submit(&mut session, &[("data.choice", "0")]).unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Configuration { code: ErrorCode::MethodNotFound, .. }
    ));
    let text = session.connection().errors()[0];
    assert!(text.contains("badly configured"));
    assert!(text.ends_with("(code: #metNofou)"));
    assert_eq!(session.current_step_id(), Some("pick"));
}

#[test]
fn branch_only_step_without_matching_branch_has_no_next() {
    let ctx = custom_context(
        r#"
steps:
  - id: pick
    properties:
      init.choice0: A
      server.method: rememberChoice
      server.choice0.next: done
  - id: done
    last_step: true
"#,
        "pick",
        with_remember(),
    );
    let mut session = started(&ctx);

    let err = submit(&mut session, &[]).unwrap_err();

    assert!(matches!(
        err,
        WorkflowError::Configuration { code: ErrorCode::NextStepNotDeclared, .. }
    ));
    assert_eq!(session.current_step_id(), Some("pick"));
}

#[test]
fn previous_without_link_is_a_user_error() {
    let ctx = custom_context(
        r#"
steps:
  - id: only
    properties:
      server.next: end
  - id: end
    last_step: true
"#,
        "only",
        HandlerTable::builtin(),
    );
    let mut session = started(&ctx);

    let err = session.go_to_previous().unwrap_err();
    assert_eq!(err, WorkflowError::user_input("Previous step not found !"));
}

#[test]
fn incomplete_account_cannot_finish() {
    let ctx = custom_context(
        r#"
steps:
  - id: end
    last_step: true
"#,
        "end",
        HandlerTable::builtin(),
    );
    let mut session = started(&ctx);

    let err = submit(&mut session, &[]).unwrap_err();

    assert_eq!(err.kind(), ErrorKind::UserInput);
    assert!(err.client_message().contains("login, password, character"));
    assert_eq!(session.state(), SessionState::AwaitingClientInput);
    assert!(ctx.gateway.store().is_empty());
}
