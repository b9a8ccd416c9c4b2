//! The per-connection workflow state machine.
//!
//! A [`WorkflowSession`] walks one client through the wizard: it sends a
//! personalized step, applies the client's answers through the handler
//! table, picks the next step and finally hands the finished target to
//! the commit gateway.
//!
//! Every failure is caught here. The client receives a step error and
//! stays on the step it was on; only [`cancel`](WorkflowSession::cancel)
//! or a successful commit close the connection.

use std::sync::Arc;
use tracing::{debug, error, info};

use super::connection::Connection;
use super::state::SessionState;
use crate::account::ConstructionTarget;
use crate::context::ServerContext;
use crate::error::{ErrorCode, ErrorKind, WorkflowError};
use crate::gateway::CommitError;
use crate::handlers::BuildError;
use crate::protocol::{ClientMessage, RefusalCode, ServerMessage};
use crate::steps::{Properties, StepDefinition, DATA_PREFIX};
use crate::store::StoredAccount;
use crate::templating::personalize;

const CHOICE_SUFFIX: &str = "choice";

/// One client's walk through the wizard.
pub struct WorkflowSession<C: Connection> {
    ctx: Arc<ServerContext>,
    connection: C,
    state: SessionState,
    current: Option<Arc<StepDefinition>>,
    target: ConstructionTarget,
    account: Option<StoredAccount>,
}

impl<C: Connection> std::fmt::Debug for WorkflowSession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowSession")
            .field("state", &self.state)
            .field("step", &self.current_step_id())
            .field("target", &self.target)
            .finish()
    }
}

type Outcome = Result<(), WorkflowError>;

impl<C: Connection> WorkflowSession<C> {
    pub fn new(ctx: Arc<ServerContext>, connection: C) -> Self {
        Self {
            ctx,
            connection,
            state: SessionState::Unstarted,
            current: None,
            target: ConstructionTarget::new(),
            account: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn current_step_id(&self) -> Option<&str> {
        self.current.as_deref().map(|step| step.id.as_str())
    }

    pub fn target(&self) -> &ConstructionTarget {
        &self.target
    }

    /// The committed account, once the session completed.
    pub fn account(&self) -> Option<&StoredAccount> {
        self.account.as_ref()
    }

    pub fn connection(&self) -> &C {
        &self.connection
    }

    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_terminal()
    }

    /// Apply one client message.
    pub fn handle(&mut self, message: ClientMessage) -> Outcome {
        match message {
            ClientMessage::Start => self.start(),
            ClientMessage::StepResult { properties } => self.submit_result(&properties),
            ClientMessage::Previous => self.go_to_previous(),
            ClientMessage::Cancel => self.cancel(),
            ClientMessage::Hello { .. } => {
                self.ensure_open()?;
                let err = self.invalid("authenticate");
                Err(self.report(err))
            }
        }
    }

    /// Send the first step.
    pub fn start(&mut self) -> Outcome {
        self.ensure_open()?;
        if self.state != SessionState::Unstarted {
            let err = self.invalid("start");
            return Err(self.report(err));
        }

        let Some(first) = self.ctx.registry.first_step() else {
            self.state = SessionState::Failed;
            let err = WorkflowError::config(
                ErrorCode::FirstStepNotFound,
                format!(
                    "first step '{}' is not registered",
                    self.ctx.registry.first_step_id()
                ),
            );
            return Err(self.report(err));
        };

        info!(step = %first.id, "Session started");
        self.state = SessionState::AwaitingClientInput;
        self.show(first);
        Ok(())
    }

    /// Return to the step named by `server.previous`.
    pub fn go_to_previous(&mut self) -> Outcome {
        self.ensure_open()?;
        let result = self.previous_step();
        result.map_err(|err| self.report(err))
    }

    /// Apply the client's answers for the current step and move on.
    pub fn submit_result(&mut self, properties: &Properties) -> Outcome {
        self.ensure_open()?;
        let result = self.apply_result(properties);
        result.map_err(|err| self.report(err))
    }

    /// Abandon the session and close the connection. Nothing is committed.
    pub fn cancel(&mut self) -> Outcome {
        self.ensure_open()?;
        if self.state.is_terminal() {
            let err = self.invalid("cancel");
            return Err(self.report(err));
        }
        info!(step = ?self.current_step_id(), "Session cancelled by client");
        self.state = SessionState::Cancelled;
        self.connection.close();
        Ok(())
    }

    /// Tell the client a line could not be read as a message. The session
    /// state is untouched.
    pub fn unreadable_message(&mut self) {
        self.connection
            .send(ServerMessage::step_error(RefusalCode::BadRequest.message()));
    }

    /// The transport saw the connection close.
    pub fn connection_closed(&mut self) {
        if !self.state.is_terminal() {
            debug!(step = ?self.current_step_id(), "Connection closed, session cancelled");
            self.state = SessionState::Cancelled;
        }
    }

    fn ensure_open(&mut self) -> Outcome {
        if self.connection.is_closed() {
            self.connection_closed();
            return Err(WorkflowError::ConnectionClosed);
        }
        Ok(())
    }

    fn invalid(&self, operation: &'static str) -> WorkflowError {
        WorkflowError::InvalidState {
            operation,
            state: self.state,
        }
    }

    fn awaiting_step(&self, operation: &'static str) -> Result<Arc<StepDefinition>, WorkflowError> {
        match (&self.state, &self.current) {
            (SessionState::AwaitingClientInput, Some(step)) => Ok(Arc::clone(step)),
            _ => Err(self.invalid(operation)),
        }
    }

    fn previous_step(&mut self) -> Outcome {
        let step = self.awaiting_step("go back")?;
        if !step.previous_enabled {
            return Err(WorkflowError::user_input(
                "Previous command is not enabled for this step !!",
            ));
        }
        let previous_id = step
            .previous()
            .ok_or_else(|| WorkflowError::user_input("Previous step not found !"))?;
        let previous = self.ctx.registry.get_step(previous_id).ok_or_else(|| {
            WorkflowError::config(
                ErrorCode::PreviousStepNotFound,
                format!("step '{}' goes back to unknown step '{}'", step.id, previous_id),
            )
        })?;

        debug!(from = %step.id, to = %previous.id, "Previous step");
        self.show(previous);
        Ok(())
    }

    fn apply_result(&mut self, properties: &Properties) -> Outcome {
        let step = self.awaiting_step("submit")?;
        let mut branch: Option<&str> = None;

        for (key, value) in properties.with_prefix(DATA_PREFIX) {
            let suffix = &key[DATA_PREFIX.len()..];
            let (suffix, data) = if suffix == CHOICE_SUFFIX {
                let index = resolve_choice(&step, value)?;
                let label = step.choice(index).unwrap_or_default();
                (format!("{}{}", CHOICE_SUFFIX, index), label)
            } else {
                (suffix.to_string(), value)
            };

            match step.method_for(&suffix).or_else(|| step.default_method()) {
                Some(method) => self
                    .ctx
                    .handlers
                    .invoke(method, &self.ctx.config, &mut self.target, data)
                    .map_err(|err| match err {
                        BuildError::UnknownHandler(name) => WorkflowError::config(
                            ErrorCode::MethodNotFound,
                            format!("step '{}' names unknown handler '{}'", step.id, name),
                        ),
                        BuildError::Rejected(message) => WorkflowError::user_input(message),
                    })?,
                None => debug!(step = %step.id, key = %key, "No handler bound, value not applied"),
            }

            if let Some(next) = step.next_for(&suffix) {
                branch = Some(next);
            }
        }

        if step.last_step {
            return self.finalize();
        }

        let next_id = branch.or_else(|| step.default_next()).ok_or_else(|| {
            WorkflowError::config(
                ErrorCode::NextStepNotDeclared,
                format!("step '{}' declares no next step", step.id),
            )
        })?;
        let next = self.ctx.registry.get_step(next_id).ok_or_else(|| {
            WorkflowError::config(
                ErrorCode::NextStepNotFound,
                format!("step '{}' leads to unknown step '{}'", step.id, next_id),
            )
        })?;

        debug!(from = %step.id, to = %next.id, "Next step");
        self.show(next);
        Ok(())
    }

    fn finalize(&mut self) -> Outcome {
        self.state = SessionState::Finalizing;
        match self.ctx.gateway.commit(&self.target) {
            Ok(account) => {
                self.target.original_server_id = account.original_server_id;
                self.target.local_client_id = Some(account.local_client_id);
                self.target.last_connection = Some(account.last_connection);
                self.target.inventory = account.inventory.clone();

                let display_name = self
                    .target
                    .display_name()
                    .unwrap_or(&account.login)
                    .to_string();
                self.connection.send(ServerMessage::CreationCompleted {
                    account_id: account.local_client_id,
                    server_id: account.original_server_id,
                    login: account.login.clone(),
                    password: account.password.clone(),
                    display_name,
                });
                self.connection.close();
                self.state = SessionState::Completed;
                self.account = Some(account);
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::AwaitingClientInput;
                Err(match err {
                    CommitError::Incomplete { missing } => WorkflowError::user_input(format!(
                        "Your account is incomplete : please set your {} !",
                        missing.join(", ")
                    )),
                    CommitError::DuplicateName { login } => {
                        WorkflowError::DuplicateAccount { login }
                    }
                    CommitError::Store(source) => WorkflowError::StoreFailure {
                        detail: source.to_string(),
                    },
                })
            }
        }
    }

    fn show(&mut self, step: Arc<StepDefinition>) {
        let message = personalize(&step, &self.target, &self.ctx.handlers, &self.ctx.config);
        self.connection.send(ServerMessage::Step(message));
        self.current = Some(step);
    }

    /// Log `err` and tell the client about it.
    fn report(&mut self, err: WorkflowError) -> WorkflowError {
        let step = self.current_step_id().unwrap_or("-").to_string();
        match err.kind() {
            ErrorKind::Configuration => {
                if let WorkflowError::Configuration { code, detail } = &err {
                    error!(step = %step, code = code.as_str(), "Configuration error: {}", detail);
                }
            }
            ErrorKind::StoreFailure => error!(step = %step, "Account commit failed: {}", err),
            ErrorKind::UserInput | ErrorKind::DuplicateAccount | ErrorKind::InvalidState => {
                debug!(step = %step, "Rejected: {}", err)
            }
            ErrorKind::ConnectionClosed => return err,
        }
        self.connection
            .send(ServerMessage::step_error(err.client_message()));
        err
    }
}

/// Parse a `data.choice` value and check it names an alternative of `step`.
fn resolve_choice(step: &StepDefinition, value: &str) -> Result<usize, WorkflowError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|index| step.choice(*index).is_some())
        .ok_or_else(|| WorkflowError::user_input("Selection not valid !"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use crate::session::RecordingConnection;

    fn props(pairs: &[(&str, &str)]) -> Properties {
        pairs.iter().copied().collect()
    }

    fn session() -> WorkflowSession<RecordingConnection> {
        let ctx = ServerContext::from_config(ServerConfig::default()).unwrap();
        WorkflowSession::new(Arc::new(ctx), RecordingConnection::new())
    }

    #[test]
    fn start_sends_first_step() {
        let mut session = session();
        session.start().unwrap();

        assert_eq!(session.state(), SessionState::AwaitingClientInput);
        assert_eq!(session.connection().step_ids(), vec!["welcome"]);
    }

    #[test]
    fn start_twice_is_invalid() {
        let mut session = session();
        session.start().unwrap();
        let err = session.start().unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(session.connection().errors(), vec!["This action is not possible now !"]);
    }

    #[test]
    fn resolve_choice_rejects_out_of_range_and_garbage() {
        let step = StepDefinition {
            properties: props(&[("init.choice0", "A"), ("init.choice1", "B")]),
            ..StepDefinition::new("pick")
        };
        assert_eq!(resolve_choice(&step, "1").unwrap(), 1);
        assert!(resolve_choice(&step, "2").is_err());
        assert!(resolve_choice(&step, "-1").is_err());
        assert!(resolve_choice(&step, "one").is_err());
    }

    #[test]
    fn submit_before_start_is_invalid() {
        let mut session = session();
        let err = session.submit_result(&Properties::new()).unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidState { operation: "submit", .. }));
        assert_eq!(session.state(), SessionState::Unstarted);
    }

    #[test]
    fn hello_inside_session_is_invalid() {
        let mut session = session();
        session.start().unwrap();
        let err = session
            .handle(ClientMessage::Hello { key: "again".into() })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert_eq!(session.state(), SessionState::AwaitingClientInput);
    }

    #[test]
    fn unbound_data_key_is_ignored() {
        let mut session = session();
        session.start().unwrap();

        session
            .submit_result(&props(&[("data.bogus", "x")]))
            .unwrap();

        assert!(session.connection().errors().is_empty());
        assert_eq!(session.current_step_id(), Some("login"));
        assert_eq!(session.target(), &ConstructionTarget::new());
    }

    #[test]
    fn hang_up_cancels_before_anything_runs() {
        let mut session = session();
        session.start().unwrap();
        session.connection_mut().hang_up();

        let err = session
            .submit_result(&props(&[("data.text", "")]))
            .unwrap_err();
        assert_eq!(err, WorkflowError::ConnectionClosed);
        assert_eq!(session.state(), SessionState::Cancelled);
        assert_eq!(session.current_step_id(), Some("welcome"));
    }
}
