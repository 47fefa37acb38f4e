//! Runs one [`AutosaveEngine`] per open question on the tokio runtime.
//!
//! The engine lives inside a spawned task. The UI talks to it through an
//! [`AutosaveHandle`]: edits go in over a channel, the live form and the
//! [`SaveState`] come back over watch channels. Every mutation of the engine
//! happens inside that one task, so per-question state needs no locking.

use std::{future, sync::Arc};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::{sleep_until, Instant},
};
use tracing::{debug, info_span, warn, Instrument};

use crate::{
    config::AutosaveConfig,
    engine::AutosaveEngine,
    error::{SaveError, SessionError},
    identifier::{ChildId, QuestionId, TempIdAllocator},
    payload::{SaveRequest, SaveResponse},
    question::AutosaveForm,
    status::SaveState,
    transport::SaveTransport,
};

type SaveResult = Result<SaveResponse, SaveError>;

enum Command<F: AutosaveForm> {
    Edit(Box<dyn FnOnce(&mut F) + Send>),
    Replace(F),
    AddChild(F::Child),
    RemoveChild(ChildId),
    Reorder(Vec<ChildId>),
    MarkDeleted(ChildId),
    Flush,
    Close(oneshot::Sender<SaveState>),
}

/// UI side of an autosave session.
///
/// Dropping every handle ends the session after one last save of any
/// unsaved edits.
pub struct AutosaveHandle<F: AutosaveForm> {
    parent_id: QuestionId,
    allocator: TempIdAllocator,
    commands: mpsc::UnboundedSender<Command<F>>,
    form: watch::Receiver<F>,
    status: watch::Receiver<SaveState>,
}

impl<F: AutosaveForm> Clone for AutosaveHandle<F> {
    fn clone(&self) -> Self {
        Self {
            parent_id: self.parent_id.clone(),
            allocator: self.allocator.clone(),
            commands: self.commands.clone(),
            form: self.form.clone(),
            status: self.status.clone(),
        }
    }
}

/// Starts a session for `form`, the value just fetched from the server.
pub fn spawn<F, T>(
    parent_id: QuestionId,
    form: F,
    transport: T,
    config: &AutosaveConfig,
) -> AutosaveHandle<F>
where
    F: AutosaveForm,
    T: SaveTransport,
{
    let allocator = TempIdAllocator::new();
    let engine = AutosaveEngine::new(parent_id.clone(), form.clone(), config.debounce)
        .with_allocator(allocator.clone());

    let (commands, receiver) = mpsc::unbounded_channel();
    let (form_tx, form_rx) = watch::channel(form);
    let (status_tx, status_rx) = watch::channel(SaveState::Synced);

    let span = info_span!("autosave", question = %parent_id, kind = %F::QUESTION_TYPE);
    tokio::spawn(
        run(engine, Arc::new(transport), receiver, form_tx, status_tx).instrument(span),
    );

    AutosaveHandle {
        parent_id,
        allocator,
        commands,
        form: form_rx,
        status: status_rx,
    }
}

impl<F: AutosaveForm> AutosaveHandle<F> {
    pub fn parent_id(&self) -> &QuestionId {
        &self.parent_id
    }

    /// A fresh temporary id for a row the user is about to add.
    pub fn allocate(&self) -> ChildId {
        self.allocator.allocate()
    }

    pub fn edit(&self, apply: impl FnOnce(&mut F) + Send + 'static) -> Result<(), SessionError> {
        self.send(Command::Edit(Box::new(apply)))
    }

    pub fn replace(&self, form: F) -> Result<(), SessionError> {
        self.send(Command::Replace(form))
    }

    pub fn add_child(&self, child: F::Child) -> Result<(), SessionError> {
        self.send(Command::AddChild(child))
    }

    pub fn remove_child(&self, id: ChildId) -> Result<(), SessionError> {
        self.send(Command::RemoveChild(id))
    }

    pub fn reorder(&self, order: Vec<ChildId>) -> Result<(), SessionError> {
        self.send(Command::Reorder(order))
    }

    /// For rows the UI removed through [`AutosaveHandle::replace`].
    pub fn mark_deleted(&self, id: ChildId) -> Result<(), SessionError> {
        self.send(Command::MarkDeleted(id))
    }

    /// Saves now instead of waiting for the quiescence interval.
    pub fn flush(&self) -> Result<(), SessionError> {
        self.send(Command::Flush)
    }

    /// The live form, including reconciled ids.
    pub fn form(&self) -> F {
        self.form.borrow().clone()
    }

    pub fn status(&self) -> SaveState {
        self.status.borrow().clone()
    }

    pub fn subscribe_status(&self) -> watch::Receiver<SaveState> {
        self.status.clone()
    }

    pub fn subscribe_form(&self) -> watch::Receiver<F> {
        self.form.clone()
    }

    /// Waits until the status satisfies `accept`.
    pub async fn wait_for_status(
        &self,
        accept: impl FnMut(&SaveState) -> bool,
    ) -> Result<SaveState, SessionError> {
        let mut status = self.status.clone();
        let state = status
            .wait_for(accept)
            .await
            .map_err(|_| SessionError::Closed(self.parent_id.clone()))?;
        Ok(state.clone())
    }

    /// Saves outstanding edits, waits for the last save to resolve and stops
    /// the session. Returns the final status.
    pub async fn close(self) -> Result<SaveState, SessionError> {
        let (reply, outcome) = oneshot::channel();
        self.send(Command::Close(reply))?;
        outcome
            .await
            .map_err(|_| SessionError::Closed(self.parent_id.clone()))
    }

    fn send(&self, command: Command<F>) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::Closed(self.parent_id.clone()))
    }
}

async fn run<F, T>(
    mut engine: AutosaveEngine<F>,
    transport: Arc<T>,
    mut commands: mpsc::UnboundedReceiver<Command<F>>,
    form_tx: watch::Sender<F>,
    status_tx: watch::Sender<SaveState>,
) where
    F: AutosaveForm,
    T: SaveTransport,
{
    let mut pending: Option<JoinHandle<SaveResult>> = None;
    let mut shutting_down = false;
    let mut final_flush_sent = false;
    let mut close_replies: Vec<oneshot::Sender<SaveState>> = vec![];

    loop {
        let deadline = engine.deadline();

        tokio::select! {
            command = commands.recv(), if !shutting_down => match command {
                Some(Command::Close(reply)) => {
                    close_replies.push(reply);
                    shutting_down = true;
                }
                Some(Command::Flush) => {
                    if let Some(request) = engine.flush() {
                        pending = Some(start_save(&transport, request));
                    }
                }
                Some(command) => apply(&mut engine, command),
                None => shutting_down = true,
            },
            _ = wait_until(deadline), if pending.is_none() => {
                if let Some(request) = engine.poll_save(Instant::now()) {
                    pending = Some(start_save(&transport, request));
                }
            }
            result = join_save(&mut pending) => {
                pending = None;
                engine.complete(Instant::now(), result);
            }
        }

        publish(&engine, &form_tx, &status_tx);

        if shutting_down && pending.is_none() {
            if !final_flush_sent {
                final_flush_sent = true;
                if let Some(request) = engine.flush() {
                    pending = Some(start_save(&transport, request));
                    publish(&engine, &form_tx, &status_tx);
                    continue;
                }
            }
            break;
        }
    }

    drop(commands);
    let status = engine.status();
    debug!("Session closed with status {status:?}");
    for reply in close_replies {
        let _ = reply.send(status.clone());
    }
}

fn apply<F: AutosaveForm>(engine: &mut AutosaveEngine<F>, command: Command<F>) {
    let now = Instant::now();
    match command {
        Command::Edit(edit) => engine.edit(now, edit),
        Command::Replace(form) => engine.replace(now, form),
        Command::AddChild(child) => engine.add_child(now, child),
        Command::RemoveChild(id) => engine.remove_child(now, &id),
        Command::Reorder(order) => engine.reorder(now, &order),
        Command::MarkDeleted(id) => engine.mark_deleted(&id),
        Command::Flush | Command::Close(_) => {}
    }
}

fn start_save<T: SaveTransport>(transport: &Arc<T>, request: SaveRequest) -> JoinHandle<SaveResult> {
    let transport = Arc::clone(transport);
    tokio::spawn(async move { transport.save(request).await }.in_current_span())
}

async fn join_save(pending: &mut Option<JoinHandle<SaveResult>>) -> SaveResult {
    match pending {
        Some(handle) => match handle.await {
            Ok(result) => result,
            Err(error) => {
                warn!("Save task did not finish: {error}");
                Err(SaveError::Transport(format!("save task failed: {error}")))
            }
        },
        None => future::pending().await,
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

fn publish<F: AutosaveForm>(
    engine: &AutosaveEngine<F>,
    form_tx: &watch::Sender<F>,
    status_tx: &watch::Sender<SaveState>,
) {
    form_tx.send_if_modified(|form| {
        if *form != *engine.form() {
            *form = engine.form().clone();
            true
        } else {
            false
        }
    });
    let status = engine.status();
    status_tx.send_if_modified(|current| {
        if *current != status {
            *current = status;
            true
        } else {
            false
        }
    });
}
