//! The save call the autosave engine is given, and an in-process server.

use std::{collections::HashMap, future::Future, sync::Arc};

use tokio::sync::Mutex;
use tracing::{debug, instrument};

use crate::{
    error::SaveError,
    identifier::{ChildId, QuestionId},
    payload::{ChildPayload, IdMapping, QuestionRecord, SaveRequest, SaveResponse, ScalarFields},
    question::QuestionType,
};

/// Persists one question's autosave request.
///
/// Implementations upsert children by id, insert rows submitted with a
/// temporary id and report the id they assigned, and delete `deleted_ids`.
pub trait SaveTransport: Send + Sync + 'static {
    fn save(
        &self,
        request: SaveRequest,
    ) -> impl Future<Output = Result<SaveResponse, SaveError>> + Send;
}

impl<T: SaveTransport> SaveTransport for Arc<T> {
    fn save(
        &self,
        request: SaveRequest,
    ) -> impl Future<Output = Result<SaveResponse, SaveError>> + Send {
        (**self).save(request)
    }
}

/// Wraps a plain async function as a transport.
pub struct FnTransport<F>(F);

pub fn from_fn<F, Fut>(save: F) -> FnTransport<F>
where
    F: Fn(SaveRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SaveResponse, SaveError>> + Send,
{
    FnTransport(save)
}

impl<F, Fut> SaveTransport for FnTransport<F>
where
    F: Fn(SaveRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<SaveResponse, SaveError>> + Send,
{
    fn save(
        &self,
        request: SaveRequest,
    ) -> impl Future<Output = Result<SaveResponse, SaveError>> + Send {
        (self.0)(request)
    }
}

#[derive(Debug, Clone)]
struct StoredQuestion {
    question_type: QuestionType,
    scalar: ScalarFields,
    children: Vec<ChildPayload>,
}

#[derive(Debug, Default)]
struct MemoryState {
    questions: HashMap<QuestionId, StoredQuestion>,
    next_id: u64,
    requests: Vec<SaveRequest>,
    failures: Vec<SaveError>,
}

impl MemoryState {
    fn next_id(&mut self) -> String {
        self.next_id += 1;
        self.next_id.to_string()
    }
}

/// Keeps questions in memory with the same upsert contract as the Postgres
/// store. Used by tests and by the binary when no database is configured.
#[derive(Debug, Clone, Default)]
pub struct MemoryServer {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Real ids are handed out as increasing integers starting after `last`.
    pub fn with_id_floor(last: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState {
                next_id: last,
                ..Default::default()
            })),
        }
    }

    pub async fn add_question(
        &self,
        question_type: QuestionType,
        prompt: impl Into<String>,
    ) -> QuestionId {
        let mut state = self.state.lock().await;
        let id = QuestionId::new(format!("q{}", state.next_id()));
        state.questions.insert(
            id.clone(),
            StoredQuestion {
                question_type,
                scalar: ScalarFields {
                    prompt: prompt.into(),
                    points: 0,
                    required: false,
                    image: None,
                    correct_answer: None,
                    guidelines: None,
                },
                children: vec![],
            },
        );
        id
    }

    /// Stores a record as-is, keeping the ids it carries.
    pub async fn insert_record(&self, record: QuestionRecord) {
        let mut state = self.state.lock().await;
        state.questions.insert(
            record.id,
            StoredQuestion {
                question_type: record.question_type,
                scalar: record.scalar,
                children: record.children,
            },
        );
    }

    pub async fn fetch(&self, id: &QuestionId) -> Option<QuestionRecord> {
        let state = self.state.lock().await;
        state.questions.get(id).map(|stored| QuestionRecord {
            id: id.clone(),
            question_type: stored.question_type,
            scalar: stored.scalar.clone(),
            children: stored.children.clone(),
        })
    }

    /// Removes the question and its rows immediately.
    pub async fn remove_question(&self, id: &QuestionId) -> bool {
        self.state.lock().await.questions.remove(id).is_some()
    }

    /// Makes the next save fail with `error`. Queued failures are used in order.
    pub async fn fail_next(&self, error: SaveError) {
        self.state.lock().await.failures.push(error);
    }

    pub async fn requests(&self) -> Vec<SaveRequest> {
        self.state.lock().await.requests.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.state.lock().await.requests.len()
    }
}

impl SaveTransport for MemoryServer {
    #[instrument(level = "debug", skip_all, fields(question = %request.parent_id))]
    async fn save(&self, request: SaveRequest) -> Result<SaveResponse, SaveError> {
        let mut state = self.state.lock().await;
        state.requests.push(request.clone());

        if !state.failures.is_empty() {
            return Err(state.failures.remove(0));
        }

        let Some(mut stored) = state.questions.get(&request.parent_id).cloned() else {
            return Err(SaveError::Transport(format!(
                "question {} not found",
                request.parent_id
            )));
        };
        if stored.question_type != request.question_type {
            return Err(SaveError::Transport(format!(
                "question {} is {}, not {}",
                request.parent_id, stored.question_type, request.question_type
            )));
        }

        stored
            .children
            .retain(|child| !matches!(child.id(), ChildId::Persisted(id) if request.deleted_ids.contains(id)));

        let mut inserted = vec![];
        for mut child in request.children {
            match child.id().clone() {
                ChildId::Temporary(temp) => {
                    let real = state.next_id();
                    debug!("Inserting {} row {temp} as {real}", child.kind());
                    child.set_id(ChildId::Persisted(real.clone()));
                    inserted.push(IdMapping::new(temp, real));
                    stored.children.push(child);
                }
                id => match stored.children.iter_mut().find(|existing| *existing.id() == id) {
                    Some(existing) => *existing = child,
                    None => stored.children.push(child),
                },
            }
        }
        stored.children.sort_by_key(ChildPayload::position);
        stored.scalar = request.scalar;
        state.questions.insert(request.parent_id, stored);

        Ok(SaveResponse::ok(inserted))
    }
}
