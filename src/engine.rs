//! Synchronous autosave core for one question.
//!
//! The engine owns the live form and everything that decides when it is
//! saved: the last persisted snapshot, pending deletions, the quiescence timer
//! and the single-flight slot. It never sleeps or performs I/O itself; the
//! caller passes in the current time and hands requests to a transport. See
//! [`crate::session`] for the tokio driver.

use std::{
    collections::{BTreeSet, HashMap, HashSet},
    time::Duration,
};

use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::{
    debounce::Debouncer,
    deletion::DeletionTracker,
    error::{ErrorInfo, SaveError},
    identifier::{ChildId, QuestionId, TempId, TempIdAllocator},
    payload::{SaveRequest, SaveResponse},
    question::{self, AutosaveForm, ChildRecord},
    snapshot::SaveSnapshot,
    status::SaveState,
};

/// What was submitted by the save currently in flight.
#[derive(Debug, Clone)]
struct InFlight<F> {
    form: F,
    deleted: BTreeSet<String>,
}

#[derive(Debug)]
pub struct AutosaveEngine<F: AutosaveForm> {
    parent_id: QuestionId,
    live: F,
    snapshot: SaveSnapshot<F>,
    deletions: DeletionTracker,
    allocator: TempIdAllocator,
    /// Every temp id this session has seen reconciled. Temp ids are never
    /// reused, so the map only grows and stays valid.
    reconciled: HashMap<TempId, String>,
    debounce: Debouncer,
    in_flight: Option<InFlight<F>>,
    last_error: Option<ErrorInfo>,
}

impl<F: AutosaveForm> AutosaveEngine<F> {
    /// Opens an editor on a form fetched from the server; that value is the
    /// initial snapshot.
    pub fn new(parent_id: QuestionId, saved: F, debounce: Duration) -> Self {
        Self {
            parent_id,
            live: saved.clone(),
            snapshot: SaveSnapshot::new(saved),
            deletions: DeletionTracker::new(),
            allocator: TempIdAllocator::new(),
            reconciled: HashMap::new(),
            debounce: Debouncer::new(debounce),
            in_flight: None,
            last_error: None,
        }
    }

    pub fn with_allocator(mut self, allocator: TempIdAllocator) -> Self {
        self.allocator = allocator;
        self
    }

    pub fn parent_id(&self) -> &QuestionId {
        &self.parent_id
    }

    pub fn form(&self) -> &F {
        &self.live
    }

    pub fn saved(&self) -> &F {
        self.snapshot.saved()
    }

    pub fn allocator(&self) -> &TempIdAllocator {
        &self.allocator
    }

    pub fn allocate(&self) -> ChildId {
        self.allocator.allocate()
    }

    pub fn deletions(&self) -> &DeletionTracker {
        &self.deletions
    }

    pub fn is_dirty(&self) -> bool {
        self.snapshot.is_dirty(&self.live)
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn last_error(&self) -> Option<&ErrorInfo> {
        self.last_error.as_ref()
    }

    pub fn status(&self) -> SaveState {
        SaveState::derive(self.is_dirty(), self.is_in_flight(), self.last_error.as_ref())
    }

    /// When the pending quiescence timer fires, if one is armed.
    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    /// Applies a user edit to the live form.
    pub fn edit(&mut self, now: Instant, apply: impl FnOnce(&mut F)) {
        apply(&mut self.live);
        self.after_edit(now);
    }

    /// Replaces the live form with a value coming from the UI. Temp ids the
    /// value still carries but that were already reconciled are rewritten.
    pub fn replace(&mut self, now: Instant, mut form: F) {
        if let Some(children) = form.children_mut() {
            question::substitute_ids(children, &self.reconciled);
        }
        self.live = form;
        self.after_edit(now);
    }

    /// Appends a row, placing it last.
    pub fn add_child(&mut self, now: Instant, mut child: F::Child) {
        let Some(children) = self.live.children_mut() else {
            warn!("{} questions have no rows to add to", F::QUESTION_TYPE);
            return;
        };
        child.set_position(children.len() as u32);
        children.push(child);
        self.after_edit(now);
    }

    /// Drops a row from the live form and records it for deletion if the
    /// server has it.
    pub fn remove_child(&mut self, now: Instant, id: &ChildId) {
        let id = self.resolve(id);
        let Some(children) = self.live.children_mut() else {
            return;
        };
        if question::remove_child(children, &id).is_some() {
            self.deletions.mark_deleted(&id);
            self.after_edit(now);
        }
    }

    /// Applies the order produced by drag-and-drop.
    pub fn reorder(&mut self, now: Instant, order: &[ChildId]) {
        let order: Vec<ChildId> = order.iter().map(|id| self.resolve(id)).collect();
        let Some(children) = self.live.children_mut() else {
            return;
        };
        question::reorder(children, &order);
        self.after_edit(now);
    }

    pub fn mark_deleted(&mut self, id: &ChildId) {
        let id = self.resolve(id);
        self.deletions.mark_deleted(&id);
    }

    /// Maps an already reconciled temp id to its server id.
    fn resolve(&self, id: &ChildId) -> ChildId {
        id.as_temporary()
            .and_then(|temp| self.reconciled.get(&temp))
            .map(|real| ChildId::Persisted(real.clone()))
            .unwrap_or_else(|| id.clone())
    }

    fn after_edit(&mut self, now: Instant) {
        if self.in_flight.is_some() {
            // Re-evaluated once the outstanding save resolves.
            return;
        }
        if self.is_dirty() {
            trace!("{}: edit armed the save timer", self.parent_id);
            self.debounce.arm(now);
        } else {
            self.debounce.cancel();
        }
    }

    /// Returns the request to send if the quiescence timer has elapsed.
    pub fn poll_save(&mut self, now: Instant) -> Option<SaveRequest> {
        if self.in_flight.is_some() || !self.debounce.fire(now) {
            return None;
        }
        self.dispatch()
    }

    /// Dispatches now if there is anything to save, skipping the rest of the
    /// quiescence interval.
    pub fn flush(&mut self) -> Option<SaveRequest> {
        if self.in_flight.is_some() {
            return None;
        }
        self.debounce.cancel();
        self.dispatch()
    }

    fn dispatch(&mut self) -> Option<SaveRequest> {
        if !self.is_dirty() {
            trace!("{}: nothing changed since the last save", self.parent_id);
            return None;
        }

        let deleted = self.deletions.drain();
        let request = self.live.to_payload(&self.parent_id, &deleted);
        debug!(
            "{}: saving {} rows, {} deletions, {} points",
            self.parent_id,
            request.children.len(),
            request.deleted_ids.len(),
            request.scalar.points
        );
        self.in_flight = Some(InFlight {
            form: self.live.clone(),
            deleted,
        });
        Some(request)
    }

    /// Merges the outcome of the outstanding save.
    pub fn complete(&mut self, now: Instant, result: Result<SaveResponse, SaveError>) {
        let Some(submitted) = self.in_flight.take() else {
            warn!("{}: save result without a save in flight", self.parent_id);
            return;
        };

        let result = result.and_then(|response| {
            if response.success {
                Ok(response)
            } else {
                Err(SaveError::Transport("Server did not confirm the save".into()))
            }
        });

        match result {
            Ok(response) => self.reconcile(submitted, response),
            Err(error) => {
                let info = ErrorInfo::from(&error);
                warn!("{}: save failed: {}", self.parent_id, info);
                self.last_error = Some(info);
                // The failed value itself is not retried until the next edit.
                // Edits made while it was in flight get their own window.
                if self.live != submitted.form {
                    debug!("{}: edited while the failed save was in flight", self.parent_id);
                    self.debounce.arm(now);
                }
                return;
            }
        }

        if self.is_dirty() {
            debug!("{}: edited while saving, starting a new window", self.parent_id);
            self.debounce.arm(now);
        }
    }

    fn reconcile(&mut self, submitted: InFlight<F>, response: SaveResponse) {
        let InFlight { mut form, deleted } = submitted;

        for mapping in &response.inserted_choices {
            self.reconciled.insert(mapping.temp_id, mapping.real_id.clone());
        }

        if let Some(children) = self.live.children_mut() {
            let live: HashSet<TempId> = children
                .iter()
                .filter_map(|child| child.id().as_temporary())
                .collect();
            question::substitute_ids(children, &self.reconciled);

            // Rows removed while their insert was in flight now exist on the
            // server under their real id.
            for mapping in &response.inserted_choices {
                if !live.contains(&mapping.temp_id) {
                    debug!(
                        "{}: {} was removed before it was saved, deleting {}",
                        self.parent_id, mapping.temp_id, mapping.real_id
                    );
                    self.deletions
                        .mark_deleted(&ChildId::Persisted(mapping.real_id.clone()));
                }
            }
        }
        // The snapshot is what the server now holds: the submitted value with
        // the same substitution applied to it.
        if let Some(children) = form.children_mut() {
            question::substitute_ids(children, &self.reconciled);
        }

        self.snapshot.replace(form);
        self.deletions.confirm(&deleted);
        self.last_error = None;

        info!(
            "{}: saved, {} rows inserted, {} deleted",
            self.parent_id,
            response.inserted_choices.len(),
            deleted.len()
        );
    }
}
