use tracing::info;

use crate::{
    config::AutosaveConfig,
    error::{RecordError, SessionError},
    identifier::QuestionId,
    payload::QuestionRecord,
    question::{
        AutosaveForm, EssayForm, MatchingForm, MultipleChoiceForm, OrderingForm, QuestionType,
        TrueFalseForm,
    },
    session::{self, AutosaveHandle},
    status::SaveState,
    transport::SaveTransport,
};

/// An open editor, one variant per question type.
#[derive(Clone)]
pub enum QuestionEditor {
    MultipleChoice(AutosaveHandle<MultipleChoiceForm>),
    TrueFalse(AutosaveHandle<TrueFalseForm>),
    Essay(AutosaveHandle<EssayForm>),
    Ordering(AutosaveHandle<OrderingForm>),
    Matching(AutosaveHandle<MatchingForm>),
}

macro_rules! each_editor {
    ($editor:expr, $handle:ident => $body:expr) => {
        match $editor {
            QuestionEditor::MultipleChoice($handle) => $body,
            QuestionEditor::TrueFalse($handle) => $body,
            QuestionEditor::Essay($handle) => $body,
            QuestionEditor::Ordering($handle) => $body,
            QuestionEditor::Matching($handle) => $body,
        }
    };
}

fn open_as<F: AutosaveForm, T: SaveTransport>(
    record: &QuestionRecord,
    transport: T,
    config: &AutosaveConfig,
) -> Result<AutosaveHandle<F>, RecordError> {
    let form = F::from_record(record)?;
    Ok(session::spawn(record.id.clone(), form, transport, config))
}

impl QuestionEditor {
    /// Starts an autosave session for a freshly fetched question.
    pub fn open<T: SaveTransport>(
        record: &QuestionRecord,
        transport: T,
        config: &AutosaveConfig,
    ) -> Result<Self, RecordError> {
        info!("Opening {} editor for question {}", record.question_type, record.id);
        let editor = match record.question_type {
            QuestionType::MultipleChoice => {
                QuestionEditor::MultipleChoice(open_as(record, transport, config)?)
            }
            QuestionType::TrueFalse => QuestionEditor::TrueFalse(open_as(record, transport, config)?),
            QuestionType::Essay => QuestionEditor::Essay(open_as(record, transport, config)?),
            QuestionType::Ordering => QuestionEditor::Ordering(open_as(record, transport, config)?),
            QuestionType::Matching => QuestionEditor::Matching(open_as(record, transport, config)?),
        };
        Ok(editor)
    }

    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionEditor::MultipleChoice(_) => QuestionType::MultipleChoice,
            QuestionEditor::TrueFalse(_) => QuestionType::TrueFalse,
            QuestionEditor::Essay(_) => QuestionType::Essay,
            QuestionEditor::Ordering(_) => QuestionType::Ordering,
            QuestionEditor::Matching(_) => QuestionType::Matching,
        }
    }

    pub fn parent_id(&self) -> &QuestionId {
        each_editor!(self, handle => handle.parent_id())
    }

    pub fn status(&self) -> SaveState {
        each_editor!(self, handle => handle.status())
    }

    pub fn flush(&self) -> Result<(), SessionError> {
        each_editor!(self, handle => handle.flush())
    }

    pub async fn close(self) -> Result<SaveState, SessionError> {
        each_editor!(self, handle => handle.close().await)
    }
}
