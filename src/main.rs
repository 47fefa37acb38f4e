use std::{error::Error, time::Duration};

use quizautosave::{
    database::{Connection, CreateQuestion, DeleteQuestion, FetchQuestion},
    question::{Choice, QuestionType},
    transport::MemoryServer,
    AutosaveConfig, QuestionEditor, SaveTransport, Settings,
};
use tokio::time::timeout;
use tracing::{info, instrument, level_filters::LevelFilter, warn};
use tracing_subscriber::fmt::format::FmtSpan;

type MainResult = Result<(), Box<dyn Error + Send + Sync + 'static>>;

#[tokio::main]
async fn main() -> MainResult {
    let settings = Settings::from_env()?;

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from_level(settings.log_level))
        .json()
        .with_span_events(FmtSpan::CLOSE)
        .log_internal_errors(true)
        .with_line_number(true)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;

    match &settings.database_url {
        Some(url) => {
            info!("Connecting to {}", settings.database_host().unwrap_or_default());
            let connection = Connection::connect(url.as_str()).await?;
            connection.run_migrations().await?;
            edit_session(connection, &settings.autosave).await
        }
        None => {
            warn!("DATABASE_URL is not set, saving to memory");
            edit_session(MemoryServer::new(), &settings.autosave).await
        }
    }
}

/// Edits a multiple-choice question the way a user would: add rows, type
/// into one of them, drop another, then close the editor.
#[instrument(level = "info", skip_all)]
async fn edit_session<Store>(store: Store, config: &AutosaveConfig) -> MainResult
where
    Store: SaveTransport + Clone + CreateQuestion + FetchQuestion + DeleteQuestion,
{
    let id = store
        .create_question(QuestionType::MultipleChoice, "Which of these are prime?")
        .await?;
    let record = store
        .fetch_question(&id)
        .await?
        .ok_or("question vanished after creation")?;

    let QuestionEditor::MultipleChoice(editor) = QuestionEditor::open(&record, store.clone(), config)? else {
        return Err("expected a multiple choice editor".into());
    };

    for (text, is_correct) in [("2", true), ("4", false), ("9", false)] {
        editor.add_child(Choice::new(editor.allocate(), text, is_correct, i32::from(is_correct)))?;
    }
    editor.flush()?;
    let mut form = editor.subscribe_form();
    let reconciled = form.wait_for(|form| form.choices.iter().all(|choice| !choice.id.is_temporary()));
    if timeout(Duration::from_secs(10), reconciled).await.is_err() {
        warn!("First save did not reconcile: {}", editor.status());
    }
    info!("First save: {}", editor.status());

    let form = editor.form();
    let added = editor.allocate();
    editor.add_child(Choice::new(added.clone(), "", true, 1))?;
    for draft in ["1", "11", "13"] {
        let added = added.clone();
        editor.edit(move |form| {
            if let Some(choice) = form.choices.iter_mut().find(|choice| choice.id == added) {
                choice.text = draft.to_owned();
            }
        })?;
    }
    if let Some(four) = form.choices.iter().find(|choice| choice.text == "4") {
        editor.remove_child(four.id.clone())?;
    }

    let state = editor.close().await?;
    info!("Editor closed: {state}");

    if let Some(saved) = store.fetch_question(&id).await? {
        info!("Stored question: {}", serde_json::to_string(&saved)?);
    }

    if store.delete_question(&id).await? {
        info!("Question {id} deleted");
    }

    Ok(())
}
