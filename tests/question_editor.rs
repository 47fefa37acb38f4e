use std::time::Duration;

use quizautosave::{
    database::{CreateQuestion, DeleteQuestion, FetchQuestion},
    error::RecordError,
    payload::ChildPayload,
    question::{MatchingPair, OrderingItem, QuestionType},
    transport::MemoryServer,
    AutosaveConfig, ChildId, QuestionEditor, SaveState,
};
use tokio::time::sleep;

async fn open(server: &MemoryServer, question_type: QuestionType) -> QuestionEditor {
    let id = server.create_question(question_type, "Prompt").await.unwrap();
    let record = server.fetch_question(&id).await.unwrap().unwrap();
    QuestionEditor::open(&record, server.clone(), &AutosaveConfig::default()).unwrap()
}

#[tokio::test(start_paused = true)]
async fn every_type_opens_its_own_editor() {
    let server = MemoryServer::new();
    for question_type in [
        QuestionType::MultipleChoice,
        QuestionType::TrueFalse,
        QuestionType::Essay,
        QuestionType::Ordering,
        QuestionType::Matching,
    ] {
        let editor = open(&server, question_type).await;
        assert_eq!(editor.question_type(), question_type);
        assert_eq!(editor.status(), SaveState::Synced);
        assert_eq!(editor.close().await.unwrap(), SaveState::Synced);
    }
    assert_eq!(server.request_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn true_false_saves_its_answer_and_points() {
    let server = MemoryServer::new();
    let QuestionEditor::TrueFalse(editor) = open(&server, QuestionType::TrueFalse).await else {
        panic!("expected a true/false editor");
    };

    editor
        .edit(|form| {
            form.correct_answer = false;
            form.points = 4;
        })
        .unwrap();
    sleep(Duration::from_secs(2)).await;

    let stored = server.fetch(editor.parent_id()).await.unwrap();
    assert_eq!(stored.scalar.correct_answer, Some(false));
    assert_eq!(stored.scalar.points, 4);
    assert!(stored.children.is_empty());
}

#[tokio::test(start_paused = true)]
async fn essay_guidelines_are_saved() {
    let server = MemoryServer::new();
    let QuestionEditor::Essay(editor) = open(&server, QuestionType::Essay).await else {
        panic!("expected an essay editor");
    };

    editor.edit(|form| form.guidelines = "At least 200 words".into()).unwrap();
    editor.flush().unwrap();
    sleep(Duration::from_millis(10)).await;

    assert!(editor.status().is_synced());
    let stored = server.fetch(editor.parent_id()).await.unwrap();
    assert_eq!(stored.scalar.guidelines.as_deref(), Some("At least 200 words"));
}

#[tokio::test(start_paused = true)]
async fn ordering_items_follow_drag_and_drop() {
    let server = MemoryServer::new();
    let QuestionEditor::Ordering(editor) = open(&server, QuestionType::Ordering).await else {
        panic!("expected an ordering editor");
    };

    let first = editor.allocate();
    let second = editor.allocate();
    editor.add_child(OrderingItem::new(first.clone(), "Boil water", 1)).unwrap();
    editor.add_child(OrderingItem::new(second.clone(), "Add tea", 1)).unwrap();
    sleep(Duration::from_secs(2)).await;

    // The UI may still hold the temporary ids.
    editor.reorder(vec![second, first]).unwrap();
    sleep(Duration::from_secs(2)).await;

    assert_eq!(server.request_count().await, 2);
    let stored = server.fetch(editor.parent_id()).await.unwrap();
    let texts: Vec<_> = stored
        .children
        .iter()
        .map(|child| match child {
            ChildPayload::OrderingItem(item) => item.text.as_str(),
            other => panic!("unexpected row {other:?}"),
        })
        .collect();
    assert_eq!(texts, vec!["Add tea", "Boil water"]);
    assert_eq!(stored.scalar.points, 2);
}

#[tokio::test(start_paused = true)]
async fn matching_pairs_are_reconciled() {
    let server = MemoryServer::new();
    let QuestionEditor::Matching(editor) = open(&server, QuestionType::Matching).await else {
        panic!("expected a matching editor");
    };

    let id = editor.parent_id().clone();
    let pair = editor.allocate();
    editor
        .add_child(MatchingPair::new(pair.clone(), "H2O", "Water", 2))
        .unwrap();
    let state = editor.close().await.unwrap();
    assert_eq!(state, SaveState::Synced);

    let stored = server.fetch(&id).await.unwrap();
    let ChildPayload::MatchingPair(saved) = &stored.children[0] else {
        panic!("expected a matching pair");
    };
    assert!(matches!(saved.id, ChildId::Persisted(_)));
    assert_eq!(saved.right_text, "Water");
}

#[tokio::test]
async fn records_of_another_type_are_refused() {
    let server = MemoryServer::new();
    let id = server.create_question(QuestionType::Essay, "Explain").await.unwrap();
    let mut record = server.fetch_question(&id).await.unwrap().unwrap();
    record.question_type = QuestionType::Ordering;
    record
        .children
        .push(ChildPayload::MatchingPair(MatchingPair::new(ChildId::persisted("9"), "a", "b", 1)));

    let result = QuestionEditor::open(&record, server.clone(), &AutosaveConfig::default());
    assert!(matches!(result, Err(RecordError::UnexpectedChild { .. })));

    assert!(server.delete_question(&id).await.unwrap());
    assert!(server.fetch_question(&id).await.unwrap().is_none());
}
