use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    error::SaveError,
    identifier::{ChildId, QuestionId},
    payload::{ChildPayload, QuestionRecord, ScalarFields},
    question::{Choice, MatchingPair, OrderingItem, QuestionType},
};

#[derive(Debug, Clone, FromRow)]
pub(crate) struct QuestionRow {
    pub(crate) uuid: Uuid,
    pub(crate) question_type: String,
    pub(crate) prompt: String,
    pub(crate) points: i32,
    pub(crate) required: bool,
    pub(crate) image: Option<String>,
    pub(crate) correct_answer: Option<bool>,
    pub(crate) guidelines: Option<String>,
}

#[derive(Debug, Clone, FromRow)]
pub(crate) struct ChildRow {
    pub(crate) uuid: Uuid,
    pub(crate) kind: String,
    pub(crate) position: i32,
    pub(crate) text: String,
    pub(crate) match_text: Option<String>,
    pub(crate) is_correct: bool,
    pub(crate) points: i32,
    pub(crate) image: Option<String>,
    pub(crate) match_image: Option<String>,
}

/// Column values of one `question_children` row, minus its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ChildColumns<'a> {
    pub(crate) kind: &'static str,
    pub(crate) position: i32,
    pub(crate) text: &'a str,
    pub(crate) match_text: Option<&'a str>,
    pub(crate) is_correct: bool,
    pub(crate) points: i32,
    pub(crate) image: Option<&'a str>,
    pub(crate) match_image: Option<&'a str>,
}

impl<'a> From<&'a ChildPayload> for ChildColumns<'a> {
    fn from(child: &'a ChildPayload) -> Self {
        let kind = child.kind();
        match child {
            ChildPayload::Choice(choice) => ChildColumns {
                kind,
                position: choice.position as i32,
                text: &choice.text,
                match_text: None,
                is_correct: choice.is_correct,
                points: choice.points,
                image: choice.image.as_deref(),
                match_image: None,
            },
            ChildPayload::OrderingItem(item) => ChildColumns {
                kind,
                position: item.position as i32,
                text: &item.text,
                match_text: None,
                is_correct: false,
                points: item.points,
                image: item.image.as_deref(),
                match_image: None,
            },
            ChildPayload::MatchingPair(pair) => ChildColumns {
                kind,
                position: pair.position as i32,
                text: &pair.left_text,
                match_text: Some(&pair.right_text),
                is_correct: false,
                points: pair.points,
                image: pair.left_image.as_deref(),
                match_image: pair.right_image.as_deref(),
            },
        }
    }
}

impl TryFrom<ChildRow> for ChildPayload {
    type Error = SaveError;

    fn try_from(row: ChildRow) -> Result<Self, Self::Error> {
        let id = ChildId::Persisted(row.uuid.to_string());
        let position = row.position.max(0) as u32;
        let child = match row.kind.as_str() {
            "choice" => ChildPayload::Choice(Choice {
                id,
                position,
                text: row.text,
                is_correct: row.is_correct,
                points: row.points,
                image: row.image,
            }),
            "ordering_item" => ChildPayload::OrderingItem(OrderingItem {
                id,
                position,
                text: row.text,
                points: row.points,
                image: row.image,
            }),
            "matching_pair" => ChildPayload::MatchingPair(MatchingPair {
                id,
                position,
                left_text: row.text,
                right_text: row.match_text.unwrap_or_default(),
                points: row.points,
                left_image: row.image,
                right_image: row.match_image,
            }),
            other => {
                return Err(SaveError::Transport(format!(
                    "row {} has unknown kind '{other}'",
                    row.uuid
                )))
            }
        };
        Ok(child)
    }
}

impl QuestionRow {
    pub(crate) fn into_record(self, children: Vec<ChildRow>) -> Result<QuestionRecord, SaveError> {
        let question_type = QuestionType::parse(&self.question_type).ok_or_else(|| {
            SaveError::Transport(format!(
                "question {} has unknown type '{}'",
                self.uuid, self.question_type
            ))
        })?;
        let children = children
            .into_iter()
            .map(ChildPayload::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(QuestionRecord {
            id: QuestionId::new(self.uuid.to_string()),
            question_type,
            scalar: ScalarFields {
                prompt: self.prompt,
                points: self.points,
                required: self.required,
                image: self.image,
                correct_answer: self.correct_answer,
                guidelines: self.guidelines,
            },
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair_row(uuid: Uuid) -> ChildRow {
        ChildRow {
            uuid,
            kind: "matching_pair".into(),
            position: 2,
            text: "H2O".into(),
            match_text: Some("Water".into()),
            is_correct: false,
            points: 1,
            image: None,
            match_image: Some("data:image/png;base64,AAAA".into()),
        }
    }

    #[test]
    fn matching_rows_map_both_sides() {
        let uuid = Uuid::new_v4();
        let payload = ChildPayload::try_from(pair_row(uuid)).unwrap();

        let ChildPayload::MatchingPair(pair) = &payload else {
            panic!("expected a matching pair");
        };
        assert_eq!(pair.id, ChildId::Persisted(uuid.to_string()));
        assert_eq!(pair.right_text, "Water");
        assert_eq!(pair.position, 2);

        let columns = ChildColumns::from(&payload);
        assert_eq!(columns.kind, "matching_pair");
        assert_eq!(columns.text, "H2O");
        assert_eq!(columns.match_text, Some("Water"));
        assert_eq!(columns.match_image, Some("data:image/png;base64,AAAA"));
    }

    #[test]
    fn unknown_kinds_are_errors() {
        let mut row = pair_row(Uuid::new_v4());
        row.kind = "hotspot".into();
        assert!(matches!(ChildPayload::try_from(row), Err(SaveError::Transport(_))));
    }

    #[test]
    fn question_rows_become_records() {
        let uuid = Uuid::new_v4();
        let row = QuestionRow {
            uuid,
            question_type: "matching".into(),
            prompt: "Match the formulas".into(),
            points: 1,
            required: true,
            image: None,
            correct_answer: None,
            guidelines: None,
        };
        let record = row.into_record(vec![pair_row(Uuid::new_v4())]).unwrap();
        assert_eq!(record.id.as_str(), uuid.to_string());
        assert_eq!(record.question_type, QuestionType::Matching);
        assert_eq!(record.children.len(), 1);
    }
}
