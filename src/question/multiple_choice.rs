use serde::{Deserialize, Serialize};

use super::{expect_type, sum_points, unexpected_child, AutosaveForm, ChildRecord, QuestionType};
use crate::{
    error::RecordError,
    identifier::ChildId,
    payload::{ChildPayload, QuestionRecord, ScalarFields},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Choice {
    pub id: ChildId,
    pub position: u32,
    pub text: String,
    pub is_correct: bool,
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl Choice {
    pub fn new(id: impl Into<ChildId>, text: impl Into<String>, is_correct: bool, points: i32) -> Self {
        Self {
            id: id.into(),
            position: 0,
            text: text.into(),
            is_correct,
            points,
            image: None,
        }
    }
}

impl ChildRecord for Choice {
    fn id(&self) -> &ChildId {
        &self.id
    }

    fn set_id(&mut self, id: ChildId) {
        self.id = id;
    }

    fn position(&self) -> u32 {
        self.position
    }

    fn set_position(&mut self, position: u32) {
        self.position = position;
    }

    fn points(&self) -> i32 {
        self.points
    }

    fn to_payload(&self) -> ChildPayload {
        ChildPayload::Choice(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MultipleChoiceForm {
    pub prompt: String,
    pub required: bool,
    pub image: Option<String>,
    pub choices: Vec<Choice>,
}

impl MultipleChoiceForm {
    pub fn correct_choices(&self) -> impl Iterator<Item = &Choice> {
        self.choices.iter().filter(|choice| choice.is_correct)
    }
}

impl AutosaveForm for MultipleChoiceForm {
    type Child = Choice;

    const QUESTION_TYPE: QuestionType = QuestionType::MultipleChoice;

    fn children(&self) -> &[Choice] {
        &self.choices
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Choice>> {
        Some(&mut self.choices)
    }

    fn compute_points(&self) -> i32 {
        sum_points(&self.choices)
    }

    fn scalar_fields(&self) -> ScalarFields {
        ScalarFields {
            prompt: self.prompt.clone(),
            points: self.compute_points(),
            required: self.required,
            image: self.image.clone(),
            correct_answer: None,
            guidelines: None,
        }
    }

    fn from_record(record: &QuestionRecord) -> Result<Self, RecordError> {
        expect_type(record, Self::QUESTION_TYPE)?;
        let mut choices = record
            .children
            .iter()
            .map(|child| match child {
                ChildPayload::Choice(choice) => Ok(choice.clone()),
                other => Err(unexpected_child(Self::QUESTION_TYPE, other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        choices.sort_by_key(|choice| choice.position);

        Ok(Self {
            prompt: record.scalar.prompt.clone(),
            required: record.scalar.required,
            image: record.scalar.image.clone(),
            choices,
        })
    }
}
