use std::convert::Infallible;

use super::{expect_type, AutosaveForm, QuestionType};
use crate::{
    error::RecordError,
    payload::{QuestionRecord, ScalarFields},
};

/// Free-text question, graded by hand against `guidelines`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EssayForm {
    pub prompt: String,
    pub required: bool,
    pub image: Option<String>,
    pub guidelines: String,
    pub points: i32,
}

impl AutosaveForm for EssayForm {
    type Child = Infallible;

    const QUESTION_TYPE: QuestionType = QuestionType::Essay;

    fn children(&self) -> &[Infallible] {
        &[]
    }

    fn children_mut(&mut self) -> Option<&mut Vec<Infallible>> {
        None
    }

    fn compute_points(&self) -> i32 {
        self.points
    }

    fn scalar_fields(&self) -> ScalarFields {
        ScalarFields {
            prompt: self.prompt.clone(),
            points: self.points,
            required: self.required,
            image: self.image.clone(),
            correct_answer: None,
            guidelines: Some(self.guidelines.clone()),
        }
    }

    fn from_record(record: &QuestionRecord) -> Result<Self, RecordError> {
        expect_type(record, Self::QUESTION_TYPE)?;
        Ok(Self {
            prompt: record.scalar.prompt.clone(),
            required: record.scalar.required,
            image: record.scalar.image.clone(),
            guidelines: record.scalar.guidelines.clone().unwrap_or_default(),
            points: record.scalar.points,
        })
    }
}
