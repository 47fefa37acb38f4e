use std::convert::Infallible;

use super::{expect_type, AutosaveForm, QuestionType};
use crate::{
    error::RecordError,
    payload::{QuestionRecord, ScalarFields},
};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TrueFalseForm {
    pub prompt: String,
    pub required: bool,
    pub image: Option<String>,
    pub correct_answer: bool,
    pub points: i32,
}

impl AutosaveForm for TrueFalseForm {
    type Child = Infallible;

    const QUESTION_TYPE: QuestionType = QuestionType::TrueFalse;

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
            correct_answer: Some(self.correct_answer),
            guidelines: None,
        }
    }

    fn from_record(record: &QuestionRecord) -> Result<Self, RecordError> {
        expect_type(record, Self::QUESTION_TYPE)?;
        Ok(Self {
            prompt: record.scalar.prompt.clone(),
            required: record.scalar.required,
            image: record.scalar.image.clone(),
            correct_answer: record.scalar.correct_answer.unwrap_or(true),
            points: record.scalar.points,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::identifier::QuestionId;

    #[test]
    fn payload_has_no_children() {
        let form = TrueFalseForm {
            prompt: "The sky is green".into(),
            correct_answer: false,
            points: 2,
            ..Default::default()
        };
        assert!(!form.has_child_collection());

        let request = form.to_payload(&QuestionId::new("q3"), &BTreeSet::new());
        assert!(request.children.is_empty());
        assert!(request.deleted_ids.is_empty());
        assert_eq!(request.scalar.correct_answer, Some(false));
        assert_eq!(request.scalar.points, 2);
    }
}
