use serde::{Deserialize, Serialize};

use super::{expect_type, sum_points, unexpected_child, AutosaveForm, ChildRecord, QuestionType};
use crate::{
    error::RecordError,
    identifier::ChildId,
    payload::{ChildPayload, QuestionRecord, ScalarFields},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchingPair {
    pub id: ChildId,
    pub position: u32,
    pub left_text: String,
    pub right_text: String,
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub left_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub right_image: Option<String>,
}

impl MatchingPair {
    pub fn new(
        id: impl Into<ChildId>,
        left_text: impl Into<String>,
        right_text: impl Into<String>,
        points: i32,
    ) -> Self {
        Self {
            id: id.into(),
            position: 0,
            left_text: left_text.into(),
            right_text: right_text.into(),
            points,
            left_image: None,
            right_image: None,
        }
    }
}

impl ChildRecord for MatchingPair {
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
        ChildPayload::MatchingPair(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MatchingForm {
    pub prompt: String,
    pub required: bool,
    pub image: Option<String>,
    pub pairs: Vec<MatchingPair>,
}

impl AutosaveForm for MatchingForm {
    type Child = MatchingPair;

    const QUESTION_TYPE: QuestionType = QuestionType::Matching;

    fn children(&self) -> &[MatchingPair] {
        &self.pairs
    }

    fn children_mut(&mut self) -> Option<&mut Vec<MatchingPair>> {
        Some(&mut self.pairs)
    }

    fn compute_points(&self) -> i32 {
        sum_points(&self.pairs)
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
        let mut pairs = record
            .children
            .iter()
            .map(|child| match child {
                ChildPayload::MatchingPair(pair) => Ok(pair.clone()),
                other => Err(unexpected_child(Self::QUESTION_TYPE, other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        pairs.sort_by_key(|pair| pair.position);

        Ok(Self {
            prompt: record.scalar.prompt.clone(),
            required: record.scalar.required,
            image: record.scalar.image.clone(),
            pairs,
        })
    }
}
