use serde::{Deserialize, Serialize};

use super::{expect_type, sum_points, unexpected_child, AutosaveForm, ChildRecord, QuestionType};
use crate::{
    error::RecordError,
    identifier::ChildId,
    payload::{ChildPayload, QuestionRecord, ScalarFields},
};

/// An item whose `position` is also the correct answer order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderingItem {
    pub id: ChildId,
    pub position: u32,
    pub text: String,
    pub points: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

impl OrderingItem {
    pub fn new(id: impl Into<ChildId>, text: impl Into<String>, points: i32) -> Self {
        Self {
            id: id.into(),
            position: 0,
            text: text.into(),
            points,
            image: None,
        }
    }
}

impl ChildRecord for OrderingItem {
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
        ChildPayload::OrderingItem(self.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderingForm {
    pub prompt: String,
    pub required: bool,
    pub image: Option<String>,
    pub items: Vec<OrderingItem>,
}

impl AutosaveForm for OrderingForm {
    type Child = OrderingItem;

    const QUESTION_TYPE: QuestionType = QuestionType::Ordering;

    fn children(&self) -> &[OrderingItem] {
        &self.items
    }

    fn children_mut(&mut self) -> Option<&mut Vec<OrderingItem>> {
        Some(&mut self.items)
    }

    fn compute_points(&self) -> i32 {
        sum_points(&self.items)
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
        let mut items = record
            .children
            .iter()
            .map(|child| match child {
                ChildPayload::OrderingItem(item) => Ok(item.clone()),
                other => Err(unexpected_child(Self::QUESTION_TYPE, other)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        items.sort_by_key(|item| item.position);

        Ok(Self {
            prompt: record.scalar.prompt.clone(),
            required: record.scalar.required,
            image: record.scalar.image.clone(),
            items,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identifier::QuestionId, question::Choice};

    #[test]
    fn choice_rows_are_rejected() {
        let record = QuestionRecord {
            id: QuestionId::new("q2"),
            question_type: QuestionType::Ordering,
            scalar: ScalarFields {
                prompt: "Sort the planets".into(),
                points: 0,
                required: false,
                image: None,
                correct_answer: None,
                guidelines: None,
            },
            children: vec![ChildPayload::Choice(Choice::new(ChildId::persisted("1"), "x", false, 0))],
        };

        let error = OrderingForm::from_record(&record).unwrap_err();
        assert_eq!(
            error.to_string(),
            "ordering questions cannot hold a choice row (1)"
        );
    }

    #[test]
    fn points_sum_over_items() {
        let form = OrderingForm {
            items: vec![
                OrderingItem::new(ChildId::persisted("1"), "Mercury", 1),
                OrderingItem::new(ChildId::persisted("2"), "Venus", 2),
            ],
            ..Default::default()
        };
        assert_eq!(form.scalar_fields().points, 3);
    }
}
