//! Shapes exchanged with the save endpoint.

use serde::{Deserialize, Serialize};

use crate::{
    identifier::{ChildId, QuestionId, TempId},
    question::{
        matching::MatchingPair, multiple_choice::Choice, ordering::OrderingItem, QuestionType,
    },
};

/// Fields stored on the question row itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScalarFields {
    pub prompt: String,
    /// Derived for collection types, recomputed before every save.
    pub points: i32,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guidelines: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChildPayload {
    Choice(Choice),
    OrderingItem(OrderingItem),
    MatchingPair(MatchingPair),
}

impl ChildPayload {
    pub fn id(&self) -> &ChildId {
        match self {
            ChildPayload::Choice(choice) => &choice.id,
            ChildPayload::OrderingItem(item) => &item.id,
            ChildPayload::MatchingPair(pair) => &pair.id,
        }
    }

    pub fn set_id(&mut self, id: ChildId) {
        match self {
            ChildPayload::Choice(choice) => choice.id = id,
            ChildPayload::OrderingItem(item) => item.id = id,
            ChildPayload::MatchingPair(pair) => pair.id = id,
        }
    }

    pub fn position(&self) -> u32 {
        match self {
            ChildPayload::Choice(choice) => choice.position,
            ChildPayload::OrderingItem(item) => item.position,
            ChildPayload::MatchingPair(pair) => pair.position,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChildPayload::Choice(_) => "choice",
            ChildPayload::OrderingItem(_) => "ordering_item",
            ChildPayload::MatchingPair(_) => "matching_pair",
        }
    }
}

/// One autosave request: the whole child collection plus pending deletions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    pub parent_id: QuestionId,
    pub question_type: QuestionType,
    pub scalar: ScalarFields,
    /// Upserted by id; temporary ids mean "insert and assign".
    pub children: Vec<ChildPayload>,
    pub deleted_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdMapping {
    pub temp_id: TempId,
    pub real_id: String,
}

impl IdMapping {
    pub fn new(temp_id: TempId, real_id: impl Into<String>) -> Self {
        Self {
            temp_id,
            real_id: real_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResponse {
    pub success: bool,
    /// One entry per child submitted with a temporary id.
    #[serde(default)]
    pub inserted_choices: Vec<IdMapping>,
}

impl SaveResponse {
    pub fn ok(inserted_choices: Vec<IdMapping>) -> Self {
        Self {
            success: true,
            inserted_choices,
        }
    }
}

/// A question as fetched when an editor opens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
    pub id: QuestionId,
    pub question_type: QuestionType,
    #[serde(flatten)]
    pub scalar: ScalarFields,
    #[serde(default)]
    pub children: Vec<ChildPayload>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::TempIdAllocator;

    #[test]
    fn request_serializes_with_wire_names() {
        let temp = TempIdAllocator::new().allocate();
        let request = SaveRequest {
            parent_id: QuestionId::new("q1"),
            question_type: QuestionType::MultipleChoice,
            scalar: ScalarFields {
                prompt: "Pick one".into(),
                points: 3,
                required: true,
                image: None,
                correct_answer: None,
                guidelines: None,
            },
            children: vec![ChildPayload::Choice(Choice::new(temp.clone(), "A", true, 3))],
            deleted_ids: vec!["7".into()],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["parentId"], "q1");
        assert_eq!(json["questionType"], "multiple_choice");
        assert_eq!(json["deletedIds"][0], "7");
        assert_eq!(json["children"][0]["kind"], "choice");
        assert_eq!(json["children"][0]["id"], temp.to_string());
        assert!(json["scalar"].get("image").is_none());
    }

    #[test]
    fn response_reads_inserted_choices() {
        let json = r#"{"success":true,"insertedChoices":[{"tempId":"temp_ab12","realId":"42"}]}"#;
        let response: SaveResponse = serde_json::from_str(json).unwrap();
        assert!(response.success);
        assert_eq!(response.inserted_choices[0].real_id, "42");
        assert_eq!(response.inserted_choices[0].temp_id.to_string(), "temp_ab12");
    }
}
