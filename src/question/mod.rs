//! Question types the autosave engine can drive.
//!
//! Every type is described by two small capability traits instead of a shared
//! base: [`AutosaveForm`] for the editable question and [`ChildRecord`] for its
//! rows. Scalar types (true/false, essay) use [`Infallible`] as their row type,
//! so their collection is always empty.

use std::{
    collections::{BTreeSet, HashMap},
    convert::Infallible,
    fmt,
};

use serde::{Deserialize, Serialize};

use crate::{
    error::RecordError,
    identifier::{ChildId, QuestionId, TempId},
    payload::{ChildPayload, QuestionRecord, SaveRequest, ScalarFields},
};

pub mod essay;
pub mod matching;
pub mod multiple_choice;
pub mod ordering;
pub mod true_false;

pub use essay::EssayForm;
pub use matching::{MatchingForm, MatchingPair};
pub use multiple_choice::{Choice, MultipleChoiceForm};
pub use ordering::{OrderingForm, OrderingItem};
pub use true_false::TrueFalseForm;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    MultipleChoice,
    TrueFalse,
    Essay,
    Ordering,
    Matching,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::MultipleChoice => "multiple_choice",
            QuestionType::TrueFalse => "true_false",
            QuestionType::Essay => "essay",
            QuestionType::Ordering => "ordering",
            QuestionType::Matching => "matching",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "multiple_choice" => Some(QuestionType::MultipleChoice),
            "true_false" => Some(QuestionType::TrueFalse),
            "essay" => Some(QuestionType::Essay),
            "ordering" => Some(QuestionType::Ordering),
            "matching" => Some(QuestionType::Matching),
            _ => None,
        }
    }

    pub fn has_child_collection(&self) -> bool {
        matches!(
            self,
            QuestionType::MultipleChoice | QuestionType::Ordering | QuestionType::Matching
        )
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A row owned by a question.
pub trait ChildRecord: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    fn id(&self) -> &ChildId;
    fn set_id(&mut self, id: ChildId);
    fn position(&self) -> u32;
    fn set_position(&mut self, position: u32);
    fn points(&self) -> i32;
    fn to_payload(&self) -> ChildPayload;
}

impl ChildRecord for Infallible {
    fn id(&self) -> &ChildId {
        match *self {}
    }

    fn set_id(&mut self, _id: ChildId) {
        match *self {}
    }

    fn position(&self) -> u32 {
        match *self {}
    }

    fn set_position(&mut self, _position: u32) {
        match *self {}
    }

    fn points(&self) -> i32 {
        match *self {}
    }

    fn to_payload(&self) -> ChildPayload {
        match *self {}
    }
}

/// The editable state of one question, as held by its autosave session.
pub trait AutosaveForm: Clone + PartialEq + fmt::Debug + Send + Sync + 'static {
    type Child: ChildRecord;

    const QUESTION_TYPE: QuestionType;

    fn has_child_collection(&self) -> bool {
        Self::QUESTION_TYPE.has_child_collection()
    }

    fn children(&self) -> &[Self::Child];

    /// `None` for types without a collection.
    fn children_mut(&mut self) -> Option<&mut Vec<Self::Child>>;

    fn compute_points(&self) -> i32;

    /// Row fields, with `points` already recomputed.
    fn scalar_fields(&self) -> ScalarFields;

    fn from_record(record: &QuestionRecord) -> Result<Self, RecordError>;

    fn to_payload(&self, parent_id: &QuestionId, deleted: &BTreeSet<String>) -> SaveRequest {
        SaveRequest {
            parent_id: parent_id.clone(),
            question_type: Self::QUESTION_TYPE,
            scalar: self.scalar_fields(),
            children: self.children().iter().map(ChildRecord::to_payload).collect(),
            deleted_ids: deleted.iter().cloned().collect(),
        }
    }
}

pub(crate) fn expect_type(record: &QuestionRecord, expected: QuestionType) -> Result<(), RecordError> {
    if record.question_type == expected {
        Ok(())
    } else {
        Err(RecordError::WrongType {
            expected,
            found: record.question_type,
        })
    }
}

pub(crate) fn unexpected_child(expected: QuestionType, child: &ChildPayload) -> RecordError {
    RecordError::UnexpectedChild {
        question_type: expected,
        kind: child.kind(),
        id: child.id().to_string(),
    }
}

/// Sets ordering indexes to `0..n` in list order.
pub fn reindex<C: ChildRecord>(children: &mut [C]) {
    for (position, child) in children.iter_mut().enumerate() {
        child.set_position(position as u32);
    }
}

/// Point total of the rows, clamped to the `i32` range.
pub fn sum_points<C: ChildRecord>(children: &[C]) -> i32 {
    children
        .iter()
        .map(ChildRecord::points)
        .fold(0, i32::saturating_add)
}

/// Rewrites temporary ids that have a known server id. Touches nothing but
/// ids. Returns how many rows changed.
pub fn substitute_ids<C: ChildRecord>(children: &mut [C], mapping: &HashMap<TempId, String>) -> usize {
    let mut replaced = 0;
    for child in children.iter_mut() {
        let Some(temp) = child.id().as_temporary() else {
            continue;
        };
        if let Some(real) = mapping.get(&temp) {
            child.set_id(ChildId::Persisted(real.clone()));
            replaced += 1;
        }
    }
    replaced
}

/// Removes the row with `id` and closes the gap in ordering indexes.
pub fn remove_child<C: ChildRecord>(children: &mut Vec<C>, id: &ChildId) -> Option<C> {
    let index = children.iter().position(|child| child.id() == id)?;
    let removed = children.remove(index);
    reindex(children);
    Some(removed)
}

/// Applies a drag-reorder result. Unknown ids are ignored and rows missing
/// from `order` keep their relative order after the listed ones.
pub fn reorder<C: ChildRecord>(children: &mut Vec<C>, order: &[ChildId]) {
    let mut remaining = std::mem::take(children);
    for id in order {
        if let Some(index) = remaining.iter().position(|child| child.id() == id) {
            children.push(remaining.remove(index));
        }
    }
    children.append(&mut remaining);
    reindex(children);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identifier::TempIdAllocator;

    fn choices(ids: &[ChildId]) -> Vec<Choice> {
        let mut rows: Vec<Choice> = ids
            .iter()
            .map(|id| Choice::new(id.clone(), format!("choice {id}"), false, 1))
            .collect();
        reindex(&mut rows);
        rows
    }

    fn ids(rows: &[Choice]) -> Vec<ChildId> {
        rows.iter().map(|row| row.id.clone()).collect()
    }

    #[test]
    fn type_tags_round_trip() {
        for kind in [
            QuestionType::MultipleChoice,
            QuestionType::TrueFalse,
            QuestionType::Essay,
            QuestionType::Ordering,
            QuestionType::Matching,
        ] {
            assert_eq!(QuestionType::parse(kind.as_str()), Some(kind));
        }
        assert_eq!(QuestionType::parse("fill_in"), None);
    }

    #[test]
    fn substitution_only_touches_mapped_temporary_ids() {
        let allocator = TempIdAllocator::new();
        let mapped = allocator.allocate_temp();
        let unmapped = allocator.allocate();
        let mut rows = choices(&[ChildId::persisted("8"), mapped.into(), unmapped.clone()]);
        let before = rows.clone();

        let mapping = HashMap::from([(mapped, "42".to_owned())]);
        assert_eq!(substitute_ids(&mut rows, &mapping), 1);
        assert_eq!(
            ids(&rows),
            vec![ChildId::persisted("8"), ChildId::persisted("42"), unmapped]
        );
        assert_eq!(rows[1].text, before[1].text);

        let once = rows.clone();
        assert_eq!(substitute_ids(&mut rows, &mapping), 0);
        assert_eq!(rows, once);
    }

    #[test]
    fn removal_reindexes() {
        let mut rows = choices(&[
            ChildId::persisted("1"),
            ChildId::persisted("2"),
            ChildId::persisted("3"),
        ]);
        let removed = remove_child(&mut rows, &ChildId::persisted("2"));

        assert!(removed.is_some());
        assert_eq!(ids(&rows), vec![ChildId::persisted("1"), ChildId::persisted("3")]);
        assert_eq!(rows.iter().map(|r| r.position).collect::<Vec<_>>(), vec![0, 1]);
        assert!(remove_child(&mut rows, &ChildId::persisted("2")).is_none());
    }

    #[test]
    fn reorder_applies_new_order_and_keeps_leftovers() {
        let mut rows = choices(&[
            ChildId::persisted("1"),
            ChildId::persisted("2"),
            ChildId::persisted("3"),
        ]);
        reorder(
            &mut rows,
            &[ChildId::persisted("3"), ChildId::persisted("99"), ChildId::persisted("1")],
        );

        assert_eq!(
            ids(&rows),
            vec![ChildId::persisted("3"), ChildId::persisted("1"), ChildId::persisted("2")]
        );
        assert_eq!(rows.iter().map(|r| r.position).collect::<Vec<_>>(), vec![0, 1, 2]);
    }

    #[test]
    fn point_totals_clamp_instead_of_overflowing() {
        let mut rows = choices(&[ChildId::persisted("1"), ChildId::persisted("2")]);
        rows[1].points = i32::MAX;
        assert_eq!(sum_points(&rows), i32::MAX);

        rows[0].points = i32::MIN;
        rows[1].points = -1;
        assert_eq!(sum_points(&rows), i32::MIN);

        let form = MultipleChoiceForm { choices: rows, ..Default::default() };
        assert_eq!(form.compute_points(), i32::MIN);
    }
}
