//! Marks (annotations) attached to inline content and to nodes.
//!
//! Suggestion marks are a closed set of kinds, each with its own fixed
//! attribute record. Ordinary formatting marks (`strong`, `em`, `link`...)
//! are carried as [`FormatMark`] with a free attribute map.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Attrs, ModelError};

pub const INSERTION: &str = "insertion";
pub const DELETION: &str = "deletion";
pub const MODIFICATION: &str = "modification";
pub const STRUCTURE: &str = "structure";

/// Mark type names every suggestion-capable schema must register.
pub const SUGGESTION_MARKS: [&str; 4] = [INSERTION, DELETION, MODIFICATION, STRUCTURE];

/// Identifier shared by every annotation belonging to one suggestion.
///
/// Always emitted as a number. Strings holding a number are accepted on
/// input since some hosts store ids as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawSuggestionId", into = "u64")]
pub struct SuggestionId(pub u64);

impl SuggestionId {
    pub fn next(self) -> SuggestionId {
        SuggestionId(self.0 + 1)
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SuggestionId> for u64 {
    fn from(id: SuggestionId) -> Self {
        id.0
    }
}

impl std::str::FromStr for SuggestionId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<u64>()
            .map(SuggestionId)
            .map_err(|_| ModelError::Json(format!("suggestion id is not a number: {s:?}")))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSuggestionId {
    Number(u64),
    Text(String),
}

impl TryFrom<RawSuggestionId> for SuggestionId {
    type Error = ModelError;

    fn try_from(raw: RawSuggestionId) -> Result<Self, Self::Error> {
        match raw {
            RawSuggestionId::Number(n) => Ok(SuggestionId(n)),
            RawSuggestionId::Text(s) => s.parse(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertionAttrs {
    pub id: SuggestionId,
}

/// Marks a deletion mark that does not cover user content but a boundary
/// marker standing in for a block boundary the suggestion removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeletionKind {
    Boundary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeletionAttrs {
    pub id: SuggestionId,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<DeletionKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ChangeType {
    Attr,
    Mark,
}

/// A node-level change whose old and new states coexist in one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModificationAttrs {
    pub id: SuggestionId,
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    pub attr_name: String,
    #[serde(default)]
    pub previous_value: Value,
    #[serde(default)]
    pub new_value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StructureRole {
    From,
    GapFrom,
    GapTo,
    To,
}

impl StructureRole {
    /// Whether the boundary this role marks sits before its anchor node
    /// (as opposed to after it).
    pub fn anchors_before(self) -> bool {
        matches!(self, StructureRole::From | StructureRole::GapFrom)
    }
}

/// Boundary record of a structural suggestion.
///
/// `range` and `gap` are the positions of the original operation.
/// `gap_from_offset`/`gap_to_offset` are the wrapper token counts between
/// the outer and the gap boundaries after the operation, so a gap boundary
/// can be recomputed from an outer one. `insert` and `slice` are the
/// payload of the inverse operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureAttrs {
    pub id: SuggestionId,
    pub role: StructureRole,
    pub range: (usize, usize),
    pub gap: (usize, usize),
    pub gap_from_offset: usize,
    pub gap_to_offset: usize,
    pub insert: usize,
    #[serde(default)]
    pub slice: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FormatMark {
    pub name: String,
    pub attrs: Attrs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "MarkJson", into = "MarkJson")]
pub enum Mark {
    Insertion(InsertionAttrs),
    Deletion(DeletionAttrs),
    Modification(ModificationAttrs),
    Structure(StructureAttrs),
    Format(FormatMark),
}

impl Mark {
    pub fn insertion(id: SuggestionId) -> Mark {
        Mark::Insertion(InsertionAttrs { id })
    }

    pub fn deletion(id: SuggestionId) -> Mark {
        Mark::Deletion(DeletionAttrs {
            id,
            kind: None,
            data: None,
        })
    }

    pub fn format(name: &str) -> Mark {
        Mark::Format(FormatMark {
            name: name.to_string(),
            attrs: Attrs::new(),
        })
    }

    pub fn format_with_attrs(name: &str, attrs: Attrs) -> Mark {
        Mark::Format(FormatMark {
            name: name.to_string(),
            attrs,
        })
    }

    pub fn type_name(&self) -> &str {
        match self {
            Mark::Insertion(_) => INSERTION,
            Mark::Deletion(_) => DELETION,
            Mark::Modification(_) => MODIFICATION,
            Mark::Structure(_) => STRUCTURE,
            Mark::Format(f) => &f.name,
        }
    }

    pub fn suggestion_id(&self) -> Option<SuggestionId> {
        match self {
            Mark::Insertion(a) => Some(a.id),
            Mark::Deletion(a) => Some(a.id),
            Mark::Modification(a) => Some(a.id),
            Mark::Structure(a) => Some(a.id),
            Mark::Format(_) => None,
        }
    }

    pub fn is_suggestion(&self) -> bool {
        !matches!(self, Mark::Format(_))
    }

    fn rank(&self) -> (u8, &str) {
        match self {
            Mark::Insertion(_) => (0, ""),
            Mark::Deletion(_) => (1, ""),
            Mark::Modification(_) => (2, ""),
            Mark::Structure(_) => (3, ""),
            Mark::Format(f) => (4, f.name.as_str()),
        }
    }

    /// Whether adding `self` to a set containing `other` pushes `other` out.
    pub fn excludes(&self, other: &Mark) -> bool {
        use Mark::*;
        match (self, other) {
            (Insertion(_) | Deletion(_), Insertion(_) | Deletion(_) | Modification(_)) => true,
            (Modification(_), Insertion(_) | Deletion(_)) => true,
            (Structure(_), Insertion(_) | Deletion(_) | Modification(_)) => true,
            (Insertion(_) | Deletion(_) | Modification(_), Structure(_)) => true,
            (Format(a), Format(b)) => a.name == b.name,
            _ => false,
        }
    }

    /// Add this mark to a rank-ordered set, dropping marks it excludes.
    /// The set is returned unchanged when the mark is already present or
    /// when a mark in the set excludes it.
    pub fn add_to_set(&self, set: &[Mark]) -> Vec<Mark> {
        let mut copy: Option<Vec<Mark>> = None;
        let mut placed = false;
        for (i, other) in set.iter().enumerate() {
            if self == other {
                return set.to_vec();
            }
            if self.excludes(other) {
                if copy.is_none() {
                    copy = Some(set[..i].to_vec());
                }
            } else if other.excludes(self) {
                return set.to_vec();
            } else {
                if !placed && other.rank() > self.rank() {
                    let c = copy.get_or_insert_with(|| set[..i].to_vec());
                    c.push(self.clone());
                    placed = true;
                }
                if let Some(c) = copy.as_mut() {
                    c.push(other.clone());
                }
            }
        }
        let mut copy = copy.unwrap_or_else(|| set.to_vec());
        if !placed {
            copy.push(self.clone());
        }
        copy
    }

    pub fn remove_from_set(&self, set: &[Mark]) -> Vec<Mark> {
        set.iter().filter(|m| *m != self).cloned().collect()
    }

    pub fn is_in_set(&self, set: &[Mark]) -> bool {
        set.contains(self)
    }

    pub fn to_json(&self) -> Result<Value, ModelError> {
        Ok(serde_json::to_value(self)?)
    }

    pub fn from_json(value: &Value) -> Result<Mark, ModelError> {
        Ok(serde_json::from_value(value.clone())?)
    }
}

pub fn same_set(a: &[Mark], b: &[Mark]) -> bool {
    a == b
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkJson {
    #[serde(rename = "type")]
    ty: String,
    #[serde(default, skip_serializing_if = "Attrs::is_empty")]
    attrs: Attrs,
}

fn typed_attrs<T: serde::de::DeserializeOwned>(name: &str, attrs: Attrs) -> Result<T, ModelError> {
    let object: serde_json::Map<String, Value> = attrs.into_iter().collect();
    serde_json::from_value(Value::Object(object)).map_err(|e| ModelError::InvalidMark {
        mark: name.to_string(),
        reason: e.to_string(),
    })
}

fn untyped_attrs<T: Serialize>(attrs: &T) -> Attrs {
    match serde_json::to_value(attrs) {
        Ok(Value::Object(map)) => map.into_iter().collect(),
        _ => Attrs::new(),
    }
}

impl TryFrom<MarkJson> for Mark {
    type Error = ModelError;

    fn try_from(json: MarkJson) -> Result<Self, Self::Error> {
        let name = json.ty.as_str();
        Ok(match name {
            INSERTION => Mark::Insertion(typed_attrs(name, json.attrs)?),
            DELETION => Mark::Deletion(typed_attrs(name, json.attrs)?),
            MODIFICATION => Mark::Modification(typed_attrs(name, json.attrs)?),
            STRUCTURE => Mark::Structure(typed_attrs(name, json.attrs)?),
            "" => return Err(ModelError::UnknownMarkType(String::new())),
            _ => Mark::Format(FormatMark {
                name: json.ty,
                attrs: json.attrs,
            }),
        })
    }
}

impl From<Mark> for MarkJson {
    fn from(mark: Mark) -> Self {
        let ty = mark.type_name().to_string();
        let attrs = match &mark {
            Mark::Insertion(a) => untyped_attrs(a),
            Mark::Deletion(a) => untyped_attrs(a),
            Mark::Modification(a) => untyped_attrs(a),
            Mark::Structure(a) => untyped_attrs(a),
            Mark::Format(f) => f.attrs.clone(),
        };
        MarkJson { ty, attrs }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn ids_accept_strings_and_numbers() {
        let a: SuggestionId = serde_json::from_value(json!(7)).unwrap();
        let b: SuggestionId = serde_json::from_value(json!("7")).unwrap();
        assert_eq!(a, b);
        assert_eq!(serde_json::to_value(a).unwrap(), json!(7));
        assert!(serde_json::from_value::<SuggestionId>(json!("seven")).is_err());
    }

    #[test]
    fn suggestion_marks_round_trip_through_json() {
        let mark = Mark::Modification(ModificationAttrs {
            id: SuggestionId(3),
            change_type: ChangeType::Attr,
            attr_name: "level".into(),
            previous_value: json!(1),
            new_value: json!(2),
        });
        let value = mark.to_json().unwrap();
        assert_eq!(value["type"], json!("modification"));
        assert_eq!(value["attrs"]["attrName"], json!("level"));
        assert_eq!(Mark::from_json(&value).unwrap(), mark);
    }

    #[test]
    fn malformed_suggestion_attrs_are_rejected() {
        let err = Mark::from_json(&json!({"type": "insertion", "attrs": {}})).unwrap_err();
        assert!(matches!(err, ModelError::InvalidMark { .. }));
    }

    #[test]
    fn insertion_replaces_deletion_in_a_set() {
        let set = vec![Mark::deletion(SuggestionId(1)), Mark::format("strong")];
        let updated = Mark::insertion(SuggestionId(2)).add_to_set(&set);
        assert_eq!(
            updated,
            vec![Mark::insertion(SuggestionId(2)), Mark::format("strong")]
        );
    }

    #[test]
    fn modifications_stack_but_keep_rank_order() {
        let m1 = Mark::Modification(ModificationAttrs {
            id: SuggestionId(1),
            change_type: ChangeType::Attr,
            attr_name: "a".into(),
            previous_value: Value::Null,
            new_value: json!(1),
        });
        let m2 = Mark::Modification(ModificationAttrs {
            attr_name: "b".into(),
            ..match &m1 {
                Mark::Modification(a) => a.clone(),
                _ => unreachable!(),
            }
        });
        let set = m1.add_to_set(&[Mark::format("em")]);
        let set = m2.add_to_set(&set);
        assert_eq!(set.len(), 3);
        assert_eq!(set[2], Mark::format("em"));
    }

    #[test]
    fn format_marks_exclude_same_name() {
        let mut a = Attrs::new();
        a.insert("href".into(), json!("a"));
        let mut b = Attrs::new();
        b.insert("href".into(), json!("b"));
        let set = vec![Mark::format_with_attrs("link", a)];
        let updated = Mark::format_with_attrs("link", b.clone()).add_to_set(&set);
        assert_eq!(updated, vec![Mark::format_with_attrs("link", b)]);
    }
}
