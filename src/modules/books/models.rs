use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

/// A persisted book. Every field but `id` is optional and omitted from JSON
/// when absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Book {
    /// Store-assigned identity (24 hex characters)
    #[schema(example = "665f1c2ab8e4a1d3c9f0a001")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Image reference, usually a URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub img: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

/// Body of a create request. Unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NewBook {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl NewBook {
    pub fn into_book(self, id: String) -> Book {
        Book {
            id,
            name: self.name,
            img: self.img,
            summary: self.summary,
        }
    }
}

/// Body of an update request.
///
/// Per field: absent leaves the stored value alone, `null` clears it, a
/// string replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, ToSchema)]
pub struct BookPatch {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub img: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub summary: Option<Option<String>>,
}

impl BookPatch {
    /// Fields the patch touches, paired with their new value (`None` = clear).
    pub fn changes(&self) -> impl Iterator<Item = (&'static str, Option<&str>)> + '_ {
        [
            ("name", &self.name),
            ("img", &self.img),
            ("summary", &self.summary),
        ]
        .into_iter()
        .filter_map(|(field, change)| change.as_ref().map(|value| (field, value.as_deref())))
    }

    pub fn is_empty(&self) -> bool {
        self.changes().next().is_none()
    }

    /// Apply the patch in place. `id` is never touched.
    pub fn apply(&self, book: &mut Book) {
        if let Some(name) = &self.name {
            book.name = name.clone();
        }
        if let Some(img) = &self.img {
            book.img = img.clone();
        }
        if let Some(summary) = &self.summary {
            book.summary = summary.clone();
        }
    }
}

/// Distinguishes an explicit `null` from a missing key.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Confirmation body for deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn dune() -> Book {
        Book {
            id: "665f1c2ab8e4a1d3c9f0a001".to_string(),
            name: Some("Dune".to_string()),
            img: Some("dune.jpg".to_string()),
            summary: Some("Desert planet saga".to_string()),
        }
    }

    #[test]
    fn absent_fields_are_omitted_from_json() {
        let book = NewBook::default().into_book("abc".to_string());
        assert_eq!(serde_json::to_value(&book).unwrap(), json!({ "id": "abc" }));
    }

    #[test]
    fn new_book_ignores_unknown_fields() {
        let book: NewBook =
            serde_json::from_value(json!({ "name": "Dune", "isbn": "0441013597" })).unwrap();
        assert_eq!(book.name.as_deref(), Some("Dune"));
        assert_eq!(book.img, None);
    }

    #[test]
    fn new_book_rejects_non_string_fields() {
        let err = serde_json::from_value::<NewBook>(json!({ "name": 42 })).unwrap_err();
        assert!(err.to_string().contains("invalid type"));
    }

    #[test]
    fn patch_distinguishes_null_from_missing() {
        let patch: BookPatch =
            serde_json::from_value(json!({ "summary": "Updated", "img": null })).unwrap();
        assert_eq!(patch.name, None);
        assert_eq!(patch.img, Some(None));
        assert_eq!(patch.summary, Some(Some("Updated".to_string())));

        let changes: Vec<_> = patch.changes().collect();
        assert_eq!(changes, vec![("img", None), ("summary", Some("Updated"))]);
    }

    #[test]
    fn empty_patch_changes_nothing() {
        let patch: BookPatch = serde_json::from_value(json!({ "isbn": "x" })).unwrap();
        assert!(patch.is_empty());

        let mut book = dune();
        patch.apply(&mut book);
        assert_eq!(book, dune());
    }

    #[test]
    fn apply_updates_only_given_fields() {
        let patch: BookPatch =
            serde_json::from_value(json!({ "summary": "Updated", "img": null })).unwrap();
        let mut book = dune();
        patch.apply(&mut book);

        assert_eq!(book.id, dune().id);
        assert_eq!(book.name.as_deref(), Some("Dune"));
        assert_eq!(book.img, None);
        assert_eq!(book.summary.as_deref(), Some("Updated"));
    }
}
