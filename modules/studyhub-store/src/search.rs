//! Case-insensitive substring search over the joined resource view.

use studyhub_common::ResourceSearchView;

/// A normalized free-text query. Matches when any searchable field of a
/// joined resource contains the text, ignoring case. An empty query matches
/// every resource that joins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    text: String,
    lowered: String,
}

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_string();
        let lowered = text.to_lowercase();
        Self { text, lowered }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn matches(&self, view: &ResourceSearchView) -> bool {
        view.searchable_fields()
            .iter()
            .any(|field| field.to_lowercase().contains(&self.lowered))
    }

    /// `ILIKE` pattern matching the query as a literal substring. `%`, `_`
    /// and the escape character itself are escaped with `\`.
    pub fn like_pattern(&self) -> String {
        let mut pattern = String::with_capacity(self.text.len() + 2);
        pattern.push('%');
        for ch in self.text.chars() {
            if matches!(ch, '%' | '_' | '\\') {
                pattern.push('\\');
            }
            pattern.push(ch);
        }
        pattern.push('%');
        pattern
    }
}

/// Joined search rows and the count query share this FROM/WHERE clause.
/// Inner joins drop resources whose subject, course or document type is missing.
/// Binds `$1` to the `ILIKE` pattern.
pub(crate) const SEARCH_FROM_SQL: &str = r#"
    FROM resources r
    JOIN document_types dt ON dt.id = r.document_type_id
    JOIN subjects s ON s.id = r.subject_id
    JOIN courses co ON co.id = r.course_id
    WHERE r.title ILIKE $1 ESCAPE '\'
       OR r.description ILIKE $1 ESCAPE '\'
       OR dt.name ILIKE $1 ESCAPE '\'
       OR r.document_format ILIKE $1 ESCAPE '\'
       OR r.user_email ILIKE $1 ESCAPE '\'
       OR r.user_name ILIKE $1 ESCAPE '\'
       OR r.hashtags ILIKE $1 ESCAPE '\'
       OR s.name ILIKE $1 ESCAPE '\'
       OR co.name ILIKE $1 ESCAPE '\'
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use studyhub_common::{Course, DocumentType, Subject};
    use uuid::Uuid;

    fn view() -> ResourceSearchView {
        let course_id = Uuid::new_v4();
        ResourceSearchView {
            id: Uuid::new_v4(),
            title: "Fourier Series Cheat Sheet".into(),
            description: "Formulas for periodic signals".into(),
            document_type: DocumentType {
                id: Uuid::new_v4(),
                name: "Summary".into(),
            },
            document_format: "pdf".into(),
            user_email: "joao@uni.pt".into(),
            user_name: "João".into(),
            hashtags: "#signals #exam".into(),
            subject: Subject {
                id: Uuid::new_v4(),
                course_id,
                name: "Signal Processing".into(),
            },
            course: Course {
                id: course_id,
                name: "Electrical Engineering".into(),
            },
            created_at: Utc::now(),
            favorites_nr: 0,
            upvotes_nr: 0,
            downvotes_nr: 0,
            downloads_nr: 0,
        }
    }

    #[test]
    fn matches_any_field_ignoring_case() {
        let v = view();
        for q in [
            "fourier",
            "PERIODIC",
            "summary",
            "PDF",
            "uni.pt",
            "joão",
            "#exam",
            "processing",
            "electrical",
        ] {
            assert!(SearchQuery::new(q).matches(&v), "expected {q} to match");
        }
        assert!(!SearchQuery::new("thermodynamics").matches(&v));
    }

    #[test]
    fn empty_query_matches_everything() {
        let q = SearchQuery::new("   ");
        assert!(q.is_empty());
        assert!(q.matches(&view()));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(SearchQuery::new("50%_off").like_pattern(), r"%50\%\_off%");
        assert_eq!(SearchQuery::new(r"a\b").like_pattern(), r"%a\\b%");
        assert_eq!(SearchQuery::new(" calc ").like_pattern(), "%calc%");
    }
}
