//! # Post
//! src/content/post.rs

use crate::auth::User;
use crate::id::I512;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Estado de visibilidad de un post
///
/// Los posts nunca se borran; ocultar es un tombstone reversible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Visible,
    Hidden,
}

impl Visibility {
    pub fn toggled(self) -> Self {
        match self {
            Visibility::Visible => Visibility::Hidden,
            Visibility::Hidden => Visibility::Visible,
        }
    }
}

/// Forma persistida de un post (el autor va por id)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostRecord {
    pub id: I512,
    pub author: I512,
    pub creation: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous: Option<I512>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote: Option<I512>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quote_previous: Option<I512>,
    pub message: String,
    #[serde(default)]
    pub visibility: Visibility,
}

/// Post en memoria, con el autor ya resuelto
#[derive(Debug, Clone)]
pub struct Post {
    pub id: I512,
    pub author: Arc<User>,
    /// Milisegundos desde epoch
    pub creation: i64,
    /// Post anterior del mismo autor
    pub previous: Option<I512>,
    /// Post citado
    pub quote: Option<I512>,
    /// Donde sigue la cadena del dueño después del post citado
    pub quote_previous: Option<I512>,
    /// Mensaje ya escapado para HTML
    pub message: String,
    pub visibility: Visibility,
}

impl Post {
    pub fn from_record(record: PostRecord, author: Arc<User>) -> Self {
        Self {
            id: record.id,
            author,
            creation: record.creation,
            previous: record.previous,
            quote: record.quote,
            quote_previous: record.quote_previous,
            message: record.message,
            visibility: record.visibility,
        }
    }

    pub fn to_record(&self) -> PostRecord {
        PostRecord {
            id: self.id,
            author: self.author.id,
            creation: self.creation,
            previous: self.previous,
            quote: self.quote,
            quote_previous: self.quote_previous,
            message: self.message.clone(),
            visibility: self.visibility,
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.visibility == Visibility::Hidden
    }

    /// Copia del post con la visibilidad invertida
    pub fn toggled(&self) -> Self {
        Self {
            visibility: self.visibility.toggled(),
            ..self.clone()
        }
    }
}

impl PartialEq for Post {
    fn eq(&self, other: &Self) -> bool {
        self.to_record() == other.to_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn author() -> Arc<User> {
        Arc::new(User::new(I512::random(), I512::random(), "alice", I512::random()))
    }

    #[test]
    fn test_visibility_toggle_is_reversible() {
        assert_eq!(Visibility::Visible.toggled(), Visibility::Hidden);
        assert_eq!(Visibility::Visible.toggled().toggled(), Visibility::Visible);
    }

    #[test]
    fn test_record_layout() {
        let post = Post {
            id: I512::random(),
            author: author(),
            creation: 1_700_000_000_000,
            previous: None,
            quote: Some(I512::random()),
            quote_previous: None,
            message: "hello".to_string(),
            visibility: Visibility::Hidden,
        };

        let json: serde_json::Value = serde_json::to_value(post.to_record()).unwrap();
        assert_eq!(json["author"], post.author.id.to_hex());
        assert_eq!(json["visibility"], "hidden");
        assert!(json.get("previous").is_none());
        assert!(json.get("quote").is_some());
    }

    #[test]
    fn test_missing_visibility_defaults_to_visible() {
        let id = I512::random();
        let author = I512::random();
        let text = format!(
            r#"{{"id":"{}","author":"{}","creation":1,"message":"hi"}}"#,
            id, author
        );

        let record: PostRecord = serde_json::from_str(&text).unwrap();
        assert_eq!(record.visibility, Visibility::Visible);
        assert_eq!(record.previous, None);
    }
}
