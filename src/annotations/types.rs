//! Annotation types following the W3C Web Annotation data model
//!
//! Reference: <https://www.w3.org/TR/annotation-model/>

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::highlight::MarkLabel;
use crate::selectors::{PositionSelector, QuoteSelector, StructuralSelector, Target};

/// A complete annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Unique identifier (UUID)
    pub id: String,
    /// Type of annotation
    #[serde(rename = "type")]
    pub annotation_type: AnnotationType,
    /// What is being annotated
    pub target: Target,
    /// The body/content of the annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<AnnotationBody>,
    /// Style information (color, etc.)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<AnnotationStyle>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// Types of annotations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationType {
    Highlight,
    Note,
    Underline,
}

impl AnnotationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnnotationType::Highlight => "highlight",
            AnnotationType::Note => "note",
            AnnotationType::Underline => "underline",
        }
    }
}

/// Body/content of an annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationBody {
    #[serde(rename = "type")]
    pub body_type: BodyType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// MIME type of the value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum BodyType {
    /// Plain text note
    TextualBody,
}

/// Visual style for highlights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationStyle {
    /// Highlight color (CSS color value)
    pub color: String,
    /// Opacity (0.0-1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
}

impl Default for AnnotationStyle {
    fn default() -> Self {
        Self {
            color: "#ffff00".to_string(),
            opacity: Some(0.3),
        }
    }
}

impl Annotation {
    fn new(annotation_type: AnnotationType, target: Target) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            annotation_type,
            target,
            body: None,
            style: Some(AnnotationStyle::default()),
            created_at: now,
            updated_at: now,
        }
    }

    /// Create a new highlight annotation
    pub fn new_highlight(target: Target) -> Self {
        Self::new(AnnotationType::Highlight, target)
    }

    /// Create a new underline annotation
    pub fn new_underline(target: Target) -> Self {
        Self::new(AnnotationType::Underline, target)
    }

    /// Create a new note annotation
    pub fn new_note(target: Target, note: &str) -> Self {
        let mut annotation = Self::new(AnnotationType::Note, target);
        annotation.body = Some(AnnotationBody {
            body_type: BodyType::TextualBody,
            value: Some(note.to_string()),
            format: Some("text/plain".to_string()),
        });
        annotation
    }

    /// Set the color
    pub fn with_color(mut self, color: &str) -> Self {
        self.style = Some(AnnotationStyle {
            color: color.to_string(),
            opacity: Some(0.3),
        });
        self
    }

    /// Source document the target is scoped to
    pub fn source(&self) -> &str {
        &self.target.source
    }

    pub fn structural(&self) -> Option<&StructuralSelector> {
        self.target.structural()
    }

    pub fn position(&self) -> Option<&PositionSelector> {
        self.target.position()
    }

    pub fn quote(&self) -> Option<&QuoteSelector> {
        self.target.quote()
    }

    /// Get the exact quoted text if available
    pub fn text_quote(&self) -> Option<&str> {
        self.target.text_quote()
    }

    /// Label written onto the marks of this annotation
    pub fn mark_label(&self) -> MarkLabel {
        let label = MarkLabel::new(self.id.as_str(), self.annotation_type.as_str());
        match &self.style {
            Some(style) => label.with_color(&style.color, style.opacity),
            None => label,
        }
    }
}
