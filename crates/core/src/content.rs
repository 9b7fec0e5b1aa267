//! Content units, extracted documents, and staged uploads.

use serde::{Deserialize, Serialize};
use time::Date;

/// One extracted sentence (or table/header fragment) of a file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentUnit {
    pub sentence: String,
    /// 1-based page the unit came from; plain-text sources use 1.
    pub page_number: i32,
    pub is_header: bool,
    pub is_table: bool,
}

/// A fully extracted and embedded document, not yet attached to a file id.
///
/// Construction validates the alignment invariants once, so downstream
/// code can rely on `units.len() == embeddings.len()`.
#[derive(Clone, Debug)]
pub struct ExtractedDocument {
    units: Vec<ContentUnit>,
    embeddings: Vec<Vec<f32>>,
}

impl ExtractedDocument {
    /// Build a document from aligned units and embeddings.
    pub fn new(
        name: &str,
        units: Vec<ContentUnit>,
        embeddings: Vec<Vec<f32>>,
    ) -> crate::Result<Self> {
        if units.is_empty() {
            return Err(crate::Error::EmptyContent(name.to_string()));
        }
        if units.len() != embeddings.len() {
            return Err(crate::Error::MisalignedEmbeddings {
                units: units.len(),
                embeddings: embeddings.len(),
            });
        }
        for embedding in &embeddings {
            if embedding.len() != crate::EMBEDDING_DIM {
                return Err(crate::Error::BadEmbeddingWidth {
                    got: embedding.len(),
                    expected: crate::EMBEDDING_DIM,
                });
            }
        }
        Ok(Self { units, embeddings })
    }

    pub fn units(&self) -> &[ContentUnit] {
        &self.units
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn into_parts(self) -> (Vec<ContentUnit>, Vec<Vec<f32>>) {
        (self.units, self.embeddings)
    }
}

/// An upload that has been read and embedded but not yet committed.
///
/// Lives in the cache under (user, file name) with a short fixed lifetime;
/// if the user never commits, the entry silently expires and the upload is
/// lost.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StagedUpload {
    pub file_name: String,
    pub last_modified: Date,
    pub units: Vec<ContentUnit>,
    pub embeddings: Vec<Vec<f32>>,
}

impl StagedUpload {
    pub fn from_document(file_name: String, last_modified: Date, doc: ExtractedDocument) -> Self {
        let (units, embeddings) = doc.into_parts();
        Self {
            file_name,
            last_modified,
            units,
            embeddings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(s: &str) -> ContentUnit {
        ContentUnit {
            sentence: s.to_string(),
            page_number: 1,
            is_header: false,
            is_table: false,
        }
    }

    #[test]
    fn test_extracted_document_rejects_empty() {
        let err = ExtractedDocument::new("empty.txt", vec![], vec![]).unwrap_err();
        assert!(matches!(err, crate::Error::EmptyContent(_)));
    }

    #[test]
    fn test_extracted_document_rejects_misalignment() {
        let err = ExtractedDocument::new(
            "doc.txt",
            vec![unit("a"), unit("b")],
            vec![vec![0.0; crate::EMBEDDING_DIM]],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            crate::Error::MisalignedEmbeddings {
                units: 2,
                embeddings: 1
            }
        ));
    }

    #[test]
    fn test_extracted_document_rejects_bad_width() {
        let err =
            ExtractedDocument::new("doc.txt", vec![unit("a")], vec![vec![0.0; 3]]).unwrap_err();
        assert!(matches!(err, crate::Error::BadEmbeddingWidth { got: 3, .. }));
    }

    #[test]
    fn test_extracted_document_accepts_aligned() {
        let doc = ExtractedDocument::new(
            "doc.txt",
            vec![unit("a"), unit("b")],
            vec![vec![0.0; crate::EMBEDDING_DIM]; 2],
        )
        .unwrap();
        assert_eq!(doc.units().len(), 2);
        assert_eq!(doc.embeddings().len(), 2);
    }
}
