//! The working set: a per-user cached projection of the selected domain.
//!
//! A working set is derived, disposable state. Its absence is always safe
//! to recover from by recomputation; what is never acceptable is a
//! *published* working set whose membership disagrees with the store. The
//! orchestrator therefore only ever publishes values built from one full
//! read, and this type's constructor re-checks the alignment invariants.

use crate::id::{DomainId, FileId};
use serde::{Deserialize, Serialize};

/// A file participating in a working set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingSetFile {
    pub file_id: FileId,
    pub file_name: String,
}

/// One unsealed content unit inside a working set, tagged with its
/// owning file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WorkingSetUnit {
    pub file_id: FileId,
    pub file_name: String,
    pub sentence: String,
    pub page_number: i32,
    pub is_header: bool,
    pub is_table: bool,
}

/// The assembled content and embeddings of the currently selected domain.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorkingSet {
    pub domain_id: DomainId,
    pub files: Vec<WorkingSetFile>,
    pub units: Vec<WorkingSetUnit>,
    /// Row-aligned with `units`.
    pub embeddings: Vec<Vec<f32>>,
}

impl WorkingSet {
    /// Build a working set, validating the alignment invariants:
    /// embeddings row-aligned with units, and every unit owned by a
    /// member file.
    pub fn new(
        domain_id: DomainId,
        files: Vec<WorkingSetFile>,
        units: Vec<WorkingSetUnit>,
        embeddings: Vec<Vec<f32>>,
    ) -> crate::Result<Self> {
        if units.len() != embeddings.len() {
            return Err(crate::Error::MisalignedEmbeddings {
                units: units.len(),
                embeddings: embeddings.len(),
            });
        }
        for unit in &units {
            if !files.iter().any(|f| f.file_id == unit.file_id) {
                return Err(crate::Error::Validation(format!(
                    "content unit references file {} outside the member set",
                    unit.file_id
                )));
            }
        }
        Ok(Self {
            domain_id,
            files,
            units,
            embeddings,
        })
    }

    /// The member file ids.
    pub fn file_ids(&self) -> Vec<FileId> {
        self.files.iter().map(|f| f.file_id).collect()
    }

    pub fn contains_file(&self, file_id: FileId) -> bool {
        self.files.iter().any(|f| f.file_id == file_id)
    }

    /// Number of content units belonging to the given file.
    pub fn unit_count_for(&self, file_id: FileId) -> usize {
        self.units.iter().filter(|u| u.file_id == file_id).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(file_id: FileId, s: &str) -> WorkingSetUnit {
        WorkingSetUnit {
            file_id,
            file_name: "doc.txt".to_string(),
            sentence: s.to_string(),
            page_number: 1,
            is_header: false,
            is_table: false,
        }
    }

    #[test]
    fn test_rejects_unit_outside_member_set() {
        let member = FileId::new();
        let stranger = FileId::new();
        let err = WorkingSet::new(
            DomainId::new(),
            vec![WorkingSetFile {
                file_id: member,
                file_name: "doc.txt".to_string(),
            }],
            vec![unit(stranger, "hello")],
            vec![vec![0.0; 4]],
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::Validation(_)));
    }

    #[test]
    fn test_rejects_misaligned_embeddings() {
        let file_id = FileId::new();
        let err = WorkingSet::new(
            DomainId::new(),
            vec![WorkingSetFile {
                file_id,
                file_name: "doc.txt".to_string(),
            }],
            vec![unit(file_id, "hello"), unit(file_id, "world")],
            vec![vec![0.0; 4]],
        )
        .unwrap_err();
        assert!(matches!(err, crate::Error::MisalignedEmbeddings { .. }));
    }

    #[test]
    fn test_membership_helpers() {
        let file_id = FileId::new();
        let ws = WorkingSet::new(
            DomainId::new(),
            vec![WorkingSetFile {
                file_id,
                file_name: "doc.txt".to_string(),
            }],
            vec![unit(file_id, "hello"), unit(file_id, "world")],
            vec![vec![0.0; 4], vec![0.0; 4]],
        )
        .unwrap();
        assert!(ws.contains_file(file_id));
        assert!(!ws.contains_file(FileId::new()));
        assert_eq!(ws.unit_count_for(file_id), 2);
        assert_eq!(ws.file_ids(), vec![file_id]);
    }
}
