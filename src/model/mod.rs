//! Document data model: identifiers and content blocks.

pub mod block;
pub mod types;

pub use block::{Block, BlockKind, project_to_text};
pub use types::{BlockId, BranchId, BranchName, CommitId, DocumentId, DraftId, MAIN_BRANCH};
