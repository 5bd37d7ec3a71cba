//! docgraph library crate.
//!
//! Version history for block-structured documents: immutable commits on named
//! branches forming a DAG, a structural block diff with a character-level text
//! diff, an interactive three-way merge and a deterministic graph layout.
//!
//! The `docgraph` binary is a thin front end over these modules.

pub mod config;
pub mod diff;
pub mod error;
pub mod graph;
pub mod layout;
pub mod merge;
pub mod model;
pub mod session;
pub mod store;
pub mod telemetry;

pub use config::DocgraphConfig;
pub use diff::{DiffEntry, DiffKind, DiffOptions, structural_diff, text_diff};
pub use error::{ErrorKind, GraphError};
pub use graph::GraphSnapshot;
pub use layout::{Layout, layout};
pub use merge::{MergePhase, MergeSession, Side};
pub use model::{Block, BlockId, BranchId, CommitId, DocumentId};
pub use session::DocumentSession;
pub use store::{GraphStore, JsonFileStore, MemoryStore, StoreError};
