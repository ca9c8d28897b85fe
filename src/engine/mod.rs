pub mod autosave;
pub mod cell_edit;
pub mod debounce;
pub mod expansion;
pub mod selection;
pub mod tree;

pub use autosave::{AutosaveScheduler, SavePayload};
pub use cell_edit::{Activation, CellCommand, CellEditor, CellPhase, DismissBoundary};
pub use debounce::Debouncer;
pub use expansion::{ExpandEffect, ExpansionController};
pub use selection::{BulkAction, PendingBulk, SelectionController};
pub use tree::{Row, TreeStore};
