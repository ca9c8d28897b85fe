pub mod config;
pub mod schema;
pub mod task;

pub use config::{BehaviorConfig, ConsoleConfig, UiConfig, load_config};
pub use schema::{FieldDescriptor, FieldType, LookupOption, LookupSet, Schema, SchemaError};
pub use task::{FieldValue, Task, TaskConfig, TaskKind};
