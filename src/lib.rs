pub mod config;
pub mod error;
/// Ruta - decision core of a MongoDB client
///
/// Two pure components sit between the topology monitor and the operation
/// executor:
/// 1. Server selection: a read preference applied to a topology snapshot
///    yields the members eligible to serve an operation
/// 2. Command building: operation intents rendered into the command
///    documents the cluster protocol expects
pub mod command;
pub mod core;
pub mod selection;
pub mod utils;

pub use crate::command::{CommandIntent, Document, Namespace, Renderable};
pub use crate::core::{Member, ServerRole, TopologyHandle, TopologyKind, TopologySnapshot};
pub use crate::error::{RutaError, RutaResult};
pub use crate::selection::{Mode, ReadPreference, Selectable, ServerSelector, TagSet};
