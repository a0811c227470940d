//! Field Parser: typed values from raw region text.
//!
//! Every parser is a pure function returning `Option`; `None` means the
//! field could not be read and is never replaced by a default.

pub mod action;
pub mod labels;
pub mod money;
pub mod name;

pub use action::{parse_action, Action, ActionReading};
pub use labels::{parse_street, Street};
pub use money::{parse_blinds, parse_money};
pub use name::{clean_name, NameRegistry};
