mod codegen;
mod tables;

pub use codegen::*;
pub use tables::{variable_label, StringTable, Variables};
