//! Turns the parse tree of a systematic chemical name into a molecule.
//!
//! Each group of the tree stands for a [`Fragment`] of atoms. Building
//! bonds those fragments together the way the name's substituents,
//! brackets, multipliers, and locants say they should be, and applies the
//! unsaturation, heteroatom replacement, and hydrogen markers found
//! alongside each group.

#[macro_use]
mod error;
pub use error::*;

mod element;
pub use element::*;

pub mod valency;

mod fragment;
pub use fragment::*;

mod tree;
pub use tree::*;

mod state;
pub use state::*;

pub mod scope;
pub mod resolve;

pub mod multiply;
pub use multiply::BuildResults;

pub mod builder;
pub use builder::build_words;

pub mod template;
pub use template::{parse_template, Labels, Template};

pub mod sexpr;

mod description;
pub use description::*;

mod graph;
pub use graph::*;

mod visualize;
pub use visualize::*;

use tracing::Level;

/// Install a formatting subscriber at `level` (`"trace"`, `"debug"`, ...),
/// falling back to info for anything unrecognised. Calling it again is
/// harmless, so every test may call it.
pub fn init_logging(level: &str) {
    let level = level.parse::<Level>().unwrap_or(Level::INFO);
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_test_writer()
        .try_init();
}
