pub mod util;
pub use util::*;

mod error;
pub use error::{Result, SynthError};

mod wire;
pub use wire::*;

mod universe;
pub use universe::*;

mod graph;
use graph::*;

mod oracle;
pub use oracle::*;

mod pattern;
pub use pattern::*;

mod model;
pub use model::*;

mod linearize;

mod features;
pub use features::*;

mod config;
pub use config::*;

mod floorplan;
pub use floorplan::*;

mod anneal;
pub use anneal::*;

mod encoder;
pub use encoder::*;

mod lp_format;
pub use lp_format::*;

mod solver;
pub use solver::*;

mod file_writer;
pub use file_writer::*;

mod synth;
pub use synth::*;

mod verify;
pub use verify::*;
