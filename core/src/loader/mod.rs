//! The loading pipeline: resolved plugins driven through every stage of a
//! catalog, one stage at a time.

mod run;

pub use run::{LoadReport, Loader};
