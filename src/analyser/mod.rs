//! Table model and the analysis stages that run over it.

pub mod logic;
