#![doc = include_str!("../README.md")]

extern crate nalgebra as na;
extern crate petgraph;

mod algebra;
pub mod branch;
pub mod circuit;
mod kirchhoff;
pub mod mesh;
mod parser;
mod potential;
pub mod value;

pub use algebra::Expr;
pub use branch::*;
pub use circuit::*;
pub use mesh::{Mesh, Step};
pub use value::*;
