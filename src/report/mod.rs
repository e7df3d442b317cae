//! Report rendering.

pub mod generator;

pub use generator::{render, Cell, Column, RenderOptions, Table};
