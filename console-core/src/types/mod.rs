//! Type definitions

mod descriptor;
mod list;

pub use descriptor::{
    Card, CardOption, CardRow, CardView, ColumnSpec, DetailInfo, EMPTY_CELL, InfoRow, Renderer,
    SearchFilter, render_value,
};
pub use list::ResourceList;
