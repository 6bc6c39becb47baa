pub mod ast;
pub mod error;
pub mod grc;
pub mod pretty;

// Re-export
pub use error::{RenderError, RenderResult};
pub use pretty::{
    expression_to_string, render_grc_into, statement_to_string, write_grc_dot, write_module,
    write_modules, Dialect, EsterelPrinter, GrcDotOffsets, GrcDotOptions, GrcDotPrinter,
};
