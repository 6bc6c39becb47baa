pub mod esterel_printer;
pub mod grc_printer;

pub use esterel_printer::*;
pub use grc_printer::*;
