#![allow(rustdoc::bare_urls)]
#![doc = include_str!("../README.md")]

mod charset;
mod context;
mod convergence;
mod error;
mod grammar;
mod ir;
mod multiplicity;
mod text;

pub use context::{Config, Context};
pub use error::Error;
pub use grammar::Unparser;
pub use multiplicity::{EbnfOperator, EbnfSuffix};
pub use text::Text;
