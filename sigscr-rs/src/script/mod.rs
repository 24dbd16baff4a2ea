//! Signal script language: compiler front end and interpreter.
//!
//! Scripts decide a signal's aspect (`STATE`) and draw state
//! (`DRAW_STATE`) from a handful of host bindings.  The pipeline is:
//!
//! - [`reader`]: comment stripping, case folding, delimiter splitting
//! - [`segment`]: `SCRIPT` / `REM SCRIPT` grouping
//! - [`compile`]: `FLOAT` declarations, then [`block`] structuring with
//!   [`term`] and [`cond`] parsing of statements and conditions
//! - [`interp`]: evaluation against a [`SignalEnv`]
//!
//! Arithmetic and conditions both evaluate strictly left to right with no
//! operator precedence: `1 + 2 * 3` is `9`.
//!
//! # Quick start
//!
//! ```rust
//! use sigscr::script::{compile_str, run};
//! use sigscr::signal::FixedSignal;
//!
//! let (script, _diags) = compile_str(
//!     "SCRIPT DEMO\nIF (BLOCK_STATE == #BLOCK_CLEAR) STATE = SIGASP_CLEAR_2;\nELSE STATE = SIGASP_STOP;",
//! );
//! let mut sig = FixedSignal::default();
//! run(&script.unwrap(), &mut sig);
//! assert_eq!(sig.state, 7);
//! ```

pub mod ast;
pub mod block;
pub mod catalog;
pub mod compile;
pub mod cond;
pub mod dump;
pub mod interp;
pub mod reader;
pub mod segment;
pub mod term;

// Re-exports for convenience.
pub use ast::Script;
pub use compile::{compile_source, compile_str};
pub use dump::{dump_script, Listing};
pub use interp::{run, ControlFlow, Interpreter, SignalEnv};
