//! Subcommand handlers
//!
//! Each handler returns the process exit code: 0 when clean, 1 when an
//! assertion failed, 2 when the run itself could not complete.

pub mod list;
pub mod verify;

pub const EXIT_CLEAN: i32 = 0;
pub const EXIT_FAILURES: i32 = 1;
pub const EXIT_ERROR: i32 = 2;

/// Print a run error with its cause chain.
pub fn report_error(err: &anyhow::Error) -> i32 {
    eprintln!("gcassert: {:#}", err);
    EXIT_ERROR
}
