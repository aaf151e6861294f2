//! Library parts of the `eudat` command line tool.

pub mod logging;
pub mod pipeline;
