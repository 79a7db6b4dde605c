/*!
Utility types and routines shared by the matching engines.
*/

pub mod look;
pub(crate) mod pool;
#[cfg(feature = "syntax")]
pub mod syntax;
pub mod utf8;
