//! Re-exports every crate of the toolkit under one roof.
pub use pktmatch_bench as bench;
pub use pktmatch_core as core;
pub use pktmatch_io as io;
pub use pktmatch_map as map;

#[allow(missing_docs)]
pub mod prelude {
    #[doc(hidden)]
    pub use pktmatch_bench::prelude::*;
    #[doc(hidden)]
    pub use pktmatch_core::prelude::*;
    #[doc(hidden)]
    pub use pktmatch_io::prelude::*;
}
