#![forbid(unsafe_code)]

pub mod error;
pub mod frame;
pub mod geom;
pub mod pdb;
pub mod range;
pub mod selection;
pub mod system;

pub use error::{TrajError, TrajResult};
pub use frame::Box3;
pub use geom::Vec3;
pub use pdb::{parse_pdb_reader, PdbAtom, PdbParseOptions, PdbParseResult};
pub use range::{frame_list, parse_range_list};
pub use selection::Selection;
pub use system::{Atom, AtomGroup};
