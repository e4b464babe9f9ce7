pub mod boxes;
pub mod extents;
pub mod iinf;
pub mod iloc;
pub mod index;
pub mod iref;
pub mod known_boxes;
pub mod leaf;
pub mod parser;
pub mod pitm;
pub mod registry;
pub mod resource;
pub mod tree;
pub mod util;

pub use boxes::{BoxHeader, BoxId, BoxKey, BoxNode, FourCC};
pub use extents::{ExtractError, ItemExtractor};
pub use iinf::{IinfBox, InfeBox};
pub use iloc::{IlocBox, IlocExtent, IlocIntegerWidth, IlocItem};
pub use index::{FullBoxIndex, IndexedBoxEntry, LoadedBoxIndex};
pub use iref::{CdscBox, IrefBox, ItemReferenceBox};
pub use parser::{ParseError, parse, read_box_header, read_box_header_at, read_boxes};
pub use pitm::PitmBox;
pub use registry::{BoxFactory, BoxValue, BuildContext, Built, Registry, RegistryError, default_registry};
pub use resource::Resource;
pub use tree::{BoxTree, LookupError, TypedBox};
pub use util::{HexDump, hex_range};
