//! Stock registry for equipment, materials and reactives.
//!
//! Records are owned here and referenced (never embedded) by request lines.
//! [`StockCheckable`] carries the per-kind "enough stock" rule used by the
//! availability checker; [`StockCatalog`] is the plain CRUD surface.

pub mod registry;
pub mod types;

pub use registry::{HasRegistry, StockCatalog, StockRegistries, StockRegistry};
pub use types::{
    Equipment, EquipmentDraft, Material, MaterialDraft, Reactive, ReactiveDraft, StockCheckable,
    StockItem,
};
