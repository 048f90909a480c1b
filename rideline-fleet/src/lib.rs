pub mod inventory;
pub mod memory;
pub mod repository;
pub mod unit;

pub use inventory::{DecrementRequest, InventoryError};
pub use repository::{UnitRepoError, UnitRepository};
pub use unit::RentableUnit;
