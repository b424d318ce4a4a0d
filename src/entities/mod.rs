//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cart_entry;
pub mod license_key;
pub mod order;
pub mod order_line;
pub mod product;
pub mod user;

// Re-export specific types to avoid conflicts
pub use cart_entry::{Column as CartEntryColumn, Entity as CartEntry, Model as CartEntryModel};
pub use license_key::{
    Column as LicenseKeyColumn, Entity as LicenseKey, Model as LicenseKeyModel,
};
pub use order::{Column as OrderColumn, Entity as Order, Model as OrderModel};
pub use order_line::{Column as OrderLineColumn, Entity as OrderLine, Model as OrderLineModel};
pub use product::{Column as ProductColumn, Entity as Product, Model as ProductModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
