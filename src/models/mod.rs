pub mod invoice;
pub mod product;
pub mod role;

pub use product::Product;
