pub mod entities;
pub mod errors;
pub mod value_objects;

pub use entities::{Payment, PaymentDetails};
pub use value_objects::{Money, Page, PageRequest, PaymentStatus};
