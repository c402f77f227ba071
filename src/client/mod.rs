pub mod mdm;

pub use mdm::{MdmClient, SESSION_HEADER};
