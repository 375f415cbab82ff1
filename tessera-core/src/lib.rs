pub mod assembler;
pub mod config;
pub mod dedup;
pub mod error;
pub mod funcs;
pub mod instance;
pub mod label;
pub mod model;
pub mod notice;
pub mod presence;

pub use assembler::{Assembler, Assembly};
pub use config::TesseraConfig;
pub use error::DeriveError;
pub use funcs::{FieldValue, FuncTable};
pub use instance::{PortBinding, ServiceGroups, ServiceInstance};
pub use model::DerivedConfiguration;
pub use notice::NoticeSink;
