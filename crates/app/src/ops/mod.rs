pub mod demo;
pub mod derive;
pub mod init;
pub mod manifest;
pub mod version;

pub use demo::Demo;
pub use derive::Derive;
pub use init::Init;
pub use manifest::Manifest;
pub use version::Version;
