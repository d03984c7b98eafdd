pub mod cli;
pub mod conf;
pub mod flags;
pub mod path_flags;

pub use conf::ExtraConf;
pub use flags::{FileFlags, FlagSource};
