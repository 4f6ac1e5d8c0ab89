// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod randomize;
pub mod route;
pub mod settings;
pub mod softlock;
pub mod spoiler_log;
