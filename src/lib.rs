pub mod app;
pub mod dates;
pub mod pipes;
pub mod util;
