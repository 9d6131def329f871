pub mod chat;
pub mod flows_cmd;
pub mod gateway;
pub mod infer_cmd;
pub mod tools_cmd;

use flowbridge_core::{Config, Paths, Result};

/// Load the process configuration once; commands receive it by value and
/// construct their own clients from it.
pub fn load_config() -> Result<(Config, Paths)> {
    let paths = Paths::new();
    let config = Config::load_or_default(&paths)?;
    Ok((config, paths))
}
