pub mod config;
pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::error::Error;

/// Input precedence: `--input` file, then piped stdin, then individual flags.
pub fn resolve<T, F>(path: Option<&str>, from_flags: F) -> Result<T, Box<dyn Error>>
where
    T: DeserializeOwned,
    F: FnOnce() -> Result<Value, Box<dyn Error>>,
{
    let value = if let Some(path) = path {
        file::read_json_value(path)?
    } else if let Some(data) = stdin::read_stdin()? {
        data
    } else {
        from_flags()?
    };
    Ok(serde_json::from_value(value)?)
}
