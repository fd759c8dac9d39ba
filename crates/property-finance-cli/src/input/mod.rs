pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;

/// Read a typed input from `--input <file>` or piped stdin, in that order.
pub fn read_required<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        file::read_json(path)
    } else if let Some(piped) = stdin::read_piped(what)? {
        Ok(piped)
    } else {
        Err(format!("--input <file.json> or stdin required for {what}").into())
    }
}
