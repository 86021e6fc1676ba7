//! Thin configuration loader for the `demos/` binaries. This is a
//! convenience wrapper over [`crate::params::Params`], not a second
//! validation path: it reads a JSON file and hands the text straight
//! to [`Params::from_json`], in the same "load from a conventional
//! path, else default" shape as `Disk::load`.

use crate::error::TsetlinResult;
use crate::params::Params;

/// Load hyperparameters from a JSON file at `path`. Missing file is not
/// an error here — callers that want "load or default" call
/// [`load_or_default`] instead.
pub fn load(path: &str) -> TsetlinResult<Params> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        crate::error::TsetlinError::BadJson(format!("could not read config file {path}: {e}"))
    })?;
    Params::from_json(&text)
}

/// Load from `path` if it exists, falling back to [`Params::default`]
/// when it doesn't — the demo binaries' `--config <path>` flag is
/// optional.
pub fn load_or_default(path: Option<&str>) -> TsetlinResult<Params> {
    match path {
        Some(path) if std::path::Path::new(path).exists() => load(path),
        _ => Ok(Params::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_path_falls_back_to_default() {
        let p = load_or_default(Some("/nonexistent/path/to/config.json")).unwrap();
        assert_eq!(p, Params::default());
    }

    #[test]
    fn none_falls_back_to_default() {
        let p = load_or_default(None).unwrap();
        assert_eq!(p, Params::default());
    }
}
