//! Parses `argv` into the list of image paths to load, per the CLI
//! contract `lc3 <image-file> [<image-file> ...]` — at least one
//! image is required.

use clap::ArgMatches;
use crate::error::Error;

#[derive(Debug, PartialEq)]
pub struct Config {
    pub image_paths: Vec<String>,
}

impl Config {
    pub fn from_matches(matches: &ArgMatches) -> Result<Self, Error> {
        let image_paths: Vec<String> = matches
            .values_of("IMAGE")
            .map(|values| values.map(String::from).collect())
            .unwrap_or_default();

        // Unreachable via `main.rs`'s `App`, which marks IMAGE
        // `required(true)` and never calls `from_matches` unless
        // `get_matches_safe()` already succeeded. Kept as a defensive
        // check for any other caller of this function that builds its
        // own `ArgMatches` without that constraint.
        if image_paths.is_empty() {
            return Err(Error::Usage);
        }

        Ok(Self { image_paths })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{App, Arg};

    fn app() -> App<'static, 'static> {
        App::new("lc3").arg(
            Arg::with_name("IMAGE")
                .help("The LC-3 object image(s) to run.")
                .required(true)
                .multiple(true)
                .index(1),
        )
    }

    #[test]
    fn config_single_image() {
        let matches = app().get_matches_from(vec!["lc3", "program.obj"]);
        let config = Config::from_matches(&matches).unwrap();
        assert_eq!(config.image_paths, vec!["program.obj"]);
    }

    #[test]
    fn config_multiple_images_in_order() {
        let matches = app().get_matches_from(vec!["lc3", "a.obj", "b.obj", "c.obj"]);
        let config = Config::from_matches(&matches).unwrap();
        assert_eq!(config.image_paths, vec!["a.obj", "b.obj", "c.obj"]);
    }
}
