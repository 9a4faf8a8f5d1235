pub mod emit;
pub mod plan;

use std::path::{Path, PathBuf};
use std::process;

use serde::Deserialize;

use fieldsynth::{FieldType, Opcode, SynthConfig};

/// One synthesis request, as written in a request file.
///
/// ```toml
/// [opcode]
/// op = "shift"
/// offsets = [1, -2]
/// border = "clamp"
///
/// [[inputs]]
/// shape = [8, 8]
/// ```
///
/// `results` may be omitted, in which case the derived types are used.
#[derive(Debug, Deserialize)]
pub struct Request {
    pub opcode: Opcode,
    pub inputs: Vec<FieldType>,
    #[serde(default)]
    pub results: Option<Vec<FieldType>>,
}

impl Request {
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Resolve the configuration from an explicit file or a preset name,
/// falling back to the defaults plus environment overrides.
pub fn load_config(config: Option<&Path>, preset: Option<&str>) -> SynthConfig {
    let result = match (config, preset) {
        (Some(path), _) => SynthConfig::load(path),
        (None, Some(name)) => SynthConfig::resolve(name).and_then(|mut cfg| {
            cfg.apply_env_overrides()?;
            cfg.validate()?;
            Ok(cfg)
        }),
        (None, None) => SynthConfig::from_env(),
    };
    match result {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    }
}

pub fn read_file(path: &PathBuf) -> String {
    match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldsynth::{BorderPolicy, FieldShape};

    #[test]
    fn test_parse_request_without_results() {
        let request = Request::parse(
            r#"
[opcode]
op = "shift"
offsets = [1, -2]
border = "clamp"

[[inputs]]
shape = [8, 8]
"#,
        )
        .unwrap();
        assert_eq!(
            request.opcode,
            Opcode::Shift {
                offsets: vec![1, -2],
                border: BorderPolicy::Clamp
            }
        );
        assert_eq!(request.inputs, vec![FieldType::scalar(&[8, 8])]);
        assert!(request.results.is_none());
    }

    #[test]
    fn test_parse_request_with_results() {
        let request = Request::parse(
            r#"
[opcode]
op = "transpose"

[[inputs]]
shape = [16, 8]
tensor = [2]

[[results]]
shape = [8, 16]
tensor = [2]
"#,
        )
        .unwrap();
        assert_eq!(request.opcode, Opcode::Transpose);
        let results = request.results.unwrap();
        assert_eq!(results[0].shape, FieldShape::new(&[8, 16]));
        assert_eq!(results[0], FieldType::vector(&[8, 16], 2));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("synth.toml");
        std::fs::write(
            &path,
            "max_threads_per_block = 128\n\
             block_1d = 128\n\
             block_2d = [8, 8]\n\
             block_3d = [4, 4, 4]\n\
             transpose_tile = 8\n",
        )
        .unwrap();
        let cfg = load_config(Some(&path), None);
        assert_eq!(cfg.max_threads_per_block, 128);
        assert_eq!(cfg.transpose_tile, 8);
    }
}
