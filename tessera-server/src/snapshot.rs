use anyhow::Context;
use std::path::Path;
use tessera_core::config::OutputFormat;
use tessera_core::{DerivedConfiguration, ServiceGroups};

/// Read a discovery snapshot: `.json` files as JSON, anything else as YAML.
pub fn load_snapshot(path: &Path) -> anyhow::Result<ServiceGroups> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading snapshot {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    let groups: ServiceGroups = if is_json {
        serde_json::from_str(&raw)
            .with_context(|| format!("parsing JSON snapshot {}", path.display()))?
    } else {
        serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing YAML snapshot {}", path.display()))?
    };
    Ok(groups)
}

pub fn render(config: &DerivedConfiguration, format: OutputFormat) -> anyhow::Result<String> {
    let out = match format {
        OutputFormat::Json => serde_json::to_string_pretty(config)?,
        OutputFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(out)
}

/// Write to `path`, or stdout when `None`.
pub fn write_output(rendered: &str, path: Option<&Path>) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, rendered)
            .with_context(|| format!("writing output {}", path.display())),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn load_json_snapshot() {
        let mut tmpfile = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(
            tmpfile,
            r#"{{"web": [{{"name": "web", "address": "10.0.0.5",
                "labels": {{"traefik.port": null}},
                "port_bindings": [{{"container_port": 80, "host_port": 32768}}]}}]}}"#
        )
        .unwrap();
        let groups = load_snapshot(tmpfile.path()).unwrap();
        assert_eq!(groups["web"][0].port_bindings[0].host_port, 32768);
        assert_eq!(groups["web"][0].labels["traefik.port"], None);
    }

    #[test]
    fn load_yaml_snapshot() {
        let mut tmpfile = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        write!(tmpfile, "api:\n  - name: api\n    id: t1\n    address: 10.0.0.7\n").unwrap();
        let groups = load_snapshot(tmpfile.path()).unwrap();
        assert_eq!(groups["api"][0].id, "t1");
    }

    #[test]
    fn missing_snapshot_is_an_error() {
        assert!(load_snapshot(Path::new("/nonexistent/snapshot.yaml")).is_err());
    }

    #[test]
    fn render_both_formats() {
        let cfg = DerivedConfiguration::default();
        let json = render(&cfg, OutputFormat::Json).unwrap();
        assert!(json.contains("\"backends\""));
        let yaml = render(&cfg, OutputFormat::Yaml).unwrap();
        assert!(yaml.contains("backends:"));
    }

    #[test]
    fn write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        write_output("{}", Some(&path)).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}");
    }
}
