//! Declared configuration loaded from a directory of TOML files.

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use fs_err as fs;
use repoconf_types::DesiredConfig;
use tracing::debug;

/// Read every `*.toml` file in `dir`, in file-name order, merge them and validate the result.
///
/// A directory without configuration files yields an empty configuration.
pub fn read_config_dir(dir: &Utf8Path) -> anyhow::Result<DesiredConfig> {
    let mut config = DesiredConfig::default();

    for path in config_files(dir)? {
        let text = fs::read_to_string(&path).with_context(|| format!("read {}", path))?;
        let part: DesiredConfig =
            toml::from_str(&text).with_context(|| format!("parse {}", path))?;

        debug!(
            path = %path,
            documents = part.documents.len(),
            schema_sets = part.schema_sets.len(),
            metrics = part.metrics.len(),
            "loaded configuration file"
        );
        config.merge(part);
    }

    config
        .validate()
        .with_context(|| format!("invalid configuration in {}", dir))?;

    Ok(config)
}

fn config_files(dir: &Utf8Path) -> anyhow::Result<Vec<Utf8PathBuf>> {
    let pattern = dir.join("*.toml");
    let mut files = Vec::new();

    for entry in glob::glob(pattern.as_str()).with_context(|| format!("glob {}", pattern))? {
        let path = entry.with_context(|| format!("list {}", dir))?;
        let path = Utf8PathBuf::from_path_buf(path)
            .map_err(|p| anyhow::anyhow!("non-UTF-8 path {}", p.display()))?;
        if path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use repoconf_types::config::MetricAggregation;
    use tempfile::TempDir;

    fn temp_dir() -> (TempDir, Utf8PathBuf) {
        let temp = TempDir::new().expect("temp dir");
        let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8");
        (temp, dir)
    }

    #[test]
    fn merges_files_in_name_order() {
        let (_temp, dir) = temp_dir();
        fs::write(
            dir.join("b-planning.toml"),
            r#"
[[document]]
type = "core/planning"
statuses = ["usable"]
"#,
        )
        .expect("write");
        fs::write(
            dir.join("a-article.toml"),
            r#"
[[schema_set]]
name = "core"
version = "v1.0.0"
url_template = "https://schemas.example.com/{version}/{name}.json"
schemas = ["core", "core-planning"]

[[document]]
type = "core/article"
meta_doc = "core/article-meta"
statuses = ["usable", "done"]
bounded_collection = true

[document.workflow]
step_zero = "draft"
checkpoint = "usable"
negative_checkpoint = "unpublished"
steps = ["done", "approved"]

[[document.time_expression]]
expression = ".meta(type='core/assignment').data(start)"
layout = "2006-01-02"

[[metric]]
kind = "charcount"
aggregation = "increment"
"#,
        )
        .expect("write");
        fs::write(dir.join("schema.lock.json"), "{}").expect("write");

        let config = read_config_dir(&dir).expect("read config");

        let types: Vec<&str> = config
            .documents
            .iter()
            .map(|d| d.doc_type.as_str())
            .collect();
        assert_eq!(types, vec!["core/article", "core/planning"]);

        let article = &config.documents[0];
        assert_eq!(article.meta_type(), Some("core/article-meta"));
        assert!(article.bounded_collection);
        assert_eq!(article.time_expressions.len(), 1);
        assert_eq!(
            article.workflow.as_ref().map(|w| w.steps.clone()),
            Some(vec!["done".to_string(), "approved".to_string()])
        );
        assert_eq!(
            config.metrics[0].effective_aggregation(),
            MetricAggregation::Increment
        );
        assert_eq!(config.schema_sets[0].schemas.len(), 2);
    }

    #[test]
    fn empty_directory_is_empty_config() {
        let (_temp, dir) = temp_dir();
        assert_eq!(
            read_config_dir(&dir).expect("read config"),
            DesiredConfig::default()
        );
    }

    #[test]
    fn duplicate_types_across_files_are_rejected() {
        let (_temp, dir) = temp_dir();
        for name in ["one.toml", "two.toml"] {
            fs::write(dir.join(name), "[[document]]\ntype = \"core/article\"\n").expect("write");
        }

        let err = read_config_dir(&dir).unwrap_err();
        assert!(
            format!("{err:#}").contains("document type \"core/article\" is declared more than once")
        );
    }

    #[test]
    fn unknown_aggregation_is_a_parse_error() {
        let (_temp, dir) = temp_dir();
        fs::write(
            dir.join("metrics.toml"),
            "[[metric]]\nkind = \"charcount\"\naggregation = \"sum\"\n",
        )
        .expect("write");

        let err = read_config_dir(&dir).unwrap_err();
        assert!(err.to_string().starts_with("parse "));
    }
}
