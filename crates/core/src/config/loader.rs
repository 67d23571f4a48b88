//! Configuration file loader for `.contentflow/` directory structure.
//!
//! This module provides functionality to load and parse all configuration files
//! from the `.contentflow/` directory, including:
//! - `config.toml`: Global settings
//! - `stages/*.md`: Stage definitions with YAML front matter
//! - `pipelines/*.yaml`: Pipeline definitions

use crate::config::error::ConfigError;
use crate::config::error::ConfigResult;
use crate::config::models::AppConfig;
use cf_protocol::config_models::GlobalConfig;
use cf_protocol::pipeline_models::PipelineDefinition;
use cf_protocol::stage_models::{StageDefinition, StageKind};
use gray_matter::engine::YAML;
use gray_matter::Matter;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the configuration directory under the project root.
pub const CONFIG_DIR: &str = ".contentflow";

/// Loads all configuration from the `.contentflow/` directory.
///
/// Missing directories or files yield defaults rather than errors. Files are
/// read in file-name order so the result does not depend on the file system.
///
/// # Errors
///
/// Returns `ConfigError` if:
/// - Files exist but cannot be read
/// - Files have invalid syntax (TOML, YAML, or Markdown front matter)
/// - Two stages or two pipelines share a name
/// - A pipeline references a stage that is not defined
/// - A `command` stage has no `command` block
///
/// # Example
///
/// ```rust,no_run
/// use cf_core::config::loader::load_config;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new(".")).await?;
/// println!("Loaded {} stages", config.stages.len());
/// # Ok(())
/// # }
/// ```
pub async fn load_config(root: &Path) -> ConfigResult<AppConfig> {
    let cf_dir = root.join(CONFIG_DIR);

    if !cf_dir.exists() {
        return Ok(AppConfig::default());
    }

    let global = load_global_config(&cf_dir)?;
    let stages = load_stages(&cf_dir)?;
    let pipelines = load_pipelines(&cf_dir)?;

    let config = AppConfig {
        global,
        stages,
        pipelines,
    };
    validate(&cf_dir, &config)?;

    tracing::debug!(
        stages = config.stages.len(),
        pipelines = config.pipelines.len(),
        "Loaded configuration from {}",
        cf_dir.display()
    );
    Ok(config)
}

/// Loads global configuration from `config.toml`.
fn load_global_config(cf_dir: &Path) -> ConfigResult<GlobalConfig> {
    let config_path = cf_dir.join("config.toml");

    if !config_path.exists() {
        return Ok(GlobalConfig::default());
    }

    let content =
        std::fs::read_to_string(&config_path).map_err(|source| ConfigError::FileRead {
            path: config_path.clone(),
            source,
        })?;

    toml::from_str(&content).map_err(|source| ConfigError::TomlParse {
        path: config_path,
        source,
    })
}

/// Files directly inside `dir` with one of `extensions`, sorted by name.
fn config_files(dir: &Path, extensions: &[&str]) -> ConfigResult<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|source| ConfigError::DirectoryWalk {
            path: dir.to_path_buf(),
            source,
        })?;

        let path = entry.path();
        let ext = path.extension().and_then(|s| s.to_str());
        if ext.is_some_and(|ext| extensions.contains(&ext)) {
            files.push(path.to_path_buf());
        }
    }
    Ok(files)
}

/// Loads all stage definitions from `stages/*.md`.
fn load_stages(cf_dir: &Path) -> ConfigResult<Vec<StageDefinition>> {
    let matter = Matter::<YAML>::new();
    let mut stages = Vec::new();

    for path in config_files(&cf_dir.join("stages"), &["md"])? {
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
            path: path.clone(),
            source,
        })?;

        let result = matter.parse(&content);
        let mut stage: StageDefinition = result
            .data
            .ok_or_else(|| ConfigError::MarkdownParse {
                path: path.clone(),
                reason: "Missing YAML front matter".to_string(),
            })?
            .deserialize()
            .map_err(|e| ConfigError::MarkdownParse {
                path: path.clone(),
                reason: format!("Failed to deserialize front matter: {}", e),
            })?;

        if stage.kind == StageKind::Command && stage.command.is_none() {
            return Err(ConfigError::InvalidConfig {
                path,
                reason: format!("stage '{}' has kind 'command' but no command block", stage.name),
            });
        }

        stage.prompt = result.content;
        stages.push(stage);
    }

    Ok(stages)
}

/// Loads all pipeline definitions from `pipelines/*.yaml` and `*.yml`.
fn load_pipelines(cf_dir: &Path) -> ConfigResult<Vec<PipelineDefinition>> {
    let mut pipelines = Vec::new();

    for path in config_files(&cf_dir.join("pipelines"), &["yaml", "yml"])? {
        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::FileRead {
            path: path.clone(),
            source,
        })?;

        let pipeline: PipelineDefinition =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::YamlParse {
                path: path.clone(),
                source,
            })?;

        pipelines.push(pipeline);
    }

    Ok(pipelines)
}

fn validate(cf_dir: &Path, config: &AppConfig) -> ConfigResult<()> {
    let mut stage_names = HashSet::new();
    for stage in &config.stages {
        if !stage_names.insert(stage.name.as_str()) {
            return Err(ConfigError::InvalidConfig {
                path: cf_dir.join("stages"),
                reason: format!("stage '{}' is defined more than once", stage.name),
            });
        }
    }

    let mut content_types = HashSet::new();
    for pipeline in &config.pipelines {
        if !content_types.insert(pipeline.content_type.as_str()) {
            return Err(ConfigError::InvalidConfig {
                path: cf_dir.join("pipelines"),
                reason: format!(
                    "content type '{}' has more than one pipeline",
                    pipeline.content_type
                ),
            });
        }
        if let Some(unknown) = pipeline
            .stages
            .iter()
            .find(|name| !stage_names.contains(name.as_str()))
        {
            return Err(ConfigError::InvalidConfig {
                path: cf_dir.join("pipelines"),
                reason: format!(
                    "pipeline '{}' references unknown stage '{}'",
                    pipeline.content_type, unknown
                ),
            });
        }
    }

    Ok(())
}
