//! Directory structure and file generation for `.contentflow` initialization.

use super::error::{InitError, InitResult};
use super::templates::{get_template, list_templates};
use crate::config::loader::CONFIG_DIR;
use cf_protocol::pipeline_models::PipelineDefinition;
use std::fs;
use std::path::{Path, PathBuf};

/// Pipeline written by `--minimal`.
const MINIMAL_PIPELINE: &str = "pipelines/social-post.yaml";

/// Options for initializing a `.contentflow` directory.
#[derive(Debug, Clone)]
pub struct InitOptions {
    /// Target directory where `.contentflow` will be created.
    pub target_dir: PathBuf,

    /// Overwrite existing `.contentflow` directory if it exists.
    pub force: bool,

    /// Only scaffold the social-post pipeline and its stages.
    pub minimal: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            target_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            force: false,
            minimal: false,
        }
    }
}

/// Generate a `.contentflow` directory structure with templates.
///
/// This function creates the following structure:
/// ```text
/// .contentflow/
/// ├── config.toml
/// ├── stages/
/// │   └── *.md
/// └── pipelines/
///     ├── blog-post.yaml    (unless minimal)
///     └── social-post.yaml
/// ```
///
/// Returns the paths written, relative to `.contentflow/`.
///
/// # Errors
///
/// Returns an `InitError` if:
/// - The `.contentflow` directory already exists (without force flag)
/// - A template file cannot be found or parsed
/// - File system operations fail
pub async fn generate_contentflow_structure(options: InitOptions) -> InitResult<Vec<String>> {
    let cf_dir = options.target_dir.join(CONFIG_DIR);

    if cf_dir.exists() && !options.force {
        return Err(InitError::DirectoryExists(cf_dir));
    }

    for sub_dir in ["stages", "pipelines"] {
        let path = cf_dir.join(sub_dir);
        fs::create_dir_all(&path).map_err(|source| InitError::DirectoryCreate { path, source })?;
    }

    let templates = if options.minimal {
        minimal_templates()?
    } else {
        list_templates("")
    };

    for template_path in &templates {
        write_template_file(&cf_dir, template_path)?;
    }

    tracing::info!(
        files = templates.len(),
        minimal = options.minimal,
        "Initialized {}",
        cf_dir.display()
    );
    Ok(templates)
}

/// `config.toml`, the minimal pipeline and the stages it references.
fn minimal_templates() -> InitResult<Vec<String>> {
    let content = get_template(MINIMAL_PIPELINE)
        .ok_or_else(|| InitError::TemplateNotFound(MINIMAL_PIPELINE.to_string()))?;
    let pipeline: PipelineDefinition =
        serde_yaml::from_str(&content).map_err(|source| InitError::InvalidTemplate {
            path: MINIMAL_PIPELINE.to_string(),
            source,
        })?;

    let mut templates = vec!["config.toml".to_string(), MINIMAL_PIPELINE.to_string()];
    templates.extend(
        pipeline
            .stages
            .iter()
            .map(|stage| format!("stages/{stage}.md")),
    );
    Ok(templates)
}

fn write_template_file(cf_dir: &Path, template_path: &str) -> InitResult<()> {
    let content = get_template(template_path)
        .ok_or_else(|| InitError::TemplateNotFound(template_path.to_string()))?;

    let target_path = cf_dir.join(template_path);

    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent).map_err(|source| InitError::DirectoryCreate {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    fs::write(&target_path, content).map_err(|source| InitError::FileWrite {
        path: target_path,
        source,
    })
}
