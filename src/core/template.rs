use std::fs;
use std::path::Path;

use once_cell::sync::Lazy;
use regex::{NoExpand, Regex};

use crate::core::error::TemplateError;

pub const MSIN_WIDTH: usize = 10;

static RE_MSIN: Lazy<Regex> = Lazy::new(|| Regex::new(r#"msin: "\d+""#).unwrap());

/// Substitute `msin` into every identity field of `template`.
pub fn render_identity(template: &str, msin: u64) -> Result<String, TemplateError> {
    if !RE_MSIN.is_match(template) {
        return Err(TemplateError::MissingField);
    }

    let field = format!("msin: \"{msin:0width$}\"", width = MSIN_WIDTH);
    Ok(RE_MSIN
        .replace_all(template, NoExpand(&field))
        .into_owned())
}

pub fn write_config(template_path: &Path, msin: u64, output_path: &Path) -> Result<(), TemplateError> {
    let template = fs::read_to_string(template_path).map_err(|source| TemplateError::Unreadable {
        path: template_path.to_path_buf(),
        source,
    })?;

    let rendered = render_identity(&template, msin)?;

    fs::write(output_path, rendered).map_err(|source| TemplateError::Unwritable {
        path: output_path.to_path_buf(),
        source,
    })
}
