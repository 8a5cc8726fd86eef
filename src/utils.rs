use indicatif::ProgressStyle;
use indicatif::style::TemplateError;

const INVOCATION_TEMPLATE: &str = "{spinner:.green} [{elapsed}] [{bar:30.cyan/blue}] {pos:>3}% {msg}";

/// Progress bar style for a single invocation, measured in percent.
pub(crate) fn get_style_invocation() -> Result<ProgressStyle, TemplateError> {
    get_style(INVOCATION_TEMPLATE)
}

fn get_style(template: &str) -> Result<ProgressStyle, TemplateError> {
    Ok(ProgressStyle::with_template(template)?.progress_chars("=>-"))
}
