use crate::common::error::{
    Error::{HelmCommand, HelmVersion, RegexCompile},
    Result,
};
use regex::bytes::Regex;
use std::process::Command;

/// Upgrades shell out to helm, so a v3 binary must be resolvable before any release is
/// touched.
pub(crate) fn validate_helmv3_in_path() -> Result<()> {
    let command: &str = "helm";
    let args: Vec<String> = vec!["version".to_string(), "--short".to_string()];
    let output = Command::new(command)
        .args(args.clone())
        .output()
        .map_err(|e| HelmCommand {
            source: e,
            command: command.to_string(),
            args,
        })?;

    let output = output.stdout;
    let regex: &str = r"^(v3\.[0-9]+\.[0-9])";
    if !Regex::new(regex)
        .map_err(|e| RegexCompile {
            source: e,
            expression: regex.to_string(),
        })?
        .is_match(output.as_slice())
    {
        return Err(HelmVersion { version: output });
    }

    Ok(())
}
