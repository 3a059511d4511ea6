//! Executable wrapper: activate the runtime environment, then exec the job.

use crate::spec::Environment;
use anyhow::Context;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

const OWNER_RWX: u32 = 0o700;

/// Write the wrapper script at `path`, truncating any previous file.
///
/// The wrapper forwards its positional arguments with `"$@"`, so argument
/// boundaries chosen by the scheduler survive untouched.
pub fn build_wrapper(path: &Path, env: &Environment) -> anyhow::Result<()> {
    let text = render_wrapper(env);

    let mut opts = OpenOptions::new();
    opts.write(true).create(true).truncate(true);
    #[cfg(unix)]
    opts.mode(OWNER_RWX);

    let mut file = opts
        .open(path)
        .with_context(|| format!("create wrapper {}", path.display()))?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("write wrapper {}", path.display()))?;

    // `mode` only applies on creation; an existing file keeps its old bits.
    #[cfg(unix)]
    file.set_permissions(std::fs::Permissions::from_mode(OWNER_RWX))
        .with_context(|| format!("chmod wrapper {}", path.display()))?;

    Ok(())
}

pub fn render_wrapper(env: &Environment) -> String {
    let mut lines = vec!["#!/usr/bin/env bash".to_string()];

    match env {
        Environment::None => {}
        Environment::Virtual { path } => {
            lines.push(format!("source {}", shell_quote(&path.join("bin/activate"))));
        }
        Environment::Managed { root, name } => {
            lines.push(format!(
                "source {}",
                shell_quote(&root.join("etc/profile.d/conda.sh"))
            ));
            match name {
                Some(n) => lines.push(format!("conda activate {}", shell_quote(Path::new(n)))),
                None => lines.push("conda activate".to_string()),
            }
        }
    }

    lines.push(r#"exec "$@""#.to_string());

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// Single-quote a path for bash.
fn shell_quote(p: &Path) -> String {
    let s = p.to_string_lossy();
    format!("'{}'", s.replace('\'', r"'\''"))
}
