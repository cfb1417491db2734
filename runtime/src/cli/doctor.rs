//! Environment readiness check.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::config::{presence_report, resolve_download_dir};
use crate::renderer::chromium::find_chromium;

/// Result of one readiness check.
#[derive(Debug, Clone, Serialize)]
pub struct Check {
    pub name: String,
    pub ok: bool,
    pub detail: String,
}

/// Collect every check. Variable values are never included.
pub fn checks(download_dir: &Path) -> Vec<Check> {
    let mut checks = Vec::new();

    let chromium = find_chromium();
    checks.push(Check {
        name: "chromium".into(),
        ok: chromium.is_some(),
        detail: match &chromium {
            Some(path) => path.display().to_string(),
            None => "not found; set CARTEIRA_CHROMIUM_PATH".into(),
        },
    });

    let writable = dir_is_writable(download_dir);
    checks.push(Check {
        name: "download_dir".into(),
        ok: writable,
        detail: download_dir.display().to_string(),
    });

    for (var, present) in presence_report(|k| std::env::var(k).ok()) {
        checks.push(Check {
            name: var.to_string(),
            ok: present,
            detail: if present { "set" } else { "missing" }.into(),
        });
    }

    checks
}

fn dir_is_writable(dir: &Path) -> bool {
    if std::fs::create_dir_all(dir).is_err() {
        return false;
    }
    let probe = dir.join(".carteira-doctor");
    let ok = std::fs::write(&probe, b"ok").is_ok();
    let _ = std::fs::remove_file(&probe);
    ok
}

/// Check Chromium, the download directory and the required variables.
pub async fn run(download_dir: Option<PathBuf>, json: bool) -> Result<()> {
    let download_dir = resolve_download_dir(download_dir);
    let checks = checks(&download_dir);
    let ready = checks.iter().all(|c| c.ok);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "ready": ready,
                "checks": checks,
            }))?
        );
        return Ok(());
    }

    println!("Carteira Doctor");
    println!("===============");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();
    for check in &checks {
        let mark = if check.ok { "[OK]" } else { "[!!]" };
        println!("{mark} {:<22} {}", check.name, check.detail);
    }
    println!();
    if ready {
        println!("Status: READY");
    } else {
        println!("Status: NOT READY");
    }

    Ok(())
}
