//! In-process fakes for the browser and object store.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use anyhow::Result;
use async_trait::async_trait;
use carteira_runtime::download::DownloadOptions;
use carteira_runtime::publish::ObjectStore;
use carteira_runtime::renderer::{BrowserLauncher, NavigationResult, RenderContext, Renderer};

pub const SAMPLE_REPORT: &str = "\
Setor;Código;Ação;Tipo;Qtde. Teórica;Part. (%);
Bens Indls;EMBR3;EMBRAER;ON NM;734.588.205;0,896;
Financeiro;ITUB4;ITAUUNIBANCO;PN N1;4.801.593.832;7,785;
Materiais Básicos;VALE3;VALE;ON NM;3.888.659.713;11,312;
Quantidade Teórica Total;98.417.532.421;;;;
Redutor;15.966.145,84;;;;
";

/// Encode text the way the report is served.
pub fn latin1(text: &str) -> Vec<u8> {
    text.chars().map(|c| c as u32 as u8).collect()
}

pub fn write_report(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, latin1(SAMPLE_REPORT)).unwrap();
    path
}

/// Write a report and push its modification time into the past.
pub fn write_stale_report(dir: &Path, name: &str) -> PathBuf {
    let path = write_report(dir, name);
    let file = std::fs::File::options().write(true).open(&path).unwrap();
    file.set_modified(SystemTime::now() - Duration::from_secs(86_400))
        .unwrap();
    path
}

/// Short waits so tests finish quickly.
pub fn fast_options(dir: &Path) -> DownloadOptions {
    let mut options = DownloadOptions::new(dir.to_path_buf(), Duration::from_secs(3));
    options.watch.poll_interval = Duration::from_millis(50);
    options.element_wait = Duration::from_millis(300);
    options.element_poll = Duration::from_millis(50);
    options
}

/// What the fake page does.
#[derive(Debug, Clone)]
pub enum PageBehavior {
    /// Clicking the link writes `file_name` after `delay`.
    Downloads { file_name: String, delay: Duration },
    /// The segment selector never renders.
    MissingSelect,
    /// Clicking works but nothing is ever written.
    NoDownload,
}

#[derive(Default)]
pub struct Calls {
    pub launches: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub selections: Mutex<Vec<(String, String)>>,
    pub clicks: Mutex<Vec<String>>,
}

impl Calls {
    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

pub struct FakeLauncher {
    pub behavior: PageBehavior,
    pub calls: Arc<Calls>,
}

impl FakeLauncher {
    pub fn new(behavior: PageBehavior) -> Self {
        Self {
            behavior,
            calls: Arc::new(Calls::default()),
        }
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, download_dir: &Path) -> Result<Box<dyn Renderer>> {
        self.calls.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeRenderer {
            download_dir: download_dir.to_path_buf(),
            behavior: self.behavior.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }
}

struct FakeRenderer {
    download_dir: PathBuf,
    behavior: PageBehavior,
    calls: Arc<Calls>,
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Ok(Box::new(FakeContext {
            download_dir: self.download_dir.clone(),
            behavior: self.behavior.clone(),
            calls: Arc::clone(&self.calls),
        }))
    }

    async fn shutdown(&mut self) -> Result<()> {
        self.calls.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakeContext {
    download_dir: PathBuf,
    behavior: PageBehavior,
    calls: Arc<Calls>,
}

#[async_trait]
impl RenderContext for FakeContext {
    async fn navigate(&mut self, url: &str, _timeout_ms: u64) -> Result<NavigationResult> {
        self.calls.navigations.lock().unwrap().push(url.to_string());
        Ok(NavigationResult {
            final_url: url.to_string(),
            load_time_ms: 1,
        })
    }

    async fn execute_js(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "success": true }))
    }

    async fn select_option(&self, element_id: &str, value: &str) -> Result<bool> {
        if matches!(self.behavior, PageBehavior::MissingSelect) {
            return Ok(false);
        }
        self.calls
            .selections
            .lock()
            .unwrap()
            .push((element_id.to_string(), value.to_string()));
        Ok(true)
    }

    async fn click_link(&self, text: &str) -> Result<bool> {
        self.calls.clicks.lock().unwrap().push(text.to_string());
        if let PageBehavior::Downloads { file_name, delay } = &self.behavior {
            let target = self.download_dir.join(file_name);
            let partial = self.download_dir.join(format!("{file_name}.crdownload"));
            let delay = *delay;
            // Browsers write to a temporary name and rename when complete.
            std::thread::spawn(move || {
                std::thread::sleep(delay);
                std::fs::write(&partial, latin1(SAMPLE_REPORT)).unwrap();
                std::fs::rename(&partial, &target).unwrap();
            });
        }
        Ok(true)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

/// Records uploads in memory.
#[derive(Default)]
pub struct MemoryStore {
    pub uploads: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn keys(&self) -> Vec<String> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_file(&self, local: &Path, key: &str) -> Result<()> {
        anyhow::ensure!(local.exists(), "{} does not exist", local.display());
        self.uploads.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn location(&self, key: &str) -> String {
        format!("mem://{key}")
    }
}
