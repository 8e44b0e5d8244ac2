use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub ocr_language: String,
    pub render_scale: f32,
    pub ocr_page_segmentation_mode: u32,
    pub ocr_worker_limit: usize,
    pub ocr_normalize: bool,
    pub ocr_min_confidence: f32,
    pub ocr_first_page: Option<u32>,
    pub ocr_last_page: Option<u32>,
    pub line_tolerance_text: f32,
    pub line_tolerance_ocr: f32,
    pub column_split_margin: f32,
    pub gutter_gap: f32,
    pub key_pair_density_threshold: usize,
    pub batch_concurrency: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ocr_language: "eng".to_string(),
            render_scale: 4.5,
            ocr_page_segmentation_mode: 4,
            ocr_worker_limit: 0,
            ocr_normalize: true,
            ocr_min_confidence: 0.0,
            ocr_first_page: None,
            ocr_last_page: None,
            line_tolerance_text: 3.0,
            line_tolerance_ocr: 14.0,
            column_split_margin: 0.08,
            gutter_gap: 2.5,
            key_pair_density_threshold: 5,
            batch_concurrency: 2,
        }
    }
}

impl Settings {
    pub fn render_dpi(&self) -> u32 {
        (72.0 * self.render_scale).round().max(72.0) as u32
    }

    pub fn ocr_workers(&self) -> usize {
        if self.ocr_worker_limit == 0 {
            num_cpus::get().max(1)
        } else {
            self.ocr_worker_limit
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    ocr: Option<OcrSettings>,
    layout: Option<LayoutSettings>,
    answer_key: Option<AnswerKeySettings>,
    batch: Option<BatchSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    language: Option<String>,
    render_scale: Option<f32>,
    page_segmentation_mode: Option<u32>,
    workers: Option<usize>,
    normalize: Option<bool>,
    min_confidence: Option<f32>,
    first_page: Option<u32>,
    last_page: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LayoutSettings {
    line_tolerance_text: Option<f32>,
    line_tolerance_ocr: Option<f32>,
    column_split_margin: Option<f32>,
    gutter_gap: Option<f32>,
}

#[derive(Debug, Default, Deserialize)]
struct AnswerKeySettings {
    pair_density_threshold: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct BatchSettings {
    concurrency: Option<usize>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    ensure_home_settings_file()?;

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings
                .merge_str(&content)
                .with_context(|| format!("failed to parse settings: {}", path.display()))?;
        }
    }

    Ok(settings)
}

impl Settings {
    pub fn merge_str(&mut self, content: &str) -> Result<()> {
        let parsed: SettingsFile = toml::from_str(content)?;
        self.merge(parsed);
        Ok(())
    }

    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(ocr) = incoming.ocr {
            if let Some(language) = ocr.language {
                if !language.trim().is_empty() {
                    self.ocr_language = language.trim().to_string();
                }
            }
            if let Some(scale) = ocr.render_scale {
                if scale > 0.0 {
                    self.render_scale = scale;
                }
            }
            if let Some(psm) = ocr.page_segmentation_mode {
                if psm <= 13 {
                    self.ocr_page_segmentation_mode = psm;
                }
            }
            if let Some(workers) = ocr.workers {
                self.ocr_worker_limit = workers;
            }
            if let Some(normalize) = ocr.normalize {
                self.ocr_normalize = normalize;
            }
            if let Some(conf) = ocr.min_confidence {
                if (0.0..=100.0).contains(&conf) {
                    self.ocr_min_confidence = conf;
                }
            }
            if let Some(page) = ocr.first_page {
                self.ocr_first_page = (page > 0).then_some(page);
            }
            if let Some(page) = ocr.last_page {
                self.ocr_last_page = (page > 0).then_some(page);
            }
        }
        if let Some(layout) = incoming.layout {
            if let Some(tolerance) = layout.line_tolerance_text {
                if tolerance > 0.0 {
                    self.line_tolerance_text = tolerance;
                }
            }
            if let Some(tolerance) = layout.line_tolerance_ocr {
                if tolerance > 0.0 {
                    self.line_tolerance_ocr = tolerance;
                }
            }
            if let Some(margin) = layout.column_split_margin {
                if (0.0..0.5).contains(&margin) {
                    self.column_split_margin = margin;
                }
            }
            if let Some(gap) = layout.gutter_gap {
                if gap > 0.0 {
                    self.gutter_gap = gap;
                }
            }
        }
        if let Some(key) = incoming.answer_key {
            if let Some(threshold) = key.pair_density_threshold {
                if threshold > 0 {
                    self.key_pair_density_threshold = threshold;
                }
            }
        }
        if let Some(batch) = incoming.batch {
            if let Some(concurrency) = batch.concurrency {
                if concurrency > 0 {
                    self.batch_concurrency = concurrency;
                }
            }
        }
    }
}

fn ensure_home_settings_file() -> Result<()> {
    let Some(home) = home_dir() else {
        return Ok(());
    };
    fs::create_dir_all(&home)
        .with_context(|| format!("failed to create settings directory: {}", home.display()))?;
    let path = home.join("settings.toml");
    if !path.exists() {
        fs::write(&path, DEFAULT_SETTINGS_TOML)
            .with_context(|| format!("failed to write settings: {}", path.display()))?;
    }
    Ok(())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".quiz-sheet-extract"))
        }
    })
}
