use std::path::{Path, PathBuf};

use image::Rgba;

use crate::components::tools::{
    BrushSettings, EraserSettings, FillSettings, ShapeSettings, TextSettings, Tool, ToolProperties,
};
use crate::error::Result;
use crate::log_warn;
use crate::ops::color_mix::{parse_hex, to_hex, MixStrategy};

const SETTINGS_FILE: &str = "paintsurface_settings.cfg";

/// Session defaults, persisted as `key=value` lines.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub background: Rgba<u8>,
    pub max_undo_steps: usize,
    pub brush_size: f32,
    pub brush_alpha: f32,
    pub brush_color: Rgba<u8>,
    pub brush_mix: Option<MixStrategy>,
    pub eraser_size: f32,
    pub shape_size: f32,
    pub shape_color: Rgba<u8>,
    pub text_size: f32,
    pub text_color: Rgba<u8>,
    pub text_font: String,
    pub fill_color: Rgba<u8>,
    /// 0 = unbounded.
    pub fill_budget: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let ink = Rgba([0x22, 0x22, 0x3b, 255]);
        Self {
            canvas_width: 800,
            canvas_height: 600,
            background: Rgba([255, 255, 255, 255]),
            max_undo_steps: 30,
            brush_size: 5.0,
            brush_alpha: 1.0,
            brush_color: ink,
            brush_mix: None,
            eraser_size: 20.0,
            shape_size: 3.0,
            shape_color: ink,
            text_size: 18.0,
            text_color: ink,
            text_font: "Segoe UI,Arial,DejaVu Sans".to_string(),
            fill_color: Rgba([255, 255, 255, 255]),
            fill_budget: 0,
        }
    }
}

impl Settings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/paintsurface/paintsurface_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\PaintSurface\paintsurface_settings.cfg
    /// On macOS:   ~/Library/Application Support/PaintSurface/paintsurface_settings.cfg
    /// Fallback:   same directory as the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("paintsurface");
            return Some(config_dir.join(SETTINGS_FILE));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("PaintSurface").join(SETTINGS_FILE));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("PaintSurface")
                    .join(SETTINGS_FILE),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe().ok().and_then(|p| p.parent().map(|d| d.join(SETTINGS_FILE)))
        }
    }

    /// Load from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from `path`.  A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Parse `key=value` lines.  Unknown keys are ignored; bad values keep
    /// their defaults.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            let ok = match key {
                "canvas_width" => set(&mut s.canvas_width, val.parse().ok().filter(|v| *v > 0)),
                "canvas_height" => set(&mut s.canvas_height, val.parse().ok().filter(|v| *v > 0)),
                "background" => set(&mut s.background, parse_hex(val)),
                "max_undo_steps" => set(&mut s.max_undo_steps, val.parse().ok().filter(|v| *v > 0)),
                "brush_size" => set(&mut s.brush_size, val.parse().ok()),
                "brush_alpha" => set(&mut s.brush_alpha, val.parse().ok()),
                "brush_color" => set(&mut s.brush_color, parse_hex(val)),
                "brush_mix" => {
                    if val.eq_ignore_ascii_case("none") || val.is_empty() {
                        s.brush_mix = None;
                        true
                    } else {
                        match val.parse::<MixStrategy>() {
                            Ok(m) => {
                                s.brush_mix = Some(m);
                                true
                            }
                            Err(_) => false,
                        }
                    }
                }
                "eraser_size" => set(&mut s.eraser_size, val.parse().ok()),
                "shape_size" => set(&mut s.shape_size, val.parse().ok()),
                "shape_color" => set(&mut s.shape_color, parse_hex(val)),
                "text_size" => set(&mut s.text_size, val.parse().ok()),
                "text_color" => set(&mut s.text_color, parse_hex(val)),
                "text_font" => {
                    s.text_font = val.to_string();
                    true
                }
                "fill_color" => set(&mut s.fill_color, parse_hex(val)),
                "fill_budget" => set(&mut s.fill_budget, val.parse().ok()),
                _ => true,
            };
            if !ok {
                log_warn!("Ignoring bad settings value {}={}", key, val);
            }
        }
        s
    }

    pub fn to_config_string(&self) -> String {
        let mix = self.brush_mix.map_or("none", |m| m.name());
        format!(
            "canvas_width={}\n\
             canvas_height={}\n\
             background={}\n\
             max_undo_steps={}\n\
             brush_size={}\n\
             brush_alpha={}\n\
             brush_color={}\n\
             brush_mix={mix}\n\
             eraser_size={}\n\
             shape_size={}\n\
             shape_color={}\n\
             text_size={}\n\
             text_color={}\n\
             text_font={}\n\
             fill_color={}\n\
             fill_budget={}\n",
            self.canvas_width,
            self.canvas_height,
            to_hex(self.background),
            self.max_undo_steps,
            self.brush_size,
            self.brush_alpha,
            to_hex(self.brush_color),
            self.eraser_size,
            self.shape_size,
            to_hex(self.shape_color),
            self.text_size,
            to_hex(self.text_color),
            self.text_font,
            to_hex(self.fill_color),
            self.fill_budget,
        )
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(path, self.to_config_string())?;
        Ok(())
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<()> {
        match Self::settings_path() {
            Some(path) => self.save_to(&path),
            None => Ok(()),
        }
    }

    /// Initial tool parameters for a session.
    pub fn tool_properties(&self) -> ToolProperties {
        ToolProperties {
            tool: Tool::Brush,
            brush: BrushSettings {
                size: self.brush_size,
                alpha: self.brush_alpha,
                color: self.brush_color,
                mix: self.brush_mix,
            },
            eraser: EraserSettings { size: self.eraser_size },
            shape: ShapeSettings { size: self.shape_size, color: self.shape_color },
            text: TextSettings {
                size: self.text_size,
                color: self.text_color,
                font_families: self.text_font.clone(),
            },
            fill: FillSettings {
                color: self.fill_color,
                budget: (self.fill_budget > 0).then_some(self.fill_budget),
            },
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = v;
            true
        }
        None => false,
    }
}
