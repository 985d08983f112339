use anyhow::{Result, anyhow};
use directories::UserDirs;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Display width the threshold values in a profile are authored for.
pub const REFERENCE_WIDTH: f32 = 1024.0;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Meta {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Thresholds {
    /// Travel from the press position before a press becomes a drag.
    pub drag_threshold: f32,
    /// Travel from the drag start needed for a release to count as a flick.
    pub flick_threshold: f32,
    /// Seconds after drag start within which a release may still flick.
    pub flick_time: f32,
    pub max_pointer_count: usize,
    /// Not consulted by the recognizer; carried so profiles round-trip.
    pub tap_max_allowed_drag: f32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            drag_threshold: 5.0,
            flick_threshold: 10.0,
            flick_time: 0.5,
            max_pointer_count: 10,
            tap_max_allowed_drag: 3.0,
        }
    }
}

impl Thresholds {
    /// Scale length thresholds from [`REFERENCE_WIDTH`] to `width`.
    pub fn scaled_to_width(&self, width: f32) -> Thresholds {
        let k = width / REFERENCE_WIDTH;
        Thresholds {
            drag_threshold: self.drag_threshold * k,
            flick_threshold: self.flick_threshold * k,
            tap_max_allowed_drag: self.tap_max_allowed_drag * k,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Display {
    pub width: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Profile {
    pub meta: Meta,
    #[serde(default)]
    pub thresholds: Thresholds,
    pub display: Option<Display>,
}

impl Profile {
    pub fn parse(txt: &str) -> Result<Profile> {
        let profile: Profile = toml::from_str(txt)?;
        validate_profile(&profile)?;
        Ok(profile)
    }

    pub fn load_file(path: &Path) -> Result<Profile> {
        let txt = fs::read_to_string(path)
            .map_err(|e| anyhow!("failed to read {}: {e}", path.display()))?;
        Profile::parse(&txt).map_err(|e| anyhow!("failed to parse {}: {e}", path.display()))
    }

    /// Thresholds as the recognizer should see them, display scaling applied.
    pub fn effective_thresholds(&self) -> Thresholds {
        match &self.display {
            Some(d) => self.thresholds.scaled_to_width(d.width),
            None => self.thresholds.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ConfigState {
    pub active_name: String,
    pub profile: Profile,
    pub config_dir: PathBuf,
    pub profiles_dir: PathBuf,
    pub active_ptr: PathBuf,
}

pub fn config_dir() -> Result<PathBuf> {
    let dirs = UserDirs::new().ok_or_else(|| anyhow!("could not determine home directory"))?;
    Ok(dirs.home_dir().join(".config").join("gesturectl"))
}

fn default_profile_text() -> &'static str {
    include_str!("../profiles/default.toml")
}

impl ConfigState {
    pub fn load_or_install_default() -> Result<Self> {
        Self::load_or_install_in(config_dir()?)
    }

    /// Same as [`load_or_install_default`](Self::load_or_install_default)
    /// rooted at an explicit directory.
    pub fn load_or_install_in(cfgdir: PathBuf) -> Result<Self> {
        let profdir = cfgdir.join("profiles");
        fs::create_dir_all(&profdir)?;

        let def_path = profdir.join("default.toml");
        if !def_path.exists() {
            fs::write(&def_path, default_profile_text())?;
            info!("installed default profile at {}", def_path.display());
        }

        let active_ptr = cfgdir.join("active");
        if !active_ptr.exists() {
            fs::write(&active_ptr, b"default")?;
        }

        let active_name = fs::read_to_string(&active_ptr)?.trim().to_string();
        let profile = Profile::load_file(&profdir.join(format!("{active_name}.toml")))?;
        debug!("loaded profile '{active_name}'");

        Ok(Self {
            active_name,
            profile,
            config_dir: cfgdir,
            profiles_dir: profdir,
            active_ptr,
        })
    }

    fn profile_path(&self, name: &str) -> PathBuf {
        self.profiles_dir.join(format!("{name}.toml"))
    }

    /// Load a profile by name without making it active.
    pub fn load_named(&self, name: &str) -> Result<Profile> {
        let p = self.profile_path(name);
        if !p.exists() {
            return Err(anyhow!("profile not found: {}", p.display()));
        }
        Profile::load_file(&p)
    }

    pub fn set_active(&mut self, name: &str) -> Result<()> {
        self.profile = self.load_named(name)?;
        fs::write(&self.active_ptr, name.as_bytes())?;
        self.active_name = name.to_string();
        Ok(())
    }

    pub fn list_profiles(&self) -> Vec<String> {
        let mut v = Vec::new();
        if let Ok(rd) = fs::read_dir(&self.profiles_dir) {
            for e in rd.flatten() {
                let path = e.path();
                if path.extension().is_some_and(|ext| ext == "toml") {
                    if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                        v.push(stem.to_string());
                    }
                }
            }
        }
        v.sort();
        v
    }
}

fn validate_profile(p: &Profile) -> Result<()> {
    let th = &p.thresholds;
    for (name, val) in [
        ("drag_threshold", th.drag_threshold),
        ("flick_threshold", th.flick_threshold),
        ("tap_max_allowed_drag", th.tap_max_allowed_drag),
    ] {
        if !val.is_finite() || val < 0.0 {
            return Err(anyhow!("thresholds.{name} must be a non-negative number"));
        }
    }
    if !th.flick_time.is_finite() || th.flick_time <= 0.0 {
        return Err(anyhow!("thresholds.flick_time must be a positive duration"));
    }
    // mouse fallback drives ids 0 and 1
    if th.max_pointer_count < 2 {
        return Err(anyhow!("thresholds.max_pointer_count must be at least 2"));
    }
    if let Some(d) = &p.display {
        if !d.width.is_finite() || d.width <= 0.0 {
            return Err(anyhow!("display.width must be positive"));
        }
    }
    Ok(())
}
