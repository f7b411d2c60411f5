use std::env;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

use crate::style::AttributeColor;

#[derive(Debug, Default, Deserialize, Serialize, Clone)]
pub struct ConfigFile {
    pub page_size: Option<u64>,
    pub pages: Option<u64>,
    pub catalog_url: Option<String>,
    pub sprite_url: Option<String>,
    pub timeout: Option<u64>,
    pub proxy: Option<String>,
    pub output: Option<String>,
    pub output_format: Option<String>,
    pub no_color: Option<bool>,
    #[serde(alias = "type_colors")]
    pub attribute_colors: Option<Vec<AttributeColor>>,
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(|| env::var_os("USERPROFILE").map(PathBuf::from))
        .or_else(|| {
            let drive = env::var_os("HOMEDRIVE")?;
            let path = env::var_os("HOMEPATH")?;
            Some(PathBuf::from(drive).join(path))
        })
}

pub fn default_config_path() -> Option<PathBuf> {
    Some(home_dir()?.join(".dexgallery").join("config.yml"))
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(home) = home_dir() {
            return home.join(stripped);
        }
    }
    PathBuf::from(path)
}

pub fn parse_config(contents: &str) -> Result<ConfigFile, String> {
    serde_yaml::from_str::<ConfigFile>(contents).map_err(|e| e.to_string())
}

pub fn load_config(path: &PathBuf, allow_missing: bool) -> Result<ConfigFile, String> {
    match std::fs::read_to_string(path) {
        Ok(contents) => parse_config(&contents)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound && allow_missing => {
            Ok(ConfigFile::default())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(format!("config file not found '{}'", path.display()))
        }
        Err(e) => Err(format!("failed to read config '{}': {e}", path.display())),
    }
}

fn default_config_yaml() -> String {
    let mut out = String::from(
        r#"# dexgallery config
#
# Location (default):
#   ~/.dexgallery/config.yml

# Paging
page_size: 28
pages: 1

# Catalog
catalog_url: https://pokeapi.co/api/v2/pokemon
sprite_url: https://raw.githubusercontent.com/PokeAPI/sprites/master/sprites/pokemon
timeout: 10
# proxy: http://127.0.0.1:8080

# Output (optional)
# output: ./gallery.html
# output_format: html

# Output styling
no_color: false

# Attribute palette (closed set, order is kept in the generated stylesheet)
attribute_colors:
"#,
    );
    for entry in crate::style::default_palette() {
        out.push_str(&format!(
            "  - {{ name: {}, color: \"{}\" }}\n",
            entry.name, entry.color
        ));
    }
    out
}

pub fn ensure_default_config_file(path: &PathBuf) -> Result<bool, String> {
    if path.exists() {
        return Ok(false);
    }
    let parent = path
        .parent()
        .ok_or_else(|| format!("invalid config path '{}'", path.display()))?;
    std::fs::create_dir_all(parent).map_err(|e| {
        format!(
            "failed to create config directory '{}': {e}",
            parent.display()
        )
    })?;
    let contents = default_config_yaml();
    std::fs::write(path, contents)
        .map_err(|e| format!("failed to write config file '{}': {e}", path.display()))?;
    Ok(true)
}
