use std::path::Path;

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// File extensions treated as image assets. This is policy, not parsing:
    /// the engine tracks whatever the host calls an image.
    pub image_extensions: Vec<String>,
    /// Whether link occurrences inside code spans and fenced blocks count as
    /// references. Off by default; fenced examples should never be rewritten.
    pub references_in_codeblocks: bool,
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/linkmend/settings");
        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.linkmend",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("image_extensions", default_image_extensions())?
            .set_default("references_in_codeblocks", false)?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }

    pub fn is_image_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.image_extensions
                    .iter()
                    .any(|allowed| allowed.eq_ignore_ascii_case(ext))
            })
    }
}

fn default_image_extensions() -> Vec<String> {
    ["png", "jpg", "jpeg", "gif", "svg", "webp", "bmp", "avif"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            image_extensions: default_image_extensions(),
            references_in_codeblocks: false,
        }
    }
}
