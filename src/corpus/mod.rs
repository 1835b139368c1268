mod outline;
mod types;

pub use outline::{CodeSection, DocOutline, ImageHint, StructuralHints};
pub use types::{AssetId, Pos, Span};

use std::{
    collections::HashMap,
    io,
    path::{Component, Path, PathBuf},
};

use itertools::Itertools;
use ropey::Rope;
use walkdir::WalkDir;

use crate::config::Settings;

/// The in-memory representation of the vault: every markdown document (as a
/// rope) plus the inventory of image assets. The corpus exposes read/write
/// primitives over document text and resolves raw link targets to asset
/// identities; interpretation of link syntax lives elsewhere.
#[derive(Debug, Clone, PartialEq)]
pub struct Corpus {
    docs: HashMap<PathBuf, Rope>,
    assets: Vec<PathBuf>,
    root_dir: PathBuf,
}

impl Corpus {
    /// Walks `root_dir` and indexes markdown documents and image assets.
    /// Hidden entries are skipped. Paths are stored vault-relative.
    pub fn scan(settings: &Settings, root_dir: &Path) -> Result<Corpus, io::Error> {
        let entries = WalkDir::new(root_dir)
            .into_iter()
            .filter_entry(|e| {
                !e.file_name()
                    .to_str()
                    .map(|s| s.starts_with('.'))
                    .unwrap_or(false)
            })
            .flatten()
            .filter(|e| e.file_type().is_file())
            .collect_vec();

        let mut docs: HashMap<PathBuf, Rope> = HashMap::new();
        let mut assets: Vec<PathBuf> = vec![];

        for entry in entries {
            let Ok(rel) = entry.path().strip_prefix(root_dir) else {
                continue;
            };

            if entry.path().extension().and_then(|e| e.to_str()) == Some("md") {
                let text = std::fs::read_to_string(entry.path())?;
                docs.insert(rel.to_path_buf(), Rope::from_str(&text));
            } else if settings.is_image_path(entry.path()) {
                assets.push(rel.to_path_buf());
            }
        }

        assets.sort();

        Ok(Corpus {
            docs,
            assets,
            root_dir: root_dir.into(),
        })
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    /// Vault-relative paths of all documents, in stable order.
    pub fn doc_paths(&self) -> Vec<&PathBuf> {
        self.docs.keys().sorted().collect_vec()
    }

    pub fn rope(&self, doc: &Path) -> Option<&Rope> {
        self.docs.get(doc)
    }

    pub fn doc_text(&self, doc: &Path) -> Option<String> {
        self.docs.get(doc).map(|rope| rope.to_string())
    }

    /// Reads a document's current text from disk.
    pub fn read_doc(&self, doc: &Path) -> Result<String, io::Error> {
        std::fs::read_to_string(self.root_dir.join(doc))
    }

    /// Replaces a document's text on disk and refreshes the in-memory rope.
    pub fn write_doc(&mut self, doc: &Path, text: &str) -> Result<(), io::Error> {
        std::fs::write(self.root_dir.join(doc), text)?;
        self.update_doc(doc, text);
        Ok(())
    }

    /// Refreshes (or inserts) the in-memory copy of one document.
    pub fn update_doc(&mut self, doc: &Path, text: &str) {
        let new_rope = Rope::from_str(text);
        match self.docs.get_mut(doc) {
            Some(rope) => {
                *rope = new_rope;
            }
            None => {
                self.docs.insert(doc.into(), new_rope);
            }
        }
    }

    pub fn asset_ids(&self) -> Vec<AssetId> {
        self.assets
            .iter()
            .map(|path| AssetId::from(path.as_path()))
            .collect_vec()
    }

    pub fn contains_asset(&self, id: &AssetId) -> bool {
        self.assets.iter().any(|path| path == id.as_path())
    }

    /// Records a rename in the asset inventory. The file move itself belongs
    /// to the host; the corpus only tracks identities.
    pub fn rename_asset(&mut self, old: &AssetId, new: AssetId) {
        self.assets.retain(|path| path != old.as_path());
        let new_path = new.as_path().to_path_buf();
        if !self.assets.contains(&new_path) {
            self.assets.push(new_path);
            self.assets.sort();
        }
    }
}

/// Identity resolution: raw link target text to an [`AssetId`].
impl Corpus {
    /// Resolves a raw link target, relative to the document containing it,
    /// to an asset identity. Returns `None` for targets that match nothing
    /// in the inventory ("unresolved" is not an error, just no reference).
    pub fn resolve(&self, target_raw: &str, doc: &Path) -> Option<AssetId> {
        let decoded = decode_target(target_raw);

        if is_bare_name(&decoded) {
            return self.resolve_bare(&decoded);
        }

        candidate_paths(&decoded, doc)
            .into_iter()
            .find(|candidate| self.assets.iter().any(|asset| asset == candidate))
            .map(|path| AssetId::new(path))
    }

    /// Whether a raw link target refers to `asset`, relative to `doc`.
    ///
    /// Unlike [`Corpus::resolve`] this still answers correctly when `asset`
    /// has already left the inventory (mid-rename, the old identity is gone
    /// from disk but its occurrences are still being rewritten).
    pub fn resolves_to(&self, target_raw: &str, doc: &Path, asset: &AssetId) -> bool {
        let decoded = decode_target(target_raw);

        if is_bare_name(&decoded) {
            if self
                .resolve_bare(&decoded)
                .is_some_and(|resolved| resolved == *asset)
            {
                return true;
            }
            // Mid-rename the departed identity matches by basename even when
            // the inventory already holds its successor under the same name
            // (a pure move that keeps the basename).
            return !self.contains_asset(asset)
                && asset
                    .file_name()
                    .is_some_and(|name| name.eq_ignore_ascii_case(&decoded));
        }

        candidate_paths(&decoded, doc)
            .iter()
            .any(|candidate| candidate == asset.as_path())
    }

    /// Bare-name lookup: case-insensitive basename match over the inventory.
    /// When several assets share the basename, the shortest vault path wins.
    fn resolve_bare(&self, name: &str) -> Option<AssetId> {
        self.assets
            .iter()
            .filter(|path| {
                path.file_name()
                    .and_then(|f| f.to_str())
                    .is_some_and(|f| f.eq_ignore_ascii_case(name))
            })
            .min_by_key(|path| (path.components().count(), path.as_os_str().len()))
            .map(|path| AssetId::from(path.as_path()))
    }
}

fn decode_target(target_raw: &str) -> String {
    let trimmed = target_raw.trim();
    urlencoding::decode(trimmed)
        .map_or_else(|_| trimmed.to_string(), |d| d.to_string())
        .replace(r"\ ", " ")
}

fn is_bare_name(target: &str) -> bool {
    !target.contains('/')
}

/// Lexical resolution candidates for a path-style target, most specific
/// first: `./`- and `../`-prefixed targets resolve only against the
/// document's own directory; other paths are tried vault-absolute first,
/// then document-relative.
fn candidate_paths(target: &str, doc: &Path) -> Vec<PathBuf> {
    let doc_dir = doc.parent().unwrap_or(Path::new(""));

    if target.starts_with("./") || target.starts_with("../") {
        return vec![normalize_path(&doc_dir.join(target))];
    }

    let vault_absolute = normalize_path(Path::new(target.trim_start_matches('/')));
    let doc_relative = normalize_path(&doc_dir.join(target));

    if vault_absolute == doc_relative {
        vec![vault_absolute]
    } else {
        vec![vault_absolute, doc_relative]
    }
}

/// Resolves `.` and `..` components lexically, without touching the
/// filesystem. `..` past the vault root is dropped.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::create_test_vault_dir;
    use std::fs;

    #[test]
    fn scan_indexes_documents_and_assets() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::create_dir(vault_dir.join("images")).unwrap();
        fs::write(vault_dir.join("note.md"), "# Note\n").unwrap();
        fs::write(vault_dir.join("images/photo.png"), [0u8; 4]).unwrap();
        fs::write(vault_dir.join("images/raw.bin"), [0u8; 4]).unwrap();

        let settings = Settings::default();
        let corpus = Corpus::scan(&settings, &vault_dir).expect("scan should succeed");

        assert_eq!(corpus.doc_paths(), vec![&PathBuf::from("note.md")]);
        assert_eq!(
            corpus.asset_ids(),
            vec![AssetId::new("images/photo.png")],
            "non-image files are not assets"
        );
    }

    #[test]
    fn resolve_matches_bare_relative_and_vault_paths_to_one_identity() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::create_dir_all(vault_dir.join("docs")).unwrap();
        fs::create_dir_all(vault_dir.join("images")).unwrap();
        fs::write(vault_dir.join("docs/page.md"), "text").unwrap();
        fs::write(vault_dir.join("images/photo.png"), [0u8; 4]).unwrap();

        let settings = Settings::default();
        let corpus = Corpus::scan(&settings, &vault_dir).unwrap();

        let doc = PathBuf::from("docs/page.md");
        let expected = AssetId::new("images/photo.png");

        assert_eq!(corpus.resolve("photo.png", &doc), Some(expected.clone()));
        assert_eq!(
            corpus.resolve("../images/photo.png", &doc),
            Some(expected.clone())
        );
        assert_eq!(
            corpus.resolve("images/photo.png", &doc),
            Some(expected.clone())
        );
        assert_eq!(
            corpus.resolve("images/photo%20.png", &doc),
            None,
            "decoded target names a different file"
        );
        assert_eq!(corpus.resolve("missing.png", &doc), None);
        assert!(corpus.resolves_to("photo.png", &doc, &expected));
    }

    #[test]
    fn bare_name_ambiguity_prefers_shortest_vault_path() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::create_dir_all(vault_dir.join("deep/nested")).unwrap();
        fs::write(vault_dir.join("photo.png"), [0u8; 4]).unwrap();
        fs::write(vault_dir.join("deep/nested/photo.png"), [0u8; 4]).unwrap();
        fs::write(vault_dir.join("note.md"), "text").unwrap();

        let settings = Settings::default();
        let corpus = Corpus::scan(&settings, &vault_dir).unwrap();

        assert_eq!(
            corpus.resolve("photo.png", Path::new("note.md")),
            Some(AssetId::new("photo.png"))
        );
        // The nested copy is still reachable by path.
        assert_eq!(
            corpus.resolve("deep/nested/photo.png", Path::new("note.md")),
            Some(AssetId::new("deep/nested/photo.png"))
        );
    }

    #[test]
    fn resolves_to_survives_inventory_rename() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("photo.png"), [0u8; 4]).unwrap();
        fs::write(vault_dir.join("note.md"), "text").unwrap();

        let settings = Settings::default();
        let mut corpus = Corpus::scan(&settings, &vault_dir).unwrap();

        let old = AssetId::new("photo.png");
        let new = AssetId::new("vacation/photo2.png");
        corpus.rename_asset(&old, new.clone());

        assert!(!corpus.contains_asset(&old));
        assert!(corpus.contains_asset(&new));
        // Old raw targets still identify the departed asset during rewrite.
        assert!(corpus.resolves_to("photo.png", Path::new("note.md"), &old));
        assert!(!corpus.resolves_to("photo.png", Path::new("note.md"), &new));
    }

    #[test]
    fn resolves_to_survives_a_pure_move_keeping_the_basename() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("photo.png"), [0u8; 4]).unwrap();
        fs::write(vault_dir.join("note.md"), "text").unwrap();

        let settings = Settings::default();
        let mut corpus = Corpus::scan(&settings, &vault_dir).unwrap();

        let old = AssetId::new("photo.png");
        let new = AssetId::new("vacation/photo.png");
        corpus.rename_asset(&old, new.clone());

        // The successor shares the basename; it must not shadow the departed
        // identity while its occurrences are still being rewritten.
        assert!(corpus.resolves_to("photo.png", Path::new("note.md"), &old));
        assert!(corpus.resolves_to("photo.png", Path::new("note.md"), &new));
    }

    #[test]
    fn update_doc_replaces_in_memory_text() {
        let (_temp_dir, vault_dir) = create_test_vault_dir();
        fs::write(vault_dir.join("note.md"), "before").unwrap();

        let settings = Settings::default();
        let mut corpus = Corpus::scan(&settings, &vault_dir).unwrap();

        corpus.update_doc(Path::new("note.md"), "after");
        assert_eq!(
            corpus.doc_text(Path::new("note.md")),
            Some("after".to_string())
        );
    }
}
