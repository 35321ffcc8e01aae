// Sound scanner - Discovers preset sample pairs on disk
//
// File naming: `<Group>_<Name..>_hi.wav` and `<Group>_<Name..>_lo.wav`.
// `Perc_Can_hi.wav` + `Perc_Can_lo.wav` become the sound `perc-can`
// named "Can". Groups missing one half of the pair are dropped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::{BuiltinCatalog, SoundCatalog, SoundDescriptor, SoundError, Timbre};

#[derive(Default)]
struct PairBuilder {
    name: String,
    hi: Option<PathBuf>,
    lo: Option<PathBuf>,
}

/// Split `Perc_Can_hi.wav` into (`Perc_Can`, `Can`, `hi`)
fn parse_file_name(file_name: &str) -> Option<(String, String, String)> {
    let stem = file_name
        .strip_suffix(".wav")
        .or_else(|| file_name.strip_suffix(".WAV"))?;
    let parts: Vec<&str> = stem.split('_').collect();
    if parts.len() < 3 {
        return None;
    }

    let (kind, base_parts) = parts.split_last()?;
    let base_name = base_parts.join("_");
    let display_name = base_parts[1..].join(" ");
    Some((base_name, display_name, kind.to_string()))
}

fn sound_id(base_name: &str) -> String {
    base_name.to_lowercase().replace('_', "-")
}

/// Scan one directory (not recursive) for complete hi/lo pairs, sorted by id
pub fn scan_sound_dir(dir_path: &Path) -> Result<Vec<SoundDescriptor>, SoundError> {
    if !dir_path.is_dir() {
        log::debug!(
            target: "metronome::sound",
            "sound directory {} not found, no presets loaded",
            dir_path.display()
        );
        return Ok(Vec::new());
    }

    let mut groups: BTreeMap<String, PairBuilder> = BTreeMap::new();

    for entry in WalkDir::new(dir_path).min_depth(1).max_depth(1) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let Some(file_name) = entry.file_name().to_str() else {
            continue;
        };
        let Some((base_name, display_name, kind)) = parse_file_name(file_name) else {
            continue;
        };

        let group = groups.entry(base_name).or_insert_with(|| PairBuilder {
            name: display_name,
            ..Default::default()
        });
        match kind.as_str() {
            "hi" => group.hi = Some(entry.path().to_path_buf()),
            "lo" => group.lo = Some(entry.path().to_path_buf()),
            _ => {}
        }
    }

    let mut sounds: Vec<SoundDescriptor> = groups
        .into_iter()
        .filter_map(|(base_name, group)| match (group.hi, group.lo) {
            (Some(hi), Some(lo)) => Some(SoundDescriptor {
                id: sound_id(&base_name),
                name: group.name,
                timbre: Timbre::Sample { hi, lo },
            }),
            _ => {
                log::debug!(target: "metronome::sound", "incomplete pair {base_name} skipped");
                None
            }
        })
        .collect();

    sounds.sort_by(|a, b| a.id.cmp(&b.id));
    sounds.dedup_by(|a, b| a.id == b.id);

    log::info!(
        target: "metronome::sound",
        "{} preset sounds found in {}",
        sounds.len(),
        dir_path.display()
    );

    Ok(sounds)
}

/// Built-in sounds plus the sample pairs of one directory
#[derive(Debug, Clone, Default)]
pub struct DirectoryCatalog {
    root: Option<PathBuf>,
    samples: Vec<SoundDescriptor>,
}

impl DirectoryCatalog {
    pub fn scan(dir_path: &Path) -> Result<Self, SoundError> {
        Ok(Self {
            root: Some(dir_path.to_path_buf()),
            samples: scan_sound_dir(dir_path)?,
        })
    }

    pub fn root(&self) -> Option<&Path> {
        self.root.as_deref()
    }

    pub fn samples(&self) -> &[SoundDescriptor] {
        &self.samples
    }

    /// Rescan the directory the catalog was built from
    pub fn refresh(&mut self) -> Result<(), SoundError> {
        if let Some(root) = &self.root {
            self.samples = scan_sound_dir(root)?;
        }
        Ok(())
    }
}

impl SoundCatalog for DirectoryCatalog {
    fn resolve(&self, id: &str) -> Option<SoundDescriptor> {
        BuiltinCatalog
            .resolve(id)
            .or_else(|| self.samples.iter().find(|s| s.id == id).cloned())
    }

    fn sounds(&self) -> Vec<SoundDescriptor> {
        let mut sounds = BuiltinCatalog.sounds();
        sounds.extend(self.samples.iter().cloned());
        sounds
    }
}
