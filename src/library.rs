//! Songs folder scanning and random map selection

use crate::beatmap::Beatmap;
use anyhow::{Context, Result};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Folder that holds mapsets which failed an earlier import
const FAILED_FOLDER: &str = "Failed";

/// One mapset folder and the difficulties in it that loaded
#[derive(Debug, Clone)]
pub struct Mapset {
    pub path: PathBuf,
    pub name: String,
    pub maps: Vec<Beatmap>,
}

/// Every playable map under the songs folder
#[derive(Debug, Clone, Default)]
pub struct MapLibrary {
    mapsets: Vec<Mapset>,
}

impl MapLibrary {
    /// Load every mapset folder directly under `songs_dir`. Maps and
    /// mapset folders that can't be read, parsed or validated are skipped
    /// with a warning. Fails only if `songs_dir` itself can't be read.
    pub fn scan(songs_dir: &Path) -> Result<Self> {
        if !songs_dir.is_dir() {
            anyhow::bail!("Songs folder {} not found", songs_dir.display());
        }

        let mut mapsets = Vec::new();
        for entry in WalkDir::new(songs_dir).min_depth(1).max_depth(1).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    return Err(e).with_context(|| format!("Failed to read {}", songs_dir.display()));
                }
                Err(e) => {
                    log::warn!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };
            if !entry.file_type().is_dir() || entry.file_name() == FAILED_FOLDER {
                continue;
            }

            match load_mapset(entry.path()) {
                Some(mapset) => mapsets.push(mapset),
                None => log::warn!("No playable maps in {}", entry.path().display()),
            }
        }

        let library = Self::from_mapsets(mapsets);
        log::info!(
            "Loaded {} maps from {} mapsets",
            library.map_count(),
            library.len()
        );
        Ok(library)
    }

    pub fn from_mapsets(mapsets: Vec<Mapset>) -> Self {
        Self {
            mapsets: mapsets.into_iter().filter(|m| !m.maps.is_empty()).collect(),
        }
    }

    pub fn mapsets(&self) -> &[Mapset] {
        &self.mapsets
    }

    /// Number of mapsets
    pub fn len(&self) -> usize {
        self.mapsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mapsets.is_empty()
    }

    pub fn map_count(&self) -> usize {
        self.mapsets.iter().map(|m| m.maps.len()).sum()
    }

    /// A random mapset, then a random difficulty from it
    pub fn random_map<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Beatmap> {
        self.mapsets.choose(rng)?.maps.choose(rng)
    }
}

fn load_mapset(folder: &Path) -> Option<Mapset> {
    let mut maps = Vec::new();

    for entry in WalkDir::new(folder).max_depth(1).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::warn!("Skipping unreadable entry in {}: {}", folder.display(), e);
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_osu = path
            .extension()
            .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("osu"));
        if !is_osu {
            continue;
        }

        match Beatmap::from_path(path) {
            Ok(map) => maps.push(map),
            Err(e) => log::warn!("Skipping {}: {}", path.display(), e),
        }
    }

    if maps.is_empty() {
        return None;
    }

    Some(Mapset {
        path: folder.to_path_buf(),
        name: folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        maps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    const MAP: &str = "osu file format v14

[General]
AudioFilename: audio.mp3

[Metadata]
Title:Song
Artist:Someone
Creator:Mapper
Version:VERSION

[Difficulty]
CircleSize:4
ApproachRate:9
SliderMultiplier:1.4
SliderTickRate:1

[Events]
0,0,\"bg.jpg\",0,0

[TimingPoints]
0,500,4,2,0,50,1,0

[HitObjects]
256,192,1000,5,0,0:0:0:0:
";

    fn temp_songs_dir(name_hint: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time before unix epoch")
            .as_nanos();
        let dir = std::env::temp_dir().join(format!(
            "osu_simulation_library_{}_{}_{}",
            name_hint,
            std::process::id(),
            nanos
        ));
        fs::create_dir_all(&dir).expect("create temp songs dir");
        dir
    }

    fn write_map(dir: &Path, mapset: &str, file: &str, content: &str) {
        let folder = dir.join(mapset);
        fs::create_dir_all(&folder).expect("create mapset dir");
        fs::write(folder.join(file), content).expect("write map");
    }

    #[test]
    fn scans_mapsets_and_skips_bad_maps() {
        let dir = temp_songs_dir("scan");
        write_map(&dir, "1 Someone - Song", "easy.osu", &MAP.replace("VERSION", "Easy"));
        write_map(&dir, "1 Someone - Song", "hard.osu", &MAP.replace("VERSION", "Hard"));
        write_map(&dir, "1 Someone - Song", "notes.txt", "not a map");
        write_map(&dir, "2 Broken", "broken.osu", &MAP.replace("0,0,\"bg.jpg\",0,0", ""));
        write_map(&dir, FAILED_FOLDER, "failed.osu", MAP);

        let library = MapLibrary::scan(&dir).unwrap();
        fs::remove_dir_all(&dir).ok();

        assert_eq!(library.len(), 1);
        assert_eq!(library.map_count(), 2);
        assert_eq!(library.mapsets()[0].name, "1 Someone - Song");
        let versions: Vec<_> = library.mapsets()[0].maps.iter().map(|m| m.version.as_str()).collect();
        assert_eq!(versions, ["Easy", "Hard"]);
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_mapset_does_not_hide_the_others() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_songs_dir("unreadable");
        write_map(&dir, "a_good", "map.osu", &MAP.replace("VERSION", "Good"));
        let locked = dir.join("b_locked");
        write_map(&dir, "b_locked", "map.osu", &MAP.replace("VERSION", "Locked"));
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).expect("lock mapset dir");

        let scanned = MapLibrary::scan(&dir);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).ok();
        fs::remove_dir_all(&dir).ok();

        let library = scanned.unwrap();
        assert!(library.mapsets().iter().any(|m| m.name == "a_good"));
        assert_eq!(library.mapsets()[0].maps[0].version, "Good");
    }

    #[test]
    fn missing_songs_dir_is_an_error() {
        let dir = std::env::temp_dir().join("osu_simulation_library_does_not_exist");
        assert!(MapLibrary::scan(&dir).is_err());
    }

    #[test]
    fn random_map_on_empty_library() {
        let mut rng = StdRng::seed_from_u64(7);
        let library = MapLibrary::from_mapsets(vec![Mapset {
            path: PathBuf::from("empty"),
            name: "empty".to_string(),
            maps: Vec::new(),
        }]);

        assert!(library.is_empty());
        assert!(library.random_map(&mut rng).is_none());
    }

    #[test]
    fn random_map_picks_a_loaded_map() {
        let dir = temp_songs_dir("random");
        write_map(&dir, "set", "map.osu", &MAP.replace("VERSION", "Only"));
        let library = MapLibrary::scan(&dir).unwrap();
        fs::remove_dir_all(&dir).ok();

        let mut rng = StdRng::seed_from_u64(7);
        let map = library.random_map(&mut rng).unwrap();
        assert_eq!(map.version, "Only");
    }
}
