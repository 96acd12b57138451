//! The four placement directives
//!
//! Each directive claims its destinations before touching the file system.
//! A destination that is already taken is counted as a conflict and left to
//! whoever claimed it first.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};
use walkdir::WalkDir;

use crate::config::placement::{DirectiveEntry, ExternalLink, PlacementManifest};
use crate::error::Result;

use super::claims::ClaimSet;
use super::file_ops;
use super::ignore::{IgnoreRules, matches_glob};

/// One directive of a placement manifest
#[derive(Debug, Clone, Copy)]
pub enum Placement<'m> {
    /// Create directories and empty files that must exist
    Init(&'m DirectiveEntry),
    /// Duplicate content into the workarea
    Copy(&'m DirectiveEntry),
    /// Symlink product files into the workarea
    Link(&'m DirectiveEntry),
    /// Symlink from the third-party install root into the workarea
    LinkExternal(&'m ExternalLink),
}

/// Paths shared by every directive of one product
#[derive(Debug, Clone, Copy)]
pub struct PlacementTarget<'c> {
    pub workarea: &'c Path,
    pub product_dir: &'c Path,
    pub third_party_dir: Option<&'c Path>,
    pub ignore: &'c IgnoreRules,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PlacementStats {
    pub placed: usize,
    pub conflicts: usize,
}

impl PlacementStats {
    fn merge(&mut self, other: PlacementStats) {
        self.placed += other.placed;
        self.conflicts += other.conflicts;
    }
}

/// Directives of `manifest` in application order: init, copy, link, link.external
pub fn placements(manifest: &PlacementManifest) -> Vec<Placement<'_>> {
    manifest
        .init
        .iter()
        .map(Placement::Init)
        .chain(manifest.copy.iter().map(Placement::Copy))
        .chain(manifest.link.iter().map(Placement::Link))
        .chain(manifest.link_external.iter().map(Placement::LinkExternal))
        .collect()
}

impl Placement<'_> {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Copy(_) => "copy",
            Self::Link(_) => "link",
            Self::LinkExternal(_) => "link.external",
        }
    }

    pub fn apply(
        &self,
        target: &PlacementTarget<'_>,
        claims: &mut ClaimSet,
    ) -> Result<PlacementStats> {
        let mut stats = PlacementStats::default();
        match *self {
            Self::Init(entry) => init(entry, target, claims, &mut stats)?,
            Self::Copy(entry) => {
                let source = target.product_dir.join(&entry.directory);
                if !file_ops::occupied(&source) {
                    debug!("copy: {} does not exist", source.display());
                } else if entry.patterns.is_empty() {
                    let destination = target.workarea.join(&entry.directory);
                    copy_unit(&source, &destination, claims, &mut stats)?;
                } else {
                    for (file, destination) in matching(entry, target) {
                        if claim(claims, &destination, &mut stats) {
                            file_ops::copy_file(&file, &destination)?;
                        }
                    }
                }
            }
            Self::Link(entry) => {
                let source = target.product_dir.join(&entry.directory);
                if !file_ops::occupied(&source) {
                    debug!("link: {} does not exist", source.display());
                } else if entry.patterns.is_empty() {
                    let destination = target.workarea.join(&entry.directory);
                    link_unit(&source, &destination, claims, &mut stats)?;
                } else {
                    for (file, destination) in matching(entry, target) {
                        link_unit(&file, &destination, claims, &mut stats)?;
                    }
                }
            }
            Self::LinkExternal(external) => {
                let Some(root) = target.third_party_dir else {
                    debug!("link.external: no third-party directory configured");
                    return Ok(stats);
                };
                let source = root.join(&external.source);
                if !source.exists() {
                    debug!("link.external: {} does not exist", source.display());
                    return Ok(stats);
                }
                let destination = target.workarea.join(&external.destination);
                link_unit(&source, &destination, claims, &mut stats)?;
            }
        }
        trace!("{}: {:?}", self.kind(), stats);
        Ok(stats)
    }
}

/// Apply every directive of `manifest` in order
pub fn apply_all(
    manifest: &PlacementManifest,
    target: &PlacementTarget<'_>,
    claims: &mut ClaimSet,
) -> Result<PlacementStats> {
    let mut stats = PlacementStats::default();
    for placement in placements(manifest) {
        stats.merge(placement.apply(target, claims)?);
    }
    Ok(stats)
}

fn claim(claims: &mut ClaimSet, destination: &Path, stats: &mut PlacementStats) -> bool {
    if claims.claim(destination) {
        stats.placed += 1;
        true
    } else {
        trace!("{} already claimed", destination.display());
        stats.conflicts += 1;
        false
    }
}

fn init(
    entry: &DirectiveEntry,
    target: &PlacementTarget<'_>,
    claims: &mut ClaimSet,
    stats: &mut PlacementStats,
) -> Result<()> {
    let base = target.workarea.join(&entry.directory);
    file_ops::ensure_dir(&base)?;

    for item in &entry.patterns {
        let path = base.join(item);
        if !claim(claims, &path, stats) {
            continue;
        }
        if file_ops::occupied(&path) {
            continue;
        }
        if Path::new(item).extension().is_some() {
            file_ops::touch(&path)?;
        } else {
            file_ops::ensure_dir(&path)?;
        }
    }
    Ok(())
}

/// Copy `source` as one unit; a directory replaces whatever sits at `destination`
fn copy_unit(
    source: &Path,
    destination: &Path,
    claims: &mut ClaimSet,
    stats: &mut PlacementStats,
) -> Result<()> {
    if !claim(claims, destination, stats) {
        return Ok(());
    }
    if source.is_dir() {
        file_ops::remove_existing(destination)?;
        file_ops::copy_dir_recursive(source, destination)
    } else {
        file_ops::copy_file(source, destination)
    }
}

/// Link `source` at `destination`.
///
/// An existing symlink is replaced. An existing real file or directory is
/// claimed and left alone.
fn link_unit(
    source: &Path,
    destination: &Path,
    claims: &mut ClaimSet,
    stats: &mut PlacementStats,
) -> Result<()> {
    if !claim(claims, destination, stats) {
        return Ok(());
    }
    if file_ops::is_symlink(destination) {
        file_ops::remove_existing(destination)?;
    } else if file_ops::occupied(destination) {
        debug!("{} exists and is not a link, keeping it", destination.display());
        return Ok(());
    }
    file_ops::link(source, destination)
}

/// Source files under `entry.directory` matching its patterns, paired with
/// their destinations. Directories are only descended into, never matched,
/// so every file is claimed on its own. Ignored paths are pruned.
fn matching(entry: &DirectiveEntry, target: &PlacementTarget<'_>) -> Vec<(PathBuf, PathBuf)> {
    let source = target.product_dir.join(&entry.directory);
    let destination = target.workarea.join(&entry.directory);
    let mut found = Vec::new();

    let mut walker = WalkDir::new(&source).sort_by_file_name().into_iter();
    while let Some(item) = walker.next() {
        let item = match item {
            Ok(item) => item,
            Err(err) => {
                debug!("Skipping unreadable entry under {}: {}", source.display(), err);
                continue;
            }
        };
        let path = item.path();
        if item.depth() > 0 && target.ignore.is_ignored(path) {
            if item.file_type().is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        if item.file_type().is_dir() {
            continue;
        }

        let relative = path.strip_prefix(&source).unwrap_or(path);
        let name = item.file_name().to_string_lossy();
        let relative_text = relative.to_string_lossy().replace('\\', "/");
        let matched = entry
            .patterns
            .iter()
            .any(|p| matches_glob(p, &name) || matches_glob(p, &relative_text));
        if matched {
            let target_path = if relative.as_os_str().is_empty() {
                destination.clone()
            } else {
                destination.join(relative)
            };
            found.push((path.to_path_buf(), target_path));
        }
    }
    found
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        workarea: PathBuf,
        product: PathBuf,
        third_party: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let workarea = temp.path().join("work");
            let product = temp.path().join("products/kbot");
            let third_party = temp.path().join("site-packages");
            fs::create_dir_all(&workarea).unwrap();
            fs::create_dir_all(&product).unwrap();
            fs::create_dir_all(&third_party).unwrap();
            Self {
                _temp: temp,
                workarea,
                product,
                third_party,
            }
        }

        fn file(&self, relative: &str, content: &str) -> PathBuf {
            let path = self.product.join(relative);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }

        fn apply(
            &self,
            placement: Placement<'_>,
            ignore: &IgnoreRules,
            claims: &mut ClaimSet,
        ) -> PlacementStats {
            let target = PlacementTarget {
                workarea: &self.workarea,
                product_dir: &self.product,
                third_party_dir: Some(&self.third_party),
                ignore,
            };
            placement.apply(&target, claims).unwrap()
        }
    }

    fn entry(directory: &str, patterns: &[&str]) -> DirectiveEntry {
        DirectiveEntry {
            directory: directory.to_string(),
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_init_creates_files_and_directories() {
        let fixture = Fixture::new();
        let mut claims = ClaimSet::new(&fixture.workarea);
        let init = entry("var", &["log", "conf/local.conf"]);

        let stats = fixture.apply(Placement::Init(&init), &IgnoreRules::default(), &mut claims);

        assert_eq!(stats.placed, 2);
        assert!(fixture.workarea.join("var/log").is_dir());
        assert!(fixture.workarea.join("var/conf/local.conf").is_file());
        // the base directory itself is not claimed
        assert!(claims.claim(&fixture.workarea.join("var/other")));
    }

    #[test]
    fn test_init_leaves_existing_file_untouched() {
        let fixture = Fixture::new();
        let existing = fixture.workarea.join("var/local.conf");
        fs::create_dir_all(existing.parent().unwrap()).unwrap();
        fs::write(&existing, "keep").unwrap();

        let mut claims = ClaimSet::new(&fixture.workarea);
        fixture.apply(
            Placement::Init(&entry("var", &["local.conf"])),
            &IgnoreRules::default(),
            &mut claims,
        );

        assert_eq!(fs::read_to_string(existing).unwrap(), "keep");
    }

    #[test]
    fn test_copy_directory_replaces_destination() {
        let fixture = Fixture::new();
        fixture.file("conf/app.conf", "new");
        let stale = fixture.workarea.join("conf/stale.conf");
        fs::create_dir_all(stale.parent().unwrap()).unwrap();
        fs::write(&stale, "old").unwrap();

        let mut claims = ClaimSet::new(&fixture.workarea);
        let stats = fixture.apply(
            Placement::Copy(&entry("conf", &[])),
            &IgnoreRules::default(),
            &mut claims,
        );

        assert_eq!(stats, PlacementStats { placed: 1, conflicts: 0 });
        assert!(!stale.exists());
        assert_eq!(
            fs::read_to_string(fixture.workarea.join("conf/app.conf")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_copy_patterns_honor_ignore() {
        let fixture = Fixture::new();
        fixture.file("templates/index.html", "<html/>");
        fixture.file("templates/cache/page.html", "cached");
        fixture.file("templates/notes.txt", "");

        let ignore = IgnoreRules::new(&fixture.product, &[entry("templates", &["cache"])]);
        let mut claims = ClaimSet::new(&fixture.workarea);
        let copy = entry("templates", &["*.html"]);
        let stats = fixture.apply(Placement::Copy(&copy), &ignore, &mut claims);

        assert_eq!(stats.placed, 1);
        assert!(fixture.workarea.join("templates/index.html").is_file());
        assert!(!fixture.workarea.join("templates/cache").exists());
        assert!(!fixture.workarea.join("templates/notes.txt").exists());
    }

    #[test]
    fn test_link_per_file_points_at_source() {
        let fixture = Fixture::new();
        let source = fixture.file("core/python/x.py", "print()");
        fixture.file("core/python/pkg/y.py", "");
        fixture.file("core/python/pkg/y.pyc", "");

        let mut claims = ClaimSet::new(&fixture.workarea);
        let stats = fixture.apply(
            Placement::Link(&entry("core/python", &["*.py"])),
            &IgnoreRules::default(),
            &mut claims,
        );

        assert_eq!(stats.placed, 2);
        let link = fixture.workarea.join("core/python/x.py");
        assert_eq!(fs::read_link(&link).unwrap(), dunce::canonicalize(source).unwrap());
        assert!(file_ops::is_symlink(&fixture.workarea.join("core/python/pkg/y.py")));
        assert!(!file_ops::occupied(&fixture.workarea.join("core/python/pkg/y.pyc")));
    }

    #[test]
    fn test_link_whole_unit_replaces_symlink_keeps_real_directory() {
        let fixture = Fixture::new();
        fixture.file("bin/tool", "#!/bin/sh");
        fixture.file("lib/mod.so", "");

        let stale_target = fixture.product.join("old-bin");
        fs::create_dir_all(&stale_target).unwrap();
        std::os::unix::fs::symlink(&stale_target, fixture.workarea.join("bin")).unwrap();
        fs::create_dir_all(fixture.workarea.join("lib")).unwrap();

        let mut claims = ClaimSet::new(&fixture.workarea);
        let ignore = IgnoreRules::default();
        fixture.apply(Placement::Link(&entry("bin", &[])), &ignore, &mut claims);
        fixture.apply(Placement::Link(&entry("lib", &[])), &ignore, &mut claims);

        assert_eq!(
            fs::read_link(fixture.workarea.join("bin")).unwrap(),
            dunce::canonicalize(fixture.product.join("bin")).unwrap()
        );
        assert!(!file_ops::is_symlink(&fixture.workarea.join("lib")));
        assert!(claims.is_taken(&fixture.workarea.join("lib/mod.so")));
    }

    #[test]
    fn test_conflicting_link_is_counted_and_skipped() {
        let fixture = Fixture::new();
        fixture.file("bin/tool", "");
        let mut claims = ClaimSet::new(&fixture.workarea);
        assert!(claims.claim(&fixture.workarea.join("bin/tool")));

        let stats = fixture.apply(
            Placement::Link(&entry("bin", &[])),
            &IgnoreRules::default(),
            &mut claims,
        );

        assert_eq!(stats, PlacementStats { placed: 0, conflicts: 1 });
        assert!(!file_ops::occupied(&fixture.workarea.join("bin")));
    }

    #[test]
    fn test_link_external_resolves_against_third_party_root() {
        let fixture = Fixture::new();
        fs::create_dir_all(fixture.third_party.join("vendor_pkg/data")).unwrap();
        let external = ExternalLink {
            source: "vendor_pkg/data".to_string(),
            destination: "core/data".to_string(),
        };
        let missing = ExternalLink {
            source: "absent".to_string(),
            destination: "core/absent".to_string(),
        };

        let mut claims = ClaimSet::new(&fixture.workarea);
        let ignore = IgnoreRules::default();
        let stats = fixture.apply(Placement::LinkExternal(&external), &ignore, &mut claims);
        let skipped = fixture.apply(Placement::LinkExternal(&missing), &ignore, &mut claims);

        assert_eq!(stats.placed, 1);
        assert_eq!(skipped, PlacementStats::default());
        assert_eq!(
            fs::read_link(fixture.workarea.join("core/data")).unwrap(),
            dunce::canonicalize(fixture.third_party.join("vendor_pkg/data")).unwrap()
        );
    }

    #[test]
    fn test_placement_order() {
        let manifest = PlacementManifest::from_toml(
            "[work.link]\nbin = []\n[work.link.external]\n\"a\" = \"b\"\n[work.copy]\nconf = []\n[work.init]\nvar = [\"log\"]\n",
            "test",
        )
        .unwrap()
        .unwrap();
        let kinds: Vec<_> = placements(&manifest).iter().map(Placement::kind).collect();
        assert_eq!(kinds, vec!["init", "copy", "link", "link.external"]);
    }

    #[test]
    fn test_apply_all_is_idempotent() {
        let fixture = Fixture::new();
        fixture.file("conf/app.conf", "x");
        fixture.file("core/python/x.py", "");
        let manifest = PlacementManifest::from_toml(
            "[work.init]\nvar = [\"log\"]\n[work.copy]\nconf = []\n[work.link]\n\"core/python\" = [\"*.py\"]\n",
            "test",
        )
        .unwrap()
        .unwrap();
        let ignore = IgnoreRules::default();
        let target = PlacementTarget {
            workarea: &fixture.workarea,
            product_dir: &fixture.product,
            third_party_dir: None,
            ignore: &ignore,
        };

        let first = apply_all(&manifest, &target, &mut ClaimSet::new(&fixture.workarea)).unwrap();
        let second = apply_all(&manifest, &target, &mut ClaimSet::new(&fixture.workarea)).unwrap();

        assert_eq!(first, second);
        assert!(file_ops::is_symlink(&fixture.workarea.join("core/python/x.py")));
        assert!(fixture.workarea.join("conf/app.conf").is_file());
    }

    #[test]
    fn test_link_per_file_merges_products_sharing_a_subdirectory() {
        let requested = Fixture::new();
        requested.file("core/python/pkg/a.py", "a");
        let dependency = requested.product.with_file_name("kbot_core");
        fs::create_dir_all(dependency.join("core/python/pkg")).unwrap();
        fs::write(dependency.join("core/python/pkg/b.py"), "b").unwrap();
        fs::write(dependency.join("core/python/pkg/a.py"), "from dependency").unwrap();

        let link = entry("core/python", &["*"]);
        let ignore = IgnoreRules::default();
        let mut claims = ClaimSet::new(&requested.workarea);
        let first = requested.apply(Placement::Link(&link), &ignore, &mut claims);
        let second = Placement::Link(&link)
            .apply(
                &PlacementTarget {
                    workarea: &requested.workarea,
                    product_dir: &dependency,
                    third_party_dir: None,
                    ignore: &ignore,
                },
                &mut claims,
            )
            .unwrap();

        let pkg = requested.workarea.join("core/python/pkg");
        assert!(!file_ops::is_symlink(&pkg));
        assert!(file_ops::is_symlink(&pkg.join("a.py")));
        assert!(file_ops::is_symlink(&pkg.join("b.py")));
        assert_eq!(fs::read_to_string(pkg.join("a.py")).unwrap(), "a");
        assert_eq!(fs::read_to_string(pkg.join("b.py")).unwrap(), "b");
        assert_eq!(first, PlacementStats { placed: 1, conflicts: 0 });
        assert_eq!(second, PlacementStats { placed: 1, conflicts: 1 });
    }
}
