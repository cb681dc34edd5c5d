use assetscope_core::install::{InstallLocator, LocatorStats};
use assetscope_core::{
    AppLocator, AssetKind, AssetReference, AssetscopeError, Config, MountDescriptor, MountResolver, Outcome,
    Validator, VirtualFileSystem,
};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

/// Fake Steam install: root with one library holding the given manifests.
struct SteamFixture {
    _temp: tempfile::TempDir,
    root: PathBuf,
    library: PathBuf,
}

impl SteamFixture {
    fn new() -> Self {
        let temp = tempdir().unwrap();
        let root = temp.path().join("steam");
        let library = temp.path().join("library");
        fs::create_dir_all(root.join("steamapps")).unwrap();
        fs::create_dir_all(library.join("steamapps/common")).unwrap();
        fs::write(
            root.join("steamapps/libraryfolders.vdf"),
            format!(
                "\"libraryfolders\"\n{{\n  \"0\"\n  {{\n    \"path\" \"{}\"\n  }}\n}}\n",
                library.display().to_string().replace('\\', "\\\\")
            ),
        )
        .unwrap();
        Self {
            _temp: temp,
            root,
            library,
        }
    }

    fn install(&self, app_id: u32, install_dir: &str, files: &[&str]) -> PathBuf {
        fs::write(
            self.library
                .join(format!("steamapps/appmanifest_{app_id}.acf")),
            format!("\"AppState\"\n{{\n  \"appid\" \"{app_id}\"\n  \"installdir\" \"{install_dir}\"\n}}\n"),
        )
        .unwrap();
        let dir = self.library.join("steamapps/common").join(install_dir);
        for file in files {
            let path = dir.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, "").unwrap();
        }
        dir
    }

    fn broken_manifest(&self, app_id: u32) {
        fs::write(
            self.library
                .join(format!("steamapps/appmanifest_{app_id}.acf")),
            format!("\"AppState\" {{ \"appid\" \"{app_id}\" }}"),
        )
        .unwrap();
    }
}

#[test]
fn shared_app_id_is_located_once() {
    let steam = SteamFixture::new();
    let install = steam.install(220, "Half-Life 2", &["hl2/materials/brick/wall01.vmt"]);

    let locator = InstallLocator::new(Some(steam.root.clone()));
    let descriptors = vec![
        MountDescriptor::app("hl2", 220).with_submounts(["hl2"]),
        MountDescriptor::app("hl2-again", 220).with_submounts(["hl2", "episodic"]),
    ];
    let roots = MountResolver::new(&locator)
        .resolve(&descriptors, Path::new("/maps"))
        .unwrap();

    assert_eq!(roots.len(), 3);
    assert_eq!(roots[0].path, install.join("hl2"));
    assert_eq!(roots[2].path, install.join("episodic"));
    assert_eq!(
        locator.stats(),
        LocatorStats {
            disk_lookups: 1,
            cache_hits: 1
        }
    );
}

#[test]
fn manifest_without_installdir_aborts_before_mounting() {
    let steam = SteamFixture::new();
    steam.broken_manifest(620);

    let locator = InstallLocator::new(Some(steam.root.clone()));
    assert_eq!(locator.locate_app(620).unwrap(), None);

    let config = Config {
        steam_root: Some(steam.root.clone()),
        mounts: vec![MountDescriptor::app("portal2", 620).with_submounts(["portal2"])],
    };
    let err = VirtualFileSystem::from_config(&config, Path::new("/maps")).unwrap_err();

    assert!(err.is_configuration());
    assert!(matches!(
        err,
        AssetscopeError::AppNotFound { app_id: 620, .. }
    ));
    assert!(err.to_string().contains("620"));
}

#[test]
fn end_to_end_check_against_installed_app_and_local_content() {
    let steam = SteamFixture::new();
    steam.install(220, "Half-Life 2", &["hl2/materials/brick/wall01.vmt"]);

    let map_dir = tempdir().unwrap();
    let custom = map_dir.path().join("custom/models/props");
    fs::create_dir_all(&custom).unwrap();
    fs::write(custom.join("crate.mdl"), "").unwrap();

    let config_file = map_dir.path().join("paths.json");
    fs::write(
        &config_file,
        r#"{
            "hl2":    { "appid": 220, "mount": ["hl2"] },
            "custom": { "path": "${fileDir}/custom" }
        }"#,
    )
    .unwrap();

    let config = Config::load(Some(&config_file), &[], Some(steam.root.clone())).unwrap();
    let vfs = VirtualFileSystem::from_config(&config, map_dir.path()).unwrap();
    assert_eq!(vfs.backends().len(), 2);

    let references = vec![
        AssetReference::new(AssetKind::Texture, "BRICK/Wall01").with_count(3),
        AssetReference::new(AssetKind::Model, "models/props/crate.mdl"),
        AssetReference::new(AssetKind::Texture, "metal/floor02"),
    ];
    let report = Validator::new(&vfs).check(references);

    assert_eq!(report.outcome(), Outcome::Failure);
    let missing: Vec<_> = report
        .missing()
        .map(|f| f.reference.path.as_str())
        .collect();
    assert_eq!(missing, vec!["metal/floor02"]);
}

#[test]
fn missing_library_index_is_fatal_only_for_app_mounts() {
    let temp = tempdir().unwrap();
    let content = temp.path().join("content");
    fs::create_dir_all(&content).unwrap();

    let raw_only = Config {
        steam_root: Some(temp.path().join("no-steam")),
        mounts: vec![MountDescriptor::raw("content", content.to_string_lossy())],
    };
    assert!(VirtualFileSystem::from_config(&raw_only, temp.path()).is_ok());

    let with_app = Config {
        steam_root: Some(temp.path().join("no-steam")),
        mounts: vec![MountDescriptor::app("hl2", 220)],
    };
    let err = VirtualFileSystem::from_config(&with_app, temp.path()).unwrap_err();
    assert!(err.is_configuration());
    match &err {
        AssetscopeError::AppLookup { source, .. } => {
            assert!(matches!(**source, AssetscopeError::LibraryIndex { .. }));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn library_index_failure_names_mount_and_app() {
    let temp = tempdir().unwrap();
    let config = Config {
        steam_root: Some(temp.path().join("no-steam")),
        mounts: vec![MountDescriptor::app("portal2", 620)],
    };

    let message = VirtualFileSystem::from_config(&config, temp.path())
        .unwrap_err()
        .to_string();
    assert!(message.contains("portal2"), "{message}");
    assert!(message.contains("620"), "{message}");
    assert!(message.contains("libraryfolders.vdf"), "{message}");
}
