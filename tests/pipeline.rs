//! End-to-end packaging runs with the package manager and freezing tool replaced.

use bootpack::{
    bootstrap::{Bootstrap, Launcher, Staleness, TarGzExtractor},
    bundler::{
        DependencyAmendments, Error, Freezer, PackageManager, Packager, Result, SettingsBuilder,
        archive::{BuildMetadata, PayloadSet, extract_tar_gz},
        builder::FreezeRequest,
        deps::DependencySpec,
    },
};
use std::{
    cell::RefCell,
    path::{Path, PathBuf},
    rc::Rc,
};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/basic-app");

const NPM_LS: &str = r#"{
  "name": "basic-app",
  "dependencies": {
    "left-pad": { "version": "1.3.0", "resolved": "https://registry.npmjs.org/left-pad/-/left-pad-1.3.0.tgz" }
  }
}"#;

/// Answers like npm would for the fixture and fakes installs on disk.
#[derive(Default)]
struct FakeNpm {
    installs: RefCell<Vec<PathBuf>>,
}

impl PackageManager for FakeNpm {
    async fn generate_lockfile(&self, package_root: &Path) -> Result<()> {
        std::fs::write(package_root.join("package-lock.json"), "{}")?;
        Ok(())
    }

    async fn list_production_tree(&self, _package_root: &Path) -> Result<String> {
        Ok(NPM_LS.to_string())
    }

    async fn install(&self, unit_dir: &Path) -> Result<()> {
        let descriptor: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(unit_dir.join("package.json"))?)?;
        let deps = descriptor["dependencies"].as_object().cloned().unwrap_or_default();
        for name in deps.keys() {
            let pkg = unit_dir.join("node_modules").join(name);
            std::fs::create_dir_all(pkg.join("test"))?;
            std::fs::write(pkg.join("index.js"), "module.exports = (s) => s;")?;
            std::fs::write(pkg.join("package.json"), "{}")?;
            std::fs::write(pkg.join("README.md"), "# docs")?;
            std::fs::write(pkg.join("test/index.js"), "assert(true)")?;
        }
        self.installs.borrow_mut().push(unit_dir.to_path_buf());
        Ok(())
    }
}

type FreezeLog = Rc<RefCell<Vec<(PathBuf, PathBuf, String, PathBuf)>>>;

/// Writes a stand-in executable and remembers what it was asked for.
#[derive(Default)]
struct FakeFreezer {
    requests: FreezeLog,
}

impl Freezer for FakeFreezer {
    async fn freeze(&self, request: &FreezeRequest<'_>) -> Result<()> {
        assert!(request.script.is_file());
        assert!(request.config.is_file());
        std::fs::write(request.output, b"frozen executable")?;
        self.requests.borrow_mut().push((
            request.script.to_path_buf(),
            request.config.to_path_buf(),
            request.target.to_string(),
            request.output.to_path_buf(),
        ));
        Ok(())
    }
}

struct FailingFreezer;

impl Freezer for FailingFreezer {
    async fn freeze(&self, _request: &FreezeRequest<'_>) -> Result<()> {
        Err(Error::ExternalTool {
            command: "pkg".into(),
            code: Some(2),
            stderr: "Error! No available node version satisfies".into(),
        })
    }
}

#[derive(Default)]
struct RecordingLauncher {
    launched: RefCell<Option<(PathBuf, PathBuf)>>,
}

impl Launcher for &RecordingLauncher {
    fn clear_console(&self) -> Result<()> {
        Ok(())
    }

    fn launch(&self, runtime: &Path, main: &Path) -> Result<i32> {
        *self.launched.borrow_mut() = Some((runtime.to_path_buf(), main.to_path_buf()));
        Ok(0)
    }
}

struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        for entry in walkdir::WalkDir::new(FIXTURE) {
            let entry = entry.unwrap();
            let dest = dir
                .path()
                .join("app")
                .join(entry.path().strip_prefix(FIXTURE).unwrap());
            if entry.file_type().is_dir() {
                std::fs::create_dir_all(dest).unwrap();
            } else {
                std::fs::copy(entry.path(), dest).unwrap();
            }
        }

        let runtime = dir.path().join("host-node");
        std::fs::write(&runtime, "#!/bin/sh\n").unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&runtime, std::fs::Permissions::from_mode(0o755)).unwrap();
        }

        Self { dir }
    }

    fn root(&self) -> PathBuf {
        path_absolutize::Absolutize::absolutize(self.dir.path())
            .unwrap()
            .into_owned()
    }

    fn builder(&self) -> SettingsBuilder {
        SettingsBuilder::new("app")
            .working_dir(self.dir.path())
            .output("dist")
            .target("node20-linux-x64")
            .runtime(self.dir.path().join("host-node"))
    }
}

#[tokio::test]
async fn packages_fixture_application() {
    let ws = Workspace::new();
    let root = ws.root();
    let settings = ws.builder().build().await.unwrap();
    let staging = settings.staging_root().to_path_buf();

    let freezer = FakeFreezer::default();
    let requests = freezer.requests.clone();
    let report = Packager::new(settings, FakeNpm::default(), freezer)
        .pack()
        .await
        .unwrap();

    // executable
    assert_eq!(report.output, root.join("dist/basic-app"));
    assert_eq!(std::fs::read(&report.output).unwrap(), b"frozen executable");
    assert_eq!(report.size, 17);
    assert_eq!(report.checksum.len(), 64);

    // resolved dependencies, lock file cleaned up
    assert_eq!(report.dependencies["left-pad"], "1.3.0");
    assert!(!root.join("app/package-lock.json").exists());

    // pruning removed README.md and test/index.js from the installed tree
    assert_eq!(report.prune.files_removed, 2);
    assert!(staging.join("app_node_modules/node_modules/left-pad/index.js").exists());
    assert!(!staging.join("app_node_modules/node_modules/left-pad/README.md").exists());

    // staged sources keep their layout, README is not a source
    assert!(staging.join("app_sources/src/index.js").is_file());
    assert!(staging.join("app_sources/src/lib/greet.js").is_file());
    assert!(staging.join("app_sources/src/config.json").is_file());
    assert!(staging.join("app_sources/package.json").is_file());
    assert!(!staging.join("app_sources/README.md").exists());

    // payload
    let payload = PayloadSet::new(staging.join("bootstrap"));
    let metadata = BuildMetadata::read(&payload.metadata()).unwrap();
    assert_eq!(metadata.name, "basic-app");
    assert_eq!(metadata.main, "src/index.js");
    assert_eq!(metadata.target, "node20-linux-x64");
    assert_eq!(metadata.uuid, report.build_id);

    let unpacked = tempfile::tempdir().unwrap();
    let mut sources = extract_tar_gz(&payload.sources(), unpacked.path()).unwrap();
    sources.sort();
    assert_eq!(
        sources,
        ["package.json", "src/config.json", "src/index.js", "src/lib/greet.js"]
            .map(PathBuf::from)
            .to_vec()
    );
    assert_eq!(
        extract_tar_gz(&payload.runtime(), unpacked.path()).unwrap(),
        vec![PathBuf::from("node")]
    );

    // loader unit: script, descriptor listing the payload, its own install
    let requests = requests.borrow();
    assert_eq!(requests.len(), 1);
    let (script, config, target, output) = &requests[0];
    assert_eq!(script, &staging.join("bootstrap/bootstrap.cjs"));
    assert_eq!(target, "node20-linux-x64");
    assert_eq!(output, &report.output);
    let loader: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(config).unwrap()).unwrap();
    assert_eq!(loader["name"], "basic-app-bootpack");
    assert_eq!(loader["pkg"]["assets"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn packaged_payload_boots() {
    let ws = Workspace::new();
    let settings = ws.builder().debug(true).build().await.unwrap();
    let payload_dir = settings.loader_staging_dir();
    Packager::new(settings, FakeNpm::default(), FakeFreezer::default())
        .pack()
        .await
        .unwrap();

    let base = ws.root().join("unpack");
    let launcher = RecordingLauncher::default();
    let bootstrap = Bootstrap::with(&payload_dir, Some(&base), TarGzExtractor, &launcher).unwrap();

    assert_eq!(bootstrap.prepare().unwrap(), Staleness::Stale);
    assert_eq!(bootstrap.run().unwrap(), 0);

    let unpack = base.join("basic-app");
    assert!(unpack.join("node").is_file());
    assert!(unpack.join("node_modules/left-pad/index.js").is_file());
    assert!(unpack.join("app/src/lib/greet.js").is_file());
    assert!(unpack.join("metadata.json").is_file());
    assert_eq!(
        *launcher.launched.borrow(),
        Some((unpack.join("node"), unpack.join("app/src/index.js")))
    );
}

#[tokio::test]
async fn dependency_override_skips_resolution() {
    let ws = Workspace::new();
    let settings = ws
        .builder()
        .amendments(DependencyAmendments {
            replace: Some(vec!["@scope/tool@2.0.0".parse::<DependencySpec>().unwrap()]),
            add: vec!["left-pad".parse().unwrap()],
            exclude: Vec::new(),
        })
        .build()
        .await
        .unwrap();

    let report = Packager::new(settings, FakeNpm::default(), FakeFreezer::default())
        .pack()
        .await
        .unwrap();

    assert_eq!(report.dependencies.len(), 2);
    assert_eq!(report.dependencies["@scope/tool"], "2.0.0");
    // bare name takes the range declared in package.json
    assert_eq!(report.dependencies["left-pad"], "^1.3.0");
}

#[tokio::test]
async fn clean_run_removes_staging() {
    let ws = Workspace::new();
    let settings = ws.builder().clean(true).build().await.unwrap();
    let staging = settings.staging_root().to_path_buf();

    let report = Packager::new(settings, FakeNpm::default(), FakeFreezer::default())
        .pack()
        .await
        .unwrap();

    assert!(report.output.is_file());
    assert!(!staging.exists());
}

#[tokio::test]
async fn freezer_failure_is_reported_and_staging_kept() {
    let ws = Workspace::new();
    let settings = ws.builder().clean(true).build().await.unwrap();
    let staging = settings.staging_root().to_path_buf();
    let output = settings.output_file().to_path_buf();

    let err = Packager::new(settings, FakeNpm::default(), FailingFreezer)
        .pack()
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "ExternalToolError");
    assert!(err.to_string().contains("No available node version"));
    assert!(!output.exists());
    assert!(staging.join("bootstrap/metadata.json").exists());
}

#[tokio::test]
async fn each_run_gets_a_new_build_id() {
    let ws = Workspace::new();
    let mut ids = Vec::new();
    for _ in 0..2 {
        let settings = ws.builder().build().await.unwrap();
        let report = Packager::new(settings, FakeNpm::default(), FakeFreezer::default())
            .pack()
            .await
            .unwrap();
        ids.push(report.build_id);
    }
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn untagged_target_records_the_staged_runtime_name() {
    let ws = Workspace::new();
    let settings = ws.builder().target("node20").build().await.unwrap();
    let staging = settings.staging_root().to_path_buf();
    let expected = settings.target().runtime_file_name();

    Packager::new(settings, FakeNpm::default(), FakeFreezer::default())
        .pack()
        .await
        .unwrap();

    let payload = PayloadSet::new(staging.join("bootstrap"));
    let metadata = BuildMetadata::read(&payload.metadata()).unwrap();
    assert_eq!(metadata.runtime, expected);

    let unpacked = tempfile::tempdir().unwrap();
    assert_eq!(
        extract_tar_gz(&payload.runtime(), unpacked.path()).unwrap(),
        vec![PathBuf::from(&metadata.runtime)]
    );

    // the launcher is pointed at the archived name, whatever the target says
    let bootstrap = Bootstrap::open(payload.dir(), Some(unpacked.path())).unwrap();
    assert_eq!(
        bootstrap.runtime_path(),
        unpacked.path().join("basic-app").join(&metadata.runtime)
    );
}
