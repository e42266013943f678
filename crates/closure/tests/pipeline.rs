//! End-to-end restore runs against in-memory services.

use async_trait::async_trait;
use ladle_closure::resolve::models::{
    GenerateClosureRequestModel, GenerateClosureResult, GenerateClosureResultModel,
    PackageClosureEntryModel, PackagePublicReferenceModel,
};
use ladle_closure::{ClosureResolver, Collaborators, PackageManager};
use ladle_core::config::Config;
use ladle_core::lockfile::{PACKAGE_LOCK_FILE_NAME, PackageLock};
use ladle_core::manifest::TomlRecipeReader;
use ladle_core::package::{PackageName, SemanticVersion};
use ladle_core::store::{LockStore, PackageStore, STAGING_PREFIX};
use ladle_core::{Error, Result};
use ladle_store::{PackageContentService, ZipExtractor};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

type Responder =
    Box<dyn Fn(&GenerateClosureRequestModel) -> GenerateClosureResultModel + Send + Sync>;

struct FakeResolver {
    respond: Responder,
    requests: Mutex<Vec<GenerateClosureRequestModel>>,
}

impl FakeResolver {
    fn new(
        respond: impl Fn(&GenerateClosureRequestModel) -> GenerateClosureResultModel
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ClosureResolver for FakeResolver {
    async fn generate_closure(
        &self,
        request: &GenerateClosureRequestModel,
    ) -> Result<GenerateClosureResultModel> {
        self.requests.lock().unwrap().push(request.clone());
        Ok((self.respond)(request))
    }
}

#[derive(Default)]
struct FakeContent {
    archives: HashMap<String, Vec<u8>>,
    downloads: Mutex<Vec<String>>,
    delay: Duration,
}

impl FakeContent {
    fn with_recipe(mut self, language: &str, name: &str, version: &str, recipe: &str) -> Self {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        writer.start_file("Recipe.toml", options).unwrap();
        writer.write_all(recipe.as_bytes()).unwrap();
        let bytes = writer.finish().unwrap().into_inner();
        self.archives
            .insert(format!("{} {}@{}", language, name, version), bytes);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn download_count(&self) -> usize {
        self.downloads.lock().unwrap().len()
    }
}

#[async_trait]
impl PackageContentService for FakeContent {
    async fn download(
        &self,
        language: &str,
        name: &PackageName,
        version: &SemanticVersion,
    ) -> Result<Vec<u8>> {
        let key = format!("{} {}@{}", language, name, version);
        self.downloads.lock().unwrap().push(key.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.archives
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::PackageVersionMissing {
                language: language.to_string(),
                name: name.to_string(),
                version: version.to_string(),
            })
    }
}

struct Workspace {
    temp: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            temp: TempDir::new().unwrap(),
        }
    }

    fn recipe(&self, directory: &str, content: &str) -> PathBuf {
        let directory = self.temp.path().join("work").join(directory);
        std::fs::create_dir_all(&directory).unwrap();
        std::fs::write(directory.join("Recipe.toml"), content).unwrap();
        directory
    }

    fn package_store(&self) -> PackageStore {
        PackageStore::new(self.temp.path().join("packages"))
    }

    fn lock_store(&self) -> LockStore {
        LockStore::new(self.temp.path().join("locks"))
    }

    /// Staging directories left in the package store.
    fn staging_leftovers(&self) -> usize {
        let Ok(entries) = std::fs::read_dir(self.package_store().root()) else {
            return 0;
        };
        entries
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .starts_with(STAGING_PREFIX)
            })
            .count()
    }

    fn manager(&self, resolver: Arc<FakeResolver>, content: Arc<FakeContent>) -> PackageManager {
        PackageManager::new(
            Collaborators {
                manifests: Arc::new(TomlRecipeReader),
                resolver,
                content,
                extractor: Arc::new(ZipExtractor),
            },
            Config::default().language_table(),
            self.package_store(),
            self.lock_store(),
        )
    }
}

fn local(id: u32) -> PackageClosureEntryModel {
    PackageClosureEntryModel {
        local_package_id: Some(id),
        ..Default::default()
    }
}

fn public(language: &str, owner: &str, name: &str, version: SemanticVersion) -> PackageClosureEntryModel {
    PackageClosureEntryModel {
        public_package: Some(PackagePublicReferenceModel {
            language: language.to_string(),
            owner: Some(owner.to_string()),
            name: name.to_string(),
            version: Some(version.into()),
        }),
        ..Default::default()
    }
}

fn success(
    runtime: Vec<PackageClosureEntryModel>,
    build: Vec<(&str, Vec<PackageClosureEntryModel>)>,
    tool: Vec<(&str, Vec<PackageClosureEntryModel>)>,
) -> GenerateClosureResultModel {
    let named = |closures: Vec<(&str, Vec<PackageClosureEntryModel>)>| -> BTreeMap<_, _> {
        closures
            .into_iter()
            .map(|(name, entries)| (name.to_string(), entries))
            .collect()
    };
    GenerateClosureResultModel {
        result: GenerateClosureResult::Success,
        message: None,
        runtime_closure: runtime,
        build_closures: named(build),
        tool_closures: named(tool),
    }
}

/// A depends on B, B uses the tool T@1.2.3 written in C#.
fn tool_workspace() -> (Workspace, PathBuf) {
    let workspace = Workspace::new();
    let a = workspace.recipe(
        "A",
        "Name = \"A\"\nLanguage = \"C++|0.8.2\"\n[Dependencies]\nRuntime = [\"../B\"]\n",
    );
    workspace.recipe(
        "B",
        "Name = \"B\"\nLanguage = \"C++|0.8.2\"\n[Dependencies]\nTool = [\"[C#]o|T@1.2.3\"]\n",
    );
    (workspace, a)
}

fn tool_resolver() -> Arc<FakeResolver> {
    FakeResolver::new(|request| {
        if request.root_package.name == "T" {
            return success(vec![local(request.root_package.id)], vec![], vec![]);
        }
        let mut b = local(2);
        b.tool_closure = Some("Tool0".into());
        success(
            vec![local(1), b],
            vec![],
            vec![(
                "Tool0",
                vec![public("C#", "o", "T", SemanticVersion::new(1, 2, 3))],
            )],
        )
    })
}

fn tool_content() -> Arc<FakeContent> {
    Arc::new(FakeContent::default().with_recipe(
        "C#",
        "o|T",
        "1.2.3",
        "Name = \"T\"\nLanguage = \"C#|0.9.0\"\n",
    ))
}

#[tokio::test]
async fn tool_dependency_is_locked_and_installed() {
    let (workspace, a) = tool_workspace();
    let resolver = tool_resolver();
    let content = tool_content();
    let manager = workspace.manager(resolver.clone(), content.clone());

    manager.restore_packages(&a).await.unwrap();

    let requests = resolver.requests.lock().unwrap().clone();
    assert_eq!(requests[0].public_packages.len(), 1);
    assert_eq!(requests[0].public_packages[0].id, 3);
    assert_eq!(requests[0].local_packages.len(), 1);

    let lock = PackageLock::try_load(&a.join(PACKAGE_LOCK_FILE_NAME))
        .unwrap()
        .unwrap();
    let names: Vec<_> = lock.closures.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, ["Root", "Tool0"]);

    let root = &lock.root_closure().unwrap().languages["Cpp"];
    let b = root
        .iter()
        .find(|p| p.name == PackageName::local("B"))
        .unwrap();
    assert_eq!(b.path.as_deref(), Some("../B/"));
    assert_eq!(b.tool.as_deref(), Some("Tool0"));

    let tool = &lock.closure("Tool0").unwrap().languages["CSharp"];
    assert_eq!(tool.len(), 1);
    assert_eq!(tool[0].name, PackageName::owned("o", "T"));
    assert_eq!(tool[0].version, Some(SemanticVersion::new(1, 2, 3)));

    // T was installed and got its own lock in the lock store
    let t = PackageName::owned("o", "T");
    let version = SemanticVersion::new(1, 2, 3);
    assert!(workspace.package_store().is_installed("CSharp", &t, &version));
    assert!(workspace.lock_store().lock_path("CSharp", &t, &version).is_file());
    assert_eq!(workspace.staging_leftovers(), 0);
    assert_eq!(content.download_count(), 1);
}

#[tokio::test]
async fn second_restore_uses_locks_only() {
    let (workspace, a) = tool_workspace();
    let resolver = tool_resolver();
    let content = tool_content();
    let manager = workspace.manager(resolver.clone(), content.clone());

    manager.restore_packages(&a).await.unwrap();
    let lock_text = std::fs::read_to_string(a.join(PACKAGE_LOCK_FILE_NAME)).unwrap();
    let requests = resolver.request_count();

    manager.restore_packages(&a).await.unwrap();
    assert_eq!(resolver.request_count(), requests);
    assert_eq!(content.download_count(), 1);
    assert_eq!(
        std::fs::read_to_string(a.join(PACKAGE_LOCK_FILE_NAME)).unwrap(),
        lock_text
    );
}

#[tokio::test]
async fn rejected_resolution_writes_no_lock() {
    let workspace = Workspace::new();
    let app = workspace.recipe(
        "App",
        "Name = \"App\"\nLanguage = \"C++|0.8.2\"\n[Dependencies]\nRuntime = [\"o|json11@1.1\"]\n",
    );
    let resolver = FakeResolver::new(|_| GenerateClosureResultModel {
        result: GenerateClosureResult::Failure,
        message: Some("version conflict".into()),
        runtime_closure: Vec::new(),
        build_closures: BTreeMap::new(),
        tool_closures: BTreeMap::new(),
    });
    let content = Arc::new(FakeContent::default());
    let manager = workspace.manager(resolver, content.clone());

    let error = manager.restore_packages(&app).await.unwrap_err();
    assert!(matches!(error, Error::ResolutionRejected { .. }));
    assert!(error.to_string().contains("version conflict"));
    assert!(!app.join(PACKAGE_LOCK_FILE_NAME).exists());
    assert!(!workspace.package_store().root().exists());
    assert!(!workspace.temp.path().join("locks").exists());
    assert_eq!(content.download_count(), 0);
}

/// App depends on the single public package `o|<name>@1.0.0`.
fn single_dependency(workspace: &Workspace, name: &str) -> PathBuf {
    workspace.recipe(
        &format!("App{}", name),
        &format!(
            "Name = \"App\"\nLanguage = \"C++|0.8.2\"\n[Dependencies]\nRuntime = [\"o|{}@1.0.0\"]\n",
            name
        ),
    )
}

fn single_dependency_resolver(name: &'static str) -> Arc<FakeResolver> {
    FakeResolver::new(move |_| {
        success(
            vec![local(1), public("C++", "o", name, SemanticVersion::new(1, 0, 0))],
            vec![],
            vec![],
        )
    })
}

#[tokio::test]
async fn concurrent_restores_share_a_store() {
    let workspace = Workspace::new();
    let slow_app = single_dependency(&workspace, "slow");
    let fast_app = single_dependency(&workspace, "fast");
    let recipe = "Name = \"Dep\"\nLanguage = \"C++|0.8.2\"\n";

    let slow = workspace.manager(
        single_dependency_resolver("slow"),
        Arc::new(
            FakeContent::default()
                .with_recipe("C++", "o|slow", "1.0.0", recipe)
                .with_delay(Duration::from_millis(300)),
        ),
    );
    let fast = workspace.manager(
        single_dependency_resolver("fast"),
        Arc::new(FakeContent::default().with_recipe("C++", "o|fast", "1.0.0", recipe)),
    );

    let (slow_result, fast_result) = tokio::join!(slow.restore_packages(&slow_app), async {
        tokio::time::sleep(Duration::from_millis(50)).await;
        fast.restore_packages(&fast_app).await
    });
    slow_result.unwrap();
    fast_result.unwrap();

    let store = workspace.package_store();
    let version = SemanticVersion::new(1, 0, 0);
    assert!(store.is_installed("Cpp", &PackageName::owned("o", "slow"), &version));
    assert!(store.is_installed("Cpp", &PackageName::owned("o", "fast"), &version));
    assert_eq!(workspace.staging_leftovers(), 0);
}

#[tokio::test]
async fn existing_lock_skips_resolution() {
    let workspace = Workspace::new();
    let app = workspace.recipe("App", "Name = \"App\"\nLanguage = \"C++|0.8.2\"\n");
    std::fs::write(
        app.join(PACKAGE_LOCK_FILE_NAME),
        r#"version = 5

[[closures]]
name = "Root"

[[closures.languages.Cpp]]
name = "App"
path = "./"

[[closures.languages.Cpp]]
name = "o|pkgX"
version = "2.0.0"
"#,
    )
    .unwrap();
    let installed = workspace.package_store().package_directory(
        "Cpp",
        &PackageName::owned("o", "pkgX"),
        &SemanticVersion::new(2, 0, 0),
    );
    std::fs::create_dir_all(&installed).unwrap();

    let resolver = FakeResolver::new(|_| panic!("resolution must not run"));
    let content = Arc::new(FakeContent::default());
    let manager = workspace.manager(resolver.clone(), content.clone());

    manager.restore_packages(&app).await.unwrap();
    assert_eq!(resolver.request_count(), 0);
    assert_eq!(content.download_count(), 0);
}

#[tokio::test]
async fn incompatible_lock_is_regenerated() {
    let workspace = Workspace::new();
    let app = workspace.recipe("App", "Name = \"App\"\nLanguage = \"C++|0.8.2\"\n");
    std::fs::write(app.join(PACKAGE_LOCK_FILE_NAME), "version = 3\n").unwrap();

    let resolver = FakeResolver::new(|request| {
        success(vec![local(request.root_package.id)], vec![], vec![])
    });
    let manager = workspace.manager(resolver.clone(), Arc::new(FakeContent::default()));

    manager.restore_packages(&app).await.unwrap();
    assert_eq!(resolver.request_count(), 1);
    let lock = PackageLock::try_load(&app.join(PACKAGE_LOCK_FILE_NAME))
        .unwrap()
        .unwrap();
    assert_eq!(lock.version, 5);
}

#[tokio::test]
async fn local_build_dependency_gets_its_own_lock() {
    let workspace = Workspace::new();
    let app = workspace.recipe(
        "App",
        "Name = \"App\"\nLanguage = \"C++|0.8.2\"\n[Dependencies]\nBuild = [\"../Extension\"]\n",
    );
    let extension = workspace.recipe("Extension", "Name = \"Extension\"\nLanguage = \"Wren|0.4.1\"\n");

    let resolver = FakeResolver::new(|request| {
        if request.root_package.name == "Extension" {
            return success(vec![local(request.root_package.id)], vec![], vec![]);
        }
        let mut app = local(1);
        app.build_closure = Some("Build0".into());
        success(
            vec![app],
            vec![(
                "Build0",
                vec![
                    local(2),
                    public("Wren", "mwasplund", "Soup.Cpp", SemanticVersion::new(0, 8, 2)),
                ],
            )],
            vec![],
        )
    });
    let content = Arc::new(FakeContent::default());
    let manager = workspace.manager(resolver.clone(), content.clone());

    manager.restore_packages(&app).await.unwrap();

    let lock = PackageLock::try_load(&app.join(PACKAGE_LOCK_FILE_NAME))
        .unwrap()
        .unwrap();
    let build = &lock.closure("Build0").unwrap().languages["Wren"];
    assert!(build.iter().any(|p| p.path.as_deref() == Some("../Extension/")));

    // The pinned extension is neither downloaded nor locked
    assert_eq!(content.download_count(), 0);
    assert!(extension.join(PACKAGE_LOCK_FILE_NAME).is_file());
    assert_eq!(resolver.request_count(), 2);
}

#[tokio::test]
async fn missing_recipe_aborts_without_lock() {
    let workspace = Workspace::new();
    let app = workspace.recipe(
        "App",
        "Name = \"App\"\nLanguage = \"C++|0.8.2\"\n[Dependencies]\nRuntime = [\"../Missing\"]\n",
    );
    let resolver = FakeResolver::new(|_| panic!("resolution must not run"));
    let manager = workspace.manager(resolver, Arc::new(FakeContent::default()));

    let error = manager.restore_packages(&app).await.unwrap_err();
    assert!(matches!(error, Error::RecipeNotFound { .. }));
    assert!(!error.is_handled());
    assert!(!app.join(PACKAGE_LOCK_FILE_NAME).exists());
}

#[tokio::test]
async fn redundant_path_components_are_normalized() {
    let workspace = Workspace::new();
    let app = workspace.recipe("App", "Name = \"App\"\nLanguage = \"C++|0.8.2\"\n");
    let resolver = FakeResolver::new(|request| {
        success(vec![local(request.root_package.id)], vec![], vec![])
    });
    let manager = workspace.manager(resolver, Arc::new(FakeContent::default()));

    let spelled = app.join("..").join("App");
    manager.restore_packages(&spelled).await.unwrap();
    assert!(app.join(PACKAGE_LOCK_FILE_NAME).is_file());
}
