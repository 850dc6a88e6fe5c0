use super::{
    CodeInjector, DirectiveRegistry, Error, LogSink, MixinProcessor, MixinTransformer, Processed,
    Settings, UnavailableInjector,
};
use crate::jvm::model::Class;
use crate::jvm::BinaryName;
use crate::transformer::ClassTransformer;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Which classes of a mixin source are considered
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceFilter {
    /// Every class in the source
    All,

    /// Only classes in one of these packages (or their subpackages), written as `my/package`
    Packages(Vec<String>),
}

impl SourceFilter {
    pub fn matches(&self, class: &BinaryName) -> bool {
        match self {
            SourceFilter::All => true,
            SourceFilter::Packages(packages) => packages
                .iter()
                .any(|package| class.is_in_package(package)),
        }
    }
}

/// Configures and builds a [`MixinPass`]
///
/// ```no_run
/// use mixin::mixin::{DirectiveRegistry, MixinApplicator, Settings};
///
/// # fn build() -> Result<(), mixin::mixin::Error> {
/// let registry = DirectiveRegistry::with_builtins();
/// let pass = MixinApplicator::new(&registry, Settings::new())
///     .add_source("build/mixins", Some("org.example.mixins"))
///     .build()?;
/// pass.transform("build/classes", "build/patched-classes")?;
/// # Ok(())
/// # }
/// ```
pub struct MixinApplicator<'r> {
    registry: &'r DirectiveRegistry,
    settings: Rc<Settings>,
    sources: BTreeMap<PathBuf, SourceFilter>,
    log: LogSink,
    custom_log: bool,
    injector: Rc<dyn CodeInjector>,
}

impl<'r> MixinApplicator<'r> {
    pub fn new(registry: &'r DirectiveRegistry, settings: Settings) -> MixinApplicator<'r> {
        MixinApplicator {
            registry,
            settings: Rc::new(settings),
            sources: BTreeMap::new(),
            log: LogSink::default(),
            custom_log: false,
            injector: Rc::new(UnavailableInjector),
        }
    }

    /// Add a directory, jar, or class file to search for mixins
    ///
    /// With a package (eg. `org.example.mixins`), only classes in that package (or its
    /// subpackages) are considered. Packages match whole segments rather than a string prefix:
    /// `org.example` takes `org.example.sub.Mixin` but not `org.examples.Mixin`.
    /// The same source can be added with several packages, but adding it once without a package
    /// means every class in it is considered, whatever other packages are added.
    pub fn add_source(mut self, path: impl Into<PathBuf>, package: Option<&str>) -> Self {
        let filter = self
            .sources
            .entry(path.into())
            .or_insert_with(|| SourceFilter::Packages(vec![]));
        match package {
            None => *filter = SourceFilter::All,
            Some(package) => {
                if let SourceFilter::Packages(packages) = filter {
                    packages.push(package.replace('.', "/"));
                }
            }
        }
        self
    }

    /// Send progress messages somewhere other than the `log` crate
    pub fn with_log(mut self, log: LogSink) -> Self {
        if self.custom_log {
            self.log.log(&format!(
                "Unregistering logger {}, registering {}",
                self.log, log
            ));
        }
        self.log = log;
        self.custom_log = true;
        self
    }

    pub fn with_injector(mut self, injector: Rc<dyn CodeInjector>) -> Self {
        self.injector = injector;
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sources(&self) -> impl Iterator<Item = (&Path, &SourceFilter)> {
        self.sources
            .iter()
            .map(|(path, filter)| (path.as_path(), filter))
    }

    /// Read every mixin from the sources and prepare a pass applying them
    ///
    /// Sources are read in path order, and classes in each source in file name order, so the
    /// transformers of a target always run in the same order.
    pub fn build(&self) -> Result<MixinPass, Error> {
        let processor = MixinProcessor {
            registry: self.registry,
            settings: &self.settings,
            injector: &self.injector,
            log: &self.log,
        };

        let mut mixins: Vec<Rc<MixinTransformer>> = vec![];
        for (path, filter) in &self.sources {
            let found = RefCell::new(vec![]);
            {
                let mut reader: ClassTransformer<Error> = ClassTransformer::new();
                reader.add_transformer(|class: &mut Class| -> Result<(), Error> {
                    if !filter.matches(&class.name) {
                        return Ok(());
                    }
                    if let Processed::Mixin(mixin) =
                        processor.process(class.clone(), self.settings.no_mixin)?
                    {
                        found.borrow_mut().push(Rc::new(mixin));
                    }
                    Ok(())
                });
                reader.parse(path)?;
            }
            mixins.extend(found.into_inner());
        }

        let sources: Vec<String> = self
            .sources
            .keys()
            .map(|path| path.display().to_string())
            .collect();
        self.log.log(&format!(
            "Found {} transformers in {:?}",
            mixins.len(),
            sources
        ));

        let mut transformer = ClassTransformer::new();
        for mixin in &mixins {
            transformer.add_targeted_transformer(mixin.clone());
        }
        if self.settings.not_applied_is_error {
            let check = mixins.clone();
            transformer.add_after_transform(move || check_applied(&check));
        }
        Ok(MixinPass {
            transformer,
            mixins,
        })
    }
}

/// Fail if some of the mixins have not been applied to their targets
pub fn check_applied(mixins: &[Rc<MixinTransformer>]) -> Result<(), Error> {
    let unapplied: Vec<String> = mixins
        .iter()
        .filter(|mixin| !mixin.ran())
        .map(|mixin| mixin.name().to_java_name())
        .collect();
    if unapplied.is_empty() {
        Ok(())
    } else {
        Err(Error::UnappliedTransformers {
            count: unapplied.len(),
            transformers: unapplied,
        })
    }
}

/// Class transformer pass applying a set of mixins
///
/// Mixins remember whether they ran, so a pass is meant to be run over its targets once.
pub struct MixinPass {
    transformer: ClassTransformer<'static, Error>,
    mixins: Vec<Rc<MixinTransformer>>,
}

impl MixinPass {
    /// Every mixin found, in the order they were read
    pub fn mixins(&self) -> &[Rc<MixinTransformer>] {
        &self.mixins
    }

    pub fn class_transformer(&self) -> &ClassTransformer<'static, Error> {
        &self.transformer
    }

    /// Apply the mixins to a directory, jar, or single class file, writing the results to `output`
    pub fn transform(
        &self,
        input: impl AsRef<Path>,
        output: impl AsRef<Path>,
    ) -> Result<(), Error> {
        self.transformer.transform(input.as_ref(), output.as_ref())
    }

    /// Apply the mixins to a directory, jar, or single class file without writing anything out
    pub fn parse(&self, input: impl AsRef<Path>) -> Result<(), Error> {
        self.transformer.parse(input.as_ref())
    }

    /// Apply the mixins to a single class
    pub fn transform_class(&self, class: &mut Class) -> Result<bool, Error> {
        self.transformer.transform_class(class)
    }

    pub fn transform_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, Error> {
        self.transformer.transform_bytes(bytes)
    }

    /// Mixins which haven't been applied yet
    pub fn unapplied(&self) -> impl Iterator<Item = &MixinTransformer> {
        self.mixins
            .iter()
            .filter(|mixin| !mixin.ran())
            .map(|mixin| mixin.as_ref())
    }

    pub fn check_applied(&self) -> Result<(), Error> {
        check_applied(&self.mixins)
    }
}
