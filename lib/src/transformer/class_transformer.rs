use crate::jvm;
use crate::jvm::model::Class;
use crate::jvm::BinaryName;
use crate::transformer::{input_files, is_archive, visit_archive, ArchiveWriter};
use log::{debug, info};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

/// Edit to apply to a class
pub trait Transformer<E> {
    fn transform(&self, class: &mut Class) -> Result<(), E>;
}

impl<E, F: Fn(&mut Class) -> Result<(), E>> Transformer<E> for F {
    fn transform(&self, class: &mut Class) -> Result<(), E> {
        self(class)
    }
}

/// Transformer which only applies to some classes
pub trait TargetedTransformer<E>: Transformer<E> {
    /// Classes the transformer should run on
    fn target_classes(&self) -> Vec<BinaryName>;
}

/// Hook run after a whole pass completes
pub type AfterTransform<'a, E> = Box<dyn Fn() -> Result<(), E> + 'a>;

/// Pass which runs transformers over classes
///
/// Errors from reading or writing classes are converted into `E`, so that transformers can fail
/// with their own error type.
pub struct ClassTransformer<'a, E> {
    transformers: Vec<Rc<dyn Transformer<E> + 'a>>,
    targeted: BTreeMap<BinaryName, Vec<Rc<dyn Transformer<E> + 'a>>>,
    after_transform: Vec<AfterTransform<'a, E>>,
}

impl<'a, E> Default for ClassTransformer<'a, E> {
    fn default() -> Self {
        ClassTransformer {
            transformers: vec![],
            targeted: BTreeMap::new(),
            after_transform: vec![],
        }
    }
}

impl<'a, E: From<jvm::Error>> ClassTransformer<'a, E> {
    pub fn new() -> ClassTransformer<'a, E> {
        ClassTransformer::default()
    }

    /// Add a transformer which runs on every class
    pub fn add_transformer(&mut self, transformer: impl Transformer<E> + 'a) {
        self.transformers.push(Rc::new(transformer));
    }

    /// Add a transformer which runs on only the classes it targets
    pub fn add_targeted_transformer<T: TargetedTransformer<E> + 'a>(&mut self, transformer: Rc<T>) {
        for target in transformer.target_classes() {
            let shared: Rc<dyn Transformer<E> + 'a> = transformer.clone();
            self.targeted.entry(target).or_default().push(shared);
        }
    }

    /// Add a hook that runs after [`Self::parse`] or [`Self::transform`] have visited every class
    pub fn add_after_transform(&mut self, hook: impl Fn() -> Result<(), E> + 'a) {
        self.after_transform.push(Box::new(hook));
    }

    /// Number of classes which have targeted transformers
    pub fn targeted_class_count(&self) -> usize {
        self.targeted.len()
    }

    /// Run all matching transformers on a class
    ///
    /// Untargeted transformers run first, then targeted ones (in the order they were added).
    /// Returns whether any transformer ran.
    pub fn transform_class(&self, class: &mut Class) -> Result<bool, E> {
        let targeted = self.targeted.get(&class.name).map_or(&[][..], Vec::as_slice);
        if self.transformers.is_empty() && targeted.is_empty() {
            return Ok(false);
        }

        debug!("Transforming class {}", class.name);
        for transformer in self.transformers.iter().chain(targeted) {
            transformer.transform(class)?;
        }
        Ok(true)
    }

    /// Run all matching transformers on the bytes of a class file
    ///
    /// If nothing ran, the input bytes are returned unchanged.
    pub fn transform_bytes(&self, bytes: &[u8]) -> Result<Vec<u8>, E> {
        let mut class = Class::parse(bytes)?;
        if self.transform_class(&mut class)? {
            Ok(class.to_bytes()?)
        } else {
            Ok(bytes.to_vec())
        }
    }

    /// Run transformers over every class in a directory, jar, or single class file, discarding
    /// the edited classes
    pub fn parse(&self, input: &Path) -> Result<(), E> {
        if is_archive(input) {
            visit_archive(input, |entry| -> Result<(), E> {
                if entry.is_class() {
                    let mut class = Class::parse(&entry.contents)?;
                    self.transform_class(&mut class)?;
                }
                Ok(())
            })?;
            return self.run_after_transform();
        }

        for file in input_files(input)? {
            if !file.is_class() {
                continue;
            }
            let bytes = fs::read(&file.path).map_err(jvm::Error::IoError)?;
            let mut class = Class::parse(&bytes)?;
            self.transform_class(&mut class)?;
        }
        self.run_after_transform()
    }

    /// Run transformers over every class in a directory, jar, or single class file, writing out
    /// the results
    ///
    /// The output mirrors the input: a directory produces a directory with the same layout
    /// (including non-class files, which are copied), a jar produces a jar with the same entries
    /// in the same order, and a file produces a file.
    pub fn transform(&self, input: &Path, output: &Path) -> Result<(), E> {
        info!("Transforming {} to {}", input.display(), output.display());
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(jvm::Error::IoError)?;
        }
        if is_archive(input) {
            self.transform_archive(input, output)?;
            return self.run_after_transform();
        }

        let single_file = input.is_file();
        for file in input_files(input)? {
            let destination = if single_file {
                output.to_path_buf()
            } else {
                output.join(&file.relative)
            };
            if let Some(parent) = destination.parent() {
                fs::create_dir_all(parent).map_err(jvm::Error::IoError)?;
            }

            if file.is_class() {
                let bytes = fs::read(&file.path).map_err(jvm::Error::IoError)?;
                let transformed = self.transform_bytes(&bytes)?;
                fs::write(&destination, transformed).map_err(jvm::Error::IoError)?;
            } else {
                fs::copy(&file.path, &destination).map_err(jvm::Error::IoError)?;
            }
        }
        self.run_after_transform()
    }

    fn transform_archive(&self, input: &Path, output: &Path) -> Result<(), E> {
        let mut writer = ArchiveWriter::create(output)?;
        visit_archive(input, |mut entry| -> Result<(), E> {
            if entry.is_class() {
                entry.contents = self.transform_bytes(&entry.contents)?;
            }
            writer.add(&entry)?;
            Ok(())
        })?;
        writer.finish()?;
        Ok(())
    }

    fn run_after_transform(&self) -> Result<(), E> {
        for hook in &self.after_transform {
            hook()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::jvm::model::Member;
    use crate::transformer::ArchiveEntry;
    use crate::jvm::{AccessFlags, Name, UnqualifiedName};
    use std::cell::{Cell, RefCell};

    fn binary(name: &str) -> BinaryName {
        BinaryName::from_string(name.to_owned()).unwrap()
    }

    fn class_bytes(name: &str) -> Vec<u8> {
        Class::new(binary(name), Some(BinaryName::OBJECT), AccessFlags::PUBLIC)
            .to_bytes()
            .unwrap()
    }

    struct AddField {
        target: BinaryName,
        ran: Cell<bool>,
    }

    impl Transformer<jvm::Error> for AddField {
        fn transform(&self, class: &mut Class) -> Result<(), jvm::Error> {
            self.ran.set(true);
            let name = UnqualifiedName::from_string(String::from("added")).unwrap();
            class.add_field(Member::new(AccessFlags::PRIVATE, name, "I"))
        }
    }

    impl TargetedTransformer<jvm::Error> for AddField {
        fn target_classes(&self) -> Vec<BinaryName> {
            vec![self.target.clone()]
        }
    }

    #[test]
    fn untouched_classes_are_copied() {
        let pass: ClassTransformer<jvm::Error> = ClassTransformer::new();
        let bytes = class_bytes("me/Other");
        assert_eq!(pass.transform_bytes(&bytes).unwrap(), bytes);
    }

    #[test]
    fn targeted_transformers() {
        let add = Rc::new(AddField {
            target: binary("me/Target"),
            ran: Cell::new(false),
        });
        let mut pass = ClassTransformer::new();
        pass.add_targeted_transformer(add.clone());
        assert_eq!(pass.targeted_class_count(), 1);

        pass.transform_bytes(&class_bytes("me/Other")).unwrap();
        assert!(!add.ran.get());

        let transformed = pass.transform_bytes(&class_bytes("me/Target")).unwrap();
        assert!(add.ran.get());
        assert_eq!(Class::parse(&transformed).unwrap().fields.len(), 1);
    }

    #[test]
    fn directories() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::create_dir_all(input.path().join("me")).unwrap();
        fs::write(input.path().join("me/Target.class"), class_bytes("me/Target")).unwrap();
        fs::write(input.path().join("me/notes.txt"), b"hello").unwrap();

        let seen = RefCell::new(vec![]);
        let finished = Cell::new(false);
        let mut pass: ClassTransformer<jvm::Error> = ClassTransformer::new();
        pass.add_transformer(|class: &mut Class| {
            seen.borrow_mut().push(class.name.clone());
            Ok(())
        });
        pass.add_after_transform(|| {
            finished.set(true);
            Ok(())
        });
        pass.transform(input.path(), output.path()).unwrap();

        assert!(finished.get());
        assert_eq!(*seen.borrow(), vec![binary("me/Target")]);
        assert_eq!(
            fs::read(output.path().join("me/notes.txt")).unwrap(),
            b"hello"
        );
        let written = fs::read(output.path().join("me/Target.class")).unwrap();
        assert_eq!(Class::parse(&written).unwrap().name, binary("me/Target"));
    }

    #[test]
    fn jars() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("classes.jar");
        let output = dir.path().join("out/classes.jar");

        let entries = vec![
            ArchiveEntry {
                name: String::from("META-INF/MANIFEST.MF"),
                directory: false,
                contents: b"Manifest-Version: 1.0\n".to_vec(),
            },
            ArchiveEntry {
                name: String::from("me/"),
                directory: true,
                contents: vec![],
            },
            ArchiveEntry {
                name: String::from("me/Target.class"),
                directory: false,
                contents: class_bytes("me/Target"),
            },
            ArchiveEntry {
                name: String::from("me/Other.class"),
                directory: false,
                contents: class_bytes("me/Other"),
            },
        ];
        let mut writer = ArchiveWriter::create(&input).unwrap();
        for entry in &entries {
            writer.add(entry).unwrap();
        }
        writer.finish().unwrap();

        let add = Rc::new(AddField {
            target: binary("me/Target"),
            ran: Cell::new(false),
        });
        let mut pass = ClassTransformer::new();
        pass.add_targeted_transformer(add.clone());

        pass.parse(&input).unwrap();
        assert!(add.ran.get());

        pass.transform(&input, &output).unwrap();
        let mut written = vec![];
        visit_archive(&output, |entry| -> Result<(), jvm::Error> {
            written.push(entry);
            Ok(())
        })
        .unwrap();

        let names: Vec<&str> = written.iter().map(|entry| entry.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["META-INF/MANIFEST.MF", "me/", "me/Target.class", "me/Other.class"]
        );
        assert_eq!(written[0], entries[0]);
        assert_eq!(written[3], entries[3]);
        assert_eq!(Class::parse(&written[2].contents).unwrap().fields.len(), 1);
    }
}
