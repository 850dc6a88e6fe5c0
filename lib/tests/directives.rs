mod common;

use common::*;
use mixin::jvm::class_file::{ConstantData, ConstantIndex};
use mixin::jvm::model::{Annotation, Class, ElementValue, Method};
use mixin::jvm::{AccessFlags, Name};
use mixin::mixin::{
    ApplicationType, CodeInjector, Directive, DirectiveKind, DirectiveRegistry, Error, Handler,
    LogSink, MixinProcessor, MixinTransformer, NoMixinPolicy, Processed, Settings,
    UnavailableInjector,
};
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

fn process_with(
    registry: &DirectiveRegistry,
    settings: Settings,
    injector: Rc<dyn CodeInjector>,
    mixin: Class,
) -> Result<MixinTransformer, Error> {
    let settings = Rc::new(settings);
    let log = LogSink::new("silent", |_| ());
    let processor = MixinProcessor {
        registry,
        settings: &settings,
        injector: &injector,
        log: &log,
    };
    match processor.process(mixin, NoMixinPolicy::Error)? {
        Processed::Mixin(mixin) => Ok(mixin),
        Processed::Skipped => panic!("mixin was skipped"),
    }
}

fn process(mixin: Class) -> Result<MixinTransformer, Error> {
    process_with(
        &DirectiveRegistry::with_builtins(),
        Settings::new(),
        Rc::new(UnavailableInjector),
        mixin,
    )
}

/// Apply the mixin, then round-trip the target through its class file
fn apply(mixin: Class, target: &mut Class, application_type: ApplicationType) -> Result<(), Error> {
    let mut settings = Settings::new();
    settings.application_type = application_type;
    let transformer = process_with(
        &DirectiveRegistry::with_builtins(),
        settings,
        Rc::new(UnavailableInjector),
        mixin,
    )?;
    transformer.apply(target)?;
    assert!(transformer.ran());
    *target = Class::parse(&target.to_bytes()?)?;
    Ok(())
}

fn flags(values: &[&str], mode: &str) -> Annotation {
    directive(DirectiveKind::FLAGS)
        .with_value("flags", strings(values))
        .with_value(
            "mode",
            ElementValue::Enum {
                type_descriptor: String::from("Ldev/minco/mixin/Flags$Mode;"),
                const_name: mode.to_owned(),
            },
        )
}

#[test]
fn added_fields_lose_their_suffix() {
    let mut mixin = counter_mixin()
        .field(AccessFlags::PUBLIC, "total_", "I")
        .method_with_code(
            AccessFlags::PUBLIC,
            "total",
            "()I",
            1,
            1,
            get_int_field("me/mixins/CounterMixin", "total_"),
        )
        .build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, Some("total_"), directive(DirectiveKind::ADD));
    annotate(&mut mixin, Some("total"), directive(DirectiveKind::ADD));

    let mut target = counter_class();
    apply(mixin, &mut target, ApplicationType::FinalPatch).unwrap();

    assert!(target.get_field("total_", "I").is_none());
    let field = target.get_field("total", "I").unwrap();
    assert_eq!(field.access_flags, AccessFlags::PROTECTED);

    // Directives are not copied, and field references follow the rename
    let method = target.get_method("total", "()I").unwrap();
    assert!(method.annotations.is_empty());
    let code = code_of(&target, "total", "()I");
    let field_ref = ConstantIndex(u16::from_be_bytes([code[2], code[3]]));
    assert_eq!(
        target.constant_pool().resolve(field_ref).unwrap(),
        ConstantData::FieldRef {
            class: String::from("me/Counter"),
            name: String::from("total"),
            descriptor: String::from("I"),
        }
    );
}

#[test]
fn added_fields_need_a_suffix() {
    let mut mixin = counter_mixin().field(AccessFlags::PUBLIC, "total", "I").build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, Some("total"), directive(DirectiveKind::ADD));

    let mut target = counter_class();
    let err = apply(mixin, &mut target, ApplicationType::FinalPatch).unwrap_err();
    assert!(matches!(
        &err,
        Error::HandlerExecution { kind, mixin, target, .. }
            if kind == "Add" && mixin == "me.mixins.CounterMixin" && target == "me.Counter"
    ));
    assert!(matches!(err.root_cause(), Error::InvalidMemberName { .. }));
}

#[test]
fn overwrite_only_in_final_patch() {
    let mixin = || {
        let mut mixin = counter_mixin()
            .method_with_code(AccessFlags::PUBLIC, "limit", "()I", 1, 1, return_int(42))
            .build();
        annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
        annotate(&mut mixin, Some("limit"), directive(DirectiveKind::OVERWRITE));
        mixin
    };

    let mut target = counter_class();
    apply(mixin(), &mut target, ApplicationType::PrePatch).unwrap();
    assert_eq!(code_of(&target, "limit", "()I"), vec![0x10, 10, 0xac]);

    let mut target = counter_class();
    apply(mixin(), &mut target, ApplicationType::FinalPatch).unwrap();
    assert_eq!(code_of(&target, "limit", "()I"), vec![0x10, 42, 0xac]);
    assert_eq!(target.methods.len(), 3);
    assert!(target.get_method("limit", "()I").unwrap().annotations.is_empty());
}

#[test]
fn overwrite_needs_an_existing_method() {
    for application_type in [ApplicationType::PrePatch, ApplicationType::FinalPatch] {
        let mut mixin = counter_mixin()
            .method_with_code(AccessFlags::PUBLIC, "limit", "()J", 2, 1, |_| vec![0x0a, 0xad])
            .build();
        annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
        annotate(&mut mixin, Some("limit"), directive(DirectiveKind::OVERWRITE));

        let err = apply(mixin, &mut counter_class(), application_type).unwrap_err();
        match err.root_cause() {
            Error::MissingTargetMember {
                member,
                target,
                available,
            } => {
                assert_eq!(member, "long limit()");
                assert_eq!(target, "me.Counter");
                assert_eq!(available.len(), 3);
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}

#[test]
fn shape_fixup_in_pre_patch() {
    let mixin = |make_public: bool| {
        let mut mixin = counter_mixin().build();
        annotate(
            &mut mixin,
            None,
            directive(DirectiveKind::MIXIN)
                .with_value("makePublic", ElementValue::Boolean(make_public)),
        );
        mixin
    };

    let mut target = counter_class();
    apply(mixin(false), &mut target, ApplicationType::PrePatch).unwrap();
    assert_eq!(target.access_flags, AccessFlags::PUBLIC | AccessFlags::SUPER);
    assert_eq!(
        target.get_method("<init>", "()V").unwrap().access_flags,
        AccessFlags::PROTECTED
    );
    assert_eq!(target.get_field("count", "I").unwrap().access_flags, AccessFlags::PROTECTED);
    assert_eq!(target.get_method("limit", "()I").unwrap().access_flags, AccessFlags::PUBLIC);
    assert_eq!(target.get_method("count", "()I").unwrap().access_flags, AccessFlags::PROTECTED);

    let mut target = counter_class();
    apply(mixin(true), &mut target, ApplicationType::PrePatch).unwrap();
    assert!(target
        .fields
        .iter()
        .chain(target.methods.iter())
        .all(|member| member.access_flags == AccessFlags::PUBLIC));

    let mut target = counter_class();
    let before = target.to_bytes().unwrap();
    apply(mixin(false), &mut target, ApplicationType::FinalPatch).unwrap();
    assert_eq!(target.to_bytes().unwrap(), before);
}

#[test]
fn no_constructor_is_added_to_classes_with_a_default_one() {
    let mut target = ClassBuilder::new("me/Counter", Some("java/lang/Object"), AccessFlags::PUBLIC)
        .method(AccessFlags::PRIVATE, "<init>", "()V")
        .build();
    let mut mixin = counter_mixin().build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));

    apply(mixin, &mut target, ApplicationType::PrePatch).unwrap();
    assert_eq!(target.constructors().count(), 1);
    assert_eq!(
        target.get_method("<init>", "()V").unwrap().access_flags,
        AccessFlags::PROTECTED
    );
}

#[test]
fn flags_on_classes_and_members() {
    let mut mixin = counter_mixin()
        .field(AccessFlags::PRIVATE, "count", "I")
        .field(AccessFlags::PRIVATE, "step_", "I")
        .method(AccessFlags::PUBLIC | AccessFlags::ABSTRACT, "limit", "()I")
        .build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, None, flags(&["final"], "REMOVE"));
    annotate(&mut mixin, Some("count"), flags(&["volatile transient"], "ADD"));
    annotate(&mut mixin, Some("step_"), directive(DirectiveKind::ADD));
    annotate(&mut mixin, Some("step_"), flags(&["static"], "ADD"));
    annotate(&mut mixin, Some("limit"), flags(&["private"], "SET"));

    let mut target = counter_class();
    apply(mixin, &mut target, ApplicationType::FinalPatch).unwrap();

    assert_eq!(target.access_flags, AccessFlags::PUBLIC | AccessFlags::SUPER);
    assert_eq!(
        target.get_field("count", "I").unwrap().access_flags,
        AccessFlags::PRIVATE | AccessFlags::VOLATILE | AccessFlags::TRANSIENT
    );
    assert_eq!(
        target.get_field("step", "I").unwrap().access_flags,
        AccessFlags::PROTECTED | AccessFlags::STATIC
    );
    assert_eq!(target.get_method("limit", "()I").unwrap().access_flags, AccessFlags::PRIVATE);
}

#[test]
fn unknown_flags() {
    let mut mixin = counter_mixin().build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, None, flags(&["shiny"], "ADD"));

    let err = apply(mixin, &mut counter_class(), ApplicationType::FinalPatch).unwrap_err();
    assert!(matches!(
        err.root_cause(),
        Error::InvalidDirective { directive, .. } if directive == "Flags"
    ));
}

#[test]
fn handlers_run_by_priority() {
    let seen = Arc::new(Mutex::new(vec![]));
    let mut registry = DirectiveRegistry::with_builtins();
    for priority in [3, 1] {
        let seen = seen.clone();
        registry.register(
            DirectiveKind::FLAGS,
            priority,
            Handler::any(move |_, _, _, target| {
                seen.lock().unwrap().push((priority, target.access_flags));
                Ok(())
            }),
        );
    }

    let mut mixin = counter_mixin().build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, None, flags(&["public"], "SET"));

    let transformer = process_with(
        &registry,
        Settings::new(),
        Rc::new(UnavailableInjector),
        mixin,
    )
    .unwrap();
    assert_eq!(transformer.applicator_count(), 5);
    let kinds: Vec<&str> = transformer
        .directives()
        .map(|directive| directive.kind.as_str())
        .collect();
    assert_eq!(kinds, vec!["Mixin", "Mixin", "Flags", "Flags", "Flags"]);

    transformer.apply(&mut counter_class()).unwrap();
    assert_eq!(
        *seen.lock().unwrap(),
        vec![
            (1, AccessFlags::PUBLIC | AccessFlags::FINAL | AccessFlags::SUPER),
            (3, AccessFlags::PUBLIC),
        ]
    );
}

#[test]
fn synchronize() {
    let mut mixin = counter_mixin()
        .method(AccessFlags::ABSTRACT, "count", "()I")
        .build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, Some("count"), directive(DirectiveKind::SYNCHRONIZE));

    let mut target = counter_class();
    apply(mixin, &mut target, ApplicationType::FinalPatch).unwrap();
    assert_eq!(
        target.get_method("count", "()I").unwrap().access_flags,
        AccessFlags::SYNCHRONIZED
    );
}

#[derive(Default)]
struct RecordingInjector {
    injections: RefCell<Vec<(String, String)>>,
}

impl CodeInjector for RecordingInjector {
    fn inject(
        &self,
        target: &mut Method,
        injectable: &Method,
        _directive: &Directive,
        _fail_on_error: bool,
    ) -> Result<(), Error> {
        self.injections
            .borrow_mut()
            .push((target.name.to_string(), injectable.name.to_string()));
        Ok(())
    }
}

fn inject_mixin(injectable: &str, candidates: &[(&str, Option<&str>)]) -> Class {
    let mut builder = counter_mixin().method(AccessFlags::ABSTRACT, "count", "()I");
    for (method, _) in candidates {
        builder = builder.method(AccessFlags::PRIVATE, method, "()V");
    }
    let mut mixin = builder.build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(
        &mut mixin,
        Some("count"),
        directive(DirectiveKind::INJECT).with_value("injectable", string(injectable)),
    );
    for (method, name) in candidates {
        let mut annotation = directive(DirectiveKind::INJECTABLE);
        if let Some(name) = name {
            annotation = annotation.with_value("name", string(name));
        }
        annotate(&mut mixin, Some(*method), annotation);
    }
    mixin
}

fn inject(mixin: Class) -> (Result<(), Error>, Vec<(String, String)>) {
    let injector = Rc::new(RecordingInjector::default());
    let result = process_with(
        &DirectiveRegistry::with_builtins(),
        Settings::new(),
        injector.clone(),
        mixin,
    )
    .and_then(|transformer| transformer.apply(&mut counter_class()));
    let injections = injector.injections.borrow().clone();
    (result, injections)
}

#[test]
fn inject_resolves_one_injectable() {
    let (result, injections) = inject(inject_mixin(
        "hook",
        &[("beforeCount", Some("hook")), ("other", None)],
    ));
    result.unwrap();
    assert_eq!(
        injections,
        vec![(String::from("count"), String::from("beforeCount"))]
    );

    // Without a name, injectables go by their method name
    let (result, injections) = inject(inject_mixin("hook", &[("hook", None)]));
    result.unwrap();
    assert_eq!(injections, vec![(String::from("count"), String::from("hook"))]);
}

#[test]
fn inject_needs_exactly_one_injectable() {
    let (result, injections) = inject(inject_mixin("missing", &[("hook", None)]));
    assert!(matches!(
        result.unwrap_err().root_cause(),
        Error::InjectableResolutionError { injectable, found: 0, .. } if injectable == "missing"
    ));
    assert!(injections.is_empty());

    let (result, _) = inject(inject_mixin(
        "hook",
        &[("hook", None), ("beforeCount", Some("hook"))],
    ));
    assert!(matches!(
        result.unwrap_err().root_cause(),
        Error::InjectableResolutionError { found: 2, .. }
    ));
}

#[test]
fn inject_without_injector() {
    let mixin = inject_mixin("hook", &[("hook", None)]);
    let err = process(mixin).unwrap().apply(&mut counter_class()).unwrap_err();
    assert!(matches!(err.root_cause(), Error::InjectionFailed { .. }));

    let mut settings = Settings::new();
    settings.fail_on_injection_error = false;
    let transformer = process_with(
        &DirectiveRegistry::with_builtins(),
        settings,
        Rc::new(UnavailableInjector),
        inject_mixin("hook", &[("hook", None)]),
    )
    .unwrap();
    transformer.apply(&mut counter_class()).unwrap();
}

#[test]
fn mixin_directive_is_required() {
    let mixin = counter_mixin().build();
    let registry = DirectiveRegistry::with_builtins();
    let settings = Rc::new(Settings::new());
    let injector: Rc<dyn CodeInjector> = Rc::new(UnavailableInjector);
    let log = LogSink::default();
    let processor = MixinProcessor {
        registry: &registry,
        settings: &settings,
        injector: &injector,
        log: &log,
    };

    assert!(matches!(
        processor.process(mixin.clone(), NoMixinPolicy::Skip),
        Ok(Processed::Skipped)
    ));
    assert!(matches!(
        processor.process(mixin, NoMixinPolicy::Error),
        Err(Error::NotAMixin(name)) if name == "me.mixins.CounterMixin"
    ));
}

#[test]
fn only_one_mixin_directive() {
    let mut mixin = counter_mixin().build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    assert!(matches!(
        process(mixin),
        Err(Error::DuplicateMixinDirective(name)) if name == "me.mixins.CounterMixin"
    ));
}

#[test]
fn mixins_must_be_abstract() {
    let mut mixin = ClassBuilder::new(
        "me/mixins/CounterMixin",
        Some("me/Counter"),
        AccessFlags::PUBLIC,
    )
    .field(AccessFlags::PUBLIC, "nosuffix", "I")
    .build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    annotate(&mut mixin, Some("nosuffix"), directive(DirectiveKind::ADD));
    assert!(matches!(
        process(mixin),
        Err(Error::InvalidMixinShape { class }) if class == "me.mixins.CounterMixin"
    ));

    // Shape is checked before the target gets resolved
    let mut mixin =
        ClassBuilder::new("me/mixins/BadTarget", Some("me/Counter"), AccessFlags::PUBLIC).build();
    annotate(
        &mut mixin,
        None,
        directive(DirectiveKind::MIXIN).with_value("target", string("me..Bad")),
    );
    assert!(matches!(
        process(mixin),
        Err(Error::InvalidMixinShape { class }) if class == "me.mixins.BadTarget"
    ));

    let mut mixin = ClassBuilder::new("me/mixins/Orphan", None, AccessFlags::PUBLIC).build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    assert!(matches!(
        process(mixin),
        Err(Error::InvalidMixinShape { class }) if class == "me.mixins.Orphan"
    ));
}

#[test]
fn mixin_targets() {
    let mut mixin = counter_mixin().build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    assert_eq!(process(mixin).unwrap().target().as_str(), "me/Counter");

    let mut mixin = counter_mixin().build();
    annotate(
        &mut mixin,
        None,
        directive(DirectiveKind::MIXIN).with_value("target", string("me.other.Gauge")),
    );
    assert_eq!(process(mixin).unwrap().target().as_str(), "me/other/Gauge");

    let mut mixin = ClassBuilder::new("me/mixins/Orphan", None, AccessFlags::ABSTRACT).build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    assert!(matches!(process(mixin), Err(Error::InvalidDirective { .. })));
}

#[test]
fn mixins_need_handlers() {
    let mut mixin = counter_mixin().build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));
    let result = process_with(
        &DirectiveRegistry::new(),
        Settings::new(),
        Rc::new(UnavailableInjector),
        mixin,
    );
    assert!(matches!(
        result,
        Err(Error::NoApplicatorsFound(name)) if name == "me.mixins.CounterMixin"
    ));
}

#[test]
fn directive_package_is_configurable() {
    let mut mixin = counter_mixin().build();
    annotate(&mut mixin, None, directive(DirectiveKind::MIXIN));

    let mut settings = Settings::new();
    settings.directive_package = String::from("org/example/patch");
    let registry = DirectiveRegistry::with_builtins();
    let settings = Rc::new(settings);
    let injector: Rc<dyn CodeInjector> = Rc::new(UnavailableInjector);
    let log = LogSink::default();
    let processor = MixinProcessor {
        registry: &registry,
        settings: &settings,
        injector: &injector,
        log: &log,
    };
    assert!(matches!(
        processor.process(mixin, NoMixinPolicy::Skip),
        Ok(Processed::Skipped)
    ));
}
