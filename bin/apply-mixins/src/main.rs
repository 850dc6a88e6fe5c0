use mixin::mixin::{
    ApplicationType, DirectiveRegistry, Error, MixinApplicator, NoMixinPolicy, Settings,
};

use clap::{value_parser, Arg, ArgAction, Command};
use std::path::{Path, PathBuf};

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = Command::new("Mixin applicator")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Apply mixin classes to directories or jars of compiled JVM classes")
        .arg(
            Arg::new("mixin")
                .long("mixin")
                .value_name("PATH")
                .required(true)
                .action(ArgAction::Append)
                .value_parser(value_parser!(PathBuf))
                .help("Directory, jar, or class file containing mixins"),
        )
        .arg(
            Arg::new("package")
                .long("package")
                .value_name("PACKAGE")
                .help("Only use mixins in this package (eg. `org.example.mixins`)"),
        )
        .arg(
            Arg::new("application-type")
                .long("application-type")
                .value_name("TYPE")
                .default_value("final_patch")
                .value_parser(value_parser!(ApplicationType))
                .help("Phase to apply mixins for (`pre_patch` or `final_patch`)"),
        )
        .arg(
            Arg::new("output-dir")
                .long("output-dir")
                .value_name("DIR")
                .required(true)
                .value_parser(value_parser!(PathBuf))
                .help("Directory to write patched inputs into"),
        )
        .arg(
            Arg::new("allow-unapplied")
                .long("allow-unapplied")
                .action(ArgAction::SetTrue)
                .help("Don't fail when a mixin target is missing from an input"),
        )
        .arg(
            Arg::new("skip-non-mixins")
                .long("skip-non-mixins")
                .action(ArgAction::SetTrue)
                .help("Ignore classes without @Mixin in the mixin directories"),
        )
        .arg(
            Arg::new("ignore-injection-errors")
                .long("ignore-injection-errors")
                .action(ArgAction::SetTrue)
                .help("Warn instead of failing when an @Inject can't be applied"),
        )
        .arg(
            Arg::new("INPUT")
                .help("Directories, jars, or class files of classes to patch")
                .required(true)
                .num_args(1..)
                .value_parser(value_parser!(PathBuf)),
        )
        .get_matches();

    let mut settings = Settings::new();
    if let Some(application_type) = matches.get_one::<ApplicationType>("application-type") {
        settings.application_type = *application_type;
    }
    settings.not_applied_is_error = !matches.get_flag("allow-unapplied");
    settings.fail_on_injection_error = !matches.get_flag("ignore-injection-errors");
    settings.no_mixin = if matches.get_flag("skip-non-mixins") {
        NoMixinPolicy::Skip
    } else {
        NoMixinPolicy::Error
    };

    let package = matches.get_one::<String>("package").map(String::as_str);
    let registry = DirectiveRegistry::with_builtins();
    let output_dir = matches
        .get_one::<PathBuf>("output-dir")
        .map_or(Path::new("."), PathBuf::as_path);

    // Every input gets its own pass, since mixins remember whether they were applied
    for input in matches.get_many::<PathBuf>("INPUT").into_iter().flatten() {
        let mut applicator = MixinApplicator::new(&registry, settings.clone());
        for mixin in matches.get_many::<PathBuf>("mixin").into_iter().flatten() {
            applicator = applicator.add_source(mixin, package);
        }
        let pass = applicator.build()?;

        let output = match input.file_name() {
            Some(name) => output_dir.join(name),
            None => output_dir.to_path_buf(),
        };
        log::info!(
            "Applying {} mixins to '{}'",
            pass.mixins().len(),
            input.display()
        );
        pass.transform(input, &output)?;
    }

    Ok(())
}
