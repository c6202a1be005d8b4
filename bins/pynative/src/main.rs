//! pynative CLI
//!
//! Scaffolds, links, builds, bundles, and runs Android/iOS apps that embed a
//! Python runtime, and hosts the hot-reload dev server.

use clap::{Parser, Subcommand};
use pynative_cli::output::Status;
use pynative_core::config::Project;
use pynative_core::error::exit_codes;

mod commands;

#[derive(Parser)]
#[command(name = "pynative")]
#[command(about = "Build and run mobile apps that embed Python")]
#[command(version)]
struct Cli {
    /// Increase output verbosity
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a project or package from a template
    Create {
        /// What to create (app, lib)
        what: String,
        /// Name of the new project
        name: String,
        /// Reverse-DNS application id
        #[arg(long)]
        bundle_id: Option<String>,
        /// Overwrite the target directory if it already exists
        #[arg(short, long)]
        force: bool,
    },

    /// Install packages into the app env and link them
    Install {
        /// Packages to install; empty updates from environment.yml
        packages: Vec<String>,
    },

    /// Unlink and uninstall packages from the app env
    Uninstall {
        /// Packages to remove
        #[arg(required = true)]
        packages: Vec<String>,
    },

    /// List installed packages
    List,

    /// Link packages into the generated android/ios projects
    Link {
        /// Package names; empty links everything installed
        names: Vec<String>,
    },

    /// Unlink packages from the generated android/ios projects
    Unlink {
        /// Package names
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Build the android project
    #[command(name = "build-android")]
    BuildAndroid {
        /// Build in release mode
        #[arg(long)]
        release: bool,
        /// Extra args passed through to gradle
        #[arg(trailing_var_arg = true)]
        extra: Vec<String>,
    },

    /// Clean the android project
    #[command(name = "clean-android")]
    CleanAndroid,

    /// Build the android project, install it on a device, and run it
    #[command(name = "run-android")]
    RunAndroid {
        /// Build in release mode
        #[arg(long)]
        release: bool,
        /// Extra args passed through to gradle
        #[arg(trailing_var_arg = true)]
        extra: Vec<String>,
    },

    /// Build the runtime's native libraries with the NDK
    #[command(name = "ndk-build")]
    NdkBuild,

    /// Symbolize native crashes from the device log
    #[command(name = "ndk-stack")]
    NdkStack {
        /// ABI whose symbols to use
        #[arg(default_value = "armeabi-v7a")]
        abi: String,
    },

    /// Pack python and app sources into the platform assets
    #[command(name = "bundle-assets")]
    BundleAssets {
        /// Bundle target (android, iphoneos, iphonesimulator)
        #[arg(default_value = "android")]
        target: String,
        /// Create a release bundle
        #[arg(long)]
        release: bool,
        /// Skip byte-compiling the sources
        #[arg(long)]
        no_compile: bool,
    },

    /// Build the ios project
    #[command(name = "build-ios")]
    BuildIos {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },

    /// Clean the ios project
    #[command(name = "clean-ios")]
    CleanIos,

    /// Build the ios project and launch it on the booted simulator
    #[command(name = "run-ios")]
    RunIos {
        /// Build in release mode
        #[arg(long)]
        release: bool,
    },

    /// Build a conda recipe (alias to conda build)
    #[command(name = "build-recipe")]
    BuildRecipe {
        /// Recipe directory to build
        recipe: String,
        /// Extra args passed through to conda build
        #[arg(trailing_var_arg = true)]
        extra: Vec<String>,
    },

    /// Generate a cross-target conda recipe for a pip package
    #[command(name = "make-pip-recipe")]
    MakePipRecipe {
        /// pip package to wrap
        package: String,
        /// Also generate recipes for its dependencies
        #[arg(long)]
        recursive: bool,
        /// Recreate recipes that already exist
        #[arg(long)]
        force: bool,
        /// conda build root
        #[arg(long)]
        croot: Option<String>,
    },

    /// Start the hot-reload dev server
    Start {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8888)]
        port: u16,
        /// Relay messages between connected peers instead of pushing reloads
        #[arg(short, long)]
        remote_debugging: bool,
    },

    /// Stream the device log, reconnecting when the device drops
    Logcat,

    /// Check this machine for the tools pynative drives
    Doctor,
}

/// Preconditions checked before a command runs
struct CommandSpec {
    /// Must run inside a recognized project root
    requires_project: bool,
    /// Must run with a non-base conda env activated
    requires_env: bool,
}

const fn spec(requires_project: bool, requires_env: bool) -> CommandSpec {
    CommandSpec {
        requires_project,
        requires_env,
    }
}

/// The registration table: command -> preconditions
fn spec_for(command: &Commands) -> CommandSpec {
    match command {
        Commands::Create { .. } => spec(false, false),
        Commands::Install { .. } => spec(false, true),
        Commands::Uninstall { .. } => spec(false, true),
        Commands::List => spec(false, true),
        Commands::Link { .. } => spec(true, true),
        Commands::Unlink { .. } => spec(true, true),
        Commands::BuildAndroid { .. } => spec(true, true),
        Commands::CleanAndroid => spec(true, true),
        Commands::RunAndroid { .. } => spec(true, true),
        Commands::NdkBuild => spec(true, true),
        Commands::NdkStack { .. } => spec(true, true),
        Commands::BundleAssets { .. } => spec(true, true),
        Commands::BuildIos { .. } => spec(true, true),
        Commands::CleanIos => spec(true, true),
        Commands::RunIos { .. } => spec(true, true),
        Commands::BuildRecipe { .. } => spec(false, false),
        Commands::MakePipRecipe { .. } => spec(false, false),
        Commands::Start { .. } => spec(false, true),
        Commands::Logcat => spec(false, false),
        Commands::Doctor => spec(false, false),
    }
}

fn title(command: &Commands) -> &'static str {
    match command {
        Commands::Create { .. } => "create",
        Commands::Install { .. } => "install",
        Commands::Uninstall { .. } => "uninstall",
        Commands::List => "list",
        Commands::Link { .. } => "link",
        Commands::Unlink { .. } => "unlink",
        Commands::BuildAndroid { .. } => "build-android",
        Commands::CleanAndroid => "clean-android",
        Commands::RunAndroid { .. } => "run-android",
        Commands::NdkBuild => "ndk-build",
        Commands::NdkStack { .. } => "ndk-stack",
        Commands::BundleAssets { .. } => "bundle-assets",
        Commands::BuildIos { .. } => "build-ios",
        Commands::CleanIos => "clean-ios",
        Commands::RunIos { .. } => "run-ios",
        Commands::BuildRecipe { .. } => "build-recipe",
        Commands::MakePipRecipe { .. } => "make-pip-recipe",
        Commands::Start { .. } => "start",
        Commands::Logcat => "logcat",
        Commands::Doctor => "doctor",
    }
}

fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if quiet {
        "warn"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }
    init_tracing(cli.verbose, cli.quiet);

    let spec = spec_for(&cli.command);
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            Status::error(&format!("Cannot determine working directory: {}", e));
            std::process::exit(exit_codes::FAILURE);
        }
    };

    if spec.requires_project && !Project::is_project_root(&cwd) {
        Status::error(&pynative_core::Error::not_a_project(&cwd).to_string());
        std::process::exit(exit_codes::CONFIG_ERROR);
    }
    if spec.requires_env && !pynative_conda::in_app_env() {
        Status::error(
            &pynative_core::Error::env_not_active(title(&cli.command)).to_string(),
        );
        std::process::exit(exit_codes::ENV_ERROR);
    }

    let project = if spec.requires_project {
        match Project::load(&cwd) {
            Ok(project) => Some(project),
            Err(e) => {
                Status::error(&e.to_string());
                std::process::exit(exit_codes::CONFIG_ERROR);
            }
        }
    } else {
        // Commands that work anywhere still use the config when present.
        Project::load(&cwd).ok()
    };

    let exit_code = dispatch(cli.command, project);
    std::process::exit(exit_code);
}

// Commands whose spec sets requires_project always receive Some(project).
fn dispatch(command: Commands, project: Option<Project>) -> i32 {
    match command {
        Commands::Create {
            what,
            name,
            bundle_id,
            force,
        } => commands::create::run(&what, &name, bundle_id.as_deref(), force),
        Commands::Install { packages } => commands::packages::install(&packages, project.as_ref()),
        Commands::Uninstall { packages } => {
            commands::packages::uninstall(&packages, project.as_ref())
        }
        Commands::List => commands::packages::list(),
        Commands::Link { names } => commands::link::link(project.as_ref().unwrap(), &names),
        Commands::Unlink { names } => commands::link::unlink(project.as_ref().unwrap(), &names),
        Commands::BuildAndroid { release, extra } => {
            commands::android::build(project.as_ref().unwrap(), release, &extra)
        }
        Commands::CleanAndroid => commands::android::clean(project.as_ref().unwrap()),
        Commands::RunAndroid { release, extra } => {
            commands::android::run(project.as_ref().unwrap(), release, &extra)
        }
        Commands::NdkBuild => commands::android::ndk_build(project.as_ref().unwrap()),
        Commands::NdkStack { abi } => {
            commands::android::ndk_stack(project.as_ref().unwrap(), &abi)
        }
        Commands::BundleAssets {
            target,
            release,
            no_compile,
        } => commands::bundle::run(project.as_ref().unwrap(), &target, release, no_compile),
        Commands::BuildIos { release } => commands::ios::build(project.as_ref().unwrap(), release),
        Commands::CleanIos => commands::ios::clean(project.as_ref().unwrap()),
        Commands::RunIos { release } => commands::ios::run(project.as_ref().unwrap(), release),
        Commands::BuildRecipe { recipe, extra } => commands::recipe::build(&recipe, &extra),
        Commands::MakePipRecipe {
            package,
            recursive,
            force,
            croot,
        } => commands::recipe::make_pip_recipe(&package, recursive, force, croot.as_deref()),
        Commands::Start {
            port,
            remote_debugging,
        } => commands::server::start(project.as_ref(), port, remote_debugging),
        Commands::Logcat => commands::android::logcat(),
        Commands::Doctor => commands::doctor::run(project.as_ref()),
    }
}
