use clap::{Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Instant;
use tracing::{error, warn};

use blindpdp::{PdpService, RootConfig, RootError};

/// blindpdp: a policy decision point over encrypted attribute values
///
/// Policies are encrypted once; access requests are decided without the
/// decision point ever comparing plaintext policy values.
#[derive(Parser, Debug)]
#[command(name = "blindpdp", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt policies from the data directory
    EncryptPolicy {
        /// Policy names, without the .json extension
        #[arg(required = true)]
        names: Vec<String>,
    },

    /// Encrypt the given policies, then decide a request against them
    CheckAccess {
        #[arg(required = true)]
        policies: Vec<String>,

        /// Request document name, without the .json extension
        #[arg(short, long)]
        request: String,
    },

    /// Encrypt the given policies, then list those with a resource
    /// containing the substring
    FindPolicies {
        substring: String,

        #[arg(required = true)]
        policies: Vec<String>,
    },

    /// Print an encrypted policy document
    GetPolicy { name: String },

    /// Print a request or attribute document
    GetAttribute { name: String },

    /// Show backend parameters, key sizes and noise headroom
    Diagnostics,

    /// Run the interactive menu
    Interactive,
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new(
            "blindpdp=debug,blindpdp_policy=debug,blindpdp_match=debug,blindpdp_bfv=debug",
        )
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("blindpdp=info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&PathBuf>) -> Result<RootConfig, RootError> {
    match path {
        Some(p) => RootConfig::load(p),
        None => {
            let default_path = RootConfig::default_config_path();
            RootConfig::load(&default_path)
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), RootError> {
    let config = load_config(cli.config.as_ref())?;
    let mut service = PdpService::new(config)?;

    match cli.command {
        Commands::EncryptPolicy { names } => {
            for name in &names {
                timed(|| cmd_encrypt(&mut service, name))?;
            }
            Ok(())
        }
        Commands::CheckAccess { policies, request } => {
            for name in &policies {
                service.encrypt_policy(name)?;
            }
            timed(|| cmd_check_access(&service, &request, &policies))
        }
        Commands::FindPolicies {
            substring,
            policies,
        } => {
            for name in &policies {
                service.encrypt_policy(name)?;
            }
            timed(|| cmd_find_policies(&service, &substring))
        }
        Commands::GetPolicy { name } => timed(|| cmd_get_policy(&service, &name)),
        Commands::GetAttribute { name } => timed(|| cmd_get_attribute(&service, &name)),
        Commands::Diagnostics => timed(|| cmd_diagnostics(&service)),
        Commands::Interactive => run_interactive(&mut service),
    }
}

/// Run `f` and print its wall-clock time.
fn timed<F>(f: F) -> Result<(), RootError>
where
    F: FnOnce() -> Result<(), RootError>,
{
    let start = Instant::now();
    let result = f();
    println!("Elapsed time in ms: {}", start.elapsed().as_millis());
    result
}

fn cmd_encrypt(service: &mut PdpService, name: &str) -> Result<(), RootError> {
    let report = service.encrypt_policy(name)?;
    println!(
        "Encrypted policy {} ({} identifiers) -> {}",
        report.policy,
        report.identifiers.len(),
        report.output_path.display()
    );
    Ok(())
}

fn cmd_get_policy(service: &PdpService, name: &str) -> Result<(), RootError> {
    println!("{}", service.get_policy(name)?);
    Ok(())
}

fn cmd_get_attribute(service: &PdpService, name: &str) -> Result<(), RootError> {
    println!("{}", service.get_attribute(name)?);
    Ok(())
}

fn cmd_check_access(
    service: &PdpService,
    request: &str,
    policies: &[String],
) -> Result<(), RootError> {
    let evaluation = if policies.is_empty() {
        service.check_access(request)?
    } else {
        service.check_access_with(request, policies)?
    };
    for rule in &evaluation.matched_rules {
        println!(
            "Rule with ID: {} matched ({}, policy {}).",
            rule.rule_id, rule.effect, rule.policy
        );
    }
    println!("Final decision: {}", evaluation.decision);
    Ok(())
}

fn cmd_find_policies(service: &PdpService, substring: &str) -> Result<(), RootError> {
    let found = service.find_policies(substring)?;
    if found.is_empty() {
        println!("No policies matched.");
    }
    for name in found {
        println!("Matched policy: {}", name);
    }
    Ok(())
}

fn cmd_diagnostics(service: &PdpService) -> Result<(), RootError> {
    let d = service.diagnostics()?;
    println!("Backend:");
    println!("  Ring degree:         {}", d.poly_degree);
    println!("  Plaintext modulus:   {}", d.plain_modulus);
    println!("  Slots per literal:   {}", d.batch_capacity);
    println!("  Public key:          {} bytes", d.public_key_bytes);
    println!("  Relinearization key: {} bytes", d.relin_key_bytes);
    println!("  Fresh ciphertext:    {} bytes", d.fresh_ciphertext_bytes);
    println!("  Fresh noise budget:  {} bits", d.fresh_noise_budget_bits);
    println!("Store:");
    println!("  Stored literals:     {}", d.stored_literals);
    println!("  Registered policies: {}", d.registered_policies);
    Ok(())
}

// ---------------------------------------------------------------------------
// Interactive menu
// ---------------------------------------------------------------------------

fn prompt<R: BufRead>(input: &mut R, message: &str) -> Result<Option<String>, RootError> {
    println!("{}", message);
    std::io::stdout().flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

fn run_interactive(service: &mut PdpService) -> Result<(), RootError> {
    println!("------------------------------------------");
    println!("----------------Secure PDP----------------");
    println!("------------------------------------------");

    let stdin = std::io::stdin();
    let mut input = stdin.lock();

    loop {
        let menu = "Enter option:\n\
                    1. Encrypt policy\n\
                    2. Get policy\n\
                    3. Get attribute\n\
                    4. Check access\n\
                    5. Get policies with resource substring\n\
                    0. Exit";
        let Some(choice) = prompt(&mut input, menu)? else {
            return Ok(());
        };

        let result = match choice.as_str() {
            "0" => return Ok(()),
            "1" => match prompt(&mut input, "Enter policy name:")? {
                Some(name) => timed(|| cmd_encrypt(service, &name)),
                None => return Ok(()),
            },
            "2" => match prompt(&mut input, "Enter policy name:")? {
                Some(name) => timed(|| cmd_get_policy(service, &name)),
                None => return Ok(()),
            },
            "3" => match prompt(&mut input, "Enter attribute name:")? {
                Some(name) => timed(|| cmd_get_attribute(service, &name)),
                None => return Ok(()),
            },
            "4" => match prompt(&mut input, "Enter attribute name:")? {
                Some(name) => timed(|| cmd_check_access(service, &name, &[])),
                None => return Ok(()),
            },
            "5" => match prompt(&mut input, "Enter resource substring:")? {
                Some(substring) => timed(|| cmd_find_policies(service, &substring)),
                None => return Ok(()),
            },
            other => {
                warn!(choice = other, "unrecognized menu option");
                println!("Unknown option: {}", other);
                continue;
            }
        };

        if let Err(e) = result {
            println!("Failed to process input: {}", e);
        }
    }
}
