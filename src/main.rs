use clap::{Arg, ArgMatches, Command};
use std::path::{Path, PathBuf};
use std::process;

use account_forms::auth::password::read_password;
use account_forms::email::{mailer_from_config, KeyringSecrets, SecretStore};
use account_forms::forms::FormErrors;
use account_forms::utils::logging::initialize_logging;
use account_forms::utils::time::{format_duration, get_current_timestamp};
use account_forms::utils::{ConsoleNotifier, FlashBag, FlashCategory};
use account_forms::{
    Finder, ModuleConfig, Notifier, RecoveryForm, RegistrationForm, ResetOutcome, Scenario, TokenType,
    Translator, UserStore, CONFIG_FILE, USERS_FILE,
};

fn cli() -> Command {
    Command::new("account-forms")
        .about("Account registration and password recovery")
        .arg(
            Arg::new("config")
                .long("config")
                .help("Module configuration file")
                .default_value(CONFIG_FILE),
        )
        .arg(
            Arg::new("store")
                .long("store")
                .help("User store file")
                .default_value(USERS_FILE),
        )
        .arg(
            Arg::new("messages")
                .long("messages")
                .help("Translation catalogue for the configured language"),
        )
        .arg(
            Arg::new("log-file")
                .long("log-file")
                .help("Append log records to this file instead of stderr"),
        )
        .subcommand_required(true)
        .subcommand(Command::new("init-config").about("Write the default configuration file"))
        .subcommand(
            Command::new("set-smtp-password")
                .about("Store the SMTP relay password in the system keyring")
                .arg(
                    Arg::new("delete")
                        .long("delete")
                        .action(clap::ArgAction::SetTrue)
                        .help("Remove the stored password instead"),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Register a new account")
                .arg(Arg::new("email").long("email").required(true))
                .arg(Arg::new("username").long("username")),
        )
        .subcommand(
            Command::new("request-recovery")
                .about("Send a password recovery link")
                .arg(Arg::new("email").long("email").required(true)),
        )
        .subcommand(
            Command::new("reset-password")
                .about("Choose a new password using a recovery link")
                .arg(
                    Arg::new("id")
                        .long("id")
                        .required(true)
                        .value_parser(clap::value_parser!(u64)),
                )
                .arg(Arg::new("code").long("code").required(true)),
        )
}

fn main() {
    let matches = cli().get_matches();

    let log_file = matches.get_one::<String>("log-file").map(PathBuf::from);
    if let Err(e) = initialize_logging(log_file.as_deref()) {
        eprintln!("{}", e);
    }

    match run(&matches) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    }
}

fn run(matches: &ArgMatches) -> Result<bool, String> {
    let config_path = path_arg(matches, "config");

    if matches.subcommand_matches("init-config").is_some() {
        ModuleConfig::default().save(&config_path)?;
        println!("Configuration written to {}", config_path.display());
        return Ok(true);
    }

    let config = ModuleConfig::load(&config_path)?;
    let secrets = KeyringSecrets::new();

    if let Some(sub) = matches.subcommand_matches("set-smtp-password") {
        let smtp = config
            .smtp
            .as_ref()
            .ok_or_else(|| format!("No SMTP relay configured in {}", config_path.display()))?;
        if sub.get_flag("delete") {
            secrets.delete_password(&smtp.username)?;
            println!("SMTP password for {} removed", smtp.username);
        } else {
            let password = ask_password(&format!("SMTP password for {}", smtp.username))?;
            secrets.store_password(&smtp.username, &password)?;
            println!("SMTP password for {} stored in the keyring", smtp.username);
        }
        return Ok(true);
    }

    let translator = match matches.get_one::<String>("messages") {
        Some(path) => Translator::load(&config.language, Path::new(path))?,
        None => Translator::new(&config.language),
    };
    let mailer = mailer_from_config(&config, translator.clone(), &secrets)?;
    let mut store = UserStore::load(&path_arg(matches, "store"))?
        .with_mailer(mailer_from_config(&config, translator.clone(), &secrets)?);
    let mut flashes = FlashBag::new();

    let success = match matches.subcommand() {
        Some(("register", sub)) => {
            let mut form = RegistrationForm::new(&config, &translator);
            form.email = string_arg(sub, "email");
            form.username = string_arg(sub, "username");
            if config.enable_generating_password {
                println!("Leave the password empty to have one generated.");
            }
            form.password = ask_password(&translator.user("Password"))?;
            form.password_repeat = ask_password(&translator.user("Password repeat"))?;

            let registered = form.register(&mut store, &mut flashes);
            print_errors(form.errors());
            registered
        }
        Some(("request-recovery", sub)) => {
            let mut form = RecoveryForm::new(Scenario::Request, &config, &translator, &*mailer);
            form.email = string_arg(sub, "email");

            let sent = form.send_recovery_message(&mut store, &mut flashes);
            print_errors(form.errors());
            if sent {
                println!(
                    "The link stays valid for {}.",
                    format_duration(config.recover_within)
                );
            }
            sent
        }
        Some(("reset-password", sub)) => {
            let id = sub.get_one::<u64>("id").copied().unwrap_or_default();
            let code = string_arg(sub, "code");

            let token = store
                .find_token(id, &code, TokenType::Recovery)
                .filter(|t| !t.is_expired(config.recover_within, get_current_timestamp()));
            let Some(token) = token else {
                flashes.notify(
                    FlashCategory::Danger,
                    translator.user(
                        "Recovery link is invalid or expired. Please try requesting a new one.",
                    ),
                );
                print_flashes(&mut flashes);
                return Ok(false);
            };

            let mut form = RecoveryForm::new(Scenario::Reset, &config, &translator, &*mailer);
            form.password = ask_password(&translator.user("Password"))?;
            form.password_repeat = ask_password(&translator.user("Password repeat"))?;

            let outcome = form.reset_password(&token, &mut store, &mut flashes);
            print_errors(form.errors());
            outcome == ResetOutcome::Changed
        }
        _ => return Err("Unknown command".to_string()),
    };

    print_flashes(&mut flashes);
    Ok(success)
}

fn path_arg(matches: &ArgMatches, name: &str) -> PathBuf {
    matches
        .get_one::<String>(name)
        .map(PathBuf::from)
        .unwrap_or_default()
}

fn string_arg(matches: &ArgMatches, name: &str) -> String {
    matches.get_one::<String>(name).cloned().unwrap_or_default()
}

fn ask_password(label: &str) -> Result<String, String> {
    println!("{}:", label);
    read_password().map_err(|e| format!("Failed to read password: {}", e))
}

fn print_errors(errors: &FormErrors) {
    for (attribute, messages) in errors.iter() {
        for message in messages {
            eprintln!("{}: {}", attribute, message);
        }
    }
}

fn print_flashes(flashes: &mut FlashBag) {
    let mut console = ConsoleNotifier;
    for flash in flashes.take_all() {
        console.notify(flash.category, flash.message);
    }
}
