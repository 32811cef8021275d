pub mod logging;
pub mod store;

use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::styling::{AnsiColor, Effects, Styles},
};

pub const ARG_USER: &str = "user";
pub const ARG_SET: &str = "set";
pub const ARG_CREDENTIAL_ID: &str = "credential-id";
pub const ARG_DEFAULT_ENABLED: &str = "default-enabled";
pub const ARG_NO_DATABASE: &str = "no-database";
pub const ARG_TOGGLE: &str = "toggle";
pub const ARG_NO_FORCE: &str = "no-force";

fn user_arg() -> Arg {
    Arg::new(ARG_USER)
        .help("User identifier, as released by the username attribute")
        .required(true)
}

fn credentials_command() -> Command {
    Command::new("credentials")
        .about("Inspect or revoke registered authenticators")
        .subcommand_required(true)
        .subcommand(
            Command::new("list")
                .about("List the credentials of a user, oldest first")
                .arg(user_arg()),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a credential by its hex-encoded id")
                .arg(
                    Arg::new(ARG_CREDENTIAL_ID)
                        .help("Hex-encoded credential id")
                        .required(true),
                ),
        )
}

fn check_command() -> Command {
    Command::new("check")
        .about("Show whether the second factor applies to a user")
        .arg(user_arg())
        .arg(
            Arg::new(ARG_DEFAULT_ENABLED)
                .long("default-enabled")
                .help("Require the second factor for users without a status row")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_NO_DATABASE)
                .long("no-database")
                .help("Ignore the stored status and decide from the toggle")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_TOGGLE)
                .long("toggle")
                .help("Value of the external toggle")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_NO_FORCE)
                .long("no-force")
                .help("With --no-database, let the toggle invert the default instead of deciding")
                .action(ArgAction::SetTrue),
        )
}

#[must_use]
pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    let command = Command::new("fido2sf")
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(Command::new("schema").about("Create the credential tables if missing"))
        .subcommand(
            Command::new("status")
                .about("Show or set the per-user second-factor status")
                .arg(user_arg())
                .arg(
                    Arg::new(ARG_SET)
                        .long("set")
                        .help("New status")
                        .value_parser(["enabled", "disabled"]),
                ),
        )
        .subcommand(credentials_command())
        .subcommand(check_command());

    let command = store::with_args(command);
    logging::with_args(command)
}
