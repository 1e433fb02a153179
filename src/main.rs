mod assoc;
mod chart;
mod cli;
mod combine;
mod error;
mod fmt;
mod forecast;
mod importer;
mod models;
mod reports;
mod settings;
mod tui;

use clap::Parser;

use cli::dashboard::DashboardArgs;
use cli::{Cli, Commands, ConfigCommands, IgnoreCommands};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        None => cli::dashboard::run(DashboardArgs::default()),
        Some(Commands::Dashboard {
            file,
            range,
            search,
            categories,
        }) => cli::dashboard::run(DashboardArgs {
            file,
            range,
            search,
            categories,
        }),
        Some(Commands::Series {
            file,
            range,
            month,
            points,
        }) => cli::series::run(file, range, month, points),
        Some(Commands::Rules {
            file,
            mode,
            min_support,
            min_confidence,
            month,
            range,
        }) => cli::rules::run(file, mode, min_support, min_confidence, month, range),
        Some(Commands::Summary { file, month, range }) => cli::summary::run(file, month, range),
        Some(Commands::Combine { dir, output }) => cli::combine::run(dir, output),
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Show => cli::config::show(),
            ConfigCommands::Set {
                file,
                initial_balance,
                theme,
                user_name,
                blur,
            } => cli::config::set(file, initial_balance, theme, user_name, blur),
            ConfigCommands::Ignore { command } => match command {
                IgnoreCommands::Add { keyword } => cli::config::ignore_add(&keyword),
                IgnoreCommands::Remove { keyword } => cli::config::ignore_remove(&keyword),
                IgnoreCommands::List => cli::config::ignore_list(),
            },
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
