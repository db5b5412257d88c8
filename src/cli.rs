use clap::{crate_authors, crate_description, crate_version, Arg, ArgAction, ArgMatches, Command};
use pretty_env_logger::env_logger::Builder;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use std::process::exit;

use dnsreconcile::common::{DnsApi, Result};
use dnsreconcile::jsonfile::read_record_sets;
use dnsreconcile::service::ZoneSync;
use dnsreconcile::{Config, ProviderKind};

fn set_logger_level(b: &mut Builder) {
    let mut b = b;
    if env::var("RUST_LOG").is_err() {
        b = b.filter_level(log::LevelFilter::Info)
    }
    b.init();
}

fn setup_logger() {
    // Adapted from env_logger examples. <3 Systemd support
    match std::env::var("RUST_LOG_STYLE") {
        Ok(s) if s == "SYSTEMD" => {
            let builder = &mut pretty_env_logger::env_logger::builder();
            builder.format(|buf, record| {
                writeln!(
                    buf,
                    "<{}>{}: {}",
                    match record.level() {
                        log::Level::Error => 3,
                        log::Level::Warn => 4,
                        log::Level::Info => 6,
                        log::Level::Debug => 7,
                        log::Level::Trace => 7,
                    },
                    record.target(),
                    record.args()
                )
            });
            set_logger_level(builder);
        }
        _ => {
            let builder = &mut pretty_env_logger::formatted_builder();
            set_logger_level(builder);
        }
    };
}

fn zone_arg() -> Arg {
    Arg::new("zone").required(true).help("Zone name, e.g. example.com.")
}

fn print_json(value: &impl serde::Serialize) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(err) => {
            println!("Failed to serialize output: {err}");
            exit(1);
        }
    }
}

fn run(api: &dyn DnsApi, args: &ArgMatches) -> Result<()> {
    match args.subcommand() {
        Some(("zones", _)) => print_json(&api.zones().iterate()?),
        Some(("records", sub)) => {
            let zone = sub.get_one::<String>("zone").cloned().unwrap_or_default();
            let rrsets = api.all_profile_record_sets(&zone);
            let listed = match sub.get_one::<String>("name") {
                Some(name) => rrsets.iterate_by_name(name)?,
                None => rrsets.iterate()?,
            }
            .collect::<Result<Vec<_>>>()?;
            print_json(&listed);
        }
        Some(("sync", sub)) => {
            let zone = sub.get_one::<String>("zone").cloned().unwrap_or_default();
            let source = sub.get_one::<PathBuf>("source").cloned().unwrap_or_default();
            let desired = read_record_sets(&source)?;
            let report = ZoneSync::new(api).sync(
                &zone,
                desired,
                sub.get_flag("dry-run"),
                sub.get_flag("prune"),
            )?;
            tracing::info!(
                run_id = %report.run_id,
                created = report.created,
                updated = report.updated,
                deleted = report.deleted,
                unchanged = report.unchanged,
                "Done."
            );
        }
        Some(("delete", sub)) => {
            let zone = sub.get_one::<String>("zone").cloned().unwrap_or_default();
            let name = sub.get_one::<String>("name").cloned().unwrap_or_default();
            let kind = sub
                .get_one::<String>("type")
                .map(|kind| kind.to_ascii_uppercase())
                .unwrap_or_default();
            api.all_profile_record_sets(&zone).delete_by_name_type_and_qualifier(
                &name,
                &kind,
                sub.get_one::<String>("qualifier").map(String::as_str),
            )?;
        }
        _ => {}
    }
    Ok(())
}

pub(crate) fn main() {
    let cli = Command::new("dnsreconcile")
        .about(format!(
            "{}\n{} {}",
            crate_description!(),
            "Configuration is managed using environment variables.",
            "See the docs for more information.",
        ))
        .arg(
            Arg::new("check")
                .action(ArgAction::SetTrue)
                .short('t')
                .long("test")
                .help("Check the configuration"),
        )
        .arg(
            Arg::new("provider")
                .long("provider")
                .default_value("ultradns")
                .help("Provider to manage"),
        )
        .subcommand(Command::new("zones").about("List zones"))
        .subcommand(
            Command::new("records")
                .about("List record sets of a zone")
                .arg(zone_arg())
                .arg(Arg::new("name").long("name").help("Only this owner name")),
        )
        .subcommand(
            Command::new("sync")
                .about("Converge a zone to the record sets in a JSON file")
                .arg(zone_arg())
                .arg(
                    Arg::new("source")
                        .required(true)
                        .value_parser(clap::value_parser!(PathBuf))
                        .help("JSON file with the desired record sets"),
                )
                .arg(
                    Arg::new("dry-run")
                        .action(ArgAction::SetTrue)
                        .long("dry-run")
                        .help("Show changes without applying them"),
                )
                .arg(
                    Arg::new("prune")
                        .action(ArgAction::SetTrue)
                        .long("prune")
                        .help("Delete record sets missing from the file"),
                ),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete one record set")
                .arg(zone_arg())
                .arg(Arg::new("name").required(true))
                .arg(Arg::new("type").required(true))
                .arg(Arg::new("qualifier").long("qualifier")),
        )
        .version(crate_version!())
        .author(crate_authors!("\n"));

    let args = cli.get_matches();

    setup_logger();

    let provider = args
        .get_one::<String>("provider")
        .map(String::as_str)
        .unwrap_or_default();
    let api = match provider
        .parse::<ProviderKind>()
        .and_then(|kind| Config::from_env()?.into_provider(kind))
    {
        Ok(api) => api,
        Err(err) => {
            println!("{err}");
            exit(2);
        }
    };

    if args.get_flag("check") {
        tracing::info!(
            provider = api.provider().name,
            "Configuration is valid."
        );
        exit(0);
    }

    if let Err(err) = run(api.as_ref(), &args) {
        tracing::error!(error = %err, "Command failed");
        exit(1);
    }
}
