use anyhow::{Context, Result, anyhow};
use pico_args::Arguments;
use std::{
    env, fs,
    io::{self, BufReader},
    path::PathBuf,
    sync::{Arc, atomic::AtomicBool},
};

use crate::config::{ConfigState, Profile};
use crate::{input, pipeline};

pub fn run() -> Result<()> {
    let mut pargs = Arguments::from_env();

    // No args -> general help
    if env::args().len() == 1 {
        print_help();
        return Ok(());
    }

    if pargs.contains("-h") || pargs.contains("--help") {
        print_help();
        return Ok(());
    }

    let profile_name: Option<String> = pargs.opt_value_from_str("--profile")?;
    let profile_file: Option<PathBuf> = pargs.opt_value_from_str("--profile-file")?;
    let device: Option<String> = pargs.opt_value_from_str("--device")?;

    // First free arg is the subcommand
    let subcmd: Option<String> = pargs.free_from_str().ok();

    match subcmd.as_deref() {
        Some("help") => {
            let topic: Option<String> = pargs.free_from_str().ok();
            match topic {
                Some(t) => print_subcmd_help(&t),
                None => print_help(),
            }
            Ok(())
        }

        Some("replay") => {
            let file: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturectl replay <file|->"))?;
            let profile = resolve_profile(profile_name.as_deref(), profile_file)?;
            let th = profile.effective_thresholds();
            let n = if file == "-" {
                pipeline::run_replay(&th, io::stdin().lock(), io::stdout())?
            } else {
                let f = fs::File::open(&file).with_context(|| format!("failed to open {file}"))?;
                pipeline::run_replay(&th, BufReader::new(f), io::stdout())?
            };
            log::info!("replay finished: {n} events");
            Ok(())
        }

        Some("watch") => {
            let profile = resolve_profile(profile_name.as_deref(), profile_file)?;
            let stop = Arc::new(AtomicBool::new(false));
            for sig in [signal_hook::consts::SIGINT, signal_hook::consts::SIGTERM] {
                signal_hook::flag::register(sig, Arc::clone(&stop))?;
            }
            pipeline::run_watch(&profile.effective_thresholds(), device, stop)
        }

        Some("show") => {
            let profile = resolve_profile(profile_name.as_deref(), profile_file)?;
            print_response(&serde_json::json!({
                "profile": profile.meta.name,
                "display": profile.display,
                "thresholds": profile.thresholds,
                "effective": profile.effective_thresholds(),
            }));
            Ok(())
        }

        Some("list") => {
            let cfg = ConfigState::load_or_install_default()?;
            for name in cfg.list_profiles() {
                let mark = if name == cfg.active_name { '*' } else { ' ' };
                println!("{mark} {name}");
            }
            Ok(())
        }

        Some("use") => {
            let name: String = pargs
                .free_from_str()
                .map_err(|_| anyhow!("usage: gesturectl use <profile_name>"))?;
            let mut cfg = ConfigState::load_or_install_default()?;
            cfg.set_active(&name)?;
            println!("active profile: {}", cfg.active_name);
            Ok(())
        }

        Some("doctor") => {
            print_response(&doctor_report()?);
            Ok(())
        }

        Some(other) => {
            eprintln!("unknown subcommand: {other}\n");
            print_help();
            Ok(())
        }

        None => {
            print_help();
            Ok(())
        }
    }
}

fn resolve_profile(name: Option<&str>, file: Option<PathBuf>) -> Result<Profile> {
    if let Some(path) = file {
        return Profile::load_file(&path);
    }
    let cfg = ConfigState::load_or_install_default()?;
    match name {
        Some(n) => cfg.load_named(n),
        None => Ok(cfg.profile),
    }
}

fn doctor_report() -> Result<serde_json::Value> {
    let cfg = ConfigState::load_or_install_default()?;
    let devices: Vec<String> = input::discover_multitouch()
        .into_iter()
        .map(|d| format!("{} ({})", d.name, d.path))
        .collect();
    Ok(serde_json::json!({
        "input_group_member": check_in_input_group(),
        "config_dir": cfg.config_dir,
        "profiles_dir": cfg.profiles_dir,
        "active_profile": cfg.active_name,
        "profiles": cfg.list_profiles(),
        "devices": devices,
        "hints": {
            "add_user_to_input_group": "sudo usermod -aG input $USER && newgrp input"
        }
    }))
}

fn check_in_input_group() -> bool {
    let Ok(s) = fs::read_to_string("/etc/group") else {
        return false;
    };
    let user = whoami::username();
    s.lines()
        .filter(|line| line.starts_with("input:"))
        .any(|line| {
            line.split(':')
                .nth(3)
                .unwrap_or("")
                .split(',')
                .any(|u| u == user)
        })
}

fn print_help() {
    println!(
        r#"gesturectl — pointer gesture recognizer

USAGE:
  gesturectl help [command]        Show general or command-specific help
  gesturectl replay <file|->       Replay a recorded session, print events as JSON lines
  gesturectl watch [--device PATH] Recognize gestures from a live multitouch device
  gesturectl show                  Show effective thresholds
  gesturectl list                  List profiles
  gesturectl use <name>            Switch active profile
  gesturectl doctor                Diagnose permissions/devices

OPTIONS:
  --profile <name>                 Use a named profile instead of the active one
  --profile-file <path>            Load the profile from an explicit file

TIPS:
  - Profiles: ~/.config/gesturectl/profiles
  - Active profile pointer: ~/.config/gesturectl/active
  - RUST_LOG=debug shows every drag event
"#
    );
}

fn print_subcmd_help(cmd: &str) {
    match cmd {
        "replay" => println!(
            "usage: gesturectl replay <file|->\nReads one JSON tick per line and prints each gesture event as JSON."
        ),
        "watch" => println!(
            "usage: gesturectl watch [--device PATH]\nLogs gestures from a multitouch device until interrupted."
        ),
        "show" => println!(
            "usage: gesturectl show\nPrints profile thresholds and their display-scaled values."
        ),
        "list" => {
            println!("usage: gesturectl list\nLists available profiles; marks active with '*'.")
        }
        "use" => println!("usage: gesturectl use <name>\nSwitches active profile to <name>."),
        "doctor" => println!(
            "usage: gesturectl doctor\nChecks permissions and lists detected multitouch devices."
        ),
        _ => {
            eprintln!("unknown command: {cmd}\n");
            print_help();
        }
    }
}

fn print_response(v: &serde_json::Value) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}
