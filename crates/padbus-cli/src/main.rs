mod cli;
mod config;
mod logging;
mod output;

use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use colored::Colorize;
use crossbeam_channel::{select, unbounded};

use padbus::{filter, Bus, ControlKind, ErrorStream, Event, Filter};

use crate::cli::{Cli, Command};

fn control_filter(buttons: bool, axes: bool) -> Filter {
    filter::from_fn(move |event| match event {
        Event::Control { event, .. } => {
            (buttons && event.kind.contains(ControlKind::Button))
                || (axes && event.kind.contains(ControlKind::Axis))
        }
        _ => true,
    })
}

fn observe_filters(
    devices: Vec<String>,
    buttons: bool,
    axes: bool,
    skip_initial: bool,
) -> Vec<Filter> {
    let mut filters = Vec::new();
    if !devices.is_empty() {
        filters.push(filter::from_fn(move |event| {
            devices.iter().any(|id| id == event.device_id())
        }));
    }
    if buttons || axes {
        filters.push(control_filter(buttons, axes));
    }
    if skip_initial {
        filters.push(filter::live_only());
    }
    filters
}

fn report_errors(errors: ErrorStream) {
    thread::spawn(move || {
        for error in errors.iter() {
            print_error!("{error}");
        }
    });
}

fn observe(mut bus: Bus, filters: Vec<Filter>, subscribe: bool) -> ExitCode {
    let (stop_tx, stop_rx) = unbounded::<()>();
    ctrlc::set_handler(move || {
        let _ = stop_tx.send(());
    })
    .expect("Error setting Ctrl-C handler");

    let Some(channel) = bus.new_event_channel(filters) else {
        print_error!("bus is closed");
        return ExitCode::FAILURE;
    };
    print_info!("watching for joysticks, press Ctrl+C to stop");

    loop {
        select! {
            recv(stop_rx) -> _ => {
                print_debug!("interrupted");
                break;
            }
            recv(channel.receiver()) -> msg => {
                let Ok(event) = msg else {
                    print_warning!("event channel closed");
                    break;
                };
                if let Event::Connect(device) = &event {
                    if subscribe {
                        if let Err(e) = bus.subscribe(&device.id) {
                            print_error!("failed to subscribe to {}: {e}", device.id);
                        }
                    }
                }
                print_info!("{}", output::describe_event(&event));
            }
        }
    }

    drop(channel);
    bus.close();
    ExitCode::SUCCESS
}

fn list(mut bus: Bus, wait: Duration) -> ExitCode {
    // Initial discovery is held back until a channel exists, so drain it.
    if let Some(channel) = bus.new_event_channel(vec![filter::lifecycle()]) {
        let deadline = Instant::now() + wait;
        while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
            if channel.recv_timeout(remaining).is_err() {
                break;
            }
        }
    }

    let mut devices = bus.devices();
    devices.sort_by(|a, b| a.id.cmp(&b.id));
    if devices.is_empty() {
        print_info!("no joysticks found");
    }
    for device in &devices {
        print_info!("{}", output::describe_device(device));
    }

    bus.close();
    ExitCode::SUCCESS
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::setup(cli.verbose, cli.no_color);

    let options = match config::load_options(cli.config.as_deref(), cli.dir) {
        Ok(options) => options,
        Err(e) => {
            print_error!("failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };
    print_debug!("watching {}", options.device_dir.display());

    let (bus, errors) = match Bus::new(options) {
        Ok(started) => started,
        Err(e) => {
            print_error!("failed to start bus: {e}");
            return ExitCode::FAILURE;
        }
    };
    report_errors(errors);

    match cli.command {
        Command::Observe {
            device,
            buttons,
            axes,
            skip_initial,
            no_subscribe,
        } => observe(
            bus,
            observe_filters(device, buttons, axes, skip_initial),
            !no_subscribe,
        ),
        Command::List { wait_ms } => list(bus, Duration::from_millis(wait_ms)),
    }
}
