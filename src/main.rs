use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use mymusic_metronome::messaging::NotificationConsumer;
use mymusic_metronome::sequencer::RunnerStatus;
use mymusic_metronome::{
    AudioSink, ClickEngine, Command, DirectoryCatalog, MetronomeRunner, MetronomeSettings,
    NullSink, Notifier, SettingsStore, SoundCatalog, SoundDescriptor, StressConfig,
    SubdivisionType, create_notification_channel,
};
use ringbuf::traits::Consumer;
use tracing_subscriber::EnvFilter;

const NOTIFICATION_RINGBUFFER_CAPACITY: usize = 256;

const USAGE: &str = "usage: mymusic_metronome [--settings PATH] [--sounds DIR]";

const HELP: &str = "\
commands:
  start | stop
  bpm N                 tempo, 20..240
  sig N                 beats per bar, 1..6
  sub NAME              subdivision (quarter, eighth, triplet, ...)
  vol N                 volume, 0..100 (0 silences)
  mute | unmute
  stress-beat on|off    accent the first beat of the bar
  stress-sub on|off     accent the first sub-beat of each beat
  timbre ID             switch sound
  sounds                list sounds
  status
  quit";

#[derive(Debug, Default, PartialEq)]
struct CliArgs {
    settings_path: Option<PathBuf>,
    sounds_dir: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<CliArgs, String> {
    let mut parsed = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let path = args.next().ok_or("--settings needs a path")?;
                parsed.settings_path = Some(PathBuf::from(path));
            }
            "--sounds" => {
                let dir = args.next().ok_or("--sounds needs a directory")?;
                parsed.sounds_dir = Some(PathBuf::from(dir));
            }
            other => return Err(format!("unknown argument: {other}")),
        }
    }

    Ok(parsed)
}

/// What a line typed on stdin asks for
#[derive(Debug)]
enum CliAction {
    Send(Command),
    Sounds,
    Status,
    Help,
    Quit,
}

fn parse_switch(value: Option<&str>) -> Result<bool, String> {
    match value {
        Some("on") => Ok(true),
        Some("off") => Ok(false),
        _ => Err("expected on or off".to_string()),
    }
}

fn parse_number(value: Option<&str>) -> Result<f64, String> {
    let value = value.ok_or("missing number")?;
    value
        .parse::<f64>()
        .map_err(|_| format!("not a number: {value}"))
}

fn parse_line(line: &str, stress: &mut StressConfig) -> Result<Option<CliAction>, String> {
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let arg = words.next();

    let action = match keyword {
        "start" => CliAction::Send(Command::Start),
        "stop" => CliAction::Send(Command::Stop),
        "bpm" => CliAction::Send(Command::SetBpm(parse_number(arg)?)),
        "sig" => CliAction::Send(Command::SetTimeSignature(parse_number(arg)?)),
        "sub" => {
            let name = arg.ok_or("missing subdivision name")?;
            let subdivision = name.parse::<SubdivisionType>().map_err(|e| e.to_string())?;
            CliAction::Send(Command::SetSubdivision(subdivision))
        }
        "vol" => CliAction::Send(Command::SetVolume(parse_number(arg)?)),
        "mute" => CliAction::Send(Command::SetMuted(true)),
        "unmute" => CliAction::Send(Command::SetMuted(false)),
        "stress-beat" => {
            stress.stress_first_beat = parse_switch(arg)?;
            CliAction::Send(Command::SetStress(*stress))
        }
        "stress-sub" => {
            stress.stress_first_sub_beat = parse_switch(arg)?;
            CliAction::Send(Command::SetStress(*stress))
        }
        "timbre" => {
            let id = arg.ok_or("missing sound id")?;
            CliAction::Send(Command::SetTimbre(id.to_string()))
        }
        "sounds" => CliAction::Sounds,
        "status" => CliAction::Status,
        "help" | "?" => CliAction::Help,
        "quit" | "exit" => CliAction::Quit,
        other => return Err(format!("unknown command: {other} (try help)")),
    };

    Ok(Some(action))
}

fn print_status(status: &RunnerStatus) {
    let settings = &status.settings;
    println!(
        "{:?} | {} bpm | {}/4 | {} | beat {} sub {} | volume {}{} | timbre {}",
        status.state,
        settings.bpm,
        settings.time_signature,
        settings.subdivision,
        status.main_beat + 1,
        status.sub_beat + 1,
        settings.volume,
        if settings.is_muted { " (muted)" } else { "" },
        settings.timbre,
    );
}

fn print_sounds(sounds: &[SoundDescriptor], current: &str) {
    for sound in sounds {
        let marker = if sound.id == current { '*' } else { ' ' };
        let kind = if sound.is_live() { "synth" } else { "sample" };
        println!("{marker} {:<28} {:<24} {kind}", sound.id, sound.name);
    }
}

fn drain_notifications(rx: &mut NotificationConsumer) {
    while let Some(notification) = rx.try_pop() {
        println!("[{:?}] {}", notification.level, notification.message);
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = match parse_args(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{e}\n{USAGE}");
            std::process::exit(2);
        }
    };

    println!("=== MyMusic Metronome ===");

    let store = match args.settings_path {
        Some(path) => Some(SettingsStore::new(path)),
        None => SettingsStore::open_default().ok(),
    };
    let settings = match &store {
        Some(store) => match store.load() {
            Ok((settings, _warnings)) => settings,
            Err(e) => {
                log::warn!("could not read {}: {e}, using defaults", store.path().display());
                MetronomeSettings::default()
            }
        },
        None => MetronomeSettings::default(),
    };

    let sounds_dir = args
        .sounds_dir
        .or_else(|| dirs::data_dir().map(|dir| dir.join("mymusic-metronome").join("sounds")));
    let catalog = match &sounds_dir {
        Some(dir) => DirectoryCatalog::scan(dir).unwrap_or_else(|e| {
            log::warn!("could not scan {}: {e}", dir.display());
            DirectoryCatalog::default()
        }),
        None => DirectoryCatalog::default(),
    };
    let sounds = catalog.sounds();

    let (notification_tx, mut notification_rx) =
        create_notification_channel(NOTIFICATION_RINGBUFFER_CAPACITY);
    let notifier = Notifier::new(notification_tx);

    let mut stress = StressConfig::new(settings.stress_first_beat, settings.stress_first_sub_beat);

    let spawned = MetronomeRunner::new(settings)
        .with_catalog(Box::new(catalog))
        .with_notifier(notifier)
        .spawn(|notifier: &Notifier| -> Box<dyn AudioSink> {
            match ClickEngine::new(notifier.clone()) {
                Ok(engine) => Box::new(engine),
                Err(e) => {
                    notifier.report(&e);
                    Box::new(NullSink)
                }
            }
        });
    let mut runner = match spawned {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("ERROR: could not start the metronome thread: {e}");
            std::process::exit(1);
        }
    };

    println!("Type help for the command list.\n");

    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    loop {
        print!("> ");
        let _ = io::stdout().flush();

        let line = match lines.next() {
            Some(Ok(line)) => line,
            Some(Err(e)) => {
                eprintln!("ERROR: {e}");
                break;
            }
            None => break,
        };

        match parse_line(&line, &mut stress) {
            Ok(Some(CliAction::Send(command))) => {
                runner.send(command);
            }
            Ok(Some(CliAction::Sounds)) => {
                let current = runner
                    .status()
                    .map(|status| status.settings.timbre)
                    .unwrap_or_default();
                print_sounds(&sounds, &current);
            }
            Ok(Some(CliAction::Status)) => {
                if let Some(status) = runner.status() {
                    print_status(&status);
                }
            }
            Ok(Some(CliAction::Help)) => println!("{HELP}"),
            Ok(Some(CliAction::Quit)) => break,
            Ok(None) => {}
            Err(e) => println!("{e}"),
        }

        drain_notifications(&mut notification_rx);
    }

    let final_settings = match runner.quit() {
        Ok(settings) => settings,
        Err(_) => {
            eprintln!("ERROR: the metronome thread panicked, settings not saved");
            std::process::exit(1);
        }
    };
    drain_notifications(&mut notification_rx);

    if let Some(store) = &store {
        match store.save(&final_settings) {
            Ok(()) => println!("Settings saved to {}", store.path().display()),
            Err(e) => eprintln!("ERROR: could not save settings: {e}"),
        }
    }
}
